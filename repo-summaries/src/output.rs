//! CSV output with atomic replacement.
//!
//! The column set and order (`name,url,stars,summary`) are the contract the
//! downstream website consumes; changing them is a breaking change.

use serde::Serialize;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

/// CSV header, written even when there are no rows.
const HEADER: [&str; 4] = ["name", "url", "stars", "summary"];

/// Errors that can occur while writing the output file.
#[derive(Debug, Error)]
pub enum OutputError {
    /// CSV serialization error.
    #[error("Failed to serialize CSV: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error on the temporary file.
    #[error("I/O error writing output: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to move the finished file into place.
    #[error("Failed to replace output file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// One row of the output CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRecord {
    /// Repository short name.
    pub name: String,
    /// Canonical web URL.
    pub url: String,
    /// Star count.
    pub stars: u32,
    /// Generated summary; empty when generation failed or no README exists.
    pub summary: String,
}

/// Serializes records to `path`, replacing any previous file atomically.
///
/// Rows are written to a temporary file in the destination directory and
/// renamed over the target, so a crash mid-write never clobbers a
/// previously written output.
///
/// # Errors
///
/// Returns [`OutputError`] if writing or the final rename fails.
pub fn write_csv(path: &Path, records: &[SummaryRecord]) -> Result<(), OutputError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        // Header written by hand so zero-row runs still produce it.
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut tmp);
        writer.write_record(HEADER)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }
    tmp.persist(path)?;

    info!(path = %path.display(), rows = records.len(), "Wrote output CSV");
    Ok(())
}
