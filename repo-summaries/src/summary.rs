//! Per-repository processing results and run totals.

use crate::output::SummaryRecord;

/// How one repository's summary was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryStatus {
    /// The model produced a summary.
    Generated,

    /// The repository has no README; the summary was left empty.
    MissingReadme,

    /// The README exists but could not be fetched; the summary was left
    /// empty.
    FetchFailed {
        /// Error message from the fetch.
        error: String,
    },

    /// Summarization failed after retries; the summary was left empty.
    Failed {
        /// Error message from the final attempt.
        error: String,
    },
}

/// Result of processing a single repository.
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The CSV row produced for this repository.
    pub record: SummaryRecord,
    /// How the summary field came to be.
    pub status: SummaryStatus,
}

/// Totals for a complete run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Repositories returned by enumeration.
    pub repositories_listed: usize,

    /// Repositories that passed the configured filters.
    pub repositories_included: usize,

    /// Summaries successfully generated.
    pub summaries_generated: usize,

    /// Repositories without a README.
    pub readmes_missing: usize,

    /// READMEs that exist but could not be fetched.
    pub readme_fetches_failed: usize,

    /// Summaries that failed after retries.
    pub summaries_failed: usize,

    /// Whether this was a dry run.
    pub dry_run: bool,
}

impl RunSummary {
    /// Creates a new empty summary.
    #[must_use]
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    /// Updates the totals with one processing result.
    pub fn record_result(&mut self, result: &ProcessingResult) {
        match &result.status {
            SummaryStatus::Generated => self.summaries_generated += 1,
            SummaryStatus::MissingReadme => self.readmes_missing += 1,
            SummaryStatus::FetchFailed { .. } => self.readme_fetches_failed += 1,
            SummaryStatus::Failed { .. } => self.summaries_failed += 1,
        }
    }

    /// Returns true if any summary degraded to empty through a failure.
    ///
    /// A missing README is not a failure; it is expected input. A README we
    /// could not fetch is.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.summaries_failed > 0 || self.readme_fetches_failed > 0
    }

    /// Returns true if every included repository was handled cleanly.
    #[must_use]
    pub fn all_success(&self) -> bool {
        !self.has_failures()
    }
}
