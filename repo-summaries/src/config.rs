//! Run configuration and repository filters.
//!
//! A run is described by a small set of named options: the account to
//! enumerate, visibility and star filters, and the output path. The options
//! can be loaded from a TOML file or assembled directly from CLI flags;
//! either way they are validated before a run starts.

use crate::github::RepoDescriptor;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while loading or validating run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read config '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML content.
    #[error("Failed to parse config '{path}': {source}")]
    TomlError {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// The configuration is structurally valid but semantically wrong.
    #[error("Invalid configuration: {message}")]
    ValidationError { message: String },
}

/// Whether the enumerated account is a user or an organization.
///
/// GitHub exposes the two through different endpoints, so the distinction
/// has to survive into the listing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// A personal account (`/users/{name}/repos`).
    User,
    /// An organization (`/orgs/{name}/repos`).
    Org,
}

impl TargetKind {
    /// Returns the kind as it appears in config files and CLI flags.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Org => "org",
        }
    }
}

fn default_kind() -> TargetKind {
    TargetKind::Org
}

/// Configuration for a single summary generation run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunConfig {
    /// GitHub user or organization name to enumerate.
    pub name: String,

    /// Whether `name` refers to a user or an organization.
    #[serde(default = "default_kind")]
    pub kind: TargetKind,

    /// Whether private repositories are kept in the output.
    #[serde(default)]
    pub include_private: bool,

    /// Minimum star count for a repository to be kept.
    #[serde(default)]
    pub min_stars: u32,

    /// Output CSV path. Defaults to `{name}_repo_summaries.csv`.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl RunConfig {
    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Loading run config");

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::TomlError {
            path: path.display().to_string(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the target name is empty
    /// or contains path separators.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "name must not be empty".to_string(),
            });
        }

        if self.name.contains('/') || self.name.contains('\\') {
            return Err(ConfigError::ValidationError {
                message: format!("name must be a bare account name, got '{}'", self.name),
            });
        }

        Ok(())
    }

    /// Returns true if `repo` passes the visibility and star filters.
    #[must_use]
    pub fn includes(&self, repo: &RepoDescriptor) -> bool {
        if repo.private && !self.include_private {
            return false;
        }
        repo.stars >= self.min_stars
    }

    /// Resolves the output CSV path, falling back to the conventional
    /// `{name}_repo_summaries.csv` next to the working directory.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}_repo_summaries.csv", self.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use url::Url;

    fn descriptor(name: &str, private: bool, stars: u32) -> RepoDescriptor {
        RepoDescriptor {
            owner: "acme".to_string(),
            name: name.to_string(),
            url: Url::parse(&format!("https://github.com/acme/{name}")).unwrap(),
            description: None,
            private,
            stars,
        }
    }

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config: RunConfig = toml::from_str(r#"name = "acme""#).unwrap();

        assert_eq!(config.name, "acme");
        assert_eq!(config.kind, TargetKind::Org);
        assert!(!config.include_private);
        assert_eq!(config.min_stars, 0);
        assert!(config.output.is_none());
    }

    #[test]
    fn parses_full_config() {
        let config: RunConfig = toml::from_str(
            r#"
name = "octocat"
kind = "user"
include-private = true
min-stars = 5
output = "site/data/repos.csv"
"#,
        )
        .unwrap();

        assert_eq!(config.kind, TargetKind::User);
        assert!(config.include_private);
        assert_eq!(config.min_stars, 5);
        assert_eq!(config.output.as_deref(), Some(Path::new("site/data/repos.csv")));
    }

    #[test]
    fn load_reads_and_validates_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.toml");
        fs::write(&path, "name = \"acme\"\nmin-stars = 2\n").unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.min_stars, 2);
    }

    #[test]
    fn load_reports_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = RunConfig::load(&temp.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }

    #[test]
    fn load_reports_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.toml");
        fs::write(&path, "name = [broken").unwrap();

        let result = RunConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::TomlError { .. })));
    }

    #[test]
    fn validate_rejects_empty_name() {
        let config: RunConfig = toml::from_str(r#"name = "  ""#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn validate_rejects_path_separators() {
        let config: RunConfig = toml::from_str(r#"name = "acme/repos""#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn includes_applies_visibility_filter() {
        let config: RunConfig = toml::from_str(r#"name = "acme""#).unwrap();

        assert!(config.includes(&descriptor("pub", false, 0)));
        assert!(!config.includes(&descriptor("priv", true, 100)));
    }

    #[test]
    fn includes_keeps_private_when_configured() {
        let config: RunConfig =
            toml::from_str("name = \"acme\"\ninclude-private = true\n").unwrap();

        assert!(config.includes(&descriptor("priv", true, 0)));
    }

    #[test]
    fn includes_applies_min_stars() {
        let config: RunConfig = toml::from_str("name = \"acme\"\nmin-stars = 3\n").unwrap();

        assert!(config.includes(&descriptor("hot", false, 3)));
        assert!(!config.includes(&descriptor("cold", false, 2)));
    }

    #[test]
    fn output_path_defaults_to_conventional_name() {
        let config: RunConfig = toml::from_str(r#"name = "acme""#).unwrap();
        assert_eq!(
            config.output_path(),
            PathBuf::from("acme_repo_summaries.csv")
        );
    }
}
