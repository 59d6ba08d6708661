//! LLM-backed README summarization via serdes-ai.
//!
//! The provider is selected through a `config.toml` `[llm]` section or the
//! `REPO_SUMMARIES_LLM_MODEL` environment variable. A single agent is built
//! per run and reused for every repository.

use crate::github::RepoDescriptor;
use serde::Deserialize;
use serdes_ai::{agent::AgentBuilder, agent::AgentRunError, Agent};
use serdes_ai_models::{build_model_with_config, infer_model, openrouter::OpenRouterModel, Model};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const MODEL_ENV: &str = "REPO_SUMMARIES_LLM_MODEL";

/// Hard cap on a single summarization call. Timeouts are recoverable
/// per-repository failures, not run failures.
const SUMMARY_TIMEOUT_SECS: u64 = 120;

/// Maximum README characters forwarded to the model.
const MAX_README_CHARS: usize = 16_384;

const SYSTEM_PROMPT: &str = "You write short, accurate descriptions of software \
projects for a portfolio website. Reply with exactly two sentences of plain \
text and no extra formatting.";

/// Errors that can occur while configuring or calling the model.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Failed to read the LLM config file.
    #[error("Failed to read LLM config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Failed to parse the LLM config file.
    #[error("Failed to parse LLM config '{path}': {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// No model configured anywhere.
    #[error("LLM model not configured; set REPO_SUMMARIES_LLM_MODEL or config.toml")]
    MissingModel,
    /// The call exceeded the per-repository time budget.
    #[error("Summarization timed out after {0} seconds")]
    Timeout(u64),
    /// Model construction error.
    #[error("Model error: {0}")]
    Model(#[from] serdes_ai_models::ModelError),
    /// Agent run error.
    #[error("Agent run error: {0}")]
    AgentRun(#[from] AgentRunError),
}

/// Produces a short summary for one repository.
///
/// Abstracted so tests can substitute deterministic fakes for the live
/// model; this is the only seam the pipeline needs.
#[allow(async_fn_in_trait)]
pub trait Summarizer {
    /// Generates a two-sentence summary from a repository's README.
    async fn summarize(
        &self,
        repo: &RepoDescriptor,
        readme: &str,
    ) -> Result<String, SummarizeError>;
}

/// [`Summarizer`] backed by a serdes-ai agent.
pub struct LlmSummarizer {
    agent: Agent<(), String>,
}

impl LlmSummarizer {
    /// Builds a summarizer from the config file, falling back to the
    /// `REPO_SUMMARIES_LLM_MODEL` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`SummarizeError`] if no model is configured or the config
    /// file is unreadable.
    pub fn from_config(config_path: &Path) -> Result<Self, SummarizeError> {
        let model = resolve_model(config_path)?;
        let agent = AgentBuilder::from_arc(model)
            .system_prompt(SYSTEM_PROMPT.to_string())
            .temperature(0.7)
            .build();
        Ok(Self { agent })
    }
}

impl Summarizer for LlmSummarizer {
    async fn summarize(
        &self,
        repo: &RepoDescriptor,
        readme: &str,
    ) -> Result<String, SummarizeError> {
        let prompt = build_prompt(repo, readme);
        debug!(repo = %repo.name, prompt_chars = prompt.len(), "Requesting summary");

        let result = tokio::time::timeout(
            Duration::from_secs(SUMMARY_TIMEOUT_SECS),
            self.agent.run(prompt, ()),
        )
        .await
        .map_err(|_| SummarizeError::Timeout(SUMMARY_TIMEOUT_SECS))??;

        Ok(result.output.trim().to_string())
    }
}

/// Builds the summarization prompt.
///
/// The wording of the first line is part of the downstream compatibility
/// surface and should not change casually.
fn build_prompt(repo: &RepoDescriptor, readme: &str) -> String {
    let mut prompt = format!(
        "Summarize the following repository README in two marketable sentences.\n\
         Repository: {}\n",
        repo.name
    );
    if let Some(description) = &repo.description {
        prompt.push_str(&format!("Description: {description}\n"));
    }
    prompt.push_str("\nREADME:\n");
    prompt.push_str(truncate_readme(readme));
    prompt
}

/// Truncates oversized READMEs on a character boundary.
fn truncate_readme(readme: &str) -> &str {
    if readme.len() <= MAX_README_CHARS {
        return readme;
    }
    let mut end = MAX_README_CHARS;
    while !readme.is_char_boundary(end) {
        end -= 1;
    }
    &readme[..end]
}

/// Provider-specific configuration parsed from the `[llm]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub(crate) enum LlmConfig {
    /// OpenAI provider configuration.
    #[serde(rename = "openai")]
    OpenAi {
        model: String,
        /// Falls back to OPENAI_API_KEY.
        api_key: Option<String>,
        #[serde(rename = "base-url")]
        base_url: Option<String>,
        #[serde(rename = "timeout-secs")]
        timeout_secs: Option<u64>,
    },
    /// OpenRouter provider configuration.
    #[serde(rename = "openrouter")]
    OpenRouter {
        model: String,
        /// Falls back to OPENROUTER_API_KEY.
        api_key: Option<String>,
        #[serde(rename = "http-referer")]
        http_referer: Option<String>,
        #[serde(rename = "app-title")]
        app_title: Option<String>,
    },
    /// Anthropic provider configuration.
    Anthropic {
        model: String,
        /// Falls back to ANTHROPIC_API_KEY.
        api_key: Option<String>,
        #[serde(rename = "base-url")]
        base_url: Option<String>,
        #[serde(rename = "timeout-secs")]
        timeout_secs: Option<u64>,
    },
    /// Gemini provider configuration.
    Gemini {
        model: String,
        /// Falls back to GOOGLE_API_KEY.
        api_key: Option<String>,
        #[serde(rename = "base-url")]
        base_url: Option<String>,
        #[serde(rename = "timeout-secs")]
        timeout_secs: Option<u64>,
    },
}

/// Top-level structure for `config.toml` with a single `[llm]` section.
#[derive(Debug, Clone, Deserialize)]
struct LlmConfigFile {
    llm: LlmConfig,
}

/// Resolves the model from the config file or environment.
fn resolve_model(config_path: &Path) -> Result<Arc<dyn Model>, SummarizeError> {
    if let Some(config) = load_config(config_path)? {
        return config.build_model();
    }
    let model_spec = std::env::var(MODEL_ENV).map_err(|_| SummarizeError::MissingModel)?;
    infer_model(&model_spec).map_err(SummarizeError::Model)
}

/// Loads the LLM config file if it exists.
fn load_config(path: &Path) -> Result<Option<LlmConfig>, SummarizeError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|source| SummarizeError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let parsed: LlmConfigFile = toml::from_str(&contents).map_err(|source| SummarizeError::Toml {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Some(parsed.llm))
}

impl LlmConfig {
    /// Builds a model from the configuration.
    fn build_model(&self) -> Result<Arc<dyn Model>, SummarizeError> {
        match self {
            Self::OpenRouter {
                model,
                api_key,
                http_referer,
                app_title,
            } => {
                if api_key.is_none() && http_referer.is_none() && app_title.is_none() {
                    let spec = format!("openrouter:{model}");
                    return infer_model(&spec).map_err(SummarizeError::Model);
                }
                let mut model = match api_key {
                    Some(key) => OpenRouterModel::new(model, key),
                    None => OpenRouterModel::from_env(model).map_err(SummarizeError::Model)?,
                };
                if let Some(referer) = http_referer {
                    model = model.with_http_referer(referer);
                }
                if let Some(title) = app_title {
                    model = model.with_app_title(title);
                }
                Ok(Arc::new(model))
            }
            Self::OpenAi {
                model,
                api_key,
                base_url,
                timeout_secs,
            } => build_configured_model("openai", model, api_key, base_url, timeout_secs),
            Self::Anthropic {
                model,
                api_key,
                base_url,
                timeout_secs,
            } => build_configured_model("anthropic", model, api_key, base_url, timeout_secs),
            Self::Gemini {
                model,
                api_key,
                base_url,
                timeout_secs,
            } => build_configured_model("gemini", model, api_key, base_url, timeout_secs),
        }
    }
}

/// Builds a configured model for providers with the common option set.
fn build_configured_model(
    provider: &str,
    model: &str,
    api_key: &Option<String>,
    base_url: &Option<String>,
    timeout_secs: &Option<u64>,
) -> Result<Arc<dyn Model>, SummarizeError> {
    let resolved_key = api_key
        .as_deref()
        .map(str::to_owned)
        .or_else(|| env_api_key(provider));
    let timeout = timeout_secs.map(Duration::from_secs);
    if resolved_key.is_none() && base_url.is_none() && timeout_secs.is_none() {
        let spec = format!("{provider}:{model}");
        return infer_model(&spec).map_err(SummarizeError::Model);
    }
    build_model_with_config(
        provider,
        model,
        resolved_key.as_deref(),
        base_url.as_deref(),
        timeout,
    )
    .map_err(SummarizeError::Model)
}

/// Gets the conventional API key environment variable for a provider.
fn env_api_key(provider: &str) -> Option<String> {
    let var = match provider {
        "openai" => "OPENAI_API_KEY",
        "anthropic" => "ANTHROPIC_API_KEY",
        "gemini" => "GOOGLE_API_KEY",
        _ => return None,
    };
    std::env::var(var).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use url::Url;

    fn descriptor(name: &str, description: Option<&str>) -> RepoDescriptor {
        RepoDescriptor {
            owner: "acme".to_string(),
            name: name.to_string(),
            url: Url::parse(&format!("https://github.com/acme/{name}")).unwrap(),
            description: description.map(str::to_owned),
            private: false,
            stars: 0,
        }
    }

    fn write_config(temp: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = temp.path().join("config.toml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn prompt_contains_name_and_readme() {
        let prompt = build_prompt(&descriptor("widget", None), "Widget makes widgets.");

        assert!(prompt.starts_with(
            "Summarize the following repository README in two marketable sentences."
        ));
        assert!(prompt.contains("Repository: widget"));
        assert!(prompt.contains("Widget makes widgets."));
        assert!(!prompt.contains("Description:"));
    }

    #[test]
    fn prompt_includes_description_when_present() {
        let prompt = build_prompt(&descriptor("widget", Some("A widget maker")), "README");
        assert!(prompt.contains("Description: A widget maker"));
    }

    #[test]
    fn truncate_leaves_short_readmes_alone() {
        assert_eq!(truncate_readme("short"), "short");
    }

    #[test]
    fn truncate_caps_long_readmes_on_char_boundary() {
        let long = "é".repeat(MAX_README_CHARS);
        let cut = truncate_readme(&long);
        assert!(cut.len() <= MAX_README_CHARS);
        assert!(cut.is_char_boundary(cut.len()));
    }

    #[test]
    fn load_config_returns_none_when_missing() {
        let temp = TempDir::new().unwrap();
        let config = load_config(&temp.path().join("missing.toml")).unwrap();
        assert!(config.is_none());
    }

    #[test]
    fn load_config_parses_openai() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            &temp,
            r#"
[llm]
provider = "openai"
model = "gpt-4o-mini"
timeout-secs = 30
"#,
        );
        let config = load_config(&path).unwrap().unwrap();
        match config {
            LlmConfig::OpenAi {
                model,
                timeout_secs,
                ..
            } => {
                assert_eq!(model, "gpt-4o-mini");
                assert_eq!(timeout_secs, Some(30));
            }
            _ => panic!("expected openai"),
        }
    }

    #[test]
    fn load_config_parses_openrouter() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            &temp,
            r#"
[llm]
provider = "openrouter"
model = "anthropic/claude-3-5-haiku"
app-title = "Repo Summaries"
"#,
        );
        let config = load_config(&path).unwrap().unwrap();
        match config {
            LlmConfig::OpenRouter {
                model, app_title, ..
            } => {
                assert_eq!(model, "anthropic/claude-3-5-haiku");
                assert_eq!(app_title.as_deref(), Some("Repo Summaries"));
            }
            _ => panic!("expected openrouter"),
        }
    }

    #[test]
    fn load_config_parses_anthropic() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            &temp,
            r#"
[llm]
provider = "anthropic"
model = "claude-3-5-haiku-20241022"
"#,
        );
        let config = load_config(&path).unwrap().unwrap();
        assert!(matches!(config, LlmConfig::Anthropic { .. }));
    }

    #[test]
    fn load_config_reports_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = write_config(&temp, "not = [valid");
        let error = load_config(&path).unwrap_err();
        assert!(matches!(error, SummarizeError::Toml { .. }));
    }

    #[test]
    fn env_api_key_reads_provider_var() {
        temp_env::with_var("OPENAI_API_KEY", Some("sk-test"), || {
            assert_eq!(env_api_key("openai").as_deref(), Some("sk-test"));
        });
        assert_eq!(env_api_key("unknown"), None);
    }
}
