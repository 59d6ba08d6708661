//! Orchestrates the list-summarize-write pipeline.
//!
//! One pass: enumerate repositories, apply the configured filters, fetch
//! and summarize each README with bounded concurrency, then write the CSV
//! once at the end. Per-repository failures degrade that row to an empty
//! summary; enumeration and output failures abort the run before the
//! previous output file is touched.

use crate::config::{ConfigError, RunConfig};
use crate::github::{GithubError, GithubSource, RepoDescriptor, RepositorySource};
use crate::llm::{LlmSummarizer, SummarizeError, Summarizer};
use crate::output::{write_csv, OutputError, SummaryRecord};
use crate::summary::{ProcessingResult, RunSummary, SummaryStatus};
use futures::stream::{self, StreamExt};
use octocrab::Octocrab;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// Attempts per summarization call before degrading to an empty summary.
const MAX_SUMMARY_ATTEMPTS: u32 = 3;

/// Base delay for the exponential retry backoff.
const RETRY_BASE_DELAY_SECS: u64 = 2;

/// Configuration for running the summary generator.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Target account and filters.
    run: RunConfig,
    /// GitHub token used for API calls.
    token: String,
    /// Whether to preview the repository list without summarizing or writing.
    dry_run: bool,
    /// Maximum concurrent repository fetches/summarizations.
    concurrency: usize,
    /// Path to the LLM config file.
    llm_config_path: PathBuf,
}

impl RunnerConfig {
    /// Creates a new configuration for a run.
    pub fn new(run: RunConfig, token: String, dry_run: bool, concurrency: usize) -> Self {
        Self {
            run,
            token,
            dry_run,
            concurrency,
            llm_config_path: PathBuf::from("config.toml"),
        }
    }

    /// Sets a custom LLM config path.
    pub fn with_llm_config_path(mut self, llm_config_path: PathBuf) -> Self {
        self.llm_config_path = llm_config_path;
        self
    }

    /// Returns the target account and filter settings.
    pub fn run_config(&self) -> &RunConfig {
        &self.run
    }

    /// Returns the configured GitHub token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns whether dry-run mode is enabled.
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Returns the max concurrent repository processes.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the LLM config file path.
    pub fn llm_config_path(&self) -> &Path {
        &self.llm_config_path
    }
}

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Configuration loading and validation errors.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// GitHub API client initialization errors.
    #[error(transparent)]
    Octocrab(#[from] octocrab::Error),
    /// Repository enumeration errors.
    #[error(transparent)]
    GitHub(#[from] GithubError),
    /// Summarizer construction errors (missing model configuration).
    #[error(transparent)]
    Summarizer(#[from] SummarizeError),
    /// Output file errors.
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Orchestrates a full summary generation run.
pub struct Runner {
    config: RunnerConfig,
    octocrab: Octocrab,
}

impl Runner {
    /// Builds a runner from the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if the configuration is invalid or the
    /// GitHub client cannot be constructed.
    pub fn new(config: RunnerConfig) -> Result<Self, RunnerError> {
        config.run.validate()?;
        let octocrab = Octocrab::builder()
            .personal_token(config.token.clone())
            .build()?;
        Ok(Self { config, octocrab })
    }

    /// Executes the full pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] on run-fatal failures; per-repository
    /// failures are recorded in the returned [`RunSummary`] instead.
    pub async fn run(&self) -> Result<RunSummary, RunnerError> {
        let source = GithubSource::new(
            self.octocrab.clone(),
            self.config.run.kind,
            self.config.run.name.clone(),
        );
        execute_run(
            &source,
            || LlmSummarizer::from_config(self.config.llm_config_path()),
            &self.config,
        )
        .await
    }
}

/// Runs the enumerate-filter-process-write pipeline against any source and
/// summarizer.
///
/// The summarizer is built lazily so dry runs never need model
/// configuration. Nothing is written until every repository has been
/// processed; any fatal error leaves a previous output file untouched.
pub(crate) async fn execute_run<S, L, F>(
    source: &S,
    make_summarizer: F,
    config: &RunnerConfig,
) -> Result<RunSummary, RunnerError>
where
    S: RepositorySource,
    L: Summarizer,
    F: FnOnce() -> Result<L, SummarizeError>,
{
    let mut summary = RunSummary::new(config.dry_run);

    let repositories = source.list_repositories().await?;
    summary.repositories_listed = repositories.len();

    let included: Vec<RepoDescriptor> = repositories
        .into_iter()
        .filter(|repo| config.run.includes(repo))
        .collect();
    summary.repositories_included = included.len();
    info!(
        listed = summary.repositories_listed,
        included = summary.repositories_included,
        "Applied repository filters"
    );

    if config.dry_run {
        print_dry_run_preview(&included);
        return Ok(summary);
    }

    let summarizer = make_summarizer()?;
    let results = process_repositories(source, &summarizer, included, config.concurrency).await;
    for result in &results {
        summary.record_result(result);
    }

    let records: Vec<SummaryRecord> = results.into_iter().map(|r| r.record).collect();
    write_csv(&config.run.output_path(), &records)?;

    Ok(summary)
}

/// Processes repositories with bounded concurrency.
///
/// Uses an ordered buffer so results come back in enumeration order no
/// matter which summarization finishes first.
pub(crate) async fn process_repositories<S, L>(
    source: &S,
    summarizer: &L,
    repositories: Vec<RepoDescriptor>,
    concurrency: usize,
) -> Vec<ProcessingResult>
where
    S: RepositorySource,
    L: Summarizer,
{
    stream::iter(repositories)
        .map(|repo| process_repository(source, summarizer, repo))
        .buffered(concurrency.max(1))
        .collect()
        .await
}

/// Fetches one repository's README and summarizes it.
///
/// Never fails: every degradation path produces a record with an empty
/// summary and an explanatory status.
async fn process_repository<S, L>(
    source: &S,
    summarizer: &L,
    repo: RepoDescriptor,
) -> ProcessingResult
where
    S: RepositorySource,
    L: Summarizer,
{
    info!(repo = %repo.name, "Processing repository");

    let (summary, status) = match source.fetch_readme(&repo).await {
        Err(e) => {
            warn!(repo = %repo.name, error = %e, "Failed to fetch README, leaving summary empty");
            (
                String::new(),
                SummaryStatus::FetchFailed {
                    error: e.to_string(),
                },
            )
        }
        Ok(readme) => match readme.filter(|content| !content.trim().is_empty()) {
            None => {
                info!(repo = %repo.name, "No README, leaving summary empty");
                (String::new(), SummaryStatus::MissingReadme)
            }
            Some(content) => match summarize_with_retry(summarizer, &repo, &content).await {
                Ok(text) => (text, SummaryStatus::Generated),
                Err(e) => {
                    error!(repo = %repo.name, error = %e, "Summarization failed, leaving summary empty");
                    (
                        String::new(),
                        SummaryStatus::Failed {
                            error: e.to_string(),
                        },
                    )
                }
            },
        },
    };

    ProcessingResult {
        record: SummaryRecord {
            name: repo.name,
            url: repo.url.to_string(),
            stars: repo.stars,
            summary,
        },
        status,
    }
}

/// Calls the summarizer with bounded retries and exponential backoff.
///
/// Transient rate limiting is the most likely failure mode for this kind of
/// batch job, so every error class gets the same small retry budget.
async fn summarize_with_retry<L>(
    summarizer: &L,
    repo: &RepoDescriptor,
    readme: &str,
) -> Result<String, SummarizeError>
where
    L: Summarizer,
{
    let mut attempt = 1;
    loop {
        match summarizer.summarize(repo, readme).await {
            Ok(text) => return Ok(text),
            Err(e) if attempt < MAX_SUMMARY_ATTEMPTS => {
                let delay = Duration::from_secs(RETRY_BASE_DELAY_SECS << (attempt - 1));
                warn!(
                    repo = %repo.name,
                    attempt,
                    delay_secs = delay.as_secs(),
                    error = %e,
                    "Summarization attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn print_dry_run_preview(repositories: &[RepoDescriptor]) {
    println!("\n[DRY RUN] Would summarize {} repositories:\n", repositories.len());
    for (i, repo) in repositories.iter().enumerate() {
        println!(
            "  [{}/{}] {} ({} stars) {}",
            i + 1,
            repositories.len(),
            repo.name,
            repo.stars,
            repo.url
        );
    }
    println!();
}
