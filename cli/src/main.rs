//! CLI for the repository summary generator.
//!
//! Enumerates a GitHub account's repositories, summarizes each README with
//! the configured model, and writes the results to a CSV file.

use clap::{Parser, ValueEnum};
use repo_summaries::{RunConfig, RunSummary, Runner, RunnerConfig, TargetKind};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Repository Summary Generator - Summarize a GitHub account's repositories into a CSV.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML run config; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// GitHub user or organization name.
    #[arg(long)]
    name: Option<String>,

    /// Whether the name refers to a user or an organization.
    #[arg(long, value_enum)]
    kind: Option<KindArg>,

    /// Include private repositories in the output.
    #[arg(long)]
    include_private: bool,

    /// Minimum star count for a repository to be included.
    #[arg(long)]
    min_stars: Option<u32>,

    /// Output CSV path (defaults to `{name}_repo_summaries.csv`).
    #[arg(long)]
    output: Option<PathBuf>,

    /// GitHub Personal Access Token.
    #[arg(long, env = "GITHUB_TOKEN")]
    token: String,

    /// Preview the repository list without summarizing or writing.
    #[arg(long)]
    dry_run: bool,

    /// Maximum concurrent repository fetches/summarizations.
    #[arg(long, default_value_t = 5)]
    concurrency: usize,

    /// Path to the LLM config file.
    #[arg(long)]
    llm_config_path: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    User,
    Org,
}

impl From<KindArg> for TargetKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::User => TargetKind::User,
            KindArg::Org => TargetKind::Org,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = Args::parse();

    match run(args).await {
        Ok(summary) => {
            print_summary(&summary);

            if summary.all_success() {
                ExitCode::from(0)
            } else {
                // CSV was written, but one or more rows degraded.
                ExitCode::from(1)
            }
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            ExitCode::from(2)
        }
    }
}

/// Initializes tracing with environment filter support.
///
/// Compact single-line output; log level via `RUST_LOG`, defaulting to
/// "info".
fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Main execution logic.
async fn run(args: Args) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let run_config = build_run_config(&args)?;

    let mut config = RunnerConfig::new(run_config, args.token, args.dry_run, args.concurrency);
    if let Some(path) = args.llm_config_path {
        config = config.with_llm_config_path(path);
    }

    let runner = Runner::new(config)?;
    runner.run().await.map_err(Into::into)
}

/// Builds the run configuration from the optional config file and flags.
///
/// Flags take precedence over file values; a target name must come from one
/// of the two.
fn build_run_config(args: &Args) -> Result<RunConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => {
            let name = args.name.clone().ok_or_else(|| {
                repo_summaries::ConfigError::ValidationError {
                    message: "either --config or --name is required".to_string(),
                }
            })?;
            RunConfig {
                name,
                kind: TargetKind::Org,
                include_private: false,
                min_stars: 0,
                output: None,
            }
        }
    };

    if let Some(name) = &args.name {
        config.name = name.clone();
    }
    if let Some(kind) = args.kind {
        config.kind = kind.into();
    }
    if args.include_private {
        config.include_private = true;
    }
    if let Some(min_stars) = args.min_stars {
        config.min_stars = min_stars;
    }
    if let Some(output) = &args.output {
        config.output = Some(output.clone());
    }

    config.validate()?;
    Ok(config)
}

/// Prints the final run summary.
fn print_summary(summary: &RunSummary) {
    println!("\nSummary:");
    println!(
        "  Mode: {}",
        if summary.dry_run { "Dry Run" } else { "Live" }
    );
    println!("  Repositories listed: {}", summary.repositories_listed);
    println!("  Repositories included: {}", summary.repositories_included);

    if !summary.dry_run {
        println!("  Summaries generated: {}", summary.summaries_generated);
        println!("  READMEs missing: {}", summary.readmes_missing);
        println!("  README fetches failed: {}", summary.readme_fetches_failed);
        println!("  Summaries failed: {}", summary.summaries_failed);
    }
}
