#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

pub mod config;
pub mod github;
pub mod llm;
pub mod output;
pub mod rate_limit;
pub mod runner;
pub mod summary;

pub use config::{ConfigError, RunConfig, TargetKind};
pub use github::{GithubError, GithubSource, RepoDescriptor, RepositorySource};
pub use llm::{LlmSummarizer, SummarizeError, Summarizer};
pub use output::{write_csv, OutputError, SummaryRecord};
pub use rate_limit::{check_core_rate_limit, ensure_core_rate_limit, wait_if_needed, RateLimitInfo};
pub use runner::{Runner, RunnerConfig, RunnerError};
pub use summary::{ProcessingResult, RunSummary, SummaryStatus};
