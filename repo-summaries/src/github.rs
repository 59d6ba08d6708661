//! Repository enumeration and README retrieval via the GitHub API.
//!
//! Enumeration failures are fatal to a run; a missing or unreadable README
//! for an individual repository is not, and is degraded by the caller.

use crate::config::TargetKind;
use crate::rate_limit::ensure_core_rate_limit;
use octocrab::Octocrab;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Results per page for repository listing.
const RESULTS_PER_PAGE: u8 = 100;

/// Errors that can occur while talking to GitHub.
#[derive(Debug, Error)]
pub enum GithubError {
    /// GitHub API error.
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    /// README payload was present but could not be decoded.
    #[error("Could not decode README content for {repo}")]
    Decode { repo: String },
}

/// Metadata for one enumerated repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDescriptor {
    /// Repository owner (user or organization).
    pub owner: String,

    /// Repository short name.
    pub name: String,

    /// Canonical web URL.
    pub url: Url,

    /// Repository description, if one is set.
    pub description: Option<String>,

    /// Whether the repository is private.
    pub private: bool,

    /// Star count.
    pub stars: u32,
}

/// Source of repository descriptors and README contents.
///
/// The live implementation is [`GithubSource`]; tests substitute
/// deterministic fakes.
#[allow(async_fn_in_trait)]
pub trait RepositorySource {
    /// Enumerates all repositories of the target account, in the order the
    /// API returns them.
    async fn list_repositories(&self) -> Result<Vec<RepoDescriptor>, GithubError>;

    /// Fetches a repository's README, returning `None` if it has none.
    async fn fetch_readme(&self, repo: &RepoDescriptor) -> Result<Option<String>, GithubError>;
}

/// [`RepositorySource`] backed by the GitHub REST API.
pub struct GithubSource {
    octocrab: Octocrab,
    kind: TargetKind,
    name: String,
}

impl GithubSource {
    /// Creates a source for the given account.
    pub fn new(octocrab: Octocrab, kind: TargetKind, name: String) -> Self {
        Self {
            octocrab,
            kind,
            name,
        }
    }
}

impl RepositorySource for GithubSource {
    async fn list_repositories(&self) -> Result<Vec<RepoDescriptor>, GithubError> {
        info!(target = %self.name, kind = self.kind.as_str(), "Enumerating repositories");
        ensure_core_rate_limit(&self.octocrab).await?;

        let page = match self.kind {
            TargetKind::Org => {
                self.octocrab
                    .orgs(&self.name)
                    .list_repos()
                    .per_page(RESULTS_PER_PAGE)
                    .send()
                    .await?
            }
            TargetKind::User => {
                self.octocrab
                    .users(&self.name)
                    .repos()
                    .per_page(RESULTS_PER_PAGE)
                    .send()
                    .await?
            }
        };
        let repos: Vec<octocrab::models::Repository> = self.octocrab.all_pages(page).await?;

        let descriptors = to_descriptors(repos);
        info!(count = descriptors.len(), "Enumeration complete");
        Ok(descriptors)
    }

    async fn fetch_readme(&self, repo: &RepoDescriptor) -> Result<Option<String>, GithubError> {
        ensure_core_rate_limit(&self.octocrab).await?;

        let content = match self
            .octocrab
            .repos(&repo.owner, &repo.name)
            .get_readme()
            .send()
            .await
        {
            Ok(content) => content,
            Err(octocrab::Error::GitHub { source, .. })
                if source.status_code.as_u16() == 404 =>
            {
                debug!(repo = %repo.name, "Repository has no README");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match content.decoded_content() {
            Some(text) => Ok(Some(text)),
            None => Err(GithubError::Decode {
                repo: repo.name.clone(),
            }),
        }
    }
}

/// Converts API repository models to descriptors, skipping entries that
/// lack an identifiable owner.
fn to_descriptors(repos: Vec<octocrab::models::Repository>) -> Vec<RepoDescriptor> {
    repos.into_iter().filter_map(to_descriptor).collect()
}

fn to_descriptor(repo: octocrab::models::Repository) -> Option<RepoDescriptor> {
    let owner = match owner_login(&repo) {
        Some(owner) => owner,
        None => {
            warn!(repo = %repo.name, "Skipping repository without an owner");
            return None;
        }
    };

    let url = match repo.html_url {
        Some(url) => url,
        None => Url::parse(&format!("https://github.com/{owner}/{}", repo.name)).ok()?,
    };

    Some(RepoDescriptor {
        owner,
        name: repo.name,
        url,
        description: repo.description,
        private: repo.private.unwrap_or(false),
        stars: repo.stargazers_count.unwrap_or(0),
    })
}

fn owner_login(repo: &octocrab::models::Repository) -> Option<String> {
    if let Some(owner) = &repo.owner {
        return Some(owner.login.clone());
    }
    repo.full_name
        .as_deref()
        .and_then(|full| full.split('/').next())
        .filter(|owner| !owner.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model(value: serde_json::Value) -> octocrab::models::Repository {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn descriptor_from_full_model() {
        let repo = model(json!({
            "id": 1,
            "name": "widget",
            "url": "https://api.github.com/repos/acme/widget",
            "full_name": "acme/widget",
            "html_url": "https://github.com/acme/widget",
            "description": "Makes widgets",
            "private": false,
            "stargazers_count": 42
        }));

        let descriptor = to_descriptor(repo).unwrap();
        assert_eq!(descriptor.owner, "acme");
        assert_eq!(descriptor.name, "widget");
        assert_eq!(descriptor.url.as_str(), "https://github.com/acme/widget");
        assert_eq!(descriptor.description.as_deref(), Some("Makes widgets"));
        assert!(!descriptor.private);
        assert_eq!(descriptor.stars, 42);
    }

    #[test]
    fn descriptor_defaults_missing_counts() {
        let repo = model(json!({
            "id": 2,
            "name": "bare",
            "url": "https://api.github.com/repos/acme/bare",
            "full_name": "acme/bare"
        }));

        let descriptor = to_descriptor(repo).unwrap();
        assert_eq!(descriptor.stars, 0);
        assert!(!descriptor.private);
        assert_eq!(descriptor.url.as_str(), "https://github.com/acme/bare");
    }

    #[test]
    fn descriptor_skips_ownerless_entry() {
        let repo = model(json!({
            "id": 3,
            "name": "orphan",
            "url": "https://api.github.com/repos/orphan"
        }));

        assert!(to_descriptor(repo).is_none());
    }

    #[test]
    fn descriptors_preserve_enumeration_order() {
        let repos = vec![
            model(json!({"id": 1, "name": "b", "url": "https://api.github.com/repos/acme/b", "full_name": "acme/b"})),
            model(json!({"id": 2, "name": "a", "url": "https://api.github.com/repos/acme/a", "full_name": "acme/a"})),
            model(json!({"id": 3, "name": "c", "url": "https://api.github.com/repos/acme/c", "full_name": "acme/c"})),
        ];

        let names: Vec<String> = to_descriptors(repos)
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, ["b", "a", "c"]);
    }
}
