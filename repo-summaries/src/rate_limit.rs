//! Proactive GitHub API rate-limit handling.
//!
//! Before batches of core API calls we check remaining capacity and sleep
//! until the window resets when it runs low, instead of burning the last
//! requests and failing mid-run.

use octocrab::Octocrab;
use std::time::Duration;
use tracing::{info, warn};

/// Maximum time to wait for a rate limit window to reset (1 hour).
const MAX_WAIT_SECS: u64 = 3600;

/// Remaining-request floor below which we wait for the reset.
const MIN_REMAINING_THRESHOLD: u32 = 5;

/// Snapshot of the core API rate limit.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// Requests remaining in the current window.
    pub remaining: u32,
    /// Unix timestamp when the window resets.
    pub reset: u64,
    /// Total requests allowed per window.
    pub limit: u32,
}

/// Checks the current core API rate limit (repository listing, contents).
///
/// # Errors
///
/// Returns an error if the rate limit API call itself fails.
pub async fn check_core_rate_limit(octocrab: &Octocrab) -> Result<RateLimitInfo, octocrab::Error> {
    let rate_limit = octocrab.ratelimit().get().await?;
    let core = &rate_limit.resources.core;

    Ok(RateLimitInfo {
        remaining: core.remaining as u32,
        reset: core.reset,
        limit: core.limit as u32,
    })
}

/// Sleeps until the window resets if capacity is low.
///
/// Returns `true` if we waited.
pub async fn wait_if_needed(info: &RateLimitInfo) -> bool {
    if info.remaining >= MIN_REMAINING_THRESHOLD {
        return false;
    }

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    if info.reset <= now {
        return false;
    }

    let wait_secs = info.reset - now;
    if wait_secs > MAX_WAIT_SECS {
        warn!(
            wait_secs,
            max_wait = MAX_WAIT_SECS,
            "Rate limit reset too far in the future, capping wait"
        );
    }

    let actual_wait = wait_secs.min(MAX_WAIT_SECS);
    info!(
        remaining = info.remaining,
        wait_secs = actual_wait,
        "Core rate limit low, waiting for reset"
    );

    tokio::time::sleep(Duration::from_secs(actual_wait)).await;
    true
}

/// Checks the core rate limit and waits if needed.
///
/// # Errors
///
/// Returns an error if the rate limit check fails.
pub async fn ensure_core_rate_limit(octocrab: &Octocrab) -> Result<(), octocrab::Error> {
    let info = check_core_rate_limit(octocrab).await?;
    wait_if_needed(&info).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_wait_with_plenty_of_capacity() {
        let info = RateLimitInfo {
            remaining: 4999,
            reset: u64::MAX,
            limit: 5000,
        };

        assert!(!wait_if_needed(&info).await);
    }

    #[tokio::test]
    async fn no_wait_when_reset_already_passed() {
        let info = RateLimitInfo {
            remaining: 1,
            reset: 0,
            limit: 5000,
        };

        assert!(!wait_if_needed(&info).await);
    }
}
