//! Bounded retry with exponential backoff.

use replicheck_types::SourceError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry behavior for one fetch call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1).
    pub max_attempts: u32,
    /// Backoff is `base_delay * 2^attempt`, attempt counted from 0.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

/// Outcome of a resilient fetch. Never an error: exhausted retries become
/// an explicit `Unavailable` so the orchestrator can skip one comparison
/// and keep the run going.
#[derive(Debug)]
pub enum FetchOutcome<T> {
    Fetched(T),
    Unavailable { attempts: u32, cause: SourceError },
}

impl<T> FetchOutcome<T> {
    /// Converts to an `Option`, discarding the failure detail.
    pub fn ok(self) -> Option<T> {
        match self {
            FetchOutcome::Fetched(value) => Some(value),
            FetchOutcome::Unavailable { .. } => None,
        }
    }
}

/// Runs `op` with at most `policy.max_attempts` tries.
///
/// Transient failures wait `base_delay * 2^attempt` (non-blocking) and
/// retry; permanent failures stop immediately. The returned future is safe
/// to race against a cancellation signal: backoff waits are plain
/// `tokio::time::sleep`s.
pub async fn resilient_fetch<T, F, Fut>(policy: RetryPolicy, mut op: F) -> FetchOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return FetchOutcome::Fetched(value),
            Err(cause) if cause.is_transient() && attempt + 1 < max_attempts => {
                let delay = policy.base_delay * 2u32.saturating_pow(attempt);
                debug!(attempt, ?delay, %cause, "transient fetch failure, backing off");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(cause) => {
                let attempts = attempt + 1;
                warn!(attempts, %cause, "fetch unavailable");
                return FetchOutcome::Unavailable { attempts, cause };
            }
        }
    }
}
