//! Error taxonomy for entity sources.
//!
//! The transient/permanent split drives retry behavior: `Transient` is
//! retried by the engine's resilient fetch, `Permanent` is recorded as a
//! per-item skip, and `Unavailable` aborts the run at startup only.

use thiserror::Error;

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors a source can report.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The source cannot answer at all (connection refused, bad
    /// credentials). Fatal at startup; never retried per item.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// Precondition violation, e.g. a document fetch without a parent
    /// collection. Fatal to that call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Likely to succeed on retry (timeout, 5xx, rate limit).
    #[error("transient fetch error: {0}")]
    Transient(String),

    /// Will not succeed on retry (not found, bad request).
    #[error("permanent fetch error: {0}")]
    Permanent(String),
}

impl SourceError {
    /// True if the resilient fetch layer should retry this error.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_is_retryable() {
        assert!(SourceError::Transient("timeout".into()).is_transient());
        assert!(!SourceError::Permanent("404".into()).is_transient());
        assert!(!SourceError::Unavailable("refused".into()).is_transient());
        assert!(!SourceError::InvalidArgument("no parent".into()).is_transient());
    }
}
