//! Engine error types.

use replicheck_types::SourceError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can end a reconciliation run or a sampler call.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A source failure that escaped the per-item boundary (startup ping,
    /// or a precondition violation).
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The sampler was asked for a non-empty sample of an empty population.
    #[error("insufficient population: nothing to sample")]
    InsufficientPopulation,
}
