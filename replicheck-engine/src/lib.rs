//! Reconciliation engine for replicheck.
//!
//! Compares two entity sources and produces a structured
//! `ReconciliationReport`. The engine has no opinion about how entities are
//! fetched (see `replicheck-source`) or how reports are rendered (see
//! `replicheck-report`).
//!
//! # Components
//!
//! - **Normalizer**: canonical, key-order-independent form of an entity body
//! - **Differ**: field-level differences under an exclusion policy
//! - **Set reconciler**: existence-level symmetric difference
//! - **Sampler**: bounded recency or seeded-uniform document samples
//! - **Resilient fetch**: bounded retry with exponential backoff
//! - **Orchestrator**: sequences the phases and bounds concurrency
//!
//! # Run shape
//!
//! `Init → ComparingSchemaEntities → ComparingCollections →
//! ComparingDocumentSamples → Finalized`, strictly sequential. Per-item
//! fetch failures become skip notes in the report; only an unreachable
//! source at startup or cancellation ends a run early.

mod config;
mod differ;
mod error;
mod normalize;
mod orchestrator;
mod retry;
mod sampler;
mod setrec;

pub use config::RunConfig;
pub use differ::{diff, DiffOptions, MAX_DIFF_DEPTH};
pub use error::{EngineError, EngineResult};
pub use normalize::{normalize, CanonicalForm};
pub use orchestrator::Reconciler;
pub use retry::{resilient_fetch, FetchOutcome, RetryPolicy};
pub use sampler::{sample_keys, SamplePolicy};
pub use setrec::reconcile_names;
