//! Run configuration.
//!
//! Constructed once by the caller (the CLI, or a test) and passed down by
//! reference; comparison logic never reads ambient configuration.

use crate::differ::DiffOptions;
use crate::retry::RetryPolicy;
use replicheck_types::ExclusionPath;
use std::collections::BTreeSet;

/// Configuration for one reconciliation run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Recency-sample size per collection.
    pub recent_sample_size: usize,
    /// Uniform-random sample size per collection.
    pub random_sample_size: usize,
    /// Seed for the uniform sampler, so runs are reproducible.
    pub random_seed: u64,
    /// Worker-pool cap for concurrent per-collection comparisons.
    pub concurrency: usize,
    /// Retry/backoff parameters for per-item fetches.
    pub retry: RetryPolicy,
    /// Paths omitted from detail comparison on both sides.
    pub exclusions: BTreeSet<ExclusionPath>,
    /// Compare sequence-valued fields as multisets (the default).
    pub order_insensitive_sequences: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            recent_sample_size: 10,
            random_sample_size: 5,
            random_seed: 0,
            concurrency: 8,
            retry: RetryPolicy::default(),
            // ArangoDB revision and id fields differ across instances by
            // construction; comparing them would flag every document.
            exclusions: ["_rev", "_id"].iter().map(|p| ExclusionPath::new(p)).collect(),
            order_insensitive_sequences: true,
        }
    }
}

impl RunConfig {
    /// The diff policy implied by this configuration.
    #[must_use]
    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            exclusions: self.exclusions.clone(),
            order_insensitive_sequences: self.order_insensitive_sequences,
        }
    }
}
