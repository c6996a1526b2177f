//! Bounded document sampling.

use crate::error::{EngineError, EngineResult};
use rand::rngs::StdRng;
use rand::{seq::index, SeedableRng};
use replicheck_source::DocumentKeyInfo;

/// How to pick a bounded subset of a document population.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplePolicy {
    /// Up to `limit` keys, most recently updated first. Keys without a
    /// recency timestamp sort after all timestamped ones; ties break by
    /// key ascending.
    Recency { limit: usize },
    /// A uniformly-random subset of `min(limit, population)` keys without
    /// replacement, reproducible for a given `seed`.
    Uniform { limit: usize, seed: u64 },
}

/// Selects sample keys from a population.
///
/// An empty or under-sized result is valid; `InsufficientPopulation` is
/// returned only when the caller requires a non-empty sample and the
/// population is empty.
pub fn sample_keys(
    population: &[DocumentKeyInfo],
    policy: SamplePolicy,
    require_non_empty: bool,
) -> EngineResult<Vec<String>> {
    if population.is_empty() {
        if require_non_empty {
            return Err(EngineError::InsufficientPopulation);
        }
        return Ok(Vec::new());
    }

    match policy {
        SamplePolicy::Recency { limit } => {
            let mut ordered: Vec<&DocumentKeyInfo> = population.iter().collect();
            // Option<DateTime> compares None < Some, so descending order
            // pushes untimestamped keys to the end.
            ordered.sort_by(|a, b| {
                b.updated_at
                    .cmp(&a.updated_at)
                    .then_with(|| a.key.cmp(&b.key))
            });
            Ok(ordered
                .into_iter()
                .take(limit)
                .map(|info| info.key.clone())
                .collect())
        }
        SamplePolicy::Uniform { limit, seed } => {
            // Sort first so the draw depends only on key content and seed,
            // not on the order the source listed the population.
            let mut keys: Vec<&str> = population.iter().map(|info| info.key.as_str()).collect();
            keys.sort_unstable();
            let n = limit.min(keys.len());
            let mut rng = StdRng::seed_from_u64(seed);
            let mut picked: Vec<String> = index::sample(&mut rng, keys.len(), n)
                .into_iter()
                .map(|i| keys[i].to_string())
                .collect();
            picked.sort_unstable();
            Ok(picked)
        }
    }
}
