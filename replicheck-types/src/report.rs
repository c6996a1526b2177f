//! The reconciliation report aggregate.
//!
//! Built incrementally by the orchestrator, merged from worker partial
//! results in any completion order, then finalized into canonical sorted
//! order before it reaches the report sink.

use crate::diff::DiffEntry;
use crate::entity::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Existence-level comparison of two name sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistenceResult {
    /// Names present only in source A.
    pub unique_to_a: BTreeSet<String>,
    /// Names present only in source B.
    pub unique_to_b: BTreeSet<String>,
    /// Names present in both sources.
    pub common: BTreeSet<String>,
}

impl ExistenceResult {
    /// Number of names present in both sources.
    #[must_use]
    pub fn matched(&self) -> usize {
        self.common.len()
    }

    /// True if either side holds names the other lacks.
    #[must_use]
    pub fn has_mismatch(&self) -> bool {
        !self.unique_to_a.is_empty() || !self.unique_to_b.is_empty()
    }
}

/// Detail comparison of one entity present in both sources.
///
/// An empty `entries` means the pair was identical under the run's
/// exclusion policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDiff {
    pub kind: EntityKind,
    /// Parent collection for indexes and documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    pub key: String,
    pub entries: Vec<DiffEntry>,
}

impl EntityDiff {
    /// Stable sort key: (kind, collection, entity key).
    #[must_use]
    pub fn sort_key(&self) -> (EntityKind, Option<&String>, &String) {
        (self.kind, self.collection.as_ref(), &self.key)
    }
}

/// Document counts for one collection on each source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionCounts {
    pub count_a: u64,
    pub count_b: u64,
}

impl CollectionCounts {
    /// True if the two sources disagree.
    #[must_use]
    pub fn mismatch(&self) -> bool {
        self.count_a != self.count_b
    }
}

/// A per-item comparison that was skipped because of a fetch failure.
///
/// Skips never stop the run; every one is surfaced in the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipNote {
    /// Where the skip happened, e.g. `count:users` or `document:users/42`.
    pub context: String,
    /// Which source failed.
    pub source: String,
    /// The failure cause, as reported by the source.
    pub cause: String,
}

/// Aggregate counts over a finalized report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub existence_mismatches: usize,
    pub count_mismatches: usize,
    pub entities_with_differences: usize,
    pub documents_with_differences: usize,
    pub skips: usize,
    pub incomplete: bool,
}

/// The root aggregate produced by one reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub label_a: String,
    pub label_b: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Per-kind existence results for the schema phase.
    pub existence: BTreeMap<EntityKind, ExistenceResult>,
    /// Detail diffs for schema entities present in both sources.
    pub entity_diffs: Vec<EntityDiff>,
    /// Per-collection document counts.
    pub collection_counts: BTreeMap<String, CollectionCounts>,
    /// Per-collection index existence comparison.
    pub index_existence: BTreeMap<String, ExistenceResult>,
    /// Detail diffs for indexes present on both sides.
    pub index_diffs: Vec<EntityDiff>,
    /// Per-collection existence comparison over the sampled document keys.
    pub document_existence: BTreeMap<String, ExistenceResult>,
    /// Diffs for the recency-sampled documents.
    pub recent_document_diffs: Vec<EntityDiff>,
    /// Diffs for the uniformly-sampled documents.
    pub random_document_diffs: Vec<EntityDiff>,
    /// Per-item comparisons skipped due to fetch failures.
    pub skips: Vec<SkipNote>,
    /// True when the run was cancelled before completing every phase.
    pub incomplete: bool,
}

impl ReconciliationReport {
    /// Starts an empty report for two labelled sources.
    pub fn new(label_a: impl Into<String>, label_b: impl Into<String>) -> Self {
        Self {
            label_a: label_a.into(),
            label_b: label_b.into(),
            started_at: Utc::now(),
            finished_at: None,
            existence: BTreeMap::new(),
            entity_diffs: Vec::new(),
            collection_counts: BTreeMap::new(),
            index_existence: BTreeMap::new(),
            index_diffs: Vec::new(),
            document_existence: BTreeMap::new(),
            recent_document_diffs: Vec::new(),
            random_document_diffs: Vec::new(),
            skips: Vec::new(),
            incomplete: false,
        }
    }

    /// Sorts completion-ordered lists into canonical order and stamps the
    /// finish time. The report is read-only after this.
    pub fn finalize(&mut self) {
        self.entity_diffs
            .sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.index_diffs
            .sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.recent_document_diffs
            .sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.random_document_diffs
            .sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.skips.sort_by(|a, b| {
            (&a.context, &a.source)
                .cmp(&(&b.context, &b.source))
        });
        self.finished_at = Some(Utc::now());
    }

    /// Aggregate counts for the summary section.
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        let existence_mismatches = self
            .existence
            .values()
            .chain(self.index_existence.values())
            .chain(self.document_existence.values())
            .filter(|e| e.has_mismatch())
            .count();
        let count_mismatches = self
            .collection_counts
            .values()
            .filter(|c| c.mismatch())
            .count();
        let entities_with_differences = self
            .entity_diffs
            .iter()
            .chain(self.index_diffs.iter())
            .filter(|d| !d.entries.is_empty())
            .count();
        let documents_with_differences = self
            .recent_document_diffs
            .iter()
            .chain(self.random_document_diffs.iter())
            .filter(|d| !d.entries.is_empty())
            .count();
        ReportSummary {
            existence_mismatches,
            count_mismatches,
            entities_with_differences,
            documents_with_differences,
            skips: self.skips.len(),
            incomplete: self.incomplete,
        }
    }
}
