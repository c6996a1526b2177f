//! In-memory fixture source for engine tests.
//!
//! Holds per-kind entity maps and supports scripted failures so retry and
//! skip paths can be exercised deterministically: an operation key like
//! `get_document:users/42` can be told to fail N times with a given error
//! before succeeding, or to fail forever.

use crate::source::{DocumentKeyInfo, EntitySource, KeyOrder};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use replicheck_types::{EntityRecord, EntitySet, SourceError, SourceResult};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

struct FailureScript {
    remaining: Option<usize>, // None = fail forever
    error: SourceError,
}

#[derive(Clone)]
struct StoredDocument {
    body: Value,
    updated_at: Option<DateTime<Utc>>,
}

/// Scriptable in-memory entity source.
#[derive(Default)]
pub struct MemorySource {
    label: String,
    collections: EntitySet,
    edges: EntitySet,
    analyzers: EntitySet,
    graphs: EntitySet,
    views: EntitySet,
    indexes: BTreeMap<String, EntitySet>,
    counts: BTreeMap<String, u64>,
    documents: BTreeMap<String, BTreeMap<String, StoredDocument>>,
    failures: Mutex<BTreeMap<String, FailureScript>>,
    calls: AtomicUsize,
}

impl MemorySource {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    // ── Fixture builders ─────────────────────────────────────────

    pub fn with_collection(mut self, name: &str, body: Value) -> Self {
        self.collections.insert(EntityRecord::new(name, body));
        self
    }

    pub fn with_edge_collection(mut self, name: &str, body: Value) -> Self {
        self.edges.insert(EntityRecord::new(name, body));
        self
    }

    pub fn with_analyzer(mut self, name: &str, body: Value) -> Self {
        self.analyzers.insert(EntityRecord::new(name, body));
        self
    }

    pub fn with_graph(mut self, name: &str, body: Value) -> Self {
        self.graphs.insert(EntityRecord::new(name, body));
        self
    }

    pub fn with_view(mut self, name: &str, body: Value) -> Self {
        self.views.insert(EntityRecord::new(name, body));
        self
    }

    pub fn with_index(mut self, collection: &str, name: &str, body: Value) -> Self {
        self.indexes
            .entry(collection.to_string())
            .or_default()
            .insert(EntityRecord::new(name, body));
        self
    }

    /// Overrides the document count reported for a collection. Without an
    /// override the count is the number of stored documents.
    pub fn with_count(mut self, collection: &str, count: u64) -> Self {
        self.counts.insert(collection.to_string(), count);
        self
    }

    pub fn with_document(
        mut self,
        collection: &str,
        key: &str,
        body: Value,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.documents
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), StoredDocument { body, updated_at });
        self
    }

    /// Scripts `op` (e.g. `count:users`, `get_document:users/42`, `ping`)
    /// to fail `times` times with `error` before succeeding.
    pub fn fail_times(self, op: &str, times: usize, error: SourceError) -> Self {
        self.failures.lock().unwrap().insert(
            op.to_string(),
            FailureScript {
                remaining: Some(times),
                error,
            },
        );
        self
    }

    /// Scripts `op` to fail on every call.
    pub fn fail_always(self, op: &str, error: SourceError) -> Self {
        self.failures.lock().unwrap().insert(
            op.to_string(),
            FailureScript {
                remaining: None,
                error,
            },
        );
        self
    }

    /// Total number of source calls made, for retry-count assertions.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, op: &str) -> SourceResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut failures = self.failures.lock().unwrap();
        if let Some(script) = failures.get_mut(op) {
            match script.remaining {
                None => return Err(script.error.clone()),
                Some(0) => {}
                Some(n) => {
                    script.remaining = Some(n - 1);
                    return Err(script.error.clone());
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EntitySource for MemorySource {
    fn name(&self) -> &str {
        &self.label
    }

    async fn ping(&self) -> SourceResult<()> {
        self.check("ping")
    }

    async fn list_collections(&self) -> SourceResult<EntitySet> {
        self.check("list_collections")?;
        Ok(self.collections.clone())
    }

    async fn list_edge_collections(&self) -> SourceResult<EntitySet> {
        self.check("list_edge_collections")?;
        Ok(self.edges.clone())
    }

    async fn list_indexes(&self, collection: &str) -> SourceResult<EntitySet> {
        self.check(&format!("list_indexes:{collection}"))?;
        Ok(self.indexes.get(collection).cloned().unwrap_or_default())
    }

    async fn list_analyzers(&self) -> SourceResult<EntitySet> {
        self.check("list_analyzers")?;
        Ok(self.analyzers.clone())
    }

    async fn list_graphs(&self) -> SourceResult<EntitySet> {
        self.check("list_graphs")?;
        Ok(self.graphs.clone())
    }

    async fn list_views(&self) -> SourceResult<EntitySet> {
        self.check("list_views")?;
        Ok(self.views.clone())
    }

    async fn count_documents(&self, collection: &str) -> SourceResult<u64> {
        self.check(&format!("count:{collection}"))?;
        if let Some(count) = self.counts.get(collection) {
            return Ok(*count);
        }
        Ok(self
            .documents
            .get(collection)
            .map_or(0, |docs| docs.len() as u64))
    }

    async fn list_document_keys(
        &self,
        collection: &str,
        order: KeyOrder,
        limit: Option<usize>,
    ) -> SourceResult<Vec<DocumentKeyInfo>> {
        self.check(&format!("list_document_keys:{collection}"))?;
        let docs = self.documents.get(collection).cloned().unwrap_or_default();
        let mut keys: Vec<DocumentKeyInfo> = docs
            .iter()
            .map(|(key, doc)| DocumentKeyInfo {
                key: key.clone(),
                updated_at: doc.updated_at,
            })
            .collect();
        if order == KeyOrder::RecentFirst {
            // Most recent first, untimestamped last, ties by key.
            keys.sort_by(|a, b| {
                b.updated_at
                    .cmp(&a.updated_at)
                    .then_with(|| a.key.cmp(&b.key))
            });
        }
        if let Some(n) = limit {
            keys.truncate(n);
        }
        Ok(keys)
    }

    async fn get_document(&self, collection: &str, key: &str) -> SourceResult<EntityRecord> {
        self.check(&format!("get_document:{collection}/{key}"))?;
        self.documents
            .get(collection)
            .and_then(|docs| docs.get(key))
            .map(|doc| EntityRecord::new(key, doc.body.clone()))
            .ok_or_else(|| {
                SourceError::Permanent(format!("document {collection}/{key} not found"))
            })
    }
}
