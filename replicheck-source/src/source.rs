//! The entity-source trait and the kind-to-fetch dispatch table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use replicheck_types::{EntityKind, EntityRecord, EntitySet, SourceError, SourceResult};

/// Requested ordering for document-key listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrder {
    /// Most recently updated first. Sources without an ordering field
    /// degrade to `Unordered`; callers see that as absent timestamps.
    RecentFirst,
    /// Whatever order the source returns naturally.
    Unordered,
}

/// One document key plus its recency timestamp, when the source has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentKeyInfo {
    pub key: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One of the two database instances being compared.
///
/// Every method may fail with a distinguished transient-vs-permanent
/// [`SourceError`]; the engine decides what is retried and what is skipped.
/// Implementations must be safe for concurrent use by multiple workers.
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// Label used in reports and log lines (e.g. `db1`).
    fn name(&self) -> &str;

    /// Startup reachability check. Failure here aborts the run.
    async fn ping(&self) -> SourceResult<()>;

    /// Document collections, keyed by name.
    async fn list_collections(&self) -> SourceResult<EntitySet>;

    /// Edge collections, keyed by name.
    async fn list_edge_collections(&self) -> SourceResult<EntitySet>;

    /// Indexes of one collection, keyed by index name.
    async fn list_indexes(&self, collection: &str) -> SourceResult<EntitySet>;

    async fn list_analyzers(&self) -> SourceResult<EntitySet>;

    async fn list_graphs(&self) -> SourceResult<EntitySet>;

    async fn list_views(&self) -> SourceResult<EntitySet>;

    /// O(1) document count for one collection; never a full scan.
    async fn count_documents(&self, collection: &str) -> SourceResult<u64>;

    /// Document keys of one collection, optionally recency-ordered and
    /// bounded. An empty collection yields an empty list, not an error.
    async fn list_document_keys(
        &self,
        collection: &str,
        order: KeyOrder,
        limit: Option<usize>,
    ) -> SourceResult<Vec<DocumentKeyInfo>>;

    /// Fetches one document by primary key.
    async fn get_document(&self, collection: &str, key: &str) -> SourceResult<EntityRecord>;
}

/// Fetches the full entity set for one kind from one source.
///
/// `Index` and `Document` require a parent collection; omitting it is an
/// `InvalidArgument`. A kind with zero members yields an empty set.
pub async fn fetch_entities(
    source: &dyn EntitySource,
    kind: EntityKind,
    parent: Option<&str>,
) -> SourceResult<EntitySet> {
    if kind.requires_parent() && parent.is_none() {
        return Err(SourceError::InvalidArgument(format!(
            "{kind} fetch requires a parent collection"
        )));
    }
    match kind {
        EntityKind::Collection => source.list_collections().await,
        EntityKind::Edge => source.list_edge_collections().await,
        EntityKind::Analyzer => source.list_analyzers().await,
        EntityKind::Graph => source.list_graphs().await,
        EntityKind::View => source.list_views().await,
        EntityKind::Index => {
            // parent checked above
            source.list_indexes(parent.unwrap_or_default()).await
        }
        EntityKind::Document => {
            let collection = parent.unwrap_or_default();
            let keys = source
                .list_document_keys(collection, KeyOrder::Unordered, None)
                .await?;
            let mut set = EntitySet::new();
            for info in keys {
                set.insert(source.get_document(collection, &info.key).await?);
            }
            Ok(set)
        }
    }
}
