//! The reconciliation orchestrator.
//!
//! Sequences the run phases, fans per-collection work out onto a bounded
//! worker pool, and merges immutable worker results into the single report
//! accumulator. Per-item failures become skip notes; only an unreachable
//! source at startup or cancellation ends a run early.

use crate::config::RunConfig;
use crate::differ::{diff, DiffOptions};
use crate::error::EngineResult;
use crate::normalize::normalize;
use crate::retry::{resilient_fetch, FetchOutcome};
use crate::sampler::{sample_keys, SamplePolicy};
use crate::setrec::reconcile_names;
use replicheck_source::{fetch_entities, EntitySource, KeyOrder};
use replicheck_types::{
    CollectionCounts, EntityDiff, EntityKind, EntityRecord, ExistenceResult,
    ReconciliationReport, SkipNote, SourceError,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Orchestrates one reconciliation run between two sources.
pub struct Reconciler {
    source_a: Arc<dyn EntitySource>,
    source_b: Arc<dyn EntitySource>,
    config: Arc<RunConfig>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Per-kind results from the `ComparingSchemaEntities` phase.
struct SchemaOutcome {
    kind: EntityKind,
    existence: Option<ExistenceResult>,
    diffs: Vec<EntityDiff>,
    skips: Vec<SkipNote>,
}

/// Per-collection results from the `ComparingCollections` phase.
struct CollectionOutcome {
    collection: String,
    counts: Option<CollectionCounts>,
    index_existence: Option<ExistenceResult>,
    index_diffs: Vec<EntityDiff>,
    skips: Vec<SkipNote>,
}

/// Per-collection results from the `ComparingDocumentSamples` phase.
struct DocumentOutcome {
    collection: String,
    existence: Option<ExistenceResult>,
    recent_diffs: Vec<EntityDiff>,
    random_diffs: Vec<EntityDiff>,
    skips: Vec<SkipNote>,
}

impl Reconciler {
    /// Creates a reconciler over two sources.
    pub fn new(
        source_a: Arc<dyn EntitySource>,
        source_b: Arc<dyn EntitySource>,
        config: RunConfig,
    ) -> Self {
        Self {
            source_a,
            source_b,
            config: Arc::new(config),
            cancel: None,
        }
    }

    /// Attaches a run-scoped cancellation signal. When the channel value
    /// flips to `true`, in-flight fetches are abandoned and the run
    /// finalizes with whatever partial results were collected.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Runs the full reconciliation.
    ///
    /// Phases are strictly sequential:
    /// `Init → ComparingSchemaEntities → ComparingCollections →
    /// ComparingDocumentSamples → Finalized`. Errors returned here are
    /// fatal setup failures only; discrepancies live in the report.
    pub async fn run(self) -> EngineResult<ReconciliationReport> {
        // Init: both sources must answer at all before we start.
        tokio::try_join!(self.source_a.ping(), self.source_b.ping())?;

        let mut report = ReconciliationReport::new(self.source_a.name(), self.source_b.name());
        info!(
            source_a = self.source_a.name(),
            source_b = self.source_b.name(),
            "reconciliation run starting"
        );

        let collections = self.compare_schema_entities(&mut report).await;

        if !report.incomplete {
            self.compare_collections(&collections, &mut report).await;
        }
        if !report.incomplete {
            self.compare_document_samples(&collections, &mut report)
                .await;
        }

        report.finalize();
        let summary = report.summary();
        info!(
            existence_mismatches = summary.existence_mismatches,
            count_mismatches = summary.count_mismatches,
            skips = summary.skips,
            incomplete = summary.incomplete,
            "reconciliation run finalized"
        );
        Ok(report)
    }

    /// Phase `ComparingSchemaEntities`: existence and detail comparison for
    /// every schema kind, concurrently up to the configured worker cap.
    /// Returns the collection names (document and edge) present in both
    /// sources, which scope the remaining phases.
    async fn compare_schema_entities(&self, report: &mut ReconciliationReport) -> BTreeSet<String> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut workers: JoinSet<SchemaOutcome> = JoinSet::new();
        for kind in EntityKind::SCHEMA_KINDS {
            let source_a = Arc::clone(&self.source_a);
            let source_b = Arc::clone(&self.source_b);
            let config = Arc::clone(&self.config);
            let semaphore = Arc::clone(&semaphore);
            workers.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                compare_one_kind(source_a, source_b, config, kind).await
            });
        }

        let mut collections = BTreeSet::new();
        let cancelled = drain(self.cancel.clone(), &mut workers, |outcome| {
            if let Some(existence) = outcome.existence {
                if matches!(outcome.kind, EntityKind::Collection | EntityKind::Edge) {
                    collections.extend(existence.common.iter().cloned());
                }
                report.existence.insert(outcome.kind, existence);
            }
            report.entity_diffs.extend(outcome.diffs);
            report.skips.extend(outcome.skips);
        })
        .await;
        if cancelled {
            report.incomplete = true;
        }
        collections
    }

    /// Phase `ComparingCollections`: document counts and index comparison
    /// for each collection present in both sources, concurrently up to the
    /// configured worker cap.
    async fn compare_collections(
        &self,
        collections: &BTreeSet<String>,
        report: &mut ReconciliationReport,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut workers: JoinSet<CollectionOutcome> = JoinSet::new();
        for collection in collections {
            let source_a = Arc::clone(&self.source_a);
            let source_b = Arc::clone(&self.source_b);
            let config = Arc::clone(&self.config);
            let semaphore = Arc::clone(&semaphore);
            let collection = collection.clone();
            workers.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                compare_one_collection(source_a, source_b, config, collection).await
            });
        }

        let cancelled = drain(self.cancel.clone(), &mut workers, |outcome| {
            if let Some(counts) = outcome.counts {
                report
                    .collection_counts
                    .insert(outcome.collection.clone(), counts);
            }
            if let Some(existence) = outcome.index_existence {
                report
                    .index_existence
                    .insert(outcome.collection.clone(), existence);
            }
            report.index_diffs.extend(outcome.index_diffs);
            report.skips.extend(outcome.skips);
        })
        .await;
        if cancelled {
            report.incomplete = true;
        }
    }

    /// Phase `ComparingDocumentSamples`: recency and uniform samples per
    /// collection, fetched through the resilient layer and diffed.
    async fn compare_document_samples(
        &self,
        collections: &BTreeSet<String>,
        report: &mut ReconciliationReport,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut workers: JoinSet<DocumentOutcome> = JoinSet::new();
        for collection in collections {
            let source_a = Arc::clone(&self.source_a);
            let source_b = Arc::clone(&self.source_b);
            let config = Arc::clone(&self.config);
            let semaphore = Arc::clone(&semaphore);
            let collection = collection.clone();
            workers.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                compare_collection_documents(source_a, source_b, config, collection).await
            });
        }

        let cancelled = drain(self.cancel.clone(), &mut workers, |outcome| {
            if let Some(existence) = outcome.existence {
                report
                    .document_existence
                    .insert(outcome.collection.clone(), existence);
            }
            report.recent_document_diffs.extend(outcome.recent_diffs);
            report.random_document_diffs.extend(outcome.random_diffs);
            report.skips.extend(outcome.skips);
        })
        .await;
        if cancelled {
            report.incomplete = true;
        }
    }
}

/// Compares existence and detail for one schema kind across both sources.
async fn compare_one_kind(
    source_a: Arc<dyn EntitySource>,
    source_b: Arc<dyn EntitySource>,
    config: Arc<RunConfig>,
    kind: EntityKind,
) -> SchemaOutcome {
    let mut outcome = SchemaOutcome {
        kind,
        existence: None,
        diffs: Vec::new(),
        skips: Vec::new(),
    };
    debug!(%kind, "comparing schema entities");

    let (fetched_a, fetched_b) = tokio::join!(
        resilient_fetch(config.retry, || fetch_entities(source_a.as_ref(), kind, None)),
        resilient_fetch(config.retry, || fetch_entities(source_b.as_ref(), kind, None)),
    );
    let set_a = match fetched_a {
        FetchOutcome::Fetched(set) => set,
        FetchOutcome::Unavailable { cause, .. } => {
            outcome
                .skips
                .push(skip(format!("schema:{kind}"), source_a.name(), &cause));
            return outcome;
        }
    };
    let set_b = match fetched_b {
        FetchOutcome::Fetched(set) => set,
        FetchOutcome::Unavailable { cause, .. } => {
            outcome
                .skips
                .push(skip(format!("schema:{kind}"), source_b.name(), &cause));
            return outcome;
        }
    };

    let existence = reconcile_names(&set_a.names(), &set_b.names());
    let options = config.diff_options();
    for key in &existence.common {
        let empty = serde_json::Value::Null;
        let body_a = set_a.get(key).map_or(&empty, |r| &r.body);
        let body_b = set_b.get(key).map_or(&empty, |r| &r.body);
        outcome.diffs.push(EntityDiff {
            kind,
            collection: None,
            key: key.clone(),
            entries: diff(&normalize(body_a), &normalize(body_b), &options),
        });
    }
    outcome.existence = Some(existence);
    outcome
}

/// Compares counts and indexes for one collection.
async fn compare_one_collection(
    source_a: Arc<dyn EntitySource>,
    source_b: Arc<dyn EntitySource>,
    config: Arc<RunConfig>,
    collection: String,
) -> CollectionOutcome {
    let mut outcome = CollectionOutcome {
        collection: collection.clone(),
        counts: None,
        index_existence: None,
        index_diffs: Vec::new(),
        skips: Vec::new(),
    };

    // O(1) count query on each side; a failure skips only this collection.
    let (count_a, count_b) = tokio::join!(
        resilient_fetch(config.retry, || source_a.count_documents(&collection)),
        resilient_fetch(config.retry, || source_b.count_documents(&collection)),
    );
    match (count_a, count_b) {
        (FetchOutcome::Fetched(a), FetchOutcome::Fetched(b)) => {
            outcome.counts = Some(CollectionCounts {
                count_a: a,
                count_b: b,
            });
        }
        (FetchOutcome::Unavailable { cause, .. }, _) => {
            outcome
                .skips
                .push(skip(format!("count:{collection}"), source_a.name(), &cause));
        }
        (_, FetchOutcome::Unavailable { cause, .. }) => {
            outcome
                .skips
                .push(skip(format!("count:{collection}"), source_b.name(), &cause));
        }
    }

    let (indexes_a, indexes_b) = tokio::join!(
        resilient_fetch(config.retry, || source_a.list_indexes(&collection)),
        resilient_fetch(config.retry, || source_b.list_indexes(&collection)),
    );
    let (set_a, set_b) = match (indexes_a, indexes_b) {
        (FetchOutcome::Fetched(a), FetchOutcome::Fetched(b)) => (a, b),
        (FetchOutcome::Unavailable { cause, .. }, _) => {
            outcome.skips.push(skip(
                format!("indexes:{collection}"),
                source_a.name(),
                &cause,
            ));
            return outcome;
        }
        (_, FetchOutcome::Unavailable { cause, .. }) => {
            outcome.skips.push(skip(
                format!("indexes:{collection}"),
                source_b.name(),
                &cause,
            ));
            return outcome;
        }
    };

    let existence = reconcile_names(&set_a.names(), &set_b.names());
    let options = config.diff_options();
    for name in &existence.common {
        let empty = serde_json::Value::Null;
        let body_a = set_a.get(name).map_or(&empty, |r| &r.body);
        let body_b = set_b.get(name).map_or(&empty, |r| &r.body);
        outcome.index_diffs.push(EntityDiff {
            kind: EntityKind::Index,
            collection: Some(collection.clone()),
            key: name.clone(),
            entries: diff(&normalize(body_a), &normalize(body_b), &options),
        });
    }
    outcome.index_existence = Some(existence);
    outcome
}

/// Samples and compares documents for one collection: a recency pass over
/// both sources, then a seeded uniform pass drawn from source A's key
/// population.
async fn compare_collection_documents(
    source_a: Arc<dyn EntitySource>,
    source_b: Arc<dyn EntitySource>,
    config: Arc<RunConfig>,
    collection: String,
) -> DocumentOutcome {
    let mut outcome = DocumentOutcome {
        collection: collection.clone(),
        existence: None,
        recent_diffs: Vec::new(),
        random_diffs: Vec::new(),
        skips: Vec::new(),
    };
    let options = config.diff_options();

    // Recency pass: sample each side independently, compare key existence,
    // then diff the documents present in both samples.
    let limit = config.recent_sample_size;
    let (keys_a, keys_b) = tokio::join!(
        resilient_fetch(config.retry, || source_a.list_document_keys(
            &collection,
            KeyOrder::RecentFirst,
            Some(limit),
        )),
        resilient_fetch(config.retry, || source_b.list_document_keys(
            &collection,
            KeyOrder::RecentFirst,
            Some(limit),
        )),
    );
    match (keys_a, keys_b) {
        (FetchOutcome::Fetched(population_a), FetchOutcome::Fetched(population_b)) => {
            let policy = SamplePolicy::Recency { limit };
            // Empty collections sample to nothing; that is not an error.
            let sample_a: BTreeSet<String> = sample_keys(&population_a, policy, false)
                .unwrap_or_default()
                .into_iter()
                .collect();
            let sample_b: BTreeSet<String> = sample_keys(&population_b, policy, false)
                .unwrap_or_default()
                .into_iter()
                .collect();
            let existence = reconcile_names(&sample_a, &sample_b);
            for key in existence.common.clone() {
                if let Some(entity_diff) = diff_document_pair(
                    &*source_a,
                    &*source_b,
                    &config,
                    &options,
                    &collection,
                    &key,
                    &mut outcome.skips,
                )
                .await
                {
                    outcome.recent_diffs.push(entity_diff);
                }
            }
            outcome.existence = Some(existence);
        }
        (FetchOutcome::Unavailable { cause, .. }, _) => {
            outcome.skips.push(skip(
                format!("recent_keys:{collection}"),
                source_a.name(),
                &cause,
            ));
        }
        (_, FetchOutcome::Unavailable { cause, .. }) => {
            outcome.skips.push(skip(
                format!("recent_keys:{collection}"),
                source_b.name(),
                &cause,
            ));
        }
    }

    // Uniform pass: seeded draw from source A's full key population.
    let population = resilient_fetch(config.retry, || {
        source_a.list_document_keys(&collection, KeyOrder::Unordered, None)
    })
    .await;
    let population = match population {
        FetchOutcome::Fetched(population) => population,
        FetchOutcome::Unavailable { cause, .. } => {
            outcome.skips.push(skip(
                format!("random_keys:{collection}"),
                source_a.name(),
                &cause,
            ));
            return outcome;
        }
    };
    let policy = SamplePolicy::Uniform {
        limit: config.random_sample_size,
        seed: config.random_seed,
    };
    let sampled = sample_keys(&population, policy, false).unwrap_or_default();
    for key in sampled {
        if let Some(entity_diff) = diff_document_pair(
            &*source_a,
            &*source_b,
            &config,
            &options,
            &collection,
            &key,
            &mut outcome.skips,
        )
        .await
        {
            outcome.random_diffs.push(entity_diff);
        }
    }
    outcome
}

/// Fetches one document from both sources and diffs the pair. A document
/// missing on one side is recorded as a skip (the existence comparison
/// already covers sampled-key drift); any other failure is a skip too.
async fn diff_document_pair(
    source_a: &dyn EntitySource,
    source_b: &dyn EntitySource,
    config: &RunConfig,
    options: &DiffOptions,
    collection: &str,
    key: &str,
    skips: &mut Vec<SkipNote>,
) -> Option<EntityDiff> {
    let (doc_a, doc_b) = tokio::join!(
        resilient_fetch(config.retry, || source_a.get_document(collection, key)),
        resilient_fetch(config.retry, || source_b.get_document(collection, key)),
    );
    let (record_a, record_b): (EntityRecord, EntityRecord) = match (doc_a, doc_b) {
        (FetchOutcome::Fetched(a), FetchOutcome::Fetched(b)) => (a, b),
        (FetchOutcome::Unavailable { cause, .. }, _) => {
            skips.push(skip(
                format!("document:{collection}/{key}"),
                source_a.name(),
                &cause,
            ));
            return None;
        }
        (_, FetchOutcome::Unavailable { cause, .. }) => {
            skips.push(skip(
                format!("document:{collection}/{key}"),
                source_b.name(),
                &cause,
            ));
            return None;
        }
    };
    Some(EntityDiff {
        kind: EntityKind::Document,
        collection: Some(collection.to_string()),
        key: key.to_string(),
        entries: diff(&normalize(&record_a.body), &normalize(&record_b.body), options),
    })
}

fn skip(context: String, source: &str, cause: &SourceError) -> SkipNote {
    SkipNote {
        context,
        source: source.to_string(),
        cause: cause.to_string(),
    }
}

/// Resolves when the cancellation signal flips to `true`; pends forever
/// when no signal is attached or the sender is gone.
async fn cancel_signal(rx: Option<watch::Receiver<bool>>) {
    let Some(mut rx) = rx else {
        return std::future::pending::<()>().await;
    };
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending::<()>().await;
        }
    }
}

/// Collects worker results in completion order, racing against the
/// cancellation signal. Returns true if the phase was cancelled; remaining
/// workers are aborted and their in-flight fetches abandoned. Cancellation
/// is polled first, so an already-cancelled run merges nothing.
async fn drain<T: 'static>(
    cancel: Option<watch::Receiver<bool>>,
    workers: &mut JoinSet<T>,
    mut on_item: impl FnMut(T),
) -> bool {
    let cancel = cancel_signal(cancel);
    tokio::pin!(cancel);
    loop {
        tokio::select! {
            biased;
            () = &mut cancel => {
                workers.abort_all();
                return true;
            }
            joined = workers.join_next() => match joined {
                Some(Ok(outcome)) => on_item(outcome),
                Some(Err(join_error)) => {
                    warn!(%join_error, "comparison worker failed");
                }
                None => return false,
            },
        }
    }
}
