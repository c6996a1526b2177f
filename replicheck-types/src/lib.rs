//! Core type definitions for replicheck.
//!
//! This crate defines the types shared by the source adapters, the
//! reconciliation engine, and the report layer:
//! - Entity kinds, records, and per-kind entity sets
//! - Diff entries and exclusion paths
//! - The reconciliation report aggregate
//! - The error taxonomy (transient vs. permanent source failures)
//!
//! Nothing here performs I/O; all comparison logic lives in
//! `replicheck-engine`.

mod diff;
mod entity;
mod error;
mod report;

pub use diff::{DiffEntry, DiffKind, ExclusionPath};
pub use entity::{EntityKind, EntityRecord, EntitySet};
pub use error::{SourceError, SourceResult};
pub use report::{
    CollectionCounts, EntityDiff, ExistenceResult, ReconciliationReport, ReportSummary, SkipNote,
};
