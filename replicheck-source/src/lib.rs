//! Entity-source adapters for replicheck.
//!
//! A source is one of the two database instances being compared. This crate
//! defines the async [`EntitySource`] trait the engine works against, plus
//! two implementations:
//!
//! - [`ArangoSource`]: HTTP adapter over the ArangoDB REST API
//! - [`MemorySource`]: in-process fixture source for engine tests, with
//!   scripted failures for exercising retry and skip paths
//!
//! Sources are safe for concurrent use by multiple workers; the HTTP client
//! is cloneable and connection-pooled.

mod arango;
mod memory;
mod source;

pub use arango::{ArangoConfig, ArangoSource};
pub use memory::MemorySource;
pub use source::{fetch_entities, DocumentKeyInfo, EntitySource, KeyOrder};
