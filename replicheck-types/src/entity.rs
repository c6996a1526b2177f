//! Entity kinds, records, and per-kind entity sets.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The categories of database object replicheck compares.
///
/// `Collection` and `Edge` are both collections on the wire; they are split
/// so edge collections get their own report section. `Index` and `Document`
/// are scoped to a parent collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Collection,
    Index,
    Analyzer,
    Graph,
    View,
    Document,
    Edge,
}

impl EntityKind {
    /// The kinds compared during the schema phase, in report order.
    pub const SCHEMA_KINDS: [EntityKind; 5] = [
        EntityKind::Collection,
        EntityKind::Edge,
        EntityKind::Analyzer,
        EntityKind::Graph,
        EntityKind::View,
    ];

    /// Returns true for kinds that require a parent collection to fetch.
    #[must_use]
    pub const fn requires_parent(self) -> bool {
        matches!(self, EntityKind::Index | EntityKind::Document)
    }

    /// The report section name for this kind (lowercase plural).
    #[must_use]
    pub const fn section(self) -> &'static str {
        match self {
            EntityKind::Collection => "collections",
            EntityKind::Index => "indexes",
            EntityKind::Analyzer => "analyzers",
            EntityKind::Graph => "graphs",
            EntityKind::View => "views",
            EntityKind::Document => "documents",
            EntityKind::Edge => "edges",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

/// One fetched entity: its key plus the source's stored representation.
///
/// The body is opaque to everything except the normalizer and differ.
/// Records are never mutated after fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Name (schema entities) or primary key (documents). Unique within
    /// its kind and, for indexes/documents, its parent collection.
    pub key: String,
    /// The entity's full representation as returned by the source.
    pub body: Value,
}

impl EntityRecord {
    /// Creates a record from a key and body.
    pub fn new(key: impl Into<String>, body: Value) -> Self {
        Self {
            key: key.into(),
            body,
        }
    }
}

/// A keyed set of entities for one source and one kind.
///
/// Backed by a `BTreeMap` so iteration order is deterministic. Built fresh
/// per comparison run; never cached across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySet(BTreeMap<String, EntityRecord>);

impl EntitySet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, replacing any existing record with the same key.
    pub fn insert(&mut self, record: EntityRecord) {
        self.0.insert(record.key.clone(), record);
    }

    /// Looks up a record by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&EntityRecord> {
        self.0.get(key)
    }

    /// The set of keys present.
    #[must_use]
    pub fn names(&self) -> BTreeSet<String> {
        self.0.keys().cloned().collect()
    }

    /// Number of entities in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the set holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates records in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &EntityRecord)> {
        self.0.iter()
    }
}

impl FromIterator<EntityRecord> for EntitySet {
    fn from_iter<I: IntoIterator<Item = EntityRecord>>(iter: I) -> Self {
        let mut set = Self::new();
        for record in iter {
            set.insert(record);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_section_names() {
        assert_eq!(EntityKind::Collection.section(), "collections");
        assert_eq!(EntityKind::Index.to_string(), "indexes");
        assert_eq!(EntityKind::Edge.section(), "edges");
    }

    #[test]
    fn kind_parent_requirement() {
        assert!(EntityKind::Index.requires_parent());
        assert!(EntityKind::Document.requires_parent());
        assert!(!EntityKind::Collection.requires_parent());
        assert!(!EntityKind::View.requires_parent());
    }

    #[test]
    fn entity_set_names_are_sorted() {
        let set: EntitySet = [
            EntityRecord::new("zeta", json!({})),
            EntityRecord::new("alpha", json!({})),
        ]
        .into_iter()
        .collect();
        let names: Vec<_> = set.names().into_iter().collect();
        assert_eq!(names, ["alpha", "zeta"]);
    }

    #[test]
    fn entity_set_insert_replaces() {
        let mut set = EntitySet::new();
        set.insert(EntityRecord::new("a", json!({"v": 1})));
        set.insert(EntityRecord::new("a", json!({"v": 2})));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("a").unwrap().body, json!({"v": 2}));
    }
}
