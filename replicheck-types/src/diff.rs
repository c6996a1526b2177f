//! Diff entries and exclusion paths.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// What changed at one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    /// Same type on both sides, different value.
    ValueChanged,
    /// Different scalar/container type on each side.
    TypeChanged,
    /// Present only on the right side.
    Added,
    /// Present only on the left side.
    Removed,
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiffKind::ValueChanged => "value changed",
            DiffKind::TypeChanged => "type changed",
            DiffKind::Added => "added",
            DiffKind::Removed => "removed",
        };
        f.write_str(s)
    }
}

/// One difference found between two entity representations.
///
/// `left`/`right` carry both values for `ValueChanged`/`TypeChanged`, the
/// left value for `Removed`, and the right value for `Added`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Dot-separated path; array elements as `[i]` (e.g. `fields[0].name`).
    pub path: String,
    pub kind: DiffKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<Value>,
}

impl DiffEntry {
    pub fn value_changed(path: impl Into<String>, left: Value, right: Value) -> Self {
        Self {
            path: path.into(),
            kind: DiffKind::ValueChanged,
            left: Some(left),
            right: Some(right),
        }
    }

    pub fn type_changed(path: impl Into<String>, left: Value, right: Value) -> Self {
        Self {
            path: path.into(),
            kind: DiffKind::TypeChanged,
            left: Some(left),
            right: Some(right),
        }
    }

    pub fn added(path: impl Into<String>, right: Value) -> Self {
        Self {
            path: path.into(),
            kind: DiffKind::Added,
            left: None,
            right: Some(right),
        }
    }

    pub fn removed(path: impl Into<String>, left: Value) -> Self {
        Self {
            path: path.into(),
            kind: DiffKind::Removed,
            left: Some(left),
            right: None,
        }
    }
}

/// A field location deliberately omitted from detail comparison.
///
/// Two matching rules:
/// - a single-segment path (`_rev`) matches that field name at any depth;
/// - a multi-segment path (`properties.locale`) matches exactly that path
///   from the root.
///
/// Exclusion is applied identically to both sides, never asymmetrically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionPath {
    segments: Vec<String>,
}

impl ExclusionPath {
    /// Parses a dot-separated path. Empty segments are dropped.
    pub fn new(path: &str) -> Self {
        Self {
            segments: path
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }

    /// Returns true if a node at `path_segments` should be excluded.
    #[must_use]
    pub fn matches(&self, path_segments: &[&str]) -> bool {
        match self.segments.as_slice() {
            [] => false,
            [single] => path_segments.last() == Some(&single.as_str()),
            multi => {
                multi.len() == path_segments.len()
                    && multi.iter().zip(path_segments).all(|(a, b)| a == b)
            }
        }
    }
}

impl fmt::Display for ExclusionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for ExclusionPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_segment_matches_any_depth() {
        let ex = ExclusionPath::new("_rev");
        assert!(ex.matches(&["_rev"]));
        assert!(ex.matches(&["nested", "deeper", "_rev"]));
        assert!(!ex.matches(&["_rev", "inner"]));
    }

    #[test]
    fn multi_segment_anchors_at_root() {
        let ex = ExclusionPath::new("properties.locale");
        assert!(ex.matches(&["properties", "locale"]));
        assert!(!ex.matches(&["other", "properties", "locale"]));
        assert!(!ex.matches(&["properties"]));
    }

    #[test]
    fn display_roundtrip() {
        let ex = ExclusionPath::new("a.b.c");
        assert_eq!(ex.to_string(), "a.b.c");
        assert_eq!("a.b.c".parse::<ExclusionPath>().unwrap(), ex);
    }
}
