//! Field-level diffing of canonical forms.

use crate::normalize::{canonical_text_of, CanonicalForm};
use replicheck_types::{DiffEntry, ExclusionPath};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Recursion cap. Database entity descriptions are shallow; at the cap the
/// subtrees are compared by canonical text only so self-similar metadata
/// cannot recurse unboundedly.
pub const MAX_DIFF_DEPTH: usize = 64;

/// Diff policy for one run.
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    /// Paths omitted from comparison, applied identically to both sides.
    pub exclusions: BTreeSet<ExclusionPath>,
    /// When set (the default for this system), sequences compare as
    /// multisets: elements match by structural equality regardless of
    /// position, and leftovers are reported as added/removed.
    pub order_insensitive_sequences: bool,
}

impl DiffOptions {
    pub fn order_insensitive(exclusions: BTreeSet<ExclusionPath>) -> Self {
        Self {
            exclusions,
            order_insensitive_sequences: true,
        }
    }
}

/// Computes the differences between two canonical forms.
///
/// Returns an empty vec iff the forms are equal under the exclusion and
/// sequence-order policy. Symmetric up to swapped left/right values.
#[must_use]
pub fn diff(a: &CanonicalForm, b: &CanonicalForm, options: &DiffOptions) -> Vec<DiffEntry> {
    let mut out = Vec::new();
    let mut segments: Vec<String> = Vec::new();
    walk(
        a.value(),
        b.value(),
        &mut segments,
        String::new(),
        0,
        options,
        &mut out,
    );
    out
}

fn excluded(options: &DiffOptions, segments: &[String]) -> bool {
    let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
    options.exclusions.iter().any(|ex| ex.matches(&refs))
}

fn join_field(display: &str, field: &str) -> String {
    if display.is_empty() {
        field.to_string()
    } else {
        format!("{display}.{field}")
    }
}

fn walk(
    a: &Value,
    b: &Value,
    segments: &mut Vec<String>,
    display: String,
    depth: usize,
    options: &DiffOptions,
    out: &mut Vec<DiffEntry>,
) {
    if depth >= MAX_DIFF_DEPTH {
        if canonical_text_of(a) != canonical_text_of(b) {
            out.push(DiffEntry::value_changed(display, a.clone(), b.clone()));
        }
        return;
    }

    match (a, b) {
        (Value::Object(map_a), Value::Object(map_b)) => {
            let keys: BTreeSet<&String> = map_a.keys().chain(map_b.keys()).collect();
            for key in keys {
                segments.push(key.clone());
                if excluded(options, segments) {
                    segments.pop();
                    continue;
                }
                let child_display = join_field(&display, key);
                match (map_a.get(key.as_str()), map_b.get(key.as_str())) {
                    (Some(va), Some(vb)) => {
                        walk(va, vb, segments, child_display, depth + 1, options, out);
                    }
                    (Some(va), None) => out.push(DiffEntry::removed(child_display, va.clone())),
                    (None, Some(vb)) => out.push(DiffEntry::added(child_display, vb.clone())),
                    (None, None) => unreachable!("key came from one of the maps"),
                }
                segments.pop();
            }
        }
        (Value::Array(items_a), Value::Array(items_b)) => {
            if options.order_insensitive_sequences {
                diff_multiset(items_a, items_b, segments, &display, options, out);
            } else {
                diff_positional(items_a, items_b, segments, &display, depth, options, out);
            }
        }
        _ if value_kind(a) != value_kind(b) => {
            out.push(DiffEntry::type_changed(display, a.clone(), b.clone()));
        }
        _ => {
            if a != b {
                out.push(DiffEntry::value_changed(display, a.clone(), b.clone()));
            }
        }
    }
}

/// Order-insensitive sequence comparison: elements are matched by canonical
/// text with excluded subtrees stripped, so the exclusion policy reaches
/// inside sequence elements. Unmatched left elements are removed, unmatched
/// right elements added. Matched elements are never descended into again
/// (they are equal under the exclusion policy).
fn diff_multiset(
    items_a: &[Value],
    items_b: &[Value],
    segments: &mut Vec<String>,
    display: &str,
    options: &DiffOptions,
    out: &mut Vec<DiffEntry>,
) {
    let mut remaining_b: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, item) in items_b.iter().enumerate() {
        remaining_b
            .entry(matching_text(item, segments, options))
            .or_default()
            .push(idx);
    }

    for (idx, item) in items_a.iter().enumerate() {
        let text = matching_text(item, segments, options);
        let matched = remaining_b
            .get_mut(&text)
            .and_then(|indices| indices.pop())
            .is_some();
        if !matched {
            out.push(DiffEntry::removed(format!("{display}[{idx}]"), item.clone()));
        }
    }

    let mut leftover: Vec<usize> = remaining_b.into_values().flatten().collect();
    leftover.sort_unstable();
    for idx in leftover {
        out.push(DiffEntry::added(
            format!("{display}[{idx}]"),
            items_b[idx].clone(),
        ));
    }
}

/// Canonical text used for multiset matching: the element with every
/// excluded subtree removed. Elements equal everywhere except excluded
/// fields therefore match.
fn matching_text(value: &Value, segments: &mut Vec<String>, options: &DiffOptions) -> String {
    if options.exclusions.is_empty() {
        return canonical_text_of(value);
    }
    strip_excluded(value, segments, options).to_string()
}

fn strip_excluded(value: &Value, segments: &mut Vec<String>, options: &DiffOptions) -> Value {
    match value {
        Value::Object(map) => {
            let mut rebuilt = Map::new();
            for (key, child) in map {
                segments.push(key.clone());
                if !excluded(options, segments) {
                    rebuilt.insert(key.clone(), strip_excluded(child, segments, options));
                }
                segments.pop();
            }
            Value::Object(rebuilt)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| strip_excluded(item, segments, options))
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}

fn diff_positional(
    items_a: &[Value],
    items_b: &[Value],
    segments: &mut Vec<String>,
    display: &str,
    depth: usize,
    options: &DiffOptions,
    out: &mut Vec<DiffEntry>,
) {
    let shared = items_a.len().min(items_b.len());
    for idx in 0..shared {
        walk(
            &items_a[idx],
            &items_b[idx],
            segments,
            format!("{display}[{idx}]"),
            depth + 1,
            options,
            out,
        );
    }
    for (idx, item) in items_a.iter().enumerate().skip(shared) {
        out.push(DiffEntry::removed(format!("{display}[{idx}]"), item.clone()));
    }
    for (idx, item) in items_b.iter().enumerate().skip(shared) {
        out.push(DiffEntry::added(format!("{display}[{idx}]"), item.clone()));
    }
}

fn value_kind(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
