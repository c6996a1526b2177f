//! Canonical forms for order-insensitive comparison.

use serde_json::{Map, Value};

/// An entity body rebuilt so structural equality is independent of map-key
/// insertion order. Sequence order is preserved; the differ decides whether
/// sequences compare positionally or as multisets.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalForm(Value);

impl CanonicalForm {
    /// The normalized value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Deterministic compact JSON encoding. Same input always yields a
    /// byte-identical string; used for multiset matching and equality at
    /// the diff depth cap.
    #[must_use]
    pub fn canonical_text(&self) -> String {
        // Keys are already sorted; compact encoding is deterministic.
        self.0.to_string()
    }
}

/// Normalizes a value into its canonical form. Pure and deterministic.
#[must_use]
pub fn normalize(value: &Value) -> CanonicalForm {
    CanonicalForm(canonicalize(value))
}

/// Deterministic compact encoding of an arbitrary value, via normalization.
#[must_use]
pub(crate) fn canonical_text_of(value: &Value) -> String {
    canonicalize(value).to_string()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let rebuilt: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect();
            Value::Object(rebuilt)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        scalar => scalar.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_matter() {
        let a: Value = serde_json::from_str(r#"{"b": 1, "a": {"y": 2, "x": 3}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a": {"x": 3, "y": 2}, "b": 1}"#).unwrap();
        assert_eq!(normalize(&a), normalize(&b));
        assert_eq!(normalize(&a).canonical_text(), normalize(&b).canonical_text());
    }

    #[test]
    fn sequence_order_is_preserved() {
        let a = json!({"items": [1, 2, 3]});
        let b = json!({"items": [3, 2, 1]});
        assert_ne!(normalize(&a), normalize(&b));
    }

    #[test]
    fn canonical_text_is_stable() {
        let v = json!({"z": [true, null], "a": "s"});
        let first = normalize(&v).canonical_text();
        let second = normalize(&v).canonical_text();
        assert_eq!(first, second);
        assert_eq!(first, r#"{"a":"s","z":[true,null]}"#);
    }
}
