//! Existence-level reconciliation of two name sets.

use replicheck_types::ExistenceResult;
use std::collections::BTreeSet;

/// Computes the symmetric difference and intersection of two name sets.
///
/// The outputs are pairwise disjoint and their union equals `a ∪ b`.
/// O(|A| + |B|); deterministic (BTree ordering throughout).
#[must_use]
pub fn reconcile_names(a: &BTreeSet<String>, b: &BTreeSet<String>) -> ExistenceResult {
    ExistenceResult {
        unique_to_a: a.difference(b).cloned().collect(),
        unique_to_b: b.difference(a).cloned().collect(),
        common: a.intersection(b).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn partitions_the_union() {
        let a = set(&["users", "orders"]);
        let b = set(&["users", "products"]);
        let result = reconcile_names(&a, &b);

        assert_eq!(result.unique_to_a, set(&["orders"]));
        assert_eq!(result.unique_to_b, set(&["products"]));
        assert_eq!(result.common, set(&["users"]));

        // Disjoint, and the union is A ∪ B.
        assert!(result.unique_to_a.is_disjoint(&result.unique_to_b));
        assert!(result.unique_to_a.is_disjoint(&result.common));
        assert!(result.unique_to_b.is_disjoint(&result.common));
        let mut union = result.unique_to_a.clone();
        union.extend(result.unique_to_b.clone());
        union.extend(result.common.clone());
        let mut expected = a;
        expected.extend(b);
        assert_eq!(union, expected);
    }

    #[test]
    fn identical_sets_have_no_uniques() {
        let a = set(&["x", "y"]);
        let result = reconcile_names(&a, &a.clone());
        assert!(result.unique_to_a.is_empty());
        assert!(result.unique_to_b.is_empty());
        assert_eq!(result.matched(), 2);
    }

    #[test]
    fn empty_sets() {
        let result = reconcile_names(&BTreeSet::new(), &BTreeSet::new());
        assert!(!result.has_mismatch());
        assert_eq!(result.matched(), 0);
    }
}
