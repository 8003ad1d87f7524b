//! Ordered per-attribute index
//!
//! A [`FieldIndex`] maps every value an attribute has taken to the set of
//! rids holding that value, in the canonical value order. Point, range, and
//! membership lookups are the building blocks the query planner compiles
//! predicates into.

use lode_core::{Rid, Value};
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Sorted map from attribute value to the rids holding it
#[derive(Debug, Default)]
pub struct FieldIndex {
    buckets: BTreeMap<Value, FxHashSet<Rid>>,
}

impl FieldIndex {
    /// Create an empty index
    pub fn new() -> Self {
        FieldIndex {
            buckets: BTreeMap::new(),
        }
    }

    /// Number of distinct values in the index
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Check whether the index has no buckets
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Add a rid under a value
    pub fn insert(&mut self, value: Value, rid: Rid) {
        self.buckets.entry(value).or_default().insert(rid);
    }

    /// Remove a rid from a value's bucket, pruning the bucket if it empties
    pub fn remove(&mut self, value: &Value, rid: &Rid) {
        if let Some(bucket) = self.buckets.get_mut(value) {
            bucket.remove(rid);
            if bucket.is_empty() {
                self.buckets.remove(value);
            }
        }
    }

    /// The rids at exactly this value
    pub fn point(&self, value: &Value) -> FxHashSet<Rid> {
        self.buckets.get(value).cloned().unwrap_or_default()
    }

    /// Union of rid-sets over a value interval
    pub fn range(&self, lo: Bound<&Value>, hi: Bound<&Value>) -> FxHashSet<Rid> {
        let mut out = FxHashSet::default();
        for (_, bucket) in self.buckets.range::<Value, _>((lo, hi)) {
            out.extend(bucket.iter().cloned());
        }
        out
    }

    /// Union of rid-sets over each value in the given set
    pub fn membership<'a>(&self, values: impl IntoIterator<Item = &'a Value>) -> FxHashSet<Rid> {
        let mut out = FxHashSet::default();
        for value in values {
            if let Some(bucket) = self.buckets.get(value) {
                out.extend(bucket.iter().cloned());
            }
        }
        out
    }

    /// Union of every rid-set: all rids that carry this attribute at all
    pub fn all(&self) -> FxHashSet<Rid> {
        let mut out = FxHashSet::default();
        for bucket in self.buckets.values() {
            out.extend(bucket.iter().cloned());
        }
        out
    }

    /// All rids except those at exactly the given value
    pub fn all_except(&self, value: &Value) -> FxHashSet<Rid> {
        let mut out = FxHashSet::default();
        for (v, bucket) in &self.buckets {
            if v != value {
                out.extend(bucket.iter().cloned());
            }
        }
        out
    }

    /// Lazy `(value, rids)` pairs in sort order
    pub fn iter_ordered(
        &self,
        descending: bool,
    ) -> Box<dyn Iterator<Item = (&Value, &FxHashSet<Rid>)> + '_> {
        if descending {
            Box::new(self.buckets.iter().rev())
        } else {
            Box::new(self.buckets.iter())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(entries: Vec<(Value, i64)>) -> FieldIndex {
        let mut idx = FieldIndex::new();
        for (value, rid) in entries {
            idx.insert(value, Rid::from(rid));
        }
        idx
    }

    fn rids(set: &FxHashSet<Rid>) -> Vec<i64> {
        let mut out: Vec<i64> = set
            .iter()
            .map(|r| r.value().as_int().expect("int rid"))
            .collect();
        out.sort_unstable();
        out
    }

    #[test]
    fn test_point_lookup() {
        let idx = index_with(vec![
            (Value::Int(10), 1),
            (Value::Int(10), 2),
            (Value::Int(20), 3),
        ]);
        assert_eq!(rids(&idx.point(&Value::Int(10))), vec![1, 2]);
        assert!(idx.point(&Value::Int(99)).is_empty());
    }

    #[test]
    fn test_range_bounds() {
        let idx = index_with(vec![
            (Value::Int(1), 1),
            (Value::Int(2), 2),
            (Value::Int(3), 3),
            (Value::Int(4), 4),
        ]);
        let two = Value::Int(2);
        let four = Value::Int(4);

        let got = idx.range(Bound::Included(&two), Bound::Excluded(&four));
        assert_eq!(rids(&got), vec![2, 3]);

        let got = idx.range(Bound::Excluded(&two), Bound::Unbounded);
        assert_eq!(rids(&got), vec![3, 4]);

        let got = idx.range(Bound::Unbounded, Bound::Included(&two));
        assert_eq!(rids(&got), vec![1, 2]);
    }

    #[test]
    fn test_range_spans_kinds() {
        // Mixed-kind buckets sort by the canonical cross-kind order.
        let idx = index_with(vec![
            (Value::Null, 1),
            (Value::Int(5), 2),
            (Value::from("a"), 3),
        ]);
        let got = idx.range(Bound::Excluded(&Value::Null), Bound::Unbounded);
        assert_eq!(rids(&got), vec![2, 3]);
    }

    #[test]
    fn test_membership_union() {
        let idx = index_with(vec![
            (Value::from("x"), 1),
            (Value::from("y"), 2),
            (Value::from("z"), 3),
        ]);
        let wanted = [Value::from("x"), Value::from("z"), Value::from("q")];
        assert_eq!(rids(&idx.membership(wanted.iter())), vec![1, 3]);
    }

    #[test]
    fn test_all_and_all_except() {
        let idx = index_with(vec![
            (Value::Int(1), 1),
            (Value::Int(1), 2),
            (Value::Int(2), 3),
        ]);
        assert_eq!(rids(&idx.all()), vec![1, 2, 3]);
        assert_eq!(rids(&idx.all_except(&Value::Int(1))), vec![3]);
    }

    #[test]
    fn test_remove_prunes_empty_buckets() {
        let mut idx = index_with(vec![(Value::Int(1), 1), (Value::Int(1), 2)]);
        idx.remove(&Value::Int(1), &Rid::from(1));
        assert_eq!(idx.len(), 1);
        idx.remove(&Value::Int(1), &Rid::from(2));
        assert!(idx.is_empty());
        // Removing from a missing bucket is a no-op.
        idx.remove(&Value::Int(1), &Rid::from(2));
    }

    #[test]
    fn test_iter_ordered_directions() {
        let idx = index_with(vec![
            (Value::Int(2), 2),
            (Value::Int(1), 1),
            (Value::Int(3), 3),
        ]);
        let asc: Vec<&Value> = idx.iter_ordered(false).map(|(v, _)| v).collect();
        assert_eq!(asc, vec![&Value::Int(1), &Value::Int(2), &Value::Int(3)]);

        let desc: Vec<&Value> = idx.iter_ordered(true).map(|(v, _)| v).collect();
        assert_eq!(desc, vec![&Value::Int(3), &Value::Int(2), &Value::Int(1)]);
    }
}
