//! Index maintenance across all record attributes
//!
//! The [`Indexer`] owns one [`FieldIndex`] per top-level attribute and keeps
//! them consistent with record state: for every rid whose record contains
//! `a = v`, the rid is in `indices[a][v]`, and in no other bucket of that
//! index. The primary-key attribute is not indexed; the rid map already
//! resolves it.

use crate::index::FieldIndex;
use lode_core::{Record, Rid};
use rustc_hash::{FxHashMap, FxHashSet};

/// Manages the per-attribute indices for a store
#[derive(Debug, Default)]
pub struct Indexer {
    indices: FxHashMap<String, FieldIndex>,
    /// Which attributes each rid currently has indexed
    indexed_keys: FxHashMap<Rid, FxHashSet<String>>,
}

impl Indexer {
    /// Create an empty indexer
    pub fn new() -> Self {
        Indexer::default()
    }

    /// Look up the index for an attribute, if any record has carried it
    pub fn index(&self, attr: &str) -> Option<&FieldIndex> {
        self.indices.get(attr)
    }

    /// Add the rid to the index of every given attribute of the record
    pub fn insert<'a>(
        &mut self,
        rid: &Rid,
        record: &Record,
        keys: impl IntoIterator<Item = &'a str>,
    ) {
        let indexed = self.indexed_keys.entry(rid.clone()).or_default();
        for key in keys {
            let Some(value) = record.get(key) else {
                continue;
            };
            indexed.insert(key.to_string());
            // Lazily create the index on first sighting of the attribute.
            self.indices
                .entry(key.to_string())
                .or_default()
                .insert(value.clone(), rid.clone());
        }
    }

    /// Remove the rid from the index of every given attribute
    ///
    /// `record` must still hold the values under which the rid was indexed.
    /// Passing `None` for `keys` removes the rid from every index it is in.
    pub fn remove(&mut self, rid: &Rid, record: &Record, keys: Option<&FxHashSet<String>>) {
        let Some(indexed) = self.indexed_keys.get_mut(rid) else {
            return;
        };
        let targets: Vec<String> = match keys {
            Some(keys) => indexed.intersection(keys).cloned().collect(),
            None => indexed.iter().cloned().collect(),
        };

        for key in &targets {
            indexed.remove(key);
            if let Some(index) = self.indices.get_mut(key) {
                if let Some(value) = record.get(key) {
                    index.remove(value, rid);
                }
                if index.is_empty() {
                    self.indices.remove(key);
                }
            }
        }

        if indexed.is_empty() {
            self.indexed_keys.remove(rid);
        }
    }

    /// Rewrite index entries for the attributes that changed between the old
    /// and new copies of a record
    pub fn update(
        &mut self,
        rid: &Rid,
        old_record: &Record,
        new_record: &Record,
        keys: &FxHashSet<String>,
    ) {
        // Split into attributes already indexed (stale entries to rewrite)
        // and attributes this rid has not carried before.
        let indexed = self.indexed_keys.get(rid).cloned().unwrap_or_default();
        let stale: FxHashSet<String> = indexed.intersection(keys).cloned().collect();
        let fresh: Vec<&str> = keys
            .iter()
            .filter(|k| !indexed.contains(*k))
            .map(|k| k.as_str())
            .collect();

        if !stale.is_empty() {
            self.remove(rid, old_record, Some(&stale));
            self.insert(rid, new_record, stale.iter().map(|k| k.as_str()));
        }
        self.insert(rid, new_record, fresh);
    }

    /// Number of live indices
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Check whether no attribute is indexed
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
