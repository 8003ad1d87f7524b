//! The record store
//!
//! [`Store`] owns records by stable rid, maintains the per-attribute indices
//! through every mutation, and hands out identity-preserving live views.
//!
//! ## Locking
//!
//! One reader-writer lock guards the record map and the indices together.
//! Reads (gets, query execution, transaction reads from base) take the read
//! side; direct writes and transaction commit take the write side, so a
//! commit is atomic from any reader's point of view. The identity map is a
//! separate concurrent map and is never held across the state lock.

use crate::indexer::Indexer;
use crate::query::{Query, QuerySource};
use crate::transaction::Transaction;
use crate::view::{RecordView, ViewBackend};
use dashmap::DashMap;
use indexmap::IndexMap;
use lode_core::{LodeError, Record, Result, Rid, Symbol, SymbolicPath};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Record map plus indices, guarded together by the store lock
#[derive(Debug, Default)]
pub(crate) struct StoreState {
    pub(crate) records: FxHashMap<Rid, Record>,
    pub(crate) indexer: Indexer,
}

impl StoreState {
    /// Every live rid
    pub(crate) fn all_rids(&self) -> FxHashSet<Rid> {
        self.records.keys().cloned().collect()
    }

    /// Insert a brand-new record under the given rid
    pub(crate) fn apply_create(&mut self, pkey: &str, rid: Rid, record: Record) -> Result<()> {
        if self.records.contains_key(&rid) {
            return Err(LodeError::duplicate(rid));
        }
        let keys: Vec<&str> = record.keys().filter(|k| *k != pkey).collect();
        self.indexer.insert(&rid, &record, keys);
        self.records.insert(rid, record);
        Ok(())
    }

    /// Merge a patch into an existing record, reindexing the patched keys
    ///
    /// The primary-key attribute cannot be rewritten; it is dropped from the
    /// patch if present.
    pub(crate) fn apply_update(&mut self, pkey: &str, rid: &Rid, mut changes: Record) -> Result<()> {
        changes.remove(pkey);
        let old = self
            .records
            .get(rid)
            .cloned()
            .ok_or_else(|| LodeError::not_found(rid.clone()))?;

        let changed: FxHashSet<String> = changes.keys().map(|k| k.to_string()).collect();
        let mut new = old.clone();
        new.merge(changes);

        self.indexer.update(rid, &old, &new, &changed);
        self.records.insert(rid.clone(), new);
        Ok(())
    }

    /// Replace a record wholesale, rewriting every index entry
    ///
    /// Commit uses this to apply overlay state, which may have dropped
    /// attributes the patch-based update path cannot express.
    pub(crate) fn apply_replace(&mut self, pkey: &str, rid: &Rid, record: Record) -> Result<()> {
        let old = self
            .records
            .remove(rid)
            .ok_or_else(|| LodeError::not_found(rid.clone()))?;
        self.indexer.remove(rid, &old, None);
        self.apply_create(pkey, rid.clone(), record)
    }

    /// Remove a record from the map and from every index
    pub(crate) fn apply_delete(&mut self, rid: &Rid) -> Result<Record> {
        let record = self
            .records
            .remove(rid)
            .ok_or_else(|| LodeError::not_found(rid.clone()))?;
        self.indexer.remove(rid, &record, None);
        Ok(record)
    }

    /// Drop the named attributes from a record and from their indices
    pub(crate) fn apply_delete_attrs(&mut self, pkey: &str, rid: &Rid, keys: &[String]) -> Result<()> {
        let record = self
            .records
            .get(rid)
            .ok_or_else(|| LodeError::not_found(rid.clone()))?
            .clone();

        let targets: FxHashSet<String> = keys
            .iter()
            .filter(|k| k.as_str() != pkey)
            .cloned()
            .collect();

        // Index entries first: removal needs the values still on the record.
        self.indexer.remove(rid, &record, Some(&targets));

        let stored = self
            .records
            .get_mut(rid)
            .ok_or_else(|| LodeError::not_found(rid.clone()))?;
        for key in &targets {
            stored.remove(key);
        }
        Ok(())
    }
}

/// Interior of a store, shared by handles, views, and transactions
pub(crate) struct StoreInner {
    pub(crate) pkey: String,
    pub(crate) state: RwLock<StoreState>,
    /// Identity map: at most one live view per rid
    pub(crate) views: DashMap<Rid, Weak<RecordView>>,
    next_rid: AtomicI64,
}

impl StoreInner {
    /// Fetch or fabricate the one live view for a rid
    pub(crate) fn view_for(this: &Arc<Self>, rid: &Rid) -> Arc<RecordView> {
        let fabricate =
            || Arc::new(RecordView::new(rid.clone(), ViewBackend::Store(Arc::downgrade(this))));
        match this.views.entry(rid.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                if let Some(existing) = entry.get().upgrade() {
                    existing
                } else {
                    let view = fabricate();
                    entry.insert(Arc::downgrade(&view));
                    view
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let view = fabricate();
                entry.insert(Arc::downgrade(&view));
                view
            }
        }
    }

    /// Run a closure against the current record state for a rid
    pub(crate) fn with_record<T>(&self, rid: &Rid, f: impl FnOnce(&Record) -> T) -> Result<T> {
        let state = self.state.read();
        state
            .records
            .get(rid)
            .map(f)
            .ok_or_else(|| LodeError::not_found(rid.clone()))
    }

    /// Merge a patch into a record under the write lock
    pub(crate) fn update(&self, rid: &Rid, changes: Record) -> Result<()> {
        self.state.write().apply_update(&self.pkey, rid, changes)
    }

    /// Delete a record under the write lock and eject its view
    pub(crate) fn delete(&self, rid: &Rid) -> Result<()> {
        self.state.write().apply_delete(rid)?;
        self.views.remove(rid);
        Ok(())
    }

    /// Drop attributes from a record under the write lock
    pub(crate) fn delete_attrs(&self, rid: &Rid, keys: &[String]) -> Result<()> {
        self.state.write().apply_delete_attrs(&self.pkey, rid, keys)
    }

    /// Choose the rid for a record being created: the caller-supplied
    /// primary-key attribute if present, else a fresh monotonic integer
    /// (also written onto the record)
    ///
    /// `taken` reports whether a candidate id is already claimed in the
    /// caller's visible state — base records for direct creates, base plus
    /// overlay writes inside a transaction.
    pub(crate) fn resolve_rid(&self, record: &mut Record, taken: impl Fn(&Rid) -> bool) -> Rid {
        if let Some(id) = record.get(&self.pkey) {
            return Rid::from(id.clone());
        }
        loop {
            let candidate = Rid::from(self.next_rid.fetch_add(1, Ordering::Relaxed));
            // Skip over ids the caller has already claimed explicitly.
            if !taken(&candidate) {
                record.insert(self.pkey.clone(), candidate.value().clone());
                return candidate;
            }
        }
    }
}

impl std::fmt::Debug for StoreInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreInner")
            .field("pkey", &self.pkey)
            .finish_non_exhaustive()
    }
}

/// In-memory, schemaless record store with an index on every attribute
///
/// `Store` is a cheap-to-clone handle; clones share state. See the crate
/// docs for a usage tour.
#[derive(Debug, Clone)]
pub struct Store {
    pub(crate) inner: Arc<StoreInner>,
}

impl Default for Store {
    fn default() -> Self {
        Store::new()
    }
}

impl Store {
    /// Create an empty store with `"id"` as the primary-key attribute
    pub fn new() -> Store {
        Store::with_primary_key("id")
    }

    /// Create an empty store with a custom primary-key attribute
    pub fn with_primary_key(pkey: impl Into<String>) -> Store {
        Store {
            inner: Arc::new(StoreInner {
                pkey: pkey.into(),
                state: RwLock::new(StoreState::default()),
                views: DashMap::new(),
                next_rid: AtomicI64::new(1),
            }),
        }
    }

    /// The primary-key attribute name
    pub fn primary_key(&self) -> &str {
        &self.inner.pkey
    }

    /// A fresh symbol for building predicates
    pub fn symbol() -> Symbol {
        Symbol::new()
    }

    /// The symbol naming "the row under test" in queries on this store
    pub fn row(&self) -> Symbol {
        Symbol::new()
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.inner.state.read().records.len()
    }

    /// Check whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether a rid is live
    pub fn contains(&self, rid: &Rid) -> bool {
        self.inner.state.read().records.contains_key(rid)
    }

    /// Insert one record, returning its rid
    ///
    /// The rid comes from the record's primary-key attribute when present,
    /// else the store assigns a fresh monotonic integer. Fails with
    /// `Duplicate` if the id is already live.
    pub fn create(&self, record: Record) -> Result<Rid> {
        let mut rids = self.create_many(vec![record])?;
        Ok(rids.pop().expect("create_many returned one rid per record"))
    }

    /// Insert multiple records atomically
    ///
    /// On a mid-batch failure every prior insert from this call is rolled
    /// back before the error surfaces.
    pub fn create_many(&self, records: Vec<Record>) -> Result<Vec<Rid>> {
        let mut state = self.inner.state.write();
        let mut created: Vec<Rid> = Vec::with_capacity(records.len());

        for mut record in records {
            let rid = self
                .inner
                .resolve_rid(&mut record, |rid| state.records.contains_key(rid));
            if let Err(err) = state.apply_create(&self.inner.pkey, rid.clone(), record) {
                // Unwind this call's inserts before surfacing the error.
                for done in &created {
                    let _ = state.apply_delete(done);
                }
                return Err(err);
            }
            created.push(rid);
        }

        debug!(count = created.len(), "created records");
        Ok(created)
    }

    /// Fetch the live view for a rid
    ///
    /// Repeated gets return the same view object while any handle to it is
    /// alive (identity preservation).
    pub fn get(&self, rid: &Rid) -> Result<Arc<RecordView>> {
        if !self.contains(rid) {
            return Err(LodeError::not_found(rid.clone()));
        }
        Ok(StoreInner::view_for(&self.inner, rid))
    }

    /// Fetch live views for multiple rids; missing rids are omitted
    pub fn get_many<'a>(
        &self,
        rids: impl IntoIterator<Item = &'a Rid>,
    ) -> IndexMap<Rid, Arc<RecordView>> {
        let mut out = IndexMap::new();
        for rid in rids {
            if self.contains(rid) {
                out.insert(rid.clone(), StoreInner::view_for(&self.inner, rid));
            }
        }
        out
    }

    /// Merge a patch into a record, reindexing exactly the patched keys
    pub fn update(&self, rid: &Rid, changes: Record) -> Result<()> {
        self.inner.update(rid, changes)
    }

    /// Apply per-record patches under one lock acquisition
    ///
    /// Rids missing from the store are skipped; the number of records
    /// actually patched is returned.
    pub fn update_many(&self, changes: impl IntoIterator<Item = (Rid, Record)>) -> Result<usize> {
        let mut state = self.inner.state.write();
        let mut patched = 0;
        for (rid, patch) in changes {
            if state.records.contains_key(&rid) {
                state.apply_update(&self.inner.pkey, &rid, patch)?;
                patched += 1;
            }
        }
        Ok(patched)
    }

    /// Delete a record, removing it from every index and invalidating its
    /// live view
    pub fn delete(&self, rid: &Rid) -> Result<()> {
        self.inner.delete(rid)?;
        debug!(%rid, "deleted record");
        Ok(())
    }

    /// Delete multiple records; missing rids are skipped
    ///
    /// Returns the number of records actually deleted.
    pub fn delete_many<'a>(&self, rids: impl IntoIterator<Item = &'a Rid>) -> usize {
        let mut state = self.inner.state.write();
        let mut deleted = 0;
        for rid in rids {
            if state.apply_delete(rid).is_ok() {
                self.inner.views.remove(rid);
                deleted += 1;
            }
        }
        deleted
    }

    /// Drop the named attributes from a record and from their indices
    pub fn delete_attrs<K: Into<String>>(
        &self,
        rid: &Rid,
        keys: impl IntoIterator<Item = K>,
    ) -> Result<()> {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        self.inner.delete_attrs(rid, &keys)
    }

    /// Drop every record and index
    pub fn clear(&self) {
        let mut state = self.inner.state.write();
        state.records.clear();
        state.indexer = Indexer::new();
        self.inner.views.clear();
    }

    /// Start building a query over this store
    ///
    /// `paths` is the projection; pass `[]` to select whole records.
    pub fn select(&self, paths: impl IntoIterator<Item = SymbolicPath>) -> Query {
        Query::new(QuerySource::Store(self.clone())).select(paths)
    }

    /// Open a transaction over this store
    pub fn transaction(&self) -> Transaction {
        Transaction::begin(self.clone())
    }

    /// Run a closure inside a transaction
    ///
    /// Commits when the closure returns `Ok`, rolls back and re-surfaces the
    /// error unchanged when it returns `Err`.
    pub fn with_transaction<T>(&self, f: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
        let tx = self.transaction();
        match f(&tx) {
            Ok(value) => {
                if tx.status() == crate::transaction::TxStatus::Active {
                    tx.commit()?;
                }
                Ok(value)
            }
            Err(err) => {
                if tx.status() == crate::transaction::TxStatus::Active {
                    tx.rollback()?;
                }
                Err(err)
            }
        }
    }

}
