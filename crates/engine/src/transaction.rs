//! Transactions
//!
//! A [`Transaction`] is a write-buffering session over a store. Mutations
//! land in an overlay (rid → pending record state, or a tombstone for a
//! delete) and the base store is untouched until commit. Reads observe the
//! overlay first and fall back to the base store, so a transaction always
//! sees its own writes.
//!
//! Commit takes the store's write lock once, applies every overlay entry,
//! and releases — concurrent readers see the entire pre-commit state or the
//! entire post-commit state, never a mixture. Rollback just discards the
//! overlay. After either, the transaction is closed and every operation
//! fails `TransactionClosed`.
//!
//! Isolation is read-committed with an optimistic overlay: reads may observe
//! other transactions' commits made after this one opened, and there is no
//! write-write conflict detection — the last committer wins.

use crate::query::{Query, QuerySource};
use crate::store::Store;
use crate::view::{RecordView, ViewBackend};
use dashmap::DashMap;
use indexmap::IndexMap;
use lode_core::{LodeError, Record, Result, Rid, Symbol, SymbolicPath};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::sync::{Arc, Weak};
use tracing::debug;
use uuid::Uuid;

/// Lifecycle state of a transaction
///
/// `Committed` and `RolledBack` are terminal; every operation on a
/// transaction in a terminal state fails `TransactionClosed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxStatus {
    /// Open: reads and writes are accepted
    #[default]
    Active,
    /// Commit applied the overlay to the base store
    Committed,
    /// Rollback discarded the overlay
    RolledBack,
}

/// A buffered change for one rid
#[derive(Debug, Clone)]
enum Pending {
    /// Full pending record state (overlay wins over base)
    Write(Record),
    /// The record is deleted in this transaction
    Tombstone,
}

#[derive(Debug, Default)]
struct TxState {
    status: TxStatus,
    /// Insertion-ordered so commit application is deterministic
    overlay: IndexMap<Rid, Pending>,
    /// Attributes written in this transaction; informational
    touched: FxHashSet<String>,
}

impl TxState {
    fn ensure_active(&self) -> Result<()> {
        match self.status {
            TxStatus::Active => Ok(()),
            TxStatus::Committed => Err(LodeError::transaction_closed("committed")),
            TxStatus::RolledBack => Err(LodeError::transaction_closed("rolled back")),
        }
    }
}

/// Interior of a transaction, shared with its views
pub(crate) struct TxInner {
    id: Uuid,
    store: Store,
    state: Mutex<TxState>,
    /// Identity map for transaction-scoped views
    pub(crate) views: DashMap<Rid, Weak<RecordView>>,
}

impl TxInner {
    /// Run a closure against the merged (overlay-over-base) record state
    pub(crate) fn with_record<T>(&self, rid: &Rid, f: impl FnOnce(&Record) -> T) -> Result<T> {
        let state = self.state.lock();
        state.ensure_active()?;
        match state.overlay.get(rid) {
            Some(Pending::Write(record)) => Ok(f(record)),
            Some(Pending::Tombstone) => Err(LodeError::not_found(rid.clone())),
            None => self.store.inner.with_record(rid, f),
        }
    }

    /// Copy-on-write an overlay entry and merge a patch into it
    pub(crate) fn update(&self, rid: &Rid, mut changes: Record) -> Result<()> {
        changes.remove(&self.store.inner.pkey);
        let mut state = self.state.lock();
        state.ensure_active()?;

        let touched: Vec<String> = changes.keys().map(|k| k.to_string()).collect();
        if !state.overlay.contains_key(rid) {
            // First touch: copy the base record into the overlay.
            let base = self.store.inner.with_record(rid, |r| r.clone())?;
            state.overlay.insert(rid.clone(), Pending::Write(base));
        }
        match state.overlay.get_mut(rid) {
            Some(Pending::Write(record)) => record.merge(changes),
            _ => return Err(LodeError::not_found(rid.clone())),
        }
        state.touched.extend(touched);
        Ok(())
    }

    /// Tombstone a record visible to this transaction
    pub(crate) fn delete(&self, rid: &Rid) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_active()?;

        let visible = match state.overlay.get(rid) {
            Some(Pending::Write(_)) => true,
            Some(Pending::Tombstone) => false,
            None => self.store.contains(rid),
        };
        if !visible {
            return Err(LodeError::not_found(rid.clone()));
        }
        state.overlay.insert(rid.clone(), Pending::Tombstone);
        drop(state);
        self.views.remove(rid);
        Ok(())
    }

    /// Drop attributes from the pending state of a record
    pub(crate) fn delete_attrs(&self, rid: &Rid, keys: &[String]) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_active()?;

        if !state.overlay.contains_key(rid) {
            let base = self.store.inner.with_record(rid, |r| r.clone())?;
            state.overlay.insert(rid.clone(), Pending::Write(base));
        }
        let record = match state.overlay.get_mut(rid) {
            Some(Pending::Write(record)) => record,
            _ => return Err(LodeError::not_found(rid.clone())),
        };
        for key in keys {
            if key != &self.store.inner.pkey {
                record.remove(key);
            }
        }
        state.touched.extend(keys.iter().cloned());
        Ok(())
    }

    /// Buffer a new record, choosing its rid like the store would
    pub(crate) fn create(&self, mut record: Record) -> Result<Rid> {
        let mut state = self.state.lock();
        state.ensure_active()?;

        let rid = {
            let base = self.store.inner.state.read();
            // Fresh ids must dodge overlay writes too, or a prior explicit
            // create in this transaction would collide with the counter.
            self.store.inner.resolve_rid(&mut record, |rid| {
                match state.overlay.get(rid) {
                    Some(Pending::Write(_)) => true,
                    // A tombstoned id is free again inside this transaction.
                    Some(Pending::Tombstone) => false,
                    None => base.records.contains_key(rid),
                }
            })
        };

        let exists = match state.overlay.get(&rid) {
            Some(Pending::Write(_)) => true,
            // Recreating over an in-transaction delete is allowed.
            Some(Pending::Tombstone) => false,
            None => self.store.contains(&rid),
        };
        if exists {
            return Err(LodeError::duplicate(rid));
        }

        state
            .touched
            .extend(record.keys().map(|k| k.to_string()));
        state.overlay.insert(rid.clone(), Pending::Write(record));
        Ok(rid)
    }

    /// Fetch or fabricate the one transaction-scoped view for a rid
    pub(crate) fn view_for(this: &Arc<Self>, rid: &Rid) -> Arc<RecordView> {
        let fabricate =
            || Arc::new(RecordView::new(rid.clone(), ViewBackend::Tx(Arc::downgrade(this))));
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

    /// Snapshot the overlay for query execution: pending writes and the
    /// tombstoned rid set
    pub(crate) fn overlay_snapshot(&self) -> Result<(Vec<(Rid, Record)>, FxHashSet<Rid>)> {
        let state = self.state.lock();
        state.ensure_active()?;
        let mut writes = Vec::new();
        let mut tombstones = FxHashSet::default();
        for (rid, pending) in &state.overlay {
            match pending {
                Pending::Write(record) => writes.push((rid.clone(), record.clone())),
                Pending::Tombstone => {
                    tombstones.insert(rid.clone());
                }
            }
        }
        Ok((writes, tombstones))
    }
}

/// Atomic write-buffering session over a [`Store`]
///
/// Cheap to clone; clones share the same overlay. Create one with
/// [`Store::transaction`] or run a scoped one with
/// [`Store::with_transaction`].
#[derive(Clone)]
pub struct Transaction {
    pub(crate) inner: Arc<TxInner>,
}

impl Transaction {
    pub(crate) fn begin(store: Store) -> Transaction {
        let tx = Transaction {
            inner: Arc::new(TxInner {
                id: Uuid::new_v4(),
                store,
                state: Mutex::new(TxState::default()),
                views: DashMap::new(),
            }),
        };
        debug!(tx = %tx.inner.id, "transaction opened");
        tx
    }

    /// Unique id of this transaction (used in log events)
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Current lifecycle state
    pub fn status(&self) -> TxStatus {
        self.inner.state.lock().status
    }

    /// The store this transaction buffers writes for
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    /// A fresh symbol for building predicates
    pub fn symbol() -> Symbol {
        Symbol::new()
    }

    /// The symbol naming "the row under test" in queries on this transaction
    pub fn row(&self) -> Symbol {
        Symbol::new()
    }

    /// Buffer a new record, returning its rid
    pub fn create(&self, record: Record) -> Result<Rid> {
        self.inner.create(record)
    }

    /// Buffer multiple new records; prior creates from this call are undone
    /// on a mid-batch failure
    pub fn create_many(&self, records: Vec<Record>) -> Result<Vec<Rid>> {
        let mut created = Vec::with_capacity(records.len());
        for record in records {
            match self.inner.create(record) {
                Ok(rid) => created.push(rid),
                Err(err) => {
                    let mut state = self.inner.state.lock();
                    for rid in &created {
                        state.overlay.shift_remove(rid);
                    }
                    return Err(err);
                }
            }
        }
        Ok(created)
    }

    /// Fetch the transaction-scoped live view for a rid
    ///
    /// The view reads merged state and writes into the overlay.
    pub fn get(&self, rid: &Rid) -> Result<Arc<RecordView>> {
        self.inner.with_record(rid, |_| ())?;
        Ok(TxInner::view_for(&self.inner, rid))
    }

    /// Fetch views for multiple rids; rids not visible are omitted
    pub fn get_many<'a>(
        &self,
        rids: impl IntoIterator<Item = &'a Rid>,
    ) -> IndexMap<Rid, Arc<RecordView>> {
        let mut out = IndexMap::new();
        for rid in rids {
            if self.inner.with_record(rid, |_| ()).is_ok() {
                out.insert(rid.clone(), TxInner::view_for(&self.inner, rid));
            }
        }
        out
    }

    /// Merge a patch into a record's pending state
    pub fn update(&self, rid: &Rid, changes: Record) -> Result<()> {
        self.inner.update(rid, changes)
    }

    /// Apply per-record patches; rids not visible are skipped
    pub fn update_many(&self, changes: impl IntoIterator<Item = (Rid, Record)>) -> Result<usize> {
        let mut patched = 0;
        for (rid, patch) in changes {
            match self.inner.update(&rid, patch) {
                Ok(()) => patched += 1,
                Err(LodeError::NotFound { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(patched)
    }

    /// Tombstone a record
    pub fn delete(&self, rid: &Rid) -> Result<()> {
        self.inner.delete(rid)
    }

    /// Tombstone multiple records; rids not visible are skipped
    ///
    /// Returns the number of records actually tombstoned.
    pub fn delete_many<'a>(&self, rids: impl IntoIterator<Item = &'a Rid>) -> usize {
        let mut deleted = 0;
        for rid in rids {
            if self.inner.delete(rid).is_ok() {
                deleted += 1;
            }
        }
        deleted
    }

    /// Drop attributes from a record's pending state
    pub fn delete_attrs<K: Into<String>>(
        &self,
        rid: &Rid,
        keys: impl IntoIterator<Item = K>,
    ) -> Result<()> {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        self.inner.delete_attrs(rid, &keys)
    }

    /// Start building a query over this transaction's visible state
    ///
    /// `paths` is the projection; pass `[]` to select whole records.
    pub fn select(&self, paths: impl IntoIterator<Item = SymbolicPath>) -> Query {
        Query::new(QuerySource::Transaction(self.clone())).select(paths)
    }

    /// Apply the overlay to the base store atomically
    ///
    /// Holds the store's write lock for the whole application, so other
    /// readers observe all of this transaction's changes or none of them.
    pub fn commit(&self) -> Result<()> {
        let mut tx_state = self.inner.state.lock();
        tx_state.ensure_active()?;
        let overlay = std::mem::take(&mut tx_state.overlay);

        let pkey = self.inner.store.inner.pkey.clone();
        let mut writes = 0usize;
        let mut deletes = 0usize;
        {
            let mut base = self.inner.store.inner.state.write();
            for (rid, pending) in overlay {
                match pending {
                    Pending::Write(record) => {
                        if base.records.contains_key(&rid) {
                            base.apply_replace(&pkey, &rid, record)?;
                        } else {
                            base.apply_create(&pkey, rid, record)?;
                        }
                        writes += 1;
                    }
                    Pending::Tombstone => {
                        if base.apply_delete(&rid).is_ok() {
                            self.inner.store.inner.views.remove(&rid);
                            deletes += 1;
                        }
                    }
                }
            }
        }

        tx_state.status = TxStatus::Committed;
        debug!(tx = %self.inner.id, writes, deletes, "transaction committed");
        Ok(())
    }

    /// Discard the overlay; the base store was never touched
    pub fn rollback(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        state.ensure_active()?;
        state.overlay.clear();
        state.touched.clear();
        state.status = TxStatus::RolledBack;
        debug!(tx = %self.inner.id, "transaction rolled back");
        Ok(())
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.inner.id)
            .field("status", &self.status())
            .finish()
    }
}
