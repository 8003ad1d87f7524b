//! Live record views
//!
//! A [`RecordView`] is the handle a store (or transaction) hands out for a
//! record: a `(rid, backend)` pair whose every write funnels back through
//! the owning context, keeping the indices consistent. Views hold only weak
//! references, so they never keep a store alive and never outlive a
//! deletion — any operation after the record is gone fails `NotFound`.
//!
//! One view object exists per rid per context while any handle to it is
//! alive; dropping the last handle ejects it from the identity map and a
//! later `get` fabricates a fresh one bound to the same rid.

use crate::store::StoreInner;
use crate::transaction::TxInner;
use lode_core::{LodeError, Record, Result, Rid, Value};
use std::fmt;
use std::sync::Weak;

/// Where a view's reads and writes resolve
pub(crate) enum ViewBackend {
    /// Directly against the store
    Store(Weak<StoreInner>),
    /// Through a transaction's overlay
    Tx(Weak<TxInner>),
}

/// Identity-preserving handle to one record
///
/// Obtained from [`Store::get`](crate::Store::get),
/// [`Transaction::get`](crate::Transaction::get), or query execution; always
/// behind an `Arc`.
pub struct RecordView {
    rid: Rid,
    backend: ViewBackend,
}

impl RecordView {
    pub(crate) fn new(rid: Rid, backend: ViewBackend) -> Self {
        RecordView { rid, backend }
    }

    /// The rid this view is bound to
    pub fn rid(&self) -> &Rid {
        &self.rid
    }

    /// Run a closure against the current record state
    fn with_record<T>(&self, f: impl FnOnce(&Record) -> T) -> Result<T> {
        match &self.backend {
            ViewBackend::Store(weak) => {
                let inner = weak
                    .upgrade()
                    .ok_or_else(|| LodeError::not_found(self.rid.clone()))?;
                inner.with_record(&self.rid, f)
            }
            ViewBackend::Tx(weak) => {
                let inner = weak
                    .upgrade()
                    .ok_or_else(|| LodeError::not_found(self.rid.clone()))?;
                inner.with_record(&self.rid, f)
            }
        }
    }

    /// Read an attribute; fails with `KeyMissing` if absent
    pub fn get(&self, key: &str) -> Result<Value> {
        self.with_record(|record| record.get(key).cloned())?
            .ok_or_else(|| LodeError::key_missing(self.rid.clone(), key))
    }

    /// Read an attribute, `None` if absent
    pub fn try_get(&self, key: &str) -> Result<Option<Value>> {
        self.with_record(|record| record.get(key).cloned())
    }

    /// Check whether an attribute is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.with_record(|record| record.contains_key(key))
            .unwrap_or(false)
    }

    /// Attribute names in insertion order
    pub fn keys(&self) -> Result<Vec<String>> {
        self.with_record(|record| record.keys().map(|k| k.to_string()).collect())
    }

    /// Number of attributes on the record
    pub fn len(&self) -> Result<usize> {
        self.with_record(|record| record.len())
    }

    /// Check whether the record has no attributes
    pub fn is_empty(&self) -> Result<bool> {
        self.with_record(|record| record.is_empty())
    }

    /// Clone the whole record
    pub fn snapshot(&self) -> Result<Record> {
        self.with_record(|record| record.clone())
    }

    /// Write one attribute, reindexing it
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let mut patch = Record::new();
        patch.insert(key.into(), value.into());
        self.apply_update(patch)
    }

    /// Write several attributes at once, reindexing each
    pub fn update(&self, changes: Record) -> Result<()> {
        self.apply_update(changes)
    }

    /// Return the current value if the attribute is present, else write the
    /// default and return it
    pub fn set_default(&self, key: &str, default: impl Into<Value>) -> Result<Value> {
        if let Some(existing) = self.try_get(key)? {
            return Ok(existing);
        }
        let value = default.into();
        self.set(key, value.clone())?;
        Ok(value)
    }

    /// Remove an attribute from the record, returning its value
    ///
    /// Fails with `KeyMissing` if the attribute is absent.
    pub fn remove(&self, key: &str) -> Result<Value> {
        let value = self.get(key)?;
        match &self.backend {
            ViewBackend::Store(weak) => {
                let inner = weak
                    .upgrade()
                    .ok_or_else(|| LodeError::not_found(self.rid.clone()))?;
                inner.delete_attrs(&self.rid, &[key.to_string()])?;
            }
            ViewBackend::Tx(weak) => {
                let inner = weak
                    .upgrade()
                    .ok_or_else(|| LodeError::not_found(self.rid.clone()))?;
                inner.delete_attrs(&self.rid, &[key.to_string()])?;
            }
        }
        Ok(value)
    }

    /// Delete the record itself; the view is invalid afterwards
    pub fn delete(&self) -> Result<()> {
        match &self.backend {
            ViewBackend::Store(weak) => {
                let inner = weak
                    .upgrade()
                    .ok_or_else(|| LodeError::not_found(self.rid.clone()))?;
                inner.delete(&self.rid)
            }
            ViewBackend::Tx(weak) => {
                let inner = weak
                    .upgrade()
                    .ok_or_else(|| LodeError::not_found(self.rid.clone()))?;
                inner.delete(&self.rid)
            }
        }
    }

    fn apply_update(&self, changes: Record) -> Result<()> {
        match &self.backend {
            ViewBackend::Store(weak) => {
                let inner = weak
                    .upgrade()
                    .ok_or_else(|| LodeError::not_found(self.rid.clone()))?;
                inner.update(&self.rid, changes)
            }
            ViewBackend::Tx(weak) => {
                let inner = weak
                    .upgrade()
                    .ok_or_else(|| LodeError::not_found(self.rid.clone()))?;
                inner.update(&self.rid, changes)
            }
        }
    }
}

impl Drop for RecordView {
    fn drop(&mut self) {
        // Eject the identity-map entry unless a newer view already took it.
        match &self.backend {
            ViewBackend::Store(weak) => {
                if let Some(inner) = weak.upgrade() {
                    inner
                        .views
                        .remove_if(&self.rid, |_, view| view.strong_count() == 0);
                }
            }
            ViewBackend::Tx(weak) => {
                if let Some(inner) = weak.upgrade() {
                    inner
                        .views
                        .remove_if(&self.rid, |_, view| view.strong_count() == 0);
                }
            }
        }
    }
}

impl fmt::Debug for RecordView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("RecordView");
        dbg.field("rid", &self.rid);
        match self.snapshot() {
            Ok(record) => dbg.field("record", &record).finish(),
            Err(_) => dbg.field("record", &"<gone>").finish(),
        }
    }
}
