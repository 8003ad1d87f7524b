//! Query composition and execution
//!
//! A [`Query`] binds a predicate, projection, ordering, and pagination to a
//! store or transaction. Execution compiles the predicate into index
//! operations (see the `plan` module), re-evaluates the full predicate per
//! candidate when the plan over-approximates, then sorts, paginates, and
//! materializes results as live views or projected record snapshots.
//!
//! ```
//! use lode_engine::Store;
//! use lode_core::Record;
//! use serde_json::json;
//!
//! # fn main() -> lode_core::Result<()> {
//! let store = Store::new();
//! let row = Store::symbol();
//! store.create(Record::try_from(json!({"id": 1, "kind": "press", "time": 4})).unwrap())?;
//!
//! let hits = store
//!     .select([])
//!     .where_(row.attr("kind").eq("press") & row.attr("time").gt(2))
//!     .order_by([row.attr("time").asc()])
//!     .fetch()?;
//! assert_eq!(hits.len(), 1);
//! # Ok(())
//! # }
//! ```

use crate::plan::candidates;
use crate::store::Store;
use crate::transaction::Transaction;
use crate::view::RecordView;
use indexmap::IndexMap;
use lode_core::{
    compare_by_terms, LodeError, OrderBy, Path, Predicate, Record, Result, Rid, SymbolicPath,
};
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// What a query executes against
#[derive(Clone)]
pub(crate) enum QuerySource {
    Store(Store),
    Transaction(Transaction),
}

impl QuerySource {
    fn store(&self) -> &Store {
        match self {
            QuerySource::Store(store) => store,
            QuerySource::Transaction(tx) => tx.store(),
        }
    }
}

/// Composable query over a store or transaction
///
/// Built with [`Store::select`] / [`Transaction::select`]; chain `where_`,
/// `order_by`, `limit`, and `offset`, then execute with one of the fetch
/// methods — or mutate every match with [`Query::delete`] /
/// [`Query::update`].
#[derive(Clone)]
pub struct Query {
    source: QuerySource,
    projection: Vec<Path>,
    predicate: Option<Predicate>,
    order: Vec<OrderBy>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Query {
    pub(crate) fn new(source: QuerySource) -> Query {
        Query {
            source,
            projection: Vec::new(),
            predicate: None,
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Append projection paths; an empty projection selects whole records
    ///
    /// Projections only shape [`Query::rows`] / [`Query::row_list`] output;
    /// the view-returning fetch methods always expose whole records.
    pub fn select(mut self, paths: impl IntoIterator<Item = SymbolicPath>) -> Query {
        self.projection
            .extend(paths.into_iter().map(|p| p.path().clone()));
        self
    }

    /// Add a selection predicate; repeated calls are AND-ed together
    pub fn where_(mut self, predicate: Predicate) -> Query {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing & predicate,
            None => predicate,
        });
        self
    }

    /// Append ordering terms, applied in sequence with rid as the final
    /// ascending tiebreaker
    pub fn order_by(mut self, terms: impl IntoIterator<Item = OrderBy>) -> Query {
        self.order.extend(terms);
        self
    }

    /// Cap the number of results (applied after `offset`)
    ///
    /// Negative values fail with `BadOrdering` at execution.
    pub fn limit(mut self, n: i64) -> Query {
        self.limit = Some(n);
        self
    }

    /// Skip the first `n` results
    ///
    /// Negative values fail with `BadOrdering` at execution.
    pub fn offset(mut self, n: i64) -> Query {
        self.offset = Some(n);
        self
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Execute and return `rid → live view` in result order
    pub fn fetch(&self) -> Result<IndexMap<Rid, Arc<RecordView>>> {
        let rows = self.matching()?;
        let mut out = IndexMap::with_capacity(rows.len());
        for (rid, _) in rows {
            let view = self.view_for(&rid);
            out.insert(rid, view);
        }
        Ok(out)
    }

    /// Execute and return live views as an ordered sequence
    pub fn fetch_list(&self) -> Result<Vec<Arc<RecordView>>> {
        let rows = self.matching()?;
        Ok(rows.iter().map(|(rid, _)| self.view_for(rid)).collect())
    }

    /// Execute and return the first result, if any
    pub fn first(&self) -> Result<Option<Arc<RecordView>>> {
        let rows = self.matching()?;
        Ok(rows.first().map(|(rid, _)| self.view_for(rid)))
    }

    /// Execute and return projected record snapshots keyed by rid
    ///
    /// With an empty projection each row is the whole record; otherwise rows
    /// hold the selected paths (missing paths read as null) plus the
    /// primary-key attribute.
    pub fn rows(&self) -> Result<IndexMap<Rid, Record>> {
        let pkey = self.source.store().primary_key().to_string();
        let rows = self.matching()?;
        let mut out = IndexMap::with_capacity(rows.len());
        for (rid, record) in rows {
            let projected = self.project(&pkey, &rid, &record);
            out.insert(rid, projected);
        }
        Ok(out)
    }

    /// Execute and return projected record snapshots as an ordered sequence
    pub fn row_list(&self) -> Result<Vec<Record>> {
        let pkey = self.source.store().primary_key().to_string();
        let rows = self.matching()?;
        Ok(rows
            .iter()
            .map(|(rid, record)| self.project(&pkey, rid, record))
            .collect())
    }

    /// Execute and count the matches
    pub fn count(&self) -> Result<usize> {
        Ok(self.matching()?.len())
    }

    /// Delete every matching record through the owning context
    ///
    /// Inside a transaction the deletes land in the overlay. Returns the
    /// number of records deleted.
    pub fn delete(self) -> Result<usize> {
        let rids: Vec<Rid> = self.matching()?.into_iter().map(|(rid, _)| rid).collect();
        Ok(match &self.source {
            QuerySource::Store(store) => store.delete_many(rids.iter()),
            QuerySource::Transaction(tx) => tx.delete_many(rids.iter()),
        })
    }

    /// Apply a patch to every matching record through the owning context
    ///
    /// Inside a transaction the updates land in the overlay. Returns the
    /// number of records patched.
    pub fn update(self, changes: Record) -> Result<usize> {
        let rids: Vec<Rid> = self.matching()?.into_iter().map(|(rid, _)| rid).collect();
        let patches = rids.into_iter().map(|rid| (rid, changes.clone()));
        match &self.source {
            QuerySource::Store(store) => store.update_many(patches),
            QuerySource::Transaction(tx) => tx.update_many(patches),
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn view_for(&self, rid: &Rid) -> Arc<RecordView> {
        match &self.source {
            QuerySource::Store(store) => crate::store::StoreInner::view_for(&store.inner, rid),
            QuerySource::Transaction(tx) => crate::transaction::TxInner::view_for(&tx.inner, rid),
        }
    }

    fn project(&self, pkey: &str, rid: &Rid, record: &Record) -> Record {
        if self.projection.is_empty() {
            return record.clone();
        }
        let mut out = Record::new();
        out.insert(pkey.to_string(), rid.value().clone());
        out.merge(record.project(&self.projection));
        out
    }

    fn pagination(&self) -> Result<(usize, Option<usize>)> {
        let offset = match self.offset {
            Some(n) if n < 0 => {
                return Err(LodeError::bad_ordering(format!("negative offset: {}", n)))
            }
            Some(n) => n as usize,
            None => 0,
        };
        let limit = match self.limit {
            Some(n) if n < 0 => {
                return Err(LodeError::bad_ordering(format!("negative limit: {}", n)))
            }
            Some(n) => Some(n as usize),
            None => None,
        };
        Ok((offset, limit))
    }

    /// The sorted, paginated `(rid, record)` matches
    fn matching(&self) -> Result<Vec<(Rid, Record)>> {
        let (offset, limit) = self.pagination()?;
        let normalized = self.predicate.clone().map(Predicate::normalize);

        let mut rows: Vec<(Rid, Record)> = match &self.source {
            QuerySource::Store(store) => {
                let state = store.inner.state.read();
                match &normalized {
                    None => state
                        .records
                        .iter()
                        .map(|(rid, record)| (rid.clone(), record.clone()))
                        .collect(),
                    Some(pred) => {
                        let plan = candidates(pred, &state);
                        let mut rows = Vec::with_capacity(plan.rids.len());
                        for rid in plan.rids {
                            if let Some(record) = state.records.get(&rid) {
                                // Inexact plans over-approximate; re-check.
                                if plan.exact || pred.matches(record) {
                                    rows.push((rid, record.clone()));
                                }
                            }
                        }
                        rows
                    }
                }
            }
            QuerySource::Transaction(tx) => {
                let (writes, tombstones) = tx.inner.overlay_snapshot()?;
                let written: FxHashSet<Rid> = writes.iter().map(|(rid, _)| rid.clone()).collect();

                let state = tx.store().inner.state.read();
                let base = match &normalized {
                    None => state.all_rids(),
                    Some(pred) => candidates(pred, &state).rids,
                };

                let mut rows: Vec<(Rid, Record)> = Vec::new();
                for rid in base {
                    // Overlay state supersedes the base record entirely.
                    if tombstones.contains(&rid) || written.contains(&rid) {
                        continue;
                    }
                    if let Some(record) = state.records.get(&rid) {
                        rows.push((rid, record.clone()));
                    }
                }
                drop(state);
                rows.extend(writes);

                // Overlay writes invalidate index exactness, so the full
                // predicate runs against every merged candidate.
                if let Some(pred) = &normalized {
                    rows.retain(|(_, record)| pred.matches(record));
                }
                rows
            }
        };

        rows.sort_by(|a, b| compare_by_terms(&self.order, &a.1, &b.1).then_with(|| a.0.cmp(&b.0)));

        let rows = rows.into_iter().skip(offset);
        Ok(match limit {
            Some(n) => rows.take(n).collect(),
            None => rows.collect(),
        })
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("projection", &self.projection)
            .field("predicate", &self.predicate)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}
