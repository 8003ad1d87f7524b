//! # Lode
//!
//! An embedded, in-memory record store — schemaless records, a secondary
//! index on every attribute, SQL-style query composition, and atomic
//! multi-statement transactions.
//!
//! Records are ordered maps from attribute names to heterogeneous values.
//! Every attribute is indexed in an ordered index, queries are built from
//! symbolic predicates that compile down to index intersections, and
//! transactions buffer changes and commit or discard them atomically under
//! concurrent access.
//!
//! # Quick Start
//!
//! ```
//! use lode::{Record, Store};
//! use serde_json::json;
//!
//! fn main() -> lode::Result<()> {
//!     let store = Store::new();
//!     let row = Store::symbol();
//!
//!     store.create(Record::try_from(json!({
//!         "id": 1, "name": "Sarah", "weight": 121,
//!     }))?)?;
//!     store.create(Record::try_from(json!({
//!         "id": 2, "name": "Jeff", "weight": 183,
//!     }))?)?;
//!
//!     // Symbolic query: every attribute is indexed.
//!     let light = store
//!         .select([])
//!         .where_(row.attr("weight").lt(130))
//!         .order_by([row.attr("name").desc()])
//!         .fetch()?;
//!     assert_eq!(light.len(), 1);
//!
//!     // Transactions buffer writes and commit atomically.
//!     store.with_transaction(|tx| {
//!         let person = tx.get(&1.into())?;
//!         person.set("weight", 112)?;
//!         Ok(())
//!     })?;
//!     assert_eq!(store.get(&1.into())?.get("weight")?, 112.into());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! | Layer | Crate | Responsibility |
//! |-------|-------|----------------|
//! | Value model | `lode-core` | Total order, equality, and hashing over heterogeneous values |
//! | Predicates | `lode-core` | Symbolic predicate AST, symbols, ordering terms |
//! | Engine | `lode-engine` | Per-attribute indices, the store, live views, queries, transactions |
//!
//! The [`Store`] struct is the main entry point. Only the surface re-exported
//! here is stable; the member crates are implementation detail.

// Re-export the public API from the member crates.
pub use lode_core::{
    CmpOp, LodeError, OrderBy, Path, Predicate, Record, Result, Rid, Symbol, SymbolicPath, Value,
};
pub use lode_engine::{Query, RecordView, Store, Transaction, TxStatus};
