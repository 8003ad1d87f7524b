//! Lode engine
//!
//! This crate implements the working parts of the store on top of the pure
//! data types in `lode-core`:
//! - FieldIndex / Indexer: an ordered index per record attribute
//! - Store: the record manager, with identity-preserving live views
//! - RecordView: record handles whose writes funnel back into the store
//! - Query: predicate compilation to index operations plus residual filter,
//!   ordering, pagination, projection, and mutative forms
//! - Transaction: overlay-buffered sessions with atomic commit
//!
//! ## Concurrency
//!
//! One reader-writer lock guards each store's records and indices. Reads
//! take the read side; direct writes and transaction commit take the write
//! side. Commit holds it across the whole overlay application, so readers
//! see all of a transaction's changes or none. Identity maps live in
//! concurrent maps outside the state lock. `Store`, `Transaction`, and
//! views are `Send + Sync`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod index;
pub mod indexer;
mod plan;
pub mod query;
pub mod store;
pub mod transaction;
pub mod view;

pub use query::Query;
pub use store::Store;
pub use transaction::{Transaction, TxStatus};
pub use view::RecordView;

// Re-export the core types the engine API surfaces.
pub use lode_core::{
    CmpOp, LodeError, OrderBy, Path, Predicate, Record, Result, Rid, Symbol, SymbolicPath, Value,
};
