//! Core types for Lode
//!
//! This crate defines the foundational types used throughout the system:
//! - Value: heterogeneous record field values with a canonical total order
//! - Record / Rid: schemaless records and their stable identifiers
//! - Predicate / Path / CmpOp: the symbolic predicate AST
//! - Symbol / SymbolicPath: query-building sugar over the AST
//! - OrderBy: sort terms for query results
//! - LodeError: the unified error type
//!
//! Everything here is pure data — no locking, no storage. The engine crate
//! builds the indexed store, live views, queries, and transactions on top.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod ordering;
pub mod predicate;
pub mod record;
pub mod symbol;
pub mod value;

// Re-export commonly used types at the crate root
pub use error::{LodeError, Result};
pub use ordering::{compare_by_terms, OrderBy};
pub use predicate::{CmpOp, Path, Predicate};
pub use record::{Record, Rid};
pub use symbol::{Symbol, SymbolicPath};
pub use value::{Value, ValueKind};
