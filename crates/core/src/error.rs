//! Error types for Lode
//!
//! A single unified error enum covers every public API surface. We use
//! `thiserror` for the `Display` and `Error` trait implementations.
//!
//! ## Error Model
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | `NotFound` | get/mutation on an unknown or deleted rid |
//! | `Duplicate` | create with an id already in use |
//! | `KeyMissing` | read of an absent attribute on a live view |
//! | `BadPredicate` | malformed predicate (empty path, non-object record literal) |
//! | `BadOrdering` | negative limit or offset |
//! | `TransactionClosed` | operation on a committed or rolled-back transaction |
//!
//! Errors inside a scoped transaction trigger rollback and re-surface
//! unchanged; `create_many` rolls back its own prior inserts before the
//! error surfaces. All other errors are local to their operation.

use crate::record::Rid;
use thiserror::Error;

/// Result type alias for Lode operations
pub type Result<T> = std::result::Result<T, LodeError>;

/// Unified error type for all Lode operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LodeError {
    /// No live record with the given rid
    ///
    /// Raised by `get` and by any mutation addressing an unknown or deleted
    /// rid, including operations on a live view whose record was deleted.
    #[error("record not found: {rid}")]
    NotFound {
        /// The rid that was not found
        rid: Rid,
    },

    /// A record with the given id already exists
    #[error("duplicate record id: {rid}")]
    Duplicate {
        /// The conflicting rid
        rid: Rid,
    },

    /// The attribute is absent on the record
    ///
    /// Raised only by live-view reads; query evaluation treats absent
    /// attributes as null instead.
    #[error("attribute {key:?} missing on record {rid}")]
    KeyMissing {
        /// The record the read addressed
        rid: Rid,
        /// The absent attribute name
        key: String,
    },

    /// The predicate is malformed
    #[error("bad predicate: {reason}")]
    BadPredicate {
        /// What is wrong with it
        reason: String,
    },

    /// The ordering or pagination clause is malformed
    #[error("bad ordering: {reason}")]
    BadOrdering {
        /// What is wrong with it
        reason: String,
    },

    /// The transaction has already been committed or rolled back
    #[error("transaction closed (already {state})")]
    TransactionClosed {
        /// Terminal state the transaction is in
        state: &'static str,
    },
}

impl LodeError {
    /// Create a NotFound error
    pub fn not_found(rid: impl Into<Rid>) -> Self {
        LodeError::NotFound { rid: rid.into() }
    }

    /// Create a Duplicate error
    pub fn duplicate(rid: impl Into<Rid>) -> Self {
        LodeError::Duplicate { rid: rid.into() }
    }

    /// Create a KeyMissing error
    pub fn key_missing(rid: impl Into<Rid>, key: impl Into<String>) -> Self {
        LodeError::KeyMissing {
            rid: rid.into(),
            key: key.into(),
        }
    }

    /// Create a BadPredicate error
    pub fn bad_predicate(reason: impl Into<String>) -> Self {
        LodeError::BadPredicate {
            reason: reason.into(),
        }
    }

    /// Create a BadOrdering error
    pub fn bad_ordering(reason: impl Into<String>) -> Self {
        LodeError::BadOrdering {
            reason: reason.into(),
        }
    }

    /// Create a TransactionClosed error
    pub fn transaction_closed(state: &'static str) -> Self {
        LodeError::TransactionClosed { state }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, LodeError::NotFound { .. })
    }

    /// Check if this is a duplicate-id error
    pub fn is_duplicate(&self) -> bool {
        matches!(self, LodeError::Duplicate { .. })
    }

    /// Check if this is a query-construction error
    ///
    /// Returns true for `BadPredicate` and `BadOrdering` — both indicate the
    /// query itself must change, not the data.
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            LodeError::BadPredicate { .. } | LodeError::BadOrdering { .. }
        )
    }

    /// Check if this is a transaction-lifecycle error
    pub fn is_transaction_error(&self) -> bool {
        matches!(self, LodeError::TransactionClosed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = LodeError::not_found(7);
        assert_eq!(err.to_string(), "record not found: 7");

        let err = LodeError::key_missing("u1", "email");
        assert!(err.to_string().contains("email"));
        assert!(err.to_string().contains("u1"));

        let err = LodeError::transaction_closed("committed");
        assert_eq!(err.to_string(), "transaction closed (already committed)");
    }

    #[test]
    fn test_classification() {
        assert!(LodeError::not_found(1).is_not_found());
        assert!(!LodeError::duplicate(1).is_not_found());
        assert!(LodeError::duplicate(1).is_duplicate());
        assert!(LodeError::bad_predicate("empty path").is_query_error());
        assert!(LodeError::bad_ordering("negative limit").is_query_error());
        assert!(LodeError::transaction_closed("rolled back").is_transaction_error());
        assert!(!LodeError::not_found(1).is_query_error());
    }

    #[test]
    fn test_pattern_matching() {
        match LodeError::key_missing(3, "name") {
            LodeError::KeyMissing { rid, key } => {
                assert_eq!(rid, Rid::from(3));
                assert_eq!(key, "name");
            }
            _ => panic!("wrong variant"),
        }
    }
}
