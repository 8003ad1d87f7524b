//! Symbolic query sugar
//!
//! A [`Symbol`] stands for "the record being tested" while a query is being
//! written. Attribute access produces a [`SymbolicPath`]; comparison methods
//! on the path produce [`Predicate`] leaves; `asc`/`desc` produce ordering
//! terms:
//!
//! ```
//! use lode_core::Symbol;
//!
//! let row = Symbol::new();
//! let pred = row.attr("type").eq("click") & row.attr("time").gt(2);
//! let order = row.attr("pos").attr("x").asc();
//! # let _ = (pred, order);
//! ```
//!
//! Symbols are stateless tokens; any symbol works against any store.

use crate::ordering::OrderBy;
use crate::predicate::{Path, Predicate};
use crate::value::Value;

/// Token whose attributes name record fields inside a query
#[derive(Debug, Clone, Copy, Default)]
pub struct Symbol;

impl Symbol {
    /// Create a new symbol
    pub fn new() -> Symbol {
        Symbol
    }

    /// A path handle for a top-level attribute
    pub fn attr(&self, name: impl Into<String>) -> SymbolicPath {
        SymbolicPath {
            path: Path::new(vec![name.into()]).expect("attribute name must be non-empty"),
        }
    }
}

/// Attribute chain handle produced by [`Symbol::attr`]
///
/// Comparison methods yield predicate leaves; `attr` descends into nested
/// maps; `asc`/`desc` yield ordering terms.
#[derive(Debug, Clone)]
pub struct SymbolicPath {
    path: Path,
}

impl SymbolicPath {
    /// Descend one level into a nested map attribute
    pub fn attr(self, name: impl Into<String>) -> SymbolicPath {
        SymbolicPath {
            path: self.path.child(name),
        }
    }

    /// The underlying attribute path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `self == value`
    pub fn eq(&self, value: impl Into<Value>) -> Predicate {
        Predicate::eq(self.path.clone(), value)
    }

    /// `self != value`
    pub fn ne(&self, value: impl Into<Value>) -> Predicate {
        Predicate::ne(self.path.clone(), value)
    }

    /// `self < value`
    pub fn lt(&self, value: impl Into<Value>) -> Predicate {
        Predicate::lt(self.path.clone(), value)
    }

    /// `self <= value`
    pub fn le(&self, value: impl Into<Value>) -> Predicate {
        Predicate::le(self.path.clone(), value)
    }

    /// `self > value`
    pub fn gt(&self, value: impl Into<Value>) -> Predicate {
        Predicate::gt(self.path.clone(), value)
    }

    /// `self >= value`
    pub fn ge(&self, value: impl Into<Value>) -> Predicate {
        Predicate::ge(self.path.clone(), value)
    }

    /// `self` is one of the given values
    pub fn one_of<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Predicate {
        Predicate::one_of(self.path.clone(), values)
    }

    /// `self` is none of the given values
    pub fn not_in<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Predicate {
        !Predicate::one_of(self.path.clone(), values)
    }

    /// `self` is null or absent
    pub fn is_null(&self) -> Predicate {
        Predicate::eq(self.path.clone(), Value::Null)
    }

    /// Ascending ordering term on this path
    pub fn asc(&self) -> OrderBy {
        OrderBy::asc(self.path.clone())
    }

    /// Descending ordering term on this path
    pub fn desc(&self) -> OrderBy {
        OrderBy::desc(self.path.clone())
    }
}
