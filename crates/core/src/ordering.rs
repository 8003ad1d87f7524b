//! Ordering terms for query results
//!
//! An [`OrderBy`] names an attribute chain and a direction. Queries sort by
//! the canonical value order (see `value` module), term by term, with absent
//! attributes reading as null and the rid as the final ascending tiebreaker.

use crate::predicate::Path;
use crate::record::Record;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One sort term: an attribute chain plus a direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Attribute chain to sort by
    pub path: Path,
    /// Sort descending instead of ascending
    pub desc: bool,
}

impl OrderBy {
    /// Ascending term on the given path
    pub fn asc(path: Path) -> OrderBy {
        OrderBy { path, desc: false }
    }

    /// Descending term on the given path
    pub fn desc(path: Path) -> OrderBy {
        OrderBy { path, desc: true }
    }

    /// Compare two records under this term
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let null = Value::Null;
        let va = a.get_path(self.path.segments()).unwrap_or(&null);
        let vb = b.get_path(self.path.segments()).unwrap_or(&null);
        let ord = va.cmp(vb);
        if self.desc {
            ord.reverse()
        } else {
            ord
        }
    }
}

/// Compare two records under a sequence of terms, first difference wins
pub fn compare_by_terms(terms: &[OrderBy], a: &Record, b: &Record) -> Ordering {
    for term in terms {
        match term.compare(a, b) {
            Ordering::Equal => continue,
            decided => return decided,
        }
    }
    Ordering::Equal
}
