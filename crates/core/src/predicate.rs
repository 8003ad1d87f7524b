//! Predicate AST
//!
//! Queries select records with a small boolean algebra over attribute
//! comparisons. The AST here is the canonical form; the symbol layer
//! (`symbol` module) is sugar that produces it, and the engine compiles it
//! into index operations plus a residual filter.
//!
//! ## Evaluation semantics
//!
//! `Predicate::matches` evaluates a predicate directly against a record,
//! and is the semantics the index plan must agree with:
//!
//! - A missing attribute never matches a comparison with a non-null
//!   literal (`attr > x`, `attr != x` are false when `attr` is absent).
//! - `attr == null` matches records where `attr` is absent *or* explicitly
//!   null.
//! - `Member` requires the attribute to be present with a value in the set.
//! - Nested attribute chains descend through nested maps; a broken chain
//!   reads as absent.

use crate::error::{LodeError, Result};
use crate::record::Record;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

/// A non-empty chain of attribute names, applied from the record root
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path(Vec<String>);

impl Path {
    /// Build a path from segments; empty chains are rejected
    pub fn new(segments: Vec<String>) -> Result<Self> {
        if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(LodeError::bad_predicate("attribute path must be non-empty"));
        }
        Ok(Path(segments))
    }

    /// Parse a dotted path like `"dog.age"`
    pub fn parse(path: &str) -> Result<Self> {
        Path::new(path.split('.').map(|s| s.to_string()).collect())
    }

    /// The path segments, root first
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The single attribute name, if this path has exactly one segment
    ///
    /// Only single-segment paths are index-assisted; deeper chains fall back
    /// to the residual filter.
    pub fn as_attr(&self) -> Option<&str> {
        match self.0.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Append a segment, descending one level
    pub fn child(mut self, segment: impl Into<String>) -> Self {
        self.0.push(segment.into());
        self
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Comparison operator of a predicate leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
}

impl CmpOp {
    /// The operator produced by negating this one
    pub fn negate(self) -> CmpOp {
        match self {
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
        }
    }

    /// Apply the operator to a comparison result
    pub fn accepts(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
        }
    }

    /// The operator's symbolic spelling
    pub fn as_str(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// Boolean test on a record, as a tagged tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Matches every record
    True,
    /// Matches no record
    False,
    /// Compare an attribute chain against a literal
    Compare {
        /// Attribute chain from the record root
        path: Path,
        /// Comparison operator
        op: CmpOp,
        /// Literal to compare against
        value: Value,
    },
    /// Attribute value is one of a finite set
    Member {
        /// Attribute chain from the record root
        path: Path,
        /// Admissible values
        values: BTreeSet<Value>,
    },
    /// Logical negation
    Not(Box<Predicate>),
    /// Logical conjunction
    And(Box<Predicate>, Box<Predicate>),
    /// Logical disjunction
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    /// `path op value` leaf
    pub fn compare(path: Path, op: CmpOp, value: impl Into<Value>) -> Predicate {
        Predicate::Compare {
            path,
            op,
            value: value.into(),
        }
    }

    /// `path == value` leaf
    pub fn eq(path: Path, value: impl Into<Value>) -> Predicate {
        Predicate::compare(path, CmpOp::Eq, value)
    }

    /// `path != value` leaf
    pub fn ne(path: Path, value: impl Into<Value>) -> Predicate {
        Predicate::compare(path, CmpOp::Ne, value)
    }

    /// `path < value` leaf
    pub fn lt(path: Path, value: impl Into<Value>) -> Predicate {
        Predicate::compare(path, CmpOp::Lt, value)
    }

    /// `path <= value` leaf
    pub fn le(path: Path, value: impl Into<Value>) -> Predicate {
        Predicate::compare(path, CmpOp::Le, value)
    }

    /// `path > value` leaf
    pub fn gt(path: Path, value: impl Into<Value>) -> Predicate {
        Predicate::compare(path, CmpOp::Gt, value)
    }

    /// `path >= value` leaf
    pub fn ge(path: Path, value: impl Into<Value>) -> Predicate {
        Predicate::compare(path, CmpOp::Ge, value)
    }

    /// Membership leaf: the attribute's value is in the given set
    pub fn one_of<V: Into<Value>>(path: Path, values: impl IntoIterator<Item = V>) -> Predicate {
        Predicate::Member {
            path,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Conjunction of all given predicates (`True` when empty)
    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
        predicates
            .into_iter()
            .reduce(|a, b| a & b)
            .unwrap_or(Predicate::True)
    }

    /// Evaluate directly against a record
    ///
    /// See the module docs for the missing-attribute rules. This is also the
    /// residual filter the query executor applies after the index pass.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::True => true,
            Predicate::False => false,
            Predicate::Not(inner) => !inner.matches(record),
            Predicate::And(lhs, rhs) => lhs.matches(record) && rhs.matches(record),
            Predicate::Or(lhs, rhs) => lhs.matches(record) || rhs.matches(record),
            Predicate::Compare { path, op, value } => {
                let current = record.get_path(path.segments());
                match (current, value) {
                    // `attr == null` covers absent attributes.
                    (None, Value::Null) => *op == CmpOp::Eq,
                    // Absent attributes never match non-null comparisons.
                    (None, _) => false,
                    (Some(v), lit) => op.accepts(v.cmp(lit)),
                }
            }
            Predicate::Member { path, values } => record
                .get_path(path.segments())
                .map(|v| values.contains(v))
                .unwrap_or(false),
        }
    }

    /// Rewrite to negation-normal form
    ///
    /// `Not` is pushed down to the leaves: `Not(Compare)` inverts the
    /// operator, De Morgan distributes over `And`/`Or`, and constants flip.
    /// `Not(Member)` has no index form and stays as a negated leaf for the
    /// residual filter.
    pub fn normalize(self) -> Predicate {
        match self {
            Predicate::And(lhs, rhs) => lhs.normalize() & rhs.normalize(),
            Predicate::Or(lhs, rhs) => lhs.normalize() | rhs.normalize(),
            Predicate::Not(inner) => match *inner {
                Predicate::True => Predicate::False,
                Predicate::False => Predicate::True,
                Predicate::Not(inner2) => inner2.normalize(),
                Predicate::And(lhs, rhs) => {
                    Predicate::Not(lhs).normalize() | Predicate::Not(rhs).normalize()
                }
                Predicate::Or(lhs, rhs) => {
                    Predicate::Not(lhs).normalize() & Predicate::Not(rhs).normalize()
                }
                Predicate::Compare { path, op, value } => Predicate::Compare {
                    path,
                    op: op.negate(),
                    value,
                },
                leaf @ Predicate::Member { .. } => Predicate::Not(Box::new(leaf)),
            },
            leaf => leaf,
        }
    }
}

impl BitAnd for Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Predicate) -> Predicate {
        Predicate::Or(Box::new(self), Box::new(rhs))
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::True => write!(f, "true"),
            Predicate::False => write!(f, "false"),
            Predicate::Compare { path, op, value } => {
                write!(f, "({} {} {})", path, op.as_str(), value)
            }
            Predicate::Member { path, values } => {
                write!(f, "({} in {})", path, Value::Set(values.clone()))
            }
            Predicate::Not(p) => write!(f, "!{}", p),
            Predicate::And(a, b) => write!(f, "({} & {})", a, b),
            Predicate::Or(a, b) => write!(f, "({} | {})", a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(p: &str) -> Path {
        Path::parse(p).unwrap()
    }

    fn record() -> Record {
        Record::try_from(json!({
            "id": 1,
            "type": "click",
            "time": 3,
            "pos": {"x": 5, "y": 8},
            "note": null,
        }))
        .unwrap()
    }

    // === Path construction ===

    #[test]
    fn test_path_parse() {
        let p = path("dog.age");
        assert_eq!(p.segments(), &["dog".to_string(), "age".to_string()]);
        assert_eq!(p.as_attr(), None);
        assert_eq!(path("type").as_attr(), Some("type"));
        assert_eq!(p.to_string(), "dog.age");
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(Path::parse("").is_err());
        assert!(Path::new(vec![]).is_err());
        assert!(Path::parse("a..b").is_err());
        assert!(Path::parse("").unwrap_err().is_query_error());
    }

    // === Leaf evaluation ===

    #[test]
    fn test_compare_ops() {
        let r = record();
        assert!(Predicate::eq(path("type"), "click").matches(&r));
        assert!(Predicate::ne(path("type"), "press").matches(&r));
        assert!(Predicate::lt(path("time"), 4).matches(&r));
        assert!(Predicate::le(path("time"), 3).matches(&r));
        assert!(Predicate::gt(path("time"), 2).matches(&r));
        assert!(Predicate::ge(path("time"), 3).matches(&r));
        assert!(!Predicate::gt(path("time"), 3).matches(&r));
    }

    #[test]
    fn test_missing_attribute_reads_as_null() {
        let r = record();
        // Absent attribute: comparisons against non-null literals are false.
        assert!(!Predicate::gt(path("speed"), 0).matches(&r));
        assert!(!Predicate::lt(path("speed"), 0).matches(&r));
        assert!(!Predicate::ne(path("speed"), 0).matches(&r));
        // `== null` is true when absent, and when explicitly null.
        assert!(Predicate::eq(path("speed"), Value::Null).matches(&r));
        assert!(Predicate::eq(path("note"), Value::Null).matches(&r));
        // Explicit null is present, so `!= 0` sees null != 0.
        assert!(Predicate::ne(path("note"), 0).matches(&r));
    }

    #[test]
    fn test_deep_path_evaluation() {
        let r = record();
        assert!(Predicate::eq(path("pos.x"), 5).matches(&r));
        assert!(!Predicate::eq(path("pos.z"), 5).matches(&r));
        assert!(Predicate::gt(path("pos.y"), 7).matches(&r));
    }

    #[test]
    fn test_member_requires_presence() {
        let r = record();
        assert!(Predicate::one_of(path("type"), ["click", "press"]).matches(&r));
        assert!(!Predicate::one_of(path("type"), ["scroll"]).matches(&r));
        assert!(!Predicate::one_of(path("speed"), [1, 2]).matches(&r));
    }

    #[test]
    fn test_cross_kind_comparison_follows_value_order() {
        let r = record();
        // "click" (string) > 100 (number) in the canonical order.
        assert!(Predicate::gt(path("type"), 100).matches(&r));
    }

    // === Composition ===

    #[test]
    fn test_operators_compose() {
        let r = record();
        let p = Predicate::eq(path("type"), "click") & Predicate::le(path("time"), 3);
        assert!(p.matches(&r));

        let q = Predicate::eq(path("type"), "press") | Predicate::gt(path("time"), 1);
        assert!(q.matches(&r));

        assert!(!(!q).matches(&r));
    }

    #[test]
    fn test_all_reduces_with_and() {
        let r = record();
        let p = Predicate::all([
            Predicate::eq(path("type"), "click"),
            Predicate::gt(path("time"), 1),
            Predicate::lt(path("time"), 9),
        ]);
        assert!(p.matches(&r));
        assert_eq!(Predicate::all([]), Predicate::True);
    }

    // === Normalization ===

    #[test]
    fn test_normalize_inverts_comparisons() {
        let p = !Predicate::lt(path("time"), 3);
        assert_eq!(p.normalize(), Predicate::ge(path("time"), 3));

        let p = !Predicate::eq(path("type"), "click");
        assert_eq!(p.normalize(), Predicate::ne(path("type"), "click"));
    }

    #[test]
    fn test_normalize_de_morgan() {
        let p = !(Predicate::eq(path("a"), 1) & Predicate::eq(path("b"), 2));
        assert_eq!(
            p.normalize(),
            Predicate::ne(path("a"), 1) | Predicate::ne(path("b"), 2)
        );
    }

    #[test]
    fn test_normalize_constants_and_double_negation() {
        assert_eq!((!Predicate::True).normalize(), Predicate::False);
        let p = !!Predicate::eq(path("a"), 1);
        assert_eq!(p.normalize(), Predicate::eq(path("a"), 1));
    }

    #[test]
    fn test_normalize_keeps_not_member() {
        let leaf = Predicate::one_of(path("a"), [1, 2]);
        let p = (!leaf.clone()).normalize();
        assert_eq!(p, Predicate::Not(Box::new(leaf)));
    }

    #[test]
    fn test_normalize_preserves_semantics() {
        let r = record();
        let predicates = vec![
            !(Predicate::eq(path("type"), "click") & Predicate::gt(path("time"), 5)),
            !(Predicate::one_of(path("type"), ["press"]) | Predicate::lt(path("time"), 1)),
            !!Predicate::ge(path("pos.x"), 5),
        ];
        for p in predicates {
            assert_eq!(p.clone().normalize().matches(&r), p.matches(&r), "{}", p);
        }
    }
}
