//! Value types for Lode
//!
//! This module defines:
//! - Value: unified enum for all record field types
//! - ValueKind: the kind tag that anchors the cross-kind total order
//!
//! ## Canonical Value Model
//!
//! The Value enum has exactly 8 variants:
//! - Null, Bool, Int, Float, String, List, Set, Map
//!
//! ### Ordering Rules
//!
//! Every pair of values is comparable. Kinds order as:
//!
//! ```text
//! Null < Bool < numbers < String < List < Set < Map
//! ```
//!
//! - `Int` and `Float` form a single *numbers* kind and compare numerically,
//!   so `Int(1)` and `Float(1.0)` are equal (and hash identically).
//! - `NaN` normalizes to a single canonical value greater than every other
//!   number; `-0.0 == 0.0`.
//! - Strings compare lexicographically; lists element-wise; sets as sorted
//!   element sequences; maps as `(key, value)` pairs in sorted key order.
//!
//! The order is total and deterministic across process runs, which is what
//! lets `Value` key the ordered per-attribute indices.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Canonical Lode value type for record fields
///
/// Values are heterogeneous and totally ordered; see the module docs for the
/// ordering rules. `Eq`, `Ord`, and `Hash` all derive from the one canonical
/// comparison, so values can key `BTreeMap`s and hash maps interchangeably.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (NaN normalized, see module docs)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Ordered sequence of values
    List(Vec<Value>),
    /// Set of values, kept sorted by the canonical order
    Set(BTreeSet<Value>),
    /// Nested mapping with string keys, in insertion order
    Map(IndexMap<String, Value>),
}

/// Kind tag for a [`Value`], in canonical cross-kind order
///
/// `Int` and `Float` share the `Number` kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    /// The null kind
    Null,
    /// The boolean kind
    Bool,
    /// Integers and floats
    Number,
    /// Strings
    String,
    /// Sequences
    List,
    /// Sets
    Set,
    /// Mappings
    Map,
}

impl Value {
    /// Get the kind tag of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) | Value::Float(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Set(_) => ValueKind::Set,
            Value::Map(_) => ValueKind::Map,
        }
    }

    /// Get the kind name as a string
    pub fn kind_name(&self) -> &'static str {
        match self.kind() {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Set => "set",
            ValueKind::Map => "map",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a numeric value (Int or Float)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as &[Value] if this is a List value
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Get as a set reference if this is a Set value
    pub fn as_set(&self) -> Option<&BTreeSet<Value>> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }

    /// Get as a map reference if this is a Map value
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Hash this value to a stable integer under the canonical traversal
    ///
    /// Equal values (under the canonical order) produce equal hashes, so
    /// `Float(1.0)` hashes like `Int(1)` and all NaNs hash alike.
    pub fn canonical_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

// ============================================================================
// Canonical comparison
// ============================================================================

/// Compare two floats under the canonical number order
///
/// NaN collapses to a single value above every other number; -0.0 equals 0.0.
fn cmp_f64(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        // Neither is NaN, so partial_cmp is total here.
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Compare an integer and a float numerically without precision loss
fn cmp_int_f64(i: i64, f: f64) -> Ordering {
    if f.is_nan() {
        return Ordering::Less;
    }
    if f.is_infinite() {
        return if f > 0.0 {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }
    // Compare against the float's truncation first; only equal truncations
    // need the fractional part examined. Integral floats in [-2^63, 2^63)
    // cast to i64 exactly.
    let trunc = f.trunc();
    if trunc >= (i64::MIN as f64) && trunc < -(i64::MIN as f64) {
        match i.cmp(&(trunc as i64)) {
            Ordering::Equal => {
                let frac = f - trunc;
                if frac > 0.0 {
                    Ordering::Less
                } else if frac < 0.0 {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            }
            ord => ord,
        }
    } else {
        // Magnitude exceeds i64 range.
        if f > 0.0 {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;

        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => cmp_f64(*a, *b),
            (Int(a), Float(b)) => cmp_int_f64(*a, *b),
            (Float(a), Int(b)) => cmp_int_f64(*b, *a).reverse(),
            (String(a), String(b)) => a.cmp(b),
            (List(a), List(b)) => a.cmp(b),
            (Set(a), Set(b)) => a.cmp(b),
            (Map(a), Map(b)) => {
                // Maps compare as (key, value) pairs in sorted key order.
                let mut xs: Vec<(&std::string::String, &Value)> = a.iter().collect();
                let mut ys: Vec<(&std::string::String, &Value)> = b.iter().collect();
                xs.sort_by(|l, r| l.0.cmp(r.0));
                ys.sort_by(|l, r| l.0.cmp(r.0));
                xs.cmp(&ys)
            }
            _ => self.kind().cmp(&other.kind()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => state.write_u8(0),
            Value::Bool(b) => {
                state.write_u8(1);
                b.hash(state);
            }
            Value::Int(i) => {
                state.write_u8(2);
                i.hash(state);
            }
            Value::Float(f) => {
                // Hash must agree with numeric equality: integral floats in
                // i64 range hash as the equal Int would.
                if f.is_nan() {
                    state.write_u8(3);
                } else if f.fract() == 0.0 && (*f as i64 as f64) == *f {
                    state.write_u8(2);
                    (*f as i64).hash(state);
                } else {
                    state.write_u8(4);
                    f.to_bits().hash(state);
                }
            }
            Value::String(s) => {
                state.write_u8(5);
                s.hash(state);
            }
            Value::List(l) => {
                state.write_u8(6);
                for v in l {
                    v.hash(state);
                }
            }
            Value::Set(s) => {
                state.write_u8(7);
                for v in s {
                    v.hash(state);
                }
            }
            Value::Map(m) => {
                state.write_u8(8);
                let mut pairs: Vec<(&String, &Value)> = m.iter().collect();
                pairs.sort_by(|l, r| l.0.cmp(r.0));
                for (k, v) in pairs {
                    k.hash(state);
                    v.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Set(s) => {
                write!(f, "{{")?;
                for (i, v) in s.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "}}")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f as f64)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

impl From<BTreeSet<Value>> for Value {
    fn from(s: BTreeSet<Value>) -> Self {
        Value::Set(s)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(m: IndexMap<String, Value>) -> Self {
        Value::Map(m)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Self {
        match o {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

// ============================================================================
// serde_json interop
// ============================================================================

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::List(arr.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => {
                Value::Map(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::List(l) => {
                serde_json::Value::Array(l.into_iter().map(serde_json::Value::from).collect())
            }
            // Sets have no JSON form; they serialize as sorted arrays.
            Value::Set(s) => {
                serde_json::Value::Array(s.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Map(m) => serde_json::Value::Object(
                m.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    // Values cross thread boundaries inside store handles.
    static_assertions::assert_impl_all!(super::Value: Send, Sync);
    use super::*;
    use serde_json::json;

    fn set_of(values: Vec<Value>) -> Value {
        Value::Set(values.into_iter().collect())
    }

    fn map_of(pairs: Vec<(&str, Value)>) -> Value {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    // === Cross-kind ordering (kind ladder) ===

    #[test]
    fn test_kind_ladder_is_total() {
        let ladder = vec![
            Value::Null,
            Value::Bool(true),
            Value::Int(9_999),
            Value::String("a".into()),
            Value::List(vec![Value::Int(1)]),
            set_of(vec![Value::Int(1)]),
            map_of(vec![("k", Value::Int(1))]),
        ];

        for (i, a) in ladder.iter().enumerate() {
            for (j, b) in ladder.iter().enumerate() {
                let expected = i.cmp(&j);
                assert_eq!(a.cmp(b), expected, "cmp({}, {})", a, b);
                assert_eq!(b.cmp(a), expected.reverse(), "antisymmetry({}, {})", a, b);
            }
        }
    }

    #[test]
    fn test_mixed_kind_comparison_never_panics() {
        let samples = vec![
            Value::Null,
            Value::Bool(false),
            Value::Int(-3),
            Value::Float(f64::NAN),
            Value::Float(f64::INFINITY),
            Value::String("".into()),
            Value::List(vec![]),
            set_of(vec![]),
            map_of(vec![]),
        ];
        for a in &samples {
            for b in &samples {
                let _ = a.cmp(b);
            }
        }
    }

    #[test]
    fn test_ordering_transitivity_spot_checks() {
        let a = Value::Int(1);
        let b = Value::Float(1.5);
        let c = Value::String("x".into());
        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
    }

    // === Numeric ordering ===

    #[test]
    fn test_int_float_numeric_equality() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::Float(-0.0), Value::Int(0));
        assert!(Value::Int(1) < Value::Float(1.5));
        assert!(Value::Float(0.5) < Value::Int(1));
    }

    #[test]
    fn test_large_magnitude_int_float() {
        assert!(Value::Int(i64::MAX) < Value::Float(1e19));
        assert!(Value::Float(-1e19) < Value::Int(i64::MIN));
        assert!(Value::Int(0) < Value::Float(f64::INFINITY));
        assert!(Value::Float(f64::NEG_INFINITY) < Value::Int(i64::MIN));
    }

    #[test]
    fn test_nan_is_canonical_and_topmost_number() {
        let nan1 = Value::Float(f64::NAN);
        let nan2 = Value::Float(-f64::NAN);
        assert_eq!(nan1, nan2);
        assert!(Value::Float(f64::INFINITY) < nan1);
        assert!(Value::Int(i64::MAX) < nan1);
        // Still below the next kind.
        assert!(nan1 < Value::String("".into()));
    }

    #[test]
    fn test_negative_zero_equals_zero() {
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
        assert_eq!(
            Value::Float(-0.0).canonical_hash(),
            Value::Float(0.0).canonical_hash()
        );
    }

    // === Compound ordering ===

    #[test]
    fn test_list_lexicographic() {
        let a = Value::List(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::List(vec![Value::Int(1), Value::Int(3)]);
        let c = Value::List(vec![Value::Int(1)]);
        assert!(a < b);
        assert!(c < a);
    }

    #[test]
    fn test_set_compares_as_sorted_elements() {
        let a = set_of(vec![Value::Int(3), Value::Int(1)]);
        let b = set_of(vec![Value::Int(1), Value::Int(4)]);
        // {1, 3} < {1, 4}
        assert!(a < b);
    }

    #[test]
    fn test_map_compares_by_sorted_keys() {
        // Insertion order must not matter.
        let a = map_of(vec![("b", Value::Int(2)), ("a", Value::Int(1))]);
        let b = map_of(vec![("a", Value::Int(1)), ("b", Value::Int(2))]);
        assert_eq!(a, b);
        assert_eq!(a.canonical_hash(), b.canonical_hash());

        let c = map_of(vec![("a", Value::Int(1)), ("b", Value::Int(3))]);
        assert!(a < c);
    }

    #[test]
    fn test_nested_map_ordering() {
        let young = map_of(vec![("age", Value::Int(6))]);
        let old = map_of(vec![("age", Value::Int(10))]);
        assert!(young < old);
    }

    // === Hashing ===

    #[test]
    fn test_hash_agrees_with_numeric_equality() {
        assert_eq!(
            Value::Int(7).canonical_hash(),
            Value::Float(7.0).canonical_hash()
        );
        assert_eq!(
            Value::Float(f64::NAN).canonical_hash(),
            Value::Float(-f64::NAN).canonical_hash()
        );
    }

    #[test]
    fn test_hash_distinguishes_kinds() {
        assert_ne!(
            Value::Int(1).canonical_hash(),
            Value::Bool(true).canonical_hash()
        );
        assert_ne!(
            Value::String("1".into()).canonical_hash(),
            Value::Int(1).canonical_hash()
        );
    }

    // === JSON interop ===

    #[test]
    fn test_from_json_value() {
        let v = Value::from(json!({
            "name": "frank",
            "age": 7,
            "weight": 41.5,
            "tags": ["a", "b"],
            "pet": {"kind": "dog"},
            "gone": null,
        }));
        let m = v.as_map().unwrap();
        assert_eq!(m["name"], Value::String("frank".into()));
        assert_eq!(m["age"], Value::Int(7));
        assert_eq!(m["weight"], Value::Float(41.5));
        assert_eq!(
            m["tags"],
            Value::List(vec![Value::from("a"), Value::from("b")])
        );
        assert!(m["pet"].as_map().is_some());
        assert!(m["gone"].is_null());
    }

    #[test]
    fn test_json_round_trip() {
        let original = json!({"a": [1, 2.5, "x", null], "b": {"c": true}});
        let value = Value::from(original.clone());
        let back: serde_json::Value = value.into();
        assert_eq!(original, back);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Value::Null.kind_name(), "null");
        assert_eq!(Value::Int(0).kind_name(), "number");
        assert_eq!(Value::Float(0.0).kind_name(), "number");
        assert_eq!(Value::List(vec![]).kind_name(), "list");
    }
}
