//! Records and record identifiers
//!
//! A [`Record`] is an insertion-ordered mapping from attribute names to
//! [`Value`]s. A [`Rid`] is the stable identifier a store assigns to a
//! record: callers may choose one by supplying the primary-key attribute at
//! creation time (any value works — integers, strings, uuid strings), or the
//! store generates a fresh monotonic integer.

use crate::error::LodeError;
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a record within a store
///
/// Opaque to callers; ordering, equality, and hashing follow the canonical
/// value order, so integer and string ids can coexist in one store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rid(Value);

impl Rid {
    /// Wrap a value as a record identifier
    pub fn new(value: impl Into<Value>) -> Self {
        Rid(value.into())
    }

    /// The underlying value
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Consume the rid, returning the underlying value
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Value> for Rid {
    fn from(v: Value) -> Self {
        Rid(v)
    }
}

impl From<i64> for Rid {
    fn from(i: i64) -> Self {
        Rid(Value::Int(i))
    }
}

impl From<i32> for Rid {
    fn from(i: i32) -> Self {
        Rid(Value::Int(i as i64))
    }
}

impl From<&str> for Rid {
    fn from(s: &str) -> Self {
        Rid(Value::String(s.to_string()))
    }
}

impl From<String> for Rid {
    fn from(s: String) -> Self {
        Rid(Value::String(s))
    }
}

/// A schemaless record: attribute names mapped to values, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Record {
            fields: IndexMap::new(),
        }
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check whether the record has no attributes
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Get an attribute value by name
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Resolve a chain of attribute names through nested maps
    ///
    /// An empty chain resolves to nothing; a missing link anywhere in the
    /// chain resolves to `None`.
    pub fn get_path(&self, path: &[String]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.fields.get(first)?;
        for segment in rest {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    /// Check whether an attribute is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Set an attribute, returning the previous value if any
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Remove an attribute, returning its value if it was present
    ///
    /// Remaining attributes keep their relative order.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    /// Merge another record's attributes into this one
    ///
    /// Existing attributes are overwritten in place; new ones append.
    pub fn merge(&mut self, other: Record) {
        for (k, v) in other.fields {
            self.fields.insert(k, v);
        }
    }

    /// Attribute names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    /// Iterate over `(name, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Restrict to the given attribute chains, in their order
    ///
    /// Deep chains descend nested maps and land under the chain's *first*
    /// segment name. Missing chains yield `Null`.
    pub fn project(&self, paths: &[crate::predicate::Path]) -> Record {
        let mut out = Record::new();
        for path in paths {
            let value = self.get_path(path.segments()).cloned().unwrap_or(Value::Null);
            out.insert(path.to_string(), value);
        }
        out
    }
}

impl From<IndexMap<String, Value>> for Record {
    fn from(fields: IndexMap<String, Value>) -> Self {
        Record { fields }
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Map(r.fields)
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Record {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Build a record from a JSON object literal
///
/// Anything other than a JSON object is rejected, which keeps `json!` the
/// convenient way to write records in tests and docs.
impl TryFrom<serde_json::Value> for Record {
    type Error = LodeError;

    fn try_from(v: serde_json::Value) -> Result<Self, Self::Error> {
        match Value::from(v) {
            Value::Map(fields) => Ok(Record { fields }),
            other => Err(LodeError::bad_predicate(format!(
                "record literal must be an object, got {}",
                other.kind_name()
            ))),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Map(self.fields.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person() -> Record {
        Record::try_from(json!({
            "id": 1,
            "name": "frank",
            "dog": {"name": "rex", "age": 10},
        }))
        .unwrap()
    }

    #[test]
    fn test_insertion_order_preserved() {
        let r = person();
        let keys: Vec<&str> = r.keys().collect();
        assert_eq!(keys, vec!["id", "name", "dog"]);
    }

    #[test]
    fn test_get_path_descends_nested_maps() {
        let r = person();
        let path = vec!["dog".to_string(), "age".to_string()];
        assert_eq!(r.get_path(&path), Some(&Value::Int(10)));

        let missing = vec!["dog".to_string(), "breed".to_string()];
        assert_eq!(r.get_path(&missing), None);

        let through_scalar = vec!["name".to_string(), "x".to_string()];
        assert_eq!(r.get_path(&through_scalar), None);

        assert_eq!(r.get_path(&[]), None);
    }

    #[test]
    fn test_merge_overwrites_and_appends() {
        let mut r = person();
        let patch = Record::try_from(json!({"name": "franklin", "age": 33})).unwrap();
        r.merge(patch);
        assert_eq!(r.get("name"), Some(&Value::String("franklin".into())));
        assert_eq!(r.get("age"), Some(&Value::Int(33)));
        let keys: Vec<&str> = r.keys().collect();
        assert_eq!(keys, vec!["id", "name", "dog", "age"]);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut r = person();
        assert!(r.remove("name").is_some());
        let keys: Vec<&str> = r.keys().collect();
        assert_eq!(keys, vec!["id", "dog"]);
        assert!(r.remove("name").is_none());
    }

    #[test]
    fn test_try_from_rejects_non_objects() {
        assert!(Record::try_from(json!([1, 2, 3])).is_err());
        assert!(Record::try_from(json!("scalar")).is_err());
        assert!(Record::try_from(json!({})).is_ok());
    }

    #[test]
    fn test_rid_ordering_and_display() {
        let a = Rid::from(1);
        let b = Rid::from(2);
        let s = Rid::from("zeta");
        assert!(a < b);
        // Numbers order below strings in the canonical order.
        assert!(b < s);
        assert_eq!(a.to_string(), "1");
        assert_eq!(s.to_string(), "\"zeta\"");
    }
}
