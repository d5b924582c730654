//! Condition sources the rewriter reads property values from.
//!
//! Two shapes are supported:
//!
//! - Map-backed sources (`HashMap`/`BTreeMap` of `String` to [`Value`]):
//!   loosely typed, a missing key reads as `Null`.
//! - Typed sources ([`Record`], [`FnConditions`]): a fixed set of declared
//!   properties, an unknown name is a binding error.

use std::collections::{BTreeMap, HashMap};

use sqlcache_core::Value;

use crate::error::RewriteError;

/// A caller-supplied object the rewriter reads properties from.
pub trait Conditions {
    /// Value of `name`, or `None` when the source has no such property.
    fn property(&self, name: &str) -> Option<Value>;

    /// Whether this source is a loosely-typed map.
    fn is_map(&self) -> bool {
        false
    }

    /// Resolve `name`, failing when the property is unknown.
    fn resolve(&self, name: &str) -> Result<Value, RewriteError> {
        self.property(name).ok_or_else(|| RewriteError::UnknownProperty(name.to_string()))
    }
}

impl<C: Conditions + ?Sized> Conditions for &C {
    fn property(&self, name: &str) -> Option<Value> {
        (**self).property(name)
    }

    fn is_map(&self) -> bool {
        (**self).is_map()
    }
}

impl<S: std::hash::BuildHasher> Conditions for HashMap<String, Value, S> {
    fn property(&self, name: &str) -> Option<Value> {
        Some(self.get(name).cloned().unwrap_or(Value::Null))
    }

    fn is_map(&self) -> bool {
        true
    }
}

impl Conditions for BTreeMap<String, Value> {
    fn property(&self, name: &str) -> Option<Value> {
        Some(self.get(name).cloned().unwrap_or(Value::Null))
    }

    fn is_map(&self) -> bool {
        true
    }
}

/// Typed condition object with a declared set of properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a property.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a record from a JSON object; every top-level key becomes a property.
    ///
    /// # Errors
    ///
    /// Returns `RewriteError::NotAnObject` if `json` is not an object.
    pub fn from_json(json: serde_json::Value) -> Result<Self, RewriteError> {
        match json {
            serde_json::Value::Object(map) => {
                Ok(Self { fields: map.into_iter().map(|(name, value)| (name, Value::from(value))).collect() })
            }
            other => Err(RewriteError::NotAnObject(json_kind(&other).to_string())),
        }
    }

    /// Same fields as a loosely-typed map source.
    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.fields
    }
}

impl Conditions for Record {
    fn property(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

/// Typed source backed by an accessor closure.
pub struct FnConditions<F> {
    accessor: F,
}

/// Wrap a property accessor as a typed condition source.
pub fn from_fn<F>(accessor: F) -> FnConditions<F>
where
    F: Fn(&str) -> Option<Value>,
{
    FnConditions { accessor }
}

impl<F> Conditions for FnConditions<F>
where
    F: Fn(&str) -> Option<Value>,
{
    fn property(&self, name: &str) -> Option<Value> {
        (self.accessor)(name)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_missing_key_reads_null() {
        let map: HashMap<String, Value> = HashMap::new();
        assert_eq!(map.resolve("anything").unwrap(), Value::Null);
        assert!(map.is_map());
    }

    #[test]
    fn test_record_unknown_property() {
        let record = Record::new().with("name", "alice");
        assert_eq!(record.resolve("name").unwrap(), Value::from("alice"));
        assert!(matches!(record.resolve("age"), Err(RewriteError::UnknownProperty(name)) if name == "age"));
        assert!(!record.is_map());
    }

    #[test]
    fn test_record_from_json() {
        let record = Record::from_json(json!({"ids": [1, 2], "name": null})).unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record.property("ids"), Some(Value::List(vec![Value::Int(1), Value::Int(2)])));
        assert_eq!(record.property("name"), Some(Value::Null));
    }

    #[test]
    fn test_record_from_json_rejects_non_object() {
        let result = Record::from_json(json!([1, 2]));
        assert!(matches!(result, Err(RewriteError::NotAnObject(kind)) if kind == "array"));
    }

    #[test]
    fn test_fn_conditions() {
        let source = from_fn(|name| (name == "status").then(|| Value::from("open")));
        assert_eq!(source.resolve("status").unwrap(), Value::from("open"));
        assert!(source.resolve("owner").is_err());
    }
}
