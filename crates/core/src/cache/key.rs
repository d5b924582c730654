//! Cache key identity for parameterized queries.
//!
//! A [`CacheKey`] is the composite of query id, the bound-parameter
//! snapshot and the pagination window. Two keys address the same entry
//! exactly when all of those compare equal. The structural hash is
//! computed once at construction.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use ahash::AHasher;
use sha2::{Digest, Sha256};

use crate::value::Value;

/// Identifies a bound parameter either by 1-based position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKey {
    Index(usize),
    Name(String),
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKey::Index(i) => write!(f, "#{i}"),
            ParamKey::Name(name) => write!(f, ":{name}"),
        }
    }
}

impl From<usize> for ParamKey {
    fn from(index: usize) -> Self {
        ParamKey::Index(index)
    }
}

impl From<&str> for ParamKey {
    fn from(name: &str) -> Self {
        ParamKey::Name(name.to_string())
    }
}

impl From<String> for ParamKey {
    fn from(name: String) -> Self {
        ParamKey::Name(name)
    }
}

/// Snapshot of a statement's bound parameters.
///
/// Insertion order is irrelevant to equality. Rebinding a key replaces
/// the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BoundParameters {
    values: BTreeMap<ParamKey, Value>,
}

impl BoundParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value`, returning the value it replaced.
    pub fn bind(&mut self, key: impl Into<ParamKey>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &ParamKey) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParamKey, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<ParamKey>, V: Into<Value>> FromIterator<(K, V)> for BoundParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.bind(key, value);
        }
        params
    }
}

/// Pagination window of a query.
///
/// `start_position` is 1-based; `max_rows == 0` means no limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    pub start_position: usize,
    pub max_rows: usize,
}

impl Default for Window {
    fn default() -> Self {
        Self { start_position: 1, max_rows: 0 }
    }
}

impl Window {
    pub fn new(start_position: usize, max_rows: usize) -> Self {
        Self { start_position, max_rows }
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_rows == 0
    }
}

/// Immutable identity of a cached query result.
#[derive(Clone)]
pub struct CacheKey {
    query_id: String,
    params: BoundParameters,
    window: Window,
    hash: u64,
}

impl CacheKey {
    pub fn new(query_id: impl Into<String>, params: BoundParameters, window: Window) -> Self {
        let query_id = query_id.into();
        let mut hasher = AHasher::default();
        query_id.hash(&mut hasher);
        params.hash(&mut hasher);
        window.hash(&mut hasher);
        let hash = hasher.finish();
        Self { query_id, params, window, hash }
    }

    /// Start a builder for `query_id`.
    pub fn builder(query_id: impl Into<String>) -> CacheKeyBuilder {
        CacheKeyBuilder::new(query_id)
    }

    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    pub fn params(&self) -> &BoundParameters {
        &self.params
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn start_position(&self) -> usize {
        self.window.start_position
    }

    pub fn max_rows(&self) -> usize {
        self.window.max_rows
    }

    /// Stable SHA-256 hex digest of the key's identity, for logs and operators.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.query_id.as_bytes());
        for (key, value) in self.params.iter() {
            hasher.update(b"\n");
            hasher.update(format!("{key}={value:?}").as_bytes());
        }
        hasher.update(b"\n");
        hasher.update(format!("{}+{}", self.window.start_position, self.window.max_rows).as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.query_id == other.query_id
            && self.window == other.window
            && self.params == other.params
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheKey")
            .field("query_id", &self.query_id)
            .field("params", &self.params.values)
            .field("start_position", &self.window.start_position)
            .field("max_rows", &self.window.max_rows)
            .finish()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.query_id)?;
        for (i, (key, value)) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        write!(f, ")[{}+{}]", self.window.start_position, self.window.max_rows)
    }
}

/// Mutable builder for [`CacheKey`].
///
/// Used by the query path to address results and by operators to
/// reconstruct a key for explicit invalidation.
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    query_id: String,
    params: BoundParameters,
    window: Window,
}

impl CacheKeyBuilder {
    pub fn new(query_id: impl Into<String>) -> Self {
        Self { query_id: query_id.into(), params: BoundParameters::new(), window: Window::default() }
    }

    /// Bind a parameter; a later bind of the same key wins.
    pub fn add_param(&mut self, key: impl Into<ParamKey>, value: impl Into<Value>) -> &mut Self {
        self.params.bind(key, value);
        self
    }

    /// Replace the whole parameter set.
    pub fn params(&mut self, params: BoundParameters) -> &mut Self {
        self.params = params;
        self
    }

    pub fn start_position(&mut self, start_position: usize) -> &mut Self {
        self.window.start_position = start_position;
        self
    }

    pub fn max_rows(&mut self, max_rows: usize) -> &mut Self {
        self.window.max_rows = max_rows;
        self
    }

    pub fn window(&mut self, window: Window) -> &mut Self {
        self.window = window;
        self
    }

    /// Build a key from the builder's current state.
    pub fn build(&self) -> CacheKey {
        CacheKey::new(self.query_id.clone(), self.params.clone(), self.window)
    }
}
