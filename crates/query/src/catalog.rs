//! Registered query text keyed by query id.

use std::collections::BTreeMap;

use sqlcache_core::{AppConfig, Error};

/// Query id to raw SQL template.
#[derive(Debug, Clone, Default)]
pub struct QueryCatalog {
    queries: BTreeMap<String, String>,
}

impl QueryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self { queries: config.queries.clone() }
    }

    /// Register `sql` under `id`, returning the text it replaced.
    pub fn register(&mut self, id: impl Into<String>, sql: impl Into<String>) -> Option<String> {
        self.queries.insert(id.into(), sql.into())
    }

    pub fn with(mut self, id: impl Into<String>, sql: impl Into<String>) -> Self {
        self.register(id, sql);
        self
    }

    /// Raw template for `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownQuery` if nothing is registered under `id`.
    pub fn get(&self, id: &str) -> Result<&str, Error> {
        self.queries.get(id).map(String::as_str).ok_or_else(|| Error::UnknownQuery(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.queries.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}
