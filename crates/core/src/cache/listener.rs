//! Lifecycle hooks fired by the expiring cache engine.
//!
//! Hooks run synchronously on the calling thread. Every method has a no-op
//! default, so implementors override only what they observe.

use std::fmt::Debug;
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Observer of cache lifecycle events.
pub trait CacheListener<K>: Send + Sync {
    fn on_hit(&self, _key: &K) {}

    fn on_miss(&self, _key: &K) {}

    /// An entry was found past its expiry and dropped.
    fn on_expire(&self, _key: &K, _expired_at: DateTime<Utc>, _now: DateTime<Utc>) {}

    fn on_added(&self, _key: &K, _expires_at: DateTime<Utc>) {}

    /// Caller-driven removal of an entry that was present.
    fn on_remove(&self, _key: &K) {}

    fn on_clear(&self) {}

    /// Involuntary removal caused by capacity pressure.
    fn on_evict(&self, _key: &K) {}
}

/// Listener that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl<K> CacheListener<K> for NoopListener {}

/// Listener that reports every event through `tracing` at debug level.
#[derive(Debug, Clone, Default)]
pub struct TracingListener {
    cache_name: String,
}

impl TracingListener {
    pub fn new(cache_name: impl Into<String>) -> Self {
        Self { cache_name: cache_name.into() }
    }
}

impl<K: Debug> CacheListener<K> for TracingListener {
    fn on_hit(&self, key: &K) {
        tracing::debug!(cache = %self.cache_name, ?key, "cache hit");
    }

    fn on_miss(&self, key: &K) {
        tracing::debug!(cache = %self.cache_name, ?key, "cache miss");
    }

    fn on_expire(&self, key: &K, expired_at: DateTime<Utc>, now: DateTime<Utc>) {
        tracing::debug!(
            cache = %self.cache_name,
            ?key,
            expired_at = %expired_at.to_rfc3339(),
            now = %now.to_rfc3339(),
            "cache entry expired"
        );
    }

    fn on_added(&self, key: &K, expires_at: DateTime<Utc>) {
        tracing::debug!(cache = %self.cache_name, ?key, expires_at = %expires_at.to_rfc3339(), "cache entry added");
    }

    fn on_remove(&self, key: &K) {
        tracing::debug!(cache = %self.cache_name, ?key, "cache entry removed");
    }

    fn on_clear(&self) {
        tracing::debug!(cache = %self.cache_name, "cache cleared");
    }

    fn on_evict(&self, key: &K) {
        tracing::debug!(cache = %self.cache_name, ?key, "cache entry evicted");
    }
}

/// Fans each event out to several listeners in registration order.
pub struct ListenerChain<K> {
    listeners: Vec<Arc<dyn CacheListener<K>>>,
}

impl<K> Default for ListenerChain<K> {
    fn default() -> Self {
        Self { listeners: Vec::new() }
    }
}

impl<K> ListenerChain<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, listener: Arc<dyn CacheListener<K>>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<K> CacheListener<K> for ListenerChain<K> {
    fn on_hit(&self, key: &K) {
        self.listeners.iter().for_each(|l| l.on_hit(key));
    }

    fn on_miss(&self, key: &K) {
        self.listeners.iter().for_each(|l| l.on_miss(key));
    }

    fn on_expire(&self, key: &K, expired_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.listeners.iter().for_each(|l| l.on_expire(key, expired_at, now));
    }

    fn on_added(&self, key: &K, expires_at: DateTime<Utc>) {
        self.listeners.iter().for_each(|l| l.on_added(key, expires_at));
    }

    fn on_remove(&self, key: &K) {
        self.listeners.iter().for_each(|l| l.on_remove(key));
    }

    fn on_clear(&self) {
        self.listeners.iter().for_each(|l| l.on_clear());
    }

    fn on_evict(&self, key: &K) {
        self.listeners.iter().for_each(|l| l.on_evict(key));
    }
}
