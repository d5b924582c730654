//! Expiring cache engine over a pluggable store.
//!
//! The engine is passive: callers drive every operation synchronously and
//! no background work happens. Concurrent misses for the same key are not
//! de-duplicated; each caller may compute and `add` its own value.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::entry::CacheEntry;
use super::listener::{CacheListener, NoopListener};
use super::store::{CacheStore, LruStore};
use crate::Error;
use crate::clock::Clock;

/// Cache-aside engine with per-entry expiry and lifecycle events.
///
/// The store and clock may be supplied after construction; every operation
/// checks for them and fails with `Error::NotConfigured` when missing.
pub struct ExpiringCache<K, V> {
    store: Option<Arc<dyn CacheStore<K, V>>>,
    clock: Option<Arc<dyn Clock>>,
    listener: Arc<dyn CacheListener<K>>,
}

impl<K, V> Default for ExpiringCache<K, V> {
    fn default() -> Self {
        Self { store: None, clock: None, listener: Arc::new(NoopListener) }
    }
}

impl<K, V> ExpiringCache<K, V>
where
    K: Clone,
{
    /// An engine with no store and no clock yet.
    pub fn unconfigured() -> Self {
        Self::default()
    }

    pub fn new(store: Arc<dyn CacheStore<K, V>>, clock: Arc<dyn Clock>) -> Self {
        Self { store: Some(store), clock: Some(clock), listener: Arc::new(NoopListener) }
    }

    pub fn with_listener(mut self, listener: Arc<dyn CacheListener<K>>) -> Self {
        self.listener = listener;
        self
    }

    pub fn set_store(&mut self, store: Arc<dyn CacheStore<K, V>>) {
        self.store = Some(store);
    }

    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = Some(clock);
    }

    /// Replace the listener. This is a configuration step, not something to
    /// do while the cache is serving traffic.
    pub fn set_listener(&mut self, listener: Arc<dyn CacheListener<K>>) {
        self.listener = listener;
    }

    fn store(&self) -> Result<&dyn CacheStore<K, V>, Error> {
        self.store.as_deref().ok_or(Error::NotConfigured("cache store"))
    }

    fn clock(&self) -> Result<&dyn Clock, Error> {
        self.clock.as_deref().ok_or(Error::NotConfigured("clock"))
    }

    /// Cached value for `key` if present and not expired.
    ///
    /// An expired entry is reported through `on_expire` and dropped.
    pub fn get_if_not_expired(&self, key: &K) -> Result<Option<V>, Error> {
        let store = self.store()?;
        let now = self.clock()?.now();

        let Some(entry) = store.get(key) else {
            self.listener.on_miss(key);
            return Ok(None);
        };

        if entry.is_expired(now) {
            self.listener.on_expire(key, entry.expires_at(), now);
            store.remove_if(key, &|current| current.is_expired(now));
            return Ok(None);
        }

        self.listener.on_hit(key);
        Ok(Some(entry.into_content()))
    }

    /// Store `value` under `key` until `expires_at`, replacing any existing entry.
    pub fn add(&self, key: K, value: V, expires_at: DateTime<Utc>) -> Result<(), Error> {
        let store = self.store()?;
        self.clock()?;

        if let Some((evicted, _)) = store.insert(key.clone(), CacheEntry::new(value, expires_at)) {
            self.listener.on_evict(&evicted);
        }
        self.listener.on_added(&key, expires_at);
        Ok(())
    }

    /// Store `value` with no expiry.
    pub fn add_unlimited(&self, key: K, value: V) -> Result<(), Error> {
        self.add(key, value, DateTime::<Utc>::MAX_UTC)
    }

    /// Remove `key`. Returns whether an entry was present; `on_remove` only
    /// fires in that case.
    pub fn remove(&self, key: &K) -> Result<bool, Error> {
        let store = self.store()?;
        self.clock()?;

        let removed = store.remove(key).is_some();
        if removed {
            self.listener.on_remove(key);
        }
        Ok(removed)
    }

    /// Drop every entry. `on_clear` fires before the store is emptied.
    pub fn clear(&self) -> Result<(), Error> {
        let store = self.store()?;
        self.clock()?;

        self.listener.on_clear();
        store.clear();
        Ok(())
    }

    /// Drop every expired entry, reporting each through `on_expire`.
    pub fn purge_expired(&self) -> Result<usize, Error> {
        let store = self.store()?;
        let now = self.clock()?.now();

        let expired = store.drain_where(&|entry| entry.is_expired(now));
        for (key, entry) in &expired {
            self.listener.on_expire(key, entry.expires_at(), now);
        }
        Ok(expired.len())
    }

    pub fn len(&self) -> Result<usize, Error> {
        Ok(self.store()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.store()?.is_empty())
    }
}

impl<K, V> ExpiringCache<K, V>
where
    K: std::hash::Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Engine backed by an [`LruStore`] of `capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if `capacity` is 0.
    pub fn bounded(capacity: usize, clock: Arc<dyn Clock>) -> Result<Self, Error> {
        let store: Arc<dyn CacheStore<K, V>> = Arc::new(LruStore::new(capacity)?);
        Ok(Self::new(store, clock))
    }
}
