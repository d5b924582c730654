//! Cache statistics gathered from lifecycle events.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use super::listener::CacheListener;

/// Counters for cache lifecycle events.
///
/// Register as a listener (directly or inside a
/// [`ListenerChain`](super::ListenerChain)) to collect them.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    additions: AtomicU64,
    removals: AtomicU64,
    clears: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }

    pub fn additions(&self) -> u64 {
        self.additions.load(Ordering::Relaxed)
    }

    pub fn removals(&self) -> u64 {
        self.removals.load(Ordering::Relaxed)
    }

    pub fn clears(&self) -> u64 {
        self.clears.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Fraction of lookups served from the cache (0.0 to 1.0).
    ///
    /// Expired lookups count as misses.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses() + self.expirations();
        if total == 0 { 0.0 } else { hits as f64 / total as f64 }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.expirations,
            &self.additions,
            &self.removals,
            &self.clears,
            &self.evictions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl<K> CacheListener<K> for CacheStats {
    fn on_hit(&self, _key: &K) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn on_miss(&self, _key: &K) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn on_expire(&self, _key: &K, _expired_at: DateTime<Utc>, _now: DateTime<Utc>) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    fn on_added(&self, _key: &K, _expires_at: DateTime<Utc>) {
        self.additions.fetch_add(1, Ordering::Relaxed);
    }

    fn on_remove(&self, _key: &K) {
        self.removals.fetch_add(1, Ordering::Relaxed);
    }

    fn on_clear(&self) {
        self.clears.fetch_add(1, Ordering::Relaxed);
    }

    fn on_evict(&self, _key: &K) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }
}
