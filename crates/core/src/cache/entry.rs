//! Cached value paired with its absolute expiry.

use chrono::{DateTime, Utc};

/// Immutable cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    content: V,
    expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    pub fn new(content: V, expires_at: DateTime<Utc>) -> Self {
        Self { content, expires_at }
    }

    /// Entry that never expires.
    pub fn unlimited(content: V) -> Self {
        Self::new(content, DateTime::<Utc>::MAX_UTC)
    }

    pub fn content(&self) -> &V {
        &self.content
    }

    pub fn into_content(self) -> V {
        self.content
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_unlimited(&self) -> bool {
        self.expires_at == DateTime::<Utc>::MAX_UTC
    }

    /// True only when `now` is strictly after the expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
