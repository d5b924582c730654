//! In-memory expiring cache for query results.
//!
//! This module provides:
//!
//! - TTL expression parsing and per-query expiration rules
//! - A capacity-bounded LRU store behind a pluggable [`CacheStore`] trait
//! - The [`ExpiringCache`] engine with lifecycle listeners
//! - The [`CacheKey`] identity model and its builder

pub mod engine;
pub mod entry;
pub mod expiration;
pub mod key;
pub mod listener;
pub mod stats;
pub mod store;

pub use crate::Error;

pub use engine::ExpiringCache;
pub use entry::CacheEntry;
pub use expiration::{ExpirationRules, TimeUnit, Ttl, UnitTable};
pub use key::{BoundParameters, CacheKey, CacheKeyBuilder, ParamKey, Window};
pub use listener::{CacheListener, ListenerChain, NoopListener, TracingListener};
pub use stats::CacheStats;
pub use store::{CacheStore, LruStore};
