//! Core types and shared functionality for sqlcache.
//!
//! This crate provides:
//! - The expiring, capacity-bounded cache engine and its key model
//! - Expiration rules parsed from TTL expressions
//! - Clock providers, the dynamic value model and unified error types
//! - Configuration structures

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod value;

pub use cache::{CacheKey, CacheKeyBuilder, ExpirationRules, ExpiringCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use value::Value;
