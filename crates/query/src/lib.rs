//! Query execution path for sqlcache.
//!
//! Ties the rewriter and the cache together: registered query text is
//! rewritten, its placeholders are bound, a [`CacheKey`](sqlcache_core::CacheKey)
//! is derived, and results are served from or stored into the expiring cache.

pub mod catalog;
pub mod executor;
pub mod result;
pub mod runner;
pub mod statement;

pub use catalog::QueryCatalog;
pub use executor::QueryExecutor;
pub use result::{ResultSet, Row};
pub use runner::{CachedQueryRunner, ResultCache};
pub use statement::{Placeholder, Statement};
