//! Ordered application of the three rewrite passes.

use crate::condition::Conditions;
use crate::error::RewriteError;
use crate::{conditional, in_list, order_by};

/// Rewriter policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteConfig {
    /// A one-element collection holding an empty string still enables `$if`.
    pub allow_array_empty_string: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self { allow_array_empty_string: true }
    }
}

impl From<&sqlcache_core::AppConfig> for RewriteConfig {
    fn from(config: &sqlcache_core::AppConfig) -> Self {
        Self { allow_array_empty_string: config.allow_array_empty_string }
    }
}

/// Rewrites raw query text before parameter binding.
///
/// Passes run in a fixed order: `$if`, then `:name[]`, then `$sort`.
/// Text outside the three constructs is passed through verbatim.
#[derive(Debug, Clone, Default)]
pub struct Rewriter {
    config: RewriteConfig,
}

impl Rewriter {
    pub fn new(config: RewriteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> RewriteConfig {
        self.config
    }

    /// Apply every pass to `sql`.
    ///
    /// # Errors
    ///
    /// Returns the first `RewriteError` raised by any pass.
    pub fn rewrite(&self, sql: &str, conditions: &dyn Conditions) -> Result<String, RewriteError> {
        let sql = conditional::expand(sql, conditions, self.config.allow_array_empty_string)?;
        let sql = in_list::expand(&sql, conditions)?;
        let sql = order_by::expand(&sql, conditions)?;
        tracing::debug!(length = sql.len(), "rewrote query text");
        Ok(sql)
    }
}
