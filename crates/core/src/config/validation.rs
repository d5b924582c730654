//! Startup checks for a loaded `AppConfig`.
//!
//! A configuration that passes here builds expiration rules and a
//! bounded cache without further errors.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `capacity` is 0
    /// - a unit name in `units` is unknown
    /// - an `expiration` expression does not parse
    /// - an `expiration` rule names a query id with no registered SQL
    ///   (only when `queries` is non-empty)
    /// - a query template is blank
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid { field: "capacity".into(), reason: "must be greater than 0".into() });
        }

        let units = self.unit_table()?;
        for (id, expression) in &self.expiration {
            units.parse(expression).map_err(|e| ConfigError::Invalid {
                field: format!("expiration.{id}"),
                reason: e.to_string(),
            })?;
        }

        for (id, sql) in &self.queries {
            if sql.trim().is_empty() {
                return Err(ConfigError::Invalid { field: format!("queries.{id}"), reason: "must not be empty".into() });
            }
        }

        if !self.queries.is_empty()
            && let Some(id) = self.expiration.keys().find(|id| !self.queries.contains_key(*id))
        {
            return Err(ConfigError::Invalid {
                field: format!("expiration.{id}"),
                reason: "no query registered with this id".into(),
            });
        }

        if self.expiration.is_empty() && !self.queries.is_empty() {
            tracing::warn!(
                query_count = self.queries.len(),
                "No expiration rules configured; query results will not be cached"
            );
        }

        Ok(())
    }
}
