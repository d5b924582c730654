//! Layered configuration for the cache, rewriter and query catalog.
//!
//! Sources, lowest precedence first: built-in defaults, a TOML file
//! (`SQLCACHE_CONFIG_FILE` or an explicit path), then `SQLCACHE_*`
//! environment variables with `__` separating nested keys.
//!
//! Figment lowercases environment keys, so query ids in `expiration` and
//! `queries` are best kept in the TOML file.

use std::collections::BTreeMap;
use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::cache::{ExpirationRules, TimeUnit, UnitTable};

mod validation;

pub use validation::ConfigError;

/// sqlcache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Maximum number of cached query results.
    ///
    /// Set via SQLCACHE_CAPACITY environment variable.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Whether a single-element list holding an empty string still enables
    /// a `$if` predicate.
    ///
    /// Set via SQLCACHE_ALLOW_ARRAY_EMPTY_STRING environment variable.
    #[serde(default = "default_true")]
    pub allow_array_empty_string: bool,

    /// Expiration rules: query id to TTL expression (e.g. `100ms`, `30sec`).
    ///
    /// Queries without a rule are never cached.
    #[serde(default)]
    pub expiration: BTreeMap<String, String>,

    /// Extra unit tokens for TTL expressions: token to unit name
    /// (`millisecond`, `second`, `minute`, `hour`, `day`).
    #[serde(default)]
    pub units: BTreeMap<String, String>,

    /// Raw SQL templates keyed by query id.
    #[serde(default)]
    pub queries: BTreeMap<String, String>,
}

fn default_capacity() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            allow_array_empty_string: true,
            expiration: BTreeMap::new(),
            units: BTreeMap::new(),
            queries: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SQLCACHE_`
    /// 2. TOML file from `SQLCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var("SQLCACHE_CONFIG_FILE").ok();
        Self::load_layers(file.as_deref().map(Path::new))
    }

    /// Load with an explicit TOML file in place of `SQLCACHE_CONFIG_FILE`.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::load`].
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load_layers(Some(path.as_ref()))
    }

    fn load_layers(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(
            Env::prefixed("SQLCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        tracing::info!(
            capacity = config.capacity,
            rules = config.expiration.len(),
            queries = config.queries.len(),
            "Loaded configuration"
        );

        Ok(config)
    }

    /// Default unit table extended with the configured tokens.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for an unknown unit name.
    pub fn unit_table(&self) -> Result<UnitTable, ConfigError> {
        self.units.iter().try_fold(UnitTable::default(), |table, (token, name)| {
            let unit = TimeUnit::from_name(name).ok_or_else(|| ConfigError::Invalid {
                field: format!("units.{token}"),
                reason: format!("unknown unit '{name}'"),
            })?;
            Ok(table.with_token(token.clone(), unit))
        })
    }

    /// Build expiration rules from the `expiration` table.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for a bad unit table and
    /// `Error::MalformedExpression` for a bad TTL expression.
    pub fn expiration_rules(&self) -> Result<ExpirationRules, Error> {
        let rules = ExpirationRules::with_units(self.unit_table()?);
        rules.load(self.expiration.iter().map(|(id, expr)| (id.clone(), expr.clone())))?;
        Ok(rules)
    }
}
