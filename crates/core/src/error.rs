//! Unified error types for sqlcache.
//!
//! Every variant renders with a stable upper-case code prefix so that
//! misconfiguration can be diagnosed from logs alone.

use crate::config::ConfigError;

/// Unified error type shared by the cache, rewriter and query crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Fatal misconfiguration (unregistered expiration id, bad capacity, ...).
    #[error("CONFIGURATION: {0}")]
    Configuration(String),

    /// A required dependency of the cache engine was never configured.
    #[error("NOT_CONFIGURED: {0} must be configured before the cache is used")]
    NotConfigured(&'static str),

    /// TTL expression does not match `<amount><unit>` or the unit is unknown.
    #[error("MALFORMED_EXPRESSION: {0}")]
    MalformedExpression(String),

    /// A template property could not be resolved or has the wrong shape.
    #[error("INVALID_BINDING: {0}")]
    InvalidBinding(String),

    /// Template text is syntactically broken (e.g. a `$sort` case without a clause).
    #[error("MALFORMED_TEMPLATE: {0}")]
    MalformedTemplate(String),

    /// No query text registered for the given id.
    #[error("UNKNOWN_QUERY: {0}")]
    UnknownQuery(String),

    /// The underlying query executor failed.
    #[error("EXECUTION_FAILED: {0}")]
    Execution(String),
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MalformedExpression("10parsecs".to_string());
        assert!(err.to_string().contains("MALFORMED_EXPRESSION"));
        assert!(err.to_string().contains("10parsecs"));
    }

    #[test]
    fn test_not_configured_names_component() {
        let err = Error::NotConfigured("clock");
        assert_eq!(err.to_string(), "NOT_CONFIGURED: clock must be configured before the cache is used");
    }

    #[test]
    fn test_config_error_conversion() {
        let err: Error = ConfigError::Invalid { field: "capacity".into(), reason: "must be greater than 0".into() }.into();
        assert!(matches!(err, Error::Configuration(ref msg) if msg.contains("capacity")));
    }
}
