//! Rewriter error types.

use sqlcache_core::Error;

/// Errors from the SQL fragment rewriter.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    /// The condition source has no property with this name.
    #[error("unknown property '{0}'")]
    UnknownProperty(String),

    /// IN-list expansion needs a collection value.
    #[error("property '{name}' must be a collection for ':{name}[]', found {found}")]
    NotACollection { name: String, found: String },

    /// IN-list expansion cannot read element types from a map-backed source.
    #[error("':{0}[]' cannot be expanded from a map-backed condition source")]
    MapSource(String),

    /// A `$sort` case with an id but no clause.
    #[error("$sort({property}) case '{case}' has no clause")]
    MissingClause { property: String, case: String },

    /// `$sort` case list is not a sequence of parenthesized cases closed by `}`.
    #[error("$sort({property}) case list is malformed at offset {offset}")]
    MalformedCases { property: String, offset: usize },

    /// A condition document that is not a JSON object.
    #[error("conditions must be a JSON object, found {0}")]
    NotAnObject(String),
}

impl RewriteError {
    /// True for failures caused by the condition source rather than the template text.
    pub fn is_binding(&self) -> bool {
        matches!(
            self,
            RewriteError::UnknownProperty(_)
                | RewriteError::NotACollection { .. }
                | RewriteError::MapSource(_)
                | RewriteError::NotAnObject(_)
        )
    }
}

impl From<RewriteError> for Error {
    fn from(err: RewriteError) -> Self {
        if err.is_binding() { Error::InvalidBinding(err.to_string()) } else { Error::MalformedTemplate(err.to_string()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_errors_map_to_invalid_binding() {
        let err: Error = RewriteError::UnknownProperty("status".into()).into();
        assert!(matches!(err, Error::InvalidBinding(ref msg) if msg.contains("status")));

        let err: Error = RewriteError::MapSource("ids".into()).into();
        assert!(err.to_string().starts_with("INVALID_BINDING"));
    }

    #[test]
    fn test_template_errors_map_to_malformed_template() {
        let err: Error = RewriteError::MissingClause { property: "sort".into(), case: "1".into() }.into();
        assert!(matches!(err, Error::MalformedTemplate(ref msg) if msg.contains("$sort(sort)")));
    }
}
