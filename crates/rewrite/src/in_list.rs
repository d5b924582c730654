//! `:name[]` variable IN-list expansion.

use std::sync::LazyLock;

use regex::Regex;
use sqlcache_core::Value;

use crate::condition::Conditions;
use crate::conditional::replace_all;
use crate::error::RewriteError;

static IN_LIST_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":(\w+)\[\]").expect("valid IN-list pattern"));

/// Expand every `:name[]` into `:name[0],:name[1],...` sized to the bound collection.
///
/// An empty collection leaves `:name[]` in place; the statement then fails
/// to bind it.
///
/// # Errors
///
/// - `RewriteError::MapSource` when `conditions` is map-backed
/// - `RewriteError::UnknownProperty` when `name` cannot be resolved
/// - `RewriteError::NotACollection` when the value is not a list
pub fn expand(sql: &str, conditions: &dyn Conditions) -> Result<String, RewriteError> {
    replace_all(&IN_LIST_PATTERN, sql, |caps| {
        let name = &caps[1];
        if conditions.is_map() {
            return Err(RewriteError::MapSource(name.to_string()));
        }

        let value = conditions.resolve(name)?;
        let size = match &value {
            Value::List(items) => items.len(),
            other => return Err(RewriteError::NotACollection { name: name.to_string(), found: kind(other).to_string() }),
        };

        if size == 0 {
            tracing::debug!(property = name, "empty collection left unexpanded");
            return Ok(caps[0].to_string());
        }

        Ok((0..size).map(|i| format!(":{name}[{i}]")).collect::<Vec<_>>().join(","))
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Int(_) => "integer",
        Value::Float(_) => "float",
        Value::Text(_) => "text",
        Value::Bytes(_) => "bytes",
        Value::Timestamp(_) => "timestamp",
        Value::List(_) => "list",
    }
}
