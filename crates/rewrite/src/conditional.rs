//! `$if(property){fragment}` expansion.
//!
//! Each occurrence becomes either `(0 = 0 or (fragment))`, where the real
//! fragment is short-circuited away, or `(0 = 1 or (fragment))`, where it
//! decides the predicate.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use sqlcache_core::Value;

use crate::condition::Conditions;
use crate::error::RewriteError;

static IF_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\$if\(\s*(\w+)\s*\)\{(.*?)\}").expect("valid $if pattern"));

/// Whether `value` switches its predicate on.
///
/// `allow_array_empty_string` governs single-element collections: when
/// false, a lone null or empty element counts as absent.
pub fn is_enabled(value: &Value, allow_array_empty_string: bool) -> bool {
    match value {
        Value::Null => false,
        Value::List(items) => match items.as_slice() {
            [] => false,
            [single] if !allow_array_empty_string => !single.is_blank(),
            _ => true,
        },
        other => !other.is_blank(),
    }
}

/// Expand every `$if` construct in `sql`, left to right.
///
/// # Errors
///
/// Returns `RewriteError::UnknownProperty` when a referenced property cannot
/// be resolved.
pub fn expand(sql: &str, conditions: &dyn Conditions, allow_array_empty_string: bool) -> Result<String, RewriteError> {
    replace_all(&IF_PATTERN, sql, |caps| {
        let property = &caps[1];
        let fragment = &caps[2];
        let value = conditions.resolve(property)?;
        let enabled = is_enabled(&value, allow_array_empty_string);
        tracing::trace!(property, enabled, "expanded $if predicate");
        let switch = if enabled { 1 } else { 0 };
        Ok(format!("(0 = {switch} or ({fragment}))"))
    })
}

/// Properties referenced by `$if` constructs, in order of appearance.
///
/// A fragment need not mention its own property, so the on/off state may
/// never reach a bound parameter. Callers that key results by parameters
/// need these as well.
pub fn conditional_properties(sql: &str) -> Vec<String> {
    IF_PATTERN.captures_iter(sql).map(|caps| caps[1].to_string()).collect()
}

/// `Regex::replace_all` with a fallible replacer.
pub(crate) fn replace_all<F>(pattern: &Regex, text: &str, mut replacement: F) -> Result<String, RewriteError>
where
    F: FnMut(&Captures<'_>) -> Result<String, RewriteError>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in pattern.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&text[last..whole.start()]);
        out.push_str(&replacement(&caps)?);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}
