//! `$sort(property){(id clause)...(default clause)}` ORDER BY switch.

use std::sync::LazyLock;

use regex::Regex;

use crate::condition::Conditions;
use crate::error::RewriteError;

static SORT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$sort\(\s*(\w+)\s*\)\s*\{").expect("valid $sort pattern"));

const DEFAULT_CASE: &str = "default";

/// One `(id clause)` alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortCase {
    pub id: String,
    pub clause: String,
}

/// Parsed `$sort` construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSwitch {
    pub property: String,
    pub cases: Vec<SortCase>,
}

impl SortSwitch {
    /// Clause for `selector`, falling back to the `default` case.
    pub fn select(&self, selector: Option<&str>) -> Option<&str> {
        let find = |id: &str| self.cases.iter().find(|case| case.id == id).map(|case| case.clause.as_str());
        selector.and_then(find).or_else(|| find(DEFAULT_CASE))
    }
}

/// Replace every `$sort` construct with `ORDER BY <clause>`, or remove it
/// when neither the selected case nor `default` exists.
///
/// # Errors
///
/// - `RewriteError::UnknownProperty` when the selector property cannot be resolved
/// - `RewriteError::MissingClause` for a case with an id but no clause
/// - `RewriteError::MalformedCases` when the case list is not well formed
pub fn expand(sql: &str, conditions: &dyn Conditions) -> Result<String, RewriteError> {
    let mut out = String::with_capacity(sql.len());
    let mut cursor = 0;

    while let Some(caps) = SORT_PATTERN.captures_at(sql, cursor) {
        let (Some(whole), Some(property)) = (caps.get(0), caps.get(1)) else { break };
        let property = property.as_str();
        let (cases, end) = parse_cases(sql, whole.end(), property)?;
        let switch = SortSwitch { property: property.to_string(), cases };

        let value = conditions.resolve(property)?;
        let selector = value.as_text();

        out.push_str(&sql[cursor..whole.start()]);
        match switch.select(selector.as_deref()) {
            Some(clause) => {
                out.push_str("ORDER BY ");
                out.push_str(clause);
            }
            None => tracing::debug!(property, selector = ?selector, "no matching $sort case; construct removed"),
        }
        cursor = end;
    }

    out.push_str(&sql[cursor..]);
    Ok(out)
}

/// Selector properties referenced by `$sort` constructs, in order of appearance.
///
/// The selected ORDER BY never reaches a bound parameter, so callers that
/// key results by parameters need these values as well.
pub fn selector_properties(sql: &str) -> Vec<String> {
    SORT_PATTERN.captures_iter(sql).map(|caps| caps[1].to_string()).collect()
}

/// Parse `(id clause)` cases starting just after the opening `{`.
///
/// Returns the cases and the offset just past the closing `}`.
fn parse_cases(sql: &str, start: usize, property: &str) -> Result<(Vec<SortCase>, usize), RewriteError> {
    let malformed = |offset: usize| RewriteError::MalformedCases { property: property.to_string(), offset };
    let bytes = sql.as_bytes();
    let mut cases = Vec::new();
    let mut pos = start;

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match bytes.get(pos) {
            Some(b'}') => return Ok((cases, pos + 1)),
            Some(b'(') => {
                let close = matching_paren(bytes, pos).ok_or_else(|| malformed(pos))?;
                cases.push(parse_case(&sql[pos + 1..close], property)?);
                pos = close + 1;
            }
            _ => return Err(malformed(pos)),
        }
    }
}

fn matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, byte) in bytes[open..].iter().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_case(body: &str, property: &str) -> Result<SortCase, RewriteError> {
    let body = body.trim();
    let (id, clause) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
    let clause = clause.trim();
    if clause.is_empty() {
        return Err(RewriteError::MissingClause { property: property.to_string(), case: id.to_string() });
    }
    Ok(SortCase { id: id.to_string(), clause: clause.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Record;
    use sqlcache_core::Value;

    const TEMPLATE: &str = "SELECT * FROM t $sort(id){(1 A)(2 B)(default C)}";

    #[test]
    fn test_matching_case() {
        let record = Record::new().with("id", 2);
        assert_eq!(expand(TEMPLATE, &record).unwrap(), "SELECT * FROM t ORDER BY B");
    }

    #[test]
    fn test_falls_back_to_default() {
        let record = Record::new().with("id", 9);
        assert_eq!(expand(TEMPLATE, &record).unwrap(), "SELECT * FROM t ORDER BY C");
    }

    #[test]
    fn test_no_match_no_default_removes_construct() {
        let record = Record::new().with("id", 9);
        let sql = "SELECT * FROM t $sort(id){(1 A)(2 B)} LIMIT 5";
        let rewritten = expand(sql, &record).unwrap();
        assert_eq!(rewritten, "SELECT * FROM t  LIMIT 5");
        assert!(!rewritten.contains("ORDER BY"));
    }

    #[test]
    fn test_null_selector_uses_default() {
        let record = Record::new().with("id", Value::Null);
        assert_eq!(expand(TEMPLATE, &record).unwrap(), "SELECT * FROM t ORDER BY C");
    }

    #[test]
    fn test_whitespace_trimmed_and_nested_parens() {
        let record = Record::new().with("order", "name");
        let sql = "$sort(order){ (  name   lower(name) asc, coalesce(a, b)  ) ( default id desc ) }";
        assert_eq!(expand(sql, &record).unwrap(), "ORDER BY lower(name) asc, coalesce(a, b)");
    }

    #[test]
    fn test_text_selector() {
        let record = Record::new().with("order", "date");
        let sql = "$sort(order){(name n)(date created_at desc)}";
        assert_eq!(expand(sql, &record).unwrap(), "ORDER BY created_at desc");
    }

    #[test]
    fn test_missing_clause() {
        let record = Record::new().with("id", 1);
        let result = expand("$sort(id){(1)(default C)}", &record);
        assert!(matches!(result, Err(RewriteError::MissingClause { case, .. }) if case == "1"));
    }

    #[test]
    fn test_unterminated_cases() {
        let record = Record::new().with("id", 1);
        assert!(matches!(expand("$sort(id){(1 A)", &record), Err(RewriteError::MalformedCases { .. })));
        assert!(matches!(expand("$sort(id){(1 A", &record), Err(RewriteError::MalformedCases { .. })));
        assert!(matches!(expand("$sort(id){x}", &record), Err(RewriteError::MalformedCases { .. })));
    }

    #[test]
    fn test_unknown_property() {
        let result = expand(TEMPLATE, &Record::new());
        assert!(matches!(result, Err(RewriteError::UnknownProperty(name)) if name == "id"));
    }

    #[test]
    fn test_selector_properties() {
        let sql = "SELECT 1 $sort(a){(1 x)} UNION SELECT 2 $sort( b ){(default y)}";
        assert_eq!(selector_properties(sql), vec!["a".to_string(), "b".to_string()]);
        assert!(selector_properties("SELECT 1").is_empty());
    }

    #[test]
    fn test_select() {
        let switch = SortSwitch {
            property: "id".into(),
            cases: vec![SortCase { id: "1".into(), clause: "A".into() }],
        };
        assert_eq!(switch.select(Some("1")), Some("A"));
        assert_eq!(switch.select(Some("2")), None);
        assert_eq!(switch.select(None), None);
    }
}
