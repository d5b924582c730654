//! Named-placeholder statements and parameter binding.
//!
//! Placeholders are `:name` for a scalar property and `:name[i]` for the
//! i-th element of a collection property (as produced by IN-list
//! expansion). Names start with a letter or underscore. A `::` cast and
//! anything inside a single-quoted literal are not placeholders.

use std::sync::LazyLock;

use regex::Regex;
use sqlcache_core::Error;
use sqlcache_core::cache::{BoundParameters, ParamKey};
use sqlcache_rewrite::Conditions;

static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([A-Za-z_]\w*)(\[(\d*)\])?").expect("valid placeholder pattern"));

/// A placeholder occurrence in statement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    /// `:name`
    Named(String),
    /// `:name[index]`, zero-based element of a collection.
    Element { name: String, index: usize },
    /// `:name[]` left behind by an empty IN-list.
    Unexpanded(String),
}

impl Placeholder {
    pub fn name(&self) -> &str {
        match self {
            Placeholder::Named(name) | Placeholder::Element { name, .. } | Placeholder::Unexpanded(name) => name,
        }
    }
}

/// Rewritten query text with its placeholders in order of appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    placeholders: Vec<Placeholder>,
    spans: Vec<(usize, usize)>,
}

impl Statement {
    pub fn parse(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let bytes = sql.as_bytes();
        let mut placeholders = Vec::new();
        let mut spans = Vec::new();
        let literals = quoted_literals(&sql);

        for caps in PLACEHOLDER_PATTERN.captures_iter(&sql) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else { continue };
            if whole.start() > 0 && bytes[whole.start() - 1] == b':' {
                continue;
            }
            if literals.iter().any(|&(start, end)| (start..end).contains(&whole.start())) {
                continue;
            }

            let name = name.as_str().to_string();
            let placeholder = match caps.get(3).map(|m| m.as_str()) {
                None => Placeholder::Named(name),
                Some("") => Placeholder::Unexpanded(name),
                Some(digits) => match digits.parse() {
                    Ok(index) => Placeholder::Element { name, index },
                    Err(_) => Placeholder::Unexpanded(name),
                },
            };
            placeholders.push(placeholder);
            spans.push((whole.start(), whole.end()));
        }

        Self { sql, placeholders, spans }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// Statement text with every placeholder replaced by `?`, for drivers
    /// that bind by position.
    pub fn positional_sql(&self) -> String {
        let mut out = String::with_capacity(self.sql.len());
        let mut last = 0;
        for &(start, end) in &self.spans {
            out.push_str(&self.sql[last..start]);
            out.push('?');
            last = end;
        }
        out.push_str(&self.sql[last..]);
        out
    }

    /// Snapshot the value of every placeholder from `conditions`.
    ///
    /// Scalars are bound by name. Collection elements are bound by their
    /// 1-based position among all placeholders.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidBinding` when a property cannot be resolved,
    /// an element index is out of range, or an empty IN-list placeholder
    /// was left in the text.
    pub fn bind(&self, conditions: &dyn Conditions) -> Result<BoundParameters, Error> {
        let mut params = BoundParameters::new();

        for (offset, placeholder) in self.placeholders.iter().enumerate() {
            let position = offset + 1;
            match placeholder {
                Placeholder::Named(name) => {
                    let value = conditions.resolve(name)?;
                    params.bind(ParamKey::Name(name.clone()), value);
                }
                Placeholder::Element { name, index } => {
                    let value = conditions.resolve(name)?;
                    let element = value.as_list().and_then(|items| items.get(*index)).cloned().ok_or_else(|| {
                        Error::InvalidBinding(format!("':{name}[{index}]' does not address an element of '{name}'"))
                    })?;
                    params.bind(ParamKey::Index(position), element);
                }
                Placeholder::Unexpanded(name) => {
                    return Err(Error::InvalidBinding(format!("':{name}[]' has no elements to bind")));
                }
            }
        }

        Ok(params)
    }
}

/// Byte ranges of single-quoted literals, quotes included. A doubled `''`
/// inside a literal closes and reopens it, which yields the same coverage.
/// An unterminated literal runs to the end of the text.
fn quoted_literals(sql: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut open = None;
    for (i, byte) in sql.bytes().enumerate() {
        if byte != b'\'' {
            continue;
        }
        match open.take() {
            Some(start) => ranges.push((start, i + 1)),
            None => open = Some(i),
        }
    }
    if let Some(start) = open {
        ranges.push((start, sql.len()));
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlcache_core::Value;
    use sqlcache_rewrite::Record;

    #[test]
    fn test_parse_placeholders() {
        let stmt = Statement::parse("SELECT * FROM t WHERE a = :a AND id in (:ids[0],:ids[1]) AND c::text = :c");
        assert_eq!(
            stmt.placeholders(),
            &[
                Placeholder::Named("a".into()),
                Placeholder::Element { name: "ids".into(), index: 0 },
                Placeholder::Element { name: "ids".into(), index: 1 },
                Placeholder::Named("c".into()),
            ]
        );
    }

    #[test]
    fn test_colons_inside_literals_are_not_placeholders() {
        let stmt = Statement::parse("SELECT * FROM shops WHERE opens = '10:30' AND note = 'a '':b'' c' AND id = :id");
        assert_eq!(stmt.placeholders(), &[Placeholder::Named("id".into())]);
        assert_eq!(
            stmt.positional_sql(),
            "SELECT * FROM shops WHERE opens = '10:30' AND note = 'a '':b'' c' AND id = ?"
        );

        let params = stmt.bind(&Record::new().with("id", 7)).unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params.get(&ParamKey::from("id")), Some(&Value::Int(7)));
    }

    #[test]
    fn test_names_start_with_letter_or_underscore() {
        let stmt = Statement::parse("a = :_a AND b = :9b AND c = :c1");
        assert_eq!(stmt.placeholders(), &[Placeholder::Named("_a".into()), Placeholder::Named("c1".into())]);
    }

    #[test]
    fn test_positional_sql() {
        let stmt = Statement::parse("a = :a AND id in (:ids[0],:ids[1]) AND c::text = 'x'");
        assert_eq!(stmt.positional_sql(), "a = ? AND id in (?,?) AND c::text = 'x'");
    }

    #[test]
    fn test_bind() {
        let record = Record::new().with("a", "x").with("ids", Value::from_iter([10, 20]));
        let stmt = Statement::parse("a = :a AND id in (:ids[0],:ids[1])");
        let params = stmt.bind(&record).unwrap();

        assert_eq!(params.len(), 3);
        assert_eq!(params.get(&ParamKey::from("a")), Some(&Value::from("x")));
        assert_eq!(params.get(&ParamKey::Index(2)), Some(&Value::Int(10)));
        assert_eq!(params.get(&ParamKey::Index(3)), Some(&Value::Int(20)));
    }

    #[test]
    fn test_bind_unknown_property() {
        let stmt = Statement::parse("a = :a");
        assert!(matches!(stmt.bind(&Record::new()), Err(Error::InvalidBinding(msg)) if msg.contains("'a'")));
    }

    #[test]
    fn test_bind_unexpanded_list() {
        let record = Record::new().with("ids", Value::List(vec![]));
        let stmt = Statement::parse("id in (:ids[])");
        assert_eq!(stmt.placeholders(), &[Placeholder::Unexpanded("ids".into())]);
        assert!(matches!(stmt.bind(&record), Err(Error::InvalidBinding(_))));
    }

    #[test]
    fn test_bind_index_out_of_range() {
        let record = Record::new().with("ids", Value::from_iter([1]));
        let stmt = Statement::parse("id in (:ids[0],:ids[1])");
        assert!(matches!(stmt.bind(&record), Err(Error::InvalidBinding(_))));
    }
}
