//! Query results as held in the cache.
//!
//! Results are cached behind an `Arc` and never handed out directly;
//! readers receive a [`ResultSet::materialize`] copy they are free to
//! mutate.

use serde::Serialize;
use sqlcache_core::Value;
use sqlcache_core::cache::Window;

/// One result row, values in column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, column: usize) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<V: Into<Value>> FromIterator<V> for Row {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self { values: iter.into_iter().map(Into::into).collect() }
    }
}

/// Tabular query result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { columns: columns.into_iter().map(Into::into).collect(), rows: Vec::new() }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value at `row`, `column`.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let column = self.column_index(column)?;
        self.rows.get(row)?.get(column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Independent deep copy for a reader.
    pub fn materialize(&self) -> ResultSet {
        self.clone()
    }

    /// Rows inside `window` (1-based start, 0 rows = no limit).
    pub fn slice(&self, window: Window) -> ResultSet {
        let skip = window.start_position.saturating_sub(1);
        let take = if window.is_unlimited() { usize::MAX } else { window.max_rows };
        ResultSet { columns: self.columns.clone(), rows: self.rows.iter().skip(skip).take(take).cloned().collect() }
    }
}
