//! Result rows returned by a [`Driver`](crate::Driver).

use crate::error::{QbError, QbResult};
use crate::value::Value;
use std::sync::Arc;

/// A single result row with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Value by position.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value by column name, failing with a decode error when absent.
    pub fn try_get(&self, column: &str) -> QbResult<&Value> {
        self.get(column)
            .ok_or_else(|| QbError::decode(column, "column not present in row"))
    }
}

/// Trait for types that can be constructed from a result [`Row`].
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> QbResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> QbResult<Self> {
        Ok(row.clone())
    }
}

/// Outcome of a driver call: zero or more rows plus an affected-row count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    rows: Vec<Row>,
    affected: u64,
}

impl QueryResult {
    pub fn new(rows: Vec<Row>) -> Self {
        let affected = rows.len() as u64;
        Self { rows, affected }
    }

    /// Result of a statement that returns no rows.
    pub fn affected(affected: u64) -> Self {
        Self {
            rows: Vec::new(),
            affected,
        }
    }

    pub fn affected_rows(&self) -> u64 {
        self.affected
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// All rows.
    pub fn all(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Row at position `n`.
    pub fn row(&self, n: usize) -> Option<&Row> {
        self.rows.get(n)
    }

    /// `column` of the first row.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.first().and_then(|r| r.get(column))
    }

    /// Map every row with [`FromRow`].
    pub fn all_as<T: FromRow>(&self) -> QbResult<Vec<T>> {
        self.rows.iter().map(T::from_row).collect()
    }

    /// Map the first row with [`FromRow`], if any.
    pub fn first_as<T: FromRow>(&self) -> QbResult<Option<T>> {
        self.first().map(T::from_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Job {
        id: i64,
        name: String,
    }

    impl FromRow for Job {
        fn from_row(row: &Row) -> QbResult<Self> {
            let id = row
                .try_get("id")?
                .as_i64()
                .ok_or_else(|| QbError::decode("id", "expected integer"))?;
            let name = row
                .try_get("name")?
                .as_str()
                .ok_or_else(|| QbError::decode("name", "expected text"))?
                .to_string();
            Ok(Job { id, name })
        }
    }

    #[test]
    fn test_typed_mapping() {
        let result = QueryResult::new(vec![
            Row::from_pairs([("id", Value::Int(1)), ("name", Value::from("dev"))]),
            Row::from_pairs([("id", Value::Int(2)), ("name", Value::from("ops"))]),
        ]);
        let jobs: Vec<Job> = result.all_as().unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].id, 2);
        assert_eq!(jobs[0].name, "dev");
        assert_eq!(result.value("name"), Some(&Value::from("dev")));
    }

    #[test]
    fn test_missing_column_is_decode_error() {
        let row = Row::from_pairs([("id", 1)]);
        assert!(matches!(row.try_get("name"), Err(QbError::Decode { .. })));
    }
}
