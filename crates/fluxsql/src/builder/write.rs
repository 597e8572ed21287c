//! INSERT / UPDATE / DELETE / REPLACE / TRUNCATE mode transitions and write data.

use super::{Assignment, QueryBuilder};
use crate::compiled::StatementKind;
use crate::error::{QbError, QbResult};
use crate::value::{RawSql, Value};

impl QueryBuilder {
    /// Check that the accumulated flags are legal for `kind`, then switch to it.
    fn enter_mode(&mut self, kind: StatementKind) -> QbResult<()> {
        self.check_mode(kind)?;
        self.state.mode = kind;
        Ok(())
    }

    fn check_mode(&self, kind: StatementKind) -> QbResult<()> {
        let dialect = self.conn.dialect();
        if self.state.ignore && !dialect.supports_ignore(kind) {
            return Err(self.unsupported(format!("IGNORE on {kind}")));
        }
        if self.state.limit.is_some() {
            self.check_limit(kind)?;
        }
        if self.state.offset.is_some() {
            self.check_offset(kind)?;
        }
        Ok(())
    }

    fn push_assignments<K, V>(&mut self, data: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let escape = self.escape;
        for (column, value) in data {
            self.upsert_assignment(Assignment {
                column: column.as_ref().trim().to_string(),
                value: value.into(),
                escape,
            });
        }
    }

    /// Later assignments to the same column replace earlier ones, keeping their position.
    fn upsert_assignment(&mut self, assignment: Assignment) {
        match self
            .state
            .assignments
            .iter_mut()
            .find(|a| a.column == assignment.column)
        {
            Some(existing) => *existing = assignment,
            None => self.state.assignments.push(assignment),
        }
    }

    // ==================== Data ====================

    /// Add (or overwrite) a column value for INSERT/UPDATE/REPLACE.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.push_assignments([(column, value.into())]);
        self
    }

    /// Set a column only when `value` is `Some`.
    pub fn set_opt<T: Into<Value>>(&mut self, column: &str, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.set(column, v);
        }
        self
    }

    /// Set a column to a serialized JSON document.
    pub fn set_json<T: serde::Serialize>(&mut self, column: &str, value: &T) -> QbResult<&mut Self> {
        let json = serde_json::to_string(value)
            .map_err(|e| QbError::invalid_argument(format!("{column}: {e}")))?;
        Ok(self.set(column, json))
    }

    /// Set a column to an SQL expression that is never quoted (`"hits + 1"`).
    pub fn set_raw(&mut self, column: &str, sql: &str) -> &mut Self {
        self.set(column, RawSql::new(sql))
    }

    // ==================== Modes ====================

    /// Switch to INSERT, adding `data` as column values.
    pub fn insert<K, V>(&mut self, data: impl IntoIterator<Item = (K, V)>) -> QbResult<&mut Self>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.enter_mode(StatementKind::Insert)?;
        self.push_assignments(data);
        Ok(self)
    }

    /// Switch to UPDATE, adding `data` as SET values.
    pub fn update<K, V>(&mut self, data: impl IntoIterator<Item = (K, V)>) -> QbResult<&mut Self>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.enter_mode(StatementKind::Update)?;
        self.push_assignments(data);
        Ok(self)
    }

    /// `update(data)` with a row limit; fails where the dialect cannot limit an UPDATE.
    pub fn update_limit<K, V>(
        &mut self,
        data: impl IntoIterator<Item = (K, V)>,
        limit: u64,
    ) -> QbResult<&mut Self>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.check_mode(StatementKind::Update)?;
        self.check_limit(StatementKind::Update)?;
        self.state.mode = StatementKind::Update;
        self.state.limit = Some(limit);
        self.push_assignments(data);
        Ok(self)
    }

    /// Switch to DELETE.
    pub fn delete(&mut self) -> QbResult<&mut Self> {
        self.enter_mode(StatementKind::Delete)?;
        Ok(self)
    }

    /// DELETE with a row limit; fails where the dialect cannot limit a DELETE.
    pub fn delete_limit(&mut self, limit: u64) -> QbResult<&mut Self> {
        self.check_mode(StatementKind::Delete)?;
        self.check_limit(StatementKind::Delete)?;
        self.state.mode = StatementKind::Delete;
        self.state.limit = Some(limit);
        Ok(self)
    }

    /// Switch to REPLACE, adding `data` as column values. The first column is the conflict key
    /// on dialects that emulate REPLACE.
    pub fn replace<K, V>(&mut self, data: impl IntoIterator<Item = (K, V)>) -> QbResult<&mut Self>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.enter_mode(StatementKind::Replace)?;
        self.push_assignments(data);
        Ok(self)
    }

    /// Switch to TRUNCATE.
    pub fn truncate(&mut self) -> &mut Self {
        self.state.mode = StatementKind::Truncate;
        self
    }

    /// IGNORE-equivalent for the statement (`INSERT IGNORE`, `INSERT OR IGNORE`,
    /// `ON CONFLICT DO NOTHING`).
    ///
    /// Fails when the current write mode has no IGNORE form on this dialect. In
    /// SELECT mode the check is deferred to the following `insert`/`update`/`delete`.
    pub fn ignore(&mut self) -> QbResult<&mut Self> {
        let mode = self.state.mode;
        if mode != StatementKind::Select && !self.conn.dialect().supports_ignore(mode) {
            return Err(self.unsupported(format!("IGNORE on {mode}")));
        }
        self.state.ignore = true;
        Ok(self)
    }
}
