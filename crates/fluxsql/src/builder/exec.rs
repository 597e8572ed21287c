//! Terminal operations that run the compiled statement through the driver.

use super::QueryBuilder;
use crate::compiled::{CompiledQuery, StatementKind};
use crate::connection::Connection;
use crate::error::{QbError, QbResult};
use crate::row::{FromRow, QueryResult, Row};
use crate::value::Value;

impl QueryBuilder {
    /// Compile (resetting unless preserved) and run the statement.
    ///
    /// SELECTs return their rows; writes return an empty result carrying the
    /// affected row count.
    pub fn execute(&mut self) -> QbResult<QueryResult> {
        let compiled = self.compile()?;
        run(&self.conn, &compiled)
    }

    /// Run a SELECT and return all rows.
    pub fn get(&mut self) -> QbResult<QueryResult> {
        if self.state.mode != StatementKind::Select {
            return Err(QbError::invalid_argument(format!(
                "get() needs a SELECT, builder is in {} mode",
                self.state.mode
            )));
        }
        self.execute()
    }

    /// Run a SELECT and map every row.
    pub fn get_as<T: FromRow>(&mut self) -> QbResult<Vec<T>> {
        self.get()?.all_as()
    }

    /// First row of the SELECT, fetched with `LIMIT 1`.
    pub fn first(&mut self) -> QbResult<Option<Row>> {
        let mut single = self.clone();
        single.state.limit = Some(1);
        let result = single.get()?;
        if !self.preserve {
            self.reset();
        }
        Ok(result.into_rows().into_iter().next())
    }

    pub fn first_as<T: FromRow>(&mut self) -> QbResult<Option<T>> {
        self.first()?.map(|row| T::from_row(&row)).transpose()
    }

    /// `column` of the first row.
    pub fn value(&mut self, column: &str) -> QbResult<Option<Value>> {
        Ok(self.first()?.and_then(|row| row.get(column).cloned()))
    }
}

/// Run a compiled statement, including its preamble and REPLACE emulation.
pub(crate) fn run(conn: &Connection, compiled: &CompiledQuery) -> QbResult<QueryResult> {
    for statement in &compiled.preamble {
        conn.execute(statement)?;
    }

    if let Some(fallback) = &compiled.replace_fallback {
        tracing::warn!(
            target: "fluxsql.sql",
            dialect = conn.dialect().name(),
            probe = %fallback.probe,
            "emulating REPLACE with probe and branch; not atomic under concurrent writers"
        );
        let exists = !conn.query(&fallback.probe)?.is_empty();
        let sql = if exists {
            &fallback.update
        } else {
            &compiled.sql
        };
        return Ok(QueryResult::affected(conn.execute(sql)?));
    }

    match compiled.kind {
        StatementKind::Select => conn.query(&compiled.sql),
        _ => Ok(QueryResult::affected(conn.execute(&compiled.sql)?)),
    }
}
