//! COUNT / SUM / AVG / MIN / MAX helpers built on the compiler.
//!
//! The select list is swapped for a single `FUNC(field) AS aggregate`
//! expression. When DISTINCT, GROUP BY or LIMIT/OFFSET shape the row set, the
//! original SELECT is kept intact as a derived table and aggregated from an
//! outer query instead:
//!
//! ```text
//! SELECT COUNT(*) AS aggregate FROM (SELECT DISTINCT city FROM users) AS aggregate_table
//! ```

use super::{QueryBuilder, SelectField};
use crate::compiled::{CompiledQuery, StatementKind};
use crate::error::{QbError, QbResult};
use crate::row::QueryResult;
use crate::value::Value;

/// Result column name of every aggregate query.
const AGGREGATE_COLUMN: &str = "aggregate";
const DERIVED_TABLE: &str = "aggregate_table";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Aggregate {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregate {
    fn as_str(&self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        }
    }
}

impl QueryBuilder {
    fn needs_derived_table(&self) -> bool {
        self.state.distinct
            || !self.state.groups.is_empty()
            || self.state.limit.is_some()
            || self.state.offset.is_some()
    }

    fn aggregate_query(&self, func: Aggregate, field: &str) -> QbResult<CompiledQuery> {
        if self.state.mode != StatementKind::Select {
            return Err(QbError::invalid_argument(format!(
                "{} needs a SELECT, builder is in {} mode",
                func.as_str(),
                self.state.mode
            )));
        }
        let field = field.trim();
        let field = if field.is_empty() { "*" } else { field };
        let resolver = self.resolver();

        if self.needs_derived_table() {
            let inner = self.build()?;
            // Outside the derived table only the bare column name is visible.
            let target = match field {
                "*" => "*".to_string(),
                f => resolver.column(f.rsplit('.').next().unwrap_or(f)),
            };
            let sql = format!(
                "SELECT {}({target}) AS {AGGREGATE_COLUMN} FROM ({}) AS {DERIVED_TABLE}",
                func.as_str(),
                inner.sql
            );
            let mut compiled = CompiledQuery::new(sql, StatementKind::Select);
            compiled.preamble = inner.preamble;
            return Ok(compiled);
        }

        let mut single = self.clone();
        single.state.fields = vec![SelectField::Raw(format!(
            "{}({}) AS {AGGREGATE_COLUMN}",
            func.as_str(),
            resolver.field(field)
        ))];
        single.state.orders.clear();
        single.build()
    }

    /// Compile the aggregate, then reset like any terminal call.
    fn compile_aggregate(&mut self, func: Aggregate, field: &str) -> QbResult<CompiledQuery> {
        let compiled = self.aggregate_query(func, field)?;
        if !self.preserve {
            self.reset();
        }
        Ok(compiled)
    }

    fn run_aggregate(&mut self, func: Aggregate, field: &str) -> QbResult<f64> {
        let compiled = self.compile_aggregate(func, field)?;
        let result = super::exec::run(&self.conn, &compiled)?;
        scalar(&result)
    }

    // ==================== Executing ====================

    /// `COUNT(field)`; pass `"*"` to count rows.
    pub fn count(&mut self, field: &str) -> QbResult<u64> {
        let n = self.run_aggregate(Aggregate::Count, field)?;
        Ok(n.max(0.0) as u64)
    }

    pub fn sum(&mut self, field: &str) -> QbResult<f64> {
        self.run_aggregate(Aggregate::Sum, field)
    }

    pub fn avg(&mut self, field: &str) -> QbResult<f64> {
        self.run_aggregate(Aggregate::Avg, field)
    }

    pub fn min(&mut self, field: &str) -> QbResult<f64> {
        self.run_aggregate(Aggregate::Min, field)
    }

    pub fn max(&mut self, field: &str) -> QbResult<f64> {
        self.run_aggregate(Aggregate::Max, field)
    }

    /// Count the rows the current SELECT would return.
    ///
    /// With `reset == false` the builder keeps its state, so the same query can
    /// be fetched afterwards (the usual pagination pattern).
    pub fn count_all_results(&mut self, reset: bool) -> QbResult<u64> {
        let mut side = self.clone();
        side.preserve = true;
        let n = side.count("*")?;
        if reset {
            self.reset();
        }
        Ok(n)
    }

    // ==================== Compile only ====================

    /// SQL of [`count`](Self::count) without executing it.
    pub fn count_sql(&mut self, field: &str) -> QbResult<String> {
        self.compile_aggregate(Aggregate::Count, field).map(|c| c.sql)
    }

    pub fn sum_sql(&mut self, field: &str) -> QbResult<String> {
        self.compile_aggregate(Aggregate::Sum, field).map(|c| c.sql)
    }

    pub fn avg_sql(&mut self, field: &str) -> QbResult<String> {
        self.compile_aggregate(Aggregate::Avg, field).map(|c| c.sql)
    }

    pub fn min_sql(&mut self, field: &str) -> QbResult<String> {
        self.compile_aggregate(Aggregate::Min, field).map(|c| c.sql)
    }

    pub fn max_sql(&mut self, field: &str) -> QbResult<String> {
        self.compile_aggregate(Aggregate::Max, field).map(|c| c.sql)
    }
}

/// Numeric value of the `aggregate` column (or the first column). NULL counts as zero.
fn scalar(result: &QueryResult) -> QbResult<f64> {
    let Some(row) = result.first() else {
        return Ok(0.0);
    };
    match row.get(AGGREGATE_COLUMN).or_else(|| row.get_index(0)) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| QbError::decode(AGGREGATE_COLUMN, e.to_string())),
        Some(other) => other.as_f64().ok_or_else(|| {
            QbError::decode(AGGREGATE_COLUMN, format!("non-numeric aggregate {other:?}"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;

    #[test]
    fn test_scalar_conversion() {
        let r = QueryResult::new(vec![Row::from_pairs([("aggregate", Value::Int(7))])]);
        assert_eq!(scalar(&r).unwrap(), 7.0);

        let r = QueryResult::new(vec![Row::from_pairs([("aggregate", Value::Null)])]);
        assert_eq!(scalar(&r).unwrap(), 0.0);

        let r = QueryResult::new(vec![Row::from_pairs([("total", "12.5")])]);
        assert_eq!(scalar(&r).unwrap(), 12.5);

        let r = QueryResult::new(vec![Row::from_pairs([("aggregate", "n/a")])]);
        assert!(matches!(scalar(&r), Err(QbError::Decode { .. })));
    }
}
