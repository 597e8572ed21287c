use super::{DatePart, Dialect, DialectKind, IgnoreForm, RandomOrder, limit_clause};
use crate::compiled::StatementKind;
use crate::error::QbResult;
use crate::value::Value;

/// SQLite 3.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Sqlite {
    fn strftime_format(part: DatePart) -> &'static str {
        match part {
            DatePart::Date => "%Y-%m-%d",
            DatePart::Time => "%H:%M:%S",
            DatePart::Year => "%Y",
            DatePart::Month => "%m",
            DatePart::Day => "%d",
            DatePart::Hour => "%H",
            DatePart::Minute => "%M",
            DatePart::Second => "%S",
        }
    }
}

impl Dialect for Sqlite {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn ignore_form(&self, kind: StatementKind) -> Option<IgnoreForm> {
        match kind {
            StatementKind::Insert => Some(IgnoreForm::OrIgnore),
            _ => None,
        }
    }

    // No TRUNCATE in SQLite; an unqualified DELETE takes the truncate optimization.
    fn truncate_sql(&self, table: &str) -> String {
        format!("DELETE FROM {table}")
    }

    fn limit_sql(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (None, Some(o)) => format!("LIMIT -1 OFFSET {o}"),
            _ => limit_clause(limit, offset),
        }
    }

    fn random_order(&self, seed: Option<i64>) -> QbResult<RandomOrder> {
        if seed.is_some() {
            tracing::warn!(
                target: "fluxsql.sql",
                "SQLite RANDOM() cannot be seeded; ignoring seed"
            );
        }
        Ok(RandomOrder {
            keyword: "RANDOM()".to_string(),
            preamble: None,
        })
    }

    fn date_part_expr(&self, part: DatePart, column: &str) -> String {
        format!("strftime('{}', {column})", Self::strftime_format(part))
    }

    // strftime() yields zero-padded text, so numeric literals are compared as text.
    fn date_part_value(&self, part: DatePart, value: Value) -> Value {
        let width = match part {
            DatePart::Year => 4,
            DatePart::Month | DatePart::Day | DatePart::Hour | DatePart::Minute | DatePart::Second => 2,
            DatePart::Date | DatePart::Time => return value,
        };
        match value {
            Value::Int(i) => Value::Text(format!("{i:0width$}")),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_without_limit() {
        assert_eq!(Sqlite.limit_sql(None, Some(3)), "LIMIT -1 OFFSET 3");
    }

    #[test]
    fn test_truncate_is_delete() {
        assert_eq!(Sqlite.truncate_sql("jobs"), "DELETE FROM jobs");
    }

    #[test]
    fn test_strftime_parts() {
        assert_eq!(
            Sqlite.date_part_expr(DatePart::Date, "created_at"),
            "strftime('%Y-%m-%d', created_at)"
        );
        assert_eq!(
            Sqlite.date_part_value(DatePart::Month, Value::Int(3)),
            Value::Text("03".into())
        );
        assert_eq!(
            Sqlite.date_part_value(DatePart::Year, Value::Int(2024)),
            Value::Text("2024".into())
        );
    }

    #[test]
    fn test_lower_like() {
        assert_eq!(
            Sqlite.like_sql("name", "%DEV%", false, true),
            "LOWER(name) LIKE '%dev%'"
        );
    }
}
