//! Per-engine behavior for MySQL, PostgreSQL and SQLite.
//!
//! A [`Dialect`] is selected once when a [`Connection`](crate::Connection) is
//! built and every builder on that connection consults it through capability
//! queries instead of overriding compiler methods.
//!
//! | Capability | MySQL | PostgreSQL | SQLite |
//! |---|---|---|---|
//! | identifier escape | `` ` `` | `"` | `"` |
//! | IGNORE | INSERT/UPDATE/DELETE `IGNORE` | INSERT `ON CONFLICT DO NOTHING` | INSERT `OR IGNORE` |
//! | LIMIT on UPDATE/DELETE | yes | no | no |
//! | TRUNCATE | `TRUNCATE t` | `TRUNCATE t RESTART IDENTITY` | `DELETE FROM t` |
//! | REPLACE | native | emulated | native |
//! | case-insensitive LIKE | `LOWER(col) LIKE` | `ILIKE` | `LOWER(col) LIKE` |
//! | random order | `RAND()` | `RANDOM()` (+ `setseed`) | `RANDOM()` |
//! | NATURAL JOIN | yes | no | no |

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySql;
pub use postgres::Postgres;
pub use sqlite::Sqlite;

use crate::compiled::StatementKind;
use crate::error::QbResult;
use crate::value::Value;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    #[serde(alias = "mariadb")]
    MySql,
    #[serde(alias = "postgresql", alias = "pgsql", alias = "pg")]
    Postgres,
    #[serde(alias = "sqlite3")]
    Sqlite,
}

impl DialectKind {
    pub fn name(&self) -> &'static str {
        match self {
            DialectKind::MySql => "MySQL",
            DialectKind::Postgres => "PostgreSQL",
            DialectKind::Sqlite => "SQLite",
        }
    }

    /// Instantiate the strategy object for this engine.
    pub fn policy(&self) -> Arc<dyn Dialect> {
        match self {
            DialectKind::MySql => Arc::new(MySql),
            DialectKind::Postgres => Arc::new(Postgres),
            DialectKind::Sqlite => Arc::new(Sqlite),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a dialect spells "skip rows that would violate a constraint".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreForm {
    /// `INSERT IGNORE INTO`, `UPDATE IGNORE`, `DELETE IGNORE FROM`
    Keyword,
    /// `INSERT OR IGNORE INTO`
    OrIgnore,
    /// `INSERT INTO ... ON CONFLICT DO NOTHING`
    OnConflictDoNothing,
}

/// How a dialect executes REPLACE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceForm {
    /// `REPLACE INTO table (cols) VALUES (vals)`
    Native,
    /// Probe on the first column, then INSERT or UPDATE.
    Emulated,
}

/// Part of a date/time column addressed by `where_date_part`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePart {
    Date,
    Time,
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl DatePart {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePart::Date => "date",
            DatePart::Time => "time",
            DatePart::Year => "year",
            DatePart::Month => "month",
            DatePart::Day => "day",
            DatePart::Hour => "hour",
            DatePart::Minute => "minute",
            DatePart::Second => "second",
        }
    }
}

/// The ORDER BY keyword for random ordering plus any session statement it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomOrder {
    pub keyword: String,
    pub preamble: Option<String>,
}

/// Engine-specific SQL behavior.
///
/// Default methods carry the behavior shared by most engines; each dialect
/// overrides only what differs.
pub trait Dialect: Send + Sync + fmt::Debug {
    fn kind(&self) -> DialectKind;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Identifier escape character.
    fn escape_char(&self) -> char {
        '"'
    }

    /// Escape a single identifier segment, doubling embedded escape characters.
    fn escape_identifier(&self, ident: &str) -> String {
        let q = self.escape_char();
        let mut out = String::with_capacity(ident.len() + 2);
        out.push(q);
        for ch in ident.chars() {
            if ch == q {
                out.push(q);
            }
            out.push(ch);
        }
        out.push(q);
        out
    }

    /// IGNORE-equivalent for `kind`, or `None` when unsupported.
    fn ignore_form(&self, kind: StatementKind) -> Option<IgnoreForm>;

    fn supports_ignore(&self, kind: StatementKind) -> bool {
        self.ignore_form(kind).is_some()
    }

    /// Whether LIMIT may be attached to `kind`.
    fn can_limit(&self, kind: StatementKind) -> bool {
        matches!(kind, StatementKind::Select)
    }

    /// `LIMIT`/`OFFSET` tail; empty when neither is set.
    fn limit_sql(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        limit_clause(limit, offset)
    }

    /// Statement that empties `table` (already escaped).
    fn truncate_sql(&self, table: &str) -> String {
        format!("TRUNCATE {table}")
    }

    fn replace_form(&self) -> ReplaceForm {
        ReplaceForm::Native
    }

    /// Native upsert used instead of REPLACE emulation, when the dialect has one.
    ///
    /// `columns` and `values` are already escaped/quoted; the first column is the conflict key.
    fn upsert_sql(&self, _table: &str, _columns: &[String], _values: &[String]) -> Option<String> {
        None
    }

    /// Render a LIKE predicate. `pattern` is the unquoted pattern text including wildcards.
    fn like_sql(&self, column: &str, pattern: &str, negated: bool, insensitive: bool) -> String {
        let op = if negated { "NOT LIKE" } else { "LIKE" };
        if insensitive {
            format!(
                "LOWER({column}) {op} {}",
                self.quote_string(&pattern.to_lowercase())
            )
        } else {
            format!("{column} {op} {}", self.quote_string(pattern))
        }
    }

    /// Keyword for `ORDER BY <random>`.
    fn random_order(&self, seed: Option<i64>) -> QbResult<RandomOrder>;

    /// Expression extracting `part` from `column` (already escaped).
    fn date_part_expr(&self, part: DatePart, column: &str) -> String;

    /// Adjust a comparison literal for the type returned by [`Dialect::date_part_expr`].
    fn date_part_value(&self, _part: DatePart, value: Value) -> Value {
        value
    }

    fn supports_natural_join(&self) -> bool {
        false
    }

    /// Quote a string literal.
    fn quote_string(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('\'');
        for ch in s.chars() {
            if ch == '\'' {
                out.push('\'');
            }
            out.push(ch);
        }
        out.push('\'');
        out
    }

    fn bool_literal(&self, b: bool) -> &'static str {
        if b { "1" } else { "0" }
    }

    /// Quote any value as an SQL literal.
    fn quote_value(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => self.bool_literal(*b).to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) if f.is_finite() => f.to_string(),
            Value::Float(f) => self.quote_string(&f.to_string()),
            Value::Text(s) => self.quote_string(s),
            Value::Raw(raw) => raw.as_str().to_string(),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| self.quote_value(v)).collect();
                format!("({})", parts.join(", "))
            }
        }
    }
}

pub(crate) fn limit_clause(limit: Option<u64>, offset: Option<u64>) -> String {
    match (limit, offset) {
        (Some(l), Some(o)) => format!("LIMIT {l} OFFSET {o}"),
        (Some(l), None) => format!("LIMIT {l}"),
        (None, Some(o)) => format!("OFFSET {o}"),
        (None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::RawSql;

    #[test]
    fn test_kind_deserializes_from_aliases() {
        #[derive(Deserialize)]
        struct W {
            d: DialectKind,
        }
        let w: W = toml::from_str("d = \"postgresql\"").unwrap();
        assert_eq!(w.d, DialectKind::Postgres);
        let w: W = toml::from_str("d = \"sqlite\"").unwrap();
        assert_eq!(w.d, DialectKind::Sqlite);
    }

    #[test]
    fn test_quote_value_shared_rules() {
        let d = Sqlite;
        assert_eq!(d.quote_value(&Value::Int(5)), "5");
        assert_eq!(d.quote_value(&Value::Text("O'Brien".into())), "'O''Brien'");
        assert_eq!(d.quote_value(&Value::Null), "NULL");
        assert_eq!(d.quote_value(&Value::Raw(RawSql::new("NOW()"))), "NOW()");
        assert_eq!(
            d.quote_value(&Value::List(vec![Value::Int(1), Value::Text("b".into())])),
            "(1, 'b')"
        );
    }

    #[test]
    fn test_capability_matrix() {
        let my = DialectKind::MySql.policy();
        let pg = DialectKind::Postgres.policy();
        let lite = DialectKind::Sqlite.policy();

        assert!(my.can_limit(StatementKind::Delete));
        assert!(!pg.can_limit(StatementKind::Delete));
        assert!(!lite.can_limit(StatementKind::Update));

        assert!(my.supports_ignore(StatementKind::Update));
        assert!(!pg.supports_ignore(StatementKind::Update));
        assert!(lite.supports_ignore(StatementKind::Insert));
        assert!(!lite.supports_ignore(StatementKind::Delete));

        assert!(my.supports_natural_join());
        assert!(!pg.supports_natural_join());
        assert!(!lite.supports_natural_join());
    }
}
