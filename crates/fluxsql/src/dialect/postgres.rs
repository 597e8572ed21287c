use super::{DatePart, Dialect, DialectKind, IgnoreForm, RandomOrder, ReplaceForm};
use crate::compiled::StatementKind;
use crate::error::QbResult;

/// PostgreSQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

/// `setseed` accepts values in [-1, 1]; integer seeds are folded into that range.
const SEED_SCALE: i64 = 1_000_000;

impl Dialect for Postgres {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn ignore_form(&self, kind: StatementKind) -> Option<IgnoreForm> {
        match kind {
            StatementKind::Insert => Some(IgnoreForm::OnConflictDoNothing),
            _ => None,
        }
    }

    fn truncate_sql(&self, table: &str) -> String {
        format!("TRUNCATE {table} RESTART IDENTITY")
    }

    fn replace_form(&self) -> ReplaceForm {
        ReplaceForm::Emulated
    }

    fn upsert_sql(&self, table: &str, columns: &[String], values: &[String]) -> Option<String> {
        let key = columns.first()?;
        let mut sql = format!(
            "INSERT INTO {table} ({}) VALUES ({}) ON CONFLICT ({key})",
            columns.join(","),
            values.join(",")
        );
        let updates: Vec<String> = columns
            .iter()
            .skip(1)
            .map(|c| format!("{c} = EXCLUDED.{c}"))
            .collect();
        if updates.is_empty() {
            sql.push_str(" DO NOTHING");
        } else {
            sql.push_str(" DO UPDATE SET ");
            sql.push_str(&updates.join(", "));
        }
        Some(sql)
    }

    fn like_sql(&self, column: &str, pattern: &str, negated: bool, insensitive: bool) -> String {
        let op = match (negated, insensitive) {
            (false, false) => "LIKE",
            (true, false) => "NOT LIKE",
            (false, true) => "ILIKE",
            (true, true) => "NOT ILIKE",
        };
        format!("{column} {op} {}", self.quote_string(pattern))
    }

    fn random_order(&self, seed: Option<i64>) -> QbResult<RandomOrder> {
        let preamble = seed.map(|seed| {
            let folded = (seed % SEED_SCALE) as f64 / SEED_SCALE as f64;
            format!("SELECT setseed({folded})")
        });
        Ok(RandomOrder {
            keyword: "RANDOM()".to_string(),
            preamble,
        })
    }

    fn date_part_expr(&self, part: DatePart, column: &str) -> String {
        match part {
            DatePart::Date => format!("{column}::date"),
            DatePart::Time => format!("{column}::time"),
            other => format!("extract({} FROM {column})", other.as_str()),
        }
    }

    fn bool_literal(&self, b: bool) -> &'static str {
        if b { "TRUE" } else { "FALSE" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ilike() {
        assert_eq!(Postgres.like_sql("name", "%dev%", false, true), "name ILIKE '%dev%'");
        assert_eq!(Postgres.like_sql("name", "%dev%", true, true), "name NOT ILIKE '%dev%'");
    }

    #[test]
    fn test_seeded_random_emits_setseed() {
        let order = Postgres.random_order(Some(500_000)).unwrap();
        assert_eq!(order.keyword, "RANDOM()");
        assert_eq!(order.preamble.as_deref(), Some("SELECT setseed(0.5)"));
    }

    #[test]
    fn test_date_parts() {
        assert_eq!(Postgres.date_part_expr(DatePart::Date, "c"), "c::date");
        assert_eq!(Postgres.date_part_expr(DatePart::Time, "c"), "c::time");
        assert_eq!(Postgres.date_part_expr(DatePart::Month, "c"), "extract(month FROM c)");
    }

    #[test]
    fn test_upsert_uses_first_column_as_key() {
        let sql = Postgres
            .upsert_sql(
                "t",
                &["id".to_string(), "name".to_string()],
                &["1".to_string(), "'x'".to_string()],
            )
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO t (id,name) VALUES (1,'x') ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name"
        );
    }
}
