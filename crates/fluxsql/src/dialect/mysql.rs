use super::{DatePart, Dialect, DialectKind, IgnoreForm, RandomOrder, limit_clause};
use crate::compiled::StatementKind;
use crate::error::QbResult;

/// MySQL / MariaDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    fn escape_char(&self) -> char {
        '`'
    }

    fn ignore_form(&self, kind: StatementKind) -> Option<IgnoreForm> {
        match kind {
            StatementKind::Insert | StatementKind::Update | StatementKind::Delete => {
                Some(IgnoreForm::Keyword)
            }
            _ => None,
        }
    }

    fn can_limit(&self, kind: StatementKind) -> bool {
        matches!(
            kind,
            StatementKind::Select | StatementKind::Update | StatementKind::Delete
        )
    }

    // OFFSET is only valid after LIMIT.
    fn limit_sql(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (None, Some(o)) => format!("LIMIT {} OFFSET {o}", u64::MAX),
            _ => limit_clause(limit, offset),
        }
    }

    fn random_order(&self, seed: Option<i64>) -> QbResult<RandomOrder> {
        let keyword = match seed {
            Some(seed) => format!("RAND({seed})"),
            None => "RAND()".to_string(),
        };
        Ok(RandomOrder {
            keyword,
            preamble: None,
        })
    }

    fn date_part_expr(&self, part: DatePart, column: &str) -> String {
        format!("{}({column})", part.as_str().to_uppercase())
    }

    fn supports_natural_join(&self) -> bool {
        true
    }

    // Backslash is an escape character in MySQL string literals by default.
    fn quote_string(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('\'');
        for ch in s.chars() {
            match ch {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                '\0' => out.push_str("\\0"),
                c => out.push(c),
            }
        }
        out.push('\'');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_requires_limit() {
        assert_eq!(
            MySql.limit_sql(None, Some(10)),
            "LIMIT 18446744073709551615 OFFSET 10"
        );
        assert_eq!(MySql.limit_sql(Some(5), Some(2)), "LIMIT 5 OFFSET 2");
    }

    #[test]
    fn test_escape_identifier_doubles_backticks() {
        assert_eq!(MySql.escape_identifier("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_quote_string_escapes_backslash() {
        assert_eq!(MySql.quote_string(r"a\b'c"), r"'a\\b''c'");
    }

    #[test]
    fn test_date_parts() {
        assert_eq!(MySql.date_part_expr(DatePart::Date, "created_at"), "DATE(created_at)");
        assert_eq!(MySql.date_part_expr(DatePart::Year, "created_at"), "YEAR(created_at)");
    }

    #[test]
    fn test_random_with_seed() {
        assert_eq!(MySql.random_order(Some(7)).unwrap().keyword, "RAND(7)");
        assert_eq!(MySql.random_order(None).unwrap().keyword, "RAND()");
    }
}
