//! Field and table reference resolution.
//!
//! [`FieldResolver`] turns raw expressions such as `jobs.id`, `COUNT(id)` or
//! `name AS n` into dialect-escaped SQL text, resolving table qualifiers
//! through the connection's alias registry and table prefix.
//!
//! - Dotted `table.column`: `table` is kept if it is a registered alias,
//!   replaced by the alias registered for its prefixed name, or prefixed.
//! - Allow-listed function wrappers (`COUNT(..)`, `LOWER(..)`, ...): only the
//!   inner column is resolved.
//! - `expr AS alias`: the alias is escaped independently.
//! - Anything else (literals, operators, arbitrary SQL) passes through verbatim.

use crate::connection::Connection;
use regex::Regex;
use std::sync::LazyLock;

/// SQL functions whose single column argument is resolved like a field.
const FUNCTIONS: &[&str] = &[
    "AVG", "COUNT", "MAX", "MIN", "SUM", "LOWER", "UPPER", "LENGTH", "TRIM", "ABS", "ROUND",
    "DATE", "TIME", "YEAR", "MONTH", "DAY", "HOUR", "MINUTE", "SECOND", "COALESCE",
];

static AS_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^(.+?)\s+AS\s+([A-Za-z_][A-Za-z0-9_$]*|`[^`]+`|\x22[^\x22]+\x22)$")
        .expect("valid regex")
});

static FUNCTION_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^([A-Za-z_]+)\s*\((.*)\)$").expect("valid regex")
});

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?:[A-Za-z_][A-Za-z0-9_$]*|`[^`]+`|"[^"]+")(?:\.(?:[A-Za-z_][A-Za-z0-9_$]*|\*|`[^`]+`|"[^"]+"))*$"#,
    )
    .expect("valid regex")
});

/// Whether `s` is a bare or dotted identifier (no operators, literals or calls).
pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

/// A resolved FROM/JOIN table reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Canonical, prefix-applied name (unescaped).
    pub name: String,
    pub alias: Option<String>,
    /// Rendered SQL (`name` or `name AS alias`, escaped as requested).
    pub sql: String,
}

/// Resolves field and table expressions against one connection.
#[derive(Clone, Copy)]
pub struct FieldResolver<'a> {
    conn: &'a Connection,
    escape: bool,
}

impl<'a> FieldResolver<'a> {
    pub fn new(conn: &'a Connection, escape: bool) -> Self {
        Self { conn, escape }
    }

    /// Resolve a field expression.
    pub fn field(&self, expr: &str) -> String {
        let expr = expr.trim();
        if expr.is_empty() || expr == "*" {
            return expr.to_string();
        }

        if let Some(caps) = AS_ALIAS.captures(expr) {
            let inner = self.field(&caps[1]);
            return format!("{inner} AS {}", self.alias(&caps[2]));
        }

        if let Some(caps) = FUNCTION_CALL.captures(expr) {
            let name = &caps[1];
            if FUNCTIONS.iter().any(|f| f.eq_ignore_ascii_case(name)) {
                return format!("{}({})", name.to_uppercase(), self.arguments(&caps[2]));
            }
            return expr.to_string();
        }

        if !is_identifier(expr) {
            return expr.to_string();
        }

        let qualified = self.qualify(expr);
        if self.escape {
            self.conn.escape_identifiers(&qualified)
        } else {
            qualified
        }
    }

    /// Resolve a comma-separated list of field expressions.
    pub fn fields(&self, list: &str) -> Vec<String> {
        split_top_level(list)
            .into_iter()
            .map(|f| self.field(f))
            .filter(|f| !f.is_empty())
            .collect()
    }

    /// Escape a plain column name (no table resolution).
    pub fn column(&self, name: &str) -> String {
        let name = name.trim();
        if self.escape && is_identifier(name) {
            self.conn.escape_identifiers(name)
        } else {
            name.to_string()
        }
    }

    /// Escape an alias.
    pub fn alias(&self, alias: &str) -> String {
        let q = self.conn.escape_char();
        let bare = alias.trim().trim_matches(q).trim_matches('"');
        if self.escape {
            self.conn.dialect().escape_identifier(bare)
        } else {
            bare.to_string()
        }
    }

    /// Resolve a `table [AS] alias` reference and register its alias.
    pub fn table(&self, expr: &str) -> TableRef {
        let expr = expr.trim();
        let (table, alias) = split_table_alias(expr);
        let name = self.conn.make_table_name(table);

        let table_sql = if self.escape {
            self.conn.escape_identifiers(&name)
        } else {
            name.clone()
        };

        match alias {
            Some(alias) => {
                self.conn.register_alias(alias, &name);
                let sql = format!("{table_sql} AS {}", self.alias(alias));
                TableRef {
                    name,
                    alias: Some(alias.to_string()),
                    sql,
                }
            }
            None => TableRef {
                name,
                alias: None,
                sql: table_sql,
            },
        }
    }

    fn arguments(&self, inner: &str) -> String {
        let inner = inner.trim();
        if let Some(rest) = strip_keyword(inner, "DISTINCT") {
            return format!("DISTINCT {}", self.field(rest));
        }
        split_top_level(inner)
            .into_iter()
            .map(|arg| self.field(arg))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn qualify(&self, expr: &str) -> String {
        let Some((table, column)) = expr.rsplit_once('.') else {
            return expr.to_string();
        };
        let q = self.conn.escape_char();
        if table.starts_with(q) || table.starts_with('"') {
            return expr.to_string();
        }
        if self.conn.is_alias(table) {
            return expr.to_string();
        }
        let canonical = self.conn.prefix_table(table);
        let table = self.conn.table_alias(&canonical).unwrap_or(canonical);
        format!("{table}.{column}")
    }
}

/// Split `jobs j` / `jobs AS j` into table and alias.
fn split_table_alias(expr: &str) -> (&str, Option<&str>) {
    let mut parts = expr.split_whitespace();
    let table = parts.next().unwrap_or("");
    match (parts.next(), parts.next()) {
        (Some(kw), Some(alias)) if kw.eq_ignore_ascii_case("AS") => (table, Some(alias)),
        (Some(alias), None) => (table, Some(alias)),
        _ => (table, None),
    }
}

fn strip_keyword<'s>(s: &'s str, keyword: &str) -> Option<&'s str> {
    let head = s.get(..keyword.len())?;
    let rest = &s[keyword.len()..];
    (head.eq_ignore_ascii_case(keyword) && rest.starts_with(char::is_whitespace))
        .then(|| rest.trim_start())
}

/// Split on commas outside parentheses and quotes.
pub(crate) fn split_top_level(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in s.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth -= 1,
            (None, ',') if depth == 0 => {
                out.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(s[start..].trim());
    out.retain(|p| !p.is_empty());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use crate::dialect::DialectKind;

    fn conn(dialect: DialectKind, prefix: &str) -> std::sync::Arc<Connection> {
        Connection::new(ConnectionConfig::new(dialect).with_prefix(prefix))
    }

    #[test]
    fn test_alias_applied_to_table_qualifier() {
        let c = conn(DialectKind::MySql, "");
        let r = FieldResolver::new(&c, false);
        let t = r.table("jobs j");
        assert_eq!(t.sql, "jobs AS j");
        assert_eq!(r.field("jobs.id"), "j.id");
        assert_eq!(r.field("j.id"), "j.id");
        assert_eq!(r.field("name"), "name");
    }

    #[test]
    fn test_prefix_fallback() {
        let c = conn(DialectKind::Postgres, "app_");
        let r = FieldResolver::new(&c, true);
        assert_eq!(r.field("users.id"), "\"app_users\".\"id\"");
        assert_eq!(r.table("users").sql, "\"app_users\"");
    }

    #[test]
    fn test_function_wrapping_escapes_inner_column() {
        let c = conn(DialectKind::MySql, "");
        let r = FieldResolver::new(&c, true);
        assert_eq!(r.field("count(id)"), "COUNT(`id`)");
        assert_eq!(r.field("COUNT(DISTINCT name)"), "COUNT(DISTINCT `name`)");
        assert_eq!(r.field("SUM(price) AS total"), "SUM(`price`) AS `total`");
        assert_eq!(r.field("COUNT(*)"), "COUNT(*)");
    }

    #[test]
    fn test_non_identifiers_pass_through() {
        let c = conn(DialectKind::MySql, "");
        let r = FieldResolver::new(&c, true);
        assert_eq!(r.field("price * 2"), "price * 2");
        assert_eq!(r.field("'literal'"), "'literal'");
        assert_eq!(r.field("custom_fn(a)"), "custom_fn(a)");
    }

    #[test]
    fn test_fields_split_outside_parentheses() {
        let c = conn(DialectKind::Sqlite, "");
        let r = FieldResolver::new(&c, false);
        assert_eq!(
            r.fields("id, COALESCE(a, b), name AS n"),
            vec!["id", "COALESCE(a, b)", "name AS n"]
        );
    }

    #[test]
    fn test_resolution_is_stable() {
        let c = conn(DialectKind::MySql, "p_");
        let r = FieldResolver::new(&c, true);
        r.table("posts AS p");
        assert_eq!(r.field("posts.title"), r.field("posts.title"));
        assert_eq!(r.field("posts.title"), "`p`.`title`");
    }
}
