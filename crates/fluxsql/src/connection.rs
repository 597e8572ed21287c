//! Connection context: dialect, configuration, alias registry and driver.
//!
//! A [`Connection`] is constructed once and shared as `Arc<Connection>` by
//! every builder created from it. Nothing here is global.

use crate::builder::QueryBuilder;
use crate::config::ConnectionConfig;
use crate::dialect::Dialect;
use crate::error::{QbError, QbResult};
use crate::row::QueryResult;
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Blocking database driver that executes compiled SQL.
pub trait Driver: Send + Sync {
    /// Run a statement that returns rows.
    fn query(&self, sql: &str) -> QbResult<QueryResult>;

    /// Run a statement and return the affected row count.
    fn execute(&self, sql: &str) -> QbResult<u64> {
        self.query(sql).map(|r| r.affected_rows())
    }
}

/// Maps short aliases to canonical, prefix-applied table names.
#[derive(Debug, Clone, Default)]
pub struct AliasRegistry {
    by_alias: HashMap<String, String>,
    by_table: HashMap<String, String>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `alias` for `table` (already prefixed).
    pub fn register(&mut self, alias: &str, table: &str) {
        self.by_alias.insert(alias.to_string(), table.to_string());
        if alias != table {
            self.by_table.insert(table.to_string(), alias.to_string());
        }
    }

    /// Canonical table for an alias.
    pub fn table_for(&self, alias: &str) -> Option<&str> {
        self.by_alias.get(alias).map(String::as_str)
    }

    /// Alias registered for a canonical table.
    pub fn alias_for(&self, table: &str) -> Option<&str> {
        self.by_table.get(table).map(String::as_str)
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.by_alias.contains_key(name)
    }

    pub fn clear(&mut self) {
        self.by_alias.clear();
        self.by_table.clear();
    }
}

/// The shared context every builder compiles and executes against.
pub struct Connection {
    config: ConnectionConfig,
    dialect: Arc<dyn Dialect>,
    aliases: RwLock<AliasRegistry>,
    driver: Option<Box<dyn Driver>>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.config)
            .field("dialect", &self.dialect)
            .field("driver", &self.driver.as_ref().map(|_| "<dyn Driver>"))
            .finish()
    }
}

impl Connection {
    /// Create a connection without a driver; builders can compile but not execute.
    pub fn new(config: ConnectionConfig) -> Arc<Self> {
        Arc::new(Self::build(config, None))
    }

    /// Create a connection that executes through `driver`.
    pub fn with_driver(config: ConnectionConfig, driver: impl Driver + 'static) -> Arc<Self> {
        Arc::new(Self::build(config, Some(Box::new(driver))))
    }

    fn build(config: ConnectionConfig, driver: Option<Box<dyn Driver>>) -> Self {
        let dialect = config.dialect.policy();
        Self {
            config,
            dialect,
            aliases: RwLock::new(AliasRegistry::new()),
            driver,
        }
    }

    // ==================== Factories ====================

    /// New empty builder on this connection.
    pub fn builder(self: &Arc<Self>) -> QueryBuilder {
        QueryBuilder::new(Arc::clone(self))
    }

    /// New builder with `table` as its FROM reference.
    pub fn table(self: &Arc<Self>, table: &str) -> QueryBuilder {
        let mut qb = self.builder();
        qb.from(table);
        qb
    }

    // ==================== Accessors ====================

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn escape_char(&self) -> char {
        self.dialect.escape_char()
    }

    pub fn protect_identifiers(&self) -> bool {
        self.config.protect_identifiers
    }

    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }

    // ==================== Quoting ====================

    /// Quote a value as an SQL literal for this dialect.
    pub fn quote(&self, value: &Value) -> String {
        self.dialect.quote_value(value)
    }

    /// Escape a possibly dotted identifier (`schema.table.column`); `*` is left bare.
    pub fn escape_identifiers(&self, name: &str) -> String {
        let q = self.escape_char();
        name.split('.')
            .map(|part| {
                let part = part.trim();
                if part == "*" || (part.starts_with(q) && part.ends_with(q) && part.len() > 1) {
                    part.to_string()
                } else {
                    self.dialect.escape_identifier(part)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    // ==================== Tables & aliases ====================

    /// Apply the configured prefix unless `table` already carries it.
    pub fn prefix_table(&self, table: &str) -> String {
        let prefix = self.prefix();
        if prefix.is_empty() || table.starts_with(prefix) {
            table.to_string()
        } else {
            format!("{prefix}{table}")
        }
    }

    /// Canonical table name: resolves aliases, otherwise prefixes.
    pub fn make_table_name(&self, table: &str) -> String {
        if let Some(canonical) = self.read_aliases().table_for(table) {
            return canonical.to_string();
        }
        self.prefix_table(table)
    }

    /// Record `alias` for `table` on this connection.
    ///
    /// The mapping outlives the builder that declared it: later builders on the
    /// same connection rewrite `table.column` to `alias.column` even when their
    /// own FROM list names the table without the alias.
    pub fn register_alias(&self, alias: &str, table: &str) {
        tracing::trace!(target: "fluxsql.sql", alias, table, "register table alias");
        self.write_aliases().register(alias, table);
    }

    /// Alias registered for a canonical table, if any.
    pub fn table_alias(&self, table: &str) -> Option<String> {
        self.read_aliases().alias_for(table).map(str::to_string)
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.read_aliases().is_alias(name)
    }

    /// Forget every registered alias.
    ///
    /// Call this between unrelated statements that reuse a table under a
    /// different alias, or without one; otherwise qualified fields keep the
    /// alias a previous builder registered.
    pub fn clear_aliases(&self) {
        self.write_aliases().clear();
    }

    fn read_aliases(&self) -> std::sync::RwLockReadGuard<'_, AliasRegistry> {
        self.aliases.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_aliases(&self) -> std::sync::RwLockWriteGuard<'_, AliasRegistry> {
        self.aliases.write().unwrap_or_else(|e| e.into_inner())
    }

    // ==================== Execution ====================

    fn driver(&self) -> QbResult<&dyn Driver> {
        self.driver.as_deref().ok_or(QbError::NoDriver)
    }

    /// Run a row-returning statement.
    pub fn query(&self, sql: &str) -> QbResult<QueryResult> {
        tracing::debug!(target: "fluxsql.sql", dialect = self.dialect.name(), sql, "query");
        self.driver()?.query(sql)
    }

    /// Run a statement and return the affected row count.
    pub fn execute(&self, sql: &str) -> QbResult<u64> {
        tracing::debug!(target: "fluxsql.sql", dialect = self.dialect.name(), sql, "execute");
        self.driver()?.execute(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;

    #[test]
    fn test_escape_identifiers_per_dialect() {
        let my = Connection::new(ConnectionConfig::new(DialectKind::MySql));
        let pg = Connection::new(ConnectionConfig::new(DialectKind::Postgres));
        assert_eq!(my.escape_identifiers("jobs.id"), "`jobs`.`id`");
        assert_eq!(pg.escape_identifiers("jobs.*"), "\"jobs\".*");
        assert_eq!(pg.escape_identifiers("\"jobs\""), "\"jobs\"");
    }

    #[test]
    fn test_prefix_and_alias_registry() {
        let conn = Connection::new(ConnectionConfig::new(DialectKind::MySql).with_prefix("app_"));
        assert_eq!(conn.prefix_table("jobs"), "app_jobs");
        assert_eq!(conn.prefix_table("app_jobs"), "app_jobs");

        conn.register_alias("j", "app_jobs");
        assert_eq!(conn.make_table_name("j"), "app_jobs");
        assert_eq!(conn.table_alias("app_jobs").as_deref(), Some("j"));
        assert!(conn.is_alias("j"));

        conn.clear_aliases();
        assert!(!conn.is_alias("j"));
    }

    #[test]
    fn test_query_without_driver() {
        let conn = Connection::new(ConnectionConfig::default());
        assert!(matches!(conn.query("SELECT 1"), Err(QbError::NoDriver)));
    }
}
