//! Connection configuration.
//!
//! ```toml
//! dialect = "postgres"
//! prefix = "app_"
//! protect_identifiers = true
//! ```

use crate::dialect::DialectKind;
use crate::error::QbResult;
use serde::Deserialize;
use std::path::Path;

/// Settings shared by every builder created from a connection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Target engine.
    pub dialect: DialectKind,
    /// Prefix applied to unaliased table names.
    pub prefix: String,
    /// Escape identifiers unless a call overrides it.
    pub protect_identifiers: bool,
    /// PostgreSQL only: compile REPLACE to `INSERT .. ON CONFLICT DO UPDATE`
    /// instead of the probe-and-branch emulation.
    pub native_upsert_replace: bool,
}

impl ConnectionConfig {
    /// Create a configuration for `dialect` with defaults (no prefix, no escaping).
    pub fn new(dialect: DialectKind) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> QbResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> QbResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Set the table prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the default identifier escaping.
    pub fn with_protect_identifiers(mut self, protect: bool) -> Self {
        self.protect_identifiers = protect;
        self
    }

    /// Use the native upsert for REPLACE where the dialect emulates it.
    pub fn with_native_upsert_replace(mut self, enabled: bool) -> Self {
        self.native_upsert_replace = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ConnectionConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.dialect, DialectKind::MySql);
        assert!(cfg.prefix.is_empty());
        assert!(!cfg.protect_identifiers);
    }

    #[test]
    fn test_parse_full() {
        let cfg = ConnectionConfig::from_toml_str(
            r#"
            dialect = "sqlite"
            prefix = "app_"
            protect_identifiers = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.dialect, DialectKind::Sqlite);
        assert_eq!(cfg.prefix, "app_");
        assert!(cfg.protect_identifiers);
    }

    #[test]
    fn test_parse_error() {
        let err = ConnectionConfig::from_toml_str("dialect = \"oracle\"").unwrap_err();
        assert!(matches!(err, crate::QbError::Config(_)));
    }
}
