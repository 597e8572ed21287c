//! Output of the statement compiler.

use std::fmt;

/// The target statement kind (CRUD mode) of a builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatementKind {
    #[default]
    Select,
    Insert,
    Update,
    Delete,
    Replace,
    Truncate,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::Replace => "REPLACE",
            StatementKind::Truncate => "TRUNCATE",
        }
    }

    /// UPDATE and DELETE accept WHERE/ORDER BY/LIMIT without leaving their mode.
    pub fn is_filtered_write(&self) -> bool {
        matches!(self, StatementKind::Update | StatementKind::Delete)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Existence-probe emulation of REPLACE for dialects without a native form.
///
/// The probe and the branch run as separate statements, so concurrent writers
/// can interleave between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceFallback {
    /// `SELECT 1 FROM table WHERE key = value LIMIT 1`
    pub probe: String,
    /// UPDATE run when the probe finds a row; otherwise the main INSERT runs.
    pub update: String,
}

/// A compiled SQL statement ready for the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub sql: String,
    pub kind: StatementKind,
    /// Session statements that must run first (e.g. `SELECT setseed(0.5)`).
    pub preamble: Vec<String>,
    pub replace_fallback: Option<ReplaceFallback>,
}

impl CompiledQuery {
    pub fn new(sql: String, kind: StatementKind) -> Self {
        Self {
            sql,
            kind,
            preamble: Vec::new(),
            replace_fallback: None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.sql
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}
