//! Fluent, mutable query builder.
//!
//! A [`QueryBuilder`] accumulates fragments (tables, fields, conditions, joins,
//! ordering, grouping, limits, write data) and compiles them into a single
//! dialect-correct statement.
//!
//! ## Lifecycle
//!
//! - Created per logical query from a [`Connection`] (`conn.table("jobs")`).
//! - Mutated through chained calls; fallible calls return `QbResult<&mut Self>`
//!   and leave the builder untouched on error.
//! - Compiled once with [`QueryBuilder::sql`] / [`QueryBuilder::execute`], which
//!   reset it to an empty SELECT unless [`QueryBuilder::preserve`] is set.
//!
//! ```ignore
//! let sql = conn
//!     .table("jobs j")
//!     .where_("jobs.id", 3)?
//!     .or_where("name", "dev")?
//!     .sql()?;
//! assert_eq!(sql, "SELECT * FROM jobs AS j WHERE j.id = 3 OR name = 'dev'");
//! ```

mod aggregate;
mod compile;
mod exec;
mod subquery;
mod where_clause;
mod write;

use crate::compiled::StatementKind;
use crate::condition::ConditionList;
use crate::connection::Connection;
use crate::error::{QbError, QbResult};
use crate::ident::FieldResolver;
use crate::value::Value;
use regex::Regex;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl FromStr for Direction {
    type Err = QbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(Direction::Asc),
            "DESC" => Ok(Direction::Desc),
            other => Err(QbError::invalid_argument(format!(
                "unknown sort direction {other:?}"
            ))),
        }
    }
}

/// JOIN flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Full,
    Cross,
    Natural,
}

impl JoinKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
            JoinKind::Cross => "CROSS JOIN",
            JoinKind::Natural => "NATURAL JOIN",
        }
    }
}

/// A FROM entry, resolved when added.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TableSource {
    /// Escaped table name without alias (used by INSERT/REPLACE/TRUNCATE).
    pub name_sql: String,
    /// Full reference, e.g. `jobs AS j` or `(SELECT ...) AS sub`.
    pub sql: String,
}

/// A select-list entry; plain fields are resolved at compile time.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SelectField {
    Field { expr: String, escape: Option<bool> },
    Raw(String),
}

/// An ORDER BY term.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OrderTerm {
    Field {
        expr: String,
        direction: Direction,
        escape: Option<bool>,
    },
    Raw(String),
    Random(Option<i64>),
}

/// A column/value pair for INSERT/UPDATE/REPLACE.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Assignment {
    pub column: String,
    pub value: Value,
    pub escape: Option<bool>,
}

/// All accumulated fragments of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct QueryState {
    pub tables: Vec<TableSource>,
    pub fields: Vec<SelectField>,
    pub joins: Vec<String>,
    pub wheres: ConditionList,
    pub havings: ConditionList,
    pub orders: Vec<OrderTerm>,
    pub groups: Vec<(String, Option<bool>)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub distinct: bool,
    pub ignore: bool,
    pub mode: StatementKind,
    pub assignments: Vec<Assignment>,
}

static ON_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\S+)\s*(<=|>=|<>|!=|=|<|>)\s*(\S+)\s*$").expect("valid regex")
});

static ON_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(AND|OR)\s+").expect("valid regex"));

/// Fluent SQL builder bound to one [`Connection`].
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    conn: Arc<Connection>,
    state: QueryState,
    preserve: bool,
    escape: Option<bool>,
}

impl QueryBuilder {
    /// Create an empty SELECT builder on `conn`.
    pub fn new(conn: Arc<Connection>) -> Self {
        Self {
            conn,
            state: QueryState::default(),
            preserve: false,
            escape: None,
        }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    /// Current statement kind.
    pub fn mode(&self) -> StatementKind {
        self.state.mode
    }

    /// Empty builder on the same connection (no shared state).
    pub fn fresh(&self) -> QueryBuilder {
        QueryBuilder::new(Arc::clone(&self.conn))
    }

    /// Drop every accumulated fragment and return to SELECT mode.
    pub fn reset(&mut self) -> &mut Self {
        self.state = QueryState::default();
        self
    }

    /// Keep fragments after compiling so the same statement can be compiled again.
    pub fn preserve(&mut self, preserve: bool) -> &mut Self {
        self.preserve = preserve;
        self
    }

    /// Override identifier escaping for fragments added after this call.
    ///
    /// `None` restores the connection's `protect_identifiers` default.
    pub fn escape(&mut self, escape: Option<bool>) -> &mut Self {
        self.escape = escape;
        self
    }

    pub(crate) fn effective_escape(&self, escape: Option<bool>) -> bool {
        escape.unwrap_or_else(|| self.conn.protect_identifiers())
    }

    pub(crate) fn resolver(&self) -> FieldResolver<'_> {
        FieldResolver::new(&self.conn, self.effective_escape(self.escape))
    }

    /// Select-only mutators leave write mode unless the statement is an UPDATE/DELETE.
    fn select_context(&mut self) {
        if !self.state.mode.is_filtered_write() {
            self.state.mode = StatementKind::Select;
        }
    }

    fn unsupported(&self, feature: impl Into<String>) -> QbError {
        QbError::unsupported(self.conn.dialect().name(), feature)
    }

    // ==================== FROM ====================

    /// Add a table reference (`"jobs"`, `"jobs j"`, `"jobs AS j"`, or a comma list).
    pub fn from(&mut self, tables: &str) -> &mut Self {
        let resolver = self.resolver();
        let sources: Vec<TableSource> = tables
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| {
                let table = resolver.table(t);
                TableSource {
                    name_sql: resolver.column(&table.name),
                    sql: table.sql,
                }
            })
            .collect();
        self.state.tables.extend(sources);
        self
    }

    /// Replace all table references with `tables`.
    pub fn table(&mut self, tables: &str) -> &mut Self {
        self.state.tables.clear();
        self.from(tables)
    }

    // ==================== SELECT ====================

    /// Add comma-separated select fields.
    pub fn select(&mut self, fields: &str) -> &mut Self {
        let escape = self.escape;
        let fields = crate::ident::split_top_level(fields)
            .into_iter()
            .map(|f| SelectField::Field {
                expr: f.to_string(),
                escape,
            });
        self.state.fields.extend(fields);
        self.select_context();
        self
    }

    /// `select(fields)` followed by `limit(limit, offset)`.
    pub fn select_limit(
        &mut self,
        fields: &str,
        limit: u64,
        offset: Option<u64>,
    ) -> QbResult<&mut Self> {
        self.check_limit(self.state.mode)?;
        if offset.is_some() {
            self.check_offset(self.state.mode)?;
        }
        self.select(fields);
        self.state.limit = Some(limit);
        if offset.is_some() {
            self.state.offset = offset;
        }
        Ok(self)
    }

    /// Add a select expression that is never escaped.
    pub fn select_raw(&mut self, sql: &str) -> &mut Self {
        self.state.fields.push(SelectField::Raw(sql.to_string()));
        self.select_context();
        self
    }

    /// `SELECT DISTINCT`.
    pub fn distinct(&mut self) -> &mut Self {
        self.state.distinct = true;
        self.select_context();
        self
    }

    // ==================== JOIN ====================

    /// Add a JOIN. `on` may be empty for CROSS/NATURAL joins.
    pub fn join(&mut self, table: &str, on: &str, kind: JoinKind) -> QbResult<&mut Self> {
        if kind == JoinKind::Natural && !self.conn.dialect().supports_natural_join() {
            return Err(self.unsupported("NATURAL JOIN"));
        }
        self.push_join(table, on, kind);
        Ok(self)
    }

    pub fn inner_join(&mut self, table: &str, on: &str) -> &mut Self {
        self.push_join(table, on, JoinKind::Inner)
    }

    pub fn left_join(&mut self, table: &str, on: &str) -> &mut Self {
        self.push_join(table, on, JoinKind::Left)
    }

    pub fn right_join(&mut self, table: &str, on: &str) -> &mut Self {
        self.push_join(table, on, JoinKind::Right)
    }

    pub fn cross_join(&mut self, table: &str) -> &mut Self {
        self.push_join(table, "", JoinKind::Cross)
    }

    /// NATURAL JOIN (MySQL only).
    pub fn natural_join(&mut self, table: &str) -> QbResult<&mut Self> {
        self.join(table, "", JoinKind::Natural)
    }

    fn push_join(&mut self, table: &str, on: &str, kind: JoinKind) -> &mut Self {
        let resolver = self.resolver();
        let table = resolver.table(table);
        let mut clause = format!("{} {}", kind.keyword(), table.sql);
        let on = on.trim();
        if !on.is_empty() && !matches!(kind, JoinKind::Cross | JoinKind::Natural) {
            clause.push_str(" ON ");
            clause.push_str(&resolve_on(&resolver, on));
        }
        self.state.joins.push(clause);
        self.select_context();
        self
    }

    // ==================== ORDER / GROUP ====================

    /// `ORDER BY field direction`.
    pub fn order_by(&mut self, field: &str, direction: Direction) -> &mut Self {
        self.state.orders.push(OrderTerm::Field {
            expr: field.to_string(),
            direction,
            escape: self.escape,
        });
        self.select_context();
        self
    }

    /// ORDER BY fragment that is never escaped (`"FIELD(id, 3, 1, 2)"`).
    pub fn order_by_raw(&mut self, sql: &str) -> &mut Self {
        self.state.orders.push(OrderTerm::Raw(sql.to_string()));
        self.select_context();
        self
    }

    pub fn sort_asc(&mut self, field: &str) -> &mut Self {
        self.order_by(field, Direction::Asc)
    }

    pub fn sort_desc(&mut self, field: &str) -> &mut Self {
        self.order_by(field, Direction::Desc)
    }

    /// Random ordering; `seed` makes it repeatable where the dialect allows.
    pub fn order_random(&mut self, seed: Option<i64>) -> &mut Self {
        self.state.orders.push(OrderTerm::Random(seed));
        self.select_context();
        self
    }

    /// Add comma-separated GROUP BY fields.
    pub fn group_by(&mut self, fields: &str) -> &mut Self {
        let escape = self.escape;
        let groups = crate::ident::split_top_level(fields)
            .into_iter()
            .map(|f| (f.to_string(), escape));
        self.state.groups.extend(groups);
        self.select_context();
        self
    }

    // ==================== LIMIT ====================

    fn check_limit(&self, kind: StatementKind) -> QbResult<()> {
        if kind.is_filtered_write() && !self.conn.dialect().can_limit(kind) {
            return Err(self.unsupported(format!("LIMIT on {kind}")));
        }
        Ok(())
    }

    /// UPDATE and DELETE take a row count at most, never an OFFSET.
    fn check_offset(&self, kind: StatementKind) -> QbResult<()> {
        if kind.is_filtered_write() {
            return Err(self.unsupported(format!("OFFSET on {kind}")));
        }
        Ok(())
    }

    /// `LIMIT limit [OFFSET offset]`.
    pub fn limit(&mut self, limit: u64, offset: Option<u64>) -> QbResult<&mut Self> {
        self.check_limit(self.state.mode)?;
        if offset.is_some() {
            self.check_offset(self.state.mode)?;
        }
        self.state.limit = Some(limit);
        if offset.is_some() {
            self.state.offset = offset;
        }
        self.select_context();
        Ok(self)
    }

    /// `OFFSET offset`.
    pub fn offset(&mut self, offset: u64) -> QbResult<&mut Self> {
        self.check_offset(self.state.mode)?;
        self.state.offset = Some(offset);
        self.select_context();
        Ok(self)
    }
}

/// Resolve `a.x = b.y [AND ...]` terms of a JOIN condition; other terms are kept verbatim.
fn resolve_on(resolver: &FieldResolver<'_>, on: &str) -> String {
    let mut out = String::with_capacity(on.len());
    let mut last = 0;
    for m in ON_SPLIT.find_iter(on) {
        out.push_str(&resolve_on_term(resolver, &on[last..m.start()]));
        out.push(' ');
        out.push_str(&m.as_str().trim().to_ascii_uppercase());
        out.push(' ');
        last = m.end();
    }
    out.push_str(&resolve_on_term(resolver, &on[last..]));
    out
}

fn resolve_on_term(resolver: &FieldResolver<'_>, term: &str) -> String {
    match ON_TERM.captures(term) {
        Some(caps) => format!(
            "{} {} {}",
            resolver.field(&caps[1]),
            &caps[2],
            resolver.field(&caps[3])
        ),
        None => term.trim().to_string(),
    }
}
