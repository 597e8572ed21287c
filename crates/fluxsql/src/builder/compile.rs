//! Statement compiler: serializes accumulated state per statement kind.

use super::{OrderTerm, QueryBuilder, SelectField};
use crate::compiled::{CompiledQuery, ReplaceFallback, StatementKind};
use crate::dialect::{IgnoreForm, ReplaceForm};
use crate::error::{QbError, QbResult};
use crate::ident::FieldResolver;

/// Joins non-empty fragments with single spaces.
#[derive(Default)]
struct Fragments(Vec<String>);

impl Fragments {
    fn push(&mut self, fragment: impl Into<String>) {
        let fragment = fragment.into();
        if !fragment.is_empty() {
            self.0.push(fragment);
        }
    }

    /// Push `keyword body` when `body` is non-empty.
    fn clause(&mut self, keyword: &str, body: String) {
        if !body.is_empty() {
            self.0.push(format!("{keyword} {body}"));
        }
    }

    fn finish(self) -> String {
        self.0.join(" ")
    }
}

impl QueryBuilder {
    /// Compile the statement, then reset the builder unless [`preserve`](Self::preserve) is set.
    ///
    /// On error nothing is reset, so the caller can fix the input and retry.
    pub fn compile(&mut self) -> QbResult<CompiledQuery> {
        let compiled = self.build()?;
        if !self.preserve {
            self.reset();
        }
        Ok(compiled)
    }

    /// Compiled SQL text; resets like [`compile`](Self::compile).
    pub fn sql(&mut self) -> QbResult<String> {
        self.compile().map(|c| c.sql)
    }

    /// Consume the builder and return its SQL.
    pub fn into_sql(self) -> QbResult<String> {
        self.build().map(|c| c.sql)
    }

    /// Consume the builder and return the full compiled statement.
    pub fn into_compiled(self) -> QbResult<CompiledQuery> {
        self.build()
    }

    /// SQL of the current state without resetting anything.
    pub fn to_sql(&self) -> QbResult<String> {
        self.build().map(|c| c.sql)
    }

    pub(crate) fn build(&self) -> QbResult<CompiledQuery> {
        let compiled = match self.state.mode {
            StatementKind::Select => self.build_select()?,
            StatementKind::Insert => self.build_insert()?,
            StatementKind::Update => self.build_update()?,
            StatementKind::Delete => self.build_delete()?,
            StatementKind::Replace => self.build_replace()?,
            StatementKind::Truncate => self.build_truncate()?,
        };
        tracing::debug!(
            target: "fluxsql.sql",
            dialect = self.conn.dialect().name(),
            kind = %compiled.kind,
            sql = %compiled.sql,
            "compiled statement"
        );
        Ok(compiled)
    }

    fn resolver_for(&self, escape: Option<bool>) -> FieldResolver<'_> {
        FieldResolver::new(&self.conn, self.effective_escape(escape))
    }

    // ==================== Fragments ====================

    fn tables_sql(&self) -> String {
        self.state
            .tables
            .iter()
            .map(|t| t.sql.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Unaliased name of the first table; write statements target a single table.
    fn target_table(&self, kind: StatementKind) -> QbResult<&str> {
        self.state
            .tables
            .first()
            .map(|t| t.name_sql.as_str())
            .ok_or(QbError::UndefinedTable(kind.as_str()))
    }

    fn fields_sql(&self) -> String {
        if self.state.fields.is_empty() {
            return "*".to_string();
        }
        self.state
            .fields
            .iter()
            .map(|f| match f {
                SelectField::Field { expr, escape } => self.resolver_for(*escape).field(expr),
                SelectField::Raw(sql) => sql.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn where_sql(&self) -> String {
        self.state
            .wheres
            .render(&self.conn, self.effective_escape(None))
    }

    fn having_sql(&self) -> String {
        self.state
            .havings
            .render(&self.conn, self.effective_escape(None))
    }

    fn group_sql(&self) -> String {
        self.state
            .groups
            .iter()
            .map(|(expr, escape)| self.resolver_for(*escape).field(expr))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// ORDER BY body plus any session statements random ordering needs.
    fn order_sql(&self) -> QbResult<(String, Vec<String>)> {
        let mut terms = Vec::with_capacity(self.state.orders.len());
        let mut preamble = Vec::new();
        for term in &self.state.orders {
            match term {
                OrderTerm::Field {
                    expr,
                    direction,
                    escape,
                } => terms.push(format!(
                    "{} {}",
                    self.resolver_for(*escape).field(expr),
                    direction.as_str()
                )),
                OrderTerm::Raw(sql) => terms.push(sql.clone()),
                OrderTerm::Random(seed) => {
                    let random = self.conn.dialect().random_order(*seed)?;
                    terms.push(random.keyword);
                    preamble.extend(random.preamble);
                }
            }
        }
        Ok((terms.join(", "), preamble))
    }

    fn limit_sql(&self) -> String {
        self.conn
            .dialect()
            .limit_sql(self.state.limit, self.state.offset)
    }

    /// Escaped column list and quoted value list of the write data.
    fn columns_and_values(&self, kind: StatementKind) -> QbResult<(Vec<String>, Vec<String>)> {
        if self.state.assignments.is_empty() {
            return Err(QbError::MissingData(kind.as_str()));
        }
        Ok(self
            .state
            .assignments
            .iter()
            .map(|a| {
                (
                    self.resolver_for(a.escape).column(&a.column),
                    self.conn.quote(&a.value),
                )
            })
            .unzip())
    }

    fn ignore_form(&self, kind: StatementKind) -> QbResult<Option<IgnoreForm>> {
        if !self.state.ignore {
            return Ok(None);
        }
        match self.conn.dialect().ignore_form(kind) {
            Some(form) => Ok(Some(form)),
            None => Err(self.unsupported(format!("IGNORE on {kind}"))),
        }
    }

    // ==================== Statements ====================

    fn build_select(&self) -> QbResult<CompiledQuery> {
        if self.state.tables.is_empty() && self.state.fields.is_empty() {
            return Err(QbError::UndefinedTable(StatementKind::Select.as_str()));
        }
        let (order, preamble) = self.order_sql()?;

        let mut sql = Fragments::default();
        sql.push("SELECT");
        if self.state.distinct {
            sql.push("DISTINCT");
        }
        sql.push(self.fields_sql());
        sql.clause("FROM", self.tables_sql());
        for join in &self.state.joins {
            sql.push(join.as_str());
        }
        sql.clause("WHERE", self.where_sql());
        sql.clause("GROUP BY", self.group_sql());
        sql.clause("HAVING", self.having_sql());
        sql.clause("ORDER BY", order);
        sql.push(self.limit_sql());

        let mut compiled = CompiledQuery::new(sql.finish(), StatementKind::Select);
        compiled.preamble = preamble;
        Ok(compiled)
    }

    fn insert_sql(
        table: &str,
        columns: &[String],
        values: &[String],
        ignore: Option<IgnoreForm>,
    ) -> String {
        let head = match ignore {
            Some(IgnoreForm::Keyword) => "INSERT IGNORE INTO",
            Some(IgnoreForm::OrIgnore) => "INSERT OR IGNORE INTO",
            Some(IgnoreForm::OnConflictDoNothing) | None => "INSERT INTO",
        };
        let mut sql = format!(
            "{head} {table} ({}) VALUES ({})",
            columns.join(","),
            values.join(",")
        );
        if ignore == Some(IgnoreForm::OnConflictDoNothing) {
            sql.push_str(" ON CONFLICT DO NOTHING");
        }
        sql
    }

    fn build_insert(&self) -> QbResult<CompiledQuery> {
        let kind = StatementKind::Insert;
        let table = self.target_table(kind)?;
        let (columns, values) = self.columns_and_values(kind)?;
        let ignore = self.ignore_form(kind)?;
        Ok(CompiledQuery::new(
            Self::insert_sql(table, &columns, &values, ignore),
            kind,
        ))
    }

    fn set_list(columns: &[String], values: &[String]) -> String {
        columns
            .iter()
            .zip(values)
            .map(|(c, v)| format!("{c}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// UPDATE and DELETE render only WHERE / ORDER BY / LIMIT; any other select fragment is an error.
    fn check_filtered_write(&self, kind: StatementKind) -> QbResult<()> {
        let state = &self.state;
        let stray = [
            (!state.joins.is_empty(), "JOIN"),
            (!state.groups.is_empty(), "GROUP BY"),
            (!state.havings.is_empty(), "HAVING"),
            (state.distinct, "DISTINCT"),
            (!state.fields.is_empty(), "select fields"),
        ];
        match stray.iter().find(|(present, _)| *present) {
            Some((_, fragment)) => Err(QbError::invalid_argument(format!(
                "{fragment} cannot be compiled into {kind}"
            ))),
            None => Ok(()),
        }
    }

    /// WHERE / ORDER BY / LIMIT tail shared by UPDATE and DELETE.
    fn filtered_tail(&self, sql: &mut Fragments) -> QbResult<Vec<String>> {
        let (order, preamble) = self.order_sql()?;
        sql.clause("WHERE", self.where_sql());
        sql.clause("ORDER BY", order);
        sql.push(self.limit_sql());
        Ok(preamble)
    }

    fn build_update(&self) -> QbResult<CompiledQuery> {
        let kind = StatementKind::Update;
        if self.state.tables.is_empty() {
            return Err(QbError::UndefinedTable(kind.as_str()));
        }
        self.check_filtered_write(kind)?;
        let (columns, values) = self.columns_and_values(kind)?;
        let ignore = self.ignore_form(kind)?;

        let mut sql = Fragments::default();
        sql.push("UPDATE");
        if ignore == Some(IgnoreForm::Keyword) {
            sql.push("IGNORE");
        }
        sql.push(self.tables_sql());
        sql.clause("SET", Self::set_list(&columns, &values));
        let preamble = self.filtered_tail(&mut sql)?;

        let mut compiled = CompiledQuery::new(sql.finish(), kind);
        compiled.preamble = preamble;
        Ok(compiled)
    }

    fn build_delete(&self) -> QbResult<CompiledQuery> {
        let kind = StatementKind::Delete;
        if self.state.tables.is_empty() {
            return Err(QbError::UndefinedTable(kind.as_str()));
        }
        self.check_filtered_write(kind)?;
        let ignore = self.ignore_form(kind)?;

        let mut sql = Fragments::default();
        sql.push("DELETE");
        if ignore == Some(IgnoreForm::Keyword) {
            sql.push("IGNORE");
        }
        sql.clause("FROM", self.tables_sql());
        let preamble = self.filtered_tail(&mut sql)?;

        let mut compiled = CompiledQuery::new(sql.finish(), kind);
        compiled.preamble = preamble;
        Ok(compiled)
    }

    fn build_replace(&self) -> QbResult<CompiledQuery> {
        let kind = StatementKind::Replace;
        let table = self.target_table(kind)?;
        let (columns, values) = self.columns_and_values(kind)?;
        let dialect = self.conn.dialect();

        match dialect.replace_form() {
            ReplaceForm::Native => Ok(CompiledQuery::new(
                format!(
                    "REPLACE INTO {table} ({}) VALUES ({})",
                    columns.join(","),
                    values.join(",")
                ),
                kind,
            )),
            // A NULL key never matches the probe nor raises a conflict.
            ReplaceForm::Emulated
                if self
                    .state
                    .assignments
                    .first()
                    .is_some_and(|a| a.value.is_null()) =>
            {
                Err(QbError::invalid_argument(format!(
                    "REPLACE conflict key {} is NULL",
                    columns[0]
                )))
            }
            ReplaceForm::Emulated if self.conn.config().native_upsert_replace => {
                let sql = dialect
                    .upsert_sql(table, &columns, &values)
                    .ok_or_else(|| self.unsupported("REPLACE"))?;
                Ok(CompiledQuery::new(sql, kind))
            }
            ReplaceForm::Emulated => {
                // The first column is the conflict key.
                let key = format!("{} = {}", columns[0], values[0]);
                let probe = format!("SELECT 1 FROM {table} WHERE {key} LIMIT 1");
                let set = if columns.len() > 1 {
                    Self::set_list(&columns[1..], &values[1..])
                } else {
                    Self::set_list(&columns, &values)
                };
                let update = format!("UPDATE {table} SET {set} WHERE {key}");

                let mut compiled =
                    CompiledQuery::new(Self::insert_sql(table, &columns, &values, None), kind);
                compiled.replace_fallback = Some(ReplaceFallback { probe, update });
                Ok(compiled)
            }
        }
    }

    fn build_truncate(&self) -> QbResult<CompiledQuery> {
        let kind = StatementKind::Truncate;
        let table = self.target_table(kind)?;
        Ok(CompiledQuery::new(
            self.conn.dialect().truncate_sql(table),
            kind,
        ))
    }
}
