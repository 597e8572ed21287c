//! Nested builders spliced into FROM, SELECT and WHERE slots.
//!
//! Every subquery is an independent [`QueryBuilder`] on the same connection.
//! It is compiled on its own (consuming it) and only its SQL text is kept by
//! the parent, so the two never share mutable state.

use super::{QueryBuilder, SelectField, TableSource};
use crate::compiled::StatementKind;
use crate::condition::{Connector, Operator, Predicate, parse_field};
use crate::error::{QbError, QbResult};

impl QueryBuilder {
    fn subquery_sql(
        &self,
        configure: impl FnOnce(&mut QueryBuilder) -> QbResult<()>,
    ) -> QbResult<String> {
        let mut child = self.fresh();
        child.escape = self.escape;
        configure(&mut child)?;
        child_sql(child)
    }

    fn push_from_subquery(&mut self, sql: String, alias: &str) -> QbResult<&mut Self> {
        let alias = alias.trim();
        if alias.is_empty() {
            return Err(QbError::invalid_argument("FROM subquery needs an alias"));
        }
        self.conn.register_alias(alias, alias);
        let alias_sql = self.resolver().alias(alias);
        self.state.tables.push(TableSource {
            sql: format!("({sql}) AS {alias_sql}"),
            name_sql: alias_sql,
        });
        self.select_context();
        Ok(self)
    }

    /// `FROM (subquery) AS alias`, with the subquery configured by `configure`.
    ///
    /// ```ignore
    /// qb.from_subquery(|q| {
    ///     q.from("orders").select("user_id, SUM(total) AS spent").group_by("user_id");
    ///     Ok(())
    /// }, "totals")?;
    /// ```
    pub fn from_subquery(
        &mut self,
        configure: impl FnOnce(&mut QueryBuilder) -> QbResult<()>,
        alias: &str,
    ) -> QbResult<&mut Self> {
        let sql = self.subquery_sql(configure)?;
        self.push_from_subquery(sql, alias)
    }

    /// `FROM (builder) AS alias`.
    pub fn from_builder(&mut self, builder: QueryBuilder, alias: &str) -> QbResult<&mut Self> {
        let sql = child_sql(builder)?;
        self.push_from_subquery(sql, alias)
    }

    /// `(subquery) AS alias` in the select list.
    pub fn select_subquery(
        &mut self,
        configure: impl FnOnce(&mut QueryBuilder) -> QbResult<()>,
        alias: &str,
    ) -> QbResult<&mut Self> {
        let sql = self.subquery_sql(configure)?;
        let alias = self.resolver().alias(alias);
        self.state
            .fields
            .push(SelectField::Raw(format!("({sql}) AS {alias}")));
        self.select_context();
        Ok(self)
    }

    // ==================== EXISTS ====================

    fn push_exists(&mut self, connector: Connector, sql: String, negated: bool) -> &mut Self {
        let escape = self.escape;
        self.state
            .wheres
            .push(connector, Predicate::Exists { sql, negated }, escape);
        self
    }

    pub fn where_exists(
        &mut self,
        configure: impl FnOnce(&mut QueryBuilder) -> QbResult<()>,
    ) -> QbResult<&mut Self> {
        let sql = self.subquery_sql(configure)?;
        Ok(self.push_exists(Connector::And, sql, false))
    }

    pub fn or_where_exists(
        &mut self,
        configure: impl FnOnce(&mut QueryBuilder) -> QbResult<()>,
    ) -> QbResult<&mut Self> {
        let sql = self.subquery_sql(configure)?;
        Ok(self.push_exists(Connector::Or, sql, false))
    }

    pub fn where_not_exists(
        &mut self,
        configure: impl FnOnce(&mut QueryBuilder) -> QbResult<()>,
    ) -> QbResult<&mut Self> {
        let sql = self.subquery_sql(configure)?;
        Ok(self.push_exists(Connector::And, sql, true))
    }

    pub fn or_where_not_exists(
        &mut self,
        configure: impl FnOnce(&mut QueryBuilder) -> QbResult<()>,
    ) -> QbResult<&mut Self> {
        let sql = self.subquery_sql(configure)?;
        Ok(self.push_exists(Connector::Or, sql, true))
    }

    /// `EXISTS (builder)`.
    pub fn where_exists_builder(&mut self, builder: QueryBuilder) -> QbResult<&mut Self> {
        let sql = child_sql(builder)?;
        Ok(self.push_exists(Connector::And, sql, false))
    }

    // ==================== Comparison (subquery) ====================

    /// `field op (subquery)`; the operator comes from the field and defaults to `=`.
    /// `connector` overrides the field's OR marker.
    fn push_compare_subquery(
        &mut self,
        field: &str,
        sql: String,
        connector: Option<Connector>,
        having: bool,
    ) -> QbResult<&mut Self> {
        let parsed = parse_field(field)?;
        let column = parsed.column;
        let predicate = match parsed.operator.unwrap_or(Operator::Eq) {
            op @ (Operator::Eq
            | Operator::Ne
            | Operator::NotEq
            | Operator::Lt
            | Operator::Gt
            | Operator::Lte
            | Operator::Gte) => Predicate::CompareSubquery { column, op, sql },
            Operator::In => Predicate::InSubquery {
                column,
                sql,
                negated: false,
            },
            Operator::NotIn => Predicate::InSubquery {
                column,
                sql,
                negated: true,
            },
            other => {
                return Err(QbError::invalid_argument(format!(
                    "operator {} cannot compare against a subquery",
                    other.as_sql()
                )));
            }
        };

        let connector = connector.unwrap_or(parsed.connector);
        let escape = self.escape;
        if having {
            self.state.havings.push(connector, predicate, escape);
            self.select_context();
        } else {
            self.state.wheres.push(connector, predicate, escape);
        }
        Ok(self)
    }

    /// `field op (subquery)` with the subquery configured by `configure`.
    ///
    /// ```ignore
    /// qb.where_query("salary >", |q| {
    ///     q.from("employees").select_raw("AVG(salary)");
    ///     Ok(())
    /// })?;
    /// ```
    pub fn where_query(
        &mut self,
        field: &str,
        configure: impl FnOnce(&mut QueryBuilder) -> QbResult<()>,
    ) -> QbResult<&mut Self> {
        let sql = self.subquery_sql(configure)?;
        self.push_compare_subquery(field, sql, None, false)
    }

    pub fn or_where_query(
        &mut self,
        field: &str,
        configure: impl FnOnce(&mut QueryBuilder) -> QbResult<()>,
    ) -> QbResult<&mut Self> {
        let sql = self.subquery_sql(configure)?;
        self.push_compare_subquery(field, sql, Some(Connector::Or), false)
    }

    /// `field op (builder)`.
    pub fn where_query_builder(&mut self, field: &str, builder: QueryBuilder) -> QbResult<&mut Self> {
        let sql = child_sql(builder)?;
        self.push_compare_subquery(field, sql, None, false)
    }

    /// HAVING `field op (subquery)`.
    pub fn having_query(
        &mut self,
        field: &str,
        configure: impl FnOnce(&mut QueryBuilder) -> QbResult<()>,
    ) -> QbResult<&mut Self> {
        let sql = self.subquery_sql(configure)?;
        self.push_compare_subquery(field, sql, None, true)
    }

    pub fn or_having_query(
        &mut self,
        field: &str,
        configure: impl FnOnce(&mut QueryBuilder) -> QbResult<()>,
    ) -> QbResult<&mut Self> {
        let sql = self.subquery_sql(configure)?;
        self.push_compare_subquery(field, sql, Some(Connector::Or), true)
    }

    pub fn having_query_builder(&mut self, field: &str, builder: QueryBuilder) -> QbResult<&mut Self> {
        let sql = child_sql(builder)?;
        self.push_compare_subquery(field, sql, None, true)
    }

    // ==================== IN (subquery) ====================

    fn push_in_subquery(&mut self, field: &str, sql: String, negated: bool) -> QbResult<&mut Self> {
        let parsed = parse_field(field)?;
        let escape = self.escape;
        self.state.wheres.push(
            parsed.connector,
            Predicate::InSubquery {
                column: parsed.column,
                sql,
                negated,
            },
            escape,
        );
        Ok(self)
    }

    /// `field IN (subquery)`.
    pub fn where_in_query(
        &mut self,
        field: &str,
        configure: impl FnOnce(&mut QueryBuilder) -> QbResult<()>,
    ) -> QbResult<&mut Self> {
        let sql = self.subquery_sql(configure)?;
        self.push_in_subquery(field, sql, false)
    }

    /// `field NOT IN (subquery)`.
    pub fn where_not_in_query(
        &mut self,
        field: &str,
        configure: impl FnOnce(&mut QueryBuilder) -> QbResult<()>,
    ) -> QbResult<&mut Self> {
        let sql = self.subquery_sql(configure)?;
        self.push_in_subquery(field, sql, true)
    }

    /// `field IN (builder)`.
    pub fn where_in_builder(&mut self, field: &str, builder: QueryBuilder) -> QbResult<&mut Self> {
        let sql = child_sql(builder)?;
        self.push_in_subquery(field, sql, false)
    }

    /// `field NOT IN (builder)`.
    pub fn where_not_in_builder(
        &mut self,
        field: &str,
        builder: QueryBuilder,
    ) -> QbResult<&mut Self> {
        let sql = child_sql(builder)?;
        self.push_in_subquery(field, sql, true)
    }
}

fn child_sql(child: QueryBuilder) -> QbResult<String> {
    if child.mode() != StatementKind::Select {
        return Err(QbError::invalid_argument(format!(
            "subquery must be a SELECT, got {}",
            child.mode()
        )));
    }
    child.into_sql()
}
