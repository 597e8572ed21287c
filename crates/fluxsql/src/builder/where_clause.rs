//! WHERE and HAVING condition methods.

use super::QueryBuilder;
use crate::condition::{Connector, LikeSide, Operator, Predicate, parse_field};
use crate::dialect::DatePart;
use crate::error::{QbError, QbResult};
use crate::value::Value;

/// Which clause a condition lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Where,
    Having,
}

/// How the connector for a call is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Join {
    /// From the field's OR marker, AND otherwise.
    Marker,
    Or,
}

impl QueryBuilder {
    fn push_condition(&mut self, clause: Clause, connector: Connector, predicate: Predicate) {
        let escape = self.escape;
        match clause {
            Clause::Where => self.state.wheres.push(connector, predicate, escape),
            Clause::Having => {
                self.state.havings.push(connector, predicate, escape);
                self.select_context();
            }
        }
    }

    fn connector(join: Join, parsed: Connector) -> Connector {
        match join {
            Join::Marker => parsed,
            Join::Or => Connector::Or,
        }
    }

    fn add_compare(
        &mut self,
        clause: Clause,
        join: Join,
        negate: bool,
        field: &str,
        value: Value,
    ) -> QbResult<&mut Self> {
        let parsed = parse_field(field)?;
        let mut predicate = Predicate::compare(parsed.column, parsed.operator, value)?;
        if negate {
            predicate = Predicate::Not(Box::new(predicate));
        }
        self.push_condition(clause, Self::connector(join, parsed.connector), predicate);
        Ok(self)
    }

    fn add_predicate(
        &mut self,
        clause: Clause,
        join: Join,
        field: &str,
        build: impl FnOnce(String) -> QbResult<Predicate>,
    ) -> QbResult<&mut Self> {
        let parsed = parse_field(field)?;
        let predicate = build(parsed.column)?;
        self.push_condition(clause, Self::connector(join, parsed.connector), predicate);
        Ok(self)
    }

    fn in_values<V: Into<Value>>(
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> QbResult<Vec<Value>> {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(QbError::invalid_argument(format!(
                "IN-list for {column} is empty"
            )));
        }
        Ok(values)
    }

    // ==================== WHERE: comparison ====================

    /// `field op value`. The field may carry an operator (`"age >"`) and the OR marker (`"|name"`).
    ///
    /// A list value becomes an IN-list; `Value::Null` becomes `IS NULL`; a composite
    /// expression with a null value (`"a.id = b.a_id"`) is used verbatim.
    pub fn where_(&mut self, field: &str, value: impl Into<Value>) -> QbResult<&mut Self> {
        self.add_compare(Clause::Where, Join::Marker, false, field, value.into())
    }

    pub fn or_where(&mut self, field: &str, value: impl Into<Value>) -> QbResult<&mut Self> {
        self.add_compare(Clause::Where, Join::Or, false, field, value.into())
    }

    /// `NOT field op value`.
    pub fn not_where(&mut self, field: &str, value: impl Into<Value>) -> QbResult<&mut Self> {
        self.add_compare(Clause::Where, Join::Marker, true, field, value.into())
    }

    pub fn or_not_where(&mut self, field: &str, value: impl Into<Value>) -> QbResult<&mut Self> {
        self.add_compare(Clause::Where, Join::Or, true, field, value.into())
    }

    /// One AND-joined condition per `(field, value)` pair.
    pub fn where_map<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>) -> QbResult<&mut Self>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut parsed = Vec::new();
        for (field, value) in pairs {
            let field = parse_field(field.as_ref())?;
            let predicate = Predicate::compare(field.column, field.operator, value.into())?;
            parsed.push((field.connector, predicate));
        }
        if parsed.is_empty() {
            return Err(QbError::invalid_condition("empty condition map"));
        }
        for (connector, predicate) in parsed {
            self.push_condition(Clause::Where, connector, predicate);
        }
        Ok(self)
    }

    /// Verbatim WHERE fragment.
    pub fn where_raw(&mut self, sql: &str) -> QbResult<&mut Self> {
        self.add_raw(Clause::Where, Connector::And, sql)
    }

    pub fn or_where_raw(&mut self, sql: &str) -> QbResult<&mut Self> {
        self.add_raw(Clause::Where, Connector::Or, sql)
    }

    fn add_raw(&mut self, clause: Clause, connector: Connector, sql: &str) -> QbResult<&mut Self> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(QbError::invalid_condition("empty raw condition"));
        }
        self.push_condition(clause, connector, Predicate::Raw(sql.to_string()));
        Ok(self)
    }

    // ==================== WHERE: IN ====================

    pub fn where_in<V: Into<Value>>(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> QbResult<&mut Self> {
        let values = Self::in_values(field, values)?;
        self.add_predicate(Clause::Where, Join::Marker, field, |column| {
            Ok(Predicate::InList {
                column,
                values,
                negated: false,
            })
        })
    }

    pub fn or_where_in<V: Into<Value>>(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> QbResult<&mut Self> {
        let values = Self::in_values(field, values)?;
        self.add_predicate(Clause::Where, Join::Or, field, |column| {
            Ok(Predicate::InList {
                column,
                values,
                negated: false,
            })
        })
    }

    pub fn where_not_in<V: Into<Value>>(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> QbResult<&mut Self> {
        let values = Self::in_values(field, values)?;
        self.add_predicate(Clause::Where, Join::Marker, field, |column| {
            Ok(Predicate::InList {
                column,
                values,
                negated: true,
            })
        })
    }

    pub fn or_where_not_in<V: Into<Value>>(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> QbResult<&mut Self> {
        let values = Self::in_values(field, values)?;
        self.add_predicate(Clause::Where, Join::Or, field, |column| {
            Ok(Predicate::InList {
                column,
                values,
                negated: true,
            })
        })
    }

    // ==================== WHERE: LIKE ====================

    fn add_like(
        &mut self,
        clause: Clause,
        join: Join,
        field: &str,
        text: &str,
        side: LikeSide,
        negated: bool,
        insensitive: bool,
    ) -> QbResult<&mut Self> {
        let pattern = side.pattern(text);
        self.add_predicate(clause, join, field, |column| {
            Ok(Predicate::Like {
                column,
                pattern,
                negated,
                insensitive,
            })
        })
    }

    /// `field LIKE '%text%'` (wildcards placed per `side`).
    pub fn where_like(&mut self, field: &str, text: &str, side: LikeSide) -> QbResult<&mut Self> {
        self.add_like(Clause::Where, Join::Marker, field, text, side, false, false)
    }

    pub fn or_where_like(&mut self, field: &str, text: &str, side: LikeSide) -> QbResult<&mut Self> {
        self.add_like(Clause::Where, Join::Or, field, text, side, false, false)
    }

    pub fn where_not_like(&mut self, field: &str, text: &str, side: LikeSide) -> QbResult<&mut Self> {
        self.add_like(Clause::Where, Join::Marker, field, text, side, true, false)
    }

    pub fn or_where_not_like(
        &mut self,
        field: &str,
        text: &str,
        side: LikeSide,
    ) -> QbResult<&mut Self> {
        self.add_like(Clause::Where, Join::Or, field, text, side, true, false)
    }

    /// Case-insensitive LIKE (`ILIKE` on PostgreSQL, `LOWER(field) LIKE` elsewhere).
    pub fn where_ilike(&mut self, field: &str, text: &str, side: LikeSide) -> QbResult<&mut Self> {
        self.add_like(Clause::Where, Join::Marker, field, text, side, false, true)
    }

    pub fn or_where_ilike(&mut self, field: &str, text: &str, side: LikeSide) -> QbResult<&mut Self> {
        self.add_like(Clause::Where, Join::Or, field, text, side, false, true)
    }

    pub fn where_not_ilike(&mut self, field: &str, text: &str, side: LikeSide) -> QbResult<&mut Self> {
        self.add_like(Clause::Where, Join::Marker, field, text, side, true, true)
    }

    // ==================== WHERE: NULL / BETWEEN ====================

    fn add_null(&mut self, join: Join, field: &str, negated: bool) -> QbResult<&mut Self> {
        self.add_predicate(Clause::Where, join, field, |column| {
            Ok(Predicate::Null { column, negated })
        })
    }

    pub fn where_null(&mut self, field: &str) -> QbResult<&mut Self> {
        self.add_null(Join::Marker, field, false)
    }

    pub fn or_where_null(&mut self, field: &str) -> QbResult<&mut Self> {
        self.add_null(Join::Or, field, false)
    }

    pub fn where_not_null(&mut self, field: &str) -> QbResult<&mut Self> {
        self.add_null(Join::Marker, field, true)
    }

    pub fn or_where_not_null(&mut self, field: &str) -> QbResult<&mut Self> {
        self.add_null(Join::Or, field, true)
    }

    fn add_between(
        &mut self,
        clause: Clause,
        join: Join,
        field: &str,
        low: Value,
        high: Value,
        negated: bool,
    ) -> QbResult<&mut Self> {
        self.add_predicate(clause, join, field, |column| {
            Ok(Predicate::Between {
                column,
                low,
                high,
                negated,
            })
        })
    }

    pub fn where_between(
        &mut self,
        field: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> QbResult<&mut Self> {
        self.add_between(Clause::Where, Join::Marker, field, low.into(), high.into(), false)
    }

    pub fn or_where_between(
        &mut self,
        field: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> QbResult<&mut Self> {
        self.add_between(Clause::Where, Join::Or, field, low.into(), high.into(), false)
    }

    pub fn where_not_between(
        &mut self,
        field: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> QbResult<&mut Self> {
        self.add_between(Clause::Where, Join::Marker, field, low.into(), high.into(), true)
    }

    pub fn or_where_not_between(
        &mut self,
        field: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> QbResult<&mut Self> {
        self.add_between(Clause::Where, Join::Or, field, low.into(), high.into(), true)
    }

    // ==================== WHERE: column-to-column ====================

    fn add_columns(&mut self, join: Join, left: &str, right: &str) -> QbResult<&mut Self> {
        let right = right.trim();
        if right.is_empty() {
            return Err(QbError::invalid_argument(format!(
                "where_column({left:?}) is missing the comparison column"
            )));
        }
        let right = right.to_string();
        let parsed = parse_field(left)?;
        let op = match parsed.operator {
            None => Operator::Eq,
            Some(
                op @ (Operator::Eq
                | Operator::Ne
                | Operator::NotEq
                | Operator::Lt
                | Operator::Gt
                | Operator::Lte
                | Operator::Gte),
            ) => op,
            Some(other) => {
                return Err(QbError::invalid_argument(format!(
                    "operator {} cannot compare two columns",
                    other.as_sql()
                )));
            }
        };
        let predicate = Predicate::Columns {
            left: parsed.column,
            op,
            right,
        };
        self.push_condition(Clause::Where, Self::connector(join, parsed.connector), predicate);
        Ok(self)
    }

    /// `left op right` where both sides are columns (`"posts.user_id"`, `"users.id"`).
    pub fn where_column(&mut self, left: &str, right: &str) -> QbResult<&mut Self> {
        self.add_columns(Join::Marker, left, right)
    }

    pub fn or_where_column(&mut self, left: &str, right: &str) -> QbResult<&mut Self> {
        self.add_columns(Join::Or, left, right)
    }

    // ==================== WHERE: date parts ====================

    fn add_date_part(
        &mut self,
        join: Join,
        field: &str,
        part: DatePart,
        value: Value,
    ) -> QbResult<&mut Self> {
        let parsed = parse_field(field)?;
        let op = match parsed.operator {
            None => Operator::Eq,
            Some(
                op @ (Operator::Eq
                | Operator::Ne
                | Operator::NotEq
                | Operator::Lt
                | Operator::Gt
                | Operator::Lte
                | Operator::Gte),
            ) => op,
            Some(other) => {
                return Err(QbError::invalid_argument(format!(
                    "operator {} is not valid for date comparisons",
                    other.as_sql()
                )));
            }
        };
        let predicate = Predicate::DatePart {
            column: parsed.column,
            part,
            op,
            value,
        };
        self.push_condition(Clause::Where, Self::connector(join, parsed.connector), predicate);
        Ok(self)
    }

    /// Compare a date/time part of `field` using the dialect's extraction syntax.
    pub fn where_date_part(
        &mut self,
        field: &str,
        part: DatePart,
        value: impl Into<Value>,
    ) -> QbResult<&mut Self> {
        self.add_date_part(Join::Marker, field, part, value.into())
    }

    pub fn or_where_date_part(
        &mut self,
        field: &str,
        part: DatePart,
        value: impl Into<Value>,
    ) -> QbResult<&mut Self> {
        self.add_date_part(Join::Or, field, part, value.into())
    }

    pub fn where_date(&mut self, field: &str, value: impl Into<Value>) -> QbResult<&mut Self> {
        self.where_date_part(field, DatePart::Date, value)
    }

    pub fn where_time(&mut self, field: &str, value: impl Into<Value>) -> QbResult<&mut Self> {
        self.where_date_part(field, DatePart::Time, value)
    }

    pub fn where_year(&mut self, field: &str, value: impl Into<Value>) -> QbResult<&mut Self> {
        self.where_date_part(field, DatePart::Year, value)
    }

    pub fn where_month(&mut self, field: &str, value: impl Into<Value>) -> QbResult<&mut Self> {
        self.where_date_part(field, DatePart::Month, value)
    }

    pub fn where_day(&mut self, field: &str, value: impl Into<Value>) -> QbResult<&mut Self> {
        self.where_date_part(field, DatePart::Day, value)
    }

    // ==================== WHERE: nested groups ====================

    fn add_group(
        &mut self,
        connector: Connector,
        configure: impl FnOnce(&mut QueryBuilder) -> QbResult<()>,
    ) -> QbResult<&mut Self> {
        let mut group = self.fresh();
        group.escape = self.escape;
        configure(&mut group)?;
        let conditions = std::mem::take(&mut group.state.wheres);
        if !conditions.is_empty() {
            self.push_condition(Clause::Where, connector, Predicate::Group(conditions));
        }
        Ok(self)
    }

    /// Parenthesized AND-joined group of the conditions added by `configure`.
    ///
    /// ```ignore
    /// qb.where_("status", "open")?
    ///     .where_group(|g| {
    ///         g.where_("owner", 3)?.or_where("shared", true)?;
    ///         Ok(())
    ///     })?;
    /// // ... WHERE status = 'open' AND (owner = 3 OR shared = 1)
    /// ```
    pub fn where_group(
        &mut self,
        configure: impl FnOnce(&mut QueryBuilder) -> QbResult<()>,
    ) -> QbResult<&mut Self> {
        self.add_group(Connector::And, configure)
    }

    pub fn or_where_group(
        &mut self,
        configure: impl FnOnce(&mut QueryBuilder) -> QbResult<()>,
    ) -> QbResult<&mut Self> {
        self.add_group(Connector::Or, configure)
    }

    // ==================== HAVING ====================

    pub fn having(&mut self, field: &str, value: impl Into<Value>) -> QbResult<&mut Self> {
        self.add_compare(Clause::Having, Join::Marker, false, field, value.into())
    }

    pub fn or_having(&mut self, field: &str, value: impl Into<Value>) -> QbResult<&mut Self> {
        self.add_compare(Clause::Having, Join::Or, false, field, value.into())
    }

    pub fn not_having(&mut self, field: &str, value: impl Into<Value>) -> QbResult<&mut Self> {
        self.add_compare(Clause::Having, Join::Marker, true, field, value.into())
    }

    pub fn having_in<V: Into<Value>>(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> QbResult<&mut Self> {
        let values = Self::in_values(field, values)?;
        self.add_predicate(Clause::Having, Join::Marker, field, |column| {
            Ok(Predicate::InList {
                column,
                values,
                negated: false,
            })
        })
    }

    pub fn having_not_in<V: Into<Value>>(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> QbResult<&mut Self> {
        let values = Self::in_values(field, values)?;
        self.add_predicate(Clause::Having, Join::Marker, field, |column| {
            Ok(Predicate::InList {
                column,
                values,
                negated: true,
            })
        })
    }

    pub fn having_like(&mut self, field: &str, text: &str, side: LikeSide) -> QbResult<&mut Self> {
        self.add_like(Clause::Having, Join::Marker, field, text, side, false, false)
    }

    pub fn or_having_like(&mut self, field: &str, text: &str, side: LikeSide) -> QbResult<&mut Self> {
        self.add_like(Clause::Having, Join::Or, field, text, side, false, false)
    }

    pub fn having_not_like(&mut self, field: &str, text: &str, side: LikeSide) -> QbResult<&mut Self> {
        self.add_like(Clause::Having, Join::Marker, field, text, side, true, false)
    }

    pub fn having_between(
        &mut self,
        field: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> QbResult<&mut Self> {
        self.add_between(Clause::Having, Join::Marker, field, low.into(), high.into(), false)
    }

    pub fn having_raw(&mut self, sql: &str) -> QbResult<&mut Self> {
        self.add_raw(Clause::Having, Connector::And, sql)
    }

    pub fn or_having_raw(&mut self, sql: &str) -> QbResult<&mut Self> {
        self.add_raw(Clause::Having, Connector::Or, sql)
    }
}
