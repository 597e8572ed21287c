//! Condition grammar for WHERE/HAVING clauses.
//!
//! Conditions are stored as a list of tagged [`Predicate`]s joined by an explicit
//! [`Connector`]; nothing is serialized until the statement compiler calls
//! [`ConditionList::render`].
//!
//! At the public API boundary a field string may carry two compatibility markers:
//!
//! - a leading `|` means "join with OR" (`"|name"`),
//! - a trailing operator token selects the comparison (`"age >="`, `"name %"`,
//!   `"id @"`, `"deleted_at IS NULL"`). The default is `=`.
//!
//! [`parse_field`] strips both markers; the internal representation only ever
//! sees a bare column plus an [`Operator`] and a [`Connector`].

use crate::connection::Connection;
use crate::dialect::DatePart;
use crate::error::{QbError, QbResult};
use crate::ident::{FieldResolver, is_identifier};
use crate::value::Value;

/// Leading character that marks a field as OR-joined.
pub const OR_MARKER: char = '|';

/// Logical connector placed before a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl Connector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// Comparison operator recognized in a field string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    /// `!=`
    Ne,
    /// `<>`
    NotEq,
    Lt,
    Gt,
    Lte,
    Gte,
    /// `%`: contains (`LIKE '%v%'`)
    Contains,
    /// `!%`: does not contain
    NotContains,
    /// `LIKE` with a caller-supplied pattern
    Like,
    NotLike,
    /// `@` / `IN`
    In,
    /// `!@` / `NOT IN`
    NotIn,
    IsNull,
    IsNotNull,
    Between,
    NotBetween,
}

impl Operator {
    /// SQL spelling for scalar comparisons.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::NotEq => "<>",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Lte => "<=",
            Operator::Gte => ">=",
            Operator::Contains | Operator::Like => "LIKE",
            Operator::NotContains | Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
        }
    }

    fn is_negative(&self) -> bool {
        matches!(self, Operator::Ne | Operator::NotEq | Operator::NotIn)
    }
}

/// Keyword operators, longest first so `NOT LIKE` wins over `LIKE`.
const KEYWORD_OPERATORS: &[(&str, Operator)] = &[
    ("IS NOT NULL", Operator::IsNotNull),
    ("IS NULL", Operator::IsNull),
    ("NOT BETWEEN", Operator::NotBetween),
    ("BETWEEN", Operator::Between),
    ("NOT LIKE", Operator::NotLike),
    ("LIKE", Operator::Like),
    ("NOT IN", Operator::NotIn),
    ("IN", Operator::In),
];

/// Symbol operators, two-character ones first.
const SYMBOL_OPERATORS: &[(&str, Operator)] = &[
    ("<=", Operator::Lte),
    (">=", Operator::Gte),
    ("<>", Operator::NotEq),
    ("!=", Operator::Ne),
    ("!%", Operator::NotContains),
    ("!@", Operator::NotIn),
    ("=", Operator::Eq),
    ("<", Operator::Lt),
    (">", Operator::Gt),
    ("%", Operator::Contains),
    ("@", Operator::In),
];

/// A field string split into connector, column and operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedField {
    pub connector: Connector,
    pub column: String,
    /// `None` when the field carried no operator token.
    pub operator: Option<Operator>,
}

/// Strip the OR marker and trailing operator token from a field string.
pub fn parse_field(raw: &str) -> QbResult<ParsedField> {
    let mut s = raw.trim();
    let mut connector = Connector::And;
    if let Some(rest) = s.strip_prefix(OR_MARKER) {
        connector = Connector::Or;
        s = rest.trim_start();
    }

    let (column, operator) = split_operator(s);
    if column.is_empty() {
        return Err(QbError::invalid_condition(format!(
            "field expression {raw:?} names no column"
        )));
    }
    Ok(ParsedField {
        connector,
        column: column.to_string(),
        operator,
    })
}

fn split_operator(s: &str) -> (&str, Option<Operator>) {
    let upper = s.to_ascii_uppercase();
    for (kw, op) in KEYWORD_OPERATORS {
        if let Some(head) = upper.strip_suffix(kw) {
            if head.ends_with(char::is_whitespace) {
                return (s[..head.len()].trim_end(), Some(*op));
            }
        }
    }
    for (sym, op) in SYMBOL_OPERATORS {
        if let Some(head) = s.strip_suffix(sym) {
            // `a.b = c` style raw predicates end with an operand, not an operator.
            if !head.trim_end().ends_with(['<', '>', '=', '!']) {
                return (head.trim_end(), Some(*op));
            }
        }
    }
    (s, None)
}

/// Which side(s) of a LIKE pattern get a `%` wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LikeSide {
    #[default]
    Both,
    Before,
    After,
    None,
}

impl LikeSide {
    pub fn pattern(&self, text: &str) -> String {
        match self {
            LikeSide::Both => format!("%{text}%"),
            LikeSide::Before => format!("%{text}"),
            LikeSide::After => format!("{text}%"),
            LikeSide::None => text.to_string(),
        }
    }
}

/// One boolean term of a WHERE/HAVING clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column op value`
    Compare {
        column: String,
        op: Operator,
        value: Value,
    },
    /// `left op right`, both sides resolved as fields
    Columns {
        left: String,
        op: Operator,
        right: String,
    },
    /// `column [NOT] IN (v1, v2, ...)`
    InList {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    /// `column [NOT] IN (subquery)`
    InSubquery {
        column: String,
        sql: String,
        negated: bool,
    },
    /// `column op (subquery)` for a scalar subquery
    CompareSubquery {
        column: String,
        op: Operator,
        sql: String,
    },
    /// `column [NOT] BETWEEN low AND high`
    Between {
        column: String,
        low: Value,
        high: Value,
        negated: bool,
    },
    /// `column IS [NOT] NULL`
    Null { column: String, negated: bool },
    /// `column [NOT] LIKE pattern`, optionally case-insensitive
    Like {
        column: String,
        pattern: String,
        negated: bool,
        insensitive: bool,
    },
    /// Dialect-specific date/time part comparison
    DatePart {
        column: String,
        part: DatePart,
        op: Operator,
        value: Value,
    },
    /// `[NOT] EXISTS (subquery)`
    Exists { sql: String, negated: bool },
    /// `NOT <predicate>`
    Not(Box<Predicate>),
    /// Parenthesized nested list
    Group(ConditionList),
    /// Verbatim SQL
    Raw(String),
}

impl Predicate {
    /// Normalize a `column op value` triple into the matching variant.
    pub fn compare(column: String, op: Option<Operator>, value: Value) -> QbResult<Predicate> {
        let explicit = op.is_some();
        let op = op.unwrap_or(Operator::Eq);

        let predicate = match (op, value) {
            (Operator::IsNull, _) => Predicate::Null {
                column,
                negated: false,
            },
            (Operator::IsNotNull, _) => Predicate::Null {
                column,
                negated: true,
            },
            // Composite expressions such as `a.id = b.a_id` or `EXISTS(...)`.
            (Operator::Eq, Value::Null) if !explicit && !is_identifier(&column) => {
                Predicate::Raw(column)
            }
            (Operator::Eq, Value::Null) => Predicate::Null {
                column,
                negated: false,
            },
            (Operator::Ne | Operator::NotEq, Value::Null) => Predicate::Null {
                column,
                negated: true,
            },
            (Operator::Between | Operator::NotBetween, value) => {
                let negated = op == Operator::NotBetween;
                match value {
                    Value::List(mut items) if items.len() == 2 => {
                        let high = items.pop().unwrap_or(Value::Null);
                        let low = items.pop().unwrap_or(Value::Null);
                        Predicate::Between {
                            column,
                            low,
                            high,
                            negated,
                        }
                    }
                    _ => {
                        return Err(QbError::invalid_argument(format!(
                            "BETWEEN on {column} needs exactly two values"
                        )));
                    }
                }
            }
            (Operator::Contains | Operator::NotContains, value) => Predicate::Like {
                column,
                pattern: LikeSide::Both.pattern(&text_of(&value)),
                negated: op == Operator::NotContains,
                insensitive: false,
            },
            (Operator::Like | Operator::NotLike, value) => Predicate::Like {
                column,
                pattern: text_of(&value),
                negated: op == Operator::NotLike,
                insensitive: false,
            },
            (Operator::In | Operator::NotIn, Value::List(values))
            | (Operator::Eq | Operator::Ne | Operator::NotEq, Value::List(values)) => {
                if values.is_empty() {
                    return Err(QbError::invalid_argument(format!(
                        "IN-list for {column} is empty"
                    )));
                }
                Predicate::InList {
                    column,
                    values,
                    negated: op.is_negative(),
                }
            }
            (Operator::In | Operator::NotIn, value) => Predicate::InList {
                column,
                values: vec![value],
                negated: op == Operator::NotIn,
            },
            (op, value) => Predicate::Compare { column, op, value },
        };
        Ok(predicate)
    }

    fn render(&self, r: &FieldResolver<'_>, conn: &Connection) -> String {
        let dialect = conn.dialect();
        match self {
            Predicate::Compare { column, op, value } => {
                format!("{} {} {}", r.field(column), op.as_sql(), conn.quote(value))
            }
            Predicate::Columns { left, op, right } => {
                format!("{} {} {}", r.field(left), op.as_sql(), r.field(right))
            }
            Predicate::InList {
                column,
                values,
                negated,
            } => {
                let list = conn.quote(&Value::List(values.clone()));
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{} {op} {list}", r.field(column))
            }
            Predicate::InSubquery {
                column,
                sql,
                negated,
            } => {
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{} {op} ({sql})", r.field(column))
            }
            Predicate::CompareSubquery { column, op, sql } => {
                format!("{} {} ({sql})", r.field(column), op.as_sql())
            }
            Predicate::Between {
                column,
                low,
                high,
                negated,
            } => {
                let op = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                format!(
                    "{} {op} {} AND {}",
                    r.field(column),
                    conn.quote(low),
                    conn.quote(high)
                )
            }
            Predicate::Null { column, negated } => {
                let op = if *negated { "IS NOT NULL" } else { "IS NULL" };
                format!("{} {op}", r.field(column))
            }
            Predicate::Like {
                column,
                pattern,
                negated,
                insensitive,
            } => dialect.like_sql(&r.field(column), pattern, *negated, *insensitive),
            Predicate::DatePart {
                column,
                part,
                op,
                value,
            } => {
                let expr = dialect.date_part_expr(*part, &r.field(column));
                let value = dialect.date_part_value(*part, value.clone());
                format!("{expr} {} {}", op.as_sql(), conn.quote(&value))
            }
            Predicate::Exists { sql, negated } => {
                let kw = if *negated { "NOT EXISTS" } else { "EXISTS" };
                format!("{kw} ({sql})")
            }
            Predicate::Not(inner) => format!("NOT {}", inner.render(r, conn)),
            Predicate::Group(list) => {
                let inner = list.render_with(r, conn);
                if inner.is_empty() {
                    String::new()
                } else {
                    format!("({inner})")
                }
            }
            Predicate::Raw(sql) => sql.clone(),
        }
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        Value::Raw(r) => r.as_str().to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::List(_) => String::new(),
    }
}

/// A predicate with its connector and escape override.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub connector: Connector,
    pub predicate: Predicate,
    /// Per-call identifier escaping; `None` uses the connection default.
    pub escape: Option<bool>,
}

/// Ordered list of conditions for one clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionList {
    items: Vec<Condition>,
}

impl ConditionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, connector: Connector, predicate: Predicate, escape: Option<bool>) {
        self.items.push(Condition {
            connector,
            predicate,
            escape,
        });
    }

    /// Serialize the list (without the WHERE/HAVING keyword).
    pub fn render(&self, conn: &Connection, default_escape: bool) -> String {
        self.render_with(&FieldResolver::new(conn, default_escape), conn)
    }

    fn render_with(&self, outer: &FieldResolver<'_>, conn: &Connection) -> String {
        let mut out = String::new();
        for cond in &self.items {
            let resolver = match cond.escape {
                Some(escape) => FieldResolver::new(conn, escape),
                None => *outer,
            };
            let sql = cond.predicate.render(&resolver, conn);
            if sql.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
                out.push_str(cond.connector.as_str());
                out.push(' ');
            }
            out.push_str(&sql);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use crate::dialect::DialectKind;

    #[test]
    fn test_parse_or_marker_and_operator() {
        let p = parse_field("|age >=").unwrap();
        assert_eq!(p.connector, Connector::Or);
        assert_eq!(p.column, "age");
        assert_eq!(p.operator, Some(Operator::Gte));

        let p = parse_field("name").unwrap();
        assert_eq!(p.connector, Connector::And);
        assert_eq!(p.operator, None);
    }

    #[test]
    fn test_parse_keyword_operators() {
        assert_eq!(
            parse_field("deleted_at is not null").unwrap().operator,
            Some(Operator::IsNotNull)
        );
        assert_eq!(parse_field("title NOT LIKE").unwrap().operator, Some(Operator::NotLike));
        assert_eq!(parse_field("id !@").unwrap().operator, Some(Operator::NotIn));
        assert_eq!(parse_field("id<>").unwrap().operator, Some(Operator::NotEq));
        // A column whose name merely ends in "in" is not an operator.
        assert_eq!(parse_field("login").unwrap().operator, None);
    }

    #[test]
    fn test_parse_rejects_empty_field() {
        assert!(matches!(parse_field("| >"), Err(QbError::InvalidCondition(_))));
        assert!(matches!(parse_field("  "), Err(QbError::InvalidCondition(_))));
    }

    #[test]
    fn test_compare_normalization() {
        let p = Predicate::compare("a.id = b.a_id".into(), None, Value::Null).unwrap();
        assert_eq!(p, Predicate::Raw("a.id = b.a_id".into()));

        let p = Predicate::compare("deleted_at".into(), None, Value::Null).unwrap();
        assert!(matches!(p, Predicate::Null { negated: false, .. }));

        let p = Predicate::compare("id".into(), None, Value::from(vec![1, 2])).unwrap();
        assert!(matches!(p, Predicate::InList { negated: false, .. }));

        let err = Predicate::compare("id".into(), Some(Operator::In), Value::List(vec![]));
        assert!(matches!(err, Err(QbError::InvalidArgument(_))));
    }

    #[test]
    fn test_render_connectors() {
        let conn = Connection::new(ConnectionConfig::new(DialectKind::MySql));
        let mut list = ConditionList::new();
        list.push(
            Connector::Or, // ignored for the first item
            Predicate::compare("id".into(), None, Value::Int(3)).unwrap(),
            None,
        );
        list.push(
            Connector::Or,
            Predicate::compare("name".into(), None, Value::from("dev")).unwrap(),
            None,
        );
        list.push(
            Connector::And,
            Predicate::compare("age".into(), Some(Operator::Gt), Value::Int(18)).unwrap(),
            Some(true),
        );
        assert_eq!(
            list.render(&conn, false),
            "id = 3 OR name = 'dev' AND `age` > 18"
        );
    }

    #[test]
    fn test_render_contains_operator() {
        let conn = Connection::new(ConnectionConfig::new(DialectKind::Sqlite));
        let mut list = ConditionList::new();
        let p = Predicate::compare("name".into(), Some(Operator::Contains), "dev".into()).unwrap();
        list.push(Connector::And, p, None);
        assert_eq!(list.render(&conn, false), "name LIKE '%dev%'");
    }
}
