//! Literal values and the raw SQL marker.
//!
//! Every value handed to the builder is converted into a [`Value`] and quoted by
//! the connection's dialect at compile time. [`RawSql`] bypasses quoting.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use std::fmt;

/// Already-valid SQL text that must never be quoted or escaped.
///
/// # Example
/// ```ignore
/// qb.set("updated_at", RawSql::new("NOW()"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawSql(String);

impl RawSql {
    pub fn new(sql: impl Into<String>) -> Self {
        RawSql(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RawSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A literal value bound into a compiled statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Unquoted SQL fragment.
    Raw(RawSql),
    /// Array value; compiles to a parenthesized, comma-joined list.
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view used when unwrapping aggregate results.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Raw(r) => Some(r.as_str()),
            _ => None,
        }
    }
}

impl From<RawSql> for Value {
    fn from(v: RawSql) -> Self {
        Value::Raw(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Text(v.to_string()),
        }
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::from(v as u64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for Value {
    fn from(v: &[T]) -> Self {
        Value::List(v.iter().cloned().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(v: [T; N]) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Text(v.format("%Y-%m-%d").to_string())
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Text(v.format("%H:%M:%S").to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Text(v.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(v: DateTime<Tz>) -> Self {
        Value::from(v.naive_utc())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Text(n.to_string()), Value::Float),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            // Objects are stored as their JSON text.
            obj @ serde_json::Value::Object(_) => Value::Text(obj.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_maps_to_null() {
        let none: Option<i32> = None;
        assert_eq!(Value::from(none), Value::Null);
        assert_eq!(Value::from(Some(3)), Value::Int(3));
    }

    #[test]
    fn test_json_conversion() {
        let v = Value::from(serde_json::json!([1, "a", null, 2.5]));
        assert_eq!(
            v,
            Value::List(vec![
                Value::Int(1),
                Value::Text("a".into()),
                Value::Null,
                Value::Float(2.5)
            ])
        );
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::Text(" 42 ".into()).as_i64(), Some(42));
        assert_eq!(Value::Text("2.5".into()).as_f64(), Some(2.5));
        assert_eq!(Value::Null.as_f64(), None);
    }

    #[test]
    fn test_chrono_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(Value::from(d), Value::Text("2024-03-09".into()));
    }
}
