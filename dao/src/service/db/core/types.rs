//! Common type definitions for the query layer
//!
//! Values, rows and stored-procedure parameters shared by every module.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;

/// A single SQL value, used both for bound parameters and for row cells.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Name of the variant, used in shape-mismatch messages.
    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::Null => "NULL",
            SqlValue::Bool(_) => "BOOLEAN",
            SqlValue::Int(_) => "INTEGER",
            SqlValue::UInt(_) => "UNSIGNED",
            SqlValue::Float(_) => "FLOAT",
            SqlValue::Decimal(_) => "DECIMAL",
            SqlValue::Text(_) => "TEXT",
            SqlValue::Bytes(_) => "BINARY",
            SqlValue::Date(_) => "DATE",
            SqlValue::Time(_) => "TIME",
            SqlValue::Timestamp(_) => "TIMESTAMP",
        }
    }

    /// JSON form of the value.
    ///
    /// Used when rows are serialized. Integral decimals become JSON integers
    /// and fractional ones JSON floats; temporal values use ISO-8601 text.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Bool(b) => Value::Bool(*b),
            SqlValue::Int(i) => Value::from(*i),
            SqlValue::UInt(u) => Value::from(*u),
            SqlValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SqlValue::Decimal(d) => {
                if d.fract().is_zero() {
                    if let Some(i) = d.to_i64() {
                        return Value::from(i);
                    }
                }
                d.to_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(d.to_string()))
            }
            SqlValue::Text(s) => Value::String(s.clone()),
            SqlValue::Bytes(b) => Value::from(b.clone()),
            SqlValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            SqlValue::Time(t) => Value::String(t.format("%H:%M:%S%.f").to_string()),
            SqlValue::Timestamp(ts) => Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "null"),
            SqlValue::Bool(b) => write!(f, "{b}"),
            SqlValue::Int(i) => write!(f, "{i}"),
            SqlValue::UInt(u) => write!(f, "{u}"),
            SqlValue::Float(v) => write!(f, "{v}"),
            SqlValue::Decimal(d) => write!(f, "{d}"),
            SqlValue::Text(s) => write!(f, "{s}"),
            SqlValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            SqlValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            SqlValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            SqlValue::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

macro_rules! impl_from_for_sql_value {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

impl_from_for_sql_value! {
    bool => |v| SqlValue::Bool(v),
    i8 => |v| SqlValue::Int(v.into()),
    i16 => |v| SqlValue::Int(v.into()),
    i32 => |v| SqlValue::Int(v.into()),
    i64 => |v| SqlValue::Int(v),
    u8 => |v| SqlValue::UInt(v.into()),
    u16 => |v| SqlValue::UInt(v.into()),
    u32 => |v| SqlValue::UInt(v.into()),
    u64 => |v| SqlValue::UInt(v),
    f32 => |v| SqlValue::Float(v.into()),
    f64 => |v| SqlValue::Float(v),
    Decimal => |v| SqlValue::Decimal(v),
    String => |v| SqlValue::Text(v),
    &str => |v| SqlValue::Text(v.to_string()),
    Vec<u8> => |v| SqlValue::Bytes(v),
    NaiveDate => |v| SqlValue::Date(v),
    NaiveTime => |v| SqlValue::Time(v),
    NaiveDateTime => |v| SqlValue::Timestamp(v),
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Builds a positional parameter list: `params![1, "name", None::<i64>]`.
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::SqlValue>::new()
    };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::SqlValue::from($value)),+]
    };
}

/// One result row: column names mapped to values, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    /// Appends a column. A repeated name keeps its first position and takes the new value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) {
        let name = name.into();
        let value = value.into();

        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.columns.push((name, value)),
        }
    }

    /// Builder form of [`Row::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Case-insensitive lookup by column name.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn get_index(&self, index: usize) -> Option<&SqlValue> {
        self.columns.get(index).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl IntoIterator for Row {
    type Item = (String, SqlValue);
    type IntoIter = std::vec::IntoIter<(String, SqlValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (name, value) in iter {
            row.insert(name, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// SQL type codes for OUT parameters, numbered like `java.sql.Types`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Varchar,
    Char,
    Integer,
    BigInt,
    Decimal,
    Double,
    Boolean,
    Date,
    Time,
    Timestamp,
    Blob,
    Clob,
    Other(i32),
}

impl SqlType {
    pub fn code(&self) -> i32 {
        match self {
            SqlType::Varchar => 12,
            SqlType::Char => 1,
            SqlType::Integer => 4,
            SqlType::BigInt => -5,
            SqlType::Decimal => 3,
            SqlType::Double => 8,
            SqlType::Boolean => 16,
            SqlType::Date => 91,
            SqlType::Time => 92,
            SqlType::Timestamp => 93,
            SqlType::Blob => 2004,
            SqlType::Clob => 2005,
            SqlType::Other(code) => *code,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            12 => SqlType::Varchar,
            1 => SqlType::Char,
            4 => SqlType::Integer,
            -5 => SqlType::BigInt,
            3 => SqlType::Decimal,
            8 => SqlType::Double,
            16 => SqlType::Boolean,
            91 => SqlType::Date,
            92 => SqlType::Time,
            93 => SqlType::Timestamp,
            2004 => SqlType::Blob,
            2005 => SqlType::Clob,
            other => SqlType::Other(other),
        }
    }
}

/// Positional stored-procedure parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcedureParam {
    /// Bound by value.
    In(SqlValue),
    /// Registered for retrieval; read back as text after the call.
    Out(SqlType),
}

impl ProcedureParam {
    pub fn input(value: impl Into<SqlValue>) -> Self {
        ProcedureParam::In(value.into())
    }

    pub fn output(sql_type: SqlType) -> Self {
        ProcedureParam::Out(sql_type)
    }

    pub fn is_out(&self) -> bool {
        matches!(self, ProcedureParam::Out(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_preserves_column_order() {
        let row = Row::new().with("id", 7).with("name", "x");

        let names: Vec<&str> = row.column_names().collect();
        assert_eq!(names, vec!["id", "name"]);
        assert_eq!(row.get("ID"), Some(&SqlValue::Int(7)));
        assert_eq!(row.get_index(1), Some(&SqlValue::Text("x".to_string())));
    }

    #[test]
    fn test_row_duplicate_column_keeps_last_value() {
        let row = Row::new().with("a", 1).with("b", 2).with("a", 3);

        assert_eq!(row.len(), 2);
        assert_eq!(row.get_index(0), Some(&SqlValue::Int(3)));
    }

    #[test]
    fn test_params_macro() {
        let params = params![1, "name", None::<i64>, true];
        assert_eq!(
            params,
            vec![
                SqlValue::Int(1),
                SqlValue::Text("name".to_string()),
                SqlValue::Null,
                SqlValue::Bool(true),
            ]
        );
        assert!(params![].is_empty());
    }

    #[test]
    fn test_decimal_to_json() {
        assert_eq!(SqlValue::Decimal(Decimal::new(25, 0)).to_json(), serde_json::json!(25));
        assert_eq!(SqlValue::Decimal(Decimal::new(105, 1)).to_json(), serde_json::json!(10.5));
    }

    #[test]
    fn test_procedure_param_direction() {
        assert!(!ProcedureParam::input(5).is_out());
        assert!(ProcedureParam::output(SqlType::Varchar).is_out());
    }

    #[test]
    fn test_sql_type_codes() {
        assert_eq!(SqlType::Varchar.code(), 12);
        assert_eq!(SqlType::from_code(-5), SqlType::BigInt);
        assert_eq!(SqlType::from_code(1111), SqlType::Other(1111));
    }

    #[test]
    fn test_row_serializes_in_column_order() {
        let row = Row::new().with("name", "x").with("id", 7);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"name":"x","id":7}"#);
    }
}
