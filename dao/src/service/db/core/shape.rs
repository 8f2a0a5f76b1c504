//! 결과 변환 모듈
//!
//! 조회된 행을 호출자가 요청한 형태(스칼라, 맵, 레코드)로 변환합니다.
//!
//! The target representation is an explicit [`Shape`] value. Typed helpers
//! derive it from [`FromRow::shape`], so `query_object::<i64>` asks for a
//! scalar, `query_object::<Row>` for a generic mapping, and any [`Record`]
//! type for a structured record.

use crate::service::db::core::de::{self, fits_f32};
use crate::service::db::core::types::{Row, SqlValue};
use crate::tool::error::DaoError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::str::FromStr;

/// Scalar types a single-column row can be projected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Text,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Decimal,
    Bytes,
    Date,
    Time,
    Timestamp,
    Blob,
    Clob,
}

impl ScalarType {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Text => "text",
            ScalarType::Bool => "bool",
            ScalarType::I8 => "i8",
            ScalarType::I16 => "i16",
            ScalarType::I32 => "i32",
            ScalarType::I64 => "i64",
            ScalarType::U8 => "u8",
            ScalarType::U16 => "u16",
            ScalarType::U32 => "u32",
            ScalarType::U64 => "u64",
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
            ScalarType::Decimal => "decimal",
            ScalarType::Bytes => "bytes",
            ScalarType::Date => "date",
            ScalarType::Time => "time",
            ScalarType::Timestamp => "timestamp",
            ScalarType::Blob => "blob",
            ScalarType::Clob => "clob",
        }
    }

    /// Converts `value` to this type. NULL passes through unchanged.
    pub fn coerce(&self, value: SqlValue) -> Result<SqlValue, DaoError> {
        if value.is_null() {
            return Ok(SqlValue::Null);
        }

        let converted = match self {
            ScalarType::Text | ScalarType::Clob => to_text(&value).map(SqlValue::Text),
            ScalarType::Bool => to_bool(&value).map(SqlValue::Bool),
            ScalarType::I8 => to_i64(&value, i8::MIN.into(), i8::MAX.into()).map(SqlValue::Int),
            ScalarType::I16 => to_i64(&value, i16::MIN.into(), i16::MAX.into()).map(SqlValue::Int),
            ScalarType::I32 => to_i64(&value, i32::MIN.into(), i32::MAX.into()).map(SqlValue::Int),
            ScalarType::I64 => to_i64(&value, i64::MIN, i64::MAX).map(SqlValue::Int),
            ScalarType::U8 => to_u64(&value, u8::MAX.into()).map(SqlValue::UInt),
            ScalarType::U16 => to_u64(&value, u16::MAX.into()).map(SqlValue::UInt),
            ScalarType::U32 => to_u64(&value, u32::MAX.into()).map(SqlValue::UInt),
            ScalarType::U64 => to_u64(&value, u64::MAX).map(SqlValue::UInt),
            ScalarType::F32 => to_f64(&value).filter(|v| fits_f32(*v)).map(SqlValue::Float),
            ScalarType::F64 => to_f64(&value).map(SqlValue::Float),
            ScalarType::Decimal => to_decimal(&value).map(SqlValue::Decimal),
            ScalarType::Bytes | ScalarType::Blob => to_bytes(&value).map(SqlValue::Bytes),
            ScalarType::Date => to_date(&value).map(SqlValue::Date),
            ScalarType::Time => to_time(&value).map(SqlValue::Time),
            ScalarType::Timestamp => to_timestamp(&value).map(SqlValue::Timestamp),
        };

        converted.ok_or_else(|| {
            DaoError::ShapeMismatch(format!(
                "cannot convert {} value '{}' to {}",
                value.kind(),
                value,
                self.name()
            ))
        })
    }
}

/// Type name and field names of a structured record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDescriptor {
    pub type_name: &'static str,
    pub fields: &'static [&'static str],
}

/// Declared target representation of query results.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Shape {
    /// Single column projected to a scalar type.
    Scalar(ScalarType),
    /// Column name to value mapping, column order kept.
    #[default]
    Map,
    /// Columns matched to record fields by name.
    Record(RecordDescriptor),
}

impl Shape {
    pub fn describe(&self) -> String {
        match self {
            Shape::Scalar(ty) => format!("scalar {}", ty.name()),
            Shape::Map => "map".to_string(),
            Shape::Record(desc) => format!("record {}", desc.type_name),
        }
    }
}

/// A row after shaping.
#[derive(Debug, Clone, PartialEq)]
pub enum Shaped {
    Scalar(SqlValue),
    Map(Row),
    /// Values keyed by the record's own field names.
    Record(Row),
}

/// Projects rows according to a [`Shape`].
pub struct ResultShaper;

impl ResultShaper {
    pub fn shape_row(shape: &Shape, row: Row) -> Result<Shaped, DaoError> {
        match shape {
            Shape::Scalar(ty) => Self::shape_scalar(*ty, row).map(Shaped::Scalar),
            Shape::Map => Ok(Shaped::Map(row)),
            Shape::Record(desc) => Ok(Shaped::Record(Self::shape_record(desc, row))),
        }
    }

    pub fn shape_rows(shape: &Shape, rows: Vec<Row>) -> Result<Vec<Shaped>, DaoError> {
        rows.into_iter()
            .map(|row| Self::shape_row(shape, row))
            .collect()
    }

    fn shape_scalar(ty: ScalarType, row: Row) -> Result<SqlValue, DaoError> {
        if row.len() != 1 {
            return Err(DaoError::ShapeMismatch(format!(
                "{} requested but row has {} columns",
                ty.name(),
                row.len()
            )));
        }

        let (_, value) = row
            .into_iter()
            .next()
            .ok_or_else(|| DaoError::ShapeMismatch("row has no columns".to_string()))?;
        ty.coerce(value)
    }

    pub(crate) fn shape_record(desc: &RecordDescriptor, row: Row) -> Row {
        let mut fields = Row::with_capacity(row.len());

        for (column, value) in row {
            let key = normalize_name(&column);
            if let Some(field) = desc.fields.iter().find(|f| normalize_name(f) == key) {
                fields.insert(*field, value);
            }
        }

        fields
    }
}

/// `user_name`, `userName` and `USERNAME` all normalize to `username`.
fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Rust types a shaped row can be converted into.
pub trait FromRow: Sized {
    fn shape() -> Shape;

    fn from_shaped(shaped: Shaped) -> Result<Self, DaoError>;
}

/// A structured record populated from columns by field name.
///
/// Records deserialize from the matched fields, so fields without a matching
/// column must have a default (`#[serde(default)]` on the struct).
///
/// ```
/// use dao::Record;
/// use serde::Deserialize;
///
/// #[derive(Debug, Default, Deserialize)]
/// #[serde(default)]
/// struct User {
///     id: i64,
///     #[serde(rename = "userName")]
///     user_name: String,
/// }
///
/// impl Record for User {
///     const TYPE_NAME: &'static str = "User";
///     const FIELDS: &'static [&'static str] = &["id", "userName"];
/// }
/// ```
pub trait Record: DeserializeOwned {
    const TYPE_NAME: &'static str;
    /// Serialized field names.
    const FIELDS: &'static [&'static str];
}

fn descriptor<T: Record>() -> RecordDescriptor {
    RecordDescriptor {
        type_name: T::TYPE_NAME,
        fields: T::FIELDS,
    }
}

impl<T: Record> FromRow for T {
    fn shape() -> Shape {
        Shape::Record(descriptor::<T>())
    }

    fn from_shaped(shaped: Shaped) -> Result<Self, DaoError> {
        let fields = match shaped {
            Shaped::Record(fields) => fields,
            Shaped::Map(row) => ResultShaper::shape_record(&descriptor::<T>(), row),
            Shaped::Scalar(value) => {
                return Err(DaoError::ShapeMismatch(format!(
                    "expected record {}, got scalar {}",
                    T::TYPE_NAME,
                    value.kind()
                )))
            }
        };

        de::from_fields(fields).map_err(|e| {
            DaoError::ShapeMismatch(format!("cannot build record {}: {}", T::TYPE_NAME, e))
        })
    }
}

impl FromRow for Row {
    fn shape() -> Shape {
        Shape::Map
    }

    fn from_shaped(shaped: Shaped) -> Result<Self, DaoError> {
        match shaped {
            Shaped::Map(row) => Ok(row),
            other => Err(DaoError::ShapeMismatch(format!(
                "expected map, got {other:?}"
            ))),
        }
    }
}

macro_rules! impl_scalar_from_row {
    ($($ty:ty => $scalar:ident, $variant:ident, |$v:ident| $conv:expr);* $(;)?) => {
        $(
            impl FromRow for $ty {
                fn shape() -> Shape {
                    Shape::Scalar(ScalarType::$scalar)
                }

                fn from_shaped(shaped: Shaped) -> Result<Self, DaoError> {
                    match shaped {
                        Shaped::Scalar(SqlValue::$variant($v)) => $conv,
                        Shaped::Scalar(SqlValue::Null) => Err(DaoError::ShapeMismatch(format!(
                            "NULL value for non-nullable {}",
                            ScalarType::$scalar.name()
                        ))),
                        other => Err(DaoError::ShapeMismatch(format!(
                            "expected scalar {}, got {:?}",
                            ScalarType::$scalar.name(),
                            other
                        ))),
                    }
                }
            }
        )*
    };
}

fn narrow<T: TryFrom<i64>>(v: i64) -> Result<T, DaoError> {
    T::try_from(v).map_err(|_| DaoError::ShapeMismatch(format!("value {v} out of range")))
}

fn narrow_unsigned<T: TryFrom<u64>>(v: u64) -> Result<T, DaoError> {
    T::try_from(v).map_err(|_| DaoError::ShapeMismatch(format!("value {v} out of range")))
}

fn narrow_f32(v: f64) -> Result<f32, DaoError> {
    if fits_f32(v) {
        Ok(v as f32)
    } else {
        Err(DaoError::ShapeMismatch(format!("value {v} out of f32 range")))
    }
}

impl_scalar_from_row! {
    String => Text, Text, |v| Ok(v);
    bool => Bool, Bool, |v| Ok(v);
    i8 => I8, Int, |v| narrow(v);
    i16 => I16, Int, |v| narrow(v);
    i32 => I32, Int, |v| narrow(v);
    i64 => I64, Int, |v| Ok(v);
    u8 => U8, UInt, |v| narrow_unsigned(v);
    u16 => U16, UInt, |v| narrow_unsigned(v);
    u32 => U32, UInt, |v| narrow_unsigned(v);
    u64 => U64, UInt, |v| Ok(v);
    f32 => F32, Float, |v| narrow_f32(v);
    f64 => F64, Float, |v| Ok(v);
    Decimal => Decimal, Decimal, |v| Ok(v);
    Vec<u8> => Bytes, Bytes, |v| Ok(v);
    NaiveDate => Date, Date, |v| Ok(v);
    NaiveTime => Time, Time, |v| Ok(v);
    NaiveDateTime => Timestamp, Timestamp, |v| Ok(v);
}

pub(super) fn to_text(value: &SqlValue) -> Option<String> {
    match value {
        SqlValue::Text(s) => Some(s.clone()),
        SqlValue::Bytes(b) => String::from_utf8(b.clone()).ok(),
        SqlValue::Null => None,
        other => Some(other.to_string()),
    }
}

pub(super) fn to_bool(value: &SqlValue) -> Option<bool> {
    match value {
        SqlValue::Bool(b) => Some(*b),
        SqlValue::Int(0) | SqlValue::UInt(0) => Some(false),
        SqlValue::Int(1) | SqlValue::UInt(1) => Some(true),
        SqlValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "y" => Some(true),
            "false" | "0" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub(super) fn to_i64(value: &SqlValue, min: i64, max: i64) -> Option<i64> {
    let v = match value {
        SqlValue::Int(i) => Some(*i),
        SqlValue::UInt(u) => i64::try_from(*u).ok(),
        SqlValue::Bool(b) => Some(i64::from(*b)),
        SqlValue::Float(f) if f.fract() == 0.0 => f.to_i64(),
        SqlValue::Decimal(d) if d.fract().is_zero() => d.to_i64(),
        SqlValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    (min..=max).contains(&v).then_some(v)
}

pub(super) fn to_u64(value: &SqlValue, max: u64) -> Option<u64> {
    let v = match value {
        SqlValue::UInt(u) => Some(*u),
        SqlValue::Int(i) => u64::try_from(*i).ok(),
        SqlValue::Bool(b) => Some(u64::from(*b)),
        SqlValue::Float(f) if f.fract() == 0.0 => f.to_u64(),
        SqlValue::Decimal(d) if d.fract().is_zero() => d.to_u64(),
        SqlValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    (v <= max).then_some(v)
}

pub(super) fn to_f64(value: &SqlValue) -> Option<f64> {
    match value {
        SqlValue::Float(f) => Some(*f),
        SqlValue::Int(i) => Some(*i as f64),
        SqlValue::UInt(u) => Some(*u as f64),
        SqlValue::Decimal(d) => d.to_f64(),
        SqlValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_decimal(value: &SqlValue) -> Option<Decimal> {
    match value {
        SqlValue::Decimal(d) => Some(*d),
        SqlValue::Int(i) => Some(Decimal::from(*i)),
        SqlValue::UInt(u) => Some(Decimal::from(*u)),
        SqlValue::Float(f) => Decimal::from_f64(*f),
        SqlValue::Text(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

pub(super) fn to_bytes(value: &SqlValue) -> Option<Vec<u8>> {
    match value {
        SqlValue::Bytes(b) => Some(b.clone()),
        SqlValue::Text(s) => Some(s.clone().into_bytes()),
        _ => None,
    }
}

fn to_date(value: &SqlValue) -> Option<NaiveDate> {
    match value {
        SqlValue::Date(d) => Some(*d),
        SqlValue::Timestamp(ts) => Some(ts.date()),
        SqlValue::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
        _ => None,
    }
}

fn to_time(value: &SqlValue) -> Option<NaiveTime> {
    match value {
        SqlValue::Time(t) => Some(*t),
        SqlValue::Timestamp(ts) => Some(ts.time()),
        SqlValue::Text(s) => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f").ok(),
        _ => None,
    }
}

fn to_timestamp(value: &SqlValue) -> Option<NaiveDateTime> {
    match value {
        SqlValue::Timestamp(ts) => Some(*ts),
        SqlValue::Date(d) => d.and_hms_opt(0, 0, 0),
        SqlValue::Text(s) => {
            let s = s.trim();
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
                .ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Account {
        id: i64,
        #[serde(rename = "userName")]
        user_name: String,
        balance: f64,
        active: bool,
    }

    impl Record for Account {
        const TYPE_NAME: &'static str = "Account";
        const FIELDS: &'static [&'static str] = &["id", "userName", "balance", "active"];
    }

    fn shape_as<T: FromRow>(row: Row) -> Result<T, DaoError> {
        T::from_shaped(ResultShaper::shape_row(&T::shape(), row)?)
    }

    #[test]
    fn test_map_shape_keeps_columns_in_order() {
        let row = Row::new().with("id", 7).with("name", "x");

        let shaped = ResultShaper::shape_row(&Shape::default(), row.clone()).unwrap();
        let Shaped::Map(map) = shaped else {
            panic!("expected map");
        };

        assert_eq!(map, row);
        assert_eq!(map.len(), 2);
        assert_eq!(map.column_names().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(map.get("id"), Some(&SqlValue::Int(7)));
        assert_eq!(map.get("name"), Some(&SqlValue::Text("x".to_string())));
    }

    #[test]
    fn test_single_column_integer_scalar() {
        let count: i64 = shape_as(Row::new().with("count", 5)).unwrap();
        assert_eq!(count, 5);

        let count: u32 = shape_as(Row::new().with("count", Decimal::new(5, 0))).unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_scalar_on_multi_column_row_fails() {
        let row = Row::new().with("id", 1).with("name", "x");

        let err = shape_as::<String>(row).unwrap_err();
        assert!(matches!(err, DaoError::ShapeMismatch(_)));
    }

    #[test]
    fn test_scalar_conversion_failure() {
        let err = shape_as::<i32>(Row::new().with("name", "abc")).unwrap_err();
        assert!(matches!(err, DaoError::ShapeMismatch(_)));

        let err = shape_as::<i8>(Row::new().with("n", 300)).unwrap_err();
        assert!(matches!(err, DaoError::ShapeMismatch(_)));
    }

    #[test]
    fn test_null_scalar_into_non_nullable_type_fails() {
        let shaped = ResultShaper::shape_row(
            &Shape::Scalar(ScalarType::I64),
            Row::new().with("max", SqlValue::Null),
        )
        .unwrap();
        assert_eq!(shaped, Shaped::Scalar(SqlValue::Null));
        assert!(i64::from_shaped(shaped).is_err());
    }

    #[test]
    fn test_text_scalar_from_other_values() {
        let text: String = shape_as(Row::new().with("v", 42)).unwrap();
        assert_eq!(text, "42");

        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let text: String = shape_as(Row::new().with("v", date)).unwrap();
        assert_eq!(text, "2024-03-01");
    }

    #[test]
    fn test_bool_and_temporal_scalars() {
        let flag: bool = shape_as(Row::new().with("v", 1)).unwrap();
        assert!(flag);

        let ts: NaiveDateTime = shape_as(Row::new().with("v", "2024-03-01 10:20:30")).unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        let date: NaiveDate = shape_as(Row::new().with("v", ts)).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_record_matches_columns_by_normalized_name() {
        let row = Row::new()
            .with("ID", 3)
            .with("user_name", "kim")
            .with("BALANCE", Decimal::new(1050, 2))
            .with("active", true)
            .with("unrelated", "ignored");

        let account: Account = shape_as(row).unwrap();
        assert_eq!(
            account,
            Account {
                id: 3,
                user_name: "kim".to_string(),
                balance: 10.5,
                active: true,
            }
        );
    }

    #[test]
    fn test_record_missing_columns_keep_defaults() {
        let account: Account = shape_as(Row::new().with("id", 9)).unwrap();
        assert_eq!(account.id, 9);
        assert_eq!(account.user_name, "");
        assert!(!account.active);
    }

    #[test]
    fn test_record_type_mismatch() {
        let err = shape_as::<Account>(Row::new().with("id", "not a number")).unwrap_err();
        assert!(matches!(err, DaoError::ShapeMismatch(_)));
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Price {
        amount: Decimal,
    }

    impl Record for Price {
        const TYPE_NAME: &'static str = "Price";
        const FIELDS: &'static [&'static str] = &["amount"];
    }

    #[test]
    fn test_record_decimal_field_keeps_precision() {
        let amount = Decimal::from_str("1234567890123.456789").unwrap();

        let price: Price = shape_as(Row::new().with("AMOUNT", amount)).unwrap();
        assert_eq!(price.amount, amount);
        assert_eq!(price.amount.to_string(), "1234567890123.456789");
    }

    #[test]
    fn test_f32_scalar_out_of_range() {
        let err = shape_as::<f32>(Row::new().with("v", 1e300f64)).unwrap_err();
        assert!(matches!(err, DaoError::ShapeMismatch(_)));

        let err = f32::from_shaped(Shaped::Scalar(SqlValue::Float(-1e300))).unwrap_err();
        assert!(matches!(err, DaoError::ShapeMismatch(_)));

        let v: f32 = shape_as(Row::new().with("v", 2.5f64)).unwrap();
        assert_eq!(v, 2.5);

        let v: f64 = shape_as(Row::new().with("v", 1e300f64)).unwrap();
        assert_eq!(v, 1e300);
    }

    #[test]
    fn test_map_into_record_uses_normalized_names() {
        let row = Row::new().with("USER_NAME", "lee").with("Id", 4);

        let account = Account::from_shaped(Shaped::Map(row)).unwrap();
        assert_eq!(account.id, 4);
        assert_eq!(account.user_name, "lee");
    }

    #[test]
    fn test_shape_describe() {
        assert_eq!(Shape::Scalar(ScalarType::I64).describe(), "scalar i64");
        assert_eq!(Shape::Map.describe(), "map");
        assert_eq!(Account::shape().describe(), "record Account");
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("user_name"), "username");
        assert_eq!(normalize_name("userName"), "username");
        assert_eq!(normalize_name("USER_NAME"), "username");
    }
}
