//! 레코드 역직렬화 모듈
//!
//! 매칭된 컬럼 값을 JSON을 거치지 않고 `SqlValue`에서 바로 레코드 필드로 옮깁니다.
//! DECIMAL 값은 문자열 표현으로 전달되어 자릿수가 그대로 유지됩니다.

use crate::service::db::core::shape::{to_bool, to_bytes, to_f64, to_i64, to_text, to_u64};
use crate::service::db::core::types::{Row, SqlValue};
use serde::de::value::{Error, MapDeserializer, StringDeserializer};
use serde::de::{self, DeserializeOwned, Deserializer, IntoDeserializer, Unexpected, Visitor};
use serde::forward_to_deserialize_any;

/// Builds `T` from `(field name, value)` pairs.
pub(crate) fn from_fields<T: DeserializeOwned>(fields: Row) -> Result<T, Error> {
    T::deserialize(MapDeserializer::new(fields.into_iter()))
}

/// Deserializer over a single cell. Type hints from the target field drive
/// the same conversions scalar shaping uses.
pub struct SqlValueDeserializer(SqlValue);

impl<'de> IntoDeserializer<'de, Error> for SqlValue {
    type Deserializer = SqlValueDeserializer;

    fn into_deserializer(self) -> SqlValueDeserializer {
        SqlValueDeserializer(self)
    }
}

macro_rules! deserialize_signed {
    ($($method:ident => $ty:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                match to_i64(&self.0, <$ty>::MIN.into(), <$ty>::MAX.into()) {
                    Some(v) => visitor.visit_i64(v),
                    None => self.deserialize_any(visitor),
                }
            }
        )*
    };
}

macro_rules! deserialize_unsigned {
    ($($method:ident => $ty:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                match to_u64(&self.0, <$ty>::MAX.into()) {
                    Some(v) => visitor.visit_u64(v),
                    None => self.deserialize_any(visitor),
                }
            }
        )*
    };
}

impl<'de> Deserializer<'de> for SqlValueDeserializer {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.0 {
            SqlValue::Null => visitor.visit_unit(),
            SqlValue::Bool(b) => visitor.visit_bool(b),
            SqlValue::Int(i) => visitor.visit_i64(i),
            SqlValue::UInt(u) => visitor.visit_u64(u),
            SqlValue::Float(f) => visitor.visit_f64(f),
            SqlValue::Decimal(d) => visitor.visit_string(d.to_string()),
            SqlValue::Text(s) => visitor.visit_string(s),
            SqlValue::Bytes(b) => visitor.visit_byte_buf(b),
            SqlValue::Date(d) => visitor.visit_string(d.format("%Y-%m-%d").to_string()),
            SqlValue::Time(t) => visitor.visit_string(t.format("%H:%M:%S%.f").to_string()),
            SqlValue::Timestamp(ts) => {
                visitor.visit_string(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.0 {
            SqlValue::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match to_bool(&self.0) {
            Some(b) => visitor.visit_bool(b),
            None => self.deserialize_any(visitor),
        }
    }

    deserialize_signed! {
        deserialize_i8 => i8,
        deserialize_i16 => i16,
        deserialize_i32 => i32,
        deserialize_i64 => i64,
    }

    deserialize_unsigned! {
        deserialize_u8 => u8,
        deserialize_u16 => u16,
        deserialize_u32 => u32,
        deserialize_u64 => u64,
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match to_f64(&self.0) {
            Some(v) if fits_f32(v) => visitor.visit_f64(v),
            Some(v) => Err(de::Error::invalid_value(
                Unexpected::Float(v),
                &"a value within f32 range",
            )),
            None => self.deserialize_any(visitor),
        }
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match to_f64(&self.0) {
            Some(v) => visitor.visit_f64(v),
            None => self.deserialize_any(visitor),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match to_text(&self.0) {
            Some(s) => visitor.visit_string(s),
            None => self.deserialize_any(visitor),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match to_bytes(&self.0) {
            Some(b) => visitor.visit_byte_buf(b),
            None => self.deserialize_any(visitor),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    // 텍스트 컬럼은 유닛 variant 이름으로 매칭
    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.0 {
            SqlValue::Text(s) => {
                let variant: StringDeserializer<Error> = s.into_deserializer();
                visitor.visit_enum(variant)
            }
            other => SqlValueDeserializer(other).deserialize_any(visitor),
        }
    }

    forward_to_deserialize_any! {
        char unit unit_struct seq tuple tuple_struct map struct identifier ignored_any
    }
}

/// NaN and infinities pass through; finite values must fit in `f32`.
pub(crate) fn fits_f32(v: f64) -> bool {
    !v.is_finite() || v.abs() <= f64::from(f32::MAX)
}
