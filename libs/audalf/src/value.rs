//! # Value Model
//!
//! [`Value`] is the closed set of things an AUDALF document can hold. Decoding
//! always produces a `Value` first; typed decoding then converts it through
//! [`FromValue`]. Encoding accepts anything implementing [`IntoSlot`], which is
//! a `Value` or a null whose declared type may or may not be known yet.
//!
//! Absent values are a variant of their own, `Value::Absent(tag)`, carrying the
//! tag the value would have had.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use half::f16;
use num_bigint::BigInt;

use crate::error::{AudalfError, AudalfResult};
use crate::settings::TimestampShape;
use crate::tag::{TypeTag, ValueKind};

/// A decoded or to-be-encoded AUDALF value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F16(f16),
    F32(f32),
    F64(f64),
    String(String),
    Bool(bool),
    /// Offset-naive timestamp, read as UTC wall-clock time
    DateTime(NaiveDateTime),
    /// Offset-aware timestamp
    DateTimeOffset(DateTime<FixedOffset>),
    BigInteger(BigInt),
    U8Array(Vec<u8>),
    U16Array(Vec<u16>),
    U32Array(Vec<u32>),
    U64Array(Vec<u64>),
    I8Array(Vec<i8>),
    I16Array(Vec<i16>),
    I32Array(Vec<i32>),
    I64Array(Vec<i64>),
    F16Array(Vec<f16>),
    F32Array(Vec<f32>),
    F64Array(Vec<f64>),
    /// Null with its declared type
    Absent(TypeTag),
}

impl Value {
    /// Logical kind; an absent value reports its declared kind
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::U8(_) => ValueKind::U8,
            Value::U16(_) => ValueKind::U16,
            Value::U32(_) => ValueKind::U32,
            Value::U64(_) => ValueKind::U64,
            Value::I8(_) => ValueKind::I8,
            Value::I16(_) => ValueKind::I16,
            Value::I32(_) => ValueKind::I32,
            Value::I64(_) => ValueKind::I64,
            Value::F16(_) => ValueKind::F16,
            Value::F32(_) => ValueKind::F32,
            Value::F64(_) => ValueKind::F64,
            Value::String(_) => ValueKind::String,
            Value::Bool(_) => ValueKind::Bool,
            Value::DateTime(_) | Value::DateTimeOffset(_) => ValueKind::Timestamp,
            Value::BigInteger(_) => ValueKind::BigInteger,
            Value::U8Array(_) => ValueKind::U8Array,
            Value::U16Array(_) => ValueKind::U16Array,
            Value::U32Array(_) => ValueKind::U32Array,
            Value::U64Array(_) => ValueKind::U64Array,
            Value::I8Array(_) => ValueKind::I8Array,
            Value::I16Array(_) => ValueKind::I16Array,
            Value::I32Array(_) => ValueKind::I32Array,
            Value::I64Array(_) => ValueKind::I64Array,
            Value::F16Array(_) => ValueKind::F16Array,
            Value::F32Array(_) => ValueKind::F32Array,
            Value::F64Array(_) => ValueKind::F64Array,
            Value::Absent(tag) => tag.kind(),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent(_))
    }

    /// Short description used in mismatch errors
    pub fn describe(&self) -> String {
        match self {
            Value::Absent(tag) => format!("absent {}", tag.name()),
            other => other.kind().name().to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{item}")?;
            }
            write!(f, "]")
        }

        match self {
            Value::U8(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F16(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v:?}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "{v}"),
            Value::DateTimeOffset(v) => write!(f, "{}", v.to_rfc3339()),
            Value::BigInteger(v) => write!(f, "{v}"),
            Value::U8Array(v) => list(f, v),
            Value::U16Array(v) => list(f, v),
            Value::U32Array(v) => list(f, v),
            Value::U64Array(v) => list(f, v),
            Value::I8Array(v) => list(f, v),
            Value::I16Array(v) => list(f, v),
            Value::I32Array(v) => list(f, v),
            Value::I64Array(v) => list(f, v),
            Value::F16Array(v) => list(f, v),
            Value::F32Array(v) => list(f, v),
            Value::F64Array(v) => list(f, v),
            Value::Absent(tag) => write!(f, "null ({})", tag.name()),
        }
    }
}

/// Encoder input: a value, or a null with or without a declared kind
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Value(Value),
    /// `None` means the caller gave no type; it must come from an explicit type map
    Null(Option<ValueKind>),
}

/// Conversion into encoder input
pub trait IntoSlot {
    fn into_slot(self) -> Slot;
}

/// Conversion out of a decoded value
pub trait FromValue: Sized {
    fn from_value(value: Value) -> AudalfResult<Self>;

    /// Timestamp shape this type needs decoded, when it decides one
    ///
    /// Overrides [`DeserializationSettings::timestamp_shape`](crate::settings::DeserializationSettings)
    /// so that requesting an offset-aware type never loses the stored offset.
    fn timestamp_shape() -> Option<TimestampShape> {
        None
    }
}

fn mismatch(expected: &str, found: &Value) -> AudalfError {
    AudalfError::type_mismatch(expected, found.describe(), "decoded value conversion")
}

macro_rules! impl_value_conversions {
    ($($ty:ty => $variant:ident;)*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }

            impl IntoSlot for $ty {
                fn into_slot(self) -> Slot {
                    Slot::Value(Value::$variant(self))
                }
            }

            impl IntoSlot for Option<$ty> {
                fn into_slot(self) -> Slot {
                    match self {
                        Some(value) => Slot::Value(Value::$variant(value)),
                        None => Slot::Null(Some(ValueKind::$variant)),
                    }
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value) -> AudalfResult<Self> {
                    match value {
                        Value::$variant(inner) => Ok(inner),
                        other => Err(mismatch(ValueKind::$variant.name(), &other)),
                    }
                }
            }
        )*
    };
}

impl_value_conversions! {
    u8 => U8;
    u16 => U16;
    u32 => U32;
    u64 => U64;
    i8 => I8;
    i16 => I16;
    i32 => I32;
    i64 => I64;
    f16 => F16;
    f32 => F32;
    f64 => F64;
    String => String;
    bool => Bool;
    BigInt => BigInteger;
    Vec<u8> => U8Array;
    Vec<u16> => U16Array;
    Vec<u32> => U32Array;
    Vec<u64> => U64Array;
    Vec<i8> => I8Array;
    Vec<i16> => I16Array;
    Vec<i32> => I32Array;
    Vec<i64> => I64Array;
    Vec<f16> => F16Array;
    Vec<f32> => F32Array;
    Vec<f64> => F64Array;
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl IntoSlot for &str {
    fn into_slot(self) -> Slot {
        Slot::Value(self.into())
    }
}

impl IntoSlot for Option<&str> {
    fn into_slot(self) -> Slot {
        match self {
            Some(value) => value.into_slot(),
            None => Slot::Null(Some(ValueKind::String)),
        }
    }
}

// Timestamps: every chrono shape maps to the one logical kind

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Value::DateTimeOffset(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTimeOffset(value.fixed_offset())
    }
}

macro_rules! impl_timestamp_slots {
    ($($ty:ty),*) => {
        $(
            impl IntoSlot for $ty {
                fn into_slot(self) -> Slot {
                    Slot::Value(self.into())
                }
            }

            impl IntoSlot for Option<$ty> {
                fn into_slot(self) -> Slot {
                    match self {
                        Some(value) => value.into_slot(),
                        None => Slot::Null(Some(ValueKind::Timestamp)),
                    }
                }
            }
        )*
    };
}

impl_timestamp_slots!(NaiveDateTime, DateTime<FixedOffset>, DateTime<Utc>);

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> AudalfResult<Self> {
        match value {
            Value::DateTime(naive) => Ok(naive),
            Value::DateTimeOffset(aware) => Ok(aware.naive_utc()),
            other => Err(mismatch("timestamp", &other)),
        }
    }

    fn timestamp_shape() -> Option<TimestampShape> {
        Some(TimestampShape::Naive)
    }
}

impl FromValue for DateTime<FixedOffset> {
    fn from_value(value: Value) -> AudalfResult<Self> {
        match value {
            Value::DateTimeOffset(aware) => Ok(aware),
            Value::DateTime(naive) => Ok(naive.and_utc().fixed_offset()),
            other => Err(mismatch("timestamp", &other)),
        }
    }

    fn timestamp_shape() -> Option<TimestampShape> {
        Some(TimestampShape::OffsetAware)
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> AudalfResult<Self> {
        match value {
            Value::DateTimeOffset(aware) => Ok(aware.with_timezone(&Utc)),
            Value::DateTime(naive) => Ok(naive.and_utc()),
            other => Err(mismatch("timestamp", &other)),
        }
    }

    fn timestamp_shape() -> Option<TimestampShape> {
        Some(TimestampShape::OffsetAware)
    }
}

impl IntoSlot for Value {
    fn into_slot(self) -> Slot {
        Slot::Value(self)
    }
}

/// `None` is an untyped null
impl IntoSlot for Option<Value> {
    fn into_slot(self) -> Slot {
        match self {
            Some(value) => Slot::Value(value),
            None => Slot::Null(None),
        }
    }
}

impl IntoSlot for Slot {
    fn into_slot(self) -> Slot {
        self
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> AudalfResult<Self> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> AudalfResult<Self> {
        match value {
            Value::Absent(_) => Ok(None),
            present => T::from_value(present).map(Some),
        }
    }

    fn timestamp_shape() -> Option<TimestampShape> {
        T::timestamp_shape()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn test_option_slots_carry_declared_kind() {
        assert_eq!(None::<i32>.into_slot(), Slot::Null(Some(ValueKind::I32)));
        assert_eq!(None::<&str>.into_slot(), Slot::Null(Some(ValueKind::String)));
        assert_eq!(None::<Value>.into_slot(), Slot::Null(None));
        assert_eq!(Some(7u16).into_slot(), Slot::Value(Value::U16(7)));
    }

    #[test]
    fn test_absent_converts_to_none_but_not_to_bare_type() {
        let absent = Value::Absent(TypeTag::StringUtf8);
        assert_eq!(Option::<String>::from_value(absent.clone()).unwrap(), None);
        assert!(matches!(
            String::from_value(absent),
            Err(AudalfError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_strict_numeric_conversion() {
        assert_eq!(u8::from_value(Value::U8(255)).unwrap(), 255);
        let err = u16::from_value(Value::U8(1)).unwrap_err();
        assert!(err.to_string().contains("expected u16"));
    }

    #[test]
    fn test_timestamp_shapes_convert_both_ways() {
        let naive = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let aware = plus_two.from_local_datetime(&naive).unwrap();

        let as_naive = NaiveDateTime::from_value(Value::DateTimeOffset(aware)).unwrap();
        assert_eq!(as_naive, aware.naive_utc());

        let as_aware = DateTime::<FixedOffset>::from_value(Value::DateTime(naive)).unwrap();
        assert_eq!(as_aware.naive_utc(), naive);
        assert_eq!(as_aware.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("hi").to_string(), "\"hi\"");
        assert_eq!(Value::I16Array(vec![-1, 2]).to_string(), "[-1, 2]");
        assert_eq!(Value::Absent(TypeTag::I32).to_string(), "null (i32)");
        assert_eq!(Value::BigInteger(BigInt::from(-42)).to_string(), "-42");
    }

    #[test]
    fn test_kind_of_absent_is_declared_kind() {
        assert_eq!(
            Value::Absent(TypeTag::TimestampUnixSeconds).kind(),
            ValueKind::Timestamp
        );
        assert!(Value::Absent(TypeTag::U8).is_absent());
    }
}
