//! # Per-Tag Payload Codec
//!
//! One table, keyed by [`TypeTag`], holding the payload layout and the write
//! and read function for each catalogued type. Scalars and their array
//! counterparts are generated from the same macro arm so they cannot drift.
//!
//! ## Payload Rules
//!
//! ```text
//! fixed scalar       raw LE bytes, zero-padded to one 8-byte slot
//! numeric array      u64 byte length | packed LE elements | pad to 8
//! UTF-8 string       u64 byte length | UTF-8 bytes        | pad to 8
//! big integer        u64 byte length | minimal LE two's complement | pad to 8
//! timestamp (epoch)  i64 seconds or milliseconds since 1970-01-01T00:00:00Z
//! timestamp (text)   string payload of the ISO-8601 form
//! absent             SPECIAL_TAG | declared tag        (no payload)
//! ```
//!
//! Every payload starts and ends on an 8-byte boundary relative to the start of
//! the document.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike, Utc};
use half::f16;
use num_bigint::BigInt;
use tracing::trace;

use crate::error::{AudalfError, AudalfResult};
use crate::protocol_constants::{align_up, padding_for, SLOT_SIZE, SPECIAL_TAG};
use crate::settings::{DeserializationSettings, SerializationSettings, TimestampShape};
use crate::tag::TypeTag;
use crate::value::Value;

/// How a tag's payload occupies bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLayout {
    /// One 8-byte slot holding `width` meaningful bytes
    Fixed { width: usize },
    /// Length prefix, then elements of `element_width` bytes, then padding
    LengthPrefixed { element_width: usize },
}

type WriteFn = fn(&Value, &mut Vec<u8>) -> AudalfResult<()>;
type ReadFn = fn(&mut ByteCursor<'_>, TypeTag, &DeserializationSettings) -> AudalfResult<Value>;

pub(crate) struct Codec {
    pub tag: TypeTag,
    pub layout: PayloadLayout,
    pub write: WriteFn,
    pub read: ReadFn,
}

/// Bounds-checked little-endian reader over a whole document
///
/// Positions are absolute, so errors report document offsets.
pub(crate) struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn at(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, len: usize, context: &str) -> AudalfResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                AudalfError::truncated(self.pos.saturating_add(len), self.bytes.len(), context)
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn read_slot(&mut self, context: &str) -> AudalfResult<[u8; SLOT_SIZE]> {
        let mut slot = [0u8; SLOT_SIZE];
        slot.copy_from_slice(self.take(SLOT_SIZE, context)?);
        Ok(slot)
    }

    pub fn read_u64(&mut self, context: &str) -> AudalfResult<u64> {
        self.read_slot(context).map(u64::from_le_bytes)
    }

    /// Read a length prefix and its payload, consuming the trailing padding
    fn read_length_prefixed(&mut self, tag: TypeTag) -> AudalfResult<(&'a [u8], usize)> {
        let prefix_at = self.pos;
        let declared = self.read_u64("payload length prefix")?;
        let len = usize::try_from(declared).map_err(|_| {
            AudalfError::out_of_range(declared, 0, usize::MAX as u64, "payload length prefix")
        })?;
        let start = self.pos;
        let payload = self.take(len, tag.name())?;
        self.take(padding_for(len), "payload padding")?;
        trace!(tag = tag.name(), prefix_at, len, "read length-prefixed payload");
        Ok((payload, start))
    }

    fn read_text(&mut self, tag: TypeTag) -> AudalfResult<(&'a str, usize)> {
        let (bytes, start) = self.read_length_prefixed(tag)?;
        let text = std::str::from_utf8(bytes).map_err(|e| {
            AudalfError::invalid_payload(tag.raw(), start, format!("invalid UTF-8: {e}"))
        })?;
        Ok((text, start))
    }
}

fn pad_to_slot(out: &mut Vec<u8>) {
    out.resize(align_up(out.len()), 0);
}

fn write_fixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(bytes);
    pad_to_slot(out);
}

fn write_length_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    out.extend_from_slice(bytes);
    pad_to_slot(out);
}

fn encode_mismatch(tag: TypeTag, value: &Value) -> AudalfError {
    AudalfError::type_mismatch(tag.name(), value.describe(), "encoding value payload")
}

macro_rules! numeric_codecs {
    ($ty:ty => $scalar:ident, $array:ident) => {
        [
            Codec {
                tag: TypeTag::$scalar,
                layout: PayloadLayout::Fixed {
                    width: std::mem::size_of::<$ty>(),
                },
                write: |value, out| match value {
                    Value::$scalar(v) => {
                        write_fixed(out, &v.to_le_bytes());
                        Ok(())
                    }
                    other => Err(encode_mismatch(TypeTag::$scalar, other)),
                },
                read: |cursor, _, _| {
                    let slot = cursor.read_slot(TypeTag::$scalar.name())?;
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&slot[..std::mem::size_of::<$ty>()]);
                    Ok(Value::$scalar(<$ty>::from_le_bytes(raw)))
                },
            },
            Codec {
                tag: TypeTag::$array,
                layout: PayloadLayout::LengthPrefixed {
                    element_width: std::mem::size_of::<$ty>(),
                },
                write: |value, out| match value {
                    Value::$array(items) => {
                        let bytes: Vec<u8> = items.iter().flat_map(|v| v.to_le_bytes()).collect();
                        write_length_prefixed(out, &bytes);
                        Ok(())
                    }
                    other => Err(encode_mismatch(TypeTag::$array, other)),
                },
                read: |cursor, tag, _| {
                    const WIDTH: usize = std::mem::size_of::<$ty>();
                    let (bytes, start) = cursor.read_length_prefixed(tag)?;
                    if bytes.len() % WIDTH != 0 {
                        return Err(AudalfError::invalid_payload(
                            tag.raw(),
                            start,
                            format!(
                                "array byte length {} is not a multiple of element width {}",
                                bytes.len(),
                                WIDTH
                            ),
                        ));
                    }
                    let items = bytes
                        .chunks_exact(WIDTH)
                        .map(|chunk| {
                            let mut raw = [0u8; WIDTH];
                            raw.copy_from_slice(chunk);
                            <$ty>::from_le_bytes(raw)
                        })
                        .collect();
                    Ok(Value::$array(items))
                },
            },
        ]
    };
}

static NUMERIC_CODECS: [[Codec; 2]; 11] = [
    numeric_codecs!(u8 => U8, U8Array),
    numeric_codecs!(u16 => U16, U16Array),
    numeric_codecs!(u32 => U32, U32Array),
    numeric_codecs!(u64 => U64, U64Array),
    numeric_codecs!(i8 => I8, I8Array),
    numeric_codecs!(i16 => I16, I16Array),
    numeric_codecs!(i32 => I32, I32Array),
    numeric_codecs!(i64 => I64, I64Array),
    numeric_codecs!(f16 => F16, F16Array),
    numeric_codecs!(f32 => F32, F32Array),
    numeric_codecs!(f64 => F64, F64Array),
];

static OTHER_CODECS: [Codec; 6] = [
    Codec {
        tag: TypeTag::StringUtf8,
        layout: PayloadLayout::LengthPrefixed { element_width: 1 },
        write: |value, out| match value {
            Value::String(text) => {
                write_length_prefixed(out, text.as_bytes());
                Ok(())
            }
            other => Err(encode_mismatch(TypeTag::StringUtf8, other)),
        },
        read: |cursor, tag, _| {
            let (text, _) = cursor.read_text(tag)?;
            Ok(Value::String(text.to_owned()))
        },
    },
    Codec {
        tag: TypeTag::Boolean,
        layout: PayloadLayout::Fixed { width: 1 },
        write: |value, out| match value {
            Value::Bool(flag) => {
                write_fixed(out, &[u8::from(*flag)]);
                Ok(())
            }
            other => Err(encode_mismatch(TypeTag::Boolean, other)),
        },
        read: |cursor, tag, _| {
            let slot = cursor.read_slot(tag.name())?;
            Ok(Value::Bool(slot[0] != 0))
        },
    },
    Codec {
        tag: TypeTag::TimestampUnixSeconds,
        layout: PayloadLayout::Fixed { width: 8 },
        write: |value, out| {
            let instant = instant_of(TypeTag::TimestampUnixSeconds, value)?;
            write_fixed(out, &instant.timestamp().to_le_bytes());
            Ok(())
        },
        read: |cursor, tag, settings| {
            let offset = cursor.position();
            let seconds = i64::from_le_bytes(cursor.read_slot(tag.name())?);
            let instant = DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
                AudalfError::invalid_payload(
                    tag.raw(),
                    offset,
                    format!("{seconds} seconds is outside the representable calendar range"),
                )
            })?;
            Ok(shape_instant(instant.fixed_offset(), settings))
        },
    },
    Codec {
        tag: TypeTag::TimestampUnixMilliseconds,
        layout: PayloadLayout::Fixed { width: 8 },
        write: |value, out| {
            let instant = instant_of(TypeTag::TimestampUnixMilliseconds, value)?;
            write_fixed(out, &instant.timestamp_millis().to_le_bytes());
            Ok(())
        },
        read: |cursor, tag, settings| {
            let offset = cursor.position();
            let millis = i64::from_le_bytes(cursor.read_slot(tag.name())?);
            let instant = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                AudalfError::invalid_payload(
                    tag.raw(),
                    offset,
                    format!("{millis} milliseconds is outside the representable calendar range"),
                )
            })?;
            Ok(shape_instant(instant.fixed_offset(), settings))
        },
    },
    Codec {
        tag: TypeTag::TimestampIso8601,
        layout: PayloadLayout::LengthPrefixed { element_width: 1 },
        write: |value, out| {
            let text = match value {
                Value::DateTime(naive) => iso8601_naive(naive),
                Value::DateTimeOffset(aware) => iso8601_aware(aware),
                other => return Err(encode_mismatch(TypeTag::TimestampIso8601, other)),
            };
            write_length_prefixed(out, text.as_bytes());
            Ok(())
        },
        read: |cursor, tag, settings| {
            let (text, start) = cursor.read_text(tag)?;
            if let Ok(aware) = DateTime::parse_from_rfc3339(text) {
                return Ok(shape_instant(aware, settings));
            }
            let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").map_err(|e| {
                AudalfError::invalid_payload(
                    tag.raw(),
                    start,
                    format!("{text:?} is not an ISO-8601 timestamp: {e}"),
                )
            })?;
            Ok(match settings.timestamp_shape {
                TimestampShape::Naive => Value::DateTime(naive),
                TimestampShape::OffsetAware => Value::DateTimeOffset(naive.and_utc().fixed_offset()),
            })
        },
    },
    Codec {
        tag: TypeTag::BigInteger,
        layout: PayloadLayout::LengthPrefixed { element_width: 1 },
        write: |value, out| match value {
            Value::BigInteger(big) => {
                write_length_prefixed(out, &big.to_signed_bytes_le());
                Ok(())
            }
            other => Err(encode_mismatch(TypeTag::BigInteger, other)),
        },
        read: |cursor, tag, _| {
            let (bytes, _) = cursor.read_length_prefixed(tag)?;
            Ok(Value::BigInteger(BigInt::from_signed_bytes_le(bytes)))
        },
    },
];

fn instant_of(tag: TypeTag, value: &Value) -> AudalfResult<DateTime<Utc>> {
    match value {
        Value::DateTime(naive) => Ok(naive.and_utc()),
        Value::DateTimeOffset(aware) => Ok(aware.with_timezone(&Utc)),
        other => Err(encode_mismatch(tag, other)),
    }
}

fn shape_instant(aware: DateTime<FixedOffset>, settings: &DeserializationSettings) -> Value {
    match settings.timestamp_shape {
        TimestampShape::Naive => Value::DateTime(aware.naive_utc()),
        TimestampShape::OffsetAware => Value::DateTimeOffset(aware),
    }
}

/// Seven fractional digits, i.e. 100ns ticks
fn fraction_ticks(nanos: u32) -> u32 {
    (nanos % 1_000_000_000) / 100
}

fn iso8601_naive(naive: &NaiveDateTime) -> String {
    format!(
        "{}.{:07}",
        naive.format("%Y-%m-%dT%H:%M:%S"),
        fraction_ticks(naive.nanosecond())
    )
}

/// `%:z` has minute resolution, so offsets with a seconds part are written
/// as the same instant in UTC
fn iso8601_aware(aware: &DateTime<FixedOffset>) -> String {
    if aware.offset().local_minus_utc() % 60 != 0 {
        return iso8601_aware(&aware.with_timezone(&Utc).fixed_offset());
    }
    format!(
        "{}.{:07}{}",
        aware.format("%Y-%m-%dT%H:%M:%S"),
        fraction_ticks(aware.nanosecond()),
        aware.format("%:z")
    )
}

/// Look up the codec for a catalogued tag
pub(crate) fn codec_for(tag: TypeTag) -> AudalfResult<&'static Codec> {
    NUMERIC_CODECS
        .iter()
        .flatten()
        .chain(OTHER_CODECS.iter())
        .find(|codec| codec.tag == tag)
        .ok_or_else(|| AudalfError::unknown_tag(tag.raw(), 0))
}

/// Payload layout of a catalogued tag
pub fn layout_of(tag: TypeTag) -> AudalfResult<PayloadLayout> {
    codec_for(tag).map(|codec| codec.layout)
}

/// Write `SPECIAL_TAG` followed by the declared tag
pub(crate) fn write_absent(out: &mut Vec<u8>, declared: TypeTag) {
    out.extend_from_slice(&SPECIAL_TAG.to_le_bytes());
    out.extend_from_slice(&declared.to_le_bytes());
}

/// Write a value preceded by its tag; returns the tag written
pub(crate) fn write_tagged(
    out: &mut Vec<u8>,
    value: &Value,
    settings: &SerializationSettings,
) -> AudalfResult<TypeTag> {
    if let Value::Absent(declared) = value {
        write_absent(out, *declared);
        return Ok(*declared);
    }
    let tag = value.kind().tag(settings.timestamp_format);
    out.extend_from_slice(&tag.to_le_bytes());
    write_bare(out, tag, value)?;
    Ok(tag)
}

/// Write only the payload; used for map keys whose tag lives in the header
pub(crate) fn write_bare(out: &mut Vec<u8>, tag: TypeTag, value: &Value) -> AudalfResult<()> {
    (codec_for(tag)?.write)(value, out)
}

/// Read a tag and the value that follows it
pub(crate) fn read_tagged(
    cursor: &mut ByteCursor<'_>,
    settings: &DeserializationSettings,
) -> AudalfResult<Value> {
    let tag_at = cursor.position();
    let raw = cursor.read_u64("value type tag")?;
    if raw == SPECIAL_TAG {
        let declared_at = cursor.position();
        let declared = cursor.read_u64("declared tag of absent value")?;
        return Ok(Value::Absent(TypeTag::from_raw(declared, declared_at)?));
    }
    let tag = TypeTag::from_raw(raw, tag_at)?;
    read_bare(cursor, tag, settings)
}

/// Read a payload whose tag is already known
pub(crate) fn read_bare(
    cursor: &mut ByteCursor<'_>,
    tag: TypeTag,
    settings: &DeserializationSettings,
) -> AudalfResult<Value> {
    (codec_for(tag)?.read)(cursor, tag, settings)
}
