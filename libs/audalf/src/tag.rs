//! # Type Tag Registry
//!
//! ## Purpose
//!
//! Closed catalogue of the value types an AUDALF document can carry, and the
//! 8-byte tags that identify them on the wire. Every value slot, and the
//! header's key-type field, holds one of these tags (or the special all-zero
//! tag, see [`SPECIAL_TAG`](crate::protocol_constants::SPECIAL_TAG)).
//!
//! ## Tag Layout
//!
//! A tag is a little-endian `u64` whose bytes carry four fields:
//!
//! ```text
//! byte 0   width class   1=8 2=16 3=32 4=64 5..10=128..4096 bits
//! byte 1   reserved      always 0
//! byte 2   is_array      0 scalar, 1 homogeneous array
//! byte 3   category      0 uint 1 int 2 float 5 string 6 bool 7 timestamp 8 bigint
//! 4..8     reserved      always 0
//! ```
//!
//! Strings and timestamps reuse the width class as a sub-format selector
//! (UTF-8 = 2; Unix seconds = 1, Unix milliseconds = 2, ISO-8601 text = 3).
//!
//! The registry is a plain enum resolved by `num_enum`, so lookups are a
//! compiler-generated match and need no runtime initialisation.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::{AudalfError, AudalfResult};
use crate::settings::TimestampFormat;

/// Every tag in the catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u64)]
pub enum TypeTag {
    // Unsigned integers
    U8 = 0x0000_0001,
    U16 = 0x0000_0002,
    U32 = 0x0000_0003,
    U64 = 0x0000_0004,

    // Signed integers
    I8 = 0x0100_0001,
    I16 = 0x0100_0002,
    I32 = 0x0100_0003,
    I64 = 0x0100_0004,

    // Floating point
    F16 = 0x0200_0002,
    F32 = 0x0200_0003,
    F64 = 0x0200_0004,

    // Text
    StringUtf8 = 0x0500_0002,

    Boolean = 0x0600_0001,

    // Calendar timestamps
    TimestampUnixSeconds = 0x0700_0001,
    TimestampUnixMilliseconds = 0x0700_0002,
    TimestampIso8601 = 0x0700_0003,

    /// Width class 0: the payload length is carried in its own prefix
    BigInteger = 0x0800_0000,

    // Homogeneous arrays
    U8Array = 0x0001_0001,
    U16Array = 0x0001_0002,
    U32Array = 0x0001_0003,
    U64Array = 0x0001_0004,
    I8Array = 0x0101_0001,
    I16Array = 0x0101_0002,
    I32Array = 0x0101_0003,
    I64Array = 0x0101_0004,
    F16Array = 0x0201_0002,
    F32Array = 0x0201_0003,
    F64Array = 0x0201_0004,
}

impl TypeTag {
    /// The full catalogue, scalars first
    pub const ALL: [TypeTag; 28] = [
        TypeTag::U8,
        TypeTag::U16,
        TypeTag::U32,
        TypeTag::U64,
        TypeTag::I8,
        TypeTag::I16,
        TypeTag::I32,
        TypeTag::I64,
        TypeTag::F16,
        TypeTag::F32,
        TypeTag::F64,
        TypeTag::StringUtf8,
        TypeTag::Boolean,
        TypeTag::TimestampUnixSeconds,
        TypeTag::TimestampUnixMilliseconds,
        TypeTag::TimestampIso8601,
        TypeTag::BigInteger,
        TypeTag::U8Array,
        TypeTag::U16Array,
        TypeTag::U32Array,
        TypeTag::U64Array,
        TypeTag::I8Array,
        TypeTag::I16Array,
        TypeTag::I32Array,
        TypeTag::I64Array,
        TypeTag::F16Array,
        TypeTag::F32Array,
        TypeTag::F64Array,
    ];

    /// Resolve a raw tag read at `offset`
    ///
    /// Fails with `UnknownTypeTag` for anything outside the catalogue, the
    /// special tag included.
    pub fn from_raw(raw: u64, offset: usize) -> AudalfResult<Self> {
        Self::try_from(raw).map_err(|_| AudalfError::unknown_tag(raw, offset))
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.into()
    }

    #[inline]
    pub fn to_le_bytes(self) -> [u8; 8] {
        self.raw().to_le_bytes()
    }

    pub fn fields(self) -> TagFields {
        TagFields::from_raw(self.raw())
    }

    /// The logical type this tag encodes
    pub fn kind(self) -> ValueKind {
        match self {
            TypeTag::U8 => ValueKind::U8,
            TypeTag::U16 => ValueKind::U16,
            TypeTag::U32 => ValueKind::U32,
            TypeTag::U64 => ValueKind::U64,
            TypeTag::I8 => ValueKind::I8,
            TypeTag::I16 => ValueKind::I16,
            TypeTag::I32 => ValueKind::I32,
            TypeTag::I64 => ValueKind::I64,
            TypeTag::F16 => ValueKind::F16,
            TypeTag::F32 => ValueKind::F32,
            TypeTag::F64 => ValueKind::F64,
            TypeTag::StringUtf8 => ValueKind::String,
            TypeTag::Boolean => ValueKind::Bool,
            TypeTag::TimestampUnixSeconds
            | TypeTag::TimestampUnixMilliseconds
            | TypeTag::TimestampIso8601 => ValueKind::Timestamp,
            TypeTag::BigInteger => ValueKind::BigInteger,
            TypeTag::U8Array => ValueKind::U8Array,
            TypeTag::U16Array => ValueKind::U16Array,
            TypeTag::U32Array => ValueKind::U32Array,
            TypeTag::U64Array => ValueKind::U64Array,
            TypeTag::I8Array => ValueKind::I8Array,
            TypeTag::I16Array => ValueKind::I16Array,
            TypeTag::I32Array => ValueKind::I32Array,
            TypeTag::I64Array => ValueKind::I64Array,
            TypeTag::F16Array => ValueKind::F16Array,
            TypeTag::F32Array => ValueKind::F32Array,
            TypeTag::F64Array => ValueKind::F64Array,
        }
    }

    /// Human-readable name for diagnostics and the inspector
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::TimestampUnixSeconds => "timestamp (unix seconds)",
            TypeTag::TimestampUnixMilliseconds => "timestamp (unix milliseconds)",
            TypeTag::TimestampIso8601 => "timestamp (ISO-8601)",
            other => other.kind().name(),
        }
    }

    /// Timestamp tag for a serialization sub-format
    pub fn timestamp(format: TimestampFormat) -> Self {
        match format {
            TimestampFormat::UnixSeconds => TypeTag::TimestampUnixSeconds,
            TimestampFormat::UnixMilliseconds => TypeTag::TimestampUnixMilliseconds,
            TimestampFormat::Iso8601 => TypeTag::TimestampIso8601,
        }
    }

    pub fn is_array(self) -> bool {
        self.fields().is_array
    }
}

/// Logical value types, independent of timestamp sub-format
///
/// This is what callers name in explicit per-key type maps. The concrete tag
/// is chosen with [`ValueKind::tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F16,
    F32,
    F64,
    String,
    Bool,
    Timestamp,
    BigInteger,
    U8Array,
    U16Array,
    U32Array,
    U64Array,
    I8Array,
    I16Array,
    I32Array,
    I64Array,
    F16Array,
    F32Array,
    F64Array,
}

impl ValueKind {
    /// Tag used to write this kind; total over the catalogue
    pub fn tag(self, timestamp_format: TimestampFormat) -> TypeTag {
        match self {
            ValueKind::U8 => TypeTag::U8,
            ValueKind::U16 => TypeTag::U16,
            ValueKind::U32 => TypeTag::U32,
            ValueKind::U64 => TypeTag::U64,
            ValueKind::I8 => TypeTag::I8,
            ValueKind::I16 => TypeTag::I16,
            ValueKind::I32 => TypeTag::I32,
            ValueKind::I64 => TypeTag::I64,
            ValueKind::F16 => TypeTag::F16,
            ValueKind::F32 => TypeTag::F32,
            ValueKind::F64 => TypeTag::F64,
            ValueKind::String => TypeTag::StringUtf8,
            ValueKind::Bool => TypeTag::Boolean,
            ValueKind::Timestamp => TypeTag::timestamp(timestamp_format),
            ValueKind::BigInteger => TypeTag::BigInteger,
            ValueKind::U8Array => TypeTag::U8Array,
            ValueKind::U16Array => TypeTag::U16Array,
            ValueKind::U32Array => TypeTag::U32Array,
            ValueKind::U64Array => TypeTag::U64Array,
            ValueKind::I8Array => TypeTag::I8Array,
            ValueKind::I16Array => TypeTag::I16Array,
            ValueKind::I32Array => TypeTag::I32Array,
            ValueKind::I64Array => TypeTag::I64Array,
            ValueKind::F16Array => TypeTag::F16Array,
            ValueKind::F32Array => TypeTag::F32Array,
            ValueKind::F64Array => TypeTag::F64Array,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::U8 => "u8",
            ValueKind::U16 => "u16",
            ValueKind::U32 => "u32",
            ValueKind::U64 => "u64",
            ValueKind::I8 => "i8",
            ValueKind::I16 => "i16",
            ValueKind::I32 => "i32",
            ValueKind::I64 => "i64",
            ValueKind::F16 => "f16",
            ValueKind::F32 => "f32",
            ValueKind::F64 => "f64",
            ValueKind::String => "string (UTF-8)",
            ValueKind::Bool => "bool",
            ValueKind::Timestamp => "timestamp",
            ValueKind::BigInteger => "big integer",
            ValueKind::U8Array => "u8 array",
            ValueKind::U16Array => "u16 array",
            ValueKind::U32Array => "u32 array",
            ValueKind::U64Array => "u64 array",
            ValueKind::I8Array => "i8 array",
            ValueKind::I16Array => "i16 array",
            ValueKind::I32Array => "i32 array",
            ValueKind::I64Array => "i64 array",
            ValueKind::F16Array => "f16 array",
            ValueKind::F32Array => "f32 array",
            ValueKind::F64Array => "f64 array",
        }
    }

    pub fn is_array(self) -> bool {
        matches!(
            self,
            ValueKind::U8Array
                | ValueKind::U16Array
                | ValueKind::U32Array
                | ValueKind::U64Array
                | ValueKind::I8Array
                | ValueKind::I16Array
                | ValueKind::I32Array
                | ValueKind::I64Array
                | ValueKind::F16Array
                | ValueKind::F32Array
                | ValueKind::F64Array
        )
    }
}

/// Tag categories (byte 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum TagCategory {
    UnsignedInteger = 0,
    SignedInteger = 1,
    FloatingPoint = 2,
    String = 5,
    Boolean = 6,
    Timestamp = 7,
    BigInteger = 8,
}

/// The byte fields of any 8-byte tag, catalogued or not
///
/// Decomposition never fails, so tools can describe reserved tags
/// (128-bit integers, UTF-16 strings, ...) they cannot decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagFields {
    pub width_class: u8,
    pub is_array: bool,
    pub category: u8,
    /// True when any reserved byte is non-zero
    pub reserved_bits_set: bool,
}

impl TagFields {
    pub fn from_raw(raw: u64) -> Self {
        let bytes = raw.to_le_bytes();
        Self {
            width_class: bytes[0],
            is_array: bytes[2] != 0,
            category: bytes[3],
            reserved_bits_set: bytes[1] != 0 || bytes[4..].iter().any(|&b| b != 0),
        }
    }

    pub fn category(&self) -> Option<TagCategory> {
        TagCategory::try_from(self.category).ok()
    }

    /// Bits per element for numeric width classes 1..=10
    pub fn width_bits(&self) -> Option<u32> {
        match self.width_class {
            1..=10 => Some(8u32 << (self.width_class - 1)),
            _ => None,
        }
    }
}
