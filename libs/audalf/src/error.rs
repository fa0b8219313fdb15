//! Codec-level errors for AUDALF encoding and decoding
//!
//! Every failure the encoder or decoder can hit is a variant of [`AudalfError`].
//! Variants carry the byte offsets, sizes and tag values needed to locate the
//! problem in a buffer, plus a short diagnosis where one can be inferred.

use thiserror::Error;

/// AUDALF errors with diagnostic context
///
/// Errors are raised at the point the offending byte or value is met; no partial
/// output is ever returned alongside them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AudalfError {
    /// The first four bytes are not `"AUDA"`
    #[error("Invalid magic: expected {expected:#010x}, got {actual:#010x} (indicates: {diagnosis})")]
    InvalidMagic {
        expected: u32,
        actual: u32,
        diagnosis: String,
    },

    /// Document declares a format version this decoder does not understand
    #[error("Unsupported format version {version}: supported version is {supported}")]
    UnsupportedVersion { version: u32, supported: u32 },

    /// Buffer ends before a field or payload that must be present
    #[error("Truncated buffer: need {need} bytes, got {got} (context: {context}, action: {suggested_action})")]
    TruncatedBuffer {
        need: usize,
        got: usize,
        context: String,
        suggested_action: String,
    },

    /// An offset, length or index field points outside its permitted range
    #[error("Out of range: {context} is {value}, permitted range is {min}..={max}")]
    OutOfRange {
        value: u64,
        min: u64,
        max: u64,
        context: String,
    },

    /// Tag is not part of the type catalogue
    #[error("Unknown type tag {tag:#018x} at offset {offset} (width class {width_class}, array {is_array}, category {category})")]
    UnknownTypeTag {
        tag: u64,
        offset: usize,
        width_class: u8,
        is_array: u8,
        category: u8,
    },

    /// The encoder was given something the wire format cannot carry in that position
    #[error("Unsupported type {type_name}: {context}")]
    UnsupportedType { type_name: String, context: String },

    /// A map key was absent
    #[error("Map key at entry {entry} is absent; keys can never be null")]
    NullKey { entry: usize },

    /// An absent value has no declared type
    #[error("Absent value for {location} has no declared type; supply an explicit value type")]
    AmbiguousNullType { location: String },

    /// A value cannot be produced as, or does not agree with, the requested type
    #[error("Type mismatch: expected {expected}, found {found} ({context})")]
    TypeMismatch {
        expected: String,
        found: String,
        context: String,
    },

    /// Payload bytes are in bounds but malformed for their tag
    #[error("Invalid payload for tag {tag:#018x} at offset {offset}: {reason}")]
    InvalidPayload {
        tag: u64,
        offset: usize,
        reason: String,
    },

    /// Bulk decode asked for a sequence from a map document or the reverse
    #[error("Wrong document kind: expected a {expected} document, found a {found} document")]
    WrongDocumentKind {
        expected: &'static str,
        found: &'static str,
    },
}

impl AudalfError {
    /// Create InvalidMagic with a guess at what the bytes really are
    pub fn invalid_magic(expected: u32, actual: u32) -> Self {
        let diagnosis = match actual {
            0x0000_0000 => "uninitialized buffer",
            0xFFFF_FFFF => "corrupted buffer",
            _ if actual.swap_bytes() == expected => "byte order (endianness) mismatch",
            _ => "not an AUDALF document or corrupted header",
        };

        Self::InvalidMagic {
            expected,
            actual,
            diagnosis: diagnosis.to_string(),
        }
    }

    /// Create TruncatedBuffer with a suggested action
    pub fn truncated(need: usize, got: usize, context: impl Into<String>) -> Self {
        let suggested_action = if got == 0 {
            "buffer is empty - check the read that produced it"
        } else if need > got.saturating_mul(2) {
            "likely corrupted length or offset field"
        } else {
            "incomplete document - the buffer was cut short"
        };

        Self::TruncatedBuffer {
            need,
            got,
            context: context.into(),
            suggested_action: suggested_action.to_string(),
        }
    }

    /// Create OutOfRange for a field whose value must lie in `min..=max`
    pub fn out_of_range(value: u64, min: u64, max: u64, context: impl Into<String>) -> Self {
        Self::OutOfRange {
            value,
            min,
            max,
            context: context.into(),
        }
    }

    /// Create UnknownTypeTag, splitting the raw tag into its byte fields
    pub fn unknown_tag(tag: u64, offset: usize) -> Self {
        let bytes = tag.to_le_bytes();
        Self::UnknownTypeTag {
            tag,
            offset,
            width_class: bytes[0],
            is_array: bytes[2],
            category: bytes[3],
        }
    }

    pub fn unsupported_type(type_name: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
            context: context.into(),
        }
    }

    pub fn ambiguous_null(location: impl Into<String>) -> Self {
        Self::AmbiguousNullType {
            location: location.into(),
        }
    }

    pub fn type_mismatch(
        expected: impl Into<String>,
        found: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
            context: context.into(),
        }
    }

    pub fn invalid_payload(tag: u64, offset: usize, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            tag,
            offset,
            reason: reason.into(),
        }
    }
}

/// Result type for AUDALF operations
pub type AudalfResult<T> = std::result::Result<T, AudalfError>;
