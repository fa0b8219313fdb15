//! # AUDALF - Self-Describing Binary Documents
//!
//! ## Purpose
//!
//! Encoder and decoder for AUDALF, a binary container for ordered sequences and
//! single-key-typed maps. A document carries its own type information: a fixed
//! header, an offset table giving O(1) access to every entry, and an 8-byte type
//! tag in front of every value.
//!
//! ## Document Layout
//!
//! ```text
//! ┌────────────────────────── header (32) ──────────────────────────┐
//! │ "AUDA" │ version u32 │ total size u64 │ entries u64 │ key tag u64 │
//! ├───────────────────── offset table (8 × N) ──────────────────────┤
//! │ absolute u64 offset of entry 0 │ ... │ entry N-1                 │
//! ├──────────────────────────── entries ────────────────────────────┤
//! │ key (index u64 or bare key payload) │ value tag │ value payload │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian; every offset and payload start is 8-aligned.
//!
//! ## What This Crate Contains
//!
//! - [`TypeTag`] registry and [`TagFields`] decomposition of raw tags
//! - [`Value`] model with typed conversions ([`IntoSlot`], [`FromValue`])
//! - [`DocumentBuilder`] and the `encode_*` functions
//! - [`DocumentReader`] and the `decode_*` functions
//! - Header introspection that never touches entry payloads
//! - [`SerializationSettings`] / [`DeserializationSettings`]
//!
//! ## What This Crate Does NOT Contain
//!
//! - File or stream I/O; every operation works on an in-memory buffer
//! - Nested records or schemas; values are flat scalars and arrays
//! - Compression
//!
//! ## Example
//!
//! ```
//! use audalf::{decode_map, encode_map, SerializationSettings, ValueKind, ValueTypes};
//! use std::collections::HashMap;
//!
//! let mut types = ValueTypes::new();
//! types.insert("second".to_string(), ValueKind::String);
//!
//! let entries = vec![
//!     ("1".to_string(), Some("is one".to_string())),
//!     ("second".to_string(), None),
//! ];
//! let bytes = encode_map(ValueKind::String, entries, &types, &SerializationSettings::default())?;
//!
//! let decoded: HashMap<String, Option<String>> = decode_map(&bytes)?;
//! assert_eq!(decoded["1"].as_deref(), Some("is one"));
//! assert_eq!(decoded["second"], None);
//! # Ok::<(), audalf::AudalfError>(())
//! ```

pub mod builder;
pub mod codec;
pub mod error;
pub mod header;
pub mod parser;
pub mod protocol_constants;
pub mod settings;
pub mod tag;
pub mod value;

pub use builder::{encode_map, encode_sequence, encode_sequence_with_null_kind, DocumentBuilder};
pub use codec::{layout_of, PayloadLayout};
pub use error::{AudalfError, AudalfResult};
pub use half::f16;
pub use header::{
    entry_count, entry_offsets, format_version, is_audalf, is_map, key_type_tag, total_byte_size,
    AudalfHeader,
};
pub use parser::{
    decode_element_at, decode_element_at_with, decode_map, decode_map_with, decode_sequence,
    decode_sequence_with, decode_value_for_key, decode_value_for_key_with, DocumentReader, Entry,
};
pub use protocol_constants::{FILE_EXTENSION, FORMAT_VERSION, HEADER_SIZE, SPECIAL_TAG};
pub use settings::{
    DeserializationSettings, SerializationSettings, TimestampFormat, TimestampShape, ValueTypes,
};
pub use tag::{TagCategory, TagFields, TypeTag, ValueKind};
pub use value::{FromValue, IntoSlot, Slot, Value};
