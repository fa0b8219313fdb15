//! # Document Builder - AUDALF Encoding
//!
//! ## Purpose
//!
//! Builds sequence and map documents in one pass over the caller's entries.
//! Entries are written into a scratch region while their start offsets are
//! recorded relative to that region; once the entry count is known the fixed
//! header plus offset table size (`32 + 8·N`, always aligned) is added to each
//! recorded offset and the document is assembled.
//!
//! ```text
//! entries → [scratch region + relative offsets] → header | offset table | scratch
//!                                                    ↑
//!                                      total size patched in place
//! ```
//!
//! ## Entry Layout
//!
//! - **Sequence entry**: `u64 index | value tag | payload`
//! - **Map entry**: `key payload | value tag | payload`; the key's tag is the
//!   header's key-type field and is not repeated per entry
//!
//! ## Value Type Resolution (maps)
//!
//! 1. An explicit per-key [`ValueKind`] wins; a present value must agree with it
//! 2. Otherwise the runtime kind of the value
//! 3. A typed null (`Option<T>::None`) carries its own kind
//! 4. An untyped null with no explicit kind fails with `AmbiguousNullType`

use std::hash::Hash;

use tracing::{debug, trace};
use zerocopy::{AsBytes, Ref};

use crate::codec::{write_bare, write_tagged};
use crate::error::{AudalfError, AudalfResult};
use crate::header::AudalfHeader;
use crate::protocol_constants::{index_section_size, HEADER_SIZE, SPECIAL_TAG};
use crate::settings::{SerializationSettings, ValueTypes};
use crate::tag::{TypeTag, ValueKind};
use crate::value::{IntoSlot, Slot, Value};

/// Incremental document builder
///
/// A builder is created for one document kind. Sequence builders accept
/// [`push`](Self::push), map builders accept [`insert`](Self::insert); calling
/// the other fails with `WrongDocumentKind`.
pub struct DocumentBuilder {
    key_tag: Option<TypeTag>,
    settings: SerializationSettings,
    scratch: Vec<u8>,
    relative_offsets: Vec<usize>,
}

impl DocumentBuilder {
    /// Start a sequence document
    pub fn sequence(settings: SerializationSettings) -> Self {
        Self {
            key_tag: None,
            settings,
            scratch: Vec::new(),
            relative_offsets: Vec::new(),
        }
    }

    /// Start a map document whose keys are all of `key_kind`
    ///
    /// Array kinds cannot be keys.
    pub fn map(key_kind: ValueKind, settings: SerializationSettings) -> AudalfResult<Self> {
        if key_kind.is_array() {
            return Err(AudalfError::unsupported_type(
                key_kind.name(),
                "map keys must be scalar",
            ));
        }
        Ok(Self {
            key_tag: Some(key_kind.tag(settings.timestamp_format)),
            settings,
            scratch: Vec::new(),
            relative_offsets: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.relative_offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relative_offsets.is_empty()
    }

    /// Append a sequence element; its stored index is its position
    ///
    /// `Value::Absent` is written as a null of its declared type.
    pub fn push(&mut self, value: &Value) -> AudalfResult<()> {
        if self.key_tag.is_some() {
            return Err(AudalfError::WrongDocumentKind {
                expected: "sequence",
                found: "map",
            });
        }
        let index = self.relative_offsets.len();
        let start = self.scratch.len();

        self.scratch.extend_from_slice(&(index as u64).to_le_bytes());
        if let Err(e) = write_tagged(&mut self.scratch, value, &self.settings) {
            self.scratch.truncate(start);
            return Err(e);
        }

        trace!(index, relative_offset = start, kind = value.kind().name(), "wrote sequence entry");
        self.relative_offsets.push(start);
        Ok(())
    }

    /// Append a map entry
    ///
    /// The key must be present and of the document's key kind.
    pub fn insert(&mut self, key: &Value, value: &Value) -> AudalfResult<()> {
        let Some(key_tag) = self.key_tag else {
            return Err(AudalfError::WrongDocumentKind {
                expected: "map",
                found: "sequence",
            });
        };
        let entry = self.relative_offsets.len();
        if key.is_absent() {
            return Err(AudalfError::NullKey { entry });
        }
        if key.kind() != key_tag.kind() {
            return Err(AudalfError::type_mismatch(
                key_tag.kind().name(),
                key.describe(),
                format!("map key at entry {entry}"),
            ));
        }

        let start = self.scratch.len();
        let written = write_bare(&mut self.scratch, key_tag, key)
            .and_then(|()| write_tagged(&mut self.scratch, value, &self.settings));
        if let Err(e) = written {
            self.scratch.truncate(start);
            return Err(e);
        }

        trace!(entry, relative_offset = start, key = %key, "wrote map entry");
        self.relative_offsets.push(start);
        Ok(())
    }

    /// Assemble the document
    pub fn finish(self) -> AudalfResult<Vec<u8>> {
        let count = self.relative_offsets.len() as u64;
        let index_size = index_section_size(count)
            .ok_or_else(|| AudalfError::out_of_range(count, 0, usize::MAX as u64, "entry count"))?;
        let key_type = self.key_tag.map_or(SPECIAL_TAG, TypeTag::raw);

        let mut out = Vec::with_capacity(index_size + self.scratch.len());
        out.extend_from_slice(AudalfHeader::new(count, key_type).as_bytes());
        for relative in &self.relative_offsets {
            out.extend_from_slice(&((index_size + relative) as u64).to_le_bytes());
        }
        out.extend_from_slice(&self.scratch);

        let total = out.len();
        let (mut header, _) = Ref::<_, AudalfHeader>::new_unaligned_from_prefix(out.as_mut_slice())
            .ok_or_else(|| AudalfError::truncated(HEADER_SIZE, total, "header size patch"))?;
        header.total_size.set(total as u64);

        debug!(
            entries = count,
            bytes = total,
            key_type,
            "encoded AUDALF document"
        );
        Ok(out)
    }
}

/// Resolve a sequence slot; an untyped null takes `null_kind`
fn resolve_element(
    slot: Slot,
    index: usize,
    null_kind: Option<ValueKind>,
    settings: &SerializationSettings,
) -> AudalfResult<Value> {
    match slot {
        Slot::Value(value) => Ok(value),
        Slot::Null(kind) => kind
            .or(null_kind)
            .map(|kind| Value::Absent(kind.tag(settings.timestamp_format)))
            .ok_or_else(|| AudalfError::ambiguous_null(format!("sequence element {index}"))),
    }
}

/// Resolve a map value against the optional explicit kind for its key
fn resolve_map_value(
    slot: Slot,
    explicit: Option<ValueKind>,
    entry: usize,
    settings: &SerializationSettings,
) -> AudalfResult<Value> {
    let absent = |kind: ValueKind| Value::Absent(kind.tag(settings.timestamp_format));
    match (slot, explicit) {
        (Slot::Value(value), Some(kind)) if value.kind() != kind => Err(AudalfError::type_mismatch(
            kind.name(),
            value.describe(),
            format!("explicit value type for map entry {entry}"),
        )),
        (Slot::Value(Value::Absent(_)), Some(kind)) => Ok(absent(kind)),
        (Slot::Value(value), _) => Ok(value),
        (Slot::Null(_), Some(kind)) => Ok(absent(kind)),
        (Slot::Null(Some(kind)), None) => Ok(absent(kind)),
        (Slot::Null(None), None) => Err(AudalfError::ambiguous_null(format!("map entry {entry}"))),
    }
}

/// Encode a sequence document
///
/// Typed nulls (`Option<T>::None`) keep their declared type. Untyped nulls
/// fail with `AmbiguousNullType`; use [`encode_sequence_with_null_kind`] to
/// declare one.
pub fn encode_sequence<I>(values: I, settings: &SerializationSettings) -> AudalfResult<Vec<u8>>
where
    I: IntoIterator,
    I::Item: IntoSlot,
{
    encode_sequence_with_null_kind(values, None, settings)
}

/// Encode a sequence document, declaring `null_kind` for untyped nulls
pub fn encode_sequence_with_null_kind<I>(
    values: I,
    null_kind: Option<ValueKind>,
    settings: &SerializationSettings,
) -> AudalfResult<Vec<u8>>
where
    I: IntoIterator,
    I::Item: IntoSlot,
{
    let mut builder = DocumentBuilder::sequence(*settings);
    for (index, item) in values.into_iter().enumerate() {
        let value = resolve_element(item.into_slot(), index, null_kind, settings)?;
        builder.push(&value)?;
    }
    builder.finish()
}

/// Encode a map document with keys of `key_kind`
///
/// `value_types` may name the value kind of any key; it is required for
/// untyped nulls and otherwise checked against the supplied value.
pub fn encode_map<I, K, V>(
    key_kind: ValueKind,
    entries: I,
    value_types: &ValueTypes<K>,
    settings: &SerializationSettings,
) -> AudalfResult<Vec<u8>>
where
    I: IntoIterator<Item = (K, V)>,
    K: IntoSlot + Eq + Hash,
    V: IntoSlot,
{
    let mut builder = DocumentBuilder::map(key_kind, *settings)?;
    for (entry, (key, value)) in entries.into_iter().enumerate() {
        let explicit = value_types.get(&key).copied();
        let key = match key.into_slot() {
            Slot::Value(key) => key,
            Slot::Null(_) => return Err(AudalfError::NullKey { entry }),
        };
        let value = resolve_map_value(value.into_slot(), explicit, entry, settings)?;
        builder.insert(&key, &value)?;
    }
    builder.finish()
}
