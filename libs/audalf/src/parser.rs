//! # Document Reader - AUDALF Decoding
//!
//! ## Purpose
//!
//! Validates a document once and then serves bulk decodes, O(1) positional
//! access and O(N) by-key lookup over the borrowed buffer. Nothing is cached
//! between calls; callers that look up many keys should bulk-decode once.
//!
//! ## Validation on Open
//!
//! - Buffer holds a full header with the AUDALF magic
//! - Format version is supported (fails closed on anything newer)
//! - Stored total size fits the buffer; reads never go past it
//! - Offset table lies inside the stored total size
//! - Map key type is a catalogued tag
//!
//! Individual offsets are checked when followed (aligned, inside the entry
//! region), which keeps positional access independent of the entry count.
//!
//! ## Positional Access
//!
//! [`DocumentReader::element_at`] trusts that storage order equals logical
//! order and does not compare the entry's stored index against `i`. Use
//! [`DocumentReader::entry_at`] to see the stored index.

use std::collections::HashMap;
use std::hash::Hash;

use tracing::{debug, trace};

use crate::codec::{read_bare, read_tagged, ByteCursor};
use crate::error::{AudalfError, AudalfResult};
use crate::header::AudalfHeader;
use crate::protocol_constants::{
    index_section_size, offsets, ALIGNMENT, FORMAT_VERSION, HEADER_SIZE, SLOT_SIZE, SPECIAL_TAG,
};
use crate::settings::DeserializationSettings;
use crate::tag::TypeTag;
use crate::value::{FromValue, Value};

const SEQUENCE: &str = "sequence";
const MAP: &str = "map";

/// One decoded entry with its absolute offset
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub offset: u64,
    /// Stored index (`Value::U64`) for sequences, the key for maps
    pub key: Value,
    pub value: Value,
}

/// Validated read-only view of one document
#[derive(Debug, Clone)]
pub struct DocumentReader<'a> {
    /// The document, cut to its stored total size
    bytes: &'a [u8],
    header: AudalfHeader,
    key_tag: Option<TypeTag>,
    entry_count: usize,
    entries_start: usize,
    settings: DeserializationSettings,
}

impl<'a> DocumentReader<'a> {
    pub fn new(bytes: &'a [u8]) -> AudalfResult<Self> {
        Self::with_settings(bytes, DeserializationSettings::default())
    }

    pub fn with_settings(bytes: &'a [u8], settings: DeserializationSettings) -> AudalfResult<Self> {
        let header = AudalfHeader::parse(bytes)?;

        if header.version() != FORMAT_VERSION {
            return Err(AudalfError::UnsupportedVersion {
                version: header.version(),
                supported: FORMAT_VERSION,
            });
        }

        let total_size = header.total_size();
        if total_size < HEADER_SIZE as u64 {
            return Err(AudalfError::out_of_range(
                total_size,
                HEADER_SIZE as u64,
                bytes.len() as u64,
                "total size field",
            ));
        }
        let total = usize::try_from(total_size).unwrap_or(usize::MAX);
        if total > bytes.len() {
            return Err(AudalfError::truncated(total, bytes.len(), "document total size"));
        }

        let entries_start = index_section_size(header.entry_count())
            .filter(|&end| end <= total)
            .ok_or_else(|| {
                let need = index_section_size(header.entry_count()).unwrap_or(usize::MAX);
                AudalfError::truncated(need, total, "offset table")
            })?;
        // Bounded by the table check above
        let entry_count = (entries_start - HEADER_SIZE) / SLOT_SIZE;

        let key_tag = match header.key_type() {
            SPECIAL_TAG => None,
            raw => Some(TypeTag::from_raw(raw, offsets::KEY_TYPE)?),
        };

        debug!(
            entries = entry_count,
            bytes = total,
            key_type = key_tag.map_or(SEQUENCE, TypeTag::name),
            "opened AUDALF document"
        );

        Ok(Self {
            bytes: &bytes[..total],
            header,
            key_tag,
            entry_count,
            entries_start,
            settings,
        })
    }

    pub fn header(&self) -> &AudalfHeader {
        &self.header
    }

    pub fn settings(&self) -> &DeserializationSettings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.entry_count
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    pub fn is_map(&self) -> bool {
        self.key_tag.is_some()
    }

    /// Resolved key tag; `None` for sequences
    pub fn key_tag(&self) -> Option<TypeTag> {
        self.key_tag
    }

    fn kind_name(&self) -> &'static str {
        if self.is_map() {
            MAP
        } else {
            SEQUENCE
        }
    }

    fn require(&self, expected: &'static str) -> AudalfResult<()> {
        if self.kind_name() == expected {
            Ok(())
        } else {
            Err(AudalfError::WrongDocumentKind {
                expected,
                found: self.kind_name(),
            })
        }
    }

    fn check_index(&self, index: usize) -> AudalfResult<()> {
        if index < self.entry_count {
            return Ok(());
        }
        Err(AudalfError::out_of_range(
            index as u64,
            0,
            (self.entry_count as u64).saturating_sub(1),
            format!("entry index into {} entries", self.entry_count),
        ))
    }

    /// Absolute offset of entry `index`, validated
    fn entry_offset(&self, index: usize) -> AudalfResult<usize> {
        let slot_at = offsets::OFFSET_TABLE + index * SLOT_SIZE;
        let raw = ByteCursor::at(self.bytes, slot_at).read_u64("offset table slot")?;
        let offset = usize::try_from(raw)
            .ok()
            .filter(|&o| o % ALIGNMENT == 0 && o >= self.entries_start && o <= self.bytes.len())
            .ok_or_else(|| {
                AudalfError::out_of_range(
                    raw,
                    self.entries_start as u64,
                    self.bytes.len() as u64,
                    format!("8-aligned offset of entry {index}"),
                )
            })?;
        Ok(offset)
    }

    /// Settings with the timestamp shape `T` requires, if any
    fn shaped_for<T: FromValue>(&self) -> DeserializationSettings {
        T::timestamp_shape().map_or(self.settings, DeserializationSettings::with_timestamp_shape)
    }

    /// Cursor positioned after the entry's key, and the key itself
    fn read_key(
        &self,
        index: usize,
        settings: &DeserializationSettings,
    ) -> AudalfResult<(ByteCursor<'a>, usize, Value)> {
        let offset = self.entry_offset(index)?;
        let mut cursor = ByteCursor::at(self.bytes, offset);
        let key = match self.key_tag {
            None => Value::U64(cursor.read_u64("stored sequence index")?),
            Some(tag) => read_bare(&mut cursor, tag, settings)?,
        };
        Ok((cursor, offset, key))
    }

    fn read_entry(
        &self,
        index: usize,
        key_settings: &DeserializationSettings,
        value_settings: &DeserializationSettings,
    ) -> AudalfResult<Entry> {
        let (mut cursor, offset, key) = self.read_key(index, key_settings)?;
        let value = read_tagged(&mut cursor, value_settings)?;
        trace!(index, offset, key = %key, "read entry");
        Ok(Entry {
            offset: offset as u64,
            key,
            value,
        })
    }

    /// Entry `index` in table order, with its stored key
    pub fn entry_at(&self, index: usize) -> AudalfResult<Entry> {
        self.check_index(index)?;
        self.read_entry(index, &self.settings, &self.settings)
    }

    /// Every (key, value) pair in table order
    ///
    /// Works for both document kinds and for key types that cannot be hashed.
    pub fn entries(&self) -> AudalfResult<Vec<(Value, Value)>> {
        (0..self.entry_count)
            .map(|i| self.entry_at(i).map(|e| (e.key, e.value)))
            .collect()
    }

    /// Decode a sequence, placing each element at its stored index
    pub fn decode_sequence<T: FromValue>(&self) -> AudalfResult<Vec<T>> {
        self.require(SEQUENCE)?;
        let value_settings = self.shaped_for::<T>();
        let mut placed: Vec<Option<T>> = std::iter::repeat_with(|| None)
            .take(self.entry_count)
            .collect();

        for i in 0..self.entry_count {
            let Entry { offset, key, value } = self.read_entry(i, &self.settings, &value_settings)?;
            let stored = match key {
                Value::U64(stored) => stored,
                other => {
                    return Err(AudalfError::type_mismatch(
                        "u64",
                        other.describe(),
                        "stored sequence index",
                    ))
                }
            };
            let slot = usize::try_from(stored)
                .ok()
                .and_then(|s| placed.get_mut(s))
                .ok_or_else(|| {
                    AudalfError::out_of_range(
                        stored,
                        0,
                        self.entry_count as u64 - 1,
                        format!("stored index of entry {i}"),
                    )
                })?;
            if slot.is_some() {
                return Err(AudalfError::invalid_payload(
                    TypeTag::U64.raw(),
                    offset as usize,
                    format!("duplicate stored index {stored}"),
                ));
            }
            *slot = Some(T::from_value(value)?);
        }

        // N entries with distinct indices below N fill every slot
        Ok(placed.into_iter().flatten().collect())
    }

    /// Decode a map; on duplicate keys the last entry wins
    pub fn decode_map<K, V>(&self) -> AudalfResult<HashMap<K, V>>
    where
        K: FromValue + Eq + Hash,
        V: FromValue,
    {
        self.require(MAP)?;
        let (key_settings, value_settings) = (self.shaped_for::<K>(), self.shaped_for::<V>());
        let mut map = HashMap::with_capacity(self.entry_count);
        for i in 0..self.entry_count {
            let Entry { key, value, .. } = self.read_entry(i, &key_settings, &value_settings)?;
            if map.insert(K::from_value(key)?, V::from_value(value)?).is_some() {
                debug!(entry = i, "duplicate map key, keeping the later value");
            }
        }
        Ok(map)
    }

    /// Decode only entry `index`
    pub fn element_at<T: FromValue>(&self, index: usize) -> AudalfResult<T> {
        self.check_index(index)?;
        let (mut cursor, _, _) = self.read_key(index, &self.settings)?;
        T::from_value(read_tagged(&mut cursor, &self.shaped_for::<T>())?)
    }

    /// Linear scan for `key`, decoding a value only for the matching entry
    ///
    /// Scans from the last entry so duplicates resolve like [`decode_map`](Self::decode_map).
    /// A missing key is `Ok(None)`.
    pub fn value_for_key<K, V>(&self, key: &K) -> AudalfResult<Option<V>>
    where
        K: FromValue + PartialEq,
        V: FromValue,
    {
        self.require(MAP)?;
        let key_settings = self.shaped_for::<K>();
        for i in (0..self.entry_count).rev() {
            let (mut cursor, _, stored) = self.read_key(i, &key_settings)?;
            if K::from_value(stored)? == *key {
                let value = read_tagged(&mut cursor, &self.shaped_for::<V>())?;
                return V::from_value(value).map(Some);
            }
        }
        Ok(None)
    }
}

/// Decode a sequence document with default settings
pub fn decode_sequence<T: FromValue>(bytes: &[u8]) -> AudalfResult<Vec<T>> {
    DocumentReader::new(bytes)?.decode_sequence()
}

pub fn decode_sequence_with<T: FromValue>(
    bytes: &[u8],
    settings: &DeserializationSettings,
) -> AudalfResult<Vec<T>> {
    DocumentReader::with_settings(bytes, *settings)?.decode_sequence()
}

/// Decode a map document with default settings
pub fn decode_map<K, V>(bytes: &[u8]) -> AudalfResult<HashMap<K, V>>
where
    K: FromValue + Eq + Hash,
    V: FromValue,
{
    DocumentReader::new(bytes)?.decode_map()
}

pub fn decode_map_with<K, V>(
    bytes: &[u8],
    settings: &DeserializationSettings,
) -> AudalfResult<HashMap<K, V>>
where
    K: FromValue + Eq + Hash,
    V: FromValue,
{
    DocumentReader::with_settings(bytes, *settings)?.decode_map()
}

/// Decode the value of entry `index` with default settings
pub fn decode_element_at<T: FromValue>(bytes: &[u8], index: usize) -> AudalfResult<T> {
    DocumentReader::new(bytes)?.element_at(index)
}

pub fn decode_element_at_with<T: FromValue>(
    bytes: &[u8],
    index: usize,
    settings: &DeserializationSettings,
) -> AudalfResult<T> {
    DocumentReader::with_settings(bytes, *settings)?.element_at(index)
}

/// Look up one map value with default settings
pub fn decode_value_for_key<K, V>(bytes: &[u8], key: &K) -> AudalfResult<Option<V>>
where
    K: FromValue + PartialEq,
    V: FromValue,
{
    DocumentReader::new(bytes)?.value_for_key(key)
}

pub fn decode_value_for_key_with<K, V>(
    bytes: &[u8],
    key: &K,
    settings: &DeserializationSettings,
) -> AudalfResult<Option<V>>
where
    K: FromValue + PartialEq,
    V: FromValue,
{
    DocumentReader::with_settings(bytes, *settings)?.value_for_key(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{encode_map, encode_sequence};
    use crate::settings::SerializationSettings;
    use crate::tag::ValueKind;
    use zerocopy::AsBytes;

    fn sequence_bytes() -> Vec<u8> {
        encode_sequence([10i32, -20, 30], &SerializationSettings::default()).unwrap()
    }

    /// Hand-assembled sequence with entries stored out of index order
    fn shuffled_sequence(indices: [u64; 3]) -> Vec<u8> {
        let mut bytes = AudalfHeader::new(3, SPECIAL_TAG).as_bytes().to_vec();
        let entries_start = 32 + 24;
        for i in 0..3u64 {
            bytes.extend_from_slice(&(entries_start + 24 * i).to_le_bytes());
        }
        for (value, index) in [100u8, 101, 102].into_iter().zip(indices) {
            bytes.extend_from_slice(&index.to_le_bytes());
            bytes.extend_from_slice(&TypeTag::U8.to_le_bytes());
            bytes.extend_from_slice(&[value, 0, 0, 0, 0, 0, 0, 0]);
        }
        let total = bytes.len() as u64;
        bytes[8..16].copy_from_slice(&total.to_le_bytes());
        bytes
    }

    #[test]
    fn test_sequence_decodes_by_stored_index() {
        let bytes = shuffled_sequence([2, 0, 1]);
        let values: Vec<u8> = decode_sequence(&bytes).unwrap();
        assert_eq!(values, vec![101, 102, 100]);

        // Positional access trusts storage order
        assert_eq!(decode_element_at::<u8>(&bytes, 0).unwrap(), 100);
        let reader = DocumentReader::new(&bytes).unwrap();
        assert_eq!(reader.entry_at(0).unwrap().key, Value::U64(2));
    }

    #[test]
    fn test_bad_stored_indices() {
        assert!(matches!(
            decode_sequence::<u8>(&shuffled_sequence([0, 0, 1])),
            Err(AudalfError::InvalidPayload { .. })
        ));
        assert!(matches!(
            decode_sequence::<u8>(&shuffled_sequence([0, 1, 3])),
            Err(AudalfError::OutOfRange { value: 3, max: 2, .. })
        ));
    }

    #[test]
    fn test_wrong_document_kind() {
        let bytes = sequence_bytes();
        assert!(matches!(
            decode_map::<u64, i32>(&bytes),
            Err(AudalfError::WrongDocumentKind {
                expected: "map",
                found: "sequence"
            })
        ));
        assert!(decode_value_for_key::<u64, i32>(&bytes, &0).is_err());
    }

    #[test]
    fn test_element_at_bounds() {
        let bytes = sequence_bytes();
        assert_eq!(decode_element_at::<i32>(&bytes, 1).unwrap(), -20);
        assert!(matches!(
            decode_element_at::<i32>(&bytes, 3),
            Err(AudalfError::OutOfRange { value: 3, .. })
        ));
    }

    #[test]
    fn test_fails_closed_on_future_version() {
        let mut bytes = sequence_bytes();
        bytes[4..8].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(
            DocumentReader::new(&bytes),
            Err(AudalfError::UnsupportedVersion {
                version: 2,
                supported: 1
            })
        ));
    }

    #[test]
    fn test_size_and_table_checks() {
        let mut bytes = sequence_bytes();
        bytes.truncate(bytes.len() - 8);
        assert!(matches!(
            DocumentReader::new(&bytes),
            Err(AudalfError::TruncatedBuffer { .. })
        ));

        let mut bytes = sequence_bytes();
        bytes[16..24].copy_from_slice(&1_000u64.to_le_bytes());
        assert!(matches!(
            DocumentReader::new(&bytes),
            Err(AudalfError::TruncatedBuffer { .. })
        ));

        let mut bytes = sequence_bytes();
        bytes[32..40].copy_from_slice(&61u64.to_le_bytes());
        assert!(matches!(
            decode_element_at::<i32>(&bytes, 0),
            Err(AudalfError::OutOfRange { value: 61, .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let mut bytes = sequence_bytes();
        bytes.extend_from_slice(&[0xAA; 16]);
        assert_eq!(decode_sequence::<i32>(&bytes).unwrap(), vec![10, -20, 30]);
    }

    #[test]
    fn test_unknown_key_type_rejected_on_open() {
        let mut bytes = sequence_bytes();
        bytes[24..32].copy_from_slice(&0x0500_0003u64.to_le_bytes());
        assert!(matches!(
            DocumentReader::new(&bytes),
            Err(AudalfError::UnknownTypeTag { offset: 24, .. })
        ));
    }

    #[test]
    fn test_value_for_key_prefers_last_duplicate() {
        let entries = vec![("k", 1i64), ("other", 2), ("k", 3)];
        let bytes = encode_map(
            ValueKind::String,
            entries,
            &HashMap::new(),
            &SerializationSettings::default(),
        )
        .unwrap();

        let map: HashMap<String, i64> = decode_map(&bytes).unwrap();
        assert_eq!(map["k"], 3);
        assert_eq!(
            decode_value_for_key::<String, i64>(&bytes, &"k".to_string()).unwrap(),
            Some(3)
        );
        assert_eq!(
            decode_value_for_key::<String, i64>(&bytes, &"missing".to_string()).unwrap(),
            None
        );
    }
}
