//! # Document Header and Introspection
//!
//! ## Purpose
//!
//! Zero-copy view of the fixed 32-byte header, plus the read-only introspection
//! operations that inspect a buffer without decoding any entry payload. These
//! are the only operations external tools such as the inspector rely on.
//!
//! ## Layout
//!
//! ```text
//! 0..4    magic         "AUDA"
//! 4..8    version       u32 LE, currently 1
//! 8..16   total size    u64 LE, patched once encoding completes
//! 16..24  entry count   u64 LE
//! 24..32  key type      u64 LE tag, SPECIAL_TAG for sequences
//! 32..    offset table  entry count × u64 LE absolute offsets
//! ```
//!
//! Every introspection call except [`is_audalf`] fails with `InvalidMagic` on a
//! foreign buffer, so a corrupted document can never report plausible-looking
//! numbers.

use zerocopy::byteorder::{LittleEndian, U32, U64};
use zerocopy::{AsBytes, FromBytes, FromZeroes, Unaligned};

use crate::error::{AudalfError, AudalfResult};
use crate::protocol_constants::{
    index_section_size, offsets, FORMAT_VERSION, HEADER_SIZE, MAGIC, MAGIC_BYTES, SLOT_SIZE,
    SPECIAL_TAG,
};

/// The 32-byte document header
#[derive(Debug, Clone, Copy, AsBytes, FromBytes, FromZeroes, Unaligned)]
#[repr(C)]
pub struct AudalfHeader {
    pub magic: [u8; 4],
    pub version: U32<LittleEndian>,
    pub total_size: U64<LittleEndian>,
    pub entry_count: U64<LittleEndian>,
    pub key_type: U64<LittleEndian>,
}

const _: () = assert!(std::mem::size_of::<AudalfHeader>() == HEADER_SIZE);

impl AudalfHeader {
    /// Header for a new document; the size field is patched after encoding
    pub fn new(entry_count: u64, key_type: u64) -> Self {
        Self {
            magic: MAGIC_BYTES,
            version: U32::new(FORMAT_VERSION),
            total_size: U64::new(0),
            entry_count: U64::new(entry_count),
            key_type: U64::new(key_type),
        }
    }

    /// Read and magic-check the header at the start of `bytes`
    ///
    /// The version is deliberately not judged here; see
    /// [`DocumentReader`](crate::parser::DocumentReader) for the fail-closed check.
    pub fn parse(bytes: &[u8]) -> AudalfResult<Self> {
        let header = Self::read_from_prefix(bytes)
            .ok_or_else(|| AudalfError::truncated(HEADER_SIZE, bytes.len(), "document header"))?;
        if header.magic != MAGIC_BYTES {
            return Err(AudalfError::invalid_magic(
                MAGIC,
                u32::from_le_bytes(header.magic),
            ));
        }
        Ok(header)
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.version.get()
    }

    #[inline]
    pub fn total_size(&self) -> u64 {
        self.total_size.get()
    }

    #[inline]
    pub fn entry_count(&self) -> u64 {
        self.entry_count.get()
    }

    #[inline]
    pub fn key_type(&self) -> u64 {
        self.key_type.get()
    }

    #[inline]
    pub fn is_map(&self) -> bool {
        self.key_type() != SPECIAL_TAG
    }
}

/// True when `bytes` starts with the AUDALF magic
pub fn is_audalf(bytes: &[u8]) -> bool {
    bytes.get(offsets::MAGIC..offsets::MAGIC + MAGIC_BYTES.len()) == Some(&MAGIC_BYTES[..])
}

/// Stored format version, whether or not this crate supports it
pub fn format_version(bytes: &[u8]) -> AudalfResult<u32> {
    AudalfHeader::parse(bytes).map(|h| h.version())
}

/// Stored total document size in bytes
pub fn total_byte_size(bytes: &[u8]) -> AudalfResult<u64> {
    AudalfHeader::parse(bytes).map(|h| h.total_size())
}

/// True for map documents, false for sequences
pub fn is_map(bytes: &[u8]) -> AudalfResult<bool> {
    AudalfHeader::parse(bytes).map(|h| h.is_map())
}

/// Raw key-type tag; `SPECIAL_TAG` for sequences
///
/// Returned unresolved so tools can report tags outside the catalogue.
pub fn key_type_tag(bytes: &[u8]) -> AudalfResult<u64> {
    AudalfHeader::parse(bytes).map(|h| h.key_type())
}

pub fn entry_count(bytes: &[u8]) -> AudalfResult<u64> {
    AudalfHeader::parse(bytes).map(|h| h.entry_count())
}

/// The raw offset table, one absolute offset per entry
///
/// Offsets are returned as stored. Only the table itself is bounds-checked;
/// decoding validates each offset when it is followed.
pub fn entry_offsets(bytes: &[u8]) -> AudalfResult<Vec<u64>> {
    let header = AudalfHeader::parse(bytes)?;
    let table_end = index_section_size(header.entry_count())
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| {
            let need = index_section_size(header.entry_count()).unwrap_or(usize::MAX);
            AudalfError::truncated(need, bytes.len(), "offset table")
        })?;

    Ok(bytes[offsets::OFFSET_TABLE..table_end]
        .chunks_exact(SLOT_SIZE)
        .map(|chunk| {
            let mut raw = [0u8; SLOT_SIZE];
            raw.copy_from_slice(chunk);
            u64::from_le_bytes(raw)
        })
        .collect())
}
