//! Format-level constants for AUDALF documents
//!
//! These values are part of the wire format. They MUST stay identical across
//! every encoder and decoder for documents to interoperate.

/// The four magic bytes that open every document: `"AUDA"`
pub const MAGIC_BYTES: [u8; 4] = *b"AUDA";

/// Magic bytes read as a little-endian `u32`, used in diagnostics
pub const MAGIC: u32 = u32::from_le_bytes(MAGIC_BYTES);

/// The only format version this crate writes and accepts
pub const FORMAT_VERSION: u32 = 1;

/// Size of the fixed document header
///
/// Magic(4) + Version(4) + TotalSize(8) + EntryCount(8) + KeyType(8) = 32
pub const HEADER_SIZE: usize = 32;

/// Every structural offset and every payload start is a multiple of this
pub const ALIGNMENT: usize = 8;

/// Width of one offset-table slot, of a tag, and of a length prefix
pub const SLOT_SIZE: usize = 8;

/// The all-zero tag
///
/// In the header key-type field it marks a sequence document. In a value's tag
/// position it marks an absent value whose declared tag follows.
pub const SPECIAL_TAG: u64 = 0;

/// Conventional file extension, not enforced by the format
pub const FILE_EXTENSION: &str = "audalf";

/// Byte offsets of the header fields
pub mod offsets {
    pub const MAGIC: usize = 0;
    pub const VERSION: usize = 4;
    pub const TOTAL_SIZE: usize = 8;
    pub const ENTRY_COUNT: usize = 16;
    pub const KEY_TYPE: usize = 24;
    pub const OFFSET_TABLE: usize = 32;
}

/// Round `value` up to the next multiple of [`ALIGNMENT`]
#[inline]
pub const fn align_up(value: usize) -> usize {
    (value + (ALIGNMENT - 1)) & !(ALIGNMENT - 1)
}

/// Number of zero bytes needed after `len` bytes to reach the next boundary
#[inline]
pub const fn padding_for(len: usize) -> usize {
    align_up(len) - len
}

/// Header plus offset table size for a document of `entry_count` entries
///
/// Returns `None` when the size does not fit in `usize`.
pub fn index_section_size(entry_count: u64) -> Option<usize> {
    let count = usize::try_from(entry_count).ok()?;
    count.checked_mul(SLOT_SIZE)?.checked_add(HEADER_SIZE)
}
