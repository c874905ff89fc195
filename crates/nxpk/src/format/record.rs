//! Index table records.

use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// One 28-byte record of the index table.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct RawIndexRecord {
    /// Hash of the original relative path
    pub sign: U32,
    /// Absolute offset of the entry data
    pub offset: U32,
    /// Number of stored bytes
    pub length: U32,
    /// Size after decompression
    pub original_length: U32,
    /// Integrity hash
    pub hash1: U32,
    /// Integrity hash
    pub hash2: U32,
    /// Compression flag
    pub flag: U32,
}

impl RawIndexRecord {
    /// Record size in bytes.
    pub const SIZE: usize = 28;
}

const _: () = assert!(std::mem::size_of::<RawIndexRecord>() == RawIndexRecord::SIZE);
const _: () = assert!(std::mem::size_of::<super::RawHeader>() == super::RawHeader::SIZE);
