//! Container header.

use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// The 24-byte header at offset 0.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct RawHeader {
    /// Signature, always `NXPK`
    pub magic: [u8; 4],
    /// Number of index records
    pub entry_count: U32,
    /// Mode-related word
    pub aux1: U32,
    /// Reserved
    pub aux2: U32,
    /// Mode-related word
    pub aux3: U32,
    /// Absolute offset of the index table
    pub index_offset: U32,
}

impl RawHeader {
    /// Header size in bytes.
    pub const SIZE: usize = 24;
}
