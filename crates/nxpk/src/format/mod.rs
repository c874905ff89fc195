//! NXPK on-disk structures.
//!
//! This module contains the fixed little-endian layouts of the container
//! header and the index records that follow it.

mod header;
mod record;

pub use header::RawHeader;
pub use record::RawIndexRecord;

/// Signature at the start of every NXPK archive.
pub const MAGIC: [u8; 4] = *b"NXPK";

/// Per-entry compression method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CompressionFlag {
    /// No compression (stored).
    Stored,
    /// zlib-wrapped DEFLATE.
    Deflate,
    /// The LZ4-style block format.
    Block,
    /// Any other value; the data is passed through as if stored.
    Unknown(u32),
}

impl CompressionFlag {
    /// The raw flag value as it appears in the index record.
    pub fn raw(self) -> u32 {
        match self {
            Self::Stored => 0,
            Self::Deflate => 1,
            Self::Block => 2,
            Self::Unknown(value) => value,
        }
    }

    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Deflate => "deflate",
            Self::Block => "block",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl From<u32> for CompressionFlag {
    fn from(value: u32) -> Self {
        match value {
            0 => Self::Stored,
            1 => Self::Deflate,
            2 => Self::Block,
            other => Self::Unknown(other),
        }
    }
}
