//! Error types for the NXPK crate.

use thiserror::Error;

/// Errors that can occur when reading or extracting NXPK archives.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] nxpk_common::Error),

    /// The archive does not start with the NXPK signature.
    #[error("invalid container magic: expected \"NXPK\", got {actual:02x?}")]
    InvalidContainerMagic { actual: Vec<u8> },

    /// The fixed-size header is incomplete.
    #[error("truncated header: needed 24 bytes, only {available} available")]
    TruncatedHeader { available: usize },

    /// The index table extends past the end of the archive.
    #[error(
        "truncated index table at offset {offset}: needed {needed} bytes, only {available} available"
    )]
    TruncatedIndex {
        offset: u64,
        needed: u64,
        available: u64,
    },

    /// An entry's byte range extends past the end of the archive.
    #[error(
        "truncated entry data: {length} bytes at offset {offset} exceed archive size {archive_size}"
    )]
    TruncatedEntryData {
        offset: u32,
        length: u32,
        archive_size: u64,
    },

    /// An entry index past the end of the index table.
    #[error("entry index {index} out of range ({count} entries)")]
    EntryIndexOutOfRange { index: usize, count: usize },

    /// The side map exists but does not name an entry of the index table.
    #[error("no side-map path for entry {index} (sign {sign:#010x})")]
    UnresolvedPathMapping { index: usize, sign: u32 },

    /// A side-map line could not be parsed.
    #[error("malformed side map at line {line}: {reason}")]
    MalformedSideMap { line: usize, reason: String },

    /// Compressed entry data is malformed.
    #[error("corrupt block at input position {position}: {reason}")]
    CorruptBlock { position: usize, reason: String },

    /// A resolved path would escape the output root.
    #[error("refusing to write outside the output root: {0}")]
    UnsafeEntryPath(String),

    /// Failure while processing a specific entry.
    #[error("entry {index}{}: {source}", display_path(.path))]
    Entry {
        index: usize,
        path: Option<String>,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn corrupt(position: usize, reason: impl Into<String>) -> Self {
        Self::CorruptBlock {
            position,
            reason: reason.into(),
        }
    }

    /// The underlying error with any per-entry context stripped.
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::Entry { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

fn display_path(path: &Option<String>) -> String {
    path.as_deref()
        .map(|p| format!(" ({p})"))
        .unwrap_or_default()
}

/// Result type for NXPK operations.
pub type Result<T> = std::result::Result<T, Error>;
