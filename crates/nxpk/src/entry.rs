//! NXPK index entry.

use std::path::{Component, Path, PathBuf};

use crate::format::{CompressionFlag, RawIndexRecord};
use crate::{Error, Result};

/// An entry (file) within an NXPK archive.
///
/// This contains metadata about the file, not the file data itself.
/// Use [`NxpkArchive::read`](crate::NxpkArchive::read) to get the contents.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IndexEntry {
    /// Position in the index table.
    index: usize,
    /// Hash of the original relative path.
    sign: u32,
    /// Absolute offset of the stored bytes.
    offset: u32,
    /// Number of stored bytes.
    length: u32,
    /// Expected size after decompression. Advisory only.
    original_length: u32,
    hash1: u32,
    hash2: u32,
    /// Compression method.
    flag: CompressionFlag,
    /// Relative path from the side map, if one was supplied.
    path: Option<String>,
}

impl IndexEntry {
    pub(crate) fn from_record(index: usize, record: &RawIndexRecord) -> Self {
        Self {
            index,
            sign: record.sign.get(),
            offset: record.offset.get(),
            length: record.length.get(),
            original_length: record.original_length.get(),
            hash1: record.hash1.get(),
            hash2: record.hash2.get(),
            flag: CompressionFlag::from(record.flag.get()),
            path: None,
        }
    }

    pub(crate) fn set_path(&mut self, path: String) {
        self.path = Some(path);
    }

    /// Position of the entry in the index table.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Path hash used to join against the side map.
    #[inline]
    pub fn sign(&self) -> u32 {
        self.sign
    }

    /// Absolute byte offset of the stored data.
    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Number of bytes stored in the archive.
    #[inline]
    pub fn stored_length(&self) -> u32 {
        self.length
    }

    /// Expected decompressed size.
    #[inline]
    pub fn original_length(&self) -> u32 {
        self.original_length
    }

    #[inline]
    pub fn hash1(&self) -> u32 {
        self.hash1
    }

    #[inline]
    pub fn hash2(&self) -> u32 {
        self.hash2
    }

    /// Compression method.
    #[inline]
    pub fn flag(&self) -> CompressionFlag {
        self.flag
    }

    /// Path recovered from the side map, exactly as written there.
    #[inline]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Zero-padded index used to name entries without a resolved path.
    pub fn fallback_stem(&self) -> String {
        format!("{:08}", self.index)
    }

    /// Resolved path if present, otherwise the fallback stem.
    pub fn display_name(&self) -> String {
        self.path.clone().unwrap_or_else(|| self.fallback_stem())
    }

    /// Get the relative output path for a resolved entry.
    ///
    /// Windows separators are converted before the path is split, so
    /// `Data\Ui\a.png` becomes `Data/Ui/a.png` on every platform. Returns
    /// `None` for entries without a side-map path.
    pub fn relative_path(&self) -> Result<Option<PathBuf>> {
        self.path.as_deref().map(sanitize_relative).transpose()
    }
}

/// Normalize separators and reject anything that would leave the output root.
fn sanitize_relative(raw: &str) -> Result<PathBuf> {
    let normalized = raw.replace('\\', "/");
    let mut path = PathBuf::new();

    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::UnsafeEntryPath(raw.to_string()));
            }
        }
    }

    if path.as_os_str().is_empty() {
        return Err(Error::UnsafeEntryPath(raw.to_string()));
    }
    Ok(path)
}
