//! NXPK archive reader.
//!
//! The archive is memory-mapped read-only. Entry data is addressed by
//! absolute offset, so any number of threads may read entries at once.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use nxpk_common::BinaryReader;
use tracing::{debug, trace};

use crate::decompress;
use crate::entry::IndexEntry;
use crate::format::{RawHeader, RawIndexRecord, MAGIC};
use crate::sidemap::SideMap;
use crate::{Error, Result};

/// Decoded container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ArchiveHeader {
    /// Number of records in the index table
    pub entry_count: u32,
    pub aux1: u32,
    pub aux2: u32,
    pub aux3: u32,
    /// Absolute offset of the index table
    pub index_offset: u32,
}

impl ArchiveHeader {
    /// Whether both mode-related words are set.
    ///
    /// Archives seen so far use 28-byte records either way, so this is
    /// reported but never used to pick a record layout.
    pub fn mode(&self) -> bool {
        self.aux1 != 0 && self.aux3 != 0
    }

    /// Size in bytes of the index table.
    pub fn index_size(&self) -> u64 {
        u64::from(self.entry_count) * RawIndexRecord::SIZE as u64
    }
}

/// Parse the header and index table of an archive held in memory.
///
/// Entries come back in table order with no paths attached.
pub fn parse_index(data: &[u8]) -> Result<(ArchiveHeader, Vec<IndexEntry>)> {
    let mut reader = BinaryReader::new(data);

    let magic = &data[..data.len().min(MAGIC.len())];
    if magic != MAGIC.as_slice() {
        return Err(Error::InvalidContainerMagic {
            actual: magic.to_vec(),
        });
    }

    let raw: RawHeader = reader.read_struct().map_err(|_| Error::TruncatedHeader {
        available: data.len(),
    })?;
    let header = ArchiveHeader {
        entry_count: raw.entry_count.get(),
        aux1: raw.aux1.get(),
        aux2: raw.aux2.get(),
        aux3: raw.aux3.get(),
        index_offset: raw.index_offset.get(),
    };

    debug!(
        "header: {} entries, index at {:#x}, aux {:#x}/{:#x}/{:#x}, mode {}",
        header.entry_count,
        header.index_offset,
        header.aux1,
        header.aux2,
        header.aux3,
        header.mode()
    );

    let offset = u64::from(header.index_offset);
    let needed = header.index_size();
    let available = (data.len() as u64).saturating_sub(offset);
    let truncated = || Error::TruncatedIndex {
        offset,
        needed,
        available,
    };
    if available < needed {
        return Err(truncated());
    }

    reader
        .seek(header.index_offset as usize)
        .map_err(|_| truncated())?;

    let mut entries = Vec::with_capacity(header.entry_count as usize);
    for index in 0..header.entry_count as usize {
        let record: RawIndexRecord = reader.read_struct().map_err(|_| truncated())?;
        entries.push(IndexEntry::from_record(index, &record));
    }

    Ok((header, entries))
}

/// An opened NXPK archive.
pub struct NxpkArchive {
    /// Memory-mapped file data
    mmap: Mmap,
    /// Path the archive was opened from
    path: PathBuf,
    header: ArchiveHeader,
    entries: Vec<IndexEntry>,
    /// Whether entry paths came from a side map
    has_side_map: bool,
}

impl NxpkArchive {
    /// Open an archive, picking up `<path>.map` automatically when present.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let side_map = SideMap::load_for(path)?;
        Self::open_with_side_map(path, side_map.as_ref())
    }

    /// Open an archive with an explicit side map (or none).
    ///
    /// Every sign in the index must be present in the side map.
    pub fn open_with_side_map<P: AsRef<Path>>(path: P, side_map: Option<&SideMap>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // The mapping is read-only and the archive is not expected to change
        // while it is open.
        let mmap = unsafe { Mmap::map(&file)? };

        let (header, mut entries) = parse_index(&mmap)?;
        if let Some(side_map) = side_map {
            side_map.resolve(&mut entries)?;
        }

        debug!(
            "opened {} ({} bytes, {} entries, side map: {})",
            path.display(),
            mmap.len(),
            entries.len(),
            side_map.is_some()
        );

        Ok(Self {
            mmap,
            path: path.to_path_buf(),
            header,
            entries,
            has_side_map: side_map.is_some(),
        })
    }

    /// Path the archive was opened from.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Archive size in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.mmap.len() as u64
    }

    #[inline]
    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// Whether entry paths were resolved from a side map.
    #[inline]
    pub fn has_side_map(&self) -> bool {
        self.has_side_map
    }

    /// Get the number of entries.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Entries in table order.
    #[inline]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Iterate over entries in table order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> + '_ {
        self.entries.iter()
    }

    /// Get entry by index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&IndexEntry> {
        self.entries.get(index)
    }

    /// Stored (still compressed) bytes of an entry.
    pub fn raw_data(&self, entry: &IndexEntry) -> Result<&[u8]> {
        let start = entry.offset() as usize;
        start
            .checked_add(entry.stored_length() as usize)
            .and_then(|end| self.mmap.get(start..end))
            .ok_or_else(|| Error::TruncatedEntryData {
                offset: entry.offset(),
                length: entry.stored_length(),
                archive_size: self.size(),
            })
    }

    /// Read entry contents, decompressing as the flag requires.
    pub fn read(&self, entry: &IndexEntry) -> Result<Vec<u8>> {
        trace!("reading entry {} ({})", entry.index(), entry.display_name());

        let stored = self.raw_data(entry)?;
        decompress::decompress_entry(entry.flag(), stored, entry.original_length() as usize)
    }

    /// Read entry by index.
    pub fn read_index(&self, index: usize) -> Result<Vec<u8>> {
        let entry = self
            .entries
            .get(index)
            .ok_or(Error::EntryIndexOutOfRange {
                index,
                count: self.entries.len(),
            })?;
        self.read(entry)
    }
}

impl std::fmt::Debug for NxpkArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NxpkArchive")
            .field("path", &self.path)
            .field("entries", &self.entries.len())
            .finish()
    }
}
