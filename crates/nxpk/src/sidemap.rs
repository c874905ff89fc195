//! Side map: the optional `<archive>.map` companion file.
//!
//! Each line is tab-separated with seven columns:
//!
//! ```text
//! path  sign  length  hash1  original_length  hash2  offset
//! ```
//!
//! Only `path` and `sign` are used. Byte ranges always come from the binary
//! index table.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::entry::IndexEntry;
use crate::{Error, Result};

/// One parsed side-map line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideMapRow {
    pub path: String,
    pub sign: u32,
    pub length: u32,
    pub hash1: u32,
    pub original_length: u32,
    pub hash2: u32,
    pub offset: u32,
}

const COLUMNS: usize = 7;

impl SideMapRow {
    fn parse(line_no: usize, line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < COLUMNS {
            return Err(Error::MalformedSideMap {
                line: line_no,
                reason: format!("expected {COLUMNS} columns, found {}", fields.len()),
            });
        }

        let number = |column: usize, name: &str| -> Result<u32> {
            fields[column]
                .trim()
                .parse::<u32>()
                .map_err(|e| Error::MalformedSideMap {
                    line: line_no,
                    reason: format!("{name} {:?}: {e}", fields[column]),
                })
        };

        Ok(Self {
            path: fields[0].to_string(),
            sign: number(1, "sign")?,
            length: number(2, "length")?,
            hash1: number(3, "hash1")?,
            original_length: number(4, "original_length")?,
            hash2: number(5, "hash2")?,
            offset: number(6, "offset")?,
        })
    }
}

/// Immutable sign → path lookup.
#[derive(Debug, Clone, Default)]
pub struct SideMap {
    paths: HashMap<u32, String>,
}

impl SideMap {
    /// Location of the side map for an archive: the archive path with
    /// `.map` appended (`res.npk` → `res.npk.map`).
    pub fn path_for(archive: &Path) -> PathBuf {
        let mut name = OsString::from(archive.as_os_str());
        name.push(".map");
        PathBuf::from(name)
    }

    /// Load the side map next to `archive`, if there is one.
    pub fn load_for(archive: &Path) -> Result<Option<Self>> {
        let map_path = Self::path_for(archive);
        let bytes = match fs::read(&map_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no side map at {}", map_path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let text = String::from_utf8(bytes).map_err(|e| Error::MalformedSideMap {
            line: 0,
            reason: format!("not UTF-8: {e}"),
        })?;
        let map = Self::parse(&text)?;
        debug!("loaded {} side-map paths from {}", map.len(), map_path.display());
        Ok(Some(map))
    }

    /// Parse side-map text. Blank lines are skipped; a repeated sign keeps
    /// the last path.
    pub fn parse(text: &str) -> Result<Self> {
        let rows = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| SideMapRow::parse(i + 1, line));

        let mut paths = HashMap::new();
        for row in rows {
            let row = row?;
            paths.insert(row.sign, row.path);
        }
        Ok(Self { paths })
    }

    /// Build a map from already-parsed rows.
    pub fn from_rows(rows: impl IntoIterator<Item = SideMapRow>) -> Self {
        Self {
            paths: rows.into_iter().map(|row| (row.sign, row.path)).collect(),
        }
    }

    /// Path recorded for a sign.
    pub fn get(&self, sign: u32) -> Option<&str> {
        self.paths.get(&sign).map(String::as_str)
    }

    /// Number of distinct signs.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Attach a path to every entry.
    ///
    /// Fails on the first entry whose sign has no path; entries are left
    /// untouched in that case.
    pub fn resolve(&self, entries: &mut [IndexEntry]) -> Result<()> {
        let paths = entries
            .iter()
            .map(|entry| {
                self.get(entry.sign())
                    .ok_or_else(|| Error::UnresolvedPathMapping {
                        index: entry.index(),
                        sign: entry.sign(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        for (entry, path) in entries.iter_mut().zip(paths) {
            entry.set_path(path.to_string());
        }
        Ok(())
    }
}
