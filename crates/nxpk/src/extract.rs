//! Extraction pipeline: read, decompress, name and write entries.
//!
//! Every entry owns an independent byte range of the archive, so entries
//! can be processed in any order. With the `parallel` feature they are
//! spread over the rayon pool.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use crate::archive::NxpkArchive;
use crate::entry::IndexEntry;
use crate::sniff::sniff_extension;
use crate::{Error, Result};

/// Default output directory: the archive path without its extension.
///
/// `data/res.npk` extracts into `data/res`. An archive without an
/// extension gets `_extracted` appended instead so the directory cannot
/// collide with the archive itself.
pub fn default_output_root(archive: &Path) -> PathBuf {
    if archive.extension().is_some() {
        archive.with_extension("")
    } else {
        let mut name = archive.as_os_str().to_owned();
        name.push("_extracted");
        PathBuf::from(name)
    }
}

/// Options for [`extract`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Directory all entries are written under.
    pub output_root: PathBuf,
    /// Record failing entries and carry on instead of stopping at the first.
    pub keep_going: bool,
}

impl ExtractOptions {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            keep_going: false,
        }
    }

    /// Options writing to [`default_output_root`] of `archive`.
    pub fn for_archive(archive: &Path) -> Self {
        Self::new(default_output_root(archive))
    }

    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }
}

/// Decompressed entry contents together with where they belong.
#[derive(Debug, Clone)]
pub struct ExtractedAsset {
    /// Position of the entry in the index table.
    pub index: usize,
    /// Output path relative to the extraction root.
    pub relative_path: PathBuf,
    pub data: Vec<u8>,
}

impl ExtractedAsset {
    /// Write the asset below `root`, creating directories as needed.
    pub fn write_to(&self, root: &Path) -> Result<PathBuf> {
        let path = root.join(&self.relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &self.data)?;
        Ok(path)
    }
}

/// Outcome of an extraction run.
#[derive(Debug, Default)]
pub struct ExtractSummary {
    /// Files written.
    pub written: usize,
    /// Decompressed bytes written.
    pub bytes: u64,
    /// Per-entry failures; only populated with `keep_going`.
    pub failures: Vec<Error>,
}

impl NxpkArchive {
    /// Decompress an entry and work out its output path.
    ///
    /// Entries with a side-map path keep it (with separators normalized);
    /// the rest are named by table index with a sniffed extension.
    pub fn extract_asset(&self, entry: &IndexEntry) -> Result<ExtractedAsset> {
        let attempt = || -> Result<ExtractedAsset> {
            let data = self.read(entry)?;
            let relative_path = match entry.relative_path()? {
                Some(path) => path,
                None => PathBuf::from(format!(
                    "{}.{}",
                    entry.fallback_stem(),
                    sniff_extension(&data)
                )),
            };
            Ok(ExtractedAsset {
                index: entry.index(),
                relative_path,
                data,
            })
        };
        attempt().map_err(|e| in_entry(entry, e))
    }
}

fn in_entry(entry: &IndexEntry, source: Error) -> Error {
    Error::Entry {
        index: entry.index(),
        path: entry.path().map(str::to_string),
        source: Box::new(source),
    }
}

/// Extract `entries` from `archive` into `options.output_root`.
///
/// `progress` is called once per finished entry, successful or not, and
/// may be called from several threads.
pub fn extract<F>(
    archive: &NxpkArchive,
    entries: &[&IndexEntry],
    options: &ExtractOptions,
    progress: F,
) -> Result<ExtractSummary>
where
    F: Fn(&IndexEntry) + Sync,
{
    fs::create_dir_all(&options.output_root)?;
    debug!(
        "extracting {} entries into {}",
        entries.len(),
        options.output_root.display()
    );

    let written = AtomicUsize::new(0);
    let bytes = AtomicU64::new(0);
    let failures = Mutex::new(Vec::new());

    let step = |entry: &&IndexEntry| -> Result<()> {
        let result = archive.extract_asset(entry).and_then(|asset| {
            asset
                .write_to(&options.output_root)
                .map(|_| asset.data.len() as u64)
                .map_err(|e| in_entry(entry, e))
        });

        match result {
            Ok(len) => {
                written.fetch_add(1, Ordering::Relaxed);
                bytes.fetch_add(len, Ordering::Relaxed);
            }
            Err(e) if options.keep_going => {
                warn!("{e}");
                failures
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(e);
            }
            Err(e) => return Err(e),
        }
        progress(entry);
        Ok(())
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        entries.par_iter().try_for_each(step)?;
    }
    #[cfg(not(feature = "parallel"))]
    entries.iter().try_for_each(step)?;

    Ok(ExtractSummary {
        written: written.into_inner(),
        bytes: bytes.into_inner(),
        failures: failures.into_inner().unwrap_or_else(PoisonError::into_inner),
    })
}

/// Extract every entry of `archive`.
pub fn extract_all<F>(
    archive: &NxpkArchive,
    options: &ExtractOptions,
    progress: F,
) -> Result<ExtractSummary>
where
    F: Fn(&IndexEntry) + Sync,
{
    let entries: Vec<&IndexEntry> = archive.iter().collect();
    extract(archive, &entries, options, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::build_archive;
    use crate::sidemap::SideMap;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn files_under(root: &Path) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for item in fs::read_dir(dir).unwrap() {
                let path = item.unwrap().path();
                if path.is_dir() {
                    pending.push(path);
                } else {
                    found.push(path.strip_prefix(root).unwrap().to_path_buf());
                }
            }
        }
        found.sort();
        found
    }

    #[test]
    fn test_default_output_root() {
        assert_eq!(
            default_output_root(Path::new("data/res.npk")),
            PathBuf::from("data/res")
        );
        assert_eq!(
            default_output_root(Path::new("data/res")),
            PathBuf::from("data/res_extracted")
        );
    }

    #[test]
    fn test_single_deflate_entry_without_side_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.npk");
        let stored = zlib(b"hello world");
        fs::write(&path, build_archive(&[(0x51, 1, &stored, 11)])).unwrap();

        let archive = NxpkArchive::open(&path).unwrap();
        let options = ExtractOptions::for_archive(&path);
        let summary = extract_all(&archive, &options, |_| {}).unwrap();

        assert_eq!(summary.written, 1);
        assert_eq!(summary.bytes, 11);
        let root = dir.path().join("hello");
        assert_eq!(files_under(&root), vec![PathBuf::from("00000000.dat")]);
        assert_eq!(fs::read(root.join("00000000.dat")).unwrap(), b"hello world");
    }

    #[test]
    fn test_sniffed_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.npk");
        let entries: [(u32, u32, &[u8], u32); 3] = [
            (1, 0, b"{\"a\":1}", 7),
            (2, 0, b"<root/>", 7),
            (3, 0, b"", 0),
        ];
        fs::write(&path, build_archive(&entries)).unwrap();

        let archive = NxpkArchive::open(&path).unwrap();
        let options = ExtractOptions::new(dir.path().join("out"));
        extract_all(&archive, &options, |_| {}).unwrap();

        assert_eq!(
            files_under(&options.output_root),
            vec![
                PathBuf::from("00000000.json"),
                PathBuf::from("00000001.xml"),
                PathBuf::from("00000002.none"),
            ]
        );
    }

    #[test]
    fn test_side_map_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("res.npk");
        fs::write(
            &path,
            build_archive(&[(10, 0, b"{}", 2), (11, 2, &[0x40, b'd', b'a', b't', b'a'], 4)]),
        )
        .unwrap();
        fs::write(
            SideMap::path_for(&path),
            "ui\\layout\\main.json\t10\t2\t0\t2\t0\t24\nreadme\t11\t5\t0\t4\t0\t26\n",
        )
        .unwrap();

        let archive = NxpkArchive::open(&path).unwrap();
        assert!(archive.has_side_map());
        let options = ExtractOptions::for_archive(&path);
        let summary = extract_all(&archive, &options, |_| {}).unwrap();
        assert_eq!(summary.written, 2);

        let root = dir.path().join("res");
        assert_eq!(
            files_under(&root),
            vec![
                PathBuf::from("readme"),
                PathBuf::from("ui").join("layout").join("main.json"),
            ]
        );
        assert_eq!(fs::read(root.join("readme")).unwrap(), b"data");
    }

    #[test]
    fn test_unresolved_sign_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("res.npk");
        fs::write(&path, build_archive(&[(10, 0, b"a", 1), (99, 0, b"b", 1)])).unwrap();
        fs::write(SideMap::path_for(&path), "a.txt\t10\t1\t0\t1\t0\t24\n").unwrap();

        match NxpkArchive::open(&path) {
            Err(Error::UnresolvedPathMapping { index, sign }) => {
                assert_eq!(index, 1);
                assert_eq!(sign, 99);
            }
            other => panic!("expected UnresolvedPathMapping, got {:?}", other),
        }
        assert!(!default_output_root(&path).exists());
    }

    #[test]
    fn test_corrupt_entry_stops_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.npk");
        // Entry 1 is a block stream with a zero match offset.
        fs::write(
            &path,
            build_archive(&[(1, 0, b"fine", 4), (2, 2, &[0x11, b'a', 0, 0], 5)]),
        )
        .unwrap();

        let archive = NxpkArchive::open(&path).unwrap();
        let err = extract_all(&archive, &ExtractOptions::for_archive(&path), |_| {}).unwrap_err();
        match &err {
            Error::Entry { index, path, .. } => {
                assert_eq!(*index, 1);
                assert!(path.is_none());
            }
            other => panic!("expected Entry, got {:?}", other),
        }
        assert!(matches!(err.root_cause(), Error::CorruptBlock { .. }));
        assert!(err.to_string().starts_with("entry 1: corrupt block"));
    }

    #[test]
    fn test_keep_going_collects_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.npk");
        fs::write(
            &path,
            build_archive(&[(1, 1, b"not zlib", 4), (2, 0, b"fine", 4)]),
        )
        .unwrap();

        let archive = NxpkArchive::open(&path).unwrap();
        let options = ExtractOptions::for_archive(&path).keep_going(true);
        let seen = AtomicUsize::new(0);
        let summary = extract_all(&archive, &options, |_| {
            seen.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();

        assert_eq!(seen.into_inner(), 2);
        assert_eq!(summary.written, 1);
        assert_eq!(summary.failures.len(), 1);
        assert!(matches!(
            summary.failures[0].root_cause(),
            Error::CorruptBlock { .. }
        ));
        assert_eq!(
            files_under(&options.output_root),
            vec![PathBuf::from("00000001.dat")]
        );
    }

    #[test]
    fn test_unsafe_side_map_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("res.npk");
        fs::write(&path, build_archive(&[(5, 0, b"x", 1)])).unwrap();
        fs::write(SideMap::path_for(&path), "..\\escape.txt\t5\t1\t0\t1\t0\t24\n").unwrap();

        let archive = NxpkArchive::open(&path).unwrap();
        let err = extract_all(&archive, &ExtractOptions::for_archive(&path), |_| {}).unwrap_err();
        assert!(matches!(err.root_cause(), Error::UnsafeEntryPath(_)));
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn test_selection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sel.npk");
        fs::write(&path, build_archive(&[(1, 0, b"one", 3), (2, 0, b"two", 3)])).unwrap();

        let archive = NxpkArchive::open(&path).unwrap();
        let chosen: Vec<&IndexEntry> = archive.iter().filter(|e| e.index() == 1).collect();
        let options = ExtractOptions::for_archive(&path);
        let summary = extract(&archive, &chosen, &options, |_| {}).unwrap();

        assert_eq!(summary.written, 1);
        assert_eq!(
            files_under(&options.output_root),
            vec![PathBuf::from("00000001.dat")]
        );
    }
}
