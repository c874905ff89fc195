//! NXPK game-asset container reader.
//!
//! An NXPK archive is a 24-byte header, the entry payloads, and a table of
//! 28-byte index records. Entries are stored raw, zlib-compressed, or in an
//! LZ4-style block format decoded by [`block`]. An optional `<archive>.map`
//! side file recovers the original relative paths.
//!
//! - Header and index parsing ([`parse_index`], [`NxpkArchive`])
//! - Path recovery from the side map ([`SideMap`])
//! - Block format decoding ([`block::decompress_block`])
//! - Extension sniffing for unnamed entries ([`sniff_extension`])
//! - Extraction to disk, in parallel with the `parallel` feature ([`extract`])
//!
//! # Example
//!
//! ```no_run
//! use nxpk::{extract_all, ExtractOptions, NxpkArchive};
//!
//! let archive = NxpkArchive::open("res.npk")?;
//!
//! for entry in archive.iter() {
//!     println!("{}: {} bytes", entry.display_name(), entry.original_length());
//! }
//!
//! let options = ExtractOptions::for_archive(archive.path());
//! let summary = extract_all(&archive, &options, |_| {})?;
//! println!("wrote {} files", summary.written);
//! # Ok::<(), nxpk::Error>(())
//! ```

mod archive;
pub mod block;
mod decompress;
mod entry;
mod error;
mod extract;
pub mod format;
mod sidemap;
mod sniff;

pub use archive::{parse_index, ArchiveHeader, NxpkArchive};
pub use decompress::{decompress_deflate, decompress_entry};
pub use entry::IndexEntry;
pub use error::{Error, Result};
pub use extract::{
    default_output_root, extract, extract_all, ExtractOptions, ExtractSummary, ExtractedAsset,
};
pub use format::CompressionFlag;
pub use sidemap::{SideMap, SideMapRow};
pub use sniff::sniff_extension;
