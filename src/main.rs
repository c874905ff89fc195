//! nxpk CLI - Command-line tool for unpacking NXPK game-asset containers.
//!
//! This is the main entry point for the nxpk command-line application.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use nxpk::{extract, CompressionFlag, ExtractOptions, IndexEntry, NxpkArchive};

/// nxpk - NXPK container extraction tool
#[derive(Parser)]
#[command(name = "nxpk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract files from an NXPK archive
    Extract {
        /// Path to the archive; `<archive>.map` is used for names when present
        #[arg(env = "INPUT_NPK")]
        archive: PathBuf,

        /// Output directory (default: archive path without its extension)
        #[arg(short, long, env = "OUTPUT_FOLDER")]
        output: Option<PathBuf>,

        /// Only extract entries whose name matches this glob
        #[arg(short, long)]
        filter: Option<String>,

        /// Report failing entries and continue instead of aborting
        #[arg(long)]
        keep_going: bool,
    },

    /// List contents of an NXPK archive
    List {
        /// Path to the archive
        #[arg(env = "INPUT_NPK")]
        archive: PathBuf,

        /// Only list entries whose name matches this glob
        #[arg(short, long)]
        filter: Option<String>,

        /// Show sizes, compression and sign
        #[arg(short, long)]
        detailed: bool,

        /// Print the entries as JSON
        #[arg(long, conflicts_with = "detailed")]
        json: bool,
    },

    /// Show archive header information
    Info {
        /// Path to the archive
        #[arg(env = "INPUT_NPK")]
        archive: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Extract {
            archive,
            output,
            filter,
            keep_going,
        } => {
            cmd_extract(&archive, output, filter.as_deref(), keep_going)?;
        }
        Commands::List {
            archive,
            filter,
            detailed,
            json,
        } => {
            cmd_list(&archive, filter.as_deref(), detailed, json)?;
        }
        Commands::Info { archive } => {
            cmd_info(&archive)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_archive(path: &Path) -> Result<NxpkArchive> {
    NxpkArchive::open(path)
        .with_context(|| format!("Failed to open NXPK archive {}", path.display()))
}

fn compile_filter(filter: Option<&str>) -> Result<Option<Pattern>> {
    filter
        .map(|f| Pattern::new(f).with_context(|| format!("Invalid filter pattern {f:?}")))
        .transpose()
}

/// Entries selected by an optional glob over their display name.
fn select<'a>(archive: &'a NxpkArchive, pattern: Option<&Pattern>) -> Vec<&'a IndexEntry> {
    archive
        .iter()
        .filter(|e| {
            pattern.map_or(true, |p| p.matches(&e.display_name().replace('\\', "/")))
        })
        .collect()
}

fn cmd_extract(
    archive_path: &Path,
    output: Option<PathBuf>,
    filter: Option<&str>,
    keep_going: bool,
) -> Result<()> {
    println!("Opening NXPK archive: {}", archive_path.display());

    let start = Instant::now();
    let pattern = compile_filter(filter)?;
    let archive = open_archive(archive_path)?;

    println!(
        "Loaded {} entries in {:?}{}",
        archive.entry_count(),
        start.elapsed(),
        if archive.has_side_map() { " (names from side map)" } else { "" }
    );

    let entries = select(&archive, pattern.as_ref());
    debug!(
        "filter {:?} selected {} of {} entries",
        pattern.as_ref().map(Pattern::as_str),
        entries.len(),
        archive.entry_count()
    );
    let options = match output {
        Some(root) => ExtractOptions::new(root),
        None => ExtractOptions::for_archive(archive_path),
    }
    .keep_going(keep_going);

    println!(
        "Extracting {} entries to {}...",
        entries.len(),
        options.output_root.display()
    );

    let pb = ProgressBar::new(entries.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let result = extract(&archive, &entries, &options, |_| pb.inc(1));
    pb.finish_and_clear();
    let summary = result.context("Extraction failed")?;
    info!(
        "wrote {} files under {}",
        summary.written,
        options.output_root.display()
    );

    println!(
        "Extracted {} files ({} bytes) in {:?}",
        summary.written,
        summary.bytes,
        start.elapsed()
    );

    if !summary.failures.is_empty() {
        for failure in &summary.failures {
            error!("{failure}");
        }
        anyhow::bail!("{} entries failed", summary.failures.len());
    }

    Ok(())
}

fn cmd_list(archive_path: &Path, filter: Option<&str>, detailed: bool, json: bool) -> Result<()> {
    let pattern = compile_filter(filter)?;
    let archive = open_archive(archive_path)?;
    let entries = select(&archive, pattern.as_ref());
    debug!("listing {} of {} entries", entries.len(), archive.entry_count());

    if json {
        let out = serde_json::to_string_pretty(&entries).context("Failed to serialize entries")?;
        println!("{out}");
        return Ok(());
    }

    for entry in &entries {
        if detailed {
            println!(
                "{:>12} {:>12} {:<8} {:08x} {}",
                entry.stored_length(),
                entry.original_length(),
                entry.flag().name(),
                entry.sign(),
                entry.display_name()
            );
        } else {
            println!("{}", entry.display_name());
        }
    }

    println!("\nTotal: {} entries", entries.len());

    Ok(())
}

fn cmd_info(archive_path: &Path) -> Result<()> {
    let archive = open_archive(archive_path)?;
    let header = archive.header();

    let mut counts = [0usize; 4];
    let mut stored_total = 0u64;
    let mut original_total = 0u64;
    for entry in archive.iter() {
        let slot = match entry.flag() {
            CompressionFlag::Stored => 0,
            CompressionFlag::Deflate => 1,
            CompressionFlag::Block => 2,
            CompressionFlag::Unknown(_) => 3,
        };
        counts[slot] += 1;
        stored_total += u64::from(entry.stored_length());
        original_total += u64::from(entry.original_length());
    }

    println!("Archive:        {}", archive.path().display());
    println!("Size:           {} bytes", archive.size());
    println!("Entries:        {}", header.entry_count);
    println!("Index offset:   {:#x}", header.index_offset);
    println!(
        "Aux words:      {:#x} {:#x} {:#x} (mode {})",
        header.aux1,
        header.aux2,
        header.aux3,
        u8::from(header.mode())
    );
    println!(
        "Side map:       {}",
        if archive.has_side_map() { "yes" } else { "no" }
    );
    println!(
        "Compression:    {} stored, {} deflate, {} block, {} unknown",
        counts[0], counts[1], counts[2], counts[3]
    );
    println!("Stored bytes:   {}", stored_total);
    println!("Original bytes: {}", original_total);

    Ok(())
}
