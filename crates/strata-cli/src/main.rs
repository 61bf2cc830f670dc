//! strata - dump binary files through a typed field layout
//!
//! This tool decodes binary files with a comma-separated field layout,
//! either once, repeatedly until the data ends, or once per framed record.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use strata_core::layout::parse_delimiter;
use strata_core::{
    Deserializer, DeserializerConfig, Encoding, FileSource, Frame, Layout, LengthPrefixed,
    RecordFraming, TaskTimer, Terminated, Value, Verbosity, DEFAULT_CHUNK_SIZE,
};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Dump binary files through a typed field layout
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Field layout, e.g. "u32,str,u32s,skip:4,raw:8,until:|"
    #[arg(short, long)]
    layout: Layout,

    /// Decode unsigned 32-bit values and counts as varints
    #[arg(long)]
    varint: bool,

    /// Bytes requested from the file per refill
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Load each file into memory instead of streaming it
    #[arg(long)]
    in_memory: bool,

    /// Byte offset to start decoding at
    #[arg(long, default_value = "0")]
    seek: u64,

    /// Record framing: "length" (u32 prefix) or "delim:C"
    #[arg(long, value_parser = parse_framing)]
    records: Option<Framing>,

    /// Apply the layout repeatedly until the data ends
    #[arg(long, conflicts_with = "records")]
    repeat: bool,

    /// Maximum number of records to decode per file (0 = unlimited)
    #[arg(long, default_value = "0")]
    max_records: usize,

    /// Print a short blake3 digest of each record body
    #[arg(long, requires = "records")]
    digest: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single binary file to decode
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of binary files to decode
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// How records are delimited in the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// 32-bit length prefix in the active encoding
    Length,
    /// Terminator byte
    Delimited(u8),
}

impl RecordFraming for Framing {
    fn next_frame(&self, de: &mut Deserializer<'_>) -> strata_core::Result<Frame> {
        match self {
            Framing::Length => LengthPrefixed.next_frame(de),
            Framing::Delimited(delimiter) => Terminated(*delimiter).next_frame(de),
        }
    }
}

fn parse_framing(s: &str) -> Result<Framing, String> {
    if s == "length" {
        return Ok(Framing::Length);
    }
    match s.strip_prefix("delim:") {
        Some(arg) => parse_delimiter(arg)
            .map(Framing::Delimited)
            .map_err(|e| e.to_string()),
        None => Err(format!(
            "unknown framing '{}' (expected \"length\" or \"delim:C\")",
            s
        )),
    }
}

/// Counts of what was decoded
#[derive(Debug, Default, PartialEq, Eq)]
struct DumpStats {
    files: usize,
    records: usize,
    failed_files: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    // Dispatch based on input mode
    if let Some(ref file) = cli.input.file {
        process_single_file(&cli, file, &mut out)
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&cli, directory, &mut out)
    } else {
        bail!("Either --file or --directory must be specified")
    }
}

/// Process a single binary file
fn process_single_file(cli: &Cli, file: &Path, out: &mut impl Write) -> Result<()> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    let mut stats = DumpStats::default();
    process_file(cli, file, out, &mut stats)?;
    print_summary(&stats);
    Ok(())
}

/// Process every file of a directory recursively
fn process_directory(cli: &Cli, directory: &Path, out: &mut impl Write) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut stats = DumpStats::default();
    for entry in WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        // Skip hidden files
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
        {
            continue;
        }

        if let Err(e) = process_file(cli, path, out, &mut stats) {
            // Log error but continue with other files
            warn!("Error processing {}: {:#}", path.display(), e);
            stats.failed_files += 1;
        }
    }

    print_summary(&stats);
    Ok(())
}

fn print_summary(stats: &DumpStats) {
    info!(
        "Summary: {} files decoded, {} records, {} files failed",
        stats.files, stats.records, stats.failed_files
    );
}

/// Decode one file, streaming it unless `--in-memory` is set
fn process_file(
    cli: &Cli,
    path: &Path,
    out: &mut impl Write,
    stats: &mut DumpStats,
) -> Result<()> {
    let _timer = TaskTimer::new(format!("Decoding {}", path.display()), Verbosity::Verbose);
    let encoding = if cli.varint {
        Encoding::Varint
    } else {
        Encoding::FixedBigEndian
    };

    writeln!(out, "# {}", path.display())?;

    let result = if cli.in_memory {
        let data = fs::read(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?;
        trace!("Read {} bytes from {}", data.len(), path.display());
        let mut de = Deserializer::from_slice(&data, encoding);
        dump(cli, &mut de, out)
    } else {
        let source = FileSource::open(path)?;
        let config = DeserializerConfig::new()
            .encoding(encoding)
            .chunk_size(cli.chunk_size);
        let mut de = Deserializer::from_source(source, config);
        let records = dump(cli, &mut de, out);
        de.close()?;
        records
    };
    let records = result.with_context(|| format!("Failed to decode {}", path.display()))?;

    stats.files += 1;
    stats.records += records;
    Ok(())
}

/// Decode with the layout according to the CLI mode, returning the number of
/// layout applications
fn dump(cli: &Cli, de: &mut Deserializer<'_>, out: &mut impl Write) -> Result<usize> {
    if cli.seek > 0 {
        de.seek(cli.seek)?;
    }

    let limit = match cli.max_records {
        0 => usize::MAX,
        n => n,
    };
    let mut count = 0;

    if let Some(framing) = cli.records {
        for record in de.records(&framing).take(limit) {
            let mut record = record?;
            debug!("Decoding record {} ({} bytes)", count, record.avail());

            write!(out, "{}", count)?;
            if cli.digest {
                write!(out, "\t{}", short_digest(record.data()))?;
            }
            let values = cli.layout.read(&mut record)?;
            write_values(out, &values)?;
            count += 1;
        }
    } else if cli.repeat {
        while count < limit && de.has_remaining()? {
            let offset = de.position();
            write!(out, "@{}", offset)?;
            let values = cli.layout.read(de)?;
            write_values(out, &values)?;
            count += 1;
            if de.position() == offset {
                bail!("Layout consumed no bytes at offset {}, cannot repeat", offset);
            }
        }
    } else {
        write!(out, "@{}", de.position())?;
        let values = cli.layout.read(de)?;
        write_values(out, &values)?;
        count = 1;
    }

    Ok(count)
}

fn write_values(out: &mut impl Write, values: &[Value]) -> Result<()> {
    for value in values {
        write!(out, "\t{}", value)?;
    }
    writeln!(out)?;
    Ok(())
}

/// First 8 hex characters of the blake3 hash
fn short_digest(data: &[u8]) -> String {
    let hash = blake3::hash(data);
    hash.to_hex()[..8].to_string()
}
