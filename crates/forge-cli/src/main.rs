//! Standalone command-line front-end: classify a single file and, if it
//! turns out to be an encrypted container in a supported format, run a
//! cracking job against it.
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use forge_crack::CrackError;
use forge_ports::descriptor::FormatDescriptor;
use forge_ports::job::{CandidateSource, CrackJob, JobOutcome, Scope};
use forge_ports::ports::Notifier;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};
use tracing_subscriber::prelude::*;

mod config;
mod ports;

use ports::{SidecarArtifacts, StandaloneFiles, StandaloneTags, TracingNotifier, TracingProgress};

/// Detect and, optionally, crack the password of an encrypted container.
#[derive(Debug, Parser)]
#[command(name = "forge", version, about)]
struct Cli {
    /// File to classify, e.g. an archive, office document, PDF, BitLocker
    /// or LUKS volume image
    path: PathBuf,

    /// Only classify the file; do not attempt to crack it
    #[arg(long)]
    classify_only: bool,

    /// Worker thread count (defaults to the configured or detected parallelism)
    #[arg(long)]
    workers: Option<usize>,

    /// Path to a plain-text wordlist, one candidate per line
    #[arg(long)]
    wordlist: Option<PathBuf>,

    /// Use a bundled common-password list of the given size (10, 100, 1000)
    #[arg(long)]
    common: Option<u32>,

    /// Characters to exhaustively enumerate over, e.g. "abc0123456789"
    #[arg(long)]
    charset: Option<String>,

    /// Minimum length for exhaustive enumeration
    #[arg(long, default_value_t = 1)]
    min_len: u32,

    /// Maximum length for exhaustive enumeration (0 disables enumeration)
    #[arg(long, default_value_t = 0)]
    max_len: u32,

    /// Harvest candidate strings from files alongside the target
    #[arg(long)]
    strings: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = config::Config::load()?;
    let object_id = cli.path.to_string_lossy().into_owned();

    let descriptor = match classify(&object_id) {
        Some(descriptor) => descriptor,
        None => {
            println!("not a recognized encrypted-container format");
            return Ok(());
        }
    };

    println!("{}", serde_json::to_string_pretty(&descriptor)?);

    if cli.classify_only {
        return Ok(());
    }

    let mut sources = Vec::new();
    if let Some(path) = &cli.wordlist {
        sources.push(CandidateSource::WordlistFile(path.to_string_lossy().into_owned()));
    }
    if let Some(n) = cli.common {
        sources.push(CandidateSource::CommonList(n));
    }
    if cli.strings {
        sources.push(CandidateSource::StringsFromScope(Scope::Folder));
    }
    if let Some(charset) = &cli.charset {
        if cli.max_len > 0 {
            sources.push(CandidateSource::RandomEnumeration {
                charset: charset.chars().collect(),
                min_len: cli.min_len,
                max_len: cli.max_len,
            });
        }
    }
    if sources.is_empty() {
        sources.push(CandidateSource::CommonList(config.default_common_list));
    }

    let worker_count = cli.workers.unwrap_or(config.worker_count).max(1);
    let job = CrackJob::new(descriptor, worker_count, sources, Vec::new());

    let files = StandaloneFiles;
    let tags = StandaloneTags;
    let artifacts = SidecarArtifacts::load(&object_id);
    let progress = TracingProgress;
    let notifier = TracingNotifier;

    match forge_crack::run(&job, &object_id, &files, &tags, &artifacts, &progress) {
        Ok(JobOutcome::Found(password)) => {
            notifier.info("password found", &password);
            println!("password: {password}");
        }
        Ok(JobOutcome::Exhausted) => {
            notifier.info("exhausted", "no candidate matched");
            println!("exhausted: no password found");
        }
        Ok(JobOutcome::Cancelled) => {
            notifier.warn("cancelled", "job was cancelled before completion");
            println!("cancelled");
        }
        Err(CrackError::UnsupportedFormat) => {
            notifier.warn("unsupported", "this format has no per-candidate verifier");
            println!("cracking is not supported for this container format");
        }
        Err(err) => {
            notifier.error("cracking failed", &err.to_string());
            return Err(err.into());
        }
    }

    Ok(())
}

/// The mixed-endianness BitLocker signature GUID, at volume offset 160.
const BITLOCKER_SIGNATURE: [u8; 15] = [
    0x3B, 0xD6, 0x67, 0x49, 0x2E, 0x29, 0xD8, 0x4A, 0x83, 0x99, 0xF6, 0xA3, 0x39, 0xE3, 0xD0,
];

/// Sniffs `path`'s format by magic bytes and dispatches to the matching
/// classifier, in the order ZIP, PDF, OLE/Office, BitLocker, LUKS.
fn classify(path: &str) -> Option<FormatDescriptor> {
    let header = {
        let file = File::open(path).ok()?;
        let mut buf = Vec::new();
        file.take(175).read_to_end(&mut buf).ok()?;
        buf
    };
    let header = header.as_slice();
    let path = PathBuf::from(path);

    if header.starts_with(b"PK") {
        return classify_zip(&path);
    }
    if header.starts_with(b"%PDF") {
        return forge_pdf::classify(&path).ok();
    }
    if header.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]) {
        return forge_office::classify(&path).ok();
    }
    if header.len() >= 175 && header[160..175] == BITLOCKER_SIGNATURE {
        return forge_bitlocker::classify(&path).ok();
    }
    if header.starts_with(b"LUKS") {
        return forge_luks::classify(&path).ok();
    }
    None
}

fn classify_zip(path: &std::path::Path) -> Option<FormatDescriptor> {
    let file = File::open(path).ok()?;
    let archive = forge_zip::ZipArchive::parse(file).ok()?;
    let archive_path = path.to_string_lossy();
    archive
        .entries
        .iter()
        .filter(|entry| entry.is_encrypted())
        .find_map(|entry| forge_zip::descriptor::to_format_descriptor(&archive_path, entry))
}
