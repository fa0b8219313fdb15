//! # audalf-inspect
//!
//! Prints the header of an AUDALF document and, with `--entries`, every entry
//! with its offset. Input is a file path or a hex string.
//!
//! ```text
//! audalf-inspect samples/bytes.audalf
//! audalf-inspect --entries 415544410100000020000000...
//! RUST_LOG=audalf=trace audalf-inspect -e doc.audalf
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
mod report;

use config::InspectorConfig;

#[derive(Parser)]
#[command(name = "audalf-inspect")]
#[command(about = "Inspect AUDALF documents: header fields, key type and entries")]
#[command(version)]
struct Cli {
    /// File holding an AUDALF document, or the document as a hex string
    input: String,

    /// Treat the input as hex even if a file with that name exists
    #[arg(long)]
    hex: bool,

    /// Decode and list every entry
    #[arg(short, long)]
    entries: bool,

    /// TOML file with decoder settings and listing limits
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse hex input, tolerating whitespace, `_` separators and a `0x` prefix
fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let digits: String = trimmed
        .strip_prefix("0x")
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect();
    hex::decode(&digits).context("input is neither an existing file nor a valid hex string")
}

fn load_input(input: &str, force_hex: bool) -> Result<Vec<u8>> {
    let path = Path::new(input);
    if !force_hex && path.is_file() {
        info!(path = %path.display(), "loading file");
        return std::fs::read(path).with_context(|| format!("reading {}", path.display()));
    }
    parse_hex(input)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => InspectorConfig::load(path)?,
        None => InspectorConfig::default(),
    };
    debug!(?config, "inspector configuration");

    let bytes = load_input(&cli.input, cli.hex)?;
    if bytes.is_empty() {
        bail!("input is empty");
    }

    let report = report::inspect(&bytes, cli.entries, &config)?;
    if report.header.is_some() {
        println!("{}", "✅ AUDALF document".green());
    } else {
        println!("{}", "❌ Not an AUDALF document".red());
    }
    print!("{report}");

    Ok(())
}
