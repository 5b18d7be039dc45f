//! mobilize-normalize: split Mobilize attendances into relational CSV files
//!
//! Usage:
//!   # Read a JSON array of attendances, write CSVs to ./output
//!   mobilize-normalize data/attendances.json
//!
//!   # Read NDJSON from stdin, write JSON Lines to a directory
//!   cat attendances.jsonl | mobilize-normalize --format jsonl -o ./tables

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use mobilize_melt::{normalize_attendances, CsvSink, JsonlSink};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Jsonl,
}

#[derive(Parser, Debug)]
#[command(name = "mobilize-normalize")]
#[command(about = "Normalize nested Mobilize attendances into relational tables", long_about = None)]
struct Args {
    /// Input file: a JSON array, a single object, or NDJSON (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Directory receiving one file per collection
    #[arg(long, short = 'o', default_value = "output")]
    output_dir: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Csv)]
    format: Format,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "mobilize_melt=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let reader: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(std::io::stdin()),
    };

    let batch = match args.format {
        Format::Csv => {
            let mut sink = CsvSink::new(&args.output_dir)?;
            normalize_attendances(reader, &mut sink)?
        }
        Format::Jsonl => {
            let mut sink = JsonlSink::new(&args.output_dir)?;
            normalize_attendances(reader, &mut sink)?
        }
    };

    info!(
        attendances = batch.summary().attendances,
        output_dir = %args.output_dir.display(),
        "processed attendances"
    );

    Ok(())
}
