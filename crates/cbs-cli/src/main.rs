//! Coded bitstream dump tool: parses a raw bitstream file with one of the
//! four codec plug-ins and prints the resulting fragment as text or JSON.
//!
//! Scoped down from `bitvue-cli`'s `Info`/`Frames`/`Analyze`/`Quality`/
//! `Export`/`Batch`/`Validate` subcommand set to the one operation that
//! exercises this framework end to end: decomposing a file into units and
//! showing what came out. Container demuxing, quality metrics and batch
//! processing are out of scope here, same as they are for the library.

mod dump;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use dump::Codec;
use error::{CliError, Result};

#[derive(Parser, Debug)]
#[command(name = "cbs")]
#[command(about = "Dump a coded bitstream's unit structure", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose tracing (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a bitstream file and print its decomposed unit structure
    Dump {
        /// Bitstream file path
        file: PathBuf,

        /// Codec to parse with (av1, mpeg2, vp8, vp9)
        #[arg(short, long)]
        codec: String,

        /// Output format (text, json)
        #[arg(short = 'F', long, default_value = "text")]
        format: String,

        /// Parse the file as an extradata/configuration record rather
        /// than an ordinary packet
        #[arg(long)]
        header: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let trace_level = match cli.verbose {
        0 => None,
        1 => Some(tracing::Level::INFO),
        2 => Some(tracing::Level::DEBUG),
        _ => Some(tracing::Level::TRACE),
    };
    tracing_subscriber::fmt()
        .with_max_level(trace_level.unwrap_or(tracing::Level::WARN))
        .init();

    match cli.command {
        Commands::Dump { file, codec, format, header } => run_dump(file, &codec, &format, header, trace_level)?,
    }

    Ok(())
}

fn run_dump(file: PathBuf, codec: &str, format: &str, header: bool, trace_level: Option<tracing::Level>) -> Result<()> {
    let data = std::fs::read(&file).map_err(|source| CliError::Io { path: file, source })?;
    let codec = Codec::parse(codec)?;
    let fragment = dump::dump(codec, &data, header, trace_level)?;

    match format {
        "json" => println!("{}", dump::render_json(&fragment)?),
        "text" => print!("{}", dump::render_text(&fragment)),
        other => return Err(CliError::UnknownFormat(other.to_string())),
    }

    Ok(())
}
