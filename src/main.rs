//! Command-line interface for readahead
//!
//! # Usage Examples
//!
//! ```bash
//! # Copy a file to stdout through the read-ahead publisher
//! readahead cat data.bin > copy.bin
//!
//! # Larger chunks, requested eight at a time
//! READAHEAD_CHUNK_SIZE=65536 readahead cat data.bin --request-batch 8
//!
//! # Check published chunks against the file and record metrics
//! readahead verify data.bin --emit-metrics metrics.json
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`, e.g.
//! `RUST_LOG=readahead_file_source=debug`.

use clap::{Parser, Subcommand};
use readahead::{cat, verify, ReadOpts};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "readahead")]
#[command(about = "Stream files through a backpressure-aware read-ahead publisher")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a file to stdout chunk by chunk
    Cat {
        /// File to read
        path: PathBuf,

        #[command(flatten)]
        opts: ReadOpts,
    },

    /// Check that the published chunks reassemble into the file
    Verify {
        /// File to read
        path: PathBuf,

        #[command(flatten)]
        opts: ReadOpts,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Cat { path, opts } => cat::run(&path, &opts).await,
        Commands::Verify { path, opts } => verify::run(&path, &opts).await,
    }
}
