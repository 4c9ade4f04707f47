//! readahead
//!
//! Command-line front end for [`readahead_file_source`], which publishes a
//! local file as a sequence of chunks under subscriber-controlled demand.
//!
//! # CLI Usage
//!
//! ```bash
//! # Stream a file to stdout, 64 KiB at a time, 8 chunks per request
//! readahead cat data.bin --chunk-size 65536 --request-batch 8 > copy.bin
//!
//! # Check the published chunks reassemble into the file, recording metrics
//! readahead verify data.bin --emit-metrics metrics.json
//! ```

use clap::Parser;
use std::path::PathBuf;

pub mod cat;
pub mod metrics;
pub mod verify;

pub use readahead_file_source as file_source;

use file_source::SourceConfig;

#[derive(Parser, Clone, Debug)]
pub struct ReadOpts {
    /// Bytes per chunk
    #[arg(long, default_value_t = file_source::DEFAULT_CHUNK_SIZE, env = "READAHEAD_CHUNK_SIZE")]
    pub chunk_size: usize,

    /// Chunks requested from the publisher at a time
    #[arg(long, default_value_t = 1, env = "READAHEAD_REQUEST_BATCH")]
    pub request_batch: u32,

    /// Write read metrics as JSON to this path when the run finishes
    #[arg(long, value_name = "PATH")]
    pub emit_metrics: Option<PathBuf>,
}

impl Default for ReadOpts {
    fn default() -> Self {
        Self {
            chunk_size: file_source::DEFAULT_CHUNK_SIZE,
            request_batch: 1,
            emit_metrics: None,
        }
    }
}

impl ReadOpts {
    pub fn source_config(&self) -> SourceConfig {
        SourceConfig::with_chunk_size(self.chunk_size)
    }
}
