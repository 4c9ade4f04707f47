//! `readahead verify`: compare published chunks against a direct read

use crate::file_source::{FileReadSource, PublisherStream};
use crate::metrics::RunMetrics;
use crate::ReadOpts;
use anyhow::{bail, Context, Result};
use futures::StreamExt;
use std::path::Path;
use tracing::info;

/// Summary of a successful verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub bytes: u64,
    pub chunks: u64,
}

/// Stream `path` through the publisher and check every chunk against the
/// file's contents, failing at the first differing byte.
pub async fn verify_file(path: &Path, opts: &ReadOpts) -> Result<VerifyReport> {
    let expected = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let source = FileReadSource::open_with_config(path, opts.source_config())
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let run = RunMetrics::start(source.metrics());

    let mut chunks = PublisherStream::with_batch(source, opts.request_batch);
    let mut offset = 0usize;
    let mut count = 0u64;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.with_context(|| format!("Failed to read {}", path.display()))?;
        if chunk.is_empty() || chunk.len() > opts.chunk_size {
            bail!(
                "Chunk {count} at offset {offset} has {} bytes, expected 1..={}",
                chunk.len(),
                opts.chunk_size
            );
        }
        let end = offset + chunk.len();
        if end > expected.len() {
            bail!(
                "Published data runs past end of file ({end} > {} bytes)",
                expected.len()
            );
        }
        if let Some(pos) = chunk
            .iter()
            .zip(&expected[offset..end])
            .position(|(a, b)| a != b)
        {
            bail!("Mismatch at offset {}", offset + pos);
        }
        offset = end;
        count += 1;
    }

    if offset != expected.len() {
        bail!(
            "Published data ended at offset {offset}, file has {} bytes",
            expected.len()
        );
    }

    info!("Verified {offset} bytes in {count} chunks from {}", path.display());
    run.emit(opts.emit_metrics.as_deref(), path, opts.chunk_size)
        .await?;
    Ok(VerifyReport {
        bytes: offset as u64,
        chunks: count,
    })
}

pub async fn run(path: &Path, opts: &ReadOpts) -> Result<()> {
    let report = verify_file(path, opts).await?;
    println!(
        "OK: {} bytes in {} chunks match {}",
        report.bytes,
        report.chunks,
        path.display()
    );
    Ok(())
}
