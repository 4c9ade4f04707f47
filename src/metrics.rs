//! Metrics report written at the end of a run

use crate::file_source::{MetricsSnapshot, ReadMetrics};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Single metrics entry (one JSON document)
#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsEntry {
    pub timestamp: String,
    pub path: PathBuf,
    pub chunk_size: usize,
    pub reads_issued: u64,
    pub bytes_read: u64,
    pub chunks_delivered: u64,
    pub peak_in_flight: u64,
    pub throughput_mb_per_sec: f64,
    pub elapsed_secs: f64,
}

impl MetricsEntry {
    pub fn from_snapshot(
        path: &Path,
        chunk_size: usize,
        snapshot: MetricsSnapshot,
        elapsed_secs: f64,
    ) -> Self {
        let throughput_mb = if elapsed_secs > 0.0 {
            (snapshot.bytes_read as f64 / 1_000_000.0) / elapsed_secs
        } else {
            0.0
        };

        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            path: path.to_path_buf(),
            chunk_size,
            reads_issued: snapshot.reads_issued,
            bytes_read: snapshot.bytes_read,
            chunks_delivered: snapshot.chunks_delivered,
            peak_in_flight: snapshot.peak_in_flight,
            throughput_mb_per_sec: throughput_mb,
            elapsed_secs,
        }
    }
}

/// Ties a source's counters to the moment the run started
pub struct RunMetrics {
    metrics: ReadMetrics,
    start_time: Instant,
}

impl RunMetrics {
    pub fn start(metrics: ReadMetrics) -> Self {
        Self {
            metrics,
            start_time: Instant::now(),
        }
    }

    pub fn entry(&self, path: &Path, chunk_size: usize) -> MetricsEntry {
        MetricsEntry::from_snapshot(
            path,
            chunk_size,
            self.metrics.snapshot(),
            self.start_time.elapsed().as_secs_f64(),
        )
    }

    /// Write the report to `output` if one was requested.
    pub async fn emit(&self, output: Option<&Path>, path: &Path, chunk_size: usize) -> Result<()> {
        let Some(output) = output else {
            return Ok(());
        };
        let entry = self.entry(path, chunk_size);
        let json = serde_json::to_string_pretty(&entry)?;
        tokio::fs::write(output, json)
            .await
            .with_context(|| format!("Failed to write metrics to {}", output.display()))?;
        tracing::info!("Wrote read metrics to {}", output.display());
        Ok(())
    }
}
