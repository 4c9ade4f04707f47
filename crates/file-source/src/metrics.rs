//! Counters for a single read source

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared counters, cheap to clone and safe to read while the source runs
#[derive(Clone, Default)]
pub struct ReadMetrics {
    inner: Arc<Counters>,
}

#[derive(Default)]
struct Counters {
    reads_issued: AtomicU64,
    bytes_read: AtomicU64,
    chunks_delivered: AtomicU64,
    in_flight: AtomicU64,
    peak_in_flight: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub reads_issued: u64,
    pub bytes_read: u64,
    pub chunks_delivered: u64,
    pub in_flight: u64,
    pub peak_in_flight: u64,
}

impl ReadMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn read_started(&self) {
        self.inner.reads_issued.fetch_add(1, Ordering::Relaxed);
        let now = self.inner.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.inner.peak_in_flight.fetch_max(now, Ordering::AcqRel);
    }

    pub(crate) fn read_finished(&self, bytes: usize) {
        self.inner.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.inner
            .bytes_read
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn chunk_delivered(&self) {
        self.inner.chunks_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Highest number of reads that were ever outstanding at once
    pub fn peak_in_flight(&self) -> u64 {
        self.inner.peak_in_flight.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reads_issued: self.inner.reads_issued.load(Ordering::Relaxed),
            bytes_read: self.inner.bytes_read.load(Ordering::Relaxed),
            chunks_delivered: self.inner.chunks_delivered.load(Ordering::Relaxed),
            in_flight: self.inner.in_flight.load(Ordering::Acquire),
            peak_in_flight: self.inner.peak_in_flight.load(Ordering::Acquire),
        }
    }
}
