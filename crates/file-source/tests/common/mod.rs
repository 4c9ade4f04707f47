//! Shared fixtures for the file source integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;
use readahead_file_source::{
    ChunkReader, Error, FileReadSource, SourceConfig, Subscriber, Subscription,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;

pub const CHUNK: usize = 4096;

/// Deterministic, non-repeating-per-chunk content
pub fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 7 + i / CHUNK) % 251) as u8).collect()
}

pub fn write_fixture(dir: &Path, name: &str, len: usize) -> (PathBuf, Vec<u8>) {
    let path = dir.join(name);
    let data = patterned(len);
    std::fs::write(&path, &data).unwrap();
    (path, data)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "readahead_file_source=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Poll `condition` until it holds, failing the test after 10 seconds.
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

/// Subscriber that records every signal.
///
/// Optionally requests `initial` chunks from `on_subscribe` and `per_chunk`
/// more from each `on_next`, the usual pattern of a pull consumer.
pub struct RecordingSubscriber {
    subscription: OnceLock<Arc<dyn Subscription>>,
    chunks: Mutex<Vec<Bytes>>,
    completions: AtomicUsize,
    errors: Mutex<Vec<Error>>,
    late_signals: AtomicUsize,
    terminated: AtomicBool,
    done: Notify,
    initial: i64,
    per_chunk: i64,
}

impl RecordingSubscriber {
    /// Subscriber that never requests on its own
    pub fn manual() -> Arc<Self> {
        Self::requesting(0, 0)
    }

    pub fn requesting(initial: i64, per_chunk: i64) -> Arc<Self> {
        Arc::new(Self {
            subscription: OnceLock::new(),
            chunks: Mutex::new(Vec::new()),
            completions: AtomicUsize::new(0),
            errors: Mutex::new(Vec::new()),
            late_signals: AtomicUsize::new(0),
            terminated: AtomicBool::new(false),
            done: Notify::new(),
            initial,
            per_chunk,
        })
    }

    pub fn request(&self, n: i64) {
        self.subscription
            .get()
            .expect("not subscribed")
            .request(n);
    }

    pub fn cancel(&self) {
        self.subscription.get().expect("not subscribed").cancel();
    }

    pub fn chunks(&self) -> Vec<Bytes> {
        self.chunks.lock().unwrap().clone()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.lock().unwrap().len()
    }

    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.chunks.lock().unwrap().iter().map(Bytes::len).collect()
    }

    pub fn data(&self) -> Vec<u8> {
        self.chunks.lock().unwrap().concat()
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors
            .lock()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Signals that arrived after a terminal signal
    pub fn late_signals(&self) -> usize {
        self.late_signals.load(Ordering::SeqCst)
    }

    pub async fn wait_for_termination(&self) {
        tokio::time::timeout(Duration::from_secs(10), self.done.notified())
            .await
            .expect("subscriber was never terminated");
    }

    fn mark_terminal(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            self.late_signals.fetch_add(1, Ordering::SeqCst);
        }
        self.done.notify_one();
    }
}

impl Subscriber for RecordingSubscriber {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        assert!(
            self.subscription.set(subscription).is_ok(),
            "on_subscribe called twice"
        );
        if self.initial > 0 {
            self.request(self.initial);
        }
    }

    fn on_next(&self, chunk: Bytes) {
        if self.terminated.load(Ordering::SeqCst) {
            self.late_signals.fetch_add(1, Ordering::SeqCst);
        }
        self.chunks.lock().unwrap().push(chunk);
        if self.per_chunk > 0 {
            self.request(self.per_chunk);
        }
    }

    fn on_error(&self, error: Error) {
        self.errors.lock().unwrap().push(error);
        self.mark_terminal();
    }

    fn on_complete(&self) {
        self.completions.fetch_add(1, Ordering::SeqCst);
        self.mark_terminal();
    }
}

/// Observations made by a [`MemoryReader`], shared with the test
#[derive(Clone, Default)]
pub struct ReadProbe {
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
}

impl ReadProbe {
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Whether the reader has been dropped
    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// In-memory reader standing in for an I/O pool with unpredictable latency
pub struct MemoryReader {
    data: Arc<Vec<u8>>,
    probe: ReadProbe,
    jitter: bool,
    delay: Option<Duration>,
    fail_at: Option<u64>,
}

impl MemoryReader {
    pub fn new(data: Vec<u8>) -> (Self, ReadProbe) {
        let probe = ReadProbe::default();
        let reader = Self {
            data: Arc::new(data),
            probe: probe.clone(),
            jitter: false,
            delay: None,
            fail_at: None,
        };
        (reader, probe)
    }

    /// Complete every read after a random delay of up to 200µs
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every read at or beyond `offset`
    pub fn failing_at(mut self, offset: u64) -> Self {
        self.fail_at = Some(offset);
        self
    }

    pub fn into_source(self) -> FileReadSource<MemoryReader> {
        FileReadSource::from_reader(self, SourceConfig::default(), Handle::current()).unwrap()
    }
}

impl Drop for MemoryReader {
    fn drop(&mut self) {
        self.probe.released.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChunkReader for MemoryReader {
    async fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        let now = self.probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.probe.reads.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        } else if self.jitter {
            let micros = rand::rng().random_range(0..200u64);
            tokio::time::sleep(Duration::from_micros(micros)).await;
        } else {
            tokio::task::yield_now().await;
        }

        let result = match self.fail_at {
            Some(fail_at) if offset >= fail_at => Err(std::io::Error::other(format!(
                "injected failure at offset {offset}"
            ))),
            _ => {
                let start = (offset as usize).min(self.data.len());
                let end = (start + buf.len()).min(self.data.len());
                buf[..end - start].copy_from_slice(&self.data[start..end]);
                Ok(end - start)
            }
        };

        self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
