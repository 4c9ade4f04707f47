//! Backpressure-aware file publisher
//!
//! [`FileReadSource`] reads a file sequentially and hands fixed-size chunks to
//! a single [`Subscriber`](readahead_types::Subscriber), strictly at the rate
//! the subscriber requests them.
//!
//! # Read-ahead
//!
//! A read is only started while demand is known. When it finishes, the chunk
//! is either delivered straight away (demand left over, so the next read
//! starts immediately) or held back in a single look-ahead slot until the next
//! `request`. So:
//!
//! - at most one read is ever in flight,
//! - at most one finished chunk is ever buffered,
//! - chunks are delivered in file order.
//!
//! Demand signals (any thread) and read completions (runtime worker threads)
//! meet in [`state::DemandState`], a single atomic cell updated by
//! compare-and-swap.
//!
//! # Example
//!
//! ```ignore
//! use readahead_file_source::{FileReadSource, PublisherStream};
//! use futures::StreamExt;
//!
//! let source = FileReadSource::open("data.bin").await?;
//! let mut chunks = PublisherStream::new(source);
//! while let Some(chunk) = chunks.next().await {
//!     let chunk = chunk?;
//!     // Process chunk...
//! }
//! ```

pub mod config;
mod dispatch;
pub mod metrics;
pub mod reader;
mod source;
pub mod state;
mod stream;
mod subscription;

pub use config::{SourceConfig, DEFAULT_CHUNK_SIZE};
pub use metrics::{MetricsSnapshot, ReadMetrics};
pub use reader::{ChunkReader, TokioFileReader};
pub use source::FileReadSource;
pub use stream::{read_chunks, PublisherStream};

// Re-export the boundary types so callers need only one dependency
pub use readahead_types::{Error, Publisher, Result, Subscriber, Subscription};
