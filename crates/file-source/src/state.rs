//! Demand state machine shared by the subscription and the read completions.
//!
//! The whole state lives in one `AtomicU64`: a 3-bit tag in the high bits and
//! a demand counter in the low 61 bits. Every transition is a single
//! compare-and-swap, so a `request` racing a read completion linearizes
//! without either side blocking.
//!
//! The payload of `NextBuffer` cannot live in the word itself. It sits in a
//! one-slot hand-off next to the cell: the completion fills the slot before
//! publishing `NextBuffer`, and only the transition that moves the cell out of
//! `NextBuffer` empties it. The slot lock is therefore never contended.

use bytes::Bytes;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

const TAG_SHIFT: u32 = 61;
const COUNT_MASK: u64 = (1 << TAG_SHIFT) - 1;

/// Demand ceiling. Accumulated demand saturates here and is treated as unbounded.
pub const UNBOUNDED_DEMAND: u64 = COUNT_MASK;

const TAG_PENDING: u64 = 0;
const TAG_IDLE: u64 = 1;
const TAG_NEXT_BUFFER: u64 = 2;
const TAG_COMPLETED: u64 = 3;
const TAG_CANCELLED: u64 = 4;

const IDLE: u64 = TAG_IDLE << TAG_SHIFT;
const NEXT_BUFFER: u64 = TAG_NEXT_BUFFER << TAG_SHIFT;
const COMPLETED: u64 = TAG_COMPLETED << TAG_SHIFT;
const CANCELLED: u64 = TAG_CANCELLED << TAG_SHIFT;

fn pending(count: u64) -> u64 {
    count.min(UNBOUNDED_DEMAND)
}

fn tag(word: u64) -> u64 {
    word >> TAG_SHIFT
}

fn count(word: u64) -> u64 {
    word & COUNT_MASK
}

fn decode(word: u64) -> Phase {
    match tag(word) {
        TAG_PENDING => Phase::PendingDemand(count(word)),
        TAG_IDLE => Phase::Idle,
        TAG_NEXT_BUFFER => Phase::NextBuffer,
        TAG_COMPLETED => Phase::Completed,
        TAG_CANCELLED => Phase::Cancelled,
        other => unreachable!("corrupt read state tag {other}"),
    }
}

/// Value a transition moved the cell away from.
#[derive(Debug, PartialEq)]
pub enum ReadState {
    /// Nothing requested yet, no read issued.
    Idle,
    /// A read is in flight, or the stream already finished, with `n` unclaimed demand units.
    PendingDemand(u64),
    /// A chunk was read ahead and is waiting for demand. The caller now owns it.
    NextBuffer(Bytes),
    /// End of file was reached and has not been signalled yet.
    Completed,
    /// The subscription was cancelled. Absorbing.
    Cancelled,
}

/// Payload-free view of the cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    PendingDemand(u64),
    NextBuffer,
    Completed,
    Cancelled,
}

/// Result of one finished read.
#[derive(Debug, PartialEq)]
pub enum Event {
    Chunk(Bytes),
    Completed,
}

/// What the completion path must do with its event.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// Demand was available. Deliver the event, and after a chunk issue the next read.
    Deliver(Event),
    /// No demand. The event is parked in the cell and no further read is issued.
    Buffered,
    /// The subscription was cancelled. Drop the event.
    Discarded,
}

pub struct DemandState {
    cell: AtomicU64,
    lookahead: Mutex<Option<Bytes>>,
}

impl Default for DemandState {
    fn default() -> Self {
        Self::new()
    }
}

impl DemandState {
    pub fn new() -> Self {
        Self {
            cell: AtomicU64::new(IDLE),
            lookahead: Mutex::new(None),
        }
    }

    pub fn phase(&self) -> Phase {
        decode(self.cell.load(Ordering::Acquire))
    }

    /// Add `n` units of demand and return the state that was replaced.
    ///
    /// From `NextBuffer` or `Completed` the new demand is `n - 1`: one unit is
    /// spent on the event the caller must now deliver. From `Idle` the caller
    /// must issue the first read.
    pub fn add_demand(&self, n: NonZeroU64) -> ReadState {
        let n = n.get();
        let mut current = self.cell.load(Ordering::Acquire);
        loop {
            let next = match tag(current) {
                TAG_PENDING => pending(count(current).saturating_add(n)),
                TAG_IDLE => pending(n),
                TAG_NEXT_BUFFER | TAG_COMPLETED => pending(n - 1),
                _ => return ReadState::Cancelled,
            };
            match self.cell.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return self.claim(current),
                Err(actual) => current = actual,
            }
        }
    }

    /// Settle the event of a finished read against the outstanding demand.
    ///
    /// Only valid while a read is in flight, that is from `PendingDemand` (or
    /// `Cancelled`). Any other state means two reads overlapped, and panics.
    pub fn consume_or_buffer(&self, event: Event) -> Outcome {
        let mut current = self.cell.load(Ordering::Acquire);
        let mut stashed = false;
        loop {
            let next = match tag(current) {
                TAG_PENDING if count(current) > 0 => pending(count(current) - 1),
                TAG_PENDING => match &event {
                    Event::Chunk(chunk) => {
                        if !stashed {
                            *self.lock_lookahead() = Some(chunk.clone());
                            stashed = true;
                        }
                        NEXT_BUFFER
                    }
                    Event::Completed => COMPLETED,
                },
                TAG_CANCELLED => {
                    if stashed {
                        self.lock_lookahead().take();
                    }
                    return Outcome::Discarded;
                }
                _ => panic!(
                    "read state protocol violation: read completed while state is {:?}",
                    decode(current)
                ),
            };
            match self.cell.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) if tag(next) != TAG_PENDING => return Outcome::Buffered,
                Ok(_) => {
                    if stashed {
                        self.lock_lookahead().take();
                    }
                    return Outcome::Deliver(event);
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Move the cell to `Cancelled` and return what it held.
    pub fn cancel(&self) -> ReadState {
        let prior = self.cell.swap(CANCELLED, Ordering::AcqRel);
        self.claim(prior)
    }

    fn claim(&self, word: u64) -> ReadState {
        match decode(word) {
            Phase::Idle => ReadState::Idle,
            Phase::PendingDemand(n) => ReadState::PendingDemand(n),
            Phase::NextBuffer => match self.lock_lookahead().take() {
                Some(chunk) => ReadState::NextBuffer(chunk),
                None => panic!("read state protocol violation: NextBuffer with an empty slot"),
            },
            Phase::Completed => ReadState::Completed,
            Phase::Cancelled => ReadState::Cancelled,
        }
    }

    fn lock_lookahead(&self) -> MutexGuard<'_, Option<Bytes>> {
        self.lookahead
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
