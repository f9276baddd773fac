//! Timeout policy: how long a read or write may block.
//!
//! The policy is derived from two integers and nothing else:
//!
//! | value | read                                   | write                          |
//! |-------|----------------------------------------|--------------------------------|
//! | `0`   | block until at least one byte arrives  | block until every byte is accepted |
//! | `T`   | block until the buffer fills or `T` ms | block until done or `T` ms     |
//!
//! Drivers are never asked to wait forever. An unbounded wait is driven as a
//! series of `POLL_SLICE` waits so the handle can notice a concurrent close
//! or a lost device between slices.

use std::time::{Duration, Instant};

/// Longest single wait handed to a driver.
pub const POLL_SLICE: Duration = Duration::from_millis(100);

/// Blocking behavior for one direction of transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocking {
    /// No upper bound.
    Indefinite,
    /// Give up once this much time has passed since the call began.
    Within(Duration),
}

impl Blocking {
    fn from_millis(ms: u32) -> Self {
        if ms == 0 {
            Blocking::Indefinite
        } else {
            Blocking::Within(Duration::from_millis(u64::from(ms)))
        }
    }

    /// Start the clock for a transfer beginning now.
    pub fn start(self) -> Deadline {
        match self {
            Blocking::Indefinite => Deadline::Never,
            Blocking::Within(limit) => Deadline::At(Instant::now() + limit),
        }
    }
}

/// Read/write blocking behavior for an open port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    read: Blocking,
    write: Blocking,
}

impl TimeoutPolicy {
    pub fn from_millis(read_timeout_ms: u32, write_timeout_ms: u32) -> Self {
        Self {
            read: Blocking::from_millis(read_timeout_ms),
            write: Blocking::from_millis(write_timeout_ms),
        }
    }

    pub fn read(&self) -> Blocking {
        self.read
    }

    pub fn write(&self) -> Blocking {
        self.write
    }

    /// The read bound, or `None` when reads block until data arrives.
    pub fn read_limit(&self) -> Option<Duration> {
        match self.read {
            Blocking::Indefinite => None,
            Blocking::Within(limit) => Some(limit),
        }
    }

    /// The write bound, or `None` when writes block until complete.
    pub fn write_limit(&self) -> Option<Duration> {
        match self.write {
            Blocking::Indefinite => None,
            Blocking::Within(limit) => Some(limit),
        }
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::from_millis(0, 0)
    }
}

/// The point after which a transfer stops waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    Never,
    At(Instant),
}

impl Deadline {
    /// How long the next driver call may wait, or `None` once expired.
    pub fn next_wait(&self) -> Option<Duration> {
        match *self {
            Deadline::Never => Some(POLL_SLICE),
            Deadline::At(at) => {
                let remaining = at.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    None
                } else {
                    Some(remaining.min(POLL_SLICE))
                }
            }
        }
    }
}
