//! Time sources for the recorder

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::Utc;

/// Monotonic milliseconds for delays, epoch milliseconds for timestamps
pub trait Clock: Send + Sync {
    fn monotonic_ms(&self) -> u64;
    fn epoch_ms(&self) -> i64;
}

#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn monotonic_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn epoch_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock moved only by the caller
#[derive(Debug, Default)]
pub struct ManualClock {
    epoch_base: i64,
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(epoch_base: i64) -> Self {
        Self {
            epoch_base,
            now: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    /// Moves to `ms`; never moves backwards.
    pub fn set(&self, ms: u64) {
        self.now.fetch_max(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn monotonic_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn epoch_ms(&self) -> i64 {
        self.epoch_base + self.monotonic_ms() as i64
    }
}
