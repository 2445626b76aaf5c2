//! Logical timestamps for journal entries and order bookkeeping
//!
//! Wall-clock nanoseconds, forced strictly increasing so that entries
//! written in sequence order also carry increasing timestamps even if the
//! system clock steps backwards.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Monotonic nanosecond clock
#[derive(Debug, Default)]
pub struct LogicalClock {
    last: AtomicI64,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start after a timestamp already seen (e.g. the last replayed entry)
    pub fn observe(&self, timestamp: i64) {
        self.last.fetch_max(timestamp, Ordering::SeqCst);
    }

    /// Next timestamp: max(now, last + 1)
    pub fn tick(&self) -> i64 {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        let mut prev = self.last.load(Ordering::SeqCst);
        loop {
            let next = now.max(prev.saturating_add(1));
            match self
                .last
                .compare_exchange(prev, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}
