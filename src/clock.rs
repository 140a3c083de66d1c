//! Timestamp source for packet headers.
//!
//! Header timestamps are milliseconds since an arbitrary monotonic origin
//! (the moment the clock was created), not wall-clock epoch time. They are
//! meaningful only relative to other timestamps from the same sender; a
//! receiver cannot subtract them from its own clock to get latency.

use std::time::Instant;

/// Source of header timestamps.
pub trait Clock: Send + Sync {
    /// Milliseconds elapsed since this clock's origin.
    fn now_millis(&self) -> u64;
}

/// Monotonic millisecond clock anchored at construction time.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u64 {
        // Saturates after ~584 million years
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
