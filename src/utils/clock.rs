// src/utils/clock.rs
//! Session ids and per-instance monotonic timestamps

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use ulid::Ulid;

/// Generate a new session id
pub fn new_session_id() -> String {
    Ulid::new().to_string()
}

/// Wall clock that never goes backwards for a single owner
///
/// Records from one monitor must carry non-decreasing timestamps even if the
/// system clock is stepped back.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last_ms: AtomicI64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Milliseconds since the epoch, clamped to the last value handed out
    pub fn now_millis(&self) -> i64 {
        self.observe(Utc::now().timestamp_millis())
    }

    fn observe(&self, wall_ms: i64) -> i64 {
        let previous = self.last_ms.fetch_max(wall_ms, Ordering::SeqCst);
        previous.max(wall_ms)
    }
}
