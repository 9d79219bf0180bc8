//! Wall-clock abstraction for cache timestamps.
//!
//! The throttle runs on `tokio::time::Instant` (pausable in tests); cache
//! entries need a serializable creation time, so they read a [`Clock`].

use chrono::{DateTime, Utc};

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
