//! Time source used to stamp activities.

use chrono::{DateTime, Utc};

/// Supplies timestamps for outbound replies, injectable so turns replay
/// deterministically in tests.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
