//! Time source abstraction.

use chrono::{DateTime, Datelike, Utc};

/// Abstraction over system time so that timestamps and time-partitioned
/// storage paths are reproducible in tests.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the current `(year, month)` pair, month in `1..=12`.
    fn year_month(&self) -> (i32, u32) {
        let now = self.now();
        (now.year(), now.month())
    }
}

/// Wall clock backed by [`Utc::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
