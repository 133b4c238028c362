//! Test clock — deterministic `Clock` implementation for tests.

use bedrock_core::clock::Clock;
use chrono::{DateTime, TimeZone, Utc};

/// A clock that always returns a fixed point in time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// A clock stopped at midnight UTC on the first day of `year`/`month`.
    ///
    /// # Panics
    ///
    /// Panics if `month` is not in `1..=12`.
    #[must_use]
    pub fn at_month(year: i32, month: u32) -> Self {
        Self(
            Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
                .single()
                .expect("valid year/month"),
        )
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
