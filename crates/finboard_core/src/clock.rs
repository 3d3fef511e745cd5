//! Wall-clock abstraction.
//!
//! # Responsibility
//! - Provide "now" as epoch milliseconds for persisted timestamps.
//! - Convert epoch milliseconds to the wall-clock time used for bucket slots
//!   and scheduler triggers.
//!
//! # Invariants
//! - `SystemClock` interprets wall-clock time in the process local time zone.
//! - `FixedClock` interprets wall-clock time in UTC so tests are independent
//!   of the host time zone.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Time source shared by services and the scheduler.
pub trait Clock: Send + Sync {
    /// Current time in epoch milliseconds.
    fn now_ms(&self) -> i64;

    /// Wall-clock reading of `epoch_ms`, or `None` when out of range.
    fn wall_time(&self, epoch_ms: i64) -> Option<NaiveDateTime>;

    /// Current wall-clock time.
    fn now_wall(&self) -> Option<NaiveDateTime> {
        self.wall_time(self.now_ms())
    }
}

/// Host clock in the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn wall_time(&self, epoch_ms: i64) -> Option<NaiveDateTime> {
        Local
            .timestamp_millis_opt(epoch_ms)
            .single()
            .map(|at| at.naive_local())
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug, Default)]
pub struct FixedClock {
    now_ms: AtomicI64,
}

impl FixedClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    /// Builds a clock pinned to a UTC wall-clock instant.
    pub fn at(wall: NaiveDateTime) -> Self {
        Self::new(wall.and_utc().timestamp_millis())
    }

    pub fn set_ms(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn wall_time(&self, epoch_ms: i64) -> Option<NaiveDateTime> {
        DateTime::<Utc>::from_timestamp_millis(epoch_ms).map(|at| at.naive_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, FixedClock};
    use chrono::NaiveDate;

    #[test]
    fn fixed_clock_reports_utc_wall_time() {
        let wall = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        let clock = FixedClock::at(wall);
        assert_eq!(clock.now_wall(), Some(wall));

        clock.advance_ms(60_000);
        assert_eq!(
            clock.now_wall(),
            Some(wall + chrono::Duration::minutes(1))
        );
    }
}
