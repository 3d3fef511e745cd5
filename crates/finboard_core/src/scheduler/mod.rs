//! Reset scheduling.
//!
//! # Responsibility
//! - Expose the trigger/job timer loop.
//! - Build the standard reset schedule: weekly on Monday 00:00 and yearly on
//!   January 1 00:00, local wall-clock time.

pub mod runner;
pub mod trigger;

pub use runner::{JobOutcome, JobResult, Scheduler, SchedulerHandle};
pub use trigger::{CalendarTrigger, Trigger};

use crate::service::reset_service::ResetService;
use crate::store::Deadline;
use chrono::Weekday;
use std::sync::Arc;
use std::time::Duration;

pub const WEEKLY_RESET_JOB: &str = "weekly_reset";
pub const YEARLY_RESET_JOB: &str = "yearly_reset";

/// Builds the scheduler that drives both periodic resets.
///
/// Each firing gets its own `timeout` deadline on the store lock.
pub fn reset_scheduler(reset: Arc<ResetService>, timeout: Duration) -> Scheduler {
    let weekly = Arc::clone(&reset);
    let yearly = reset;

    let mut scheduler = Scheduler::new();
    scheduler
        .add_job(
            WEEKLY_RESET_JOB,
            CalendarTrigger::weekly(Weekday::Mon, 0, 0),
            move || {
                weekly.weekly_reset(Deadline::after(timeout))?;
                Ok(())
            },
        )
        .add_job(
            YEARLY_RESET_JOB,
            CalendarTrigger::yearly(1, 1, 0, 0),
            move || {
                yearly.yearly_reset(Deadline::after(timeout))?;
                Ok(())
            },
        );
    scheduler
}

#[cfg(test)]
mod tests {
    use super::{reset_scheduler, JobOutcome, WEEKLY_RESET_JOB, YEARLY_RESET_JOB};
    use crate::clock::FixedClock;
    use crate::model::amount::AmountMode;
    use crate::service::reset_service::ResetService;
    use crate::store::FinanceStore;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn new_year_monday_fires_both_resets() {
        let store = Arc::new(FinanceStore::open_in_memory().unwrap());
        // 2024-01-01 was a Monday.
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 3)
            .unwrap();
        let clock = Arc::new(FixedClock::at(now));
        let reset = Arc::new(ResetService::new(store, clock, AmountMode::Integer));

        let mut scheduler = reset_scheduler(reset, Duration::from_secs(1));
        assert_eq!(scheduler.job_names(), vec![WEEKLY_RESET_JOB, YEARLY_RESET_JOB]);
        assert_eq!(
            scheduler.tick(now),
            vec![
                JobOutcome::Completed { job: WEEKLY_RESET_JOB },
                JobOutcome::Completed { job: YEARLY_RESET_JOB },
            ]
        );
    }
}
