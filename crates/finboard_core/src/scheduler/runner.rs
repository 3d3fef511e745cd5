//! Timer loop evaluating `(trigger, action)` jobs.
//!
//! # Responsibility
//! - Evaluate every job against one wall-clock reading per tick.
//! - Run due jobs, log failures and keep going.
//! - Stop only between ticks so a running job is never interrupted.
//!
//! # Invariants
//! - A job fires at most once per matching wall-clock minute.
//! - A failing or panicking job does not affect other jobs or later firings.

use crate::clock::Clock;
use crate::scheduler::trigger::Trigger;
use chrono::{NaiveDateTime, Timelike};
use log::{error, info, warn};
use std::error::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub type JobResult = Result<(), Box<dyn Error + Send + Sync>>;

type Action = Box<dyn FnMut() -> JobResult + Send>;

struct ScheduledJob {
    name: &'static str,
    trigger: Box<dyn Trigger>,
    action: Action,
    last_fired: Option<NaiveDateTime>,
}

/// Result of one job firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { job: &'static str },
    Failed { job: &'static str, error: String },
}

/// Ordered list of jobs driven by `tick`.
#[derive(Default)]
pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one job.
    pub fn add_job(
        &mut self,
        name: &'static str,
        trigger: impl Trigger + 'static,
        action: impl FnMut() -> JobResult + Send + 'static,
    ) -> &mut Self {
        self.jobs.push(ScheduledJob {
            name,
            trigger: Box::new(trigger),
            action: Box::new(action),
            last_fired: None,
        });
        self
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|job| job.name).collect()
    }

    /// Runs every job due at `now` and reports what happened.
    pub fn tick(&mut self, now: NaiveDateTime) -> Vec<JobOutcome> {
        let minute = truncate_to_minute(now);
        let mut outcomes = Vec::new();

        for job in &mut self.jobs {
            if job.last_fired == Some(minute) || !job.trigger.matches(&now) {
                continue;
            }
            job.last_fired = Some(minute);

            info!(
                "event=scheduler_job module=scheduler status=start job={} schedule=\"{}\"",
                job.name,
                job.trigger.describe()
            );
            let outcome = match catch_unwind(AssertUnwindSafe(&mut job.action)) {
                Ok(Ok(())) => {
                    info!("event=scheduler_job module=scheduler status=ok job={}", job.name);
                    JobOutcome::Completed { job: job.name }
                }
                Ok(Err(err)) => {
                    error!(
                        "event=scheduler_job module=scheduler status=error job={} error={}",
                        job.name, err
                    );
                    JobOutcome::Failed {
                        job: job.name,
                        error: err.to_string(),
                    }
                }
                Err(_) => {
                    error!(
                        "event=scheduler_job module=scheduler status=error job={} error_code=job_panicked",
                        job.name
                    );
                    JobOutcome::Failed {
                        job: job.name,
                        error: "job panicked".to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }

    /// Moves the scheduler onto its own thread, ticking every `interval`.
    ///
    /// `interval` should stay below one minute so no matching minute is
    /// skipped.
    pub fn spawn(
        mut self,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> std::io::Result<SchedulerHandle> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let jobs = self.job_names().join(",");

        let join = thread::Builder::new()
            .name("finboard-scheduler".to_string())
            .spawn(move || loop {
                match clock.now_wall() {
                    Some(now) => {
                        self.tick(now);
                    }
                    None => warn!(
                        "event=scheduler_tick module=scheduler status=skipped error_code=clock_out_of_range"
                    ),
                }

                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        info!(
            "event=scheduler_start module=scheduler status=ok jobs={} interval_ms={}",
            jobs,
            interval.as_millis()
        );
        Ok(SchedulerHandle {
            stop_tx,
            join: Some(join),
        })
    }
}

/// Handle to a running scheduler thread.
pub struct SchedulerHandle {
    stop_tx: Sender<()>,
    join: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Requests a stop and waits for the current tick (and any job) to finish.
    pub fn shutdown(mut self) {
        self.stop();
        info!("event=scheduler_stop module=scheduler status=ok");
    }

    fn stop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                error!("event=scheduler_stop module=scheduler status=error error_code=join_failed");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn truncate_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    at.with_second(0)
        .and_then(|value| value.with_nanosecond(0))
        .unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::{JobOutcome, Scheduler};
    use crate::clock::FixedClock;
    use crate::scheduler::trigger::CalendarTrigger;
    use chrono::{NaiveDate, NaiveDateTime, Weekday};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn monday_midnight(second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(0, 0, second)
            .unwrap()
    }

    #[test]
    fn job_fires_once_per_matching_minute() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let mut scheduler = Scheduler::new();
        scheduler.add_job("weekly", CalendarTrigger::weekly(Weekday::Mon, 0, 0), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(
            scheduler.tick(monday_midnight(0)),
            vec![JobOutcome::Completed { job: "weekly" }]
        );
        assert!(scheduler.tick(monday_midnight(30)).is_empty());
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        let next_week = monday_midnight(5) + chrono::Duration::days(7);
        assert_eq!(scheduler.tick(next_week).len(), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failing_job_does_not_block_other_jobs() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let mut scheduler = Scheduler::new();
        scheduler
            .add_job("broken", CalendarTrigger::weekly(Weekday::Mon, 0, 0), || {
                Err("store unavailable".into())
            })
            .add_job("panicky", CalendarTrigger::weekly(Weekday::Mon, 0, 0), || {
                panic!("job panic")
            })
            .add_job("healthy", CalendarTrigger::weekly(Weekday::Mon, 0, 0), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });

        let outcomes = scheduler.tick(monday_midnight(0));
        assert_eq!(outcomes.len(), 3);
        assert!(matches!(&outcomes[0], JobOutcome::Failed { job: "broken", .. }));
        assert!(matches!(&outcomes[1], JobOutcome::Failed { job: "panicky", .. }));
        assert_eq!(outcomes[2], JobOutcome::Completed { job: "healthy" });
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn spawned_scheduler_runs_due_job_and_stops() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let mut scheduler = Scheduler::new();
        scheduler.add_job("weekly", CalendarTrigger::weekly(Weekday::Mon, 0, 0), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let clock = Arc::new(FixedClock::at(monday_midnight(0)));
        let handle = scheduler
            .spawn(clock, Duration::from_millis(5))
            .unwrap();
        std::thread::sleep(Duration::from_millis(50));
        handle.shutdown();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
