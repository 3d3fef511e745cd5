//! Supervised background worker for fire-and-forget tasks.
//!
//! # Responsibility
//! - Run tasks submitted by request paths off the caller's thread.
//! - Route task failures (errors and panics) to a supervisor that logs and
//!   drops them.
//!
//! # Invariants
//! - A failing or panicking task never stops the worker or the process.
//! - Tasks run one at a time in submission order.
//! - `shutdown` runs every task queued before it, then joins both threads.

use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub type TaskResult = Result<(), Box<dyn Error + Send + Sync>>;

type Task = Box<dyn FnOnce() -> TaskResult + Send>;

enum Message {
    Run { name: &'static str, task: Task },
    Stop,
}

/// Failure report sent from the worker to its supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub task: &'static str,
    pub reason: String,
    pub panicked: bool,
}

/// Submission rejected because the worker has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerClosed;

impl Display for WorkerClosed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "background worker is not running")
    }
}

impl Error for WorkerClosed {}

/// Completed/failed task counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerStats {
    pub completed: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Cloneable submission handle.
#[derive(Clone)]
pub struct WorkerHandle {
    sender: Sender<Message>,
}

impl WorkerHandle {
    /// Queues `task` for background execution.
    pub fn submit(
        &self,
        name: &'static str,
        task: impl FnOnce() -> TaskResult + Send + 'static,
    ) -> Result<(), WorkerClosed> {
        self.sender
            .send(Message::Run {
                name,
                task: Box::new(task),
            })
            .map_err(|_| WorkerClosed)
    }
}

/// Owner of the worker and supervisor threads.
pub struct BackgroundWorker {
    handle: WorkerHandle,
    counters: Arc<Counters>,
    worker: Option<JoinHandle<()>>,
    supervisor: Option<JoinHandle<()>>,
}

impl BackgroundWorker {
    /// Spawns the worker and its supervisor.
    pub fn start() -> std::io::Result<Self> {
        let (task_tx, task_rx) = mpsc::channel::<Message>();
        let (failure_tx, failure_rx) = mpsc::channel::<TaskFailure>();
        let counters = Arc::new(Counters::default());

        let supervisor = thread::Builder::new()
            .name("finboard-supervisor".to_string())
            .spawn(move || supervise(failure_rx))?;

        let worker_counters = Arc::clone(&counters);
        let worker = thread::Builder::new()
            .name("finboard-worker".to_string())
            .spawn(move || run_tasks(task_rx, failure_tx, &worker_counters))?;

        info!("event=worker_start module=worker status=ok");
        Ok(Self {
            handle: WorkerHandle { sender: task_tx },
            counters,
            worker: Some(worker),
            supervisor: Some(supervisor),
        })
    }

    pub fn handle(&self) -> WorkerHandle {
        self.handle.clone()
    }

    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            completed: self.counters.completed.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
        }
    }

    /// Drains queued tasks and joins both threads.
    pub fn shutdown(mut self) -> WorkerStats {
        self.stop();
        let stats = self.stats();
        info!(
            "event=worker_stop module=worker status=ok completed={} failed={}",
            stats.completed, stats.failed
        );
        stats
    }

    fn stop(&mut self) {
        // Stop is queued behind pending tasks, so they still run.
        let _ = self.handle.sender.send(Message::Stop);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("event=worker_stop module=worker status=error error_code=worker_join_failed");
            }
        }
        if let Some(supervisor) = self.supervisor.take() {
            if supervisor.join().is_err() {
                error!(
                    "event=worker_stop module=worker status=error error_code=supervisor_join_failed"
                );
            }
        }
    }
}

impl Drop for BackgroundWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_tasks(tasks: Receiver<Message>, failures: Sender<TaskFailure>, counters: &Counters) {
    while let Ok(message) = tasks.recv() {
        let (name, task) = match message {
            Message::Run { name, task } => (name, task),
            Message::Stop => break,
        };

        let failure = match catch_unwind(AssertUnwindSafe(task)) {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(TaskFailure {
                task: name,
                reason: err.to_string(),
                panicked: false,
            }),
            Err(payload) => Some(TaskFailure {
                task: name,
                reason: panic_reason(payload.as_ref()),
                panicked: true,
            }),
        };

        match failure {
            None => {
                counters.completed.fetch_add(1, Ordering::SeqCst);
            }
            Some(failure) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                if failures.send(failure).is_err() {
                    error!("event=worker_task module=worker status=error error_code=supervisor_gone task={name}");
                }
            }
        }
    }
}

fn supervise(failures: Receiver<TaskFailure>) {
    while let Ok(failure) = failures.recv() {
        warn!(
            "event=worker_task module=worker status=dropped task={} panicked={} error={}",
            failure.task, failure.panicked, failure.reason
        );
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{BackgroundWorker, WorkerClosed};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn worker_survives_failing_and_panicking_tasks() {
        let worker = BackgroundWorker::start().unwrap();
        let handle = worker.handle();
        let ran = Arc::new(AtomicUsize::new(0));

        handle
            .submit("fails", || Err("boom".into()))
            .unwrap();
        handle
            .submit("panics", || panic!("task panic"))
            .unwrap();
        let counter = Arc::clone(&ran);
        handle
            .submit("succeeds", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        let stats = worker.shutdown();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 2);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn submit_after_shutdown_is_rejected() {
        let worker = BackgroundWorker::start().unwrap();
        let handle = worker.handle();
        worker.shutdown();

        let err = handle.submit("late", || Ok(())).unwrap_err();
        assert_eq!(err, WorkerClosed);
    }
}
