//! Best-effort history appends.
//!
//! # Invariants
//! - Runs after the ledger write has committed; its failure never rolls the
//!   ledger back.
//! - Failures are logged and dropped, never returned to the caller.

use crate::model::history::NewHistoryRecord;
use crate::repo::history_repo::{HistoryRepository, SqliteHistoryRepository};
use crate::store::{Deadline, FinanceStore, StoreError};
use crate::worker::{TaskResult, WorkerHandle};
use log::warn;
use std::sync::Arc;
use std::time::Duration;

const HISTORY_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Appends history either inline or on the background worker.
#[derive(Clone)]
pub struct HistoryRecorder {
    store: Arc<FinanceStore>,
    worker: Option<WorkerHandle>,
}

impl HistoryRecorder {
    /// Appends synchronously on the calling thread.
    pub fn inline(store: Arc<FinanceStore>) -> Self {
        Self {
            store,
            worker: None,
        }
    }

    /// Appends on the background worker.
    pub fn background(store: Arc<FinanceStore>, worker: WorkerHandle) -> Self {
        Self {
            store,
            worker: Some(worker),
        }
    }

    pub fn record(&self, record: NewHistoryRecord) {
        let store = Arc::clone(&self.store);
        let task = move || append(&store, &record);

        match &self.worker {
            Some(worker) => {
                if let Err(err) = worker.submit("history_append", task) {
                    warn!(
                        "event=history_append module=service status=skipped kind={} error={}",
                        record.kind.as_str(),
                        err
                    );
                }
            }
            None => {
                if let Err(err) = task() {
                    warn!(
                        "event=history_append module=service status=error kind={} error={}",
                        record.kind.as_str(),
                        err
                    );
                }
            }
        }
    }
}

fn append(store: &FinanceStore, record: &NewHistoryRecord) -> TaskResult {
    store.write(
        Deadline::after(HISTORY_WRITE_TIMEOUT),
        "history_append",
        |tx| {
            SqliteHistoryRepository::new(tx)
                .append(record)
                .map_err(StoreError::from)
        },
    )?;
    Ok(())
}
