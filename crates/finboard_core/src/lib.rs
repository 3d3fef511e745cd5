//! Core domain logic for the finboard household ledger.
//! This crate is the single source of truth for ledger and rollup invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod worker;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppConfig, ConfigError};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status};
pub use model::amount::{Amount, AmountError, AmountMode, RawAmount, MAX_AMOUNT_UNITS};
pub use model::buckets::{
    BucketSeriesId, BucketSnapshot, MonthlySeries, SlotIndex, WeeklySeries, DAY_LABELS,
    MONTH_LABELS,
};
pub use model::history::{HistoryRecord, NewHistoryRecord};
pub use model::ledger::{EntryKind, FlowKind, LedgerSnapshot};
pub use model::transaction::{TransactionRecord, TransactionType};
pub use repo::{RepoError, RepoResult};
pub use scheduler::{reset_scheduler, Scheduler, SchedulerHandle};
pub use service::history_recorder::HistoryRecorder;
pub use service::ledger_service::{DashboardState, LedgerError, LedgerService, LedgerUpdateRequest};
pub use service::reset_service::{ResetService, WeeklyResetOutcome};
pub use service::transaction_service::{
    NewTransactionRequest, TransactionError, TransactionService,
};
pub use service::LedgerEntry;
pub use store::{Deadline, FinanceStore, StoreError, StoreResult};
pub use worker::{BackgroundWorker, WorkerHandle};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
