//! Ledger aggregation service.
//!
//! # Responsibility
//! - Validate card update requests.
//! - Apply ledger and bucket updates as one atomic unit.
//! - Serve consistent reads of cards, charts and history.
//!
//! # Invariants
//! - Ledger, monthly bucket and weekly bucket writes share one transaction.
//! - The wall-clock time at apply time selects the bucket slots.
//! - History is appended only after a successful commit.

use crate::clock::Clock;
use crate::model::amount::{Amount, AmountError, AmountMode, RawAmount};
use crate::model::buckets::{BucketSeriesId, BucketSnapshot, SlotIndex};
use crate::model::history::{HistoryRecord, NewHistoryRecord};
use crate::model::ledger::{EntryKind, FieldOverflow, LedgerSnapshot};
use crate::repo::bucket_repo::{BucketRepository, SqliteBucketRepository};
use crate::repo::history_repo::{HistoryRepository, SqliteHistoryRepository};
use crate::repo::ledger_repo::{LedgerRepository, SqliteLedgerRepository};
use crate::repo::RepoError;
use crate::service::history_recorder::HistoryRecorder;
use crate::service::rollup::{apply_entry, LedgerEntry, RollupError};
use crate::store::{Deadline, FinanceStore, StoreError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Errors from ledger service operations.
#[derive(Debug)]
pub enum LedgerError {
    /// Unknown ledger field name.
    InvalidKind(String),
    /// Amount outside the allowed range or with unsupported precision.
    OutOfRange(AmountError),
    /// Update would push a ledger field above the ceiling.
    FieldOverflow(FieldOverflow),
    /// Persistence failure; nothing was written.
    Storage(StoreError),
}

impl LedgerError {
    /// Returns whether the caller sent an invalid request.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKind(kind) => write!(
                f,
                "invalid operation type `{kind}`; expected savings|income|expenses"
            ),
            Self::OutOfRange(err) => write!(f, "{err}"),
            Self::FieldOverflow(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidKind(_) => None,
            Self::OutOfRange(err) => Some(err),
            Self::FieldOverflow(err) => Some(err),
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        Self::Storage(value)
    }
}

impl From<RepoError> for LedgerError {
    fn from(value: RepoError) -> Self {
        Self::Storage(StoreError::Repo(value))
    }
}

impl From<RollupError> for LedgerError {
    fn from(value: RollupError) -> Self {
        match value {
            RollupError::Overflow(err) => Self::FieldOverflow(err),
            RollupError::Repo(err) => Self::from(err),
        }
    }
}

/// Card update request as received from the outside.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerUpdateRequest {
    pub kind: String,
    pub value: RawAmount,
    pub is_incremental: bool,
}

impl LedgerUpdateRequest {
    /// Validates the request against the deployment amount mode.
    pub fn validate(&self, mode: AmountMode) -> Result<LedgerEntry, LedgerError> {
        let kind =
            EntryKind::parse(&self.kind).ok_or_else(|| LedgerError::InvalidKind(self.kind.clone()))?;
        let amount = Amount::validate(self.value, mode).map_err(LedgerError::OutOfRange)?;
        Ok(LedgerEntry {
            kind,
            amount,
            incremental: self.is_incremental,
        })
    }
}

/// Ledger and rollup read model for dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardState {
    pub ledger: LedgerSnapshot,
    pub buckets: BucketSnapshot,
}

/// Aggregation engine facade.
pub struct LedgerService {
    store: Arc<FinanceStore>,
    clock: Arc<dyn Clock>,
    mode: AmountMode,
    history: HistoryRecorder,
}

impl LedgerService {
    pub fn new(
        store: Arc<FinanceStore>,
        clock: Arc<dyn Clock>,
        mode: AmountMode,
        history: HistoryRecorder,
    ) -> Self {
        Self {
            store,
            clock,
            mode,
            history,
        }
    }

    pub fn amount_mode(&self) -> AmountMode {
        self.mode
    }

    /// Validates and applies one card update.
    pub fn update(
        &self,
        request: &LedgerUpdateRequest,
        deadline: Deadline,
    ) -> Result<LedgerSnapshot, LedgerError> {
        let entry = request.validate(self.mode).inspect_err(|err| {
            info!(
                "event=ledger_update module=service status=rejected kind={} error={}",
                request.kind, err
            );
        })?;
        self.apply(&entry, deadline)
    }

    /// Applies a validated entry to ledger and buckets atomically.
    ///
    /// # Errors
    /// - `FieldOverflow` when the resulting field would exceed the ceiling.
    /// - `Storage` when persistence fails; no partial effect is visible.
    pub fn apply(
        &self,
        entry: &LedgerEntry,
        deadline: Deadline,
    ) -> Result<LedgerSnapshot, LedgerError> {
        let now_ms = self.clock.now_ms();
        let slot = self.slot_at(now_ms)?;
        let max = self.mode.max_minor();

        let snapshot = self
            .store
            .write(deadline, "ledger_apply", |tx| -> Result<_, LedgerError> {
                Ok(apply_entry(tx, entry, slot, max, now_ms)?)
            })
            .inspect_err(|err| {
                warn!(
                    "event=ledger_update module=service status=error kind={} error={}",
                    entry.kind.as_str(),
                    err
                );
            })?;

        info!(
            "event=ledger_update module=service status=ok kind={} incremental={} month_slot={} weekday_slot={}",
            entry.kind.as_str(),
            entry.incremental,
            slot.month,
            slot.weekday
        );

        self.history.record(NewHistoryRecord {
            kind: entry.kind,
            amount: entry.amount,
            is_incremental: entry.incremental,
            recorded_at: now_ms,
        });
        Ok(snapshot)
    }

    /// Zeroes the ledger and both bucket rollups in one transaction.
    pub fn reset_all(&self, deadline: Deadline) -> Result<(), LedgerError> {
        let now_ms = self.clock.now_ms();
        self.store
            .write(deadline, "ledger_reset", |tx| -> Result<_, LedgerError> {
                SqliteLedgerRepository::new(tx).append_snapshot(&LedgerSnapshot::default(), now_ms)?;
                let buckets = SqliteBucketRepository::new(tx);
                for series in BucketSeriesId::ALL {
                    buckets.zero_series(series)?;
                }
                Ok(())
            })?;
        info!("event=ledger_reset module=service status=ok");
        Ok(())
    }

    pub fn snapshot(&self, deadline: Deadline) -> Result<LedgerSnapshot, LedgerError> {
        self.store
            .read(deadline, "ledger_snapshot", |conn| -> Result<_, LedgerError> {
                Ok(SqliteLedgerRepository::new(conn).latest_snapshot()?)
            })
    }

    pub fn charts(&self, deadline: Deadline) -> Result<BucketSnapshot, LedgerError> {
        self.store
            .read(deadline, "bucket_snapshot", |conn| -> Result<_, LedgerError> {
                Ok(SqliteBucketRepository::new(conn).load()?)
            })
    }

    /// Reads ledger and buckets without a writer in between.
    pub fn dashboard(&self, deadline: Deadline) -> Result<DashboardState, LedgerError> {
        self.store
            .read(deadline, "dashboard_snapshot", |conn| -> Result<_, LedgerError> {
                Ok(DashboardState {
                    ledger: SqliteLedgerRepository::new(conn).latest_snapshot()?,
                    buckets: SqliteBucketRepository::new(conn).load()?,
                })
            })
    }

    /// Lists recent history, newest first, capped at 100.
    pub fn history(&self, limit: u32, deadline: Deadline) -> Result<Vec<HistoryRecord>, LedgerError> {
        self.store
            .read(deadline, "history_list", |conn| -> Result<_, LedgerError> {
                Ok(SqliteHistoryRepository::new(conn).list_recent(limit)?)
            })
    }

    fn slot_at(&self, epoch_ms: i64) -> Result<SlotIndex, LedgerError> {
        let wall = self.clock.wall_time(epoch_ms).ok_or_else(|| {
            LedgerError::from(RepoError::InvalidData(format!(
                "clock reading {epoch_ms} has no wall-clock representation"
            )))
        })?;
        Ok(SlotIndex::for_datetime(&wall))
    }
}
