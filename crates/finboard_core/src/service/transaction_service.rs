//! Discrete transaction service.
//!
//! # Responsibility
//! - Record income/expense events and roll them into ledger and buckets.
//! - List recent transactions.
//!
//! # Invariants
//! - Transaction insert, ledger update and bucket update share one
//!   transaction.
//! - The transaction's own timestamp selects the bucket slots, so backdated
//!   entries land in their historical month and weekday.

use crate::clock::Clock;
use crate::model::amount::{Amount, AmountError, AmountMode, RawAmount};
use crate::model::buckets::SlotIndex;
use crate::model::history::NewHistoryRecord;
use crate::model::ledger::FieldOverflow;
use crate::model::transaction::{TransactionRecord, TransactionType};
use crate::repo::transaction_repo::{SqliteTransactionRepository, TransactionRepository};
use crate::repo::RepoError;
use crate::service::history_recorder::HistoryRecorder;
use crate::service::rollup::{apply_entry, LedgerEntry, RollupError};
use crate::store::{Deadline, FinanceStore, StoreError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Errors from transaction service operations.
#[derive(Debug)]
pub enum TransactionError {
    InvalidType(String),
    OutOfRange(AmountError),
    /// Transactions must carry a strictly positive amount.
    NonPositive,
    /// Timestamp cannot be mapped to a calendar date.
    InvalidTimestamp(i64),
    FieldOverflow(FieldOverflow),
    Storage(StoreError),
}

impl TransactionError {
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

impl Display for TransactionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidType(kind) => {
                write!(f, "invalid transaction type `{kind}`; expected income|expense")
            }
            Self::OutOfRange(err) => write!(f, "{err}"),
            Self::NonPositive => write!(f, "transaction amount must be greater than zero"),
            Self::InvalidTimestamp(value) => write!(f, "invalid transaction timestamp {value}"),
            Self::FieldOverflow(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TransactionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::OutOfRange(err) => Some(err),
            Self::FieldOverflow(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for TransactionError {
    fn from(value: StoreError) -> Self {
        Self::Storage(value)
    }
}

impl From<RepoError> for TransactionError {
    fn from(value: RepoError) -> Self {
        Self::Storage(StoreError::Repo(value))
    }
}

impl From<RollupError> for TransactionError {
    fn from(value: RollupError) -> Self {
        match value {
            RollupError::Overflow(err) => Self::FieldOverflow(err),
            RollupError::Repo(err) => Self::from(err),
        }
    }
}

/// Request to record one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransactionRequest {
    pub kind: String,
    pub amount: RawAmount,
    /// Epoch milliseconds; `None` or `0` means "now".
    pub timestamp: Option<i64>,
}

/// Transaction use-case service.
pub struct TransactionService {
    store: Arc<FinanceStore>,
    clock: Arc<dyn Clock>,
    mode: AmountMode,
    history: HistoryRecorder,
}

impl TransactionService {
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

    /// Records one transaction and rolls it into ledger and buckets.
    pub fn record(
        &self,
        request: &NewTransactionRequest,
        deadline: Deadline,
    ) -> Result<TransactionRecord, TransactionError> {
        let kind = TransactionType::parse(&request.kind)
            .ok_or_else(|| TransactionError::InvalidType(request.kind.clone()))?;
        let amount = Amount::validate(request.amount, self.mode).map_err(TransactionError::OutOfRange)?;
        if amount.is_zero() {
            return Err(TransactionError::NonPositive);
        }

        let created_at = self.clock.now_ms();
        let occurred_at = match request.timestamp {
            None | Some(0) => created_at,
            Some(value) => value,
        };
        let wall = self
            .clock
            .wall_time(occurred_at)
            .ok_or(TransactionError::InvalidTimestamp(occurred_at))?;
        let slot = SlotIndex::for_datetime(&wall);

        let entry = LedgerEntry {
            kind: kind.flow().entry_kind(),
            amount,
            incremental: true,
        };
        let max = self.mode.max_minor();

        let record = self
            .store
            .write(deadline, "transaction_record", |tx| -> Result<_, TransactionError> {
                let record = SqliteTransactionRepository::new(tx).insert(
                    kind,
                    amount,
                    occurred_at,
                    created_at,
                )?;
                apply_entry(tx, &entry, slot, max, created_at)?;
                Ok(record)
            })
            .inspect_err(|err| {
                warn!(
                    "event=transaction_record module=service status=error type={} error={}",
                    kind.as_db(),
                    err
                );
            })?;

        info!(
            "event=transaction_record module=service status=ok id={} type={} month_slot={} weekday_slot={}",
            record.id,
            kind.as_db(),
            slot.month,
            slot.weekday
        );

        self.history.record(NewHistoryRecord {
            kind: entry.kind,
            amount,
            is_incremental: true,
            recorded_at: created_at,
        });
        Ok(record)
    }

    /// Lists at most 100 transactions, newest first.
    pub fn list(
        &self,
        limit: u32,
        deadline: Deadline,
    ) -> Result<Vec<TransactionRecord>, TransactionError> {
        self.store
            .read(deadline, "transaction_list", |conn| -> Result<_, TransactionError> {
                Ok(SqliteTransactionRepository::new(conn).list_recent(limit)?)
            })
    }
}
