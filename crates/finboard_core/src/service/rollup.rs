//! Ledger + bucket rollup step shared by update and transaction paths.
//!
//! # Invariants
//! - Must be called with a transaction held under the store guard.
//! - For income/expenses exactly one monthly slot and one weekly slot are
//!   incremented, by exactly the request amount.
//! - Savings never touches buckets.

use crate::model::amount::Amount;
use crate::model::buckets::SlotIndex;
use crate::model::ledger::{EntryKind, FieldOverflow, LedgerSnapshot};
use crate::repo::bucket_repo::{BucketRepository, SqliteBucketRepository};
use crate::repo::ledger_repo::{LedgerRepository, SqliteLedgerRepository};
use crate::repo::RepoError;
use rusqlite::Connection;

/// One validated ledger mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEntry {
    pub kind: EntryKind,
    pub amount: Amount,
    pub incremental: bool,
}

#[derive(Debug)]
pub(crate) enum RollupError {
    Overflow(FieldOverflow),
    Repo(RepoError),
}

impl From<RepoError> for RollupError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Applies `entry` to the ledger and, for cash flows, to the buckets at `slot`.
///
/// Returns the new authoritative snapshot.
pub(crate) fn apply_entry(
    conn: &Connection,
    entry: &LedgerEntry,
    slot: SlotIndex,
    max_minor: i64,
    recorded_at: i64,
) -> Result<LedgerSnapshot, RollupError> {
    let ledger = SqliteLedgerRepository::new(conn);
    let current = ledger.latest_snapshot()?;
    let updated = current
        .applied(entry.kind, entry.amount, entry.incremental, max_minor)
        .map_err(RollupError::Overflow)?;
    ledger.append_snapshot(&updated, recorded_at)?;

    if let Some(flow) = entry.kind.flow() {
        let buckets = SqliteBucketRepository::new(conn);
        for series in [flow.monthly_series(), flow.weekly_series()] {
            buckets.increment(series, slot.slot_for(series), entry.amount)?;
        }
    }

    Ok(updated)
}
