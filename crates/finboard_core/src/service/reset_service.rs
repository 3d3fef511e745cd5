//! Periodic bucket resets.
//!
//! # Responsibility
//! - Weekly: zero the weekday rollup and fold the period balance into savings.
//! - Yearly: zero the monthly rollup.
//!
//! # Invariants
//! - Each reset is one guarded transaction, so it can never interleave with
//!   an in-flight ledger update (no lost updates).
//! - The yearly reset never touches the ledger or the weekday rollup.

use crate::clock::Clock;
use crate::model::amount::AmountMode;
use crate::model::buckets::BucketSeriesId;
use crate::model::ledger::LedgerSnapshot;
use crate::repo::bucket_repo::{BucketRepository, SqliteBucketRepository};
use crate::repo::ledger_repo::{LedgerRepository, SqliteLedgerRepository};
use crate::store::{Deadline, FinanceStore, StoreResult};
use log::{info, warn};
use std::sync::Arc;

/// Ledger states around one weekly reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyResetOutcome {
    pub before: LedgerSnapshot,
    pub after: LedgerSnapshot,
    pub clamped: bool,
}

/// Reset operations invoked by the scheduler.
pub struct ResetService {
    store: Arc<FinanceStore>,
    clock: Arc<dyn Clock>,
    mode: AmountMode,
}

impl ResetService {
    pub fn new(store: Arc<FinanceStore>, clock: Arc<dyn Clock>, mode: AmountMode) -> Self {
        Self { store, clock, mode }
    }

    /// Zeroes `earning`/`spent` and sets `savings' = savings + balance`.
    pub fn weekly_reset(&self, deadline: Deadline) -> StoreResult<WeeklyResetOutcome> {
        let now_ms = self.clock.now_ms();
        let max = self.mode.max_minor();

        let outcome = self.store.write(deadline, "weekly_reset", |tx| -> StoreResult<_> {
            let buckets = SqliteBucketRepository::new(tx);
            for series in BucketSeriesId::WEEKLY {
                buckets.zero_series(series)?;
            }

            let ledger = SqliteLedgerRepository::new(tx);
            let before = ledger.latest_snapshot()?;
            let fold = before.weekly_fold(max);
            ledger.append_snapshot(&fold.snapshot, now_ms)?;
            Ok(WeeklyResetOutcome {
                before,
                after: fold.snapshot,
                clamped: fold.clamped,
            })
        })?;

        if outcome.clamped {
            warn!(
                "event=weekly_reset module=service status=clamped savings={} balance={}",
                outcome.before.savings,
                outcome.before.balance()
            );
        }
        info!(
            "event=weekly_reset module=service status=ok savings_before={} savings_after={}",
            outcome.before.savings, outcome.after.savings
        );
        Ok(outcome)
    }

    /// Zeroes the monthly income/expenses rollup.
    pub fn yearly_reset(&self, deadline: Deadline) -> StoreResult<()> {
        self.store.write(deadline, "yearly_reset", |tx| -> StoreResult<_> {
            let buckets = SqliteBucketRepository::new(tx);
            for series in BucketSeriesId::MONTHLY {
                buckets.zero_series(series)?;
            }
            Ok(())
        })?;
        info!("event=yearly_reset module=service status=ok");
        Ok(())
    }
}
