//! Ledger snapshot repository.
//!
//! # Invariants
//! - Every mutation appends a new snapshot row; rows are never updated.
//! - The authoritative snapshot is the row with the highest `id`. Writes are
//!   serialized by the store, so `id` is commit order; `recorded_at` is only
//!   informational and may go backwards with the wall clock.
//! - A store with no snapshot rows reads as the all-zero ledger.

use super::{RepoError, RepoResult};
use crate::model::ledger::LedgerSnapshot;
use rusqlite::{params, Connection, OptionalExtension};

/// Repository interface for ledger snapshots.
pub trait LedgerRepository {
    fn latest_snapshot(&self) -> RepoResult<LedgerSnapshot>;
    fn append_snapshot(&self, snapshot: &LedgerSnapshot, recorded_at: i64) -> RepoResult<()>;
}

/// SQLite-backed ledger repository.
pub struct SqliteLedgerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLedgerRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl LedgerRepository for SqliteLedgerRepository<'_> {
    fn latest_snapshot(&self) -> RepoResult<LedgerSnapshot> {
        let row = self
            .conn
            .query_row(
                "SELECT savings, income, expenses
                 FROM ledger_snapshots
                 ORDER BY id DESC
                 LIMIT 1;",
                [],
                |row| {
                    Ok(LedgerSnapshot::new(
                        row.get("savings")?,
                        row.get("income")?,
                        row.get("expenses")?,
                    ))
                },
            )
            .optional()?;

        let snapshot = row.unwrap_or_default();
        if snapshot.savings < 0 || snapshot.income < 0 || snapshot.expenses < 0 {
            return Err(RepoError::InvalidData(format!(
                "negative ledger field in snapshot {snapshot:?}"
            )));
        }
        Ok(snapshot)
    }

    fn append_snapshot(&self, snapshot: &LedgerSnapshot, recorded_at: i64) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO ledger_snapshots (savings, income, expenses, recorded_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                snapshot.savings,
                snapshot.income,
                snapshot.expenses,
                recorded_at
            ],
        )?;
        Ok(())
    }
}
