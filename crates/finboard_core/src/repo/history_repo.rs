//! Ledger history repository.
//!
//! # Invariants
//! - Append-only: no update or delete statements exist for `ledger_history`.
//! - Listing is newest first: `recorded_at DESC, id DESC`.

use super::{bool_to_int, int_to_bool, RepoError, RepoResult};
use crate::model::amount::Amount;
use crate::model::history::{HistoryRecord, NewHistoryRecord, HISTORY_LIMIT_MAX};
use crate::model::ledger::EntryKind;
use rusqlite::{params, Connection, Row};

/// Repository interface for ledger history.
pub trait HistoryRepository {
    fn append(&self, record: &NewHistoryRecord) -> RepoResult<i64>;
    /// Lists at most `min(limit, HISTORY_LIMIT_MAX)` records, newest first.
    fn list_recent(&self, limit: u32) -> RepoResult<Vec<HistoryRecord>>;
}

/// SQLite-backed history repository.
pub struct SqliteHistoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHistoryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl HistoryRepository for SqliteHistoryRepository<'_> {
    fn append(&self, record: &NewHistoryRecord) -> RepoResult<i64> {
        self.conn.execute(
            "INSERT INTO ledger_history (operation_type, amount, is_incremental, recorded_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                record.kind.as_str(),
                record.amount.minor(),
                bool_to_int(record.is_incremental),
                record.recorded_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_recent(&self, limit: u32) -> RepoResult<Vec<HistoryRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, operation_type, amount, is_incremental, recorded_at
             FROM ledger_history
             ORDER BY recorded_at DESC, id DESC
             LIMIT ?1;",
        )?;
        let mut rows = stmt.query([i64::from(limit.min(HISTORY_LIMIT_MAX))])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_history_row(row)?);
        }
        Ok(records)
    }
}

fn parse_history_row(row: &Row<'_>) -> RepoResult<HistoryRecord> {
    let kind_text: String = row.get("operation_type")?;
    let kind = EntryKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid operation type `{kind_text}` in ledger_history.operation_type"
        ))
    })?;

    Ok(HistoryRecord {
        id: row.get("id")?,
        kind,
        amount: Amount::from_minor(row.get("amount")?),
        is_incremental: int_to_bool(
            row.get("is_incremental")?,
            "ledger_history.is_incremental",
        )?,
        recorded_at: row.get("recorded_at")?,
    })
}
