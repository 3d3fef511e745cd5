//! Transaction repository.
//!
//! # Invariants
//! - Append-only: rows are never updated or deleted.
//! - Listing is newest first by `occurred_at`, then `id`.

use super::{RepoError, RepoResult};
use crate::model::amount::Amount;
use crate::model::transaction::{TransactionRecord, TransactionType, TRANSACTION_LIST_LIMIT_MAX};
use rusqlite::{params, Connection, Row};

/// Repository interface for discrete transactions.
pub trait TransactionRepository {
    fn insert(
        &self,
        kind: TransactionType,
        amount: Amount,
        occurred_at: i64,
        created_at: i64,
    ) -> RepoResult<TransactionRecord>;
    /// Lists at most `min(limit, TRANSACTION_LIST_LIMIT_MAX)` rows, newest first.
    fn list_recent(&self, limit: u32) -> RepoResult<Vec<TransactionRecord>>;
}

/// SQLite-backed transaction repository.
pub struct SqliteTransactionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTransactionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TransactionRepository for SqliteTransactionRepository<'_> {
    fn insert(
        &self,
        kind: TransactionType,
        amount: Amount,
        occurred_at: i64,
        created_at: i64,
    ) -> RepoResult<TransactionRecord> {
        self.conn.execute(
            "INSERT INTO transactions (kind, amount, occurred_at, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![kind.as_db(), amount.minor(), occurred_at, created_at],
        )?;

        Ok(TransactionRecord {
            id: self.conn.last_insert_rowid(),
            kind,
            amount,
            occurred_at,
            created_at,
        })
    }

    fn list_recent(&self, limit: u32) -> RepoResult<Vec<TransactionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, amount, occurred_at, created_at
             FROM transactions
             ORDER BY occurred_at DESC, id DESC
             LIMIT ?1;",
        )?;
        let mut rows = stmt.query([i64::from(limit.min(TRANSACTION_LIST_LIMIT_MAX))])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_transaction_row(row)?);
        }
        Ok(records)
    }
}

fn parse_transaction_row(row: &Row<'_>) -> RepoResult<TransactionRecord> {
    let kind_text: String = row.get("kind")?;
    let kind = TransactionType::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid transaction kind `{kind_text}`"))
    })?;
    let amount: i64 = row.get("amount")?;
    if amount <= 0 {
        return Err(RepoError::InvalidData(format!(
            "non-positive transaction amount {amount}"
        )));
    }

    Ok(TransactionRecord {
        id: row.get("id")?,
        kind,
        amount: Amount::from_minor(amount),
        occurred_at: row.get("occurred_at")?,
        created_at: row.get("created_at")?,
    })
}
