//! Ledger mutation history.
//!
//! # Invariants
//! - History rows are append-only; they are never updated or deleted.
//! - Reads are newest first and capped at `HISTORY_LIMIT_MAX`.

use crate::model::amount::Amount;
use crate::model::ledger::EntryKind;
use serde::Serialize;

/// Maximum number of history rows returned by one read.
pub const HISTORY_LIMIT_MAX: u32 = 100;

/// One accepted ledger update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NewHistoryRecord {
    pub kind: EntryKind,
    pub amount: Amount,
    pub is_incremental: bool,
    /// Epoch milliseconds.
    pub recorded_at: i64,
}

/// Persisted history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryRecord {
    pub id: i64,
    pub kind: EntryKind,
    pub amount: Amount,
    pub is_incremental: bool,
    /// Epoch milliseconds.
    pub recorded_at: i64,
}
