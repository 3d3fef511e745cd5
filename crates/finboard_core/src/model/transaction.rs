//! Discrete income/expense transaction model.
//!
//! # Responsibility
//! - Define the append-only transaction record.
//! - Normalize the transaction type from user input.
//!
//! # Invariants
//! - `amount` is strictly positive.
//! - `occurred_at` selects the rollup buckets, not the insertion time.

use crate::model::amount::Amount;
use crate::model::ledger::FlowKind;
use serde::{Deserialize, Serialize};

/// Maximum number of transactions returned by one list call.
pub const TRANSACTION_LIST_LIMIT_MAX: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Parses user input case-insensitively, ignoring surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }

    pub fn flow(self) -> FlowKind {
        match self {
            Self::Income => FlowKind::Income,
            Self::Expense => FlowKind::Expenses,
        }
    }
}

/// Persisted transaction row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: Amount,
    /// Epoch milliseconds used for bucket selection.
    pub occurred_at: i64,
    /// Epoch milliseconds of insertion.
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::TransactionType;
    use crate::model::ledger::FlowKind;

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        assert_eq!(TransactionType::parse(" Income "), Some(TransactionType::Income));
        assert_eq!(TransactionType::parse("EXPENSE"), Some(TransactionType::Expense));
        assert_eq!(TransactionType::parse("expenses"), None);
    }

    #[test]
    fn expense_feeds_expenses_flow() {
        assert_eq!(TransactionType::Expense.flow(), FlowKind::Expenses);
        assert_eq!(TransactionType::Income.flow(), FlowKind::Income);
    }
}
