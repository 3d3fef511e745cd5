//! Ledger snapshot model.
//!
//! # Responsibility
//! - Define the household snapshot (savings, income, expenses).
//! - Provide pure update and weekly-fold arithmetic for services.
//!
//! # Invariants
//! - `balance` is always `income - expenses` and is never stored.
//! - Base fields stay within `0..=max_minor` for the active amount mode.

use crate::model::amount::Amount;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Ledger field targeted by one update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Savings,
    Income,
    Expenses,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Savings => "savings",
            Self::Income => "income",
            Self::Expenses => "expenses",
        }
    }

    /// Parses the wire name of a ledger field.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "savings" => Some(Self::Savings),
            "income" => Some(Self::Income),
            "expenses" => Some(Self::Expenses),
            _ => None,
        }
    }

    /// Returns the cash-flow direction rolled into buckets, if any.
    ///
    /// Savings adjustments are not period activity and never touch buckets.
    pub fn flow(self) -> Option<FlowKind> {
        match self {
            Self::Savings => None,
            Self::Income => Some(FlowKind::Income),
            Self::Expenses => Some(FlowKind::Expenses),
        }
    }
}

/// Cash-flow direction that is rolled up into time buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    Income,
    Expenses,
}

impl FlowKind {
    pub fn entry_kind(self) -> EntryKind {
        match self {
            Self::Income => EntryKind::Income,
            Self::Expenses => EntryKind::Expenses,
        }
    }
}

/// Ledger update would leave a field above the configured ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOverflow {
    pub kind: EntryKind,
    pub attempted: i64,
    pub max: i64,
}

impl Display for FieldOverflow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} would become {} which exceeds the maximum {}",
            self.kind.as_str(),
            self.attempted,
            self.max
        )
    }
}

impl Error for FieldOverflow {}

/// Current household snapshot in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub savings: i64,
    pub income: i64,
    pub expenses: i64,
}

/// Result of folding a week's net flow into savings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyFold {
    pub snapshot: LedgerSnapshot,
    /// True when `savings + balance` fell outside `0..=max` and was clamped.
    pub clamped: bool,
}

impl LedgerSnapshot {
    pub fn new(savings: i64, income: i64, expenses: i64) -> Self {
        Self {
            savings,
            income,
            expenses,
        }
    }

    /// Net flow of the current accounting period.
    pub fn balance(&self) -> i64 {
        self.income - self.expenses
    }

    pub fn field(&self, kind: EntryKind) -> i64 {
        match kind {
            EntryKind::Savings => self.savings,
            EntryKind::Income => self.income,
            EntryKind::Expenses => self.expenses,
        }
    }

    /// Returns the snapshot after applying one update.
    ///
    /// Replacement only applies to savings; income and expenses always
    /// accumulate.
    ///
    /// # Errors
    /// Returns `FieldOverflow` when the new field value would exceed `max`.
    pub fn applied(
        &self,
        kind: EntryKind,
        amount: Amount,
        incremental: bool,
        max: i64,
    ) -> Result<Self, FieldOverflow> {
        let current = self.field(kind);
        let replace = kind == EntryKind::Savings && !incremental;
        let next = if replace {
            amount.minor()
        } else {
            current.saturating_add(amount.minor())
        };
        if next > max {
            return Err(FieldOverflow {
                kind,
                attempted: next,
                max,
            });
        }

        let mut updated = *self;
        match kind {
            EntryKind::Savings => updated.savings = next,
            EntryKind::Income => updated.income = next,
            EntryKind::Expenses => updated.expenses = next,
        }
        Ok(updated)
    }

    /// Moves the period's balance into savings and opens a fresh period.
    pub fn weekly_fold(&self, max: i64) -> WeeklyFold {
        let folded = self.savings + self.balance();
        let savings = folded.clamp(0, max);
        WeeklyFold {
            snapshot: Self::new(savings, 0, 0),
            clamped: savings != folded,
        }
    }
}
