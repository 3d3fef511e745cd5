//! Time-bucket rollup model.
//!
//! # Responsibility
//! - Define the monthly (12-slot) and weekday (7-slot) series.
//! - Map a wall-clock instant to its month and weekday slot.
//! - Map each cash-flow direction to its monthly and weekly series.
//!
//! # Invariants
//! - Slot counts never change: 12 months (0 = January), 7 days (0 = Monday).
//! - Label arrays are static metadata and are never persisted or mutated.

use crate::model::ledger::FlowKind;
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const MONTH_SLOTS: usize = 12;
pub const WEEKDAY_SLOTS: usize = 7;

pub const MONTH_LABELS: [&str; MONTH_SLOTS] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
pub const DAY_LABELS: [&str; WEEKDAY_SLOTS] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Persisted bucket series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketSeriesId {
    MonthIncome,
    MonthExpenses,
    WeekEarning,
    WeekSpent,
}

impl BucketSeriesId {
    pub const ALL: [BucketSeriesId; 4] = [
        Self::MonthIncome,
        Self::MonthExpenses,
        Self::WeekEarning,
        Self::WeekSpent,
    ];
    pub const MONTHLY: [BucketSeriesId; 2] = [Self::MonthIncome, Self::MonthExpenses];
    pub const WEEKLY: [BucketSeriesId; 2] = [Self::WeekEarning, Self::WeekSpent];

    pub fn as_db(self) -> &'static str {
        match self {
            Self::MonthIncome => "month_income",
            Self::MonthExpenses => "month_expenses",
            Self::WeekEarning => "week_earning",
            Self::WeekSpent => "week_spent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "month_income" => Some(Self::MonthIncome),
            "month_expenses" => Some(Self::MonthExpenses),
            "week_earning" => Some(Self::WeekEarning),
            "week_spent" => Some(Self::WeekSpent),
            _ => None,
        }
    }

    pub fn slot_count(self) -> usize {
        match self {
            Self::MonthIncome | Self::MonthExpenses => MONTH_SLOTS,
            Self::WeekEarning | Self::WeekSpent => WEEKDAY_SLOTS,
        }
    }
}

impl FlowKind {
    /// Monthly series fed by this flow.
    pub fn monthly_series(self) -> BucketSeriesId {
        match self {
            Self::Income => BucketSeriesId::MonthIncome,
            Self::Expenses => BucketSeriesId::MonthExpenses,
        }
    }

    /// Weekly series fed by this flow (`earning` for income, `spent` for expenses).
    pub fn weekly_series(self) -> BucketSeriesId {
        match self {
            Self::Income => BucketSeriesId::WeekEarning,
            Self::Expenses => BucketSeriesId::WeekSpent,
        }
    }
}

/// Month and weekday slot selected by one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotIndex {
    /// 0 = January.
    pub month: usize,
    /// 0 = Monday.
    pub weekday: usize,
}

impl SlotIndex {
    pub fn for_datetime(at: &NaiveDateTime) -> Self {
        Self {
            month: at.month0() as usize,
            weekday: at.weekday().num_days_from_monday() as usize,
        }
    }

    /// Slot of `series` addressed by this index.
    pub fn slot_for(self, series: BucketSeriesId) -> usize {
        match series {
            BucketSeriesId::MonthIncome | BucketSeriesId::MonthExpenses => self.month,
            BucketSeriesId::WeekEarning | BucketSeriesId::WeekSpent => self.weekday,
        }
    }
}

/// Monthly income/expenses rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MonthlySeries {
    pub income: [i64; MONTH_SLOTS],
    pub expenses: [i64; MONTH_SLOTS],
}

/// Weekday earning/spent rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeeklySeries {
    pub earning: [i64; WEEKDAY_SLOTS],
    pub spent: [i64; WEEKDAY_SLOTS],
}

/// Both rollups read under one consistent snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BucketSnapshot {
    pub monthly: MonthlySeries,
    pub weekly: WeeklySeries,
}

impl BucketSnapshot {
    /// Returns the values of one series as a slice.
    pub fn series(&self, id: BucketSeriesId) -> &[i64] {
        match id {
            BucketSeriesId::MonthIncome => &self.monthly.income,
            BucketSeriesId::MonthExpenses => &self.monthly.expenses,
            BucketSeriesId::WeekEarning => &self.weekly.earning,
            BucketSeriesId::WeekSpent => &self.weekly.spent,
        }
    }

    pub fn series_mut(&mut self, id: BucketSeriesId) -> &mut [i64] {
        match id {
            BucketSeriesId::MonthIncome => &mut self.monthly.income,
            BucketSeriesId::MonthExpenses => &mut self.monthly.expenses,
            BucketSeriesId::WeekEarning => &mut self.weekly.earning,
            BucketSeriesId::WeekSpent => &mut self.weekly.spent,
        }
    }
}
