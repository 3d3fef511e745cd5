//! Bucket series repository.
//!
//! # Responsibility
//! - Read both rollups as one snapshot.
//! - Increment a single slot and zero or overwrite whole series.
//!
//! # Invariants
//! - Every series has exactly `slot_count()` rows; a missing or extra row is
//!   reported as invalid data, never silently filled.
//! - Slot values are never negative.

use super::{RepoError, RepoResult};
use crate::model::amount::Amount;
use crate::model::buckets::{BucketSeriesId, BucketSnapshot};
use rusqlite::{params, Connection, OptionalExtension};

/// Repository interface for the fixed-size bucket series.
pub trait BucketRepository {
    /// Loads all four series.
    fn load(&self) -> RepoResult<BucketSnapshot>;
    /// Adds `amount` to one slot and returns the new slot value.
    fn increment(&self, series: BucketSeriesId, slot: usize, amount: Amount) -> RepoResult<i64>;
    /// Sets every slot of `series` to zero.
    fn zero_series(&self, series: BucketSeriesId) -> RepoResult<()>;
    /// Overwrites every slot of `series`.
    fn replace_series(&self, series: BucketSeriesId, values: &[i64]) -> RepoResult<()>;
}

/// SQLite-backed bucket repository.
pub struct SqliteBucketRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBucketRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl BucketRepository for SqliteBucketRepository<'_> {
    fn load(&self) -> RepoResult<BucketSnapshot> {
        let mut snapshot = BucketSnapshot::default();
        let mut seen = [0usize; BucketSeriesId::ALL.len()];

        let mut stmt = self.conn.prepare(
            "SELECT series, slot, value
             FROM bucket_slots
             ORDER BY series ASC, slot ASC;",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let series_text: String = row.get("series")?;
            let series = BucketSeriesId::parse(&series_text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid series `{series_text}` in bucket_slots.series"
                ))
            })?;
            let slot = slot_from_db(series, row.get("slot")?)?;
            let value: i64 = row.get("value")?;
            if value < 0 {
                return Err(RepoError::InvalidData(format!(
                    "negative value {value} in {}[{slot}]",
                    series.as_db()
                )));
            }

            snapshot.series_mut(series)[slot] = value;
            seen[series_position(series)] += 1;
        }

        for series in BucketSeriesId::ALL {
            let count = seen[series_position(series)];
            if count != series.slot_count() {
                return Err(RepoError::InvalidData(format!(
                    "series {} has {count} slots, expected {}",
                    series.as_db(),
                    series.slot_count()
                )));
            }
        }

        Ok(snapshot)
    }

    fn increment(&self, series: BucketSeriesId, slot: usize, amount: Amount) -> RepoResult<i64> {
        let slot_db = slot_to_db(series, slot)?;
        let current: i64 = self
            .conn
            .query_row(
                "SELECT value FROM bucket_slots WHERE series = ?1 AND slot = ?2;",
                params![series.as_db(), slot_db],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| {
                RepoError::InvalidData(format!("missing bucket slot {}[{slot}]", series.as_db()))
            })?;

        let next = current
            .checked_add(amount.minor())
            .ok_or(RepoError::SlotOverflow { series, slot })?;

        self.conn.execute(
            "UPDATE bucket_slots SET value = ?1 WHERE series = ?2 AND slot = ?3;",
            params![next, series.as_db(), slot_db],
        )?;
        Ok(next)
    }

    fn zero_series(&self, series: BucketSeriesId) -> RepoResult<()> {
        self.conn.execute(
            "UPDATE bucket_slots SET value = 0 WHERE series = ?1;",
            [series.as_db()],
        )?;
        Ok(())
    }

    fn replace_series(&self, series: BucketSeriesId, values: &[i64]) -> RepoResult<()> {
        if values.len() != series.slot_count() {
            return Err(RepoError::InvalidData(format!(
                "series {} needs {} values, got {}",
                series.as_db(),
                series.slot_count(),
                values.len()
            )));
        }

        let mut stmt = self
            .conn
            .prepare("UPDATE bucket_slots SET value = ?1 WHERE series = ?2 AND slot = ?3;")?;
        for (slot, value) in values.iter().enumerate() {
            let changed = stmt.execute(params![value, series.as_db(), slot_to_db(series, slot)?])?;
            if changed == 0 {
                return Err(RepoError::InvalidData(format!(
                    "missing bucket slot {}[{slot}]",
                    series.as_db()
                )));
            }
        }
        Ok(())
    }
}

fn series_position(series: BucketSeriesId) -> usize {
    match series {
        BucketSeriesId::MonthIncome => 0,
        BucketSeriesId::MonthExpenses => 1,
        BucketSeriesId::WeekEarning => 2,
        BucketSeriesId::WeekSpent => 3,
    }
}

fn slot_to_db(series: BucketSeriesId, slot: usize) -> RepoResult<i64> {
    if slot >= series.slot_count() {
        return Err(RepoError::InvalidData(format!(
            "slot {slot} is outside series {}",
            series.as_db()
        )));
    }
    Ok(slot as i64)
}

fn slot_from_db(series: BucketSeriesId, slot: i64) -> RepoResult<usize> {
    usize::try_from(slot)
        .ok()
        .filter(|slot| *slot < series.slot_count())
        .ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid slot {slot} in bucket_slots for {}",
                series.as_db()
            ))
        })
}
