//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define data access contracts for ledger, buckets, history and
//!   transactions.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories never open their own transactions; callers pass either a
//!   plain connection or a `rusqlite::Transaction` (which derefs to one), so
//!   several repositories can share one atomic unit.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::buckets::BucketSeriesId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod bucket_repo;
pub mod history_repo;
pub mod ledger_repo;
pub mod transaction_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by all finance tables.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
    /// Adding to a bucket slot would overflow `i64`.
    SlotOverflow { series: BucketSeriesId, slot: usize },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::SlotOverflow { series, slot } => write!(
                f,
                "bucket slot {}[{slot}] would overflow",
                series.as_db()
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
            Self::SlotOverflow { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}
