//! Finance database bootstrap.
//!
//! Opening a database prepares its directory, sets the connection pragmas the
//! store relies on and brings the schema to the version this binary ships.
//! Nothing above this module touches a connection before that has succeeded.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failures while opening or upgrading the finance database.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The directory that should hold the database file could not be created.
    CreateDir { path: PathBuf, source: io::Error },
    /// The file was written by a newer build; it is never downgraded.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::CreateDir { path, source } => {
                write!(f, "cannot create database directory {}: {source}", path.display())
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "finance schema v{db_version} is newer than this build (v{latest_supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::CreateDir { source, .. } => Some(source),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
