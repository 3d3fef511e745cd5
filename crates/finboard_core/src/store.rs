//! Guarded finance store.
//!
//! # Responsibility
//! - Own the single SQLite connection shared by request handlers, the reset
//!   scheduler and background tasks.
//! - Serialize every read and write behind one lock so no caller can observe
//!   or produce a torn ledger/bucket state.
//! - Bound lock waits and statement execution by a caller-provided deadline.
//!
//! # Invariants
//! - Writes run inside one `IMMEDIATE` transaction; an error or an expired
//!   deadline rolls back every statement of that write.
//! - The lock is held from `BEGIN` to `COMMIT`; read-modify-write sequences
//!   are never split by an unguarded window.
//! - After `close`, every operation fails with `StoreError::Closed`.
//!
//! The lock is in-process only. Several processes sharing one database file
//! are serialized by SQLite's own file locking, not by this guard.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::repo::RepoError;
use log::{debug, info, warn};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::{Duration, Instant};

// SQLite VM instructions between deadline checks.
const PROGRESS_CHECK_OPS: i32 = 1_000;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the guarded store.
#[derive(Debug)]
pub enum StoreError {
    Repo(RepoError),
    /// The deadline expired while waiting for the lock or while executing.
    DeadlineExceeded { op: &'static str },
    /// The store was closed during shutdown.
    Closed,
}

impl StoreError {
    /// Returns whether this failure came from deadline expiry.
    pub fn is_deadline(&self) -> bool {
        match self {
            Self::DeadlineExceeded { .. } => true,
            Self::Repo(RepoError::Db(DbError::Sqlite(err))) => {
                err.sqlite_error_code() == Some(ErrorCode::OperationInterrupted)
            }
            _ => false,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::DeadlineExceeded { op } => write!(f, "deadline exceeded during `{op}`"),
            Self::Closed => write!(f, "finance store is closed"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::DeadlineExceeded { .. } => None,
            Self::Closed => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

/// Point in time after which a store operation gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline; waits for the lock indefinitely.
    pub fn none() -> Self {
        Self(None)
    }

    pub fn after(timeout: Duration) -> Self {
        Self(Some(Instant::now() + timeout))
    }

    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    pub fn instant(&self) -> Option<Instant> {
        self.0
    }

    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }
}

/// The single serialization point over ledger and bucket state.
pub struct FinanceStore {
    conn: Mutex<Option<Connection>>,
}

impl FinanceStore {
    /// Opens (or creates) a store file and applies migrations.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens a private in-memory store, mainly for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
        }
    }

    /// Runs `f` against a consistent view of the store.
    pub fn read<T, E>(
        &self,
        deadline: Deadline,
        op: &'static str,
        f: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut guard = self.acquire(deadline, op)?;
        let conn = guard.as_mut().ok_or(StoreError::Closed)?;

        install_deadline(conn, deadline);
        let result = f(conn);
        clear_deadline(conn);

        if result.is_err() && deadline.is_expired() {
            warn!("event=store_read module=store status=error op={op} error_code=deadline_exceeded");
        }
        result
    }

    /// Runs `f` inside one `IMMEDIATE` transaction and commits on success.
    ///
    /// Any error returned by `f`, a failed commit or an expired deadline rolls
    /// the whole transaction back.
    pub fn write<T, E>(
        &self,
        deadline: Deadline,
        op: &'static str,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let started_at = Instant::now();
        let mut guard = self.acquire(deadline, op)?;
        let conn = guard.as_mut().ok_or(StoreError::Closed)?;

        install_deadline(conn, deadline);
        let result = run_in_transaction(conn, f);
        clear_deadline(conn);

        match &result {
            Ok(_) => debug!(
                "event=store_write module=store status=ok op={} duration_ms={}",
                op,
                started_at.elapsed().as_millis()
            ),
            Err(_) => warn!(
                "event=store_write module=store status=rolled_back op={} duration_ms={} deadline_expired={}",
                op,
                started_at.elapsed().as_millis(),
                deadline.is_expired()
            ),
        }
        result
    }

    /// Connectivity probe used by health checks.
    pub fn ping(&self, deadline: Deadline) -> StoreResult<()> {
        self.read(deadline, "ping", |conn| {
            conn.query_row("SELECT 1;", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }

    /// Closes the connection once any in-flight operation has finished.
    ///
    /// Waits at most `grace` for the lock. Returns `false` when the grace
    /// period elapsed and the connection was left to be dropped with the
    /// process.
    pub fn close(&self, grace: Duration) -> bool {
        let Some(mut guard) = self.conn.try_lock_for(grace) else {
            warn!(
                "event=store_close module=store status=error error_code=grace_elapsed grace_ms={}",
                grace.as_millis()
            );
            return false;
        };

        if let Some(conn) = guard.take() {
            if let Err((_, err)) = conn.close() {
                warn!("event=store_close module=store status=error error={err}");
                return false;
            }
        }
        info!("event=store_close module=store status=ok");
        true
    }

    pub fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }

    fn acquire(
        &self,
        deadline: Deadline,
        op: &'static str,
    ) -> StoreResult<MutexGuard<'_, Option<Connection>>> {
        let guard = match deadline.instant() {
            None => Some(self.conn.lock()),
            Some(at) => self.conn.try_lock_until(at),
        };
        // An uncontended lock is granted even past the deadline; re-check so
        // an expired request never starts a statement.
        match guard {
            Some(guard) if !deadline.is_expired() => Ok(guard),
            _ => {
                warn!(
                    "event=store_lock module=store status=error op={op} error_code=deadline_exceeded"
                );
                Err(StoreError::DeadlineExceeded { op })
            }
        }
    }
}

fn run_in_transaction<T, E>(
    conn: &mut Connection,
    f: impl FnOnce(&Transaction<'_>) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<StoreError>,
{
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(StoreError::from)?;
    // The rollback on drop must not be interrupted by an expired deadline.
    let value = f(&tx).inspect_err(|_| clear_deadline(&tx))?;
    tx.commit().map_err(StoreError::from)?;
    Ok(value)
}

fn install_deadline(conn: &Connection, deadline: Deadline) {
    if let Some(at) = deadline.instant() {
        conn.progress_handler(PROGRESS_CHECK_OPS, Some(move || Instant::now() >= at));
    }
}

fn clear_deadline(conn: &Connection) {
    conn.progress_handler(0, None::<fn() -> bool>);
}
