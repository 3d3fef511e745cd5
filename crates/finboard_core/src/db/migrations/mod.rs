//! Versioned finance schema.
//!
//! Each step is an embedded SQL script. The applied version is kept in
//! `PRAGMA user_version`, and every pending step runs in one transaction so a
//! half-upgraded schema is never visible. Seed rows (the zero ledger snapshot
//! and every bucket slot) ship with the step that creates their table.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "ledger_buckets_history",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        name: "transactions",
        sql: include_str!("0002_transactions.sql"),
    },
];

/// Schema version produced by this build.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Version currently recorded in the database file.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Upgrades `conn` to `latest_version()`.
///
/// Returns the versions applied by this call, oldest first; empty when the
/// schema was already current.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<Vec<u32>> {
    let from = schema_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let pending: Vec<&SchemaStep> = STEPS.iter().filter(|step| step.version > from).collect();
    if pending.is_empty() {
        debug!("event=db_migrate module=db status=skipped version={from}");
        return Ok(Vec::new());
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        debug!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} steps={}",
        from,
        latest,
        pending.len()
    );
    Ok(pending.iter().map(|step| step.version).collect())
}
