use finboard_core::db::migrations::latest_version;
use finboard_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "ledger_snapshots");
    assert_table_exists(&conn, "bucket_slots");
    assert_table_exists(&conn, "ledger_history");
    assert_table_exists(&conn, "transactions");
}

#[test]
fn fresh_database_is_seeded_with_zero_state() {
    let conn = open_db_in_memory().unwrap();

    let snapshots: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM ledger_snapshots
             WHERE savings = 0 AND income = 0 AND expenses = 0;",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(snapshots, 1);

    for (series, slots) in [
        ("month_income", 12),
        ("month_expenses", 12),
        ("week_earning", 7),
        ("week_spent", 7),
    ] {
        let (count, total): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(value), 0) FROM bucket_slots WHERE series = ?1;",
                [series],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(count, slots, "slot count of {series}");
        assert_eq!(total, 0, "seed total of {series}");
    }
}

#[test]
fn bucket_constraints_reject_out_of_range_rows() {
    let conn = open_db_in_memory().unwrap();

    let bad_slot = conn.execute(
        "INSERT INTO bucket_slots (series, slot, value) VALUES ('week_spent', 7, 0);",
        [],
    );
    assert!(bad_slot.is_err());

    let bad_series = conn.execute(
        "INSERT INTO bucket_slots (series, slot, value) VALUES ('week_savings', 0, 0);",
        [],
    );
    assert!(bad_series.is_err());

    let negative = conn.execute(
        "UPDATE bucket_slots SET value = -1 WHERE series = 'month_income' AND slot = 0;",
        [],
    );
    assert!(negative.is_err());
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("finboard.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    conn_first
        .execute(
            "UPDATE bucket_slots SET value = 42 WHERE series = 'month_income' AND slot = 3;",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let value: i64 = conn_second
        .query_row(
            "SELECT value FROM bucket_slots WHERE series = 'month_income' AND slot = 3;",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(value, 42);

    let rows: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM bucket_slots;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 38);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}

#[test]
fn open_creates_missing_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("nested").join("finboard.sqlite3");

    let conn = open_db(&path).unwrap();
    assert!(path.exists());
    assert_eq!(schema_version(&conn), latest_version());
}
