//! Database schema migrations for the focus store.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.
//!
//! v1 uses `CREATE TABLE IF NOT EXISTS` with the column layout of the earliest
//! data files, so an untracked file from an older build is adopted in place
//! rather than rejected.

use rusqlite::{Connection, OptionalExtension};

use crate::error::StorageError;

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i64 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns `UnsupportedSchemaVersion` for files written by a newer build, or
/// `MigrationFailed` if any step fails. A failed step leaves the file at the
/// previous version.
pub fn migrate(conn: &Connection) -> Result<(), StorageError> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;
    if current_version > SCHEMA_VERSION {
        return Err(StorageError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: SCHEMA_VERSION,
        });
    }

    if current_version < 1 {
        migrate_v1(conn).map_err(|e| failed(1, e))?;
        tracing::debug!(version = 1, "schema migrated");
    }
    if current_version < 2 {
        migrate_v2(conn).map_err(|e| failed(2, e))?;
        tracing::debug!(version = 2, "schema migrated");
    }
    if current_version < 3 {
        migrate_v3(conn).map_err(|e| failed(3, e))?;
        tracing::debug!(version = 3, "schema migrated");
    }

    Ok(())
}

fn failed(version: i64, err: rusqlite::Error) -> StorageError {
    StorageError::MigrationFailed(format!("v{version}: {err}"))
}

fn create_schema_version_table(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
    .map_err(|e| failed(0, e))
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh or untracked file).
pub fn get_schema_version(conn: &Connection) -> Result<i64, StorageError> {
    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i64>>(0)
        })
        .optional()?
        .flatten();
    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i64) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: tasks and sessions tables.
fn migrate_v1(conn: &Connection) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            status INTEGER DEFAULT 0,
            scheduled_date TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );

        -- task_id is a weak reference: no FOREIGN KEY, deletes never cascade.
        CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            task_id INTEGER,
            duration INTEGER,
            type TEXT,
            date TEXT
        );",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: session start/end instants and lookup indexes.
///
/// Files from the richer legacy layout already carry `start_time` and
/// `end_time`; only missing columns are added.
fn migrate_v2(conn: &Connection) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;

    for column in ["start_time", "end_time"] {
        if !has_column(&tx, "sessions", column)? {
            tx.execute_batch(&format!("ALTER TABLE sessions ADD COLUMN {column} TEXT;"))?;
        }
    }

    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_tasks_scheduled_date ON tasks(scheduled_date);
         CREATE INDEX IF NOT EXISTS idx_sessions_date ON sessions(date);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}

/// Migration v3: key-value table for the timer snapshot.
fn migrate_v3(conn: &Connection) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    set_schema_version(&tx, 3)?;
    tx.commit()
}

fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
        [table, column],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_from_scratch() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(has_column(&conn, "tasks", "scheduled_date").unwrap());
        assert!(has_column(&conn, "sessions", "start_time").unwrap());
        assert!(has_column(&conn, "sessions", "end_time").unwrap());
        assert!(has_column(&conn, "kv", "value").unwrap());
    }

    #[test]
    fn test_migrate_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    /// An untracked file from the compact layout keeps its rows and gains span columns.
    #[test]
    fn test_adopts_untracked_compact_layout() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                status INTEGER DEFAULT 0,
                scheduled_date TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER,
                duration INTEGER,
                type TEXT,
                date TEXT
            );
            INSERT INTO sessions (task_id, duration, type, date)
            VALUES (NULL, 42, 'focus', '2024-03-01');",
        )
        .unwrap();

        migrate(&conn).unwrap();

        let (duration, start): (i64, Option<String>) = conn
            .query_row("SELECT duration, start_time FROM sessions", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(duration, 42);
        assert!(start.is_none());
    }

    /// The richer legacy layout already has span columns; v2 must not re-add them.
    #[test]
    fn test_adopts_untracked_layout_with_span_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER,
                start_time TEXT,
                end_time TEXT,
                duration INTEGER,
                type TEXT,
                date TEXT
            );",
        )
        .unwrap();

        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_rejects_newer_schema() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_version (version INTEGER PRIMARY KEY);
             INSERT INTO schema_version (version) VALUES (99);",
        )
        .unwrap();

        let err = migrate(&conn).unwrap_err();
        assert!(matches!(
            err,
            StorageError::UnsupportedSchemaVersion {
                db_version: 99,
                latest_supported: SCHEMA_VERSION
            }
        ));
    }
}
