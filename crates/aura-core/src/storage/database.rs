//! SQLite-backed store for tasks and session history.
//!
//! Provides persistent storage for:
//! - Today's task list (create, toggle, delete)
//! - Append-only session history and its full export
//! - The timer snapshot, kept in the `kv` table so a flush and the state
//!   change it causes commit together
//!
//! Every write runs inside its own transaction so an interrupted call never
//! leaves a partial row behind.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::migrations;
use crate::error::{Result, StorageError};
use crate::session::{
    AppendOutcome, NewSession, SessionRecord, SessionSink, SessionType, DEFAULT_MIN_SESSION_SECS,
};
use crate::task::{normalize_title, Task, TaskId, TaskStatus};
use crate::timer::TimerEngine;

const DATE_FORMAT: &str = "%Y-%m-%d";
const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const CREATED_AT_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// kv key holding the serialized timer engine.
const ENGINE_KEY: &str = "timer_engine";

const TASK_SELECT_SQL: &str = "SELECT id, title, status, scheduled_date, created_at FROM tasks";

const SESSION_SELECT_SQL: &str = "SELECT
    s.id,
    t.id AS task_id,
    t.title AS task_title,
    s.duration,
    s.type,
    s.date,
    s.start_time,
    s.end_time
FROM sessions s
LEFT JOIN tasks t ON s.task_id = t.id";

/// SQLite database holding the `tasks` and `sessions` tables.
pub struct Store {
    conn: Connection,
    min_session_secs: u64,
}

impl Store {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open (creating if needed) the database file at `path`.
    ///
    /// # Errors
    /// Returns `OpenFailed` if the file cannot be opened, or a migration error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::bootstrap(conn)?;
        info!(path = %path.display(), "store opened");
        Ok(store)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::bootstrap(conn)
    }

    fn bootstrap(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        migrations::migrate(&conn)?;
        Ok(Self {
            conn,
            min_session_secs: DEFAULT_MIN_SESSION_SECS,
        })
    }

    /// Override the minimum session duration that gets persisted.
    pub fn with_min_session_secs(mut self, secs: u64) -> Self {
        self.min_session_secs = secs;
        self
    }

    pub fn min_session_secs(&self) -> u64 {
        self.min_session_secs
    }

    // ── Tasks ────────────────────────────────────────────────────────

    /// Insert a pending task scheduled for today.
    ///
    /// # Errors
    /// `ValidationError::EmptyTitle` for empty or whitespace-only titles; no row
    /// is written in that case.
    pub fn create_task(&self, title: &str) -> Result<Task> {
        let title = normalize_title(title)?;
        let scheduled_date = today();
        let created_at = Utc::now();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO tasks (title, status, scheduled_date, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                title,
                TaskStatus::Pending.to_db(),
                scheduled_date.format(DATE_FORMAT).to_string(),
                created_at.format(CREATED_AT_FORMAT).to_string(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!(task_id = id, "task created");
        Ok(Task {
            id,
            title,
            status: TaskStatus::Pending,
            scheduled_date,
            created_at,
        })
    }

    pub fn get_task(&self, id: TaskId) -> Result<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_task_row(row)?)),
            None => Ok(None),
        }
    }

    /// Tasks scheduled for the current local date, pending first, newest first.
    pub fn list_tasks_for_today(&self) -> Result<Vec<Task>> {
        self.list_tasks_for_date(today())
    }

    pub fn list_tasks_for_date(&self, date: NaiveDate) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE scheduled_date = ?1
             ORDER BY status ASC, created_at DESC, id DESC"
        ))?;
        let mut rows = stmt.query([date.format(DATE_FORMAT).to_string()])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    /// Set a task's status. Unknown ids are ignored.
    pub fn set_task_status(&self, id: TaskId, status: TaskStatus) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE tasks SET status = ?1 WHERE id = ?2",
            params![status.to_db(), id],
        )?;
        tx.commit()?;
        if changed == 0 {
            debug!(task_id = id, "set_task_status on missing task ignored");
        }
        Ok(())
    }

    /// Flip Pending and Done as one read-modify-write.
    ///
    /// The read and the write share an immediate transaction, so two rapid
    /// calls always produce two flips. Returns the new status, or `None` when
    /// the task does not exist.
    pub fn toggle_task_status(&self, id: TaskId) -> Result<Option<TaskStatus>> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let current: Option<i64> = tx
            .query_row("SELECT status FROM tasks WHERE id = ?1", [id], |row| {
                row.get::<_, Option<i64>>(0)
            })
            .optional()?
            .map(|status| status.unwrap_or(0));

        let Some(current) = current else {
            debug!(task_id = id, "toggle on missing task ignored");
            return Ok(None);
        };
        let current = TaskStatus::from_db(current).ok_or_else(|| {
            StorageError::InvalidData(format!("invalid status {current} for task {id}"))
        })?;

        let next = current.toggled();
        tx.execute(
            "UPDATE tasks SET status = ?1 WHERE id = ?2",
            params![next.to_db(), id],
        )?;
        tx.commit()?;

        info!(task_id = id, status = ?next, "task toggled");
        Ok(Some(next))
    }

    /// Delete a task. Sessions referencing it are left untouched.
    pub fn delete_task(&self, id: TaskId) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        tx.commit()?;
        if changed == 0 {
            debug!(task_id = id, "delete on missing task ignored");
        } else {
            info!(task_id = id, "task deleted");
        }
        Ok(())
    }

    // ── Sessions ─────────────────────────────────────────────────────

    /// Append a finished interval to history, dated today.
    ///
    /// Intervals shorter than the minimum are dropped and reported as
    /// `Discarded`; this is not an error.
    pub fn append_session(&self, session: &NewSession) -> Result<AppendOutcome> {
        self.write_session(session, None)
    }

    /// Append `session` and store `engine` as the timer state that follows
    /// it, in one transaction. The engine is saved even when the session is
    /// discarded.
    pub fn append_session_and_save_engine(
        &self,
        session: &NewSession,
        engine: &TimerEngine,
    ) -> Result<AppendOutcome> {
        self.write_session(session, Some(engine))
    }

    fn write_session(
        &self,
        session: &NewSession,
        engine: Option<&TimerEngine>,
    ) -> Result<AppendOutcome> {
        let engine_json = engine.map(serde_json::to_string).transpose()?;
        let tx = self.conn.unchecked_transaction()?;

        let outcome = if session.duration_secs < self.min_session_secs {
            debug!(
                duration_secs = session.duration_secs,
                min_secs = self.min_session_secs,
                "session below minimum discarded"
            );
            AppendOutcome::Discarded {
                duration_secs: session.duration_secs,
            }
        } else {
            let duration = i64::try_from(session.duration_secs).map_err(|_| {
                StorageError::InvalidData(format!(
                    "session duration {} out of range",
                    session.duration_secs
                ))
            })?;
            tx.execute(
                "INSERT INTO sessions (task_id, start_time, end_time, duration, type, date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    session.task_id,
                    session.started_at.map(format_instant),
                    session.ended_at.map(format_instant),
                    duration,
                    session.kind.as_str(),
                    today().format(DATE_FORMAT).to_string(),
                ],
            )?;
            AppendOutcome::Recorded {
                id: tx.last_insert_rowid(),
            }
        };

        if let Some(json) = &engine_json {
            upsert_kv(&tx, ENGINE_KEY, json)?;
        }
        tx.commit()?;

        if let AppendOutcome::Recorded { id } = outcome {
            info!(
                session_id = id,
                task_id = ?session.task_id,
                duration_secs = session.duration_secs,
                kind = %session.kind,
                "session recorded"
            );
        }
        Ok(outcome)
    }

    /// Most recent sessions first, at most `limit` rows.
    pub fn list_recent_sessions(&self, limit: u32) -> Result<Vec<SessionRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SESSION_SELECT_SQL} ORDER BY s.id DESC LIMIT ?1"))?;
        let mut rows = stmt.query([i64::from(limit)])?;
        collect_sessions(&mut rows)
    }

    /// Every session ever recorded, most recent first.
    pub fn export_all_sessions(&self) -> Result<Vec<SessionRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SESSION_SELECT_SQL} ORDER BY s.id DESC"))?;
        let mut rows = stmt.query([])?;
        collect_sessions(&mut rows)
    }

    pub fn count_sessions(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    // ── Key-value ────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        upsert_kv(&tx, key, value)?;
        tx.commit()?;
        Ok(())
    }

    /// The saved timer, if any.
    ///
    /// # Errors
    /// A snapshot that no longer decodes is an error rather than an idle
    /// timer, so a running interval is never dropped unnoticed.
    pub fn load_engine(&self) -> Result<Option<TimerEngine>> {
        match self.kv_get(ENGINE_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save_engine(&self, engine: &TimerEngine) -> Result<()> {
        self.kv_set(ENGINE_KEY, &serde_json::to_string(engine)?)
    }
}

impl SessionSink for Store {
    fn flush_session(&self, session: &NewSession, after: &TimerEngine) -> Result<AppendOutcome> {
        self.append_session_and_save_engine(session, after)
    }
}

/// Current local calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn upsert_kv(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

fn format_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_date(value: &str, column: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
        StorageError::InvalidData(format!("invalid date `{value}` in {column}")).into()
    })
}

fn parse_task_row(row: &Row<'_>) -> Result<Task> {
    let id: TaskId = row.get("id")?;

    let status_value: Option<i64> = row.get("status")?;
    let status_value = status_value.unwrap_or(0);
    let status = TaskStatus::from_db(status_value).ok_or_else(|| {
        StorageError::InvalidData(format!("invalid status {status_value} for task {id}"))
    })?;

    let date_text: Option<String> = row.get("scheduled_date")?;
    let date_text = date_text.ok_or_else(|| {
        StorageError::InvalidData(format!("task {id} has no scheduled_date"))
    })?;
    let scheduled_date = parse_date(&date_text, "tasks.scheduled_date")?;

    let created_text: Option<String> = row.get("created_at")?;
    let created_text = created_text
        .ok_or_else(|| StorageError::InvalidData(format!("task {id} has no created_at")))?;
    let created_at = NaiveDateTime::parse_from_str(&created_text, CREATED_AT_PARSE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| {
            StorageError::InvalidData(format!(
                "invalid timestamp `{created_text}` in tasks.created_at"
            ))
        })?;

    Ok(Task {
        id,
        title: row.get("title")?,
        status,
        scheduled_date,
        created_at,
    })
}

fn collect_sessions(rows: &mut rusqlite::Rows<'_>) -> Result<Vec<SessionRecord>> {
    let mut sessions = Vec::new();
    while let Some(row) = rows.next()? {
        sessions.push(parse_session_row(row)?);
    }
    Ok(sessions)
}

fn parse_session_row(row: &Row<'_>) -> Result<SessionRecord> {
    let id: i64 = row.get("id")?;

    let duration: Option<i64> = row.get("duration")?;
    let duration = duration.unwrap_or(0);
    let duration_secs = u64::try_from(duration).map_err(|_| {
        StorageError::InvalidData(format!("negative duration {duration} for session {id}"))
    })?;

    let type_text: Option<String> = row.get("type")?;
    let type_text = type_text.unwrap_or_default();
    let kind = SessionType::from_db(&type_text).ok_or_else(|| {
        StorageError::InvalidData(format!("invalid type `{type_text}` for session {id}"))
    })?;

    let date_text: Option<String> = row.get("date")?;
    let date_text = date_text
        .ok_or_else(|| StorageError::InvalidData(format!("session {id} has no date")))?;
    let date = parse_date(&date_text, "sessions.date")?;

    Ok(SessionRecord {
        id,
        task_id: row.get("task_id")?,
        task_title: row.get("task_title")?,
        duration_secs,
        kind,
        date,
        started_at: parse_instant(row.get("start_time")?, id)?,
        ended_at: parse_instant(row.get("end_time")?, id)?,
    })
}

/// Span columns are optional; older files stored an empty string.
fn parse_instant(value: Option<String>, session_id: i64) -> Result<Option<DateTime<Utc>>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => DateTime::parse_from_rfc3339(text)
            .map(|at| Some(at.with_timezone(&Utc)))
            .map_err(|_| {
                StorageError::InvalidData(format!(
                    "invalid timestamp `{text}` for session {session_id}"
                ))
                .into()
            }),
    }
}
