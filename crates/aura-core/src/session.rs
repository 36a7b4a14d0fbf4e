//! Session history model.
//!
//! A session is one logged interval of work or break time. History is
//! append-only: rows are written once when the timer stops and outlive the
//! tasks they point at.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ValidationError};
use crate::task::TaskId;
use crate::timer::TimerEngine;

/// Store-assigned session identifier.
pub type SessionId = i64;

/// Minimum duration persisted by default. Shorter intervals are dropped.
pub const DEFAULT_MIN_SESSION_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Work,
    Break,
}

impl SessionType {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionType::Work => "work",
            SessionType::Break => "break",
        }
    }

    /// Decodes a stored type. `focus` is the catch-all used by older data
    /// files and reads as work.
    pub(crate) fn from_db(value: &str) -> Option<Self> {
        match value {
            "work" | "focus" => Some(SessionType::Work),
            "break" => Some(SessionType::Break),
            _ => None,
        }
    }
}

impl Default for SessionType {
    fn default() -> Self {
        SessionType::Work
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SessionType::from_db(s.trim().to_ascii_lowercase().as_str()).ok_or_else(|| {
            ValidationError::InvalidValue {
                field: "session_type".into(),
                message: format!("expected work|break, got '{s}'"),
            }
        })
    }
}

/// A finished interval handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub task_id: Option<TaskId>,
    pub duration_secs: u64,
    pub kind: SessionType,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl NewSession {
    pub fn new(task_id: Option<TaskId>, duration_secs: u64, kind: SessionType) -> Self {
        Self {
            task_id,
            duration_secs,
            kind,
            started_at: None,
            ended_at: None,
        }
    }
}

/// Result of an append: either a new row, or a silent drop below threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AppendOutcome {
    Recorded { id: SessionId },
    Discarded { duration_secs: u64 },
}

impl AppendOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, AppendOutcome::Recorded { .. })
    }
}

/// A persisted session joined with its task title.
///
/// `task_id` and `task_title` are both `None` when the session was logged
/// without a task or when the task has since been deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub task_id: Option<TaskId>,
    pub task_title: Option<String>,
    pub duration_secs: u64,
    pub kind: SessionType,
    pub date: NaiveDate,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Receiver of flushed timer intervals.
///
/// `after` is the engine as it will stand once the flush succeeds. A durable
/// sink writes it in the same transaction as the session, so a crash can never
/// leave a logged interval still marked as running. The minimum-duration
/// policy also lives behind this seam; the engine never decides what is worth
/// keeping.
pub trait SessionSink {
    fn flush_session(&self, session: &NewSession, after: &TimerEngine) -> Result<AppendOutcome>;
}
