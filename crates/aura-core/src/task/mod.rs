//! Task model for the daily focus list.
//!
//! A task belongs to exactly one calendar day (`scheduled_date`, local time).
//! It is visible only while that day is "today"; after midnight it drops out
//! of the list without being deleted.

mod registry;

pub use registry::TaskRegistry;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Store-assigned task identifier.
pub type TaskId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Done,
}

impl TaskStatus {
    /// The status a toggle moves to.
    pub fn toggled(self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::Pending,
        }
    }

    pub(crate) fn to_db(self) -> i64 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Done => 1,
        }
    }

    pub(crate) fn from_db(value: i64) -> Option<Self> {
        match value {
            0 => Some(TaskStatus::Pending),
            1 => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    /// Local calendar day the task belongs to. Never changes after creation.
    pub scheduled_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

/// Trims a user-supplied title, rejecting empty and whitespace-only input.
pub fn normalize_title(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggled_flips_between_pending_and_done() {
        assert_eq!(TaskStatus::Pending.toggled(), TaskStatus::Done);
        assert_eq!(TaskStatus::Done.toggled(), TaskStatus::Pending);
    }

    #[test]
    fn status_db_encoding_matches_legacy_integers() {
        assert_eq!(TaskStatus::Pending.to_db(), 0);
        assert_eq!(TaskStatus::Done.to_db(), 1);
        assert_eq!(TaskStatus::from_db(1), Some(TaskStatus::Done));
        assert_eq!(TaskStatus::from_db(7), None);
    }

    #[test]
    fn normalize_title_trims_and_rejects_blank() {
        assert_eq!(normalize_title("  Write report \n").unwrap(), "Write report");
        assert_eq!(normalize_title(""), Err(ValidationError::EmptyTitle));
        assert_eq!(normalize_title(" \t\r\n"), Err(ValidationError::EmptyTitle));
    }
}
