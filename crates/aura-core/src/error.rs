//! Core error types for aura-core.
//!
//! Validation failures are rejected before anything touches storage.
//! Storage failures are surfaced to the caller, never retried.
//! Missing ids on toggle/delete are not errors at all.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for aura-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Input rejected before reaching the store
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Persistence file could not be opened, read or written
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Task title is empty or whitespace-only
    #[error("task title must not be empty")]
    EmptyTitle,

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database file was written by a newer build
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion { db_version: i64, latest_supported: i64 },

    /// Persisted row cannot be decoded
    #[error("invalid persisted data: {0}")]
    InvalidData(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _msg) => match failure.code {
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy => {
                    StorageError::Locked
                }
                _ => StorageError::QueryFailed(err.to_string()),
            },
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_busy_maps_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(StorageError::from(err), StorageError::Locked));
    }

    #[test]
    fn other_sqlite_errors_map_to_query_failed() {
        let err = rusqlite::Error::QueryReturnedNoRows;
        assert!(matches!(
            StorageError::from(err),
            StorageError::QueryFailed(_)
        ));
    }

    #[test]
    fn core_error_wraps_validation() {
        let err: CoreError = ValidationError::EmptyTitle.into();
        assert_eq!(err.to_string(), "Validation error: task title must not be empty");
    }
}
