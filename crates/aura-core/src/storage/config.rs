//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Timer render cadence, stop policy and preset buttons
//! - Minimum persisted session length and history page size
//! - Export file naming and columns
//!
//! Configuration is stored as `config.toml` in the base directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::CONFIG_FILE_NAME;
use crate::error::ConfigError;
use crate::session::{SessionType, DEFAULT_MIN_SESSION_SECS};

/// What stopping a running timer does with the displayed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopPolicy {
    /// Flush, then clear the display back to zero.
    Idle,
    /// Flush, then keep the displayed total so `start` resumes from it.
    Paused,
}

impl Default for StopPolicy {
    fn default() -> Self {
        StopPolicy::Idle
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Render cadence for interactive loops. Accuracy does not depend on it.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default)]
    pub stop_policy: StopPolicy,
    #[serde(default)]
    pub default_session_type: SessionType,
    /// Preset buttons, in seconds.
    #[serde(default = "default_presets")]
    pub presets: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_min_session_secs")]
    pub min_session_secs: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_export_file_name")]
    pub file_name: String,
    /// Emit the Start Time / End Time columns.
    #[serde(default = "default_true")]
    pub include_span_columns: bool,
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

fn default_tick_interval_ms() -> u64 {
    50
}
fn default_presets() -> Vec<u64> {
    vec![300, 1500, 3600]
}
fn default_min_session_secs() -> u64 {
    DEFAULT_MIN_SESSION_SECS
}
fn default_history_limit() -> u32 {
    30
}
fn default_export_file_name() -> String {
    "aura_sessions.csv".into()
}
fn default_true() -> bool {
    true
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            stop_policy: StopPolicy::default(),
            default_session_type: SessionType::default(),
            presets: default_presets(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            min_session_secs: default_min_session_secs(),
            history_limit: default_history_limit(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_name: default_export_file_name(),
            include_span_columns: true,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                ),
                serde_json::Value::Number(_) => value
                    .parse::<u64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE_NAME)
    }

    /// Load from `dir`, writing defaults when no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load_from(dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::path_in(dir);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(dir)?;
                Ok(cfg)
            }
            Err(err) => Err(ConfigError::LoadFailed {
                path,
                message: err.to_string(),
            }),
        }
    }

    /// Persist to `dir`.
    pub fn save_to(&self, dir: &Path) -> Result<(), ConfigError> {
        let path = Self::path_in(dir);
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.clone(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key, validate, and persist to `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value does not fit the
    /// field, or the config cannot be saved. `self` is unchanged on error.
    pub fn set(&mut self, dir: &Path, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        updated.save_to(dir)?;
        *self = updated;
        Ok(())
    }

    /// Reject values that would break the timer or export.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timer.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timer.tick_interval_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.timer.presets.iter().any(|&secs| secs == 0) {
            return Err(ConfigError::InvalidValue {
                key: "timer.presets".into(),
                message: "presets must be positive".into(),
            });
        }
        let name = self.export.file_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(ConfigError::InvalidValue {
                key: "export.file_name".into(),
                message: "must be a plain file name".into(),
            });
        }
        Ok(())
    }
}
