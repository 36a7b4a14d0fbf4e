mod config;
pub mod database;
pub mod export;
pub mod migrations;

pub use config::{Config, ExportConfig, StopPolicy, StoreConfig, TimerConfig};
pub use database::{today, Store};
pub use export::{export_sessions_csv, ExportReport};

use std::path::{Path, PathBuf};

/// Environment variable that pins the data directory.
pub const HOME_ENV: &str = "AURA_FOCUS_HOME";

pub const DB_FILE_NAME: &str = "aura_data.db";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Returns the directory that holds the database, config and exports.
///
/// Data travels with the program rather than living in a per-user system
/// path. Resolution order:
/// 1. `AURA_FOCUS_HOME`, when set and non-empty.
/// 2. Debug builds: the crate source directory.
/// 3. The directory containing the running executable.
///
/// # Errors
/// Returns an error if the executable path cannot be determined or if
/// creating the directory fails.
pub fn base_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var(HOME_ENV) {
        Ok(raw) if !raw.trim().is_empty() => PathBuf::from(raw.trim()),
        _ if cfg!(debug_assertions) => PathBuf::from(env!("CARGO_MANIFEST_DIR")),
        _ => executable_dir()?,
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn executable_dir() -> std::io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    exe.parent().map(Path::to_path_buf).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("executable {} has no parent directory", exe.display()),
        )
    })
}
