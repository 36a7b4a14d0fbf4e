use aura_core::storage::Config;
use clap::Subcommand;
use serde_json::json;

use super::{CmdResult, Output};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the whole configuration
    Show,
    /// Get a config value
    Get {
        /// Dot-separated key (e.g. "timer.stop_policy", "store.min_session_secs")
        key: String,
    },
    /// Set a config value
    Set {
        /// Dot-separated key
        key: String,
        /// New value
        value: String,
    },
    /// Print the config file location
    Path,
}

pub fn run(action: ConfigAction, out: Output) -> CmdResult {
    let dir = aura_core::base_dir()?;

    match action {
        ConfigAction::Show => {
            let config = Config::load_from(&dir)?;
            out.emit(&config, toml::to_string_pretty(&config)?.trim_end())?;
        }
        ConfigAction::Get { key } => {
            let config = Config::load_from(&dir)?;
            match config.get(&key) {
                Some(value) => out.emit(&json!({ "key": key, "value": value }), &value)?,
                None => {
                    eprintln!("unknown key: {key}");
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load_from(&dir)?;
            config.set(&dir, &key, &value)?;
            out.emit(&json!({ "key": key, "value": config.get(&key) }), "ok")?;
        }
        ConfigAction::Path => {
            let path = Config::path_in(&dir);
            out.emit(&json!({ "path": path }), &path.display().to_string())?;
        }
    }
    Ok(())
}
