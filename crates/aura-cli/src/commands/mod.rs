pub mod config;
pub mod export;
pub mod history;
pub mod task;
pub mod timer;

use aura_core::FocusApp;
use serde::Serialize;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Output mode selected by the global `--json` flag.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

impl Output {
    /// Print `value` as JSON, or `text` otherwise.
    pub fn emit<T: Serialize + ?Sized>(&self, value: &T, text: &str) -> CmdResult {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{text}");
        }
        Ok(())
    }
}

pub fn open_app() -> Result<FocusApp, Box<dyn std::error::Error>> {
    let dir = aura_core::base_dir()?;
    Ok(FocusApp::open(&dir)?)
}
