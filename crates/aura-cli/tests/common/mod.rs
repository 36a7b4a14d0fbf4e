//! Common utilities for CLI E2E tests.

#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Stdio};

/// Invoke the CLI with its data directory pinned to `home`.
pub fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_aura-focus"))
        .args(args)
        .env("AURA_FOCUS_HOME", home)
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

/// Invoke the CLI and expect success.
pub fn run_cli_success(home: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(
        code, 0,
        "CLI command failed with code {code}: {args:?}\nstderr: {stderr}"
    );
    stdout
}

/// Invoke the CLI and expect failure.
pub fn run_cli_failure(home: &Path, args: &[&str]) -> (String, String, i32) {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_ne!(code, 0, "CLI command unexpectedly succeeded: {args:?}");
    (stdout, stderr, code)
}

/// Invoke with `--json` and parse stdout.
pub fn run_json(home: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    let stdout = run_cli_success(home, &full);
    serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("invalid JSON from {args:?}: {e}\n{stdout}"))
}
