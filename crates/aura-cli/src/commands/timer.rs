//! Timer commands for CLI.
//!
//! The engine is saved in the database after every command, so a timer
//! started by one invocation keeps accruing until another stops it.

use std::io::Write;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use aura_core::{AppendOutcome, FocusApp, SessionType, TaskId, TimerSnapshot, TimerState};
use clap::Subcommand;
use serde_json::json;
use tracing::debug;

use super::{open_app, CmdResult, Output};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the timer
    Start {
        /// Attribute the time to this task
        #[arg(long)]
        task: Option<TaskId>,
        /// Session kind: work or break
        #[arg(long)]
        kind: Option<SessionType>,
    },
    /// Stop the timer and log the interval
    Stop,
    /// Zero the timer, logging a running interval first
    Reset,
    /// Reset and show a starting value: 5m, 25m, 1h, or plain seconds
    Preset {
        #[arg(value_parser = parse_preset)]
        duration: u64,
    },
    /// List the configured preset buttons (`timer.presets`)
    Presets,
    /// Show the current timer
    Status,
    /// Run the timer in the foreground until Enter is pressed
    Focus {
        /// Attribute the time to this task
        #[arg(long)]
        task: Option<TaskId>,
        /// Session kind: work or break
        #[arg(long)]
        kind: Option<SessionType>,
    },
}

pub fn run(action: TimerAction, out: Output) -> CmdResult {
    let mut app = open_app()?;

    match action {
        TimerAction::Start { task, kind } => {
            prepare(&mut app, task, kind)?;
            if !app.start_timer() {
                eprintln!("timer is already running");
            }
            let snapshot = app.tick();
            out.emit(&snapshot, &render(&snapshot))?;
        }
        TimerAction::Stop => {
            let outcome = app.pause_or_stop_timer()?;
            report(&app, outcome, out)?;
        }
        TimerAction::Reset => {
            let outcome = app.reset_timer()?;
            report(&app, outcome, out)?;
        }
        TimerAction::Preset { duration } => {
            let outcome = app.set_preset(duration)?;
            report(&app, outcome, out)?;
        }
        TimerAction::Presets => {
            let presets = &app.config().timer.presets;
            let labels: Vec<String> = presets.iter().map(|&secs| preset_label(secs)).collect();
            let rows: Vec<_> = presets
                .iter()
                .zip(&labels)
                .map(|(secs, label)| json!({ "secs": secs, "label": label }))
                .collect();
            out.emit(&rows, &labels.join("  "))?;
        }
        TimerAction::Status => {
            let snapshot = app.tick();
            out.emit(&snapshot, &render(&snapshot))?;
        }
        TimerAction::Focus { task, kind } => {
            prepare(&mut app, task, kind)?;
            app.start_timer();
            app.persist_timer()?;
            focus_loop(&mut app, out)?;
            let outcome = app.pause_or_stop_timer()?;
            report(&app, outcome, out)?;
        }
    }

    app.persist_timer()?;
    Ok(())
}

fn prepare(app: &mut FocusApp, task: Option<TaskId>, kind: Option<SessionType>) -> CmdResult {
    if task.is_some() && !app.select_task(task)? {
        let current = app
            .engine()
            .task_id()
            .map_or_else(|| "unset".to_string(), |id| id.to_string());
        eprintln!("timer is running; task stays {current}");
    }
    if let Some(kind) = kind {
        if !app.set_session_type(kind) {
            eprintln!("timer is running; kind stays {}", app.engine().kind());
        }
    }
    Ok(())
}

/// Redraws the clock every `tick_interval_ms` until a line arrives on stdin.
fn focus_loop(app: &mut FocusApp, out: Output) -> CmdResult {
    let interval = Duration::from_millis(app.config().timer.tick_interval_ms.max(1));
    let (tx, rx) = mpsc::channel::<()>();
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        let _ = tx.send(());
    });

    if !out.json {
        eprintln!("Focusing. Press Enter to stop.");
    }
    loop {
        match rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                let snapshot = app.tick();
                if !out.json {
                    let mut stdout = std::io::stdout().lock();
                    write!(stdout, "\r{}.{:02}", snapshot.display, snapshot.centis)?;
                    stdout.flush()?;
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    if !out.json {
        println!();
    }
    debug!("focus loop finished");
    Ok(())
}

fn report(app: &FocusApp, outcome: Option<AppendOutcome>, out: Output) -> CmdResult {
    let snapshot = app.timer_snapshot();
    let headline = match outcome {
        Some(AppendOutcome::Recorded { id }) => format!("Session {id} logged."),
        Some(AppendOutcome::Discarded { duration_secs }) => format!(
            "{duration_secs}s is under the {}s minimum; nothing logged.",
            app.store().min_session_secs()
        ),
        None => "Timer was not running.".to_string(),
    };
    out.emit(
        &json!({ "outcome": outcome, "timer": snapshot }),
        &format!("{headline}\n{}", render(&snapshot)),
    )
}

fn render(snapshot: &TimerSnapshot) -> String {
    let state = match snapshot.state {
        TimerState::Idle => "idle",
        TimerState::Running => "running",
        TimerState::Paused => "paused",
    };
    let task = snapshot
        .task_id
        .map(|id| format!(" task {id}"))
        .unwrap_or_default();
    format!(
        "{}.{:02}  {state} ({}{task})",
        snapshot.display, snapshot.centis, snapshot.kind
    )
}

/// Shortest form of `secs` that [`parse_preset`] reads back.
fn preset_label(secs: u64) -> String {
    match secs {
        s if s % 3600 == 0 => format!("{}h", s / 3600),
        s if s % 60 == 0 => format!("{}m", s / 60),
        s => format!("{s}s"),
    }
}

/// Parses `5m`, `25m`, `1h`, `90s` or a bare number of seconds.
fn parse_preset(raw: &str) -> Result<u64, String> {
    let raw = raw.trim().to_ascii_lowercase();
    let (digits, unit) = match raw.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => raw.split_at(idx),
        None => (raw.as_str(), "s"),
    };
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration '{raw}'"))?;
    let secs = match unit {
        "s" => Some(value),
        "m" => value.checked_mul(60),
        "h" => value.checked_mul(3600),
        _ => return Err(format!("unknown unit in '{raw}' (use s, m or h)")),
    }
    .ok_or_else(|| format!("duration '{raw}' is too large"))?;
    if secs == 0 {
        return Err("duration must be at least one second".into());
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::timer::format_elapsed;

    #[test]
    fn parse_preset_accepts_buttons_and_seconds() {
        assert_eq!(parse_preset("5m"), Ok(300));
        assert_eq!(parse_preset("25m"), Ok(1500));
        assert_eq!(parse_preset("1h"), Ok(3600));
        assert_eq!(parse_preset("90"), Ok(90));
        assert_eq!(parse_preset("45S"), Ok(45));
    }

    #[test]
    fn parse_preset_rejects_garbage() {
        assert!(parse_preset("").is_err());
        assert!(parse_preset("0").is_err());
        assert!(parse_preset("m").is_err());
        assert!(parse_preset("10d").is_err());
        assert!(parse_preset("1h30m").is_err());
    }

    #[test]
    fn preset_labels_read_back() {
        assert_eq!(preset_label(300), "5m");
        assert_eq!(preset_label(3600), "1h");
        assert_eq!(preset_label(90), "90s");
        for secs in [300, 1500, 3600, 5400, 45] {
            assert_eq!(parse_preset(&preset_label(secs)), Ok(secs));
        }
    }

    #[test]
    fn render_shows_clock_and_state() {
        let snapshot = TimerSnapshot {
            state: TimerState::Paused,
            elapsed_ms: 65_430,
            unflushed_ms: 0,
            display: format_elapsed(65_430).0,
            centis: 43,
            task_id: Some(4),
            kind: SessionType::Work,
        };
        assert_eq!(render(&snapshot), "00:01:05.43  paused (work task 4)");
    }
}
