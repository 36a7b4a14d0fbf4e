use aura_core::timer::format_elapsed;
use aura_core::SessionRecord;
use chrono::Local;

use super::{open_app, CmdResult, Output};

pub fn run(limit: Option<u32>, out: Output) -> CmdResult {
    let app = open_app()?;
    let limit = limit.unwrap_or(app.config().store.history_limit);
    let listing = app.recent_history(limit);
    let sessions = listing.items();

    let text = if sessions.is_empty() {
        "No sessions yet.".to_string()
    } else {
        sessions.iter().map(render).collect::<Vec<_>>().join("\n")
    };
    out.emit(sessions, &text)
}

fn render(session: &SessionRecord) -> String {
    let started = session
        .started_at
        .map(|at| at.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".into());
    format!(
        "{:>5}  {} {started}  {:<5}  {}  {}",
        session.id,
        session.date,
        session.kind.as_str(),
        format_elapsed(session.duration_secs.saturating_mul(1000)).0,
        session.task_title.as_deref().unwrap_or("-"),
    )
}
