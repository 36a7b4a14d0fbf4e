//! Comma-separated export of the full session history.

use chrono::SecondsFormat;
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use super::config::ExportConfig;
use super::database::Store;
use crate::error::Result;
use crate::session::SessionRecord;

const HEADER_WITH_SPAN: [&str; 7] = [
    "ID",
    "Task",
    "Start Time",
    "End Time",
    "Duration(s)",
    "Type",
    "Date",
];
const HEADER_COMPACT: [&str; 5] = ["ID", "Task", "Duration(s)", "Type", "Date"];

/// Where an export landed and how many sessions it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub path: PathBuf,
    pub rows: usize,
}

/// Writes every recorded session, most recent first, into `dir`.
///
/// The file is written beside its final name and renamed into place, so a
/// failed export never truncates a previous one. The temporary file is
/// removed when either step fails.
pub fn export_sessions_csv(store: &Store, dir: &Path, config: &ExportConfig) -> Result<ExportReport> {
    let sessions = store.export_all_sessions()?;
    let path = dir.join(config.file_name.trim());
    let tmp_path = path.with_extension("csv.tmp");

    let written = write_csv(&tmp_path, &sessions, config.include_span_columns)
        .and_then(|()| fs::rename(&tmp_path, &path));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    info!(path = %path.display(), rows = sessions.len(), "sessions exported");
    Ok(ExportReport {
        path,
        rows: sessions.len(),
    })
}

fn write_csv(tmp_path: &Path, sessions: &[SessionRecord], include_span: bool) -> std::io::Result<()> {
    let mut out = BufWriter::new(fs::File::create(tmp_path)?);
    if include_span {
        write_record(&mut out, HEADER_WITH_SPAN.iter().map(|h| h.to_string()))?;
    } else {
        write_record(&mut out, HEADER_COMPACT.iter().map(|h| h.to_string()))?;
    }
    for session in sessions {
        write_record(&mut out, flatten(session, include_span))?;
    }
    out.flush()
}

/// Flattens one session into export columns. Missing values become empty cells.
fn flatten(session: &SessionRecord, include_span: bool) -> impl Iterator<Item = String> {
    let mut cells = vec![
        session.id.to_string(),
        session.task_title.clone().unwrap_or_default(),
    ];
    if include_span {
        cells.push(
            session
                .started_at
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_default(),
        );
        cells.push(
            session
                .ended_at
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_default(),
        );
    }
    cells.push(session.duration_secs.to_string());
    cells.push(session.kind.as_str().to_string());
    cells.push(session.date.format("%Y-%m-%d").to_string());
    cells.into_iter()
}

fn write_record(out: &mut impl Write, cells: impl Iterator<Item = String>) -> std::io::Result<()> {
    let line = cells.map(|cell| escape_cell(&cell)).collect::<Vec<_>>().join(",");
    out.write_all(line.as_bytes())?;
    out.write_all(b"\r\n")
}

fn escape_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
