//! Presentation-boundary facade.
//!
//! A UI owns one [`FocusApp`] and calls into it on user intent, then re-polls
//! whatever it renders. Nothing here pushes to the UI.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Result, ValidationError};
use crate::session::{AppendOutcome, SessionRecord, SessionType};
use crate::storage::{export_sessions_csv, Config, Store, DB_FILE_NAME};
use crate::task::{Task, TaskId, TaskRegistry, TaskStatus};
use crate::timer::{Clock, SystemClock, TimerEngine, TimerSnapshot};

/// Result of a listing call.
///
/// The UI usually renders both variants as a list (possibly empty); tests and
/// logs can still tell an empty day from a failed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing<T> {
    Items(Vec<T>),
    Failed(String),
}

impl<T> Listing<T> {
    /// The listed items, or an empty slice on failure.
    pub fn items(&self) -> &[T] {
        match self {
            Listing::Items(items) => items,
            Listing::Failed(_) => &[],
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Listing::Failed(_))
    }
}

impl<T> From<Result<Vec<T>>> for Listing<T> {
    fn from(result: Result<Vec<T>>) -> Self {
        match result {
            Ok(items) => Listing::Items(items),
            Err(e) => {
                warn!(error = %e, "listing failed");
                Listing::Failed(e.to_string())
            }
        }
    }
}

/// Owns the store, the timer engine and the loaded configuration.
pub struct FocusApp<C: Clock = SystemClock> {
    base_dir: PathBuf,
    store: Store,
    engine: TimerEngine,
    config: Config,
    clock: C,
}

impl FocusApp<SystemClock> {
    /// Open the app rooted at `base_dir`: config, database and the timer
    /// saved in it.
    ///
    /// # Errors
    /// Config and database failures, including an unreadable saved timer.
    pub fn open(base_dir: &Path) -> Result<Self> {
        let config = Config::load_from(base_dir)?;
        let store = Store::open(base_dir.join(DB_FILE_NAME))?
            .with_min_session_secs(config.store.min_session_secs);
        let engine = store
            .load_engine()?
            .unwrap_or_else(|| fresh_engine(&config));

        Ok(Self::with_parts(base_dir, store, config, engine, SystemClock))
    }
}

impl<C: Clock> FocusApp<C> {
    /// Assemble from explicit parts. The engine adopts the configured stop
    /// policy.
    pub fn with_parts(
        base_dir: &Path,
        store: Store,
        config: Config,
        mut engine: TimerEngine,
        clock: C,
    ) -> Self {
        engine.set_stop_policy(config.timer.stop_policy);
        Self {
            base_dir: base_dir.to_path_buf(),
            store,
            engine,
            config,
            clock,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Save the timer so a later process can pick it up. Stops, resets and
    /// presets that flush an interval save it on their own.
    pub fn persist_timer(&self) -> Result<()> {
        self.store.save_engine(&self.engine)
    }

    // ── Tasks ────────────────────────────────────────────────────────

    pub fn list_today(&self) -> Listing<Task> {
        self.registry().list_today().into()
    }

    pub fn create_task(&self, title: &str) -> Result<Task> {
        self.registry().create(title)
    }

    pub fn toggle_task(&self, id: TaskId) -> Result<Option<TaskStatus>> {
        self.registry().toggle(id)
    }

    pub fn delete_task(&self, id: TaskId) -> Result<()> {
        self.registry().remove(id)
    }

    fn registry(&self) -> TaskRegistry<'_> {
        TaskRegistry::new(&self.store)
    }

    // ── Timer ────────────────────────────────────────────────────────

    /// Attribute upcoming time to `task_id`, or to no task. Returns `false`
    /// while running; the current interval keeps its task.
    ///
    /// # Errors
    /// `ValidationError::InvalidValue` if the task does not exist.
    pub fn select_task(&mut self, task_id: Option<TaskId>) -> Result<bool> {
        if let Some(id) = task_id {
            if self.store.get_task(id)?.is_none() {
                return Err(ValidationError::InvalidValue {
                    field: "task_id".into(),
                    message: format!("no task with id {id}"),
                }
                .into());
            }
        }
        Ok(self.engine.select_task(task_id))
    }

    /// Returns `false` while running; the current interval keeps its kind.
    pub fn set_session_type(&mut self, kind: SessionType) -> bool {
        self.engine.set_kind(kind)
    }

    pub fn start_timer(&mut self) -> bool {
        let started = self.engine.start(self.clock.now_ms());
        if started {
            info!(task_id = ?self.engine.task_id(), kind = %self.engine.kind(), "timer started");
        }
        started
    }

    pub fn tick(&mut self) -> TimerSnapshot {
        self.engine.tick(self.clock.now_ms());
        self.engine.snapshot()
    }

    /// Stop a running timer and log its interval. `None` if it was not running.
    pub fn pause_or_stop_timer(&mut self) -> Result<Option<AppendOutcome>> {
        self.engine.stop(self.clock.now_ms(), &self.store)
    }

    /// Zero the timer, logging a running interval first.
    pub fn reset_timer(&mut self) -> Result<Option<AppendOutcome>> {
        self.engine.reset(self.clock.now_ms(), &self.store)
    }

    /// Reset, then show `secs` as the starting value.
    ///
    /// # Errors
    /// `ValidationError::InvalidValue` for a zero preset.
    pub fn set_preset(&mut self, secs: u64) -> Result<Option<AppendOutcome>> {
        if secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "preset".into(),
                message: "preset must be at least one second".into(),
            }
            .into());
        }
        self.engine.set_preset(secs, self.clock.now_ms(), &self.store)
    }

    pub fn timer_snapshot(&self) -> TimerSnapshot {
        self.engine.snapshot()
    }

    // ── History ──────────────────────────────────────────────────────

    pub fn recent_history(&self, limit: u32) -> Listing<SessionRecord> {
        self.store.list_recent_sessions(limit).into()
    }

    /// Write the full history to the configured export file.
    ///
    /// Returns a message for the user either way.
    pub fn export_all(&self) -> std::result::Result<String, String> {
        match export_sessions_csv(&self.store, &self.base_dir, &self.config.export) {
            Ok(report) => Ok(format!(
                "Exported {} sessions to {}",
                report.rows,
                report.path.display()
            )),
            Err(e) => {
                warn!(error = %e, "export failed");
                Err(format!("Error: {e}"))
            }
        }
    }
}

fn fresh_engine(config: &Config) -> TimerEngine {
    TimerEngine::new(config.timer.stop_policy, config.timer.default_session_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StopPolicy;
    use crate::timer::{ManualClock, TimerState};
    use tempfile::TempDir;

    fn app_with(config: Config) -> (TempDir, FocusApp<ManualClock>) {
        let dir = TempDir::new().unwrap();
        let store = Store::open_memory()
            .unwrap()
            .with_min_session_secs(config.store.min_session_secs);
        let engine = TimerEngine::default();
        let app = FocusApp::with_parts(
            dir.path(),
            store,
            config,
            engine,
            ManualClock::new(1_700_000_000_000),
        );
        (dir, app)
    }

    fn app() -> (TempDir, FocusApp<ManualClock>) {
        app_with(Config::default())
    }

    #[test]
    fn new_task_lists_first_and_sinks_below_pending_when_done() {
        let (_dir, app) = app();
        let older = app.create_task("Inbox zero").unwrap();
        let report = app.create_task("Write report").unwrap();

        let titles: Vec<_> = app
            .list_today()
            .items()
            .iter()
            .map(|t| t.title.clone())
            .collect();
        assert_eq!(titles, vec!["Write report", "Inbox zero"]);

        assert_eq!(app.toggle_task(report.id).unwrap(), Some(TaskStatus::Done));
        let listed = app.list_today();
        assert_eq!(listed.items()[0].id, older.id);
        assert_eq!(listed.items()[1].id, report.id);
        assert!(listed.items()[1].is_done());
    }

    #[test]
    fn failed_listing_is_distinct_from_empty() {
        let (_dir, app) = app();
        assert_eq!(app.list_today(), Listing::Items(vec![]));

        app.store().conn().execute_batch("DROP TABLE tasks").unwrap();
        let listed = app.list_today();
        assert!(listed.is_failed());
        assert!(listed.items().is_empty());
    }

    #[test]
    fn focus_interval_is_logged_against_selected_task() {
        let (_dir, mut app) = app();
        let task = app.create_task("Deep work").unwrap();
        app.select_task(Some(task.id)).unwrap();

        assert!(app.start_timer());
        for _ in 0..200 {
            app.clock().advance(50);
            app.tick();
        }
        let outcome = app.pause_or_stop_timer().unwrap();
        assert!(outcome.is_some_and(|o| o.is_recorded()));

        let history = app.recent_history(30);
        assert_eq!(history.items().len(), 1);
        assert_eq!(history.items()[0].duration_secs, 10);
        assert_eq!(history.items()[0].task_title.as_deref(), Some("Deep work"));
    }

    #[test]
    fn short_interval_is_dropped_by_store() {
        let (_dir, mut app) = app();
        app.start_timer();
        app.clock().advance(2_000);
        let outcome = app.pause_or_stop_timer().unwrap();
        assert_eq!(
            outcome,
            Some(AppendOutcome::Discarded { duration_secs: 2 })
        );
        assert_eq!(app.store().count_sessions().unwrap(), 0);
        assert_eq!(app.timer_snapshot().state, TimerState::Idle);
    }

    #[test]
    fn select_unknown_task_is_rejected() {
        let (_dir, mut app) = app();
        assert!(app.select_task(Some(42)).is_err());
        assert_eq!(app.engine().task_id(), None);
    }

    #[test]
    fn running_interval_keeps_its_task() {
        let (_dir, mut app) = app();
        let first = app.create_task("Draft").unwrap();
        let second = app.create_task("Review").unwrap();
        assert!(app.select_task(Some(first.id)).unwrap());

        app.start_timer();
        app.clock().advance(30_000);
        assert!(!app.select_task(Some(second.id)).unwrap());
        assert!(!app.select_task(None).unwrap());
        app.pause_or_stop_timer().unwrap();

        let history = app.recent_history(30);
        assert_eq!(history.items()[0].task_title.as_deref(), Some("Draft"));
        assert!(app.select_task(Some(second.id)).unwrap());
    }

    #[test]
    fn zero_preset_is_rejected() {
        let (_dir, mut app) = app();
        assert!(app.set_preset(0).is_err());
        app.set_preset(3600).unwrap();
        assert_eq!(app.timer_snapshot().display, "01:00:00");
    }

    #[test]
    fn configured_stop_policy_is_applied() {
        let mut config = Config::default();
        config.timer.stop_policy = StopPolicy::Paused;
        let (_dir, mut app) = app_with(config);

        app.start_timer();
        app.clock().advance(6_000);
        app.pause_or_stop_timer().unwrap();
        let snapshot = app.timer_snapshot();
        assert_eq!(snapshot.state, TimerState::Paused);
        assert_eq!(snapshot.display, "00:00:06");
    }

    #[test]
    fn export_reports_path_or_error_message() {
        let (dir, mut app) = app();
        app.start_timer();
        app.clock().advance(30_000);
        app.pause_or_stop_timer().unwrap();

        let message = app.export_all().unwrap();
        assert!(message.starts_with("Exported 1 sessions to "));
        assert!(dir.path().join("aura_sessions.csv").exists());

        let gone = dir.path().to_path_buf();
        drop(dir);
        let err = app.export_all().unwrap_err();
        assert!(err.starts_with("Error: "), "{err}");
        assert!(!gone.exists());
    }

    #[test]
    fn open_restores_persisted_timer() {
        let dir = TempDir::new().unwrap();
        {
            let mut app = FocusApp::open(dir.path()).unwrap();
            app.start_timer();
            app.persist_timer().unwrap();
        }
        let app = FocusApp::open(dir.path()).unwrap();
        assert_eq!(app.timer_snapshot().state, TimerState::Running);
        assert!(dir.path().join("aura_data.db").exists());
        assert!(dir.path().join("config.toml").exists());
    }

    /// Each call stands for one short-lived process over the same directory.
    fn reopen(dir: &Path, now_ms: u64) -> FocusApp<ManualClock> {
        let config = Config::default();
        let store = Store::open(dir.join(DB_FILE_NAME))
            .unwrap()
            .with_min_session_secs(0);
        let engine = store.load_engine().unwrap().unwrap_or_default();
        FocusApp::with_parts(dir, store, config, engine, ManualClock::new(now_ms))
    }

    #[test]
    fn stop_in_a_later_process_logs_once() {
        let dir = TempDir::new().unwrap();
        let t0 = 1_700_000_000_000;
        {
            let mut app = reopen(dir.path(), t0);
            app.start_timer();
            app.persist_timer().unwrap();
        }
        {
            // No explicit save after the stop.
            let mut app = reopen(dir.path(), t0 + 20_000);
            assert!(app.pause_or_stop_timer().unwrap().is_some());
        }
        {
            let mut app = reopen(dir.path(), t0 + 40_000);
            assert_eq!(app.timer_snapshot().state, TimerState::Idle);
            assert_eq!(app.pause_or_stop_timer().unwrap(), None);
        }
        let app = reopen(dir.path(), t0 + 60_000);
        assert_eq!(app.store().count_sessions().unwrap(), 1);
        assert_eq!(app.recent_history(30).items()[0].duration_secs, 20);
    }

    #[test]
    fn unreadable_saved_timer_fails_open() {
        let dir = TempDir::new().unwrap();
        {
            let app = FocusApp::open(dir.path()).unwrap();
            app.store().kv_set("timer_engine", "{\"state\":").unwrap();
        }
        assert!(FocusApp::open(dir.path()).is_err());
    }
}
