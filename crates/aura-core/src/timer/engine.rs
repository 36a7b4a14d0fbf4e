//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()` periodically.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Idle            (stop policy: idle)
//! Idle -> Running -> Paused -> ...   (stop policy: paused)
//! ```
//!
//! Time accrues as the sum of deltas between consecutive observations, so a
//! missed tick or a suspended process costs nothing: the next observation
//! picks up the whole gap. Leaving `Running` flushes the unflushed active time
//! to a [`SessionSink`] exactly once, together with the state that follows,
//! and the engine adopts that state only once the sink accepts it. The engine
//! never filters short intervals; that policy belongs to the sink.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::default();
//! engine.start(clock.now_ms());
//! // In a loop:
//! engine.tick(clock.now_ms());
//! // On user intent:
//! engine.stop(clock.now_ms(), &store)?;
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::{AppendOutcome, NewSession, SessionSink, SessionType};
use crate::storage::StopPolicy;
use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    /// Not running; nothing unflushed.
    Idle,
    /// Accumulating active time.
    Running,
    /// Stopped under the paused policy; the display total is kept.
    Paused,
}

/// Read-only view for renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub state: TimerState,
    /// Preset/baseline plus active time, in milliseconds.
    pub elapsed_ms: u64,
    /// Active time not yet written to history.
    pub unflushed_ms: u64,
    /// `HH:MM:SS`
    pub display: String,
    /// Hundredths of a second, 0..=99.
    pub centis: u8,
    pub task_id: Option<TaskId>,
    pub kind: SessionType,
}

/// Core timer engine.
///
/// Operates on wall-clock deltas -- no internal thread.
/// The caller is responsible for calling `tick()` periodically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    state: TimerState,
    /// Active milliseconds since the last flush.
    accumulated_ms: u64,
    /// Display offset: a preset, or time already flushed under the paused policy.
    #[serde(default)]
    baseline_ms: u64,
    /// Timestamp (ms since epoch) of the last observation while running.
    #[serde(default)]
    last_tick_epoch_ms: Option<u64>,
    /// First start since the last flush, for the session's start column.
    #[serde(default)]
    interval_started_epoch_ms: Option<u64>,
    #[serde(default)]
    task_id: Option<TaskId>,
    #[serde(default)]
    kind: SessionType,
    #[serde(default)]
    stop_policy: StopPolicy,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(StopPolicy::default(), SessionType::default())
    }
}

impl TimerEngine {
    /// Create an idle engine.
    pub fn new(stop_policy: StopPolicy, kind: SessionType) -> Self {
        Self {
            state: TimerState::Idle,
            accumulated_ms: 0,
            baseline_ms: 0,
            last_tick_epoch_ms: None,
            interval_started_epoch_ms: None,
            task_id: None,
            kind,
            stop_policy,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Active milliseconds not yet flushed.
    pub fn accumulated_ms(&self) -> u64 {
        self.accumulated_ms
    }

    /// Total shown to the user: baseline plus unflushed active time.
    pub fn elapsed_ms(&self) -> u64 {
        self.baseline_ms.saturating_add(self.accumulated_ms)
    }

    pub fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }

    pub fn kind(&self) -> SessionType {
        self.kind
    }

    pub fn stop_policy(&self) -> StopPolicy {
        self.stop_policy
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let elapsed_ms = self.elapsed_ms();
        let (display, centis) = format_elapsed(elapsed_ms);
        TimerSnapshot {
            state: self.state,
            elapsed_ms,
            unflushed_ms: self.accumulated_ms,
            display,
            centis,
            task_id: self.task_id,
            kind: self.kind,
        }
    }

    // ── Settings ─────────────────────────────────────────────────────

    /// Attribute the next interval to `task_id` (or to no task). Ignored
    /// while running, like [`set_kind`](Self::set_kind). Returns whether it
    /// applied.
    pub fn select_task(&mut self, task_id: Option<TaskId>) -> bool {
        if self.is_running() {
            return false;
        }
        self.task_id = task_id;
        true
    }

    /// Change the kind of the next session. Ignored while running, since
    /// the interval in progress already has its attributes. Returns whether
    /// it applied.
    pub fn set_kind(&mut self, kind: SessionType) -> bool {
        if self.is_running() {
            return false;
        }
        self.kind = kind;
        true
    }

    pub fn set_stop_policy(&mut self, policy: StopPolicy) {
        self.stop_policy = policy;
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin or resume accumulating. Returns `false` if already running.
    pub fn start(&mut self, now_ms: u64) -> bool {
        match self.state {
            TimerState::Idle | TimerState::Paused => {
                self.state = TimerState::Running;
                self.last_tick_epoch_ms = Some(now_ms);
                self.interval_started_epoch_ms.get_or_insert(now_ms);
                true
            }
            TimerState::Running => false,
        }
    }

    /// Call periodically. Returns the elapsed display total.
    pub fn tick(&mut self, now_ms: u64) -> u64 {
        if self.state == TimerState::Running {
            self.flush_elapsed(now_ms);
        }
        self.elapsed_ms()
    }

    /// Leave `Running` and hand the interval to `sink`.
    ///
    /// Returns `Ok(None)` when the timer was not running; nothing is logged.
    /// Otherwise the sink sees exactly one session of
    /// `floor(accumulated_ms / 1000)` seconds, even when that is zero, along
    /// with the engine state that follows the stop.
    ///
    /// # Errors
    /// A failed append is returned and the engine is left untouched, so the
    /// interval is still pending for the next stop.
    pub fn stop(&mut self, now_ms: u64, sink: &impl SessionSink) -> Result<Option<AppendOutcome>> {
        self.leave_running(now_ms, sink, |_| {})
    }

    /// Return to a zeroed `Idle`. A running interval is flushed first, never
    /// discarded.
    pub fn reset(&mut self, now_ms: u64, sink: &impl SessionSink) -> Result<Option<AppendOutcome>> {
        self.leave_running(now_ms, sink, Self::clear)
    }

    /// Reset, then show `secs` as the starting display value.
    ///
    /// The preset is a display baseline; it never counts toward a logged
    /// session. The engine stays `Idle` until `start`.
    pub fn set_preset(
        &mut self,
        secs: u64,
        now_ms: u64,
        sink: &impl SessionSink,
    ) -> Result<Option<AppendOutcome>> {
        self.leave_running(now_ms, sink, |engine| {
            engine.clear();
            engine.baseline_ms = secs.saturating_mul(1000);
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Builds the state that follows the command, hands any running interval
    /// to `sink` together with that state, and adopts it only on success.
    fn leave_running(
        &mut self,
        now_ms: u64,
        sink: &impl SessionSink,
        settle: impl FnOnce(&mut Self),
    ) -> Result<Option<AppendOutcome>> {
        let mut next = self.clone();
        let session = if next.is_running() {
            next.flush_elapsed(now_ms);
            let session = NewSession {
                task_id: next.task_id,
                duration_secs: next.accumulated_ms / 1000,
                kind: next.kind,
                started_at: next.interval_started_epoch_ms.and_then(epoch_ms_to_utc),
                ended_at: epoch_ms_to_utc(now_ms),
            };
            next.close_interval();
            Some(session)
        } else {
            None
        };
        settle(&mut next);

        let outcome = match session {
            Some(session) => Some(sink.flush_session(&session, &next)?),
            None => None,
        };
        *self = next;
        Ok(outcome)
    }

    fn close_interval(&mut self) {
        match self.stop_policy {
            StopPolicy::Idle => {
                self.state = TimerState::Idle;
                self.baseline_ms = 0;
            }
            StopPolicy::Paused => {
                self.state = TimerState::Paused;
                self.baseline_ms = self.baseline_ms.saturating_add(self.accumulated_ms);
            }
        }
        self.accumulated_ms = 0;
        self.last_tick_epoch_ms = None;
        self.interval_started_epoch_ms = None;
    }

    fn clear(&mut self) {
        self.state = TimerState::Idle;
        self.accumulated_ms = 0;
        self.baseline_ms = 0;
        self.last_tick_epoch_ms = None;
        self.interval_started_epoch_ms = None;
    }

    fn flush_elapsed(&mut self, now_ms: u64) {
        if let Some(last) = self.last_tick_epoch_ms {
            let elapsed = now_ms.saturating_sub(last);
            self.accumulated_ms = self.accumulated_ms.saturating_add(elapsed);
        }
        self.last_tick_epoch_ms = Some(now_ms);
    }
}

/// Splits milliseconds into `HH:MM:SS` and hundredths.
pub fn format_elapsed(ms: u64) -> (String, u8) {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let centis = ((ms % 1000) / 10) as u8;
    (format!("{hours:02}:{minutes:02}:{seconds:02}"), centis)
}

fn epoch_ms_to_utc(ms: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(i64::try_from(ms).ok()?)
}
