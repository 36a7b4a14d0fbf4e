//! # Aura Focus Core Library
//!
//! Core logic for Aura Focus, a local focus timer with a daily task list and
//! a persisted history of work and break sessions. Every operation is
//! reachable from the `aura-focus` CLI, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Store**: SQLite tables for tasks and sessions, plus CSV export and
//!   TOML configuration
//! - **Task Registry**: today-scoped view over the store's tasks
//! - **Timer Engine**: a wall-clock-based state machine that requires the caller
//!   to periodically invoke `tick()`, and flushes each interval to the store
//!
//! ## Key Components
//!
//! - [`FocusApp`]: the facade a UI drives
//! - [`TimerEngine`]: core timer state machine
//! - [`Store`]: task and session persistence
//! - [`Config`]: application configuration management

pub mod app;
pub mod error;
pub mod session;
pub mod storage;
pub mod task;
pub mod timer;

pub use app::{FocusApp, Listing};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use session::{AppendOutcome, NewSession, SessionRecord, SessionSink, SessionType};
pub use storage::{base_dir, Config, StopPolicy, Store};
pub use task::{Task, TaskId, TaskRegistry, TaskStatus};
pub use timer::{Clock, ManualClock, SystemClock, TimerEngine, TimerSnapshot, TimerState};
