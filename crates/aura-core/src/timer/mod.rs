mod clock;
mod engine;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{format_elapsed, TimerEngine, TimerSnapshot, TimerState};
