// Updater module: the orchestrated update run and what triggers it.

pub mod orchestrator;
pub mod schedule;
pub mod timer;

pub use orchestrator::{ForceOutcome, TimerOutcome, UpdateOrchestrator};
pub use schedule::{Cadence, ScheduleError};
pub use timer::UpdateSchedule;
