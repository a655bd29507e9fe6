//! Tick-driven match alert scheduler.
//!
//! One [`Scheduler`] owns the notification settings, the dedup set and the
//! timer. Each tick runs fetch → evaluate → filter → dispatch → persist →
//! evict, serialized against every other tick.

mod error;
mod history;
mod metrics;
pub mod scheduler;
mod state;

pub use error::SchedulerError;
pub use history::{HistoryEntry, NotificationHistory};
pub use metrics::{SchedulerCounters, TickReport};
pub use scheduler::{Scheduler, SchedulerBuilder, SchedulerStats};
pub use state::SchedulerState;
