mod scheduler;
mod stats;

pub use scheduler::{Scheduler, SchedulerOptions, remaining_wait};
pub use stats::{TickStats, TickStatsSnapshot};
