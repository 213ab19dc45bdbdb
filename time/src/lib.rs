pub mod latency;
pub mod time;

pub use latency::LatencyGuard;
pub use time::{get_current_milli_timestamp, get_current_nano_timestamp, now_rfc3339};
