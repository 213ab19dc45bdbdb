use std::time::{Duration, Instant};

/// 作用域耗时统计，drop时以debug级别输出
pub struct LatencyGuard {
    label: String,
    start: Instant,
}

impl LatencyGuard {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for LatencyGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        log::debug!(
            "{} took {} us, {} ms",
            self.label,
            elapsed.as_micros(),
            elapsed.as_millis()
        );
    }
}
