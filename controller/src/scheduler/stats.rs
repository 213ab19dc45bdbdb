use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// 单个策略循环的计数，循环写入，外部只读
#[derive(Debug, Default)]
pub struct TickStats {
    ticks_ok: AtomicU64,
    ticks_failed: AtomicU64,
    consecutive_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickStatsSnapshot {
    pub ticks_ok: u64,
    pub ticks_failed: u64,
    pub consecutive_failures: u64,
}

impl TickStats {
    pub fn record_success(&self) {
        self.ticks_ok.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    /// 返回当前连续失败次数
    pub fn record_failure(&self) -> u64 {
        self.ticks_failed.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn snapshot(&self) -> TickStatsSnapshot {
        TickStatsSnapshot {
            ticks_ok: self.ticks_ok.load(Ordering::Relaxed),
            ticks_failed: self.ticks_failed.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
        }
    }
}
