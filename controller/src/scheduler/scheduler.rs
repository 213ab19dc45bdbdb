use crate::{
    errors::DispatchError,
    executor::{AlgorithmResult, Dispatcher, Executor},
    scheduler::stats::{TickStats, TickStatsSnapshot},
    shutdown::{CancelSignal, ShutdownCoordinator},
    strategy::{Context, ContextBuilder, StrategyDescriptor},
};
use futures_util::FutureExt;
use log::{debug, error, info, warn};
use scopeguard::defer;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use time::LatencyGuard;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// 取消时进行中的tick最多再等待的时间，超时后放弃该tick
    pub shutdown_grace: Duration,
    /// 宽限期之后留给执行器close()的时间
    pub close_timeout: Duration,
    /// 日志中结果/错误摘要的最大字符数
    pub summary_len: usize,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            shutdown_grace: Duration::from_secs(10),
            close_timeout: Duration::from_secs(5),
            summary_len: 240,
        }
    }
}

/// 本次tick结束后到下次tick开始的等待时间；超时的tick之后立即开始下一次
pub fn remaining_wait(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

struct LoopHandle {
    strategy_id: String,
    handle: JoinHandle<()>,
}

/// 每个启用的策略一个独立循环，循环之间不共享可变状态
pub struct Scheduler {
    dispatcher: Dispatcher,
    contexts: Arc<ContextBuilder>,
    shutdown: ShutdownCoordinator,
    options: SchedulerOptions,
    loops: Vec<LoopHandle>,
    stats: BTreeMap<String, Arc<TickStats>>,
}

impl Scheduler {
    pub fn new(
        dispatcher: Dispatcher,
        contexts: ContextBuilder,
        shutdown: ShutdownCoordinator,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            dispatcher,
            contexts: Arc::new(contexts),
            shutdown,
            options,
            loops: Vec::new(),
            stats: BTreeMap::new(),
        }
    }

    /// 为每个启用的策略启动循环，返回启动的数量
    pub fn start(&mut self, strategies: &[Arc<StrategyDescriptor>]) -> usize {
        let mut started = 0;
        for strategy in strategies {
            if !strategy.enabled {
                info!("strategy '{}' is disabled, not scheduled", strategy.id);
                continue;
            }
            if self.loops.iter().any(|l| l.strategy_id == strategy.id) {
                warn!("strategy '{}' is already scheduled", strategy.id);
                continue;
            }
            if self.shutdown.is_triggered() {
                warn!("shutdown in progress, strategy '{}' not scheduled", strategy.id);
                continue;
            }

            let stats = Arc::new(TickStats::default());
            let strategy_loop = StrategyLoop {
                strategy: strategy.clone(),
                dispatcher: self.dispatcher.clone(),
                contexts: self.contexts.clone(),
                cancel: self.shutdown.signal(),
                stats: stats.clone(),
                shutdown_grace: self.options.shutdown_grace,
                summary_len: self.options.summary_len,
            };
            self.stats.insert(strategy.id.clone(), stats);
            self.loops.push(LoopHandle {
                strategy_id: strategy.id.clone(),
                handle: tokio::spawn(strategy_loop.run()),
            });
            started += 1;
        }
        info!("scheduler started {} strategy loops", started);
        started
    }

    pub fn running(&self) -> usize {
        self.loops
            .iter()
            .filter(|l| !l.handle.is_finished())
            .count()
    }

    pub fn strategy_ids(&self) -> Vec<String> {
        self.stats.keys().cloned().collect()
    }

    pub fn stats(&self) -> BTreeMap<String, TickStatsSnapshot> {
        self.stats
            .iter()
            .map(|(id, stats)| (id.clone(), stats.snapshot()))
            .collect()
    }

    /// 触发取消并等待所有循环结束，返回等待的循环数；不会失败
    pub async fn stop(&mut self) -> usize {
        self.shutdown.trigger("scheduler stop");
        // 循环自身在宽限期内收尾并关闭执行器，这里额外留出关闭的时间
        let limit = self
            .options
            .shutdown_grace
            .saturating_add(self.options.close_timeout);
        let deadline = Instant::now().checked_add(limit);
        let loops = std::mem::take(&mut self.loops);
        let total = loops.len();

        for mut l in loops {
            let joined = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, &mut l.handle).await,
                None => Ok((&mut l.handle).await),
            };
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log_join_error(&l.strategy_id, e),
                Err(_) => {
                    warn!(
                        "[{}] loop did not exit after {:?}, aborting",
                        l.strategy_id, limit
                    );
                    l.handle.abort();
                    if let Err(e) = l.handle.await {
                        log_join_error(&l.strategy_id, e);
                    }
                }
            }
        }
        info!("scheduler stopped, {} strategy loops drained", total);
        total
    }
}

fn log_join_error(strategy_id: &str, e: JoinError) {
    if e.is_cancelled() {
        debug!("[{}] loop cancelled", strategy_id);
    } else {
        error!("[{}] loop terminated abnormally: {}", strategy_id, e);
    }
}

type TickOutcome = Result<AlgorithmResult, DispatchError>;

struct StrategyLoop {
    strategy: Arc<StrategyDescriptor>,
    dispatcher: Dispatcher,
    contexts: Arc<ContextBuilder>,
    cancel: CancelSignal,
    stats: Arc<TickStats>,
    shutdown_grace: Duration,
    summary_len: usize,
}

impl StrategyLoop {
    async fn run(self) {
        let strategy_id = self.strategy.id.clone();
        let interval = self.strategy.interval();
        info!(
            "[{}] loop started, interval={}s, executor={}",
            strategy_id,
            self.strategy.interval_sec,
            self.strategy.executor.kind()
        );
        defer!(
            info!("[{}] loop exited", strategy_id);
        );

        let mut executor = self.dispatcher.executor_for(&self.strategy);
        let mut tick: u64 = 0;
        while !self.cancel.is_cancelled() {
            tick += 1;
            let started = Instant::now();
            let context = self.contexts.build(&self.strategy, tick);

            let outcome = {
                let _latency = LatencyGuard::new(format!("[{}] tick {}", strategy_id, tick));
                self.run_tick(&mut *executor, context).await
            };
            let Some(outcome) = outcome else {
                break;
            };
            if matches!(outcome, Err(DispatchError::Panicked { .. })) {
                // panic后的执行器状态不可信，关闭后重建
                executor.close().await;
                executor = self.dispatcher.executor_for(&self.strategy);
            }
            self.report(tick, outcome, started.elapsed());

            let wait = remaining_wait(interval, started.elapsed());
            if self.cancel.sleep(wait).await {
                break;
            }
        }

        executor.close().await;
    }

    // panic只影响本次tick；取消后最多再等宽限期，超时返回None并丢弃进行中的tick
    async fn run_tick(&self, executor: &mut dyn Executor, context: Context) -> Option<TickOutcome> {
        let tick = AssertUnwindSafe(executor.execute(&context)).catch_unwind();
        tokio::pin!(tick);

        let finished = tokio::select! {
            biased;
            outcome = &mut tick => Some(outcome),
            _ = self.cancel.cancelled() => None,
        };
        let outcome = match finished {
            Some(outcome) => outcome,
            None => match tokio::time::timeout(self.shutdown_grace, &mut tick).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(
                        "[{}] tick {} still running after {:?}, abandoned",
                        self.strategy.id, context.tick, self.shutdown_grace
                    );
                    return None;
                }
            },
        };
        Some(outcome.unwrap_or_else(|payload| Err(DispatchError::panicked(payload))))
    }

    fn report(&self, tick: u64, outcome: TickOutcome, elapsed: Duration) {
        match outcome {
            Ok(result) => {
                self.stats.record_success();
                info!(
                    "[{}] tick {} ok in {} ms: {}",
                    self.strategy.id,
                    tick,
                    elapsed.as_millis(),
                    json::summarize(&result, self.summary_len)
                );
            }
            Err(e) => {
                let consecutive = self.stats.record_failure();
                error!(
                    "[{}] tick {} failed in {} ms ({} in a row): {}",
                    self.strategy.id,
                    tick,
                    elapsed.as_millis(),
                    consecutive,
                    json::truncate(&e.to_string(), self.summary_len)
                );
            }
        }
    }
}
