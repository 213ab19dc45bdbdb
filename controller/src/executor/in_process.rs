use crate::{
    algorithm::{AlgorithmBase, AlgorithmFactory, AlgorithmRegistry, AlgorithmRuntime, Entry, TickFn, TickOutput},
    errors::{DispatchError, Phase},
    executor::{AlgorithmResult, Executor},
    shutdown::CancelSignal,
    sink::TradeSink,
    strategy::{Context, EnvLookup, StrategyDescriptor},
};
use async_trait::async_trait;
use futures_util::FutureExt;
use log::{debug, warn};
use serde_json::Map;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

enum Target {
    Lifecycle {
        factory: AlgorithmFactory,
        runtime: Option<AlgorithmRuntime>,
    },
    Callable(TickFn),
}

/// 注册表中的算法，第一次执行时解析
pub struct InProcessExecutor {
    strategy: Arc<StrategyDescriptor>,
    module: String,
    entry: String,
    registry: Arc<AlgorithmRegistry>,
    sink: Arc<dyn TradeSink>,
    cancel: CancelSignal,
    env: EnvLookup,
    target: Option<Target>,
}

impl InProcessExecutor {
    pub fn new(
        strategy: Arc<StrategyDescriptor>,
        module: String,
        entry: String,
        registry: Arc<AlgorithmRegistry>,
        sink: Arc<dyn TradeSink>,
        cancel: CancelSignal,
        env: EnvLookup,
    ) -> Self {
        Self {
            strategy,
            module,
            entry,
            registry,
            sink,
            cancel,
            env,
            target: None,
        }
    }

    fn target(&mut self) -> Result<&mut Target, DispatchError> {
        if self.target.is_none() {
            let target = match self.registry.resolve(&self.module, &self.entry)? {
                Entry::Lifecycle(factory) => Target::Lifecycle {
                    factory,
                    runtime: None,
                },
                Entry::Callable(call) => Target::Callable(call),
            };
            self.target = Some(target);
        }
        self.target
            .as_mut()
            .ok_or_else(|| DispatchError::Resolution {
                key: AlgorithmRegistry::key(&self.module, &self.entry),
            })
    }
}

// 落地失败只告警，不影响本次tick结果
fn persist(sink: Arc<dyn TradeSink>, strategy_id: String, output: &TickOutput) {
    if output.trade.is_none() && output.portfolio.is_none() {
        return;
    }
    let trade = output.trade.clone();
    let portfolio = output.portfolio.clone();
    tokio::task::spawn_blocking(move || {
        if let Some(trade) = trade {
            match sink.append_trade(&trade) {
                Ok(rows) => debug!(
                    "[{}] trade {} stored, {} rows",
                    strategy_id, trade.trade_id, rows
                ),
                Err(e) => warn!(
                    "[{}] failed to store trade {}: {}",
                    strategy_id, trade.trade_id, e
                ),
            }
        }
        if let Some(snapshot) = portfolio {
            if let Err(e) = sink.append_portfolio_snapshot(&snapshot) {
                warn!("[{}] failed to store portfolio snapshot: {}", strategy_id, e);
            }
        }
    });
}

#[async_trait]
impl Executor for InProcessExecutor {
    fn kind(&self) -> &'static str {
        "in_process"
    }

    async fn execute(&mut self, context: &Context) -> Result<AlgorithmResult, DispatchError> {
        let base = AlgorithmBase::new(self.strategy.clone(), self.cancel.clone(), self.env.clone());
        let sink = self.sink.clone();
        let strategy_id = self.strategy.id.clone();
        match self.target()? {
            Target::Callable(call) => {
                let outcome = AssertUnwindSafe(async { call(context.clone()).await })
                    .catch_unwind()
                    .await
                    .map_err(DispatchError::panicked)?;
                let value = outcome.map_err(|e| DispatchError::algorithm(Phase::Call, e))?;
                Ok(AlgorithmResult::in_process(value, Map::new()))
            }
            Target::Lifecycle { factory, runtime } => {
                // 实例留在执行器中，tick被中途丢弃时仍能由close()释放
                let current = runtime.get_or_insert_with(|| AlgorithmRuntime::new(factory(base)));
                let outcome = AssertUnwindSafe(current.tick(context))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Err(DispatchError::panicked(payload)));
                match outcome {
                    Ok(output) => {
                        let meta = current.diagnostics();
                        persist(sink, strategy_id, &output);
                        Ok(AlgorithmResult::in_process(output.result, meta))
                    }
                    Err(e) => {
                        // 失败或panic的实例关闭后丢弃，下次tick重新构造并初始化
                        if let Some(failed) = runtime.take() {
                            failed.close().await;
                        }
                        Err(e)
                    }
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Some(Target::Lifecycle { runtime, .. }) = self.target.as_mut() {
            if let Some(current) = runtime.take() {
                current.close().await;
            }
        }
    }
}
