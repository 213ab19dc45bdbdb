use crate::{
    algorithm::AlgorithmRegistry,
    config::{Settings, StrategyDocument},
    errors::{ControllerError, Result},
    executor::Dispatcher,
    scheduler::{Scheduler, TickStatsSnapshot},
    shutdown::ShutdownCoordinator,
    sink::{LogTradeSink, TradeSink},
    strategy::{ContextBuilder, ExecutorSpec, StrategyDescriptor},
};
use db::TradeStore;
use log::{info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const USAGE: &str = "Usage: controller <strategies.json>";
/// 缺少参数时的退出码，与配置错误(1)区分
pub const USAGE_EXIT_CODE: u8 = 2;

/// 命令行的唯一位置参数是配置文件路径，缺失时返回None
pub fn config_path_from_args<I>(args: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter().nth(1).filter(|path| !path.is_empty())
}

/// 组装调度器及其依赖，负责进程级的启动与退出
pub struct Controller {
    scheduler: Scheduler,
    shutdown: ShutdownCoordinator,
    strategies: Vec<Arc<StrategyDescriptor>>,
}

impl Controller {
    pub fn new(
        settings: &Settings,
        document: StrategyDocument,
        registry: AlgorithmRegistry,
    ) -> Result<Self> {
        let sink: Arc<dyn TradeSink> = match &settings.trade_db_path {
            Some(path) => {
                let store = TradeStore::open(path).map_err(|e| {
                    ControllerError::startup(format!("open trade db {} failed: {}", path, e))
                })?;
                info!("trades are stored in {}", path);
                Arc::new(store)
            }
            None => Arc::new(LogTradeSink),
        };
        let http_client = Dispatcher::build_http_client(settings.proxy_url.as_deref())?;

        // 注册表缺失的条目在每次tick时报错，这里提前提示
        for strategy in document.enabled() {
            if let ExecutorSpec::InProcess { module, entry } = &strategy.executor {
                if !registry.contains(module, entry) {
                    warn!(
                        "strategy '{}': '{}' is not registered, every tick will fail",
                        strategy.id,
                        AlgorithmRegistry::key(module, entry)
                    );
                }
            }
        }

        let shutdown = ShutdownCoordinator::new();
        let dispatcher = Dispatcher::new(Arc::new(registry), http_client, sink, shutdown.signal());
        let scheduler = Scheduler::new(
            dispatcher,
            ContextBuilder::new(document.context),
            shutdown.clone(),
            settings.scheduler_options(),
        );

        Ok(Self {
            scheduler,
            shutdown,
            strategies: document.strategies,
        })
    }

    /// 外部可用来触发退出
    pub fn shutdown_handle(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    pub fn start(&mut self) -> usize {
        let started = self.scheduler.start(&self.strategies);
        if started == 0 {
            warn!("no enabled strategies, waiting for shutdown");
        }
        started
    }

    pub fn stats(&self) -> BTreeMap<String, TickStatsSnapshot> {
        self.scheduler.stats()
    }

    /// 启动所有循环，阻塞到收到退出信号，排空后返回各策略的统计
    pub async fn run_until_shutdown(mut self) -> BTreeMap<String, TickStatsSnapshot> {
        let signals = self.shutdown.install_signal_handlers();
        self.start();

        self.shutdown.wait().await;
        let drained = self.scheduler.stop().await;
        signals.abort();

        let stats = self.scheduler.stats();
        for (id, s) in &stats {
            info!(
                "[{}] ok={} failed={} consecutive_failures={}",
                id, s.ticks_ok, s.ticks_failed, s.consecutive_failures
            );
        }
        info!("controller stopped, {} strategy loops drained", drained);
        stats
    }
}
