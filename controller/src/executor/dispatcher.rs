use crate::{
    algorithm::AlgorithmRegistry,
    errors::{ControllerError, DispatchError, Result},
    executor::{AlgorithmResult, Executor, HttpExecutor, InProcessExecutor},
    shutdown::CancelSignal,
    sink::TradeSink,
    strategy::{process_env, Context, EnvLookup, ExecutorSpec, StrategyDescriptor},
};
use std::sync::Arc;

/// 根据策略的执行器配置构造执行器；各策略循环共享同一个Dispatcher
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<AlgorithmRegistry>,
    http_client: reqwest::Client,
    sink: Arc<dyn TradeSink>,
    cancel: CancelSignal,
    env: EnvLookup,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<AlgorithmRegistry>,
        http_client: reqwest::Client,
        sink: Arc<dyn TradeSink>,
        cancel: CancelSignal,
    ) -> Self {
        Self {
            registry,
            http_client,
            sink,
            cancel,
            env: process_env(),
        }
    }

    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    pub fn registry(&self) -> &AlgorithmRegistry {
        &self.registry
    }

    pub fn build_http_client(proxy_url: Option<&str>) -> Result<reqwest::Client> {
        let client_builder = reqwest::Client::builder();

        let client = if let Some(proxy_url) = proxy_url {
            client_builder
                .proxy(reqwest::Proxy::all(proxy_url).map_err(|e| {
                    ControllerError::config(format!("proxy url invalid: {}, error: {}", proxy_url, e))
                })?)
                .build()
                .map_err(|e| {
                    ControllerError::startup(format!(
                        "build client with proxy url: {} failed: {}",
                        proxy_url, e
                    ))
                })?
        } else {
            client_builder
                .build()
                .map_err(|e| ControllerError::startup(format!("build client failed: {}", e)))?
        };

        Ok(client)
    }

    /// 执行器变体在加载配置时已确定，这里不会失败；注册表解析推迟到第一次执行
    pub fn executor_for(&self, strategy: &Arc<StrategyDescriptor>) -> Box<dyn Executor> {
        match &strategy.executor {
            ExecutorSpec::InProcess { module, entry } => Box::new(InProcessExecutor::new(
                strategy.clone(),
                module.clone(),
                entry.clone(),
                self.registry.clone(),
                self.sink.clone(),
                self.cancel.clone(),
                self.env.clone(),
            )),
            ExecutorSpec::Http(spec) => Box::new(HttpExecutor::new(
                strategy.id.clone(),
                spec.clone(),
                self.http_client.clone(),
            )),
        }
    }

    /// 单次调度：构造执行器，执行一次后关闭
    pub async fn dispatch_once(
        &self,
        strategy: &Arc<StrategyDescriptor>,
        context: &Context,
    ) -> std::result::Result<AlgorithmResult, DispatchError> {
        let mut executor = self.executor_for(strategy);
        let result = executor.execute(context).await;
        executor.close().await;
        result
    }
}
