use crate::{
    algorithm::traits::{Algorithm, TickOutput},
    errors::{DispatchError, Phase},
    strategy::Context,
};
use log::{info, warn};
use serde_json::{Map, Value};

/// 包装一个算法实例，保证生命周期顺序
pub struct AlgorithmRuntime {
    algorithm: Box<dyn Algorithm>,
    initialized: bool,
    closed: bool,
}

impl AlgorithmRuntime {
    pub fn new(algorithm: Box<dyn Algorithm>) -> Self {
        Self {
            algorithm,
            initialized: false,
            closed: false,
        }
    }

    pub fn name(&self) -> &str {
        self.algorithm.name()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn diagnostics(&self) -> Map<String, Value> {
        self.algorithm.diagnostics()
    }

    /// initialize只在第一次成功前调用；任一阶段失败由调用方close并丢弃实例
    pub async fn tick(&mut self, context: &Context) -> Result<TickOutput, DispatchError> {
        if !self.initialized {
            self.algorithm
                .initialize()
                .await
                .map_err(|e| DispatchError::algorithm(Phase::Initialize, e))?;
            self.initialized = true;
            info!(
                "algorithm '{}' initialized for strategy '{}'",
                self.algorithm.name(),
                context.strategy_id
            );
        }
        self.algorithm
            .before_tick(context)
            .await
            .map_err(|e| DispatchError::algorithm(Phase::BeforeTick, e))?;
        let output = self
            .algorithm
            .run(context)
            .await
            .map_err(|e| DispatchError::algorithm(Phase::Run, e))?;
        self.algorithm
            .after_tick(context, &output)
            .await
            .map_err(|e| DispatchError::algorithm(Phase::AfterTick, e))?;
        Ok(output)
    }

    /// 消费self，保证close最多调用一次
    pub async fn close(mut self) {
        self.closed = true;
        if let Err(e) = self.algorithm.close().await {
            warn!(
                "algorithm '{}' {} failed: {}",
                self.algorithm.name(),
                Phase::Close,
                e
            );
        }
    }
}

impl Drop for AlgorithmRuntime {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                "algorithm '{}' dropped without close",
                self.algorithm.name()
            );
        }
    }
}
