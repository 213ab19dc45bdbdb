use crate::{
    shutdown::CancelSignal,
    strategy::{merged_params, resolve_secret, Context, EnvLookup, Params, StrategyDescriptor},
};
use async_trait::async_trait;
use db::{PortfolioSnapshot, Trade};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlgorithmError {
    #[error("{message}")]
    Failed { message: String },

    #[error("cancelled")]
    Cancelled,

    #[error("missing parameter: {key}")]
    MissingParameter { key: String },

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl AlgorithmError {
    pub fn failed<S: Into<String>>(message: S) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AlgorithmError>;

/// run的产出：结果本身，以及交给持久化层的交易/组合快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutput {
    pub result: Value,
    pub trade: Option<Trade>,
    pub portfolio: Option<PortfolioSnapshot>,
}

impl TickOutput {
    pub fn new(result: Value) -> Self {
        Self {
            result,
            trade: None,
            portfolio: None,
        }
    }

    pub fn with_trade(mut self, trade: Trade) -> Self {
        self.trade = Some(trade);
        self
    }

    pub fn with_portfolio(mut self, snapshot: PortfolioSnapshot) -> Self {
        self.portfolio = Some(snapshot);
        self
    }
}

/// 构造算法实例时注入：策略描述、取消信号、环境变量读取
#[derive(Clone)]
pub struct AlgorithmBase {
    strategy: Arc<StrategyDescriptor>,
    cancel: CancelSignal,
    env: EnvLookup,
}

impl AlgorithmBase {
    pub fn new(strategy: Arc<StrategyDescriptor>, cancel: CancelSignal, env: EnvLookup) -> Self {
        Self {
            strategy,
            cancel,
            env,
        }
    }

    pub fn strategy(&self) -> &StrategyDescriptor {
        &self.strategy
    }

    pub fn strategy_id(&self) -> &str {
        &self.strategy.id
    }

    /// defaults < strategy.params < context.params
    pub fn merged_params(&self, defaults: &Params, context: &Context) -> Params {
        merged_params(defaults, &self.strategy.params, &context.params)
    }

    pub fn get_param(&self, key: &str, default: Value, context: &Context) -> Value {
        let mut defaults = Params::new();
        defaults.insert(key.to_string(), default.clone());
        self.merged_params(&defaults, context)
            .remove(key)
            .unwrap_or(default)
    }

    /// context.secrets > strategy.secrets
    pub fn get_secret(&self, key: &str, context: &Context) -> Option<String> {
        resolve_secret(None, key, &context.secrets, &self.strategy.secrets)
    }

    /// 环境变量优先；secret_key缺省时取env_var的小写形式
    pub fn env_or_secret(
        &self,
        env_var: &str,
        secret_key: Option<&str>,
        context: &Context,
    ) -> Option<String> {
        let key = secret_key
            .map(str::to_string)
            .unwrap_or_else(|| env_var.to_lowercase());
        resolve_secret(
            (self.env)(env_var),
            &key,
            &context.secrets,
            &self.strategy.secrets,
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn meta(&self, name: &str, version: &str) -> Map<String, Value> {
        let mut meta = Map::new();
        meta.insert("name".to_string(), json!(name));
        meta.insert("version".to_string(), json!(version));
        meta.insert("strategy_id".to_string(), json!(self.strategy.id));
        meta
    }
}

/// 进程内算法的生命周期
///
/// 每次tick依次调用 before_tick -> run -> after_tick；initialize在第一次tick前调用一次，
/// close在实例被丢弃前调用一次（阶段失败或循环退出）。
/// run可以是纯同步计算，也可以在内部await。
#[async_trait]
pub trait Algorithm: Send {
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "0.1.0"
    }

    fn base(&self) -> &AlgorithmBase;

    async fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    async fn before_tick(&mut self, _context: &Context) -> Result<()> {
        Ok(())
    }

    async fn run(&mut self, context: &Context) -> Result<TickOutput>;

    async fn after_tick(&mut self, _context: &Context, _output: &TickOutput) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.base().is_cancelled()
    }

    fn diagnostics(&self) -> Map<String, Value> {
        self.base().meta(self.name(), self.version())
    }
}
