mod dispatcher;
mod http;
mod in_process;

pub use dispatcher::Dispatcher;
pub use http::HttpExecutor;
pub use in_process::InProcessExecutor;

use crate::{errors::DispatchError, strategy::Context};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};


/// 单次tick的统一结果；进程内执行带meta，远端执行带status_code
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlgorithmResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub result: Value,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl AlgorithmResult {
    pub fn in_process(result: Value, meta: Map<String, Value>) -> Self {
        Self {
            ok: true,
            status_code: None,
            result,
            meta,
        }
    }

    pub fn remote(status_code: u16, result: Value) -> Self {
        Self {
            ok: true,
            status_code: Some(status_code),
            result,
            meta: Map::new(),
        }
    }
}

/// 一个策略的执行器，由策略循环独占，跨tick复用
#[async_trait]
pub trait Executor: Send {
    fn kind(&self) -> &'static str;

    async fn execute(&mut self, context: &Context) -> Result<AlgorithmResult, DispatchError>;

    /// 循环退出时调用，释放持有的算法实例
    async fn close(&mut self) {}
}
