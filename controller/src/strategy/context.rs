use crate::strategy::descriptor::{Params, Secrets, StrategyDescriptor};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// 环境变量读取，测试中可替换
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub fn process_env() -> EnvLookup {
    Arc::new(|name: &str| std::env::var(name).ok())
}

/// 三层参数合并，优先级 context > strategy > defaults
pub fn merged_params(defaults: &Params, strategy: &Params, context: &Params) -> Params {
    let mut merged = defaults.clone();
    for layer in [strategy, context] {
        for (key, value) in layer {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// 优先级 环境变量 > context.secrets > strategy.secrets，取第一个非空值
pub fn resolve_secret(
    env_value: Option<String>,
    key: &str,
    context: &Secrets,
    strategy: &Secrets,
) -> Option<String> {
    env_value
        .into_iter()
        .chain(context.get(key).cloned())
        .chain(strategy.get(key).cloned())
        .find(|value| !value.is_empty())
}

/// 配置文件中的全局context层
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ContextDefaults {
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub secrets: Secrets,
}

/// 每次tick新建，不持久化
#[derive(Debug, Clone)]
pub struct Context {
    pub strategy_id: String,
    pub now: DateTime<Utc>,
    pub tick: u64,
    pub params: Params,
    pub secrets: Secrets,
}

impl Context {
    pub fn now_rfc3339(&self) -> String {
        self.now.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// 远端执行器的默认请求体，不含secrets
    pub fn payload(&self) -> Value {
        json!({
            "strategy_id": self.strategy_id,
            "now": self.now_rfc3339(),
            "tick": self.tick,
            "params": self.params,
        })
    }

    /// 替换模板中形如 "{{strategy_id}}"、"{{params.key}}" 的字符串值
    pub fn render(&self, template: &Value) -> Value {
        match template {
            Value::String(text) => self.placeholder(text).unwrap_or_else(|| template.clone()),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.render(v)).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.render(v)))
                    .collect(),
            ),
            _ => template.clone(),
        }
    }

    fn placeholder(&self, text: &str) -> Option<Value> {
        let name = text.strip_prefix("{{")?.strip_suffix("}}")?.trim();
        match name {
            "strategy_id" => Some(json!(self.strategy_id)),
            "now" => Some(json!(self.now_rfc3339())),
            "tick" => Some(json!(self.tick)),
            _ => name
                .strip_prefix("params.")
                .map(|key| self.params.get(key).cloned().unwrap_or(Value::Null)),
        }
    }
}

pub struct ContextBuilder {
    defaults: ContextDefaults,
}

impl ContextBuilder {
    pub fn new(defaults: ContextDefaults) -> Self {
        Self { defaults }
    }

    pub fn build(&self, strategy: &StrategyDescriptor, tick: u64) -> Context {
        Context {
            strategy_id: strategy.id.clone(),
            now: Utc::now(),
            tick,
            params: self.defaults.params.clone(),
            secrets: self.defaults.secrets.clone(),
        }
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(ContextDefaults::default())
    }
}
