use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

pub type Params = Map<String, Value>;
pub type Secrets = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    /// 大小写不敏感
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpSpec {
    pub url: String,
    pub method: HttpMethod,
    pub timeout: Duration,
    pub headers: BTreeMap<String, String>,
    // 为空时以Context生成请求体
    pub payload_template: Option<Value>,
}

impl HttpSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Post,
            timeout: Duration::from_secs(5),
            headers: BTreeMap::new(),
            payload_template: None,
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_payload_template(mut self, template: Value) -> Self {
        self.payload_template = Some(template);
        self
    }
}

/// 执行器配置，加载时即确定类型
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutorSpec {
    /// 进程内注册表条目，键为 "<module>.<entry>"
    InProcess { module: String, entry: String },
    Http(HttpSpec),
}

impl ExecutorSpec {
    pub fn in_process(module: impl Into<String>, entry: impl Into<String>) -> Self {
        ExecutorSpec::InProcess {
            module: module.into(),
            entry: entry.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ExecutorSpec::InProcess { .. } => "python",
            ExecutorSpec::Http(_) => "http",
        }
    }
}

/// 策略描述，加载后只读
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyDescriptor {
    pub id: String,
    pub interval_sec: u64,
    pub enabled: bool,
    pub executor: ExecutorSpec,
    pub params: Params,
    pub secrets: Secrets,
}

impl StrategyDescriptor {
    pub fn new(id: impl Into<String>, interval_sec: u64, executor: ExecutorSpec) -> Self {
        Self {
            id: id.into(),
            interval_sec,
            enabled: true,
            executor,
            params: Params::new(),
            secrets: Secrets::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_sec)
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(key.into(), value.into());
        self
    }

    pub fn with_interval(mut self, interval_sec: u64) -> Self {
        self.interval_sec = interval_sec;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
