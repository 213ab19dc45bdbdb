use std::any::Any;
use std::fmt;
use thiserror::Error;

/// 启动阶段的致命错误，进程以非0退出
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Startup error: {message}")]
    StartupError { message: String },
}

impl ControllerError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn startup<S: Into<String>>(message: S) -> Self {
        Self::StartupError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ControllerError>;

/// 单个策略配置校验失败，该策略被禁用，其余策略照常启动
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StrategyError {
    #[error("strategies[{index}] is not an object")]
    NotAnObject { index: usize },

    #[error("strategy '{id}': missing field '{field}'")]
    MissingField { id: String, field: String },

    #[error("strategy '{id}': invalid field '{field}': {message}")]
    InvalidField {
        id: String,
        field: String,
        message: String,
    },

    #[error("strategy '{id}': unknown executor type '{kind}'")]
    UnknownExecutorType { id: String, kind: String },

    #[error("strategy '{id}': ambiguous executor: {message}")]
    AmbiguousExecutor { id: String, message: String },

    #[error("strategy '{id}': duplicated id")]
    DuplicateId { id: String },
}

impl StrategyError {
    pub fn missing_field(id: &str, field: &str) -> Self {
        Self::MissingField {
            id: id.to_string(),
            field: field.to_string(),
        }
    }

    pub fn invalid_field<S: Into<String>>(id: &str, field: &str, message: S) -> Self {
        Self::InvalidField {
            id: id.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn ambiguous<S: Into<String>>(id: &str, message: S) -> Self {
        Self::AmbiguousExecutor {
            id: id.to_string(),
            message: message.into(),
        }
    }
}

/// 算法生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initialize,
    BeforeTick,
    Run,
    AfterTick,
    Close,
    // 无生命周期的可调用对象
    Call,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Initialize => "initialize",
            Phase::BeforeTick => "before_tick",
            Phase::Run => "run",
            Phase::AfterTick => "after_tick",
            Phase::Close => "close",
            Phase::Call => "call",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单次tick内的失败，均可恢复，不会终止策略循环
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("unknown executor: {key}")]
    Resolution { key: String },

    #[error("transient error: {message}")]
    Transient { message: String },

    #[error("remote error: status={status}, body={body}")]
    Remote { status: u16, body: String },

    #[error("algorithm {phase} failed: {message}")]
    Algorithm { phase: Phase, message: String },

    #[error("invalid request: {message}")]
    Request { message: String },

    #[error("tick panicked: {message}")]
    Panicked { message: String },
}

impl DispatchError {
    pub fn algorithm(phase: Phase, source: impl fmt::Display) -> Self {
        Self::Algorithm {
            phase,
            message: source.to_string(),
        }
    }

    pub fn transient<S: Into<String>>(message: S) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn request<S: Into<String>>(message: S) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    /// 从catch_unwind捕获的panic负载构造
    pub fn panicked(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            message.to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "unknown panic".to_string()
        };
        Self::Panicked { message }
    }

    /// 远端返回的HTTP状态码
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}
