use crate::{
    config::Settings,
    errors::{ControllerError, Result, StrategyError},
    strategy::{
        ContextDefaults, ExecutorSpec, HttpMethod, HttpSpec, Params, Secrets, StrategyDescriptor,
    },
};
use log::{error, info};
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

const ENTRY_FIELDS: [&str; 4] = ["entry", "entry_name", "class", "function"];
const HTTP_FIELDS: [&str; 6] = [
    "url",
    "method",
    "timeout_sec",
    "headers",
    "payload_template",
    "payload",
];

/// 配置文件中的策略部分；单个策略校验失败只禁用该策略
#[derive(Debug, Default)]
pub struct StrategyDocument {
    pub strategies: Vec<Arc<StrategyDescriptor>>,
    pub rejected: Vec<StrategyError>,
    pub context: ContextDefaults,
}

impl StrategyDocument {
    pub fn parse(text: &str, settings: &Settings) -> Result<Self> {
        let default_timeout = settings.http_timeout()?;
        let root: Value = serde_json::from_str(text)
            .map_err(|e| ControllerError::config(format!("invalid JSON document: {}", e)))?;
        let Value::Object(root) = root else {
            return Err(ControllerError::config(
                "configuration document must be a JSON object",
            ));
        };

        let items = match root.get("strategies") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(ControllerError::config("'strategies' must be a list"));
            }
            None => {
                return Err(ControllerError::config(
                    "configuration is missing the 'strategies' list",
                ));
            }
        };

        let context = match root.get("context") {
            None | Some(Value::Null) => ContextDefaults::default(),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| ControllerError::config(format!("invalid 'context': {}", e)))?,
        };

        let mut document = StrategyDocument {
            context,
            ..Default::default()
        };
        let mut seen = HashSet::new();
        for (index, item) in items.iter().enumerate() {
            let parsed = parse_strategy(index, item, default_timeout).and_then(|strategy| {
                if seen.insert(strategy.id.clone()) {
                    Ok(strategy)
                } else {
                    Err(StrategyError::DuplicateId { id: strategy.id })
                }
            });
            match parsed {
                Ok(strategy) => document.strategies.push(Arc::new(strategy)),
                Err(e) => {
                    error!("{}, strategy disabled", e);
                    document.rejected.push(e);
                }
            }
        }

        info!(
            "loaded {} strategies ({} enabled), {} rejected",
            document.strategies.len(),
            document.enabled().count(),
            document.rejected.len()
        );
        Ok(document)
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Arc<StrategyDescriptor>> {
        self.strategies.iter().filter(|s| s.enabled)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<StrategyDescriptor>> {
        self.strategies.iter().find(|s| s.id == id)
    }
}

fn parse_strategy(
    index: usize,
    item: &Value,
    default_timeout: Duration,
) -> std::result::Result<StrategyDescriptor, StrategyError> {
    let Value::Object(fields) = item else {
        return Err(StrategyError::NotAnObject { index });
    };

    let id = match fields.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
        Some(_) => {
            return Err(StrategyError::invalid_field(
                &format!("strategies[{}]", index),
                "id",
                "must be a non-empty string",
            ));
        }
        None => {
            return Err(StrategyError::missing_field(
                &format!("strategies[{}]", index),
                "id",
            ));
        }
    };

    let interval_sec = match fields.get("interval_sec") {
        None | Some(Value::Null) => return Err(StrategyError::missing_field(&id, "interval_sec")),
        Some(value) => match value.as_u64() {
            Some(secs) if secs > 0 => secs,
            _ => {
                return Err(StrategyError::invalid_field(
                    &id,
                    "interval_sec",
                    format!("must be an integer > 0, got {}", value),
                ));
            }
        },
    };

    let enabled = match fields.get("enabled") {
        None | Some(Value::Null) => true,
        Some(Value::Bool(enabled)) => *enabled,
        Some(_) => return Err(StrategyError::invalid_field(&id, "enabled", "must be a bool")),
    };

    let params: Params = match fields.get("params") {
        None | Some(Value::Null) => Params::new(),
        Some(Value::Object(params)) => params.clone(),
        Some(_) => return Err(StrategyError::invalid_field(&id, "params", "must be an object")),
    };

    let secrets = string_map(&id, "secrets", fields.get("secrets"))?
        .into_iter()
        .collect::<Secrets>();

    let executor = match fields.get("executor") {
        None | Some(Value::Null) => return Err(StrategyError::missing_field(&id, "executor")),
        Some(Value::Object(executor)) => parse_executor(&id, executor, default_timeout)?,
        Some(_) => {
            return Err(StrategyError::invalid_field(&id, "executor", "must be an object"));
        }
    };

    let mut strategy = StrategyDescriptor::new(id, interval_sec, executor).with_enabled(enabled);
    strategy.params = params;
    strategy.secrets = secrets;
    Ok(strategy)
}

fn parse_executor(
    id: &str,
    executor: &Map<String, Value>,
    default_timeout: Duration,
) -> std::result::Result<ExecutorSpec, StrategyError> {
    let kind = match executor.get("type") {
        Some(Value::String(kind)) => kind.to_ascii_lowercase(),
        Some(_) => {
            return Err(StrategyError::invalid_field(id, "executor.type", "must be a string"));
        }
        None => return Err(StrategyError::missing_field(id, "executor.type")),
    };

    match kind.as_str() {
        "python" | "in_process" => parse_in_process(id, executor),
        "http" => parse_http(id, executor, default_timeout).map(ExecutorSpec::Http),
        _ => Err(StrategyError::UnknownExecutorType {
            id: id.to_string(),
            kind,
        }),
    }
}

fn parse_in_process(
    id: &str,
    executor: &Map<String, Value>,
) -> std::result::Result<ExecutorSpec, StrategyError> {
    if let Some(field) = HTTP_FIELDS.iter().find(|f| executor.contains_key(**f)) {
        return Err(StrategyError::ambiguous(
            id,
            format!("http field '{}' in an in-process executor", field),
        ));
    }

    let module = required_string(id, executor, "module")?;
    let present: Vec<&str> = ENTRY_FIELDS
        .iter()
        .copied()
        .filter(|f| executor.contains_key(*f))
        .collect();
    let entry = match present.as_slice() {
        [] => return Err(StrategyError::missing_field(id, "executor.entry")),
        [field] => required_string(id, executor, field)?,
        _ => {
            return Err(StrategyError::ambiguous(
                id,
                format!("only one of {} may be set", present.join(", ")),
            ));
        }
    };
    Ok(ExecutorSpec::in_process(module, entry))
}

fn parse_http(
    id: &str,
    executor: &Map<String, Value>,
    default_timeout: Duration,
) -> std::result::Result<HttpSpec, StrategyError> {
    if let Some(field) = std::iter::once("module")
        .chain(ENTRY_FIELDS)
        .find(|f| executor.contains_key(*f))
    {
        return Err(StrategyError::ambiguous(
            id,
            format!("in-process field '{}' in an http executor", field),
        ));
    }

    let url = required_string(id, executor, "url")?;
    match reqwest::Url::parse(&url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(parsed) => {
            return Err(StrategyError::invalid_field(
                id,
                "executor.url",
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }
        Err(e) => return Err(StrategyError::invalid_field(id, "executor.url", e.to_string())),
    }

    let method = match executor.get("method") {
        None | Some(Value::Null) => HttpMethod::Post,
        Some(Value::String(method)) => HttpMethod::parse(method).ok_or_else(|| {
            StrategyError::invalid_field(
                id,
                "executor.method",
                format!("expected GET or POST, got '{}'", method),
            )
        })?,
        Some(_) => {
            return Err(StrategyError::invalid_field(id, "executor.method", "must be a string"));
        }
    };

    let timeout = match executor.get("timeout_sec") {
        None | Some(Value::Null) => default_timeout,
        Some(value) => match value.as_f64().map(Duration::try_from_secs_f64) {
            Some(Ok(timeout)) if !timeout.is_zero() => timeout,
            _ => {
                return Err(StrategyError::invalid_field(
                    id,
                    "executor.timeout_sec",
                    format!("must be a number > 0, got {}", value),
                ));
            }
        },
    };

    let headers = string_map(id, "executor.headers", executor.get("headers"))?;
    for (name, value) in &headers {
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            StrategyError::invalid_field(id, "executor.headers", format!("{}: {}", name, e))
        })?;
        HeaderValue::from_str(value).map_err(|e| {
            StrategyError::invalid_field(id, "executor.headers", format!("{}: {}", name, e))
        })?;
    }

    let payload_template = match (executor.get("payload_template"), executor.get("payload")) {
        (Some(_), Some(_)) => {
            return Err(StrategyError::ambiguous(
                id,
                "only one of payload_template, payload may be set",
            ));
        }
        (Some(Value::Null), None) | (None, Some(Value::Null)) | (None, None) => None,
        (Some(template), None) | (None, Some(template)) => Some(template.clone()),
    };

    let mut spec = HttpSpec::new(url).with_method(method).with_timeout(timeout);
    spec.headers = headers;
    spec.payload_template = payload_template;
    Ok(spec)
}

fn required_string(
    id: &str,
    fields: &Map<String, Value>,
    field: &str,
) -> std::result::Result<String, StrategyError> {
    let name = format!("executor.{}", field);
    match fields.get(field) {
        Some(Value::String(value)) if !value.trim().is_empty() => Ok(value.clone()),
        None | Some(Value::Null) => Err(StrategyError::missing_field(id, &name)),
        Some(_) => Err(StrategyError::invalid_field(id, &name, "must be a non-empty string")),
    }
}

fn string_map(
    id: &str,
    field: &str,
    value: Option<&Value>,
) -> std::result::Result<BTreeMap<String, String>, StrategyError> {
    match value {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => Ok((k.clone(), s.clone())),
                _ => Err(StrategyError::invalid_field(
                    id,
                    field,
                    format!("value of '{}' must be a string", k),
                )),
            })
            .collect(),
        Some(_) => Err(StrategyError::invalid_field(id, field, "must be an object")),
    }
}
