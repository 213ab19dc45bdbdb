use crate::{
    errors::DispatchError,
    executor::{AlgorithmResult, Executor},
    strategy::{Context, HttpMethod, HttpSpec},
};
use async_trait::async_trait;
use log::{debug, error};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

// 错误信息中保留的响应体长度
const ERROR_BODY_CHARS: usize = 512;

/// 远端执行器，每次tick发一次HTTP请求
pub struct HttpExecutor {
    strategy_id: String,
    spec: HttpSpec,
    client: reqwest::Client,
}

impl HttpExecutor {
    pub fn new(strategy_id: String, spec: HttpSpec, client: reqwest::Client) -> Self {
        Self {
            strategy_id,
            spec,
            client,
        }
    }

    pub fn spec(&self) -> &HttpSpec {
        &self.spec
    }

    fn headers(&self) -> Result<HeaderMap, DispatchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.spec.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| DispatchError::request(format!("header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| DispatchError::request(format!("header {} value: {}", name, e)))?;
            headers.insert(name, value);
        }
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Ok(headers)
    }

    fn payload(&self, context: &Context) -> Value {
        match &self.spec.payload_template {
            Some(template) => context.render(template),
            None => context.payload(),
        }
    }
}

/// GET请求把扁平对象展开为查询参数，嵌套值以紧凑JSON传递
pub fn query_params(payload: &Value) -> Result<Vec<(String, String)>, DispatchError> {
    let Value::Object(map) = payload else {
        return Err(DispatchError::request("GET payload must be a JSON object"));
    };
    let mut params = Vec::with_capacity(map.len());
    for (key, value) in map {
        let value = match value {
            Value::Null => continue,
            Value::String(text) => text.clone(),
            Value::Bool(_) | Value::Number(_) => value.to_string(),
            _ => json::dumps(value).map_err(|e| DispatchError::request(e.to_string()))?,
        };
        params.push((key.clone(), value));
    }
    Ok(params)
}

fn classify(e: reqwest::Error) -> DispatchError {
    if e.is_builder() {
        DispatchError::request(e.to_string())
    } else {
        DispatchError::transient(e.to_string())
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    fn kind(&self) -> &'static str {
        "http"
    }

    async fn execute(&mut self, context: &Context) -> Result<AlgorithmResult, DispatchError> {
        let payload = self.payload(context);
        let request = match self.spec.method {
            HttpMethod::Get => self.client.get(&self.spec.url).query(&query_params(&payload)?),
            HttpMethod::Post => {
                let body = json::dumps(&payload).map_err(|e| DispatchError::request(e.to_string()))?;
                self.client.post(&self.spec.url).body(body)
            }
        };

        let resp = request
            .headers(self.headers()?)
            .timeout(self.spec.timeout)
            .send()
            .await
            .map_err(|e| {
                error!(
                    "[{}] {} {} failed: {:?}",
                    self.strategy_id,
                    self.spec.method.as_str(),
                    self.spec.url,
                    e
                );
                classify(e)
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(classify)?;
        if !status.is_success() {
            return Err(DispatchError::Remote {
                status: status.as_u16(),
                body: json::truncate(&text, ERROR_BODY_CHARS),
            });
        }
        debug!(
            "[{}] {} {} -> {}",
            self.strategy_id,
            self.spec.method.as_str(),
            self.spec.url,
            status
        );
        Ok(AlgorithmResult::remote(status.as_u16(), json::parse_or_text(&text)))
    }
}
