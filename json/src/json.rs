use crate::error::Result;
use serde_json::Value;

const ELLIPSIS: &str = "...";

/// 紧凑格式，用于日志
pub fn dumps<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// 按字符截断，超长时以"..."结尾，结果不超过max_chars个字符
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(&ELLIPSIS[..max_chars.min(ELLIPSIS.len())]);
    out
}

/// 序列化后截断；序列化失败时输出错误描述
pub fn summarize<T: serde::Serialize>(value: &T, max_chars: usize) -> String {
    match dumps(value) {
        Ok(text) => truncate(&text, max_chars),
        Err(e) => truncate(&format!("<unserializable: {}>", e), max_chars),
    }
}

/// 响应体优先按JSON解析，失败则包装为 {"text": raw}
pub fn parse_or_text(body: &str) -> Value {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(_) => serde_json::json!({ "text": body }),
    }
}
