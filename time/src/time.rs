use chrono::{SecondsFormat, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

// 系统时钟早于UNIX_EPOCH时返回0
pub fn get_current_milli_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

pub fn get_current_nano_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default()
}

/// 当前UTC时间，RFC3339格式，精确到毫秒
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
