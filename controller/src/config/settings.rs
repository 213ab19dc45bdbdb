use crate::{
    config::Config,
    errors::{ControllerError, Result},
    scheduler::SchedulerOptions,
};
use serde::Deserialize;
use std::time::Duration;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_http_timeout_secs() -> f64 {
    5.0
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

fn default_summary_len() -> usize {
    240
}

/// 进程级配置，所有字段都可省略
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<String>, // 为空时输出到stderr

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: f64, // 远端执行器未配置timeout_sec时使用
    #[serde(default)]
    pub proxy_url: Option<String>,

    #[serde(default)]
    pub trade_db_path: Option<String>, // 为空时交易只写日志

    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    #[serde(default = "default_summary_len")]
    pub summary_len: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: None,
            http_timeout_secs: default_http_timeout_secs(),
            proxy_url: None,
            trade_db_path: None,
            shutdown_grace_secs: default_shutdown_grace_secs(),
            summary_len: default_summary_len(),
        }
    }
}

impl Settings {
    pub fn load(text: &str) -> Result<Self> {
        let config = Config::from_json_str(text)
            .map_err(|e| ControllerError::config(format!("load settings err: {}", e)))?;
        Self::from_config(&config)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let settings: Settings = config
            .get_optional("settings")
            .map_err(|e| ControllerError::config(format!("get settings err: {}", e)))?
            .unwrap_or_default();
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.http_timeout()?;
        if self.summary_len == 0 {
            return Err(ControllerError::config("settings.summary_len must be > 0"));
        }
        if self.log_level.trim().is_empty() {
            return Err(ControllerError::config("settings.log_level must not be empty"));
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Result<Duration> {
        match Duration::try_from_secs_f64(self.http_timeout_secs) {
            Ok(timeout) if !timeout.is_zero() => Ok(timeout),
            _ => Err(ControllerError::config(format!(
                "settings.http_timeout_secs must be a number of seconds > 0, got {}",
                self.http_timeout_secs
            ))),
        }
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            shutdown_grace: Duration::from_secs(self.shutdown_grace_secs),
            summary_len: self.summary_len,
            ..SchedulerOptions::default()
        }
    }
}
