mod settings;
mod strategies;

pub use settings::Settings;
pub use strategies::StrategyDocument;

#[cfg(test)]
mod strategies_test;

use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// 环境变量前缀，CONTROLLER_SETTINGS__LOG_LEVEL 对应 settings.log_level
pub const ENV_PREFIX: &str = "CONTROLLER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file error: {message}")]
    FileError { message: String },
    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

pub struct Config {
    settings: config::Config,
}

impl Config {
    /// JSON文本叠加进程环境变量
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Self::build(text, None)
    }

    /// 以给定的变量表代替进程环境
    pub fn from_json_str_with_env(
        text: &str,
        env: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        Self::build(text, Some(env))
    }

    fn build(text: &str, env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        config::builder::ConfigBuilder::<config::builder::DefaultState>::default()
            .add_source(config::File::from_str(text, config::FileFormat::Json))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .map(|settings| {
                debug!("settings: {:?}", settings);
                Config { settings }
            })
            .map_err(|e| ConfigError::FileError {
                message: e.to_string(),
            })
    }

    pub fn get<'de, T: Deserialize<'de>>(&self, key: &str) -> Result<T, ConfigError> {
        self.settings
            .get::<T>(key)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
    }

    /// key不存在时返回None，类型不符仍然报错
    pub fn get_optional<'de, T: Deserialize<'de>>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.settings.get::<T>(key) {
            Ok(value) => Ok(Some(value)),
            Err(config::ConfigError::NotFound(_)) => Ok(None),
            Err(e) => Err(ConfigError::ParseError {
                message: e.to_string(),
            }),
        }
    }
}
