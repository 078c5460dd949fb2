use api::config::{Config as ApiConfig, ValidationError};
use serde::Deserialize;
use std::fs::File;
use store::StoreConfig;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Errors and warnings are reported to Sentry when set.
    pub sentry_dsn: Option<String>,
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let StoreConfig::Filesystem { path } = &self.store {
            if path.trim().is_empty() {
                return Err(ConfigError::EmptyStorePath);
            }
        }
        if let Some(metrics) = &self.common.metrics {
            if metrics.statsd_port == 0 {
                return Err(ConfigError::InvalidStatsdPort);
            }
        }
        self.api.validate()?;
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid api config: {0}")]
    Invalid(#[from] ValidationError),
    #[error("filesystem store path cannot be empty")]
    EmptyStorePath,
    #[error("statsd port cannot be 0")]
    InvalidStatsdPort,
}
