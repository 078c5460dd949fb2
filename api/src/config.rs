use serde::Deserialize;
use thiserror::Error;
use upstream::{DispatchConfig, GenerativeConfig, SyncConfig};
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("{0} timeout cannot be 0")]
    ZeroTimeout(&'static str),

    #[error("Dispatch concurrency cannot be 0")]
    ZeroConcurrency,

    #[error("Invalid generative AI url: {0}")]
    InvalidGenerativeUrl(String),
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// HTTP API configuration
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub listener: Listener,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub generative_ai: GenerativeConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;

        if self.dispatch.timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout("Dispatch"));
        }
        if self.dispatch.max_concurrency == 0 {
            return Err(ValidationError::ZeroConcurrency);
        }
        if self.generative_ai.timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout("Generative AI"));
        }
        if self.sync.timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout("Sync"));
        }
        if let Err(e) = Url::parse(&self.generative_ai.url) {
            return Err(ValidationError::InvalidGenerativeUrl(format!(
                "{}: {e}",
                self.generative_ai.url
            )));
        }

        Ok(())
    }
}
