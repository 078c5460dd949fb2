use serde::Deserialize;

pub const DEFAULT_GENERATIVE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

/// Environment variable consulted when no generative AI key is configured.
pub const GENERATIVE_API_KEY_ENV: &str = "GEMINI_API_KEY";

fn default_dispatch_timeout_secs() -> u64 {
    10
}

fn default_max_concurrency() -> usize {
    8
}

fn default_long_timeout_secs() -> u64 {
    30
}

fn default_generative_url() -> String {
    DEFAULT_GENERATIVE_URL.to_string()
}

/// Fan-out dispatch settings
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DispatchConfig {
    /// Upper bound for a single endpoint call, connect through body read
    #[serde(default = "default_dispatch_timeout_secs")]
    pub timeout_secs: u64,
    /// Endpoint calls of one dispatch allowed in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Also forward `websiteId` and `promptName` when a prompt set has no
    /// declared parameters
    #[serde(default)]
    pub forward_routing_fields: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            timeout_secs: default_dispatch_timeout_secs(),
            max_concurrency: default_max_concurrency(),
            forward_routing_fields: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GenerativeConfig {
    #[serde(default = "default_generative_url")]
    pub url: String,
    /// Falls back to the `GEMINI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_long_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        GenerativeConfig {
            url: default_generative_url(),
            api_key: None,
            timeout_secs: default_long_timeout_secs(),
        }
    }
}

impl GenerativeConfig {
    /// The configured key, or the environment fallback. Empty keys count as unset.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(GENERATIVE_API_KEY_ENV).ok())
            .filter(|key| !key.is_empty())
    }
}

/// Website catalog sync settings
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SyncConfig {
    #[serde(default = "default_long_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            timeout_secs: default_long_timeout_secs(),
        }
    }
}
