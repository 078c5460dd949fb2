//! Records kept in the document store, plus the loosely-typed inputs used to
//! create and update them.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_CATEGORY: &str = "General";
pub const CHAT_REQUEST_TYPE: &str = "chat-request";

/// Accepts any JSON value and keeps it only if it has the expected shape.
///
/// Clients send whatever the widget editor produced. A field with the wrong
/// shape (`"urls": "x"`) is treated as absent so the record falls back to its
/// default instead of rejecting the whole request.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Like [`lenient`] for index-aligned string lists such as `urls` and
/// `apiKeys`: an element that is not a string becomes `""` so the positions
/// of the other elements are kept.
pub fn lenient_strings<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(JsonValue::Array(items)) = Option::<JsonValue>::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(Some(
        items
            .into_iter()
            .map(|item| match item {
                JsonValue::String(s) => s,
                _ => String::new(),
            })
            .collect(),
    ))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebsiteStatus {
    #[default]
    Active,
    Inactive,
}

impl FromStr for WebsiteStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(WebsiteStatus::Active),
            "inactive" => Ok(WebsiteStatus::Inactive),
            _ => Err(InvalidStatus(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl ChatStatus {
    pub const ALL: [ChatStatus; 4] = [
        ChatStatus::Pending,
        ChatStatus::Confirmed,
        ChatStatus::Cancelled,
        ChatStatus::Completed,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ChatStatus::Pending => "pending",
            ChatStatus::Confirmed => "confirmed",
            ChatStatus::Cancelled => "cancelled",
            ChatStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChatStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| InvalidStatus(s.to_string()))
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("invalid status: {0}")]
pub struct InvalidStatus(pub String);

/// A tenant site running the chat widget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Website {
    pub id: String,
    #[serde(default)]
    pub website_name: String,
    #[serde(default)]
    pub website_url: String,
    #[serde(default)]
    pub system_prompt: Vec<JsonValue>,
    #[serde(default)]
    pub custom_prompt: Vec<JsonValue>,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub library: Vec<JsonValue>,
    pub api_key: String,
    #[serde(default)]
    pub status: WebsiteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of website create and full-update requests.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteInput {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub website_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub website_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub system_prompt: Option<Vec<JsonValue>>,
    #[serde(default, deserialize_with = "lenient")]
    pub custom_prompt: Option<Vec<JsonValue>>,
    #[serde(default, deserialize_with = "lenient")]
    pub category: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub urls: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub library: Option<Vec<JsonValue>>,
    #[serde(default, deserialize_with = "lenient")]
    pub api_key: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<WebsiteStatus>,
}

impl WebsiteInput {
    /// Overwrites every editable field of `website`, defaulting absent ones.
    /// The id, API key and creation time are kept.
    pub fn apply_to(self, website: &mut Website, now: DateTime<Utc>) {
        website.website_name = self.website_name.unwrap_or_default();
        website.website_url = self.website_url.unwrap_or_default();
        website.system_prompt = self.system_prompt.unwrap_or_default();
        website.custom_prompt = self.custom_prompt.unwrap_or_default();
        website.category = self
            .category
            .unwrap_or_else(|| vec![DEFAULT_CATEGORY.to_string()]);
        website.urls = self.urls.unwrap_or_default();
        website.library = self.library.unwrap_or_default();
        website.status = self.status.unwrap_or_default();
        website.updated_at = now;
    }
}

/// Body of the custom-data update, which only touches the fields a tenant
/// can edit from the widget settings page.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteCustomData {
    #[serde(default, deserialize_with = "lenient")]
    pub custom_prompt: Option<Vec<JsonValue>>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub urls: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub library: Option<Vec<JsonValue>>,
    /// Older widget builds send the library under this name.
    #[serde(default, deserialize_with = "lenient")]
    pub prompt_list: Option<Vec<JsonValue>>,
}

/// Named bundle of endpoint URLs, per-endpoint credentials and parameter
/// rules for one website.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptSet {
    pub website_id: String,
    pub prompt_name: String,
    #[serde(default)]
    pub prompt_list: Vec<JsonValue>,
    #[serde(default)]
    pub prompts: Vec<JsonValue>,
    #[serde(default)]
    pub urls: Vec<String>,
    /// Index-aligned with `urls`.
    #[serde(default)]
    pub api_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_params: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PromptSet {
    /// The explicit parameter whitelist, if one is configured and non-empty.
    pub fn declared_params(&self) -> Option<&[String]> {
        self.required_params
            .as_deref()
            .filter(|params| !params.is_empty())
    }
}

/// Body of prompt set save and update requests.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptSetInput {
    #[serde(default, deserialize_with = "lenient")]
    pub website_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub prompt_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub prompt_list: Option<Vec<JsonValue>>,
    #[serde(default, deserialize_with = "lenient")]
    pub prompts: Option<Vec<JsonValue>>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub urls: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub api_keys: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub required_params: Option<Vec<String>>,
}

impl PromptSetInput {
    pub fn apply_to(self, prompt_set: &mut PromptSet, now: DateTime<Utc>) {
        prompt_set.prompt_list = self.prompt_list.unwrap_or_default();
        prompt_set.prompts = self.prompts.unwrap_or_default();
        prompt_set.urls = self.urls.unwrap_or_default();
        prompt_set.api_keys = self.api_keys.unwrap_or_default();
        prompt_set.required_params = self.required_params;
        prompt_set.updated_at = now;
    }
}

/// A chat session captured by the widget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub id: String,
    #[serde(rename = "type", default = "chat_request_type")]
    pub kind: String,
    pub website_id: String,
    #[serde(default)]
    pub collected_data: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_api_key: Option<String>,
    #[serde(default)]
    pub status: ChatStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn chat_request_type() -> String {
    CHAT_REQUEST_TYPE.to_string()
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChatRequest {
    #[serde(default, deserialize_with = "lenient")]
    pub website_id: Option<String>,
    #[serde(default)]
    pub collected_data: JsonValue,
    #[serde(default, deserialize_with = "lenient")]
    pub backend_api_key: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<ChatStatus>,
}

/// Normalizes widget-collected data into an object-like JSON value.
///
/// A JSON string holding a document is parsed. Anything that is not an
/// object or array ends up wrapped as `{"customData": value}`.
pub fn normalize_collected_data(data: JsonValue) -> JsonValue {
    let data = match data {
        JsonValue::String(raw) => match serde_json::from_str::<JsonValue>(&raw) {
            Ok(parsed) => parsed,
            Err(_) => return serde_json::json!({ "customData": raw }),
        },
        other => other,
    };

    match data {
        JsonValue::Object(_) | JsonValue::Array(_) => data,
        other => serde_json::json!({ "customData": other }),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChatStats {
    pub total: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub cancelled: usize,
    pub completed: usize,
}

impl ChatStats {
    pub fn record(&mut self, status: ChatStatus) {
        self.total += 1;
        match status {
            ChatStatus::Pending => self.pending += 1,
            ChatStatus::Confirmed => self.confirmed += 1,
            ChatStatus::Cancelled => self.cancelled += 1,
            ChatStatus::Completed => self.completed += 1,
        }
    }
}
