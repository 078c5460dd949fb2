use crate::config::GenerativeConfig;
use crate::errors::GenerateError;
use crate::metrics_defs::AI_REQUEST;
use serde_json::{Value as JsonValue, json};
use shared::counter;
use std::time::Duration;

pub const FALLBACK_ANSWER: &str = "Sorry, I couldn't generate a response.";

const DEFAULT_TITLE: &str = "Support";

/// Builds the support-assistant prompt sent to the model.
pub fn build_prompt(question: &str, website_title: Option<&str>, categories: &[String]) -> String {
    let title = website_title
        .filter(|title| !title.is_empty())
        .unwrap_or(DEFAULT_TITLE);

    let scope = if categories.is_empty() {
        String::new()
    } else {
        format!(
            "You must ONLY answer questions related to these categories: {}. ",
            categories.join(", ")
        )
    };

    format!(
        "You are a support assistant for {title}. {scope}Provide a short, helpful, and relevant \
         answer. If the question is not related to your categories, politely explain that you \
         can only help with category-related questions.\n\n{question}"
    )
}

/// Extracts the first candidate's text from a generateContent response.
fn answer_text(response: &JsonValue) -> Option<&str> {
    response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(JsonValue::as_str)
        .filter(|text| !text.is_empty())
}

/// Single-shot client for the generative AI answer endpoint.
#[derive(Clone)]
pub struct GenerativeClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    timeout_secs: u64,
}

impl GenerativeClient {
    /// Returns `None` when no API key is configured or set in the environment.
    pub fn from_config(config: &GenerativeConfig) -> Option<Self> {
        let api_key = config.resolve_api_key()?;
        Some(GenerativeClient {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            api_key,
            timeout_secs: config.timeout_secs,
        })
    }

    pub async fn generate(
        &self,
        question: &str,
        website_title: Option<&str>,
        categories: &[String],
    ) -> Result<String, GenerateError> {
        let prompt = build_prompt(question, website_title, categories);
        let body = json!({"contents": [{"parts": [{"text": prompt}]}]});

        let exchange = async {
            self.client
                .post(&self.url)
                .query(&[("key", self.api_key.as_str())])
                .json(&body)
                .send()
                .await?
                .error_for_status()?
                .json::<JsonValue>()
                .await
        };

        let result = tokio::time::timeout(Duration::from_secs(self.timeout_secs), exchange)
            .await
            .map_err(|_| GenerateError::Timeout(self.timeout_secs))
            .and_then(|result| result.map_err(GenerateError::from));

        let outcome = if result.is_ok() { "completed" } else { "failed" };
        counter!(AI_REQUEST, "outcome" => outcome).increment(1);

        let response = result?;
        Ok(answer_text(&response)
            .unwrap_or(FALLBACK_ANSWER)
            .to_string())
    }
}
