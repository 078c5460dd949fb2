//! Prompt execution fan-out.
//!
//! A dispatch takes the caller's flat payload and a resolved [`PromptSet`],
//! builds one form-encoded POST per configured URL and runs them
//! concurrently. Every endpoint yields exactly one [`DispatchResult`]: its
//! decoded response body, or the reason the call could not be completed.
//! Failures stay local to their endpoint.

use crate::config::DispatchConfig;
use crate::errors::DispatchError;
use crate::metrics_defs::{
    DISPATCH_CREDENTIAL_FALLBACK, DISPATCH_ENDPOINT_DURATION, DISPATCH_ENDPOINT_FAILED,
    DISPATCH_PARAM_MISSING, DISPATCH_URL_SKIPPED,
};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value as JsonValue;
use shared::{counter, histogram};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use store::models::PromptSet;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Inbound parameters in the order the client sent them.
pub type RequestPayload = IndexMap<String, JsonValue>;

/// Payload fields that select the prompt set rather than feed the endpoints.
pub const ROUTING_FIELDS: [&str; 2] = ["websiteId", "promptName"];

/// Form field carrying the per-endpoint credential.
pub const CREDENTIAL_FIELD: &str = "key";

/// Outcome of one endpoint call.
///
/// Serializes as `{"index": i, "data": ...}` or
/// `{"index": i, "success": false, "error": "..."}`.
#[derive(Clone, Debug, PartialEq)]
pub enum DispatchResult {
    Completed { index: usize, data: JsonValue },
    Failed { index: usize, error: String },
}

impl DispatchResult {
    pub fn index(&self) -> usize {
        match self {
            DispatchResult::Completed { index, .. } | DispatchResult::Failed { index, .. } => {
                *index
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DispatchResult::Completed { .. })
    }
}

impl Serialize for DispatchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DispatchResult::Completed { index, data } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("index", index)?;
                map.serialize_entry("data", data)?;
                map.end()
            }
            DispatchResult::Failed { index, error } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("index", index)?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}

/// Where an endpoint's credential came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Credential<'a> {
    /// The key configured at the endpoint's own index.
    Own(&'a str),
    /// The endpoint has no key of its own, the first key is used instead.
    Fallback(&'a str),
    None,
}

impl<'a> Credential<'a> {
    pub fn value(&self) -> Option<&'a str> {
        match *self {
            Credential::Own(key) | Credential::Fallback(key) => Some(key),
            Credential::None => None,
        }
    }
}

/// Credential chain for URL `index`: `api_keys[index]`, then `api_keys[0]`.
/// Empty keys count as absent.
pub fn credential_for(api_keys: &[String], index: usize) -> Credential<'_> {
    let non_empty = move |i: usize| api_keys.get(i).map(String::as_str).filter(|k| !k.is_empty());

    if let Some(key) = non_empty(index) {
        Credential::Own(key)
    } else if let Some(key) = non_empty(0) {
        Credential::Fallback(key)
    } else {
        Credential::None
    }
}

/// Names of the parameters forwarded to every endpoint.
///
/// A non-empty declared list wins. Otherwise every payload key is used, in
/// payload order, minus the routing fields unless `forward_routing_fields`.
pub fn resolve_params(
    prompt_set: &PromptSet,
    payload: &RequestPayload,
    forward_routing_fields: bool,
) -> Vec<String> {
    if let Some(declared) = prompt_set.declared_params() {
        return declared.to_vec();
    }

    payload
        .keys()
        .filter(|key| forward_routing_fields || !ROUTING_FIELDS.contains(&key.as_str()))
        .cloned()
        .collect()
}

/// Renders a payload value as a form field. `None` for null, which is treated
/// the same as an absent parameter.
pub fn form_value(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Array(_) | JsonValue::Object(_) => Some(value.to_string()),
    }
}

/// A fully prepared endpoint call.
#[derive(Clone, Debug, PartialEq)]
pub struct EndpointCall {
    pub index: usize,
    pub url: String,
    pub form: Vec<(String, String)>,
    /// Parameters (and possibly the credential field) that were not sent.
    pub missing: Vec<String>,
}

/// Builds the calls for every non-blank URL, in URL order.
pub fn plan_calls(
    prompt_set: &PromptSet,
    payload: &RequestPayload,
    forward_routing_fields: bool,
) -> Vec<EndpointCall> {
    let params = resolve_params(prompt_set, payload, forward_routing_fields);

    let mut calls = Vec::with_capacity(prompt_set.urls.len());
    for (index, url) in prompt_set.urls.iter().enumerate() {
        if url.trim().is_empty() {
            counter!(DISPATCH_URL_SKIPPED).increment(1);
            continue;
        }

        let mut form = Vec::with_capacity(params.len() + 1);
        let mut missing = Vec::new();

        for param in &params {
            match payload.get(param).and_then(form_value) {
                Some(value) => form.push((param.clone(), value)),
                None => missing.push(param.clone()),
            }
        }

        let credential = credential_for(&prompt_set.api_keys, index);
        if let Credential::Fallback(_) = credential {
            tracing::warn!(
                website_id = %prompt_set.website_id,
                prompt_name = %prompt_set.prompt_name,
                index,
                "No API key configured for URL, falling back to the first key"
            );
            counter!(DISPATCH_CREDENTIAL_FALLBACK).increment(1);
        }
        match credential.value() {
            Some(key) => form.push((CREDENTIAL_FIELD.to_string(), key.to_string())),
            None => missing.push(CREDENTIAL_FIELD.to_string()),
        }

        if !missing.is_empty() {
            tracing::debug!(index, url = %url, ?missing, "Dispatching with missing parameters");
            counter!(DISPATCH_PARAM_MISSING).increment(missing.len() as u64);
        }

        calls.push(EndpointCall {
            index,
            url: url.trim().to_string(),
            form,
            missing,
        });
    }
    calls
}

/// Decodes an endpoint response: JSON when it parses, raw text otherwise.
fn decode_body(body: &[u8]) -> JsonValue {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(body).into_owned()))
}

#[derive(Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Dispatcher {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Calls every endpoint of `prompt_set` and returns one result per
    /// non-blank URL, ordered by URL index.
    pub async fn dispatch(
        &self,
        prompt_set: &PromptSet,
        payload: &RequestPayload,
    ) -> Vec<DispatchResult> {
        let calls = plan_calls(prompt_set, payload, self.config.forward_routing_fields);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let timeout_secs = self.config.timeout_secs;

        let mut join_set = JoinSet::new();
        let mut task_indices = HashMap::new();

        for call in calls {
            let index = call.index;
            let client = self.client.clone();
            let semaphore = semaphore.clone();

            let handle = join_set.spawn(async move {
                // The semaphore is never closed, so acquiring only waits.
                let _permit = semaphore.acquire().await.ok();
                let result = call_endpoint(&client, &call, timeout_secs).await;
                (call.index, result)
            });
            task_indices.insert(handle.id(), index);
        }

        let mut results = Vec::with_capacity(task_indices.len());

        while let Some(joined) = join_set.join_next_with_id().await {
            let (index, outcome) = match joined {
                Ok((_, (index, outcome))) => (index, outcome),
                Err(e) => {
                    tracing::error!("Endpoint task panicked: {}", e);
                    let Some(index) = task_indices.get(&e.id()).copied() else {
                        continue;
                    };
                    (index, Err(DispatchError::Task(e.to_string())))
                }
            };

            let result = match outcome {
                Ok(data) => DispatchResult::Completed { index, data },
                Err(e) => {
                    tracing::warn!(
                        website_id = %prompt_set.website_id,
                        prompt_name = %prompt_set.prompt_name,
                        index,
                        error = %e,
                        "Endpoint call failed"
                    );
                    counter!(DISPATCH_ENDPOINT_FAILED).increment(1);
                    DispatchResult::Failed {
                        index,
                        error: e.to_string(),
                    }
                }
            };
            results.push(result);
        }

        results.sort_by_key(DispatchResult::index);
        results
    }
}

/// POSTs the form to one endpoint. The timeout covers the whole exchange,
/// including reading the response body.
async fn call_endpoint(
    client: &reqwest::Client,
    call: &EndpointCall,
    timeout_secs: u64,
) -> Result<JsonValue, DispatchError> {
    let url = Url::parse(&call.url).map_err(|e| DispatchError::InvalidUrl {
        url: call.url.clone(),
        reason: e.to_string(),
    })?;

    let start = Instant::now();
    let exchange = async {
        let response = client.post(url).form(&call.form).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok::<_, reqwest::Error>((status, body))
    };

    let outcome = tokio::time::timeout(Duration::from_secs(timeout_secs), exchange)
        .await
        .map_err(|_| DispatchError::Timeout(timeout_secs))
        .and_then(|result| result.map_err(DispatchError::from));

    let outcome_label = if outcome.is_ok() { "completed" } else { "failed" };
    histogram!(DISPATCH_ENDPOINT_DURATION, "outcome" => outcome_label)
        .record(start.elapsed().as_secs_f64());

    let (status, body) = outcome?;
    tracing::debug!(index = call.index, status = status.as_u16(), "Endpoint responded");
    Ok(decode_body(&body))
}
