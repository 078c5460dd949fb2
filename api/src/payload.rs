//! Request bodies arrive as JSON objects from the admin UI and as
//! url-encoded or multipart forms from embedded widgets. [`Payload`] accepts
//! all three and yields the same ordered field map.

use crate::errors::ApiError;
use axum::Form;
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use upstream::RequestPayload;
use upstream::fanout::form_value;

pub struct Payload(pub RequestPayload);

impl Payload {
    /// A field rendered as text, if present, non-null and non-blank.
    pub fn text(&self, name: &str) -> Option<String> {
        self.0
            .get(name)
            .and_then(form_value)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Reads the payload as a typed request body.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let object = JsonValue::Object(self.0.into_iter().collect());
        serde_json::from_value(object).map_err(|e| {
            tracing::debug!(error = %e, "Rejected request body");
            ApiError::InvalidBody
        })
    }
}

fn media_type(req: &Request) -> String {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match media_type(&req).as_str() {
            "application/x-www-form-urlencoded" => {
                let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                    .await
                    .map_err(|_| ApiError::InvalidBody)?;
                Ok(Payload(
                    pairs
                        .into_iter()
                        .map(|(name, value)| (name, JsonValue::String(value)))
                        .collect(),
                ))
            }
            "multipart/form-data" => {
                let mut multipart = Multipart::from_request(req, state)
                    .await
                    .map_err(|_| ApiError::InvalidBody)?;

                let mut payload = RequestPayload::new();
                while let Some(field) = multipart
                    .next_field()
                    .await
                    .map_err(|_| ApiError::InvalidBody)?
                {
                    // Only text fields are read; uploads are ignored.
                    if field.file_name().is_some() {
                        continue;
                    }
                    let Some(name) = field.name().map(str::to_string) else {
                        continue;
                    };
                    let value = field.text().await.map_err(|_| ApiError::InvalidBody)?;
                    payload.insert(name, JsonValue::String(value));
                }
                Ok(Payload(payload))
            }
            _ => {
                let bytes = Bytes::from_request(req, state)
                    .await
                    .map_err(|_| ApiError::InvalidBody)?;
                if bytes.iter().all(u8::is_ascii_whitespace) {
                    return Ok(Payload(RequestPayload::new()));
                }
                serde_json::from_slice::<RequestPayload>(&bytes)
                    .map(Payload)
                    .map_err(|_| ApiError::InvalidBody)
            }
        }
    }
}
