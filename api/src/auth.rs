use crate::errors::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use store::models::Website;

pub const API_KEY_HEADER: &str = "x-api-key";

/// The website owning the API key a request was made with.
#[derive(Clone, Debug)]
pub struct AuthenticatedWebsite(pub Website);

/// The widget API key from the `apiKey` query parameter or the `x-api-key`
/// header, in that order.
pub fn widget_api_key(query_key: Option<&str>, headers: &HeaderMap) -> Option<String> {
    query_key
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .or_else(|| header_api_key(headers))
}

fn header_api_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

/// Resolves the `x-api-key` header to a website and attaches it to the
/// request as [`AuthenticatedWebsite`].
pub async fn require_api_key(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let api_key = header_api_key(request.headers()).ok_or(ApiError::MissingApiKey)?;

    let website = state
        .store
        .websites
        .find_by_api_key(&api_key)
        .await?
        .ok_or_else(|| {
            tracing::info!("Rejected request with an unknown API key");
            ApiError::InvalidApiKey
        })?;

    request
        .extensions_mut()
        .insert(AuthenticatedWebsite(website));
    Ok(next.run(request).await)
}
