use crate::auth::{AuthenticatedWebsite, require_api_key};
use crate::errors::{ApiError, INTERNAL_ERROR_MESSAGE};
use crate::payload::Payload;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router, middleware};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use store::chat_requests::{DEFAULT_FILTERED_LIMIT, DEFAULT_LIST_LIMIT};
use store::models::{ChatStatus, NewChatRequest};

const CHAT_REQUEST_NOT_FOUND: &str = "Chat request not found";

pub fn router(state: AppState) -> Router<AppState> {
    // Only the widget-originated write is keyed to a website.
    let create_route =
        post(create).route_layer(middleware::from_fn_with_state(state, require_api_key));

    Router::new()
        .route("/api/chat-requests/test", get(test_connection))
        .route("/api/chat-requests", get(list).merge(create_route))
        .route(
            "/api/chat-requests/backend-api-key/{key}",
            get(by_backend_api_key),
        )
        .route("/api/chat-requests/website/{website_id}", get(by_website))
        .route("/api/chat-requests/{id}", get(fetch).delete(remove))
        .route("/api/chat-requests/{id}/status", put(update_status))
        .route("/api/chat-stats", get(stats))
}

async fn test_connection(State(state): State<AppState>) -> (StatusCode, Json<JsonValue>) {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"success": true, "connected": true})),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Store connection test failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "connected": false,
                    "error": INTERNAL_ERROR_MESSAGE,
                })),
            )
        }
    }
}

async fn create(
    State(state): State<AppState>,
    Extension(AuthenticatedWebsite(website)): Extension<AuthenticatedWebsite>,
    payload: Payload,
) -> Result<(StatusCode, Json<JsonValue>), ApiError> {
    let request: NewChatRequest = payload.into_typed()?;
    if request
        .website_id
        .as_deref()
        .is_some_and(|website_id| website_id != website.id)
    {
        tracing::debug!(
            website_id = %website.id,
            "Ignoring websiteId in body, using the authenticated website"
        );
    }

    let chat_request = state.store.chat_requests.create(&website.id, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"success": true, "item": chat_request})),
    ))
}

#[derive(Deserialize, Debug, Default)]
struct ListQuery {
    status: Option<String>,
    limit: Option<String>,
}

impl ListQuery {
    /// A missing or unparsable limit falls back to `default`.
    fn limit(&self, default: usize) -> usize {
        self.limit
            .as_deref()
            .and_then(|limit| limit.trim().parse().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(default)
    }

    fn status(&self) -> Result<Option<ChatStatus>, ApiError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(status) => status
                .parse()
                .map(Some)
                .map_err(|_| ApiError::bad_request("Invalid status")),
        }
    }
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<JsonValue>, ApiError> {
    let items = match query.status()? {
        Some(status) => {
            state
                .store
                .chat_requests
                .by_status(status, query.limit(DEFAULT_FILTERED_LIMIT))
                .await?
        }
        None => {
            state
                .store
                .chat_requests
                .list(query.limit(DEFAULT_LIST_LIMIT))
                .await?
        }
    };
    Ok(Json(json!({"success": true, "items": items})))
}

async fn by_backend_api_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<JsonValue>, ApiError> {
    let items = state
        .store
        .chat_requests
        .by_backend_api_key(&key, query.limit(DEFAULT_FILTERED_LIMIT))
        .await?;
    Ok(Json(json!({"success": true, "items": items})))
}

async fn by_website(
    State(state): State<AppState>,
    Path(website_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<JsonValue>, ApiError> {
    let items = state
        .store
        .chat_requests
        .by_website(&website_id, query.limit(DEFAULT_FILTERED_LIMIT))
        .await?;
    Ok(Json(json!({"success": true, "items": items})))
}

async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>, ApiError> {
    let chat_request = state
        .store
        .chat_requests
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(CHAT_REQUEST_NOT_FOUND))?;
    Ok(Json(json!({"success": true, "item": chat_request})))
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Payload,
) -> Result<Json<JsonValue>, ApiError> {
    let status: ChatStatus = payload
        .text("status")
        .and_then(|status| status.parse().ok())
        .ok_or_else(|| ApiError::bad_request("Invalid status"))?;

    let chat_request = state
        .store
        .chat_requests
        .update_status(&id, status)
        .await?
        .ok_or_else(|| ApiError::not_found(CHAT_REQUEST_NOT_FOUND))?;
    Ok(Json(json!({"success": true, "item": chat_request})))
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>, ApiError> {
    if !state.store.chat_requests.delete(&id).await? {
        return Err(ApiError::not_found(CHAT_REQUEST_NOT_FOUND));
    }
    Ok(Json(json!({"success": true, "message": "Chat request deleted"})))
}

async fn stats(State(state): State<AppState>) -> Result<Json<JsonValue>, ApiError> {
    let stats = state.store.chat_requests.stats().await?;
    Ok(Json(json!({"success": true, "stats": stats})))
}
