use crate::auth::widget_api_key;
use crate::errors::ApiError;
use crate::payload::Payload;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use store::models::{Website, WebsiteCustomData, WebsiteInput, WebsiteStatus};

const WEBSITE_NOT_FOUND: &str = "Website not found";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/websites/client-config", get(client_config))
        .route("/api/websites/header", get(header))
        .route("/api/websites/chat-config", get(chat_config))
        .route("/api/websites/sync", post(sync))
        .route("/api/websites", get(list).post(create))
        .route(
            "/api/websites/{id}",
            get(fetch).put(update).delete(remove),
        )
        .route("/api/websites/{id}/custom-data", patch(update_custom_data))
        .route("/api/websites/{id}/status", patch(update_status))
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ApiKeyQuery {
    api_key: Option<String>,
}

/// Looks up the website a widget call is made for.
async fn widget_website(
    state: &AppState,
    query: &ApiKeyQuery,
    headers: &HeaderMap,
) -> Result<Website, ApiError> {
    let api_key = widget_api_key(query.api_key.as_deref(), headers)
        .ok_or_else(|| ApiError::bad_request("Missing apiKey"))?;

    state
        .store
        .websites
        .find_by_api_key(&api_key)
        .await?
        .ok_or_else(|| ApiError::not_found(WEBSITE_NOT_FOUND))
}

async fn client_config(
    State(state): State<AppState>,
    Query(query): Query<ApiKeyQuery>,
    headers: HeaderMap,
) -> Result<Json<JsonValue>, ApiError> {
    let website = widget_website(&state, &query, &headers).await?;
    Ok(Json(json!({
        "success": true,
        "item": {
            "id": website.id,
            "websiteName": website.website_name,
            "status": website.status,
            "systemPrompt": website.system_prompt,
            "customPrompt": website.custom_prompt,
            "category": website.category,
        },
    })))
}

async fn header(
    State(state): State<AppState>,
    Query(query): Query<ApiKeyQuery>,
    headers: HeaderMap,
) -> Result<Json<JsonValue>, ApiError> {
    let website = widget_website(&state, &query, &headers).await?;
    Ok(Json(json!({
        "success": true,
        "item": {
            "websiteName": website.website_name,
            "status": website.status,
        },
    })))
}

async fn chat_config(
    State(state): State<AppState>,
    Query(query): Query<ApiKeyQuery>,
    headers: HeaderMap,
) -> Result<Json<JsonValue>, ApiError> {
    let website = widget_website(&state, &query, &headers).await?;
    Ok(Json(json!({
        "success": true,
        "item": {
            "systemPrompt": website.system_prompt,
            "customPrompt": website.custom_prompt,
            "category": website.category,
            "urls": website.urls,
            "library": website.library,
        },
    })))
}

async fn create(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<(StatusCode, Json<JsonValue>), ApiError> {
    let input: WebsiteInput = payload.into_typed()?;
    let website = state.store.websites.save(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"success": true, "message": "Website saved", "item": website})),
    ))
}

/// Lists every website, or returns the one owning the given API key.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ApiKeyQuery>,
    headers: HeaderMap,
) -> Result<Json<JsonValue>, ApiError> {
    if widget_api_key(query.api_key.as_deref(), &headers).is_some() {
        let website = widget_website(&state, &query, &headers).await?;
        return Ok(Json(json!({"success": true, "item": website})));
    }

    let websites = state.store.websites.list().await?;
    Ok(Json(json!({"success": true, "items": websites})))
}

async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>, ApiError> {
    let website = state
        .store
        .websites
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(WEBSITE_NOT_FOUND))?;
    Ok(Json(json!({"success": true, "item": website})))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Payload,
) -> Result<Json<JsonValue>, ApiError> {
    let input: WebsiteInput = payload.into_typed()?;
    let website = state
        .store
        .websites
        .update(&id, input)
        .await?
        .ok_or_else(|| ApiError::not_found(WEBSITE_NOT_FOUND))?;
    Ok(Json(json!({"success": true, "message": "Website updated", "item": website})))
}

async fn update_custom_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Payload,
) -> Result<Json<JsonValue>, ApiError> {
    let data: WebsiteCustomData = payload.into_typed()?;
    let website = state
        .store
        .websites
        .update_custom_data(&id, data)
        .await?
        .ok_or_else(|| ApiError::not_found(WEBSITE_NOT_FOUND))?;
    Ok(Json(json!({"success": true, "message": "Custom data updated", "item": website})))
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Payload,
) -> Result<Json<JsonValue>, ApiError> {
    let status: WebsiteStatus = payload
        .text("status")
        .and_then(|status| status.parse().ok())
        .ok_or_else(|| ApiError::bad_request("Invalid status"))?;

    let website = state
        .store
        .websites
        .update_status(&id, status)
        .await?
        .ok_or_else(|| ApiError::not_found(WEBSITE_NOT_FOUND))?;
    Ok(Json(json!({"success": true, "message": "Status updated", "item": website})))
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>, ApiError> {
    if !state.store.websites.delete(&id).await? {
        return Err(ApiError::not_found(WEBSITE_NOT_FOUND));
    }
    Ok(Json(json!({"success": true, "message": "Website deleted"})))
}

/// Pulls the website catalog of a remote chat backend and saves every entry.
async fn sync(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<JsonValue>, ApiError> {
    let (Some(api_base_url), Some(backend_api_key)) =
        (payload.text("apiBaseUrl"), payload.text("backendApiKey"))
    else {
        return Err(ApiError::bad_request(
            "Missing apiBaseUrl or backendApiKey",
        ));
    };

    let items = state
        .catalog
        .fetch_websites(&api_base_url, &backend_api_key)
        .await
        .map_err(|e| {
            tracing::warn!(api_base_url, error = %e, "Website sync failed");
            ApiError::BadGateway(format!("Failed to fetch websites: {e}"))
        })?;

    if items.is_empty() {
        return Err(ApiError::not_found("No websites found"));
    }

    let mut synced = 0;
    for item in items {
        match serde_json::from_value::<WebsiteInput>(item) {
            Ok(input) => {
                state.store.websites.save(input).await?;
                synced += 1;
            }
            Err(e) => tracing::warn!(error = %e, "Skipping malformed catalog entry"),
        }
    }

    let websites = state.store.websites.list().await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Fetched and synced {synced} websites"),
        "items": websites,
    })))
}
