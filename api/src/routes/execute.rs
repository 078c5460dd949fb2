use crate::errors::ApiError;
use crate::payload::Payload;
use crate::state::AppState;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value as JsonValue, json};

pub fn router() -> Router<AppState> {
    Router::new().route("/execute-urls", post(execute_urls))
}

/// Runs the named prompt set of a website against all of its endpoints.
async fn execute_urls(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<JsonValue>, ApiError> {
    let website_id = payload
        .text("websiteId")
        .ok_or_else(|| ApiError::bad_request("websiteId is required"))?;
    let prompt_name = payload
        .text("promptName")
        .ok_or_else(|| ApiError::bad_request("promptName is required"))?;

    let prompt_set = state
        .prompt_sets
        .resolve(&website_id, &prompt_name)
        .await?
        .ok_or_else(|| ApiError::not_found("Prompt not found"))?;

    let results = state.dispatcher.dispatch(&prompt_set, &payload.0).await;

    let failed = results.iter().filter(|result| !result.is_success()).count();
    tracing::info!(
        website_id = %website_id,
        prompt_name = %prompt_name,
        endpoints = results.len(),
        failed,
        "Executed prompt set"
    );

    Ok(Json(json!({"success": true, "results": results})))
}
