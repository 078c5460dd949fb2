use crate::payload::Payload;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use store::models::lenient;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/generate-ai-response", post(generate))
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct AiQuestion {
    #[serde(default, deserialize_with = "lenient")]
    website_title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    categories: Option<Vec<String>>,
}

type AiResponse = (StatusCode, Json<JsonValue>);

fn failure(status: StatusCode, message: &str) -> AiResponse {
    (status, Json(json!({"success": false, "message": message})))
}

/// Answers a widget question with the configured generative model.
///
/// Unlike the rest of the API this endpoint reports errors under `message`,
/// which is what the widget reads.
async fn generate(State(state): State<AppState>, payload: Payload) -> AiResponse {
    let Some(question) = payload.text("question") else {
        return failure(StatusCode::BAD_REQUEST, "Question is required");
    };
    let details: AiQuestion = payload.into_typed().unwrap_or_default();

    let Some(client) = &state.generative else {
        return failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            "AI service is not configured",
        );
    };

    match client
        .generate(
            &question,
            details.website_title.as_deref(),
            details.categories.as_deref().unwrap_or_default(),
        )
        .await
    {
        Ok(response) => (
            StatusCode::OK,
            Json(json!({"success": true, "response": response})),
        ),
        Err(e) => {
            tracing::error!(error = %e, "AI request failed");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error processing AI request",
            )
        }
    }
}
