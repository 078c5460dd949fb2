use crate::errors::ApiError;
use crate::payload::Payload;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value as JsonValue, json};
use store::models::{PromptSet, PromptSetInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/childprompt/health", get(health))
        .route("/api/childprompt/save", post(save))
        .route("/api/childprompt/{website_id}", get(list))
        .route(
            "/api/childprompt/{website_id}/{prompt_name}",
            get(fetch).put(update).delete(remove),
        )
        .route(
            "/api/childprompt/{website_id}/updatename/{old_prompt_name}",
            put(rename),
        )
}

async fn health() -> Json<JsonValue> {
    Json(json!({"message": "ChildPrompt API is running"}))
}

async fn save(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<JsonValue>, ApiError> {
    let website_id = payload
        .text("websiteId")
        .ok_or_else(|| ApiError::bad_request("websiteId is required"))?;
    let prompt_name = payload
        .text("promptName")
        .ok_or_else(|| ApiError::bad_request("promptName is required"))?;
    let input: PromptSetInput = payload.into_typed()?;

    let saved = state
        .store
        .prompt_sets
        .save(&website_id, &prompt_name, input)
        .await?;
    Ok(Json(json!({"message": "Saved successfully", "data": saved})))
}

async fn fetch(
    State(state): State<AppState>,
    Path((website_id, prompt_name)): Path<(String, String)>,
) -> Result<Json<PromptSet>, ApiError> {
    state
        .store
        .prompt_sets
        .get(&website_id, &prompt_name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Not found"))
}

async fn list(
    State(state): State<AppState>,
    Path(website_id): Path<String>,
) -> Result<Json<Vec<PromptSet>>, ApiError> {
    Ok(Json(state.store.prompt_sets.list(&website_id).await?))
}

async fn update(
    State(state): State<AppState>,
    Path((website_id, prompt_name)): Path<(String, String)>,
    payload: Payload,
) -> Result<Json<JsonValue>, ApiError> {
    let input: PromptSetInput = payload.into_typed()?;
    let updated = state
        .store
        .prompt_sets
        .update(&website_id, &prompt_name, input)
        .await?;
    Ok(Json(json!({"message": "Updated successfully", "data": updated})))
}

async fn rename(
    State(state): State<AppState>,
    Path((website_id, old_prompt_name)): Path<(String, String)>,
    payload: Payload,
) -> Result<Json<JsonValue>, ApiError> {
    let new_prompt_name = payload
        .text("newPromptName")
        .ok_or_else(|| ApiError::bad_request("newPromptName is required"))?;

    let renamed = state
        .store
        .prompt_sets
        .rename(&website_id, &old_prompt_name, &new_prompt_name)
        .await?;
    Ok(Json(json!({
        "message": "Prompt name updated successfully",
        "data": renamed,
    })))
}

async fn remove(
    State(state): State<AppState>,
    Path((website_id, prompt_name)): Path<(String, String)>,
) -> Result<Json<JsonValue>, ApiError> {
    if !state
        .store
        .prompt_sets
        .delete(&website_id, &prompt_name)
        .await?
    {
        return Err(ApiError::not_found("Not found"));
    }
    Ok(Json(json!({"message": "Prompt deleted successfully"})))
}

#[cfg(test)]
mod tests {
    use crate::testutils::{TestApp, json_request};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new();
        let (status, body) = app.get("/api/childprompt/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "ChildPrompt API is running"}));
    }

    #[tokio::test]
    async fn test_save_get_list() {
        let app = TestApp::new();
        let (status, body) = app
            .send(json_request(
                "POST",
                "/api/childprompt/save",
                json!({
                    "websiteId": "w1",
                    "promptName": "p1",
                    "urls": ["https://a.test"],
                    "apiKeys": ["k1"],
                }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Saved successfully");
        assert_eq!(body["data"]["urls"], json!(["https://a.test"]));

        let (status, body) = app.get("/api/childprompt/w1/p1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["apiKeys"], json!(["k1"]));

        let (status, body) = app.get("/api/childprompt/w1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(1));

        let (status, body) = app.get("/api/childprompt/w1/other").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"success": false, "error": "Not found"}));
    }

    #[tokio::test]
    async fn test_save_requires_identifiers() {
        let app = TestApp::new();
        let (status, body) = app
            .send(json_request(
                "POST",
                "/api/childprompt/save",
                json!({"promptName": "p1"}),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "websiteId is required");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let app = TestApp::new();
        app.save_prompt_set("w1", "p1", json!({"urls": ["https://a.test"]}))
            .await;

        let (status, body) = app
            .send(json_request(
                "PUT",
                "/api/childprompt/w1/p1",
                json!({"urls": ["https://b.test"]}),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["urls"], json!(["https://b.test"]));

        let (status, _) = app
            .send(json_request("PUT", "/api/childprompt/w1/missing", json!({})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = app.delete("/api/childprompt/w1/p1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Prompt deleted successfully");

        let (status, _) = app.delete("/api/childprompt/w1/p1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rename() {
        let app = TestApp::new();
        app.save_prompt_set("w1", "a", json!({"urls": ["https://a.test"]}))
            .await;
        app.save_prompt_set("w1", "b", json!({})).await;

        let (status, body) = app
            .send(json_request(
                "PUT",
                "/api/childprompt/w1/updatename/a",
                json!({}),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "newPromptName is required");

        let (status, _) = app
            .send(json_request(
                "PUT",
                "/api/childprompt/w1/updatename/a",
                json!({"newPromptName": "b"}),
            ))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = app
            .send(json_request(
                "PUT",
                "/api/childprompt/w1/updatename/a",
                json!({"newPromptName": "c"}),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["promptName"], "c");
        assert_eq!(body["data"]["urls"], json!(["https://a.test"]));

        let (status, _) = app.get("/api/childprompt/w1/a").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send(json_request(
                "PUT",
                "/api/childprompt/w1/updatename/a",
                json!({"newPromptName": "d"}),
            ))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
