pub mod auth;
pub mod config;
pub mod errors;
pub mod metrics_defs;
pub mod payload;
pub mod routes;
pub mod state;

#[cfg(test)]
mod testutils;

use axum::Router;
use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use metrics_defs::REQUEST_DURATION;
use shared::histogram;
use shared::http::{ServeError, run_http_service};
use state::AppState;
use std::time::Instant;
use store::Store;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(thiserror::Error, Debug)]
pub enum ApiServiceError {
    #[error("invalid config: {0}")]
    Config(#[from] config::ValidationError),
    #[error(transparent)]
    Serve(#[from] ServeError),
}

/// Every public route, with tracing, CORS and request timing applied.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::admin::router())
        .merge(routes::execute::router())
        .merge(routes::prompt_sets::router())
        .merge(routes::websites::router())
        .merge(routes::chat_requests::router(state.clone()))
        .merge(routes::ai::router())
        .layer(middleware::from_fn(track_request_duration))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn track_request_duration(request: Request, next: Next) -> Response {
    let handler = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let start = Instant::now();
    let response = next.run(request).await;

    histogram!(
        REQUEST_DURATION,
        "status" => response.status().as_u16().to_string(),
        "handler" => handler
    )
    .record(start.elapsed().as_secs_f64());

    response
}

pub async fn run(config: config::Config, store: Store) -> Result<(), ApiServiceError> {
    config.validate()?;

    let state = AppState::new(store, &config);
    let router = build_router(state);
    run_http_service(&config.listener.host, config.listener.port, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::testutils::{TestApp, json_request, spawn_upstream};
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;
    use serde_json::json;

    async fn echo(body: String) -> String {
        body
    }

    async fn ok() -> axum::Json<serde_json::Value> {
        axum::Json(json!({"ok": true}))
    }

    async fn upstream() -> String {
        spawn_upstream(
            Router::new()
                .route("/echo", post(echo))
                .route("/json", post(ok)),
        )
        .await
    }

    #[tokio::test]
    async fn test_execute_skips_blank_urls() {
        let base = upstream().await;
        let app = TestApp::new();
        app.save_prompt_set(
            "w1",
            "p1",
            json!({
                "urls": [format!("{base}/echo"), "", format!("{base}/echo")],
                "apiKeys": ["k1"],
            }),
        )
        .await;

        let (status, body) = app
            .send(json_request(
                "POST",
                "/execute-urls",
                json!({"websiteId": "w1", "promptName": "p1", "q": "hi"}),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "results": [
                    {"index": 0, "data": "q=hi&key=k1"},
                    {"index": 2, "data": "q=hi&key=k1"},
                ],
            })
        );
    }

    #[tokio::test]
    async fn test_execute_treats_null_url_as_blank() {
        let base = upstream().await;
        let app = TestApp::new();
        let (status, _) = app
            .send(json_request(
                "POST",
                "/api/childprompt/save",
                json!({
                    "websiteId": "w1",
                    "promptName": "p1",
                    "urls": [format!("{base}/echo"), null, format!("{base}/echo")],
                    "apiKeys": ["k1", null, "k3"],
                }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app
            .send(json_request(
                "POST",
                "/execute-urls",
                json!({"websiteId": "w1", "promptName": "p1", "q": "hi"}),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["results"],
            json!([
                {"index": 0, "data": "q=hi&key=k1"},
                {"index": 2, "data": "q=hi&key=k3"},
            ])
        );
    }

    #[tokio::test]
    async fn test_execute_reports_failed_endpoint() {
        let base = upstream().await;
        let refused = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let port = listener.local_addr().unwrap().port();
            drop(listener);
            format!("http://127.0.0.1:{port}/json")
        };

        let app = TestApp::new();
        app.save_prompt_set(
            "w1",
            "p1",
            json!({"urls": [refused, format!("{base}/json")], "apiKeys": ["k1", "k2"]}),
        )
        .await;

        let (status, body) = app
            .send(json_request(
                "POST",
                "/execute-urls",
                json!({"websiteId": "w1", "promptName": "p1"}),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["index"], 0);
        assert_eq!(results[0]["success"], false);
        assert!(results[0]["error"].is_string());
        assert_eq!(results[1], json!({"index": 1, "data": {"ok": true}}));
    }

    #[tokio::test]
    async fn test_execute_validation() {
        let app = TestApp::new();

        let (status, body) = app
            .send(json_request("POST", "/execute-urls", json!({"promptName": "p1"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"success": false, "error": "websiteId is required"}));

        let (status, body) = app
            .send(json_request("POST", "/execute-urls", json!({"websiteId": "w1"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "promptName is required");

        let (status, body) = app
            .send(json_request(
                "POST",
                "/execute-urls",
                json!({"websiteId": "w1", "promptName": "missing"}),
            ))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Prompt not found");
    }

    #[tokio::test]
    async fn test_execute_accepts_form_bodies() {
        let base = upstream().await;
        let app = TestApp::new();
        app.save_prompt_set(
            "w1",
            "p1",
            json!({"urls": [format!("{base}/echo")], "apiKeys": ["k1"], "requiredParams": ["q"]}),
        )
        .await;

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/execute-urls")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(axum::body::Body::from("websiteId=w1&promptName=p1&q=hi&extra=x"))
            .unwrap();
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"], json!([{"index": 0, "data": "q=hi&key=k1"}]));
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let app = TestApp::new();
        assert_eq!(app.get("/health").await, (StatusCode::OK, json!("ok")));
        assert_eq!(app.get("/ready").await, (StatusCode::OK, json!("ok")));
    }
}
