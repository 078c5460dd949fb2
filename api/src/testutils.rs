use crate::build_router;
use crate::config::Config;
use crate::state::AppState;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use store::models::{PromptSetInput, Website, WebsiteInput};
use store::{MemoryStore, Store};
use tokio::net::TcpListener;
use tower::ServiceExt;
use upstream::{CatalogClient, Dispatcher, DispatchConfig, SyncConfig};

pub fn json_request(method: &str, uri: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Router over an in-memory store, with no generative AI client.
pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Store::new(Arc::new(MemoryStore::new()));
        let state = AppState {
            prompt_sets: Arc::new(store.prompt_sets.clone()),
            store,
            dispatcher: Dispatcher::new(DispatchConfig {
                timeout_secs: 2,
                ..Default::default()
            }),
            generative: None,
            catalog: CatalogClient::new(&SyncConfig { timeout_secs: 2 }),
        };
        Self::with_state(state)
    }

    pub fn with_config(config: &Config) -> Self {
        let store = Store::new(Arc::new(MemoryStore::new()));
        Self::with_state(AppState::new(store, config))
    }

    pub fn with_state(state: AppState) -> Self {
        TestApp {
            router: build_router(state.clone()),
            state,
        }
    }

    /// Sends `request` and returns the status and the body parsed as JSON.
    /// Non-JSON bodies come back as a JSON string.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, JsonValue) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, JsonValue) {
        self.send(empty_request("GET", uri)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, JsonValue) {
        self.send(empty_request("DELETE", uri)).await
    }

    pub async fn save_prompt_set(&self, website_id: &str, prompt_name: &str, body: JsonValue) {
        let input: PromptSetInput = serde_json::from_value(body).unwrap();
        self.state
            .store
            .prompt_sets
            .save(website_id, prompt_name, input)
            .await
            .unwrap();
    }

    pub async fn save_website(&self, body: JsonValue) -> Website {
        let input: WebsiteInput = serde_json::from_value(body).unwrap();
        self.state.store.websites.save(input).await.unwrap()
    }
}

/// Serves `router` on an ephemeral port and returns its base URL.
pub async fn spawn_upstream(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://127.0.0.1:{port}")
}
