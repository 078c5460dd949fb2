use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, header};
use hyper_util::rt::{TokioExecutor, TokioIo};
use serde_json::{Value as JsonValue, json};
use std::convert::Infallible;
use std::time::Duration;
use tokio::net::TcpListener;

pub const TEST_GENERATIVE_KEY: &str = "test-key";
pub const TEST_BACKEND_KEY: &str = "backend-1";
pub const DELAY_MS: u64 = 300;

// Routes:
//   /json            {"ok":true}
//   /echo            the request body, verbatim
//   /text            a plain-text body
//   /error           a JSON body with status 500
//   /slow            answers after five seconds
//   /delay           answers after DELAY_MS
//   /generate        generative AI stub, echoes the prompt when the key matches
//   /api/websites    catalog stub, requires the backend bearer key
async fn handle(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();
    let query = req.uri().query().unwrap_or_default().to_string();
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = req
        .into_body()
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_default();

    let (status, payload) = match path.as_str() {
        "/json" => (StatusCode::OK, Bytes::from_static(br#"{"ok":true}"#)),
        "/echo" => (StatusCode::OK, body),
        "/text" => (StatusCode::OK, Bytes::from_static(b"plain answer")),
        "/error" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Bytes::from_static(br#"{"error":"boom"}"#),
        ),
        "/slow" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            (StatusCode::OK, Bytes::from_static(b"late"))
        }
        "/delay" => {
            tokio::time::sleep(Duration::from_millis(DELAY_MS)).await;
            (StatusCode::OK, Bytes::from_static(b"done"))
        }
        "/generate" => (StatusCode::OK, generate_reply(&query, &body)),
        "/api/websites" => catalog_reply(authorization.as_deref()),
        _ => (StatusCode::NOT_FOUND, Bytes::from_static(b"not found")),
    };

    let mut response = Response::new(Full::new(payload));
    *response.status_mut() = status;
    Ok(response)
}

fn generate_reply(query: &str, body: &[u8]) -> Bytes {
    let request: JsonValue = serde_json::from_slice(body).unwrap_or_default();
    let prompt = request["contents"][0]["parts"][0]["text"].clone();

    let reply = if query == format!("key={TEST_GENERATIVE_KEY}") {
        json!({"candidates": [{"content": {"parts": [{"text": prompt}]}}]})
    } else {
        json!({"candidates": []})
    };
    Bytes::from(reply.to_string())
}

fn catalog_reply(authorization: Option<&str>) -> (StatusCode, Bytes) {
    match authorization {
        Some(value) if value == format!("Bearer {TEST_BACKEND_KEY}") => {
            let reply = json!({
                "items": [
                    {"id": "remote-1", "websiteName": "Remote One", "apiKey": "remote-key-1"},
                    {"id": "remote-2", "websiteName": "Remote Two"},
                ]
            });
            (StatusCode::OK, Bytes::from(reply.to_string()))
        }
        Some("Bearer empty") => (StatusCode::OK, Bytes::from_static(br#"{"items":[]}"#)),
        _ => (
            StatusCode::UNAUTHORIZED,
            Bytes::from_static(br#"{"error":"unauthorized"}"#),
        ),
    }
}

/// Starts the stub upstream and returns its base URL.
pub async fn start_test_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to address");

    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let io = TokioIo::new(stream);

            tokio::spawn(async move {
                if let Err(err) = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                    .serve_connection(io, service_fn(handle))
                    .await
                {
                    eprintln!("Error serving connection: {:?}", err);
                }
            });
        }
    });

    format!("http://127.0.0.1:{port}")
}

/// A URL nothing listens on, so connecting is refused.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/json")
}
