use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use sse_relay::config::{AppConfig, ServerConfig};
use sse_relay::routing::dispatch::dispatch_request;
use sse_relay::state::AppState;
use sse_relay::transport::HttpTransport;

fn build_state(index_path: &str) -> Arc<AppState> {
    let mut config = AppConfig::default();
    config.server = ServerConfig {
        index_path: index_path.to_string(),
        ..ServerConfig::default()
    };
    config.upstream.api_key = "unused".to_string();
    let transport = HttpTransport::new(&config.server);
    Arc::new(AppState::new(config, transport))
}

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

#[tokio::test]
async fn test_index_served_as_html() {
    let state = build_state("index.html");
    let response = dispatch_request(state, request(Method::GET, "/"))
        .await
        .expect("dispatch");

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"]
        .to_str()
        .expect("content-type")
        .to_string();
    assert!(content_type.starts_with("text/html"), "{content_type}");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("EventSource"));
    assert!(text.contains("/sse"));
}

#[tokio::test]
async fn test_missing_index_is_not_found() {
    let state = build_state("/nonexistent/index.html");
    let response = dispatch_request(state, request(Method::GET, "/"))
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_index_rejects_other_methods() {
    let state = build_state("index.html");
    let response = dispatch_request(state, request(Method::POST, "/"))
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let state = build_state("index.html");
    for uri in ["/favicon.ico", "/sse/extra", "/index.html"] {
        let response = dispatch_request(Arc::clone(&state), request(Method::GET, uri))
            .await
            .expect("dispatch");
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}
