//! Integration tests for the HTTP routes.
//!
//! The backend is a `mockall` mock of `InferenceBackend`, so these tests
//! cover request parsing, status codes and response shapes only.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use mockall::mock;
use mockall::predicate::function;
use serde_json::{Value, json};
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use vllmd_axum::{AppState, create_router, serve};
use vllmd_core::{ChatRequest, ChatResult, HealthStatus, InferenceBackend, ServerState, TokenUsage};

mock! {
    pub Backend {}

    #[async_trait]
    impl InferenceBackend for Backend {
        async fn check_health(&self) -> HealthStatus;
        async fn complete(&self, request: ChatRequest) -> ChatResult;
        fn state(&self) -> ServerState;
    }
}

fn app(backend: MockBackend) -> Router {
    create_router(AppState::new(Arc::new(backend)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn echo_result(request: &ChatRequest) -> ChatResult {
    ChatResult::success(
        request.request_id.clone().unwrap_or_default(),
        format!("echo: {}", request.prompt),
        "test-model",
        TokenUsage {
            prompt_tokens: 3,
            completion_tokens: 2,
            total_tokens: 5,
        },
        Some("stop".to_string()),
    )
}

#[tokio::test]
async fn health_reports_healthy_backend() {
    let mut backend = MockBackend::new();
    backend
        .expect_check_health()
        .returning(|| HealthStatus::reachable(vec!["test-model".into()], "test-model"));
    backend.expect_state().return_const(ServerState::Ready);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, json) = send(app(backend), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["backendHealthy"], true);
    assert_eq!(json["state"], "ready");
}

#[tokio::test]
async fn health_reports_degraded_backend_with_200() {
    let mut backend = MockBackend::new();
    backend
        .expect_check_health()
        .returning(|| HealthStatus::unreachable("inference server not ready (state: starting)"));
    backend.expect_state().return_const(ServerState::Starting);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, json) = send(app(backend), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["backendHealthy"], false);
    assert_eq!(json["state"], "starting");
    assert!(json["error"].as_str().unwrap().contains("not ready"));
}

#[tokio::test]
async fn chat_completion_camel_case_body() {
    let mut backend = MockBackend::new();
    backend
        .expect_complete()
        .with(function(|r: &ChatRequest| {
            r.prompt == "hello"
                && r.system_prompt.as_deref() == Some("be brief")
                && r.max_tokens == Some(32)
                && r.request_id.as_deref() == Some("req-1")
        }))
        .times(1)
        .returning(|r| echo_result(&r));

    let body = json!({
        "prompt": "hello",
        "systemPrompt": "be brief",
        "requestId": "req-1",
        "maxTokens": 32
    });
    let (status, json) = send(app(backend), post_json("/chat/completions", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["requestId"], "req-1");
    assert_eq!(json["content"], "echo: hello");
    assert_eq!(json["usage"]["totalTokens"], 5);
    assert_eq!(json["finishReason"], "stop");
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn v1_path_accepts_snake_case_body() {
    let mut backend = MockBackend::new();
    backend
        .expect_complete()
        .with(function(|r: &ChatRequest| {
            r.system_prompt.as_deref() == Some("s") && r.top_p == Some(0.5)
        }))
        .times(1)
        .returning(|r| echo_result(&r));

    let body = json!({"prompt": "hi", "system_prompt": "s", "top_p": 0.5});
    let (status, json) = send(app(backend), post_json("/v1/chat/completions", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["content"], "echo: hi");
    // Generated when the caller does not supply one
    assert!(!json["requestId"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn empty_prompt_is_bad_request() {
    let mut backend = MockBackend::new();
    backend.expect_complete().times(0);

    let (status, json) = send(
        app(backend),
        post_json("/chat/completions", &json!({"prompt": "   "})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
    assert_eq!(json["error"], "prompt is required");
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let mut backend = MockBackend::new();
    backend.expect_complete().times(0);

    let request = Request::builder()
        .method("POST")
        .uri("/chat/completions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send(app(backend), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn backend_failure_is_200_with_error() {
    let mut backend = MockBackend::new();
    backend
        .expect_complete()
        .returning(|r| {
            ChatResult::failed(
                r.request_id.unwrap_or_default(),
                "Upstream returned 503: server overloaded",
            )
        });

    let (status, json) = send(
        app(backend),
        post_json("/chat/completions", &json!({"prompt": "hi", "requestId": "r-9"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["requestId"], "r-9");
    assert_eq!(json["content"], "");
    assert_eq!(json["finishReason"], "error");
    assert!(json["error"].as_str().unwrap().contains("503"));
}

#[tokio::test]
async fn serve_stops_on_cancel() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let cancel = CancellationToken::new();
    let server = tokio::spawn(serve(
        listener,
        AppState::new(Arc::new(MockBackend::new())),
        cancel.clone(),
    ));

    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server shuts down")
        .unwrap();
    assert_ok!(result);
}
