//! Shared helpers for vllmd-runtime integration tests.
//!
//! The fake upstream is a small axum app speaking the two OpenAI endpoints
//! the runtime uses. Fake children are plain `sh` commands.

// Each test binary uses a different subset of these helpers
#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use vllmd_core::ServerConfig;
use vllmd_runtime::LaunchSpec;

pub const TEST_MODEL: &str = "test-model";

/// Behaviour of a fake inference server.
#[derive(Debug, Clone)]
pub struct FakeUpstream {
    /// `/v1/models` answers 503 until this much time has passed.
    pub ready_after: Duration,
    /// Status returned by `/v1/chat/completions`.
    pub chat_status: StatusCode,
    /// Delay before answering a chat completion.
    pub chat_delay: Duration,
}

impl Default for FakeUpstream {
    fn default() -> Self {
        Self {
            ready_after: Duration::ZERO,
            chat_status: StatusCode::OK,
            chat_delay: Duration::ZERO,
        }
    }
}

struct FakeState {
    created: Instant,
    behaviour: FakeUpstream,
}

async fn list_models(State(state): State<Arc<FakeState>>) -> Response {
    if state.created.elapsed() < state.behaviour.ready_after {
        return (StatusCode::SERVICE_UNAVAILABLE, "loading").into_response();
    }
    Json(json!({"object": "list", "data": [{"id": TEST_MODEL, "object": "model"}]}))
        .into_response()
}

async fn chat_completions(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    tokio::time::sleep(state.behaviour.chat_delay).await;
    if state.behaviour.chat_status != StatusCode::OK {
        return (state.behaviour.chat_status, "server overloaded").into_response();
    }

    let prompt = body["messages"]
        .as_array()
        .and_then(|m| m.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string();
    let content = match body["messages"][0]["role"].as_str() {
        Some("system") => format!(
            "[{}] echo: {prompt}",
            body["messages"][0]["content"].as_str().unwrap_or_default()
        ),
        _ => format!("echo: {prompt}"),
    };

    Json(json!({
        "id": "cmpl-1",
        "object": "chat.completion",
        "model": body["model"],
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 4, "completion_tokens": 2, "total_tokens": 6}
    }))
    .into_response()
}

/// Start a fake upstream and return its port.
pub async fn spawn_upstream(behaviour: FakeUpstream) -> u16 {
    let state = Arc::new(FakeState {
        created: Instant::now(),
        behaviour,
    });
    let router = Router::new()
        .route("/v1/models", get(list_models))
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    port
}

/// A port with nothing listening on it.
pub fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Self-managed config with short timings.
pub fn test_config(port: u16) -> ServerConfig {
    ServerConfig {
        startup_timeout_secs: 10,
        poll_interval_ms: 100,
        probe_timeout_ms: 500,
        grace_period_secs: 2,
        kill_wait_secs: 2,
        ..ServerConfig::self_managed(TEST_MODEL, port)
    }
}

/// A child that runs until signalled.
pub fn sleeper() -> LaunchSpec {
    LaunchSpec::new("sleep").arg("60")
}

/// A `sh -c` child.
pub fn sh(script: &str) -> LaunchSpec {
    LaunchSpec::new("sh").arg("-c").arg(script)
}
