//! Readiness polling for a starting inference server.
//!
//! A server counts as ready once `/v1/models` answers with the served model
//! name. Loading weights can take minutes, so connection refusals and
//! timeouts while waiting are expected and mean "not yet".

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use vllmd_core::ReadinessState;

use crate::client::InferenceClient;

/// How often a progress line is logged while waiting.
pub const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// Polls one server until it serves the expected model.
#[derive(Debug, Clone)]
pub struct ReadinessProber {
    client: InferenceClient,
}

impl ReadinessProber {
    pub const fn new(client: InferenceClient) -> Self {
        Self { client }
    }

    /// One bounded readiness probe.
    pub async fn probe(&self, timeout: Duration) -> bool {
        match self.client.list_models(timeout).await {
            Ok(models) => {
                let ready = models.iter().any(|m| m == self.client.model_name());
                if !ready {
                    debug!(
                        expected = %self.client.model_name(),
                        available = ?models,
                        "Server up but model not listed yet"
                    );
                }
                ready
            }
            Err(e) => {
                debug!(error = %e, "Readiness probe failed");
                false
            }
        }
    }

    /// Poll until ready, the deadline elapses, or `cancel` fires.
    ///
    /// Each probe is capped by the time remaining, so `Failed` is returned
    /// no later than `deadline + poll_interval`.
    pub async fn wait_until_ready(
        &self,
        poll_interval: Duration,
        deadline: Duration,
        probe_timeout: Duration,
        cancel: &CancellationToken,
    ) -> ReadinessState {
        let started = Instant::now();
        let end = started + deadline;
        let mut next_progress = started + PROGRESS_LOG_INTERVAL;

        info!(
            url = %self.client.base_url(),
            model = %self.client.model_name(),
            timeout_secs = deadline.as_secs(),
            "Waiting for inference server to become ready"
        );

        loop {
            if cancel.is_cancelled() {
                return ReadinessState::Stopped;
            }

            let now = Instant::now();
            if now >= end {
                return ReadinessState::Failed;
            }

            let budget = probe_timeout.min(end - now);
            let ready = tokio::select! {
                () = cancel.cancelled() => return ReadinessState::Stopped,
                ready = self.probe(budget) => ready,
            };
            if ready {
                info!(
                    elapsed_secs = started.elapsed().as_secs(),
                    "Inference server is ready"
                );
                return ReadinessState::Ready;
            }

            let now = Instant::now();
            if now >= next_progress {
                info!(
                    elapsed_secs = (now - started).as_secs(),
                    timeout_secs = deadline.as_secs(),
                    "Still waiting for inference server"
                );
                next_progress = now + PROGRESS_LOG_INTERVAL;
            }

            if now >= end {
                return ReadinessState::Failed;
            }

            tokio::select! {
                () = cancel.cancelled() => return ReadinessState::Stopped,
                () = tokio::time::sleep(poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, routing::get};
    use serde_json::json;
    use vllmd_core::ServerConfig;

    async fn serve(router: Router) -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        port
    }

    fn models_router(ids: &'static [&'static str]) -> Router {
        Router::new().route(
            "/v1/models",
            get(move || async move {
                let data: Vec<_> = ids.iter().map(|id| json!({"id": id})).collect();
                Json(json!({"object": "list", "data": data}))
            }),
        )
    }

    fn prober(port: u16, model: &str) -> ReadinessProber {
        ReadinessProber::new(InferenceClient::new(&ServerConfig::external(
            "127.0.0.1",
            port,
            model,
        )))
    }

    fn unused_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn probe_requires_served_model() {
        let port = serve(models_router(&["qwen"])).await;
        assert!(prober(port, "qwen").probe(Duration::from_secs(2)).await);
        assert!(!prober(port, "llama").probe(Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn probe_rejects_unparsable_body() {
        let router = Router::new().route("/v1/models", get(|| async { "not json" }));
        let port = serve(router).await;
        assert!(!prober(port, "qwen").probe(Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn wait_returns_ready_for_live_server() {
        let port = serve(models_router(&["qwen"])).await;
        let state = prober(port, "qwen")
            .wait_until_ready(
                Duration::from_millis(100),
                Duration::from_secs(5),
                Duration::from_secs(1),
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(state, ReadinessState::Ready);
    }

    #[tokio::test]
    async fn wait_fails_within_deadline_plus_poll() {
        let port = unused_port();
        let poll = Duration::from_millis(200);
        let deadline = Duration::from_secs(1);

        let started = std::time::Instant::now();
        let state = prober(port, "qwen")
            .wait_until_ready(poll, deadline, Duration::from_secs(5), &CancellationToken::new())
            .await;

        assert_eq!(state, ReadinessState::Failed);
        assert!(started.elapsed() >= deadline);
        assert!(started.elapsed() < deadline + poll + Duration::from_millis(500));
    }

    #[tokio::test]
    async fn wait_stops_when_cancelled() {
        let port = unused_port();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let state = prober(port, "qwen")
            .wait_until_ready(
                Duration::from_secs(1),
                Duration::from_secs(30),
                Duration::from_secs(1),
                &cancel,
            )
            .await;

        assert_eq!(state, ReadinessState::Stopped);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
