//! HTTP client for the inference server's OpenAI-compatible API.
//!
//! The client is cheap to clone; all clones share one connection pool.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vllmd_core::{
    ChatRequest, ChatResult, HealthStatus, InferenceBackend, InferenceError, ServerConfig,
    TokenUsage,
};

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WireChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct WireChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireModelList {
    data: Vec<WireModel>,
}

#[derive(Debug, Deserialize)]
struct WireModel {
    id: String,
}

// =============================================================================
// Client
// =============================================================================

/// Client for one inference server.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    config: ServerConfig,
}

impl InferenceClient {
    /// Build a client from the server configuration.
    ///
    /// A wildcard bind address is probed through loopback.
    pub fn new(config: &ServerConfig) -> Self {
        let host = match config.host.as_str() {
            "0.0.0.0" | "" => "127.0.0.1",
            "::" => "::1",
            other => other,
        };
        let base_url = if host.contains(':') {
            format!("http://[{host}]:{}", config.port)
        } else {
            format!("http://{host}:{}", config.port)
        };

        Self {
            http: Client::new(),
            base_url,
            api_key: (!config.api_key.is_empty()).then(|| config.api_key.clone()),
            config: config.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Name the server is expected to serve.
    pub fn model_name(&self) -> &str {
        &self.config.model_name
    }

    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// List the model ids the server currently serves.
    pub async fn list_models(&self, timeout: Duration) -> Result<Vec<String>, InferenceError> {
        let url = format!("{}/v1/models", self.base_url);
        let response = self
            .authorize(self.http.get(&url))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_transport(&e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(upstream_error(status, response).await);
        }

        let list: WireModelList = response
            .json()
            .await
            .map_err(|e| map_body_error(&e, timeout))?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    /// Probe the model list endpoint. Never fails.
    pub async fn check_health(&self, timeout: Duration) -> HealthStatus {
        match self.list_models(timeout).await {
            Ok(models) => HealthStatus::reachable(models, &self.config.model_name),
            Err(e @ InferenceError::Upstream { .. } | e @ InferenceError::Malformed(_)) => {
                HealthStatus::degraded(e.to_string())
            }
            Err(e) => HealthStatus::unreachable(e.to_string()),
        }
    }

    /// Run one non-streaming chat completion.
    ///
    /// Unset generation parameters fall back to the configured defaults.
    pub async fn complete(
        &self,
        request: &ChatRequest,
        timeout: Duration,
    ) -> Result<ChatResult, InferenceError> {
        let request = request.clone().with_defaults(&self.config);
        let request_id = request.request_id.clone().unwrap_or_default();

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt.as_deref().filter(|s| !s.is_empty()) {
            messages.push(WireMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(WireMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = WireChatRequest {
            model: &self.config.model_name,
            messages,
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
            temperature: request.temperature.unwrap_or(self.config.temperature),
            top_p: request.top_p.unwrap_or(self.config.top_p),
            stream: false,
        };

        debug!(
            request_id = %request_id,
            model = %self.config.model_name,
            max_tokens = body.max_tokens,
            "Sending chat completion"
        );

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .authorize(self.http.post(&url))
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport(&e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let err = upstream_error(status, response).await;
            warn!(request_id = %request_id, error = %err, "Chat completion rejected");
            return Err(err);
        }

        let parsed: WireChatResponse = response
            .json()
            .await
            .map_err(|e| map_body_error(&e, timeout))?;

        let usage = parsed.usage.unwrap_or_default();
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::Malformed("response has no choices".to_string()))?;

        info!(
            request_id = %request_id,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            "Chat completion finished"
        );

        let model = if parsed.model.is_empty() {
            self.config.model_name.clone()
        } else {
            parsed.model
        };

        Ok(ChatResult::success(
            request_id,
            choice.message.content.unwrap_or_default(),
            model,
            TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            },
            choice.finish_reason,
        ))
    }
}

#[async_trait]
impl InferenceBackend for InferenceClient {
    async fn check_health(&self) -> HealthStatus {
        Self::check_health(self, self.config.probe_timeout()).await
    }

    async fn complete(&self, mut request: ChatRequest) -> ChatResult {
        let request_id = request.ensure_request_id();
        match Self::complete(self, &request, self.config.request_timeout()).await {
            Ok(result) => result,
            Err(e) => ChatResult::failed(request_id, e.to_string()),
        }
    }
}

fn map_transport(err: &reqwest::Error, timeout: Duration) -> InferenceError {
    if err.is_timeout() {
        InferenceError::Timeout { timeout }
    } else {
        InferenceError::Transport(err.to_string())
    }
}

fn map_body_error(err: &reqwest::Error, timeout: Duration) -> InferenceError {
    if err.is_timeout() {
        InferenceError::Timeout { timeout }
    } else {
        InferenceError::Malformed(err.to_string())
    }
}

async fn upstream_error(status: StatusCode, response: reqwest::Response) -> InferenceError {
    let body = response.text().await.unwrap_or_default();
    InferenceError::Upstream {
        status: status.as_u16(),
        body,
    }
}
