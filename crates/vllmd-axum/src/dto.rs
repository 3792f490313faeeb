//! Data Transfer Objects (DTOs) for the HTTP API contract.
//!
//! Field names are camelCase on the wire; request bodies also accept the
//! snake_case spellings.

use serde::{Deserialize, Serialize};
use vllmd_core::{ChatRequest, ChatResult, HealthStatus, ServerState, TokenUsage};

/// Body of `POST /chat/completions`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatCompletionBody {
    #[serde(default)]
    pub prompt: String,
    #[serde(default, alias = "system_prompt")]
    pub system_prompt: Option<String>,
    #[serde(default, alias = "request_id")]
    pub request_id: Option<String>,
    #[serde(default, alias = "max_tokens")]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default, alias = "top_p")]
    pub top_p: Option<f32>,
}

impl From<ChatCompletionBody> for ChatRequest {
    fn from(body: ChatCompletionBody) -> Self {
        Self {
            prompt: body.prompt,
            system_prompt: body.system_prompt,
            request_id: body.request_id,
            max_tokens: body.max_tokens,
            temperature: body.temperature,
            top_p: body.top_p,
        }
    }
}

/// Token accounting.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UsageDto {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl From<TokenUsage> for UsageDto {
    fn from(usage: TokenUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

/// Response of `POST /chat/completions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatCompletionResponse {
    pub request_id: String,
    pub content: String,
    pub model: String,
    pub usage: UsageDto,
    pub finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ChatResult> for ChatCompletionResponse {
    fn from(result: ChatResult) -> Self {
        Self {
            request_id: result.request_id,
            content: result.content,
            model: result.model,
            usage: result.usage.into(),
            finish_reason: result.finish_reason,
            error: result.error,
        }
    }
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: String,
    pub backend_healthy: bool,
    pub state: ServerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<String>>,
}

impl HealthResponse {
    pub fn from_status(health: HealthStatus, state: ServerState) -> Self {
        let healthy = health.is_healthy();
        Self {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            backend_healthy: healthy,
            state,
            error: health.error,
            models: health.models,
        }
    }
}
