//! Chat completion request and result types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ServerConfig;

/// Finish reason recorded on a failed result.
pub const FINISH_REASON_ERROR: &str = "error";

/// A single-turn chat completion request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// User prompt.
    pub prompt: String,
    /// System prompt; the configured default applies when absent.
    pub system_prompt: Option<String>,
    /// Caller-supplied correlation id; generated when absent.
    pub request_id: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

impl ChatRequest {
    /// Create a request with only a prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Return the request id, generating a UUID v4 if none was supplied.
    pub fn ensure_request_id(&mut self) -> String {
        self.request_id
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone()
    }

    /// Fill every unset generation parameter from the config defaults.
    #[must_use]
    pub fn with_defaults(mut self, config: &ServerConfig) -> Self {
        self.ensure_request_id();
        self.max_tokens.get_or_insert(config.max_tokens);
        self.temperature.get_or_insert(config.temperature);
        self.top_p.get_or_insert(config.top_p);
        if self.system_prompt.is_none() {
            self.system_prompt.clone_from(&config.default_system_prompt);
        }
        self
    }
}

/// Token accounting reported by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Outcome of a completion.
///
/// Exactly one of `content` (success) or `error` (failure) is meaningful.
/// Use [`ChatResult::failed`] to build a failure so that the invariant
/// holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResult {
    pub request_id: String,
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
    pub error: Option<String>,
}

impl ChatResult {
    /// Successful result.
    pub fn success(
        request_id: impl Into<String>,
        content: impl Into<String>,
        model: impl Into<String>,
        usage: TokenUsage,
        finish_reason: Option<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            content: content.into(),
            model: model.into(),
            usage,
            finish_reason,
            error: None,
        }
    }

    /// Failed result: empty content, finish reason `error`.
    pub fn failed(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            content: String::new(),
            model: String::new(),
            usage: TokenUsage::default(),
            finish_reason: Some(FINISH_REASON_ERROR.to_string()),
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_request_id_generates_once() {
        let mut request = ChatRequest::new("hello");
        let first = request.ensure_request_id();
        let second = request.ensure_request_id();
        assert_eq!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn test_ensure_request_id_keeps_caller_id() {
        let mut request = ChatRequest::new("hello").with_request_id("req-1");
        assert_eq!(request.ensure_request_id(), "req-1");
    }

    #[test]
    fn test_with_defaults_only_fills_missing() {
        let config = ServerConfig {
            default_system_prompt: Some("be brief".to_string()),
            ..ServerConfig::default()
        };
        let request = ChatRequest::new("hi").with_max_tokens(16).with_defaults(&config);

        assert_eq!(request.max_tokens, Some(16));
        assert_eq!(request.temperature, Some(config.temperature));
        assert_eq!(request.top_p, Some(config.top_p));
        assert_eq!(request.system_prompt.as_deref(), Some("be brief"));
        assert!(request.request_id.is_some());
    }

    #[test]
    fn test_explicit_system_prompt_wins() {
        let config = ServerConfig {
            default_system_prompt: Some("default".to_string()),
            ..ServerConfig::default()
        };
        let request = ChatRequest::new("hi")
            .with_system_prompt("custom")
            .with_defaults(&config);
        assert_eq!(request.system_prompt.as_deref(), Some("custom"));
    }

    #[test]
    fn test_failed_result_invariant() {
        let result = ChatResult::failed("r", "upstream returned 503");
        assert!(result.is_error());
        assert!(result.content.is_empty());
        assert_eq!(result.finish_reason.as_deref(), Some(FINISH_REASON_ERROR));
    }

    #[test]
    fn test_success_result_has_no_error() {
        let usage = TokenUsage {
            prompt_tokens: 3,
            completion_tokens: 5,
            total_tokens: 8,
        };
        let result = ChatResult::success("r", "hi there", "m", usage, Some("stop".into()));
        assert!(!result.is_error());
        assert_eq!(result.usage.total_tokens, 8);
    }
}
