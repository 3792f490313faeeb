//! Chat completion handler.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use tracing::{debug, warn};
use vllmd_core::ChatRequest;

use crate::dto::{ChatCompletionBody, ChatCompletionResponse};
use crate::error::HttpError;
use crate::state::AppState;

/// Run one chat completion.
///
/// Backend failures come back as 200 with `error` set; only an invalid
/// body is rejected.
pub async fn chat_completions(
    State(state): State<AppState>,
    body: Result<Json<ChatCompletionBody>, JsonRejection>,
) -> Result<Json<ChatCompletionResponse>, HttpError> {
    let Json(body) = body?;
    if body.prompt.trim().is_empty() {
        return Err(HttpError::BadRequest("prompt is required".to_string()));
    }

    let mut request = ChatRequest::from(body);
    let request_id = request.ensure_request_id();
    debug!(request_id = %request_id, "POST /chat/completions");

    let result = state.backend.complete(request).await;
    if let Some(error) = &result.error {
        warn!(request_id = %request_id, error = %error, "Chat completion failed");
    }

    Ok(Json(result.into()))
}
