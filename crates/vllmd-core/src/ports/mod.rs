//! Port definitions (trait abstractions) and the error taxonomy.
//!
//! Ports define the interfaces handlers and the runtime exchange. They
//! contain no implementation details and use only domain types.

pub mod inference_backend;
pub mod server_log_sink;

use std::time::Duration;
use thiserror::Error;

use crate::domain::{ExitState, ServerState};

pub use inference_backend::InferenceBackend;
pub use server_log_sink::ServerLogSinkPort;

/// Errors reported by the server lifecycle (`start`).
///
/// `stop` never fails and health checks report problems in their result,
/// so only startup paths return these.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The process could not be created.
    #[error("Failed to spawn inference server: {0}")]
    Spawn(String),

    /// Readiness was not reached before the deadline.
    #[error("Inference server not ready within {}s", .timeout.as_secs())]
    StartupTimeout { timeout: Duration },

    /// `start` called while a process is already owned.
    #[error("Inference server already {state}")]
    AlreadyRunning { state: ServerState },

    /// The child exited before becoming ready.
    #[error("Inference server {status} during startup{}", format_tail(.recent_logs))]
    ExitedDuringStartup {
        status: ExitState,
        recent_logs: Vec<String>,
    },

    /// A stop request arrived while waiting for readiness.
    #[error("Inference server startup cancelled by stop request")]
    StartupCancelled,

    /// The process exited while the server was ready.
    #[error("Inference server process {status} unexpectedly")]
    CrashDetected { status: ExitState },
}

impl ServerError {
    /// Whether retrying `start` may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StartupTimeout { .. } | Self::ExitedDuringStartup { .. } | Self::CrashDetected { .. }
        )
    }
}

fn format_tail(lines: &[String]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!("; last output:\n{}", lines.join("\n"))
    }
}

/// Errors from a single request to the inference server.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceError {
    /// Non-2xx response.
    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The request exceeded its time budget.
    #[error("Request timed out after {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },

    /// 2xx response that could not be interpreted.
    #[error("Malformed upstream response: {0}")]
    Malformed(String),

    /// Connection-level failure (refused, reset, DNS).
    #[error("Transport error: {0}")]
    Transport(String),
}

impl InferenceError {
    /// Transient failures the caller may retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport(_) => true,
            Self::Upstream { status, .. } => *status >= 500,
            Self::Malformed(_) => false,
        }
    }
}
