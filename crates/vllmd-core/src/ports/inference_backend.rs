//! Inference backend capability.
//!
//! Request handlers depend on this trait rather than on a concrete client,
//! so a test double can stand in for the network.

use async_trait::async_trait;

use crate::domain::{ChatRequest, ChatResult, HealthStatus, ServerState};

/// Anything that can answer health checks and completions.
///
/// # Design Rules
///
/// - Neither method fails: transport and upstream errors are folded into
///   the returned `HealthStatus` / `ChatResult`
/// - Implementations must be usable concurrently from many handlers
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Probe the backend.
    async fn check_health(&self) -> HealthStatus;

    /// Run one completion.
    async fn complete(&self, request: ChatRequest) -> ChatResult;

    /// Lifecycle state, for backends that own a process.
    ///
    /// Backends without a lifecycle report `Disabled`.
    fn state(&self) -> ServerState {
        ServerState::Disabled
    }
}
