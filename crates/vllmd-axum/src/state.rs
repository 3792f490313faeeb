//! Shared application state type.

use std::sync::Arc;

use vllmd_core::InferenceBackend;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn InferenceBackend>,
}

impl AppState {
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self { backend }
    }
}
