//! HTTP request handlers.
//!
//! Handlers are thin wrappers that delegate to the `InferenceBackend`.

pub mod chat;
pub mod health;
