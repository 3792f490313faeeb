//! Axum HTTP surface for vllmd.
//!
//! Handlers depend only on the `InferenceBackend` port from `vllmd-core`;
//! the composition root decides whether that is a self-managed
//! `ServerManager` or a plain client for an external server.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use error::HttpError;
pub use routes::create_router;
pub use server::serve;
pub use state::AppState;
