//! Route definitions and router construction.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the router with all routes, CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/chat/completions", post(handlers::chat::chat_completions))
        .route("/v1/chat/completions", post(handlers::chat::chat_completions))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
