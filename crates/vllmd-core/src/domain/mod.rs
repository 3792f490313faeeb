//! Domain value types.
//!
//! Pure data: no I/O, no process handles.

mod chat;
mod server;

pub use chat::{ChatRequest, ChatResult, FINISH_REASON_ERROR, TokenUsage};
pub use server::{ExitState, HealthStatus, ProcessInfo, ReadinessState, ServerState};
