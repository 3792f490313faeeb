//! Core domain types, configuration and port definitions for vllmd.
//!
//! This crate has no process, filesystem-watching or HTTP concerns. It
//! defines what the runtime and adapter crates exchange:
//!
//! - [`config`] - `ServerConfig` and the application config file
//! - [`domain`] - chat and server lifecycle value types
//! - [`ports`] - the `InferenceBackend` capability, the log sink port and
//!   the error taxonomy

pub mod config;
pub mod domain;
pub mod ports;

pub use config::{
    AppConfig, ConfigError, DEFAULT_SYSTEM_PROMPT, LogConfig, LogFormat, LogRedirect, LogRotation,
    ServerConfig, WebConfig,
};
pub use domain::{
    ChatRequest, ChatResult, ExitState, FINISH_REASON_ERROR, HealthStatus, ProcessInfo,
    ReadinessState, ServerState, TokenUsage,
};
pub use ports::{InferenceBackend, InferenceError, ServerError, ServerLogSinkPort};
