//! Process runtime for vllmd.
//!
//! This crate provides the concrete implementations behind the ports in
//! `vllmd-core`:
//!
//! - [`process`] - child process handle, log draining and shutdown
//! - [`readiness`] - polling a starting server until it serves its model
//! - [`client`] - OpenAI-compatible HTTP client for the server
//! - [`manager`] - the `ServerManager` lifecycle state machine

pub mod client;
pub mod command;
pub mod manager;
pub mod process;
pub mod readiness;

pub use client::InferenceClient;
pub use command::LaunchSpec;
pub use manager::{STARTUP_LOG_TAIL, ServerManager};
pub use process::{
    LogDrain, ProcessError, ProcessHandle, ServerLogBuffer, ShutdownOutcome, SignalKind,
    TracingLogSink,
};
pub use readiness::ReadinessProber;
