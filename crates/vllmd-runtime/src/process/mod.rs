//! Child process ownership: spawning, output draining and shutdown.

pub mod handle;
pub mod logs;
pub mod shutdown;
pub mod stream;

pub use handle::{ProcessError, ProcessHandle, SignalKind, exit_state};
pub use logs::{LogDrain, MAX_LOG_LINES, ServerLogBuffer, TracingLogSink};
pub use shutdown::{ShutdownOutcome, shutdown_process};
pub use stream::spawn_stream_reader;
