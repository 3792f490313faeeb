//! Server log sink port for child process output.
//!
//! This port abstracts the destination for server logs (stdout/stderr),
//! so the runtime can forward to `tracing`, buffer recent lines, or
//! collect them in tests.

/// Port for appending server log lines to a sink.
///
/// Implementations must be thread-safe and must not block: they are
/// called from the drain tasks that keep the child's pipes empty.
pub trait ServerLogSinkPort: Send + Sync {
    /// Append a log line from the server process.
    ///
    /// # Arguments
    ///
    /// * `stream_type` - Either "stdout" or "stderr"
    /// * `line` - The log line content (without trailing newline)
    fn append(&self, stream_type: &str, line: String);
}
