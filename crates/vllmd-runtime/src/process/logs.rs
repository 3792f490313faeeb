//! Server log draining and sinks.
//!
//! `LogDrain` owns the reader tasks for one child process. The sinks here
//! forward lines to `tracing` and keep a bounded tail for diagnostics.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::process::{ChildStderr, ChildStdout};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use vllmd_core::ServerLogSinkPort;

use super::stream::spawn_stream_reader;

/// Maximum number of log lines kept in the ring buffer.
pub const MAX_LOG_LINES: usize = 500;

/// Forwards server output to `tracing` under the `vllm` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl ServerLogSinkPort for TracingLogSink {
    fn append(&self, stream_type: &str, line: String) {
        if line.is_empty() {
            return;
        }
        info!(target: "vllm", stream = %stream_type, "{}", line);
    }
}

/// Ring buffer of recent server output that also forwards to `tracing`.
#[derive(Debug)]
pub struct ServerLogBuffer {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl ServerLogBuffer {
    /// Create a buffer holding up to `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(MAX_LOG_LINES))),
            capacity: capacity.max(1),
        }
    }

    /// The last `n` lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = lines.len().saturating_sub(n);
        lines.iter().skip(skip).cloned().collect()
    }

    /// Number of buffered lines.
    pub fn len(&self) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all buffered lines (called when a new process starts).
    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for ServerLogBuffer {
    fn default() -> Self {
        Self::new(MAX_LOG_LINES)
    }
}

impl ServerLogSinkPort for ServerLogBuffer {
    fn append(&self, stream_type: &str, line: String) {
        TracingLogSink.append(stream_type, line.clone());

        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }
}

/// Reader tasks draining one child's stdout and stderr.
///
/// The tasks end on their own when the pipes close (the process exited).
pub struct LogDrain {
    pid: u32,
    tasks: Vec<JoinHandle<()>>,
}

impl LogDrain {
    /// Start one drain task per available stream of process `pid`.
    pub fn attach(
        pid: u32,
        stdout: Option<ChildStdout>,
        stderr: Option<ChildStderr>,
        sink: Arc<dyn ServerLogSinkPort>,
    ) -> Self {
        let mut tasks = Vec::with_capacity(2);
        if let Some(stdout) = stdout {
            tasks.push(spawn_stream_reader(stdout, "stdout", pid, sink.clone()));
        }
        if let Some(stderr) = stderr {
            tasks.push(spawn_stream_reader(stderr, "stderr", pid, sink));
        }
        Self { pid, tasks }
    }

    /// Wait up to `timeout` for the readers to finish, then abort the rest.
    ///
    /// A grandchild that inherited the pipes can keep them open after the
    /// server exits; the bound keeps `stop` from hanging on it.
    pub async fn finish(self, timeout: Duration) {
        let deadline = tokio::time::Instant::now() + timeout;
        let pid = self.pid;
        for mut task in self.tasks {
            if tokio::time::timeout_at(deadline, &mut task).await.is_err() {
                debug!(pid, "Log drain did not reach EOF in time, aborting");
                task.abort();
            }
        }
    }
}
