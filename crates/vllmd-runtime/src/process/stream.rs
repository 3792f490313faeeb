//! Async stream log readers (non-UTF8-safe).
//!
//! vLLM and the CUDA tooling under it can emit non-UTF8 bytes on
//! stdout/stderr. Using `BufReader::lines()` would terminate the reader
//! task on invalid UTF-8, after which nobody drains the pipe and the child
//! eventually blocks on a full pipe buffer. This module reads bytes up to
//! each newline and decodes lossily so draining never stops early.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;
use vllmd_core::ServerLogSinkPort;

/// Strip one trailing `\n` or `\r\n`.
fn trim_line_ending(buf: &mut Vec<u8>) {
    if buf.ends_with(b"\r\n") {
        buf.truncate(buf.len() - 2);
    } else if buf.ends_with(b"\n") {
        buf.truncate(buf.len() - 1);
    }
}

/// Spawn a task that forwards every line of `stream` to `sink` until EOF.
///
/// `pid` only labels the reader's own diagnostics.
pub fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    stream_type: &'static str,
    pid: u32,
    sink: Arc<dyn ServerLogSinkPort>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::with_capacity(1024);
        let mut forwarded: u64 = 0;

        let reason = loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break "eof".to_string(),
                Ok(_) => {
                    trim_line_ending(&mut buf);
                    sink.append(stream_type, String::from_utf8_lossy(&buf).into_owned());
                    forwarded += 1;
                }
                Err(e) => break e.to_string(),
            }
        };

        debug!(pid, stream = stream_type, lines = forwarded, %reason, "Log reader finished");
    })
}
