//! Graceful shutdown with SIGTERM → SIGKILL escalation.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};
use vllmd_core::ExitState;

use super::handle::{ProcessError, ProcessHandle, SignalKind};

/// How a shutdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// There was nothing to stop: no process, or it had already exited.
    AlreadyExited,
    /// The process exited within the grace period after SIGTERM.
    Graceful { status: ExitState },
    /// The process needed SIGKILL.
    Forced { status: ExitState },
    /// The process could not be confirmed dead after SIGKILL.
    Unreaped,
}

impl fmt::Display for ShutdownOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExited => f.write_str("already exited"),
            Self::Graceful { status } => write!(f, "graceful ({status})"),
            Self::Forced { status } => write!(f, "forced ({status})"),
            Self::Unreaped => f.write_str("unreaped"),
        }
    }
}

/// Shut down a child process.
///
/// # Strategy
/// 1. Send SIGTERM to the process group and wait up to `grace`
/// 2. If still running, send SIGKILL and wait up to `kill_wait`
/// 3. Report `Unreaped` if even that bound elapses
///
/// Never returns an error; failures are logged and folded into the outcome.
pub async fn shutdown_process(
    handle: &mut ProcessHandle,
    grace: Duration,
    kill_wait: Duration,
) -> ShutdownOutcome {
    let pid = handle.pid();

    match handle.try_wait() {
        Ok(ExitState::Running) => {}
        Ok(status) => {
            debug!(pid = %pid, %status, "Process already exited before shutdown");
            return ShutdownOutcome::AlreadyExited;
        }
        Err(e) => warn!(pid = %pid, error = %e, "Failed to query process state"),
    }

    // Phase 1: SIGTERM with grace period
    if let Err(e) = handle.signal(SignalKind::Terminate) {
        warn!(pid = %pid, error = %e, "Failed to send SIGTERM");
    }
    match handle.wait(grace).await {
        Ok(status) => {
            info!(pid = %pid, %status, "Inference server exited gracefully");
            return ShutdownOutcome::Graceful { status };
        }
        Err(ProcessError::WaitTimeout { .. }) => {
            warn!(
                pid = %pid,
                grace_secs = grace.as_secs(),
                "Process ignored SIGTERM, escalating to SIGKILL"
            );
        }
        Err(e) => warn!(pid = %pid, error = %e, "Error waiting for process"),
    }

    // Phase 2: SIGKILL
    if let Err(e) = handle.signal(SignalKind::Kill) {
        warn!(pid = %pid, error = %e, "Failed to send SIGKILL");
    }

    // Phase 3: wait for reaping
    match handle.wait(kill_wait).await {
        Ok(status) => {
            info!(pid = %pid, %status, "Inference server killed");
            ShutdownOutcome::Forced { status }
        }
        Err(e) => {
            warn!(pid = %pid, error = %e, "Process not reaped after SIGKILL");
            ShutdownOutcome::Unreaped
        }
    }
}
