//! Owning wrapper around one OS child process.
//!
//! The child runs in its own process group (unix) so that signals reach the
//! worker processes the inference server forks, not just the leader.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::debug;
use vllmd_core::{ExitState, ProcessInfo};

use crate::command::LaunchSpec;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Errors from process-level operations.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The OS refused to create the process.
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The process was still running when the wait bound elapsed.
    #[error("Process did not exit within {}ms", .timeout.as_millis())]
    WaitTimeout { timeout: Duration },

    /// Delivering a signal failed for a reason other than the process being gone.
    #[error("Failed to signal process {pid}: {message}")]
    Signal { pid: u32, message: String },

    #[error("Process I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Termination request kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// SIGTERM: ask the process to shut down.
    Terminate,
    /// SIGKILL: end the process immediately.
    Kill,
}

/// Handle to one spawned child process.
pub struct ProcessHandle {
    child: Child,
    pid: u32,
    command_line: String,
    started_at: DateTime<Utc>,
    /// Cached once the process has been reaped.
    exit: Option<ExitState>,
}

impl ProcessHandle {
    /// Spawn a process with piped stdout/stderr and a null stdin.
    pub fn start(spec: &LaunchSpec) -> Result<Self, ProcessError> {
        let mut std_cmd = std::process::Command::new(&spec.program);
        std_cmd
            .args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            std_cmd.process_group(0);
        }

        let mut cmd = Command::from(std_cmd);
        cmd.kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        let pid = child
            .id()
            .ok_or_else(|| io::Error::other("child exited before its PID was read"))?;

        debug!(pid = %pid, program = %spec.program, "Spawned child process");

        Ok(Self {
            child,
            pid,
            command_line: spec.display(),
            started_at: Utc::now(),
            exit: None,
        })
    }

    pub const fn pid(&self) -> u32 {
        self.pid
    }

    pub fn info(&self) -> ProcessInfo {
        ProcessInfo {
            pid: self.pid,
            command_line: self.command_line.clone(),
            started_at: self.started_at,
        }
    }

    /// Take the output pipes. Returns `None`s on the second call.
    pub fn take_output(&mut self) -> (Option<ChildStdout>, Option<ChildStderr>) {
        (self.child.stdout.take(), self.child.stderr.take())
    }

    /// Non-blocking exit check. Reaps the process if it has exited.
    pub fn try_wait(&mut self) -> Result<ExitState, ProcessError> {
        if let Some(exit) = self.exit {
            return Ok(exit);
        }
        match self.child.try_wait()? {
            Some(status) => Ok(self.record_exit(status)),
            None => Ok(ExitState::Running),
        }
    }

    /// Wait up to `timeout` for the process to exit.
    pub async fn wait(&mut self, timeout: Duration) -> Result<ExitState, ProcessError> {
        if let Some(exit) = self.exit {
            return Ok(exit);
        }
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(status) => Ok(self.record_exit(status?)),
            Err(_) => Err(ProcessError::WaitTimeout { timeout }),
        }
    }

    /// Send a termination signal to the process group.
    ///
    /// Signalling a process that already exited is a successful no-op.
    pub fn signal(&mut self, kind: SignalKind) -> Result<(), ProcessError> {
        if !self.try_wait()?.is_running() {
            debug!(pid = %self.pid, ?kind, "Process already exited, skipping signal");
            return Ok(());
        }
        self.deliver(kind)
    }

    #[cfg(unix)]
    fn deliver(&self, kind: SignalKind) -> Result<(), ProcessError> {
        let sig = match kind {
            SignalKind::Terminate => Signal::SIGTERM,
            SignalKind::Kill => Signal::SIGKILL,
        };
        let raw = i32::try_from(self.pid).map_err(|_| ProcessError::Signal {
            pid: self.pid,
            message: "pid out of range".to_string(),
        })?;

        match signal::killpg(Pid::from_raw(raw), sig) {
            Ok(()) => Ok(()),
            // Exited between the check and the signal
            Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(e) => Err(ProcessError::Signal {
                pid: self.pid,
                message: e.to_string(),
            }),
        }
    }

    #[cfg(not(unix))]
    fn deliver(&mut self, _kind: SignalKind) -> Result<(), ProcessError> {
        // No SIGTERM equivalent - terminate immediately
        match self.child.start_kill() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(ProcessError::Signal {
                pid: self.pid,
                message: e.to_string(),
            }),
        }
    }

    fn record_exit(&mut self, status: ExitStatus) -> ExitState {
        let exit = exit_state(status);
        self.exit = Some(exit);
        exit
    }
}

/// Classify an OS exit status.
pub fn exit_state(status: ExitStatus) -> ExitState {
    if let Some(code) = status.code() {
        return ExitState::Exited { code };
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ExitState::Signaled { signal };
        }
    }

    ExitState::Exited { code: -1 }
}
