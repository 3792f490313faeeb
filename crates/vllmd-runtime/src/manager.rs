//! Lifecycle supervisor for one inference server process.
//!
//! `ServerManager` owns at most one child. Its spawn and transition phases,
//! `stop` and the crash check in `health_check` serialize on one async
//! mutex. The readiness wait runs outside the lock so that a `stop` arriving
//! during startup can cancel it instead of waiting out the deadline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use vllmd_core::{
    ChatRequest, ChatResult, ExitState, HealthStatus, InferenceBackend, ProcessInfo,
    ReadinessState, ServerConfig, ServerError, ServerState,
};

use crate::client::InferenceClient;
use crate::command::LaunchSpec;
use crate::process::{LogDrain, ProcessHandle, ServerLogBuffer, ShutdownOutcome, shutdown_process};
use crate::readiness::ReadinessProber;

/// Lines of server output attached to a startup failure.
pub const STARTUP_LOG_TAIL: usize = 20;

/// Upper bound on how often the startup exit watcher checks the child.
const EXIT_CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// How long to wait for drain tasks to flush after the process is gone.
const DRAIN_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Default)]
struct Inner {
    process: Option<ProcessHandle>,
    drain: Option<LogDrain>,
    /// Bumped by every spawn so a stale `start` never touches a newer cycle.
    generation: u64,
    /// Cancels the pending readiness wait, if any.
    cancel: Option<CancellationToken>,
    /// Set by `shutdown`; no child is spawned afterwards.
    closed: bool,
}

impl Inner {
    async fn release(&mut self) -> Option<ProcessHandle> {
        let process = self.process.take();
        if let Some(drain) = self.drain.take() {
            drain.finish(DRAIN_FLUSH_TIMEOUT).await;
        }
        process
    }
}

enum Startup {
    Readiness(ReadinessState),
    Exited(ExitState),
}

/// Supervisor for one inference server.
pub struct ServerManager {
    config: ServerConfig,
    launch: LaunchSpec,
    client: InferenceClient,
    prober: ReadinessProber,
    logs: Arc<ServerLogBuffer>,
    inner: Mutex<Inner>,
    state: watch::Sender<ServerState>,
}

impl ServerManager {
    /// Create a manager that launches `vllm serve` from the configuration.
    pub fn new(config: ServerConfig) -> Self {
        let launch = LaunchSpec::from_config(&config);
        Self::with_launch(config, launch)
    }

    /// Create a manager with an explicit child command.
    ///
    /// Readiness and completions still target the configured host and port.
    pub fn with_launch(config: ServerConfig, launch: LaunchSpec) -> Self {
        let client = InferenceClient::new(&config);
        let initial = if config.owns_process() {
            ServerState::Idle
        } else {
            ServerState::Disabled
        };

        Self {
            prober: ReadinessProber::new(client.clone()),
            client,
            launch,
            config,
            logs: Arc::new(ServerLogBuffer::default()),
            inner: Mutex::new(Inner::default()),
            state: watch::Sender::new(initial),
        }
    }

    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub const fn client(&self) -> &InferenceClient {
        &self.client
    }

    /// True when this manager owns the server process.
    pub const fn is_self_managed(&self) -> bool {
        self.config.owns_process()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// The most recent `n` lines of server output.
    pub fn recent_logs(&self, n: usize) -> Vec<String> {
        self.logs.tail(n)
    }

    /// Details of the running process, if any.
    pub async fn process_info(&self) -> Option<ProcessInfo> {
        self.inner.lock().await.process.as_ref().map(ProcessHandle::info)
    }

    fn set_state(&self, next: ServerState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(from = %prev, to = %next, "Server state changed");
        }
    }

    /// Spawn the server and wait until it serves the configured model.
    ///
    /// A no-op when the server is disabled or externally managed.
    pub async fn start(&self) -> Result<(), ServerError> {
        if !self.is_self_managed() {
            debug!("Inference server not self-managed, skipping start");
            return Ok(());
        }

        let (generation, cancel) = self.spawn_child().await?;

        let outcome = tokio::select! {
            readiness = self.prober.wait_until_ready(
                self.config.poll_interval(),
                self.config.startup_timeout(),
                self.config.probe_timeout(),
                &cancel,
            ) => Startup::Readiness(readiness),
            status = self.watch_for_exit(generation) => Startup::Exited(status),
        };

        let mut inner = self.inner.lock().await;
        if cancel.is_cancelled() || inner.generation != generation {
            // The stopper owns the state from here
            info!("Inference server startup cancelled");
            return Err(ServerError::StartupCancelled);
        }
        inner.cancel = None;

        match outcome {
            Startup::Readiness(ReadinessState::Ready) => {
                self.set_state(ServerState::Ready);
                info!(
                    port = %self.config.port,
                    model = %self.config.model_name,
                    "Inference server ready"
                );
                Ok(())
            }
            Startup::Readiness(ReadinessState::Stopped | ReadinessState::Starting) => {
                Err(ServerError::StartupCancelled)
            }
            Startup::Readiness(ReadinessState::Failed) => {
                let timeout = self.config.startup_timeout();
                self.set_state(ServerState::Failed);
                error!(
                    timeout_secs = timeout.as_secs(),
                    "Inference server not ready before deadline, stopping it"
                );
                if let Some(mut process) = inner.process.take() {
                    shutdown_process(
                        &mut process,
                        self.config.grace_period(),
                        self.config.kill_wait(),
                    )
                    .await;
                }
                inner.release().await;
                Err(ServerError::StartupTimeout { timeout })
            }
            Startup::Exited(status) => {
                inner.release().await;
                self.set_state(ServerState::Failed);
                let recent_logs = self.logs.tail(STARTUP_LOG_TAIL);
                error!(%status, "Inference server exited during startup");
                Err(ServerError::ExitedDuringStartup {
                    status,
                    recent_logs,
                })
            }
        }
    }

    /// Spawn phase of `start`, under the lock.
    async fn spawn_child(&self) -> Result<(u64, CancellationToken), ServerError> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            debug!("Manager shut down, refusing to spawn");
            return Err(ServerError::StartupCancelled);
        }

        let state = self.state();
        if !state.can_start() {
            return Err(ServerError::AlreadyRunning { state });
        }

        self.logs.clear();
        info!(command = %self.launch.display(), "Starting inference server");

        let mut process = match ProcessHandle::start(&self.launch) {
            Ok(process) => process,
            Err(e) => {
                error!(error = %e, "Failed to spawn inference server");
                self.set_state(ServerState::Failed);
                return Err(ServerError::Spawn(e.to_string()));
            }
        };

        let (stdout, stderr) = process.take_output();
        inner.drain = Some(LogDrain::attach(
            process.pid(),
            stdout,
            stderr,
            self.logs.clone(),
        ));
        info!(pid = %process.pid(), port = %self.config.port, "Inference server spawned");

        inner.process = Some(process);
        inner.generation += 1;
        let cancel = CancellationToken::new();
        inner.cancel = Some(cancel.clone());
        self.set_state(ServerState::Starting);

        Ok((inner.generation, cancel))
    }

    /// Resolve with the exit state if the child of `generation` exits.
    ///
    /// Pends forever once the process is no longer this cycle's to watch.
    async fn watch_for_exit(&self, generation: u64) -> ExitState {
        let interval = self.config.poll_interval().min(EXIT_CHECK_INTERVAL);
        loop {
            tokio::time::sleep(interval).await;

            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                break;
            }
            let Some(process) = inner.process.as_mut() else {
                break;
            };
            match process.try_wait() {
                Ok(ExitState::Running) => {}
                Ok(status) => return status,
                Err(e) => warn!(error = %e, "Failed to poll inference server process"),
            }
        }
        std::future::pending().await
    }

    /// Stop the server. Never fails and always ends `Stopped` unless the
    /// server is disabled.
    pub async fn stop(&self) -> ShutdownOutcome {
        if !self.is_self_managed() {
            return ShutdownOutcome::AlreadyExited;
        }

        let mut inner = self.inner.lock().await;
        if let Some(cancel) = inner.cancel.take() {
            cancel.cancel();
        }

        let Some(mut process) = inner.process.take() else {
            debug!(state = %self.state(), "No inference server process to stop");
            self.set_state(ServerState::Stopped);
            return ShutdownOutcome::AlreadyExited;
        };

        self.set_state(ServerState::Stopping);
        info!(pid = %process.pid(), "Stopping inference server");

        let outcome = shutdown_process(
            &mut process,
            self.config.grace_period(),
            self.config.kill_wait(),
        )
        .await;
        match outcome {
            ShutdownOutcome::Forced { .. } => {
                warn!(pid = %process.pid(), "Inference server required forceful termination");
            }
            ShutdownOutcome::Unreaped => {
                warn!(pid = %process.pid(), "Inference server could not be confirmed dead");
            }
            ShutdownOutcome::AlreadyExited | ShutdownOutcome::Graceful { .. } => {}
        }
        drop(process);
        inner.release().await;

        self.set_state(ServerState::Stopped);
        info!(%outcome, "Inference server stopped");
        outcome
    }

    /// Stop the server for good: a `start` racing this call, or any later
    /// one, returns `StartupCancelled` without spawning.
    pub async fn shutdown(&self) -> ShutdownOutcome {
        self.inner.lock().await.closed = true;
        self.stop().await
    }

    /// Check server health.
    ///
    /// For a self-managed server this also detects a crash: a process that
    /// exited while `Ready` moves the state to `Failed`.
    pub async fn health_check(&self) -> HealthStatus {
        if !self.config.enabled {
            return HealthStatus::unreachable("inference server disabled");
        }
        if !self.is_self_managed() {
            return self.client.check_health(self.config.probe_timeout()).await;
        }

        {
            let mut inner = self.inner.lock().await;
            let state = self.state();

            if state == ServerState::Ready
                && let Some(process) = inner.process.as_mut()
            {
                match process.try_wait() {
                    Ok(ExitState::Running) => {}
                    Ok(status) => {
                        let err = ServerError::CrashDetected { status };
                        error!(pid = %process.pid(), %status, "Inference server crashed");
                        inner.release().await;
                        self.set_state(ServerState::Failed);
                        return HealthStatus::unreachable(err.to_string());
                    }
                    Err(e) => warn!(error = %e, "Failed to poll inference server process"),
                }
            }

            if state != ServerState::Ready {
                return HealthStatus::unreachable(format!(
                    "inference server not ready (state: {state})"
                ));
            }
        }

        self.client.check_health(self.config.probe_timeout()).await
    }
}

#[async_trait]
impl InferenceBackend for ServerManager {
    async fn check_health(&self) -> HealthStatus {
        self.health_check().await
    }

    async fn complete(&self, mut request: ChatRequest) -> ChatResult {
        let request_id = request.ensure_request_id();

        if !self.config.enabled {
            return ChatResult::failed(request_id, "inference server disabled");
        }
        let state = self.state();
        if self.is_self_managed() && state != ServerState::Ready {
            warn!(request_id = %request_id, %state, "Completion refused, server not ready");
            return ChatResult::failed(
                request_id,
                format!("inference server not ready (state: {state})"),
            );
        }

        InferenceBackend::complete(&self.client, request).await
    }

    fn state(&self) -> ServerState {
        Self::state(self)
    }
}
