//! Server lifecycle and health types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a `ServerManager`.
///
/// ```text
/// Disabled                      (externally managed or not enabled; terminal)
/// Idle -> Starting -> Ready -> Stopping -> Stopped
///            |          |
///            +-> Failed <+       (startup deadline / crash)
/// ```
///
/// `Failed` and `Stopped` accept a fresh start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerState {
    Disabled,
    Idle,
    Starting,
    Ready,
    Stopping,
    Stopped,
    Failed,
}

impl ServerState {
    /// States from which `start()` may begin a new cycle.
    #[must_use]
    pub const fn can_start(self) -> bool {
        matches!(self, Self::Idle | Self::Stopped | Self::Failed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of waiting for readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessState {
    Starting,
    Ready,
    /// Deadline elapsed before a successful probe.
    Failed,
    /// The wait was cancelled by a stop request.
    Stopped,
}

/// How a child process ended, or that it has not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExitState {
    /// Exited on its own with a code.
    Exited { code: i32 },
    /// Terminated by a signal.
    Signaled { signal: i32 },
    /// Still running.
    Running,
}

impl ExitState {
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, Self::Exited { code: 0 })
    }
}

impl fmt::Display for ExitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited { code } => write!(f, "exited with code {code}"),
            Self::Signaled { signal } => write!(f, "terminated by signal {signal}"),
            Self::Running => f.write_str("still running"),
        }
    }
}

/// Read-only view of the managed process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    /// Rendered command line, for diagnostics.
    pub command_line: String,
    pub started_at: DateTime<Utc>,
}

/// Result of a health probe. Recomputed on every check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// The server answered at the HTTP level.
    pub reachable: bool,
    /// Served model ids, when the server returned a model list.
    pub models: Option<Vec<String>>,
    /// Failure detail.
    pub error: Option<String>,
    /// Whether the configured model appears in `models`.
    pub model_ready: bool,
}

impl HealthStatus {
    /// A reachable server listing the given models.
    pub fn reachable(models: Vec<String>, expected_model: &str) -> Self {
        let model_ready = models.iter().any(|m| m == expected_model);
        let error = (!model_ready).then(|| {
            format!(
                "model {expected_model} not loaded (available: {})",
                models.join(", ")
            )
        });
        Self {
            reachable: true,
            models: Some(models),
            error,
            model_ready,
        }
    }

    /// An unreachable server.
    pub fn unreachable(error: impl Into<String>) -> Self {
        Self {
            reachable: false,
            models: None,
            error: Some(error.into()),
            model_ready: false,
        }
    }

    /// Reachable at the HTTP level but not serving correctly.
    pub fn degraded(error: impl Into<String>) -> Self {
        Self {
            reachable: true,
            models: None,
            error: Some(error.into()),
            model_ready: false,
        }
    }

    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        self.reachable && self.model_ready && self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_classification() {
        assert!(ServerState::Idle.can_start());
        assert!(ServerState::Failed.can_start());
        assert!(ServerState::Stopped.can_start());
        assert!(!ServerState::Disabled.can_start());
        assert!(!ServerState::Starting.can_start());
        assert!(!ServerState::Ready.can_start());
        assert!(!ServerState::Stopping.can_start());
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&ServerState::Ready).unwrap();
        assert_eq!(json, "\"ready\"");
        assert_eq!(ServerState::Stopping.to_string(), "stopping");
    }

    #[test]
    fn test_exit_state_display() {
        assert_eq!(ExitState::Exited { code: 1 }.to_string(), "exited with code 1");
        assert_eq!(
            ExitState::Signaled { signal: 9 }.to_string(),
            "terminated by signal 9"
        );
        assert!(ExitState::Exited { code: 0 }.success());
        assert!(ExitState::Running.is_running());
    }

    #[test]
    fn test_health_status_model_matching() {
        let healthy = HealthStatus::reachable(vec!["a".into(), "b".into()], "b");
        assert!(healthy.is_healthy());

        let loading = HealthStatus::reachable(vec!["a".into()], "b");
        assert!(loading.reachable);
        assert!(!loading.is_healthy());
        assert!(loading.error.unwrap().contains("not loaded"));

        assert!(!HealthStatus::unreachable("connection refused").is_healthy());
        assert!(HealthStatus::degraded("status 500").reachable);
    }
}
