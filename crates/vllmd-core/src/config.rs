//! Configuration types and validation.
//!
//! `ServerConfig` describes one inference server: where it listens, which
//! model it serves, the generation defaults applied to requests and the
//! tuning knobs passed through to the child process. `AppConfig` is the
//! on-disk YAML document that wraps it together with the web and log
//! sections.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default port the inference server listens on.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default port for the vllmd HTTP surface.
pub const DEFAULT_WEB_PORT: u16 = 10002;

/// Default served model name.
pub const DEFAULT_MODEL_NAME: &str = "Qwen/Qwen2.5-7B-Instruct";

/// System prompt applied when neither the request nor the config sets one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Inference server configuration.
///
/// Immutable once loaded. Every tuning field is rendered into the launch
/// arguments verbatim; nothing here is interpreted by the supervisor
/// beyond the lifecycle timings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Whether the inference backend is used at all.
    pub enabled: bool,
    /// Whether vllmd owns the server process (spawns and stops it).
    #[serde(alias = "auto_start")]
    pub self_manage: bool,

    /// Host the server binds to and the client connects to.
    pub host: String,
    /// Port the server binds to and the client connects to.
    pub port: u16,
    /// Bearer token sent upstream (empty = none).
    pub api_key: String,

    /// Name the model is served under.
    pub model_name: String,
    /// Local path or hub identifier of the model (defaults to `model_name`).
    pub model_path: Option<String>,

    /// Server executable.
    pub executable: String,
    /// Arguments appended after the generated ones.
    pub extra_args: Vec<String>,
    /// Extra environment for the child process.
    pub env: BTreeMap<String, String>,

    // Generation defaults
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    /// System prompt used when a request does not carry one. `null` or an
    /// empty string sends no system message.
    pub default_system_prompt: Option<String>,
    #[serde(alias = "timeout")]
    pub request_timeout_secs: u64,

    // Tuning knobs
    pub gpu_memory_utilization: f32,
    pub tensor_parallel_size: u32,
    pub max_num_seqs: u32,
    pub max_num_batched_tokens: u32,
    pub max_model_len: u32,
    /// auto, float16, bfloat16, float32
    pub dtype: String,
    pub enable_prefix_caching: bool,
    pub enable_chunked_prefill: bool,

    // Lifecycle timings
    #[serde(alias = "startup_timeout")]
    pub startup_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub probe_timeout_ms: u64,
    pub grace_period_secs: u64,
    pub kill_wait_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            self_manage: false,
            host: "127.0.0.1".to_string(),
            port: DEFAULT_SERVER_PORT,
            api_key: String::new(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_path: None,
            executable: "vllm".to_string(),
            extra_args: Vec::new(),
            env: BTreeMap::new(),
            max_tokens: 2048,
            temperature: 0.7,
            top_p: 0.9,
            default_system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            request_timeout_secs: 60,
            gpu_memory_utilization: 0.9,
            tensor_parallel_size: 1,
            max_num_seqs: 256,
            max_num_batched_tokens: 8192,
            max_model_len: 4096,
            dtype: "auto".to_string(),
            enable_prefix_caching: true,
            enable_chunked_prefill: true,
            startup_timeout_secs: 600,
            poll_interval_ms: 2000,
            probe_timeout_ms: 5000,
            grace_period_secs: 10,
            kill_wait_secs: 5,
        }
    }
}

impl ServerConfig {
    /// Configuration for a server that vllmd spawns and owns.
    #[must_use]
    pub fn self_managed(model_name: impl Into<String>, port: u16) -> Self {
        Self {
            enabled: true,
            self_manage: true,
            model_name: model_name.into(),
            port,
            ..Self::default()
        }
    }

    /// Configuration for a server started by someone else.
    #[must_use]
    pub fn external(host: impl Into<String>, port: u16, model_name: impl Into<String>) -> Self {
        Self {
            enabled: true,
            self_manage: false,
            host: host.into(),
            port,
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    /// True when the supervisor owns the process lifecycle.
    #[must_use]
    pub const fn owns_process(&self) -> bool {
        self.enabled && self.self_manage
    }

    /// Base URL of the server's HTTP API.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Model path, falling back to the served name.
    pub fn effective_model_path(&self) -> &str {
        self.model_path.as_deref().unwrap_or(&self.model_name)
    }

    pub const fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub const fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub const fn kill_wait(&self) -> Duration {
        Duration::from_secs(self.kill_wait_secs)
    }

    /// Validate value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.port == 0 {
            return invalid("vllm.port must be non-zero".to_string());
        }
        if self.model_name.trim().is_empty() {
            return invalid("vllm.model_name cannot be empty".to_string());
        }
        if !(self.gpu_memory_utilization > 0.0 && self.gpu_memory_utilization <= 1.0) {
            return invalid(format!(
                "vllm.gpu_memory_utilization must be in (0, 1], got {}",
                self.gpu_memory_utilization
            ));
        }
        for (name, value) in [
            ("tensor_parallel_size", self.tensor_parallel_size),
            ("max_num_seqs", self.max_num_seqs),
            ("max_num_batched_tokens", self.max_num_batched_tokens),
            ("max_model_len", self.max_model_len),
            ("max_tokens", self.max_tokens),
        ] {
            if value == 0 {
                return invalid(format!("vllm.{name} must be at least 1"));
            }
        }
        if self.temperature < 0.0 {
            return invalid(format!(
                "vllm.temperature must be >= 0, got {}",
                self.temperature
            ));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return invalid(format!("vllm.top_p must be in (0, 1], got {}", self.top_p));
        }
        if self.startup_timeout_secs == 0 {
            return invalid("vllm.startup_timeout_secs must be at least 1".to_string());
        }
        if self.poll_interval_ms == 0 {
            return invalid("vllm.poll_interval_ms must be at least 1".to_string());
        }
        if self.request_timeout_secs == 0 {
            return invalid("vllm.request_timeout_secs must be at least 1".to_string());
        }
        Ok(())
    }
}

/// HTTP listener configuration for the vllmd web surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_WEB_PORT,
        }
    }
}

/// Line format of log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line records.
    #[default]
    #[serde(alias = "glog")]
    Text,
    /// One JSON object per record.
    Json,
}

/// Where log output goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRedirect {
    #[default]
    Stdout,
    File,
    Both,
}

impl LogRedirect {
    pub const fn to_stdout(self) -> bool {
        matches!(self, Self::Stdout | Self::Both)
    }

    pub const fn to_file(self) -> bool {
        matches!(self, Self::File | Self::Both)
    }
}

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    #[default]
    Hourly,
    Daily,
    Never,
}

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset (e.g. `info`, `vllmd=debug`).
    pub level: String,
    /// Colored output on stdout. Files never get color codes.
    pub ansi: bool,
    #[serde(alias = "formatter")]
    pub format: LogFormat,
    pub redirect: LogRedirect,
    /// Directory for log files when `redirect` includes `file`.
    pub filepath: PathBuf,
    pub rotation: LogRotation,
    /// Rotated files kept on disk; older ones are deleted.
    pub max_count: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: true,
            format: LogFormat::Text,
            redirect: LogRedirect::Stdout,
            filepath: PathBuf::from("./log"),
            rotation: LogRotation::Hourly,
            max_count: 200,
        }
    }
}

/// The whole configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub web: WebConfig,
    pub log: LogConfig,
    pub vllm: ServerConfig,
}

impl AppConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        // An empty file is a valid, all-defaults document.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load and validate a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_yaml_str(&raw)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log.redirect.to_file() && self.log.max_count == 0 {
            return Err(ConfigError::Invalid(
                "log.max_count must be at least 1 when logging to files".to_string(),
            ));
        }
        if self.vllm.enabled {
            self.vllm.validate()?;
        }
        Ok(())
    }
}

/// Configuration loading error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
