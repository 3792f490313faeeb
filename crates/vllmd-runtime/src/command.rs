//! Command builder for the inference server.
//!
//! This module turns a `ServerConfig` into the program, arguments and
//! environment used to spawn `vllm serve`. Tuning values are rendered
//! verbatim; nothing here interprets them.

use std::collections::BTreeMap;
use vllmd_core::ServerConfig;

/// Program, arguments and environment for one child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl LaunchSpec {
    /// Create a spec for an arbitrary program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set one environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Build the `vllm serve` invocation for a configuration.
    pub fn from_config(config: &ServerConfig) -> Self {
        let mut spec = Self::new(&config.executable)
            .arg("serve")
            .arg(config.effective_model_path())
            .args(["--host".to_string(), config.host.clone()])
            .args(["--port".to_string(), config.port.to_string()])
            .args(["--served-model-name".to_string(), config.model_name.clone()])
            .args([
                "--gpu-memory-utilization".to_string(),
                config.gpu_memory_utilization.to_string(),
            ])
            .args([
                "--max-num-batched-tokens".to_string(),
                config.max_num_batched_tokens.to_string(),
            ])
            .args(["--max-num-seqs".to_string(), config.max_num_seqs.to_string()])
            .args(["--max-model-len".to_string(), config.max_model_len.to_string()])
            .args([
                "--tensor-parallel-size".to_string(),
                config.tensor_parallel_size.to_string(),
            ]);

        if !config.dtype.is_empty() && config.dtype != "auto" {
            spec = spec.args(["--dtype".to_string(), config.dtype.clone()]);
        }

        if config.enable_prefix_caching {
            spec = spec.arg("--enable-prefix-caching");
        }

        if config.enable_chunked_prefill {
            spec = spec.arg("--enable-chunked-prefill");
        }

        if !config.api_key.is_empty() {
            spec = spec.args(["--api-key".to_string(), config.api_key.clone()]);
        }

        spec = spec.args(config.extra_args.iter().cloned());

        for (key, value) in &config.env {
            spec = spec.env(key, value);
        }

        spec
    }

    /// Render the command line for logs, masking the API key.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        let mut mask_next = false;
        for arg in &self.args {
            if mask_next {
                parts.push("***".to_string());
                mask_next = false;
                continue;
            }
            mask_next = arg == "--api-key";
            parts.push(arg.clone());
        }
        parts.join(" ")
    }
}
