//! CLI argument definitions.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use vllmd_core::AppConfig;

/// Supervisor and HTTP front end for a vLLM inference server.
#[derive(Parser)]
#[command(name = "vllmd")]
#[command(about = "Run and supervise a vLLM inference server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API and, when self-managed, the inference server
    Serve {
        #[command(flatten)]
        config: ConfigArgs,

        /// Override the HTTP listen host
        #[arg(long)]
        host: Option<String>,

        /// Override the HTTP listen port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the command line used to launch the inference server
    LaunchCommand {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Load and validate the configuration file
    CheckConfig {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "VLLMD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, env = "VLLMD_LOG")]
    pub log_level: Option<String>,
}

impl ConfigArgs {
    /// Load the configuration file, or defaults when none was given.
    pub fn load(&self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => AppConfig::default(),
        };
        if let Some(level) = &self.log_level {
            config.log.level.clone_from(level);
        }
        Ok(config)
    }
}
