//! CLI entry point - the composition root.

use clap::Parser;

use vllmd_cli::{Cli, Commands, handlers, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads `env` defaults
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, host, port } => {
            let mut config = config.load()?;
            if let Some(host) = host {
                config.web.host = host;
            }
            if let Some(port) = port {
                config.web.port = port;
            }
            let _log_guard = logging::init(&config.log)?;
            handlers::serve::execute(config).await?;
        }
        Commands::LaunchCommand { config } => {
            let config = config.load()?;
            let _log_guard = logging::init(&config.log)?;
            handlers::launch_command::execute(&config);
        }
        Commands::CheckConfig { config } => {
            let config = config.load()?;
            let _log_guard = logging::init(&config.log)?;
            handlers::check_config::execute(&config)?;
        }
    }

    Ok(())
}
