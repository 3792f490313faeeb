//! `vllmd serve`: run the HTTP API and supervise the inference server.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use vllmd_axum::AppState;
use vllmd_core::{AppConfig, InferenceBackend, ServerError};
use vllmd_runtime::{STARTUP_LOG_TAIL, ServerManager};

/// Run until SIGINT/SIGTERM, then stop the inference server.
pub async fn execute(config: AppConfig) -> anyhow::Result<()> {
    let manager = Arc::new(ServerManager::new(config.vllm.clone()));

    let addr = format!("{}:{}", config.web.host, config.web.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let cancel = CancellationToken::new();
    let backend: Arc<dyn InferenceBackend> = manager.clone();
    let server = tokio::spawn(vllmd_axum::serve(
        listener,
        AppState::new(backend),
        cancel.clone(),
    ));

    // The API answers (degraded) while the model loads
    let startup = tokio::spawn(start_backend(manager.clone()));

    shutdown_signal().await;
    info!("Shutdown requested");

    cancel.cancel();
    // Latches the manager first, so a startup that has not spawned yet never will
    let outcome = manager.shutdown().await;
    info!(%outcome, "Inference server shutdown complete");
    if let Err(e) = startup.await {
        warn!(error = %e, "Inference server startup task failed");
    }

    match server.await {
        Ok(result) => result,
        Err(e) => Err(anyhow::anyhow!("HTTP server task failed: {e}")),
    }
}

async fn start_backend(manager: Arc<ServerManager>) {
    if !manager.config().enabled {
        warn!("vllm backend disabled; completions will return errors");
        return;
    }
    if !manager.is_self_managed() {
        info!(url = %manager.client().base_url(), "Using externally managed inference server");
        return;
    }

    match manager.start().await {
        Ok(()) => {}
        Err(ServerError::StartupCancelled) => info!("Inference server startup cancelled"),
        Err(e @ ServerError::StartupTimeout { .. }) => error!(
            error = %e,
            recent_logs = ?manager.recent_logs(STARTUP_LOG_TAIL),
            "Inference server failed to start"
        ),
        Err(e) => error!(error = %e, "Inference server failed to start"),
    }
}

/// Resolve on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
