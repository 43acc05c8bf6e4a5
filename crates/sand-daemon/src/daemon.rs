//! Daemon lifecycle: logging, wiring, signal handling and shutdown.

use std::future::Future;
use std::sync::Arc;

use sand_core::config::DaemonConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::api::ApiHandler;
use crate::ipc::server::Result;
use crate::ipc::IpcServer;
use crate::timer::{ExpiryHook, ExpiryMonitor, TimerManager};

/// Log to stderr. `RUST_LOG` wins over `level` when set.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run until SIGINT or SIGTERM.
pub async fn run(config: DaemonConfig, hook: Arc<dyn ExpiryHook>) -> Result<()> {
    run_until(config, hook, shutdown_signal()).await
}

/// Run until `shutdown` resolves. Returns an error only if the socket could
/// not be obtained.
pub async fn run_until<F>(config: DaemonConfig, hook: Arc<dyn ExpiryHook>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    tracing::info!("Sand daemon starting...");

    let timer_manager = TimerManager::new();
    let api_handler = Arc::new(ApiHandler::new(timer_manager.clone()));
    let server = IpcServer::bind(&config.socket, api_handler)?;

    let cancel = CancellationToken::new();
    let monitor_handle = tokio::spawn(ExpiryMonitor::new(timer_manager, hook).run(cancel.clone()));
    let server_handle = tokio::spawn(server.serve(cancel.clone()));

    tracing::info!("Daemon ready and listening");
    shutdown.await;
    tracing::info!("Shutting down...");

    cancel.cancel();
    if let Err(e) = server_handle.await {
        tracing::error!("IPC server task failed: {}", e);
    }
    if let Err(e) = monitor_handle.await {
        tracing::error!("Expiry monitor task failed: {}", e);
    }

    Ok(())
}

/// Resolves on the first SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
