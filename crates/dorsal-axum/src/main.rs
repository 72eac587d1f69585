mod config;
mod error;
mod routes;
mod store;
mod telemetry;

use std::sync::Arc;

use clap::Parser;
use config::{CliArgs, ServerConfig};
use dorsal::Allocator;
use routes::{AppState, router};
use store::AnyStore;
use telemetry::init_telemetry;
use tokio::{net::TcpListener, signal};

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    init_telemetry()?;

    let store = AnyStore::from_config(&config).await?;
    log_startup_info(&config, &store);

    let allocator = Allocator::new(store, config.allocator.clone());
    let app = router(Arc::new(AppState::new(allocator)));

    let listener = TcpListener::bind(&config.server_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(config: &ServerConfig, store: &AnyStore) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting sequence service on {} with full config: {:#?}",
            config.server_addr,
            config
        );
    } else {
        tracing::info!(
            "Starting sequence service on {} backed by {} (max {} attempts)",
            config.server_addr,
            store.backend(),
            config.allocator.max_attempts()
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, draining in-flight allocations...");
}
