//! ADN Server - Main entry point

use adn_common::logging::{init_logging, LogConfig};
use adn_ingest::sink::ZincSearchClient;
use adn_ingest::IndexPipeline;
use anyhow::{Context, Result};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{info, warn};

use adn_server::{config::Config, create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::for_binary("adn-server")
        .with_filter_directives("adn_server=debug,adn_ingest=info,tower_http=debug")
        .merge_env()?;
    let _guard = init_logging(&log_config)?;

    let config = Config::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        index = %config.ingest.index_name,
        upload_dir = %config.server.upload_dir.display(),
        "Starting ADN Server"
    );

    serve(config).await
}

async fn serve(config: Config) -> Result<()> {
    let sink = ZincSearchClient::new(config.ingest.zinc.clone())?;
    info!(zinc = sink.base_url(), "ZincSearch client ready");

    let pipeline = IndexPipeline::new(config.ingest.processor_config(), Arc::new(sink))?;
    let app = create_router(
        AppState::new(pipeline, config.server.upload_dir.clone()),
        config.server.max_upload_bytes,
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind {addr}"))?;
    info!("Listening on {}", addr);

    let stop_accepting = Arc::new(Notify::new());
    let server = axum::serve(listener, app)
        .with_graceful_shutdown({
            let stop_accepting = Arc::clone(&stop_accepting);
            async move { stop_accepting.notified().await }
        })
        .into_future();
    tokio::pin!(server);

    let signalled = tokio::select! {
        served = &mut server => {
            served?;
            false
        }
        () = shutdown_signal() => true,
    };

    if signalled {
        let grace = Duration::from_secs(config.server.shutdown_timeout_secs);
        stop_accepting.notify_one();
        info!(grace_secs = grace.as_secs(), "No longer accepting connections, draining");

        match tokio::time::timeout(grace, &mut server).await {
            Ok(served) => served?,
            Err(_) => warn!(
                grace_secs = grace.as_secs(),
                "Requests still running after the grace period, exiting anyway"
            ),
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => info!("Interrupted, shutting down"),
        () = terminate => info!("Terminated, shutting down"),
    }
}
