//! climbwatch-server - Main entry point
//!
//! Startup order: tracing, build identification, configuration (fatal on
//! error), project id, store, upstream client, HTTP server. On SIGINT/SIGTERM
//! the server stops accepting connections and running ingestion cycles get
//! the configured grace period to finish.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use climbwatch_server::config::{Args, LogFormat};
use climbwatch_server::shutdown::Shutdown;
use climbwatch_server::upstream::UpstreamClient;
use climbwatch_server::{build_router, metadata, store, AppState};

/// Time left after the grace period for cancelled cycles to answer
const CANCEL_FLUSH: Duration = Duration::from_secs(2);

const DEFAULT_LOG_FILTER: &str = "climbwatch_server=info,climbwatch_common=info,tower_http=info";

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        // Cloud Logging parses JSON lines written to stderr
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    info!(
        "Starting climbwatch-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!(kind = e.kind(), "Fatal configuration error: {}", e);
            return Err(e.into());
        }
    };
    info!(
        port = config.port,
        store = ?config.store,
        timestamp_offset_hours = config.timestamp_offset_hours,
        upstream_timeout = ?config.upstream.timeout,
        "Configuration loaded"
    );

    let project_id = metadata::resolve_project_id(config.project_id.clone()).await;

    let branch_store = store::open_store(&config.store, config.timestamp_offset_hours)
        .await
        .context("Failed to open branch store")?;
    info!("✓ Store ready ({})", branch_store.backend_name());

    let upstream = UpstreamClient::new(&config.upstream).context("Failed to create upstream client")?;

    let shutdown = Shutdown::new();
    let state = AppState::new(
        branch_store,
        Arc::new(upstream),
        project_id,
        config.cycle_timeout,
        shutdown.ingest_token(),
    );
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);

    let drain = shutdown.drain_token();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { drain.cancelled().await })
            .await
    });

    tokio::select! {
        joined = &mut server => {
            joined.context("Server task panicked")?.context("Server error")?;
            return Ok(());
        }
        _ = shutdown_signal() => {}
    }

    info!("Shutdown initiated");
    shutdown.begin(config.shutdown_grace);

    match tokio::time::timeout(config.shutdown_grace + CANCEL_FLUSH, server).await {
        Ok(joined) => {
            joined.context("Server task panicked")?.context("Server error")?;
            info!("Server shutdown complete");
        }
        Err(_) => warn!("Grace period elapsed with requests still in flight, exiting"),
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
