//! labelconv-srv - Label conversion request service
//!
//! Accepts conversion requests (metadata plus example files), stages them
//! in object storage, and serves reconciliation reads that keep the
//! relational status in step with the folder contents.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use labelconv_common::config::ServiceConfig;
use labelconv_common::db::init_database;
use labelconv_srv::storage::{FsObjectStore, RetryPolicy};
use labelconv_srv::{build_router, AppState};
use tokio::signal;
use tracing::info;

/// Command-line arguments for labelconv-srv
#[derive(Parser, Debug)]
#[command(name = "labelconv-srv")]
#[command(about = "Label conversion request service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Root folder holding the database and staged files
    #[arg(short, long)]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting label conversion request service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();
    let config = ServiceConfig::resolve(args.root_folder.as_deref(), args.port)
        .context("Failed to resolve configuration")?;
    config
        .ensure_root_folder()
        .context("Failed to create root folder")?;

    info!("Root folder: {}", config.root_folder.display());

    let db_path = config.database_path();
    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    info!("✓ Database ready: {}", db_path.display());

    let storage_root = config.storage_root();
    std::fs::create_dir_all(&storage_root).context("Failed to create storage root")?;
    let store = Arc::new(FsObjectStore::new(&storage_root));
    info!("✓ Object storage root: {}", storage_root.display());

    let retry = RetryPolicy::new(
        config.storage_retry_attempts,
        Duration::from_millis(config.storage_retry_delay_ms),
    );

    let state = AppState::new(pool, store)
        .with_retry(retry)
        .with_max_upload_files(config.max_upload_files);
    let app = build_router(state, config.max_body_bytes);

    let addr: SocketAddr = format!("{}:{}", config.bind_host, config.bind_port)
        .parse()
        .context("Invalid bind address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("labelconv-srv listening on http://{addr}");
    info!("Health check: http://{addr}/health");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
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
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
