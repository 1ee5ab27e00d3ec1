//! `snappass` — self-destructing secret exchange, binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (JSON logs, optional OTLP export).
//! 3. Open the configured [`SecretStore`](store::SecretStore) backend.
//! 4. Build the Axum router and serve until Ctrl-C.

mod config;
mod crypto;
mod secrets;
mod server;
mod store;
mod telemetry;
mod token;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use config::{Config, StorageBackend};
use secrets::SecretService;
use server::state::AppState;
use store::{MemoryStore, SecretStore, SqlDateTime, SqliteStore, SystemClock};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(&cfg.log_level, cfg.otel_exporter_otlp_endpoint.as_deref())?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.listen_port,
        backend = ?cfg.storage_backend,
        "snappass starting"
    );

    // -----------------------------------------------------------------------
    // 3. Storage
    // -----------------------------------------------------------------------
    let store = open_store(&cfg)?;
    let state = AppState::new(SecretService::new(store), cfg.max_secret_bytes);

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let router = server::router::build(state);
    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("snappass stopped");
    Ok(())
}

fn open_store(cfg: &Config) -> Result<Arc<dyn SecretStore>> {
    let clock = Arc::new(SystemClock);
    let store: Arc<dyn SecretStore> = match cfg.storage_backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new(clock)),
        StorageBackend::Sqlite => {
            let path = std::path::Path::new(&cfg.database_path);
            let store = SqliteStore::open(path, clock, Box::new(SqlDateTime))
                .with_context(|| format!("failed to open SQLite store at {}", path.display()))?;
            info!(path = %path.display(), "opened SQLite store");
            Arc::new(store)
        }
    };
    Ok(store)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
