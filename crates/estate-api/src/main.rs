//! # estate-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the listing API.
//! Binds to configurable port (default 8080).

use std::sync::Arc;

use estate_api::db::{MemoryStore, PgStore, Store};
use estate_api::state::{AppConfig, AppState, LogFormat};
use estate_crypto::{Argon2Hasher, PasswordCost};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();

    // Initialize structured tracing.
    init_tracing(config.as_ref().map(|c| c.log_format).unwrap_or_default());

    let config = config.map_err(|e| {
        tracing::error!("Configuration invalid: {e}");
        e
    })?;
    tracing::debug!(?config, "configuration loaded");

    // Database is optional; without it everything lives in process memory.
    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = estate_api::db::init_pool(url).await.map_err(|e| {
                tracing::error!("Database initialization failed: {e}");
                e
            })?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store. Data will not persist.");
            Arc::new(MemoryStore::new())
        }
    };

    let hasher = Arc::new(Argon2Hasher::new(PasswordCost::default())?);
    let port = config.port;
    let state = AppState::new(store, hasher, config).map_err(|e| {
        tracing::error!("State initialization failed: {e}");
        e
    })?;

    let app = estate_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Estate API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Estate API stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
