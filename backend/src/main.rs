//! Song catalog HTTP service: enriches songs through an external metadata
//! lookup, stores them in SQLite and serves paginated listings and lyrics.

mod config;
mod error;
mod handlers;
mod metadata_client;
mod request_context;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use song_catalog_shared::song_store::SqliteSongStore;
use tracing_subscriber::EnvFilter;

use crate::{config::AppConfig, metadata_client::MetadataClient, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // .env may carry RUST_LOG, so load it before the subscriber.
    let dotenv = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match dotenv {
        Ok(path) => tracing::info!("Loaded environment from {}", path.display()),
        Err(err) if err.not_found() => {},
        Err(err) => return Err(err).context("failed to load .env"),
    }

    let config = AppConfig::from_env()?;
    run(config).await
}

async fn run(config: AppConfig) -> Result<()> {
    tracing::info!("Starting song catalog server");
    tracing::info!("Song database: {}", config.db_path.display());

    let store = SqliteSongStore::open(&config.db_path)?;
    tracing::info!("Schema at version {}", store.schema_version()?);

    let metadata = MetadataClient::new(&config.music_api_url, config.music_api_timeout)?;
    tracing::info!("Metadata lookups go to {}", metadata.info_url());

    let app = routes::create_router(AppState::new(Arc::new(store), metadata));

    let addr = config.listen_addr();
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
