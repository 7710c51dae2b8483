//! Data room server.
//!
//! Serves the data room store and its search engine as a JSON API, persisting
//! all state into a local SQLite database.

use clap::Parser;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dataroom::api::{create_router, AppState};
use dataroom::config::Config;
use dataroom::search::{CachingExtractor, PdfiumExtractor, SearchEngine, DEFAULT_TEXT_CACHE_SIZE};
use dataroom::store::{DataRoomStore, SqliteBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration
    let config = Config::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting dataroom");
    tracing::info!("Database path: {}", config.db_path);
    tracing::info!("Max folder depth: {}", config.max_folder_depth);
    match config.quota() {
        Some(quota) => tracing::info!("Storage quota: {} bytes", quota),
        None => tracing::info!("Storage quota: disabled"),
    }

    // Ensure database directory exists
    let db_path = std::path::Path::new(&config.db_path);
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Open the store
    let backend = SqliteBackend::connect(&config.database_url(), config.quota()).await?;
    let store = DataRoomStore::open(Arc::new(backend), config.store_limits()).await?;

    let extractor = CachingExtractor::new(PdfiumExtractor::new(), DEFAULT_TEXT_CACHE_SIZE);
    let state = AppState {
        store: Arc::new(store),
        engine: SearchEngine::new(Arc::new(extractor)),
        upload_policy: config.upload_policy(),
    };

    // Create router
    let app = create_router(state).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.listen_addr, config.listen_port);
    tracing::info!("Server listening on http://{}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
