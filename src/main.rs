//! sheet-spawner server entry point.
//!
//! Restores state from the record store, then starts the Axum HTTP server
//! with REST and WebSocket endpoints.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use sheet_spawner::api;
use sheet_spawner::app_state::AppState;
use sheet_spawner::config::{LogFormat, SpawnerConfig};
use sheet_spawner::domain::EventBus;
use sheet_spawner::provider::GeminiProvider;
use sheet_spawner::service::GenerationService;
use sheet_spawner::storage::RecordStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = SpawnerConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(
        addr = %config.listen_addr,
        data_dir = %config.data_dir.display(),
        concurrency = config.provider_concurrency,
        "starting sheet-spawner"
    );
    if config.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not set; requests must carry their own api_key");
    }

    // Build storage and provider
    let store = RecordStore::open(config.data_dir.clone())
        .await
        .with_context(|| format!("cannot open record store at {}", config.data_dir.display()))?;
    let provider = GeminiProvider::new(
        &config.gemini_base_url,
        &config.gemini_model,
        config.provider_timeout,
    )
    .context("cannot build provider client")?;

    // Build service layer
    let event_bus = EventBus::new(config.event_bus_capacity);
    let service = GenerationService::new(
        store,
        Arc::new(provider),
        event_bus,
        config.engine_settings(),
    );
    service
        .restore()
        .await
        .context("cannot restore state from record store")?;

    // Build application
    let app_state = AppState::new(service).with_max_upload_bytes(config.max_upload_bytes);
    let app = api::build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
