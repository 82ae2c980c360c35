//! Bilans API Server
//!
//! Main entry point for the Bilans backend service.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bilans_api::{AppState, create_router};
use bilans_core::extraction::ClaudeExtractor;
use bilans_core::registry::RegistryClient;
use bilans_core::storage::DocumentStore;
use bilans_db::connect;
use bilans_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bilans=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Connect to database
    let db = connect(&config.database.url).await?;
    info!("Connected to database");

    // Document store (fs in dev, s3 in production)
    let storage = DocumentStore::from_config(&config.storage)?;
    info!(backend = %config.storage.backend, "Document store configured");

    // Extraction model client
    let extractor = ClaudeExtractor::new(config.extraction.clone())?;
    info!(model = %config.extraction.model, "Extractor configured");

    // E-invoice registry client
    let registry = RegistryClient::new(config.registry.clone())?;

    // Create application state
    let state = AppState {
        db: Arc::new(db),
        storage: Arc::new(storage),
        extractor: Arc::new(extractor),
        registry: Arc::new(registry),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
