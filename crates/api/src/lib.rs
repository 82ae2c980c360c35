//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes for invoices, settlements, history and the registry
//! - Shared application state
//! - Request tracing and CORS layers

pub mod routes;

use axum::Router;
use bilans_core::extraction::DocumentExtractor;
use bilans_core::registry::RegistryClient;
use bilans_core::storage::DocumentStore;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Store for uploaded source documents.
    pub storage: Arc<DocumentStore>,
    /// Invoice and statement extractor.
    pub extractor: Arc<dyn DocumentExtractor>,
    /// E-invoice registry client.
    pub registry: Arc<RegistryClient>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
