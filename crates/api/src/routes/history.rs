//! Operation history routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use serde_json::json;

use crate::AppState;
use crate::routes::internal_error;
use bilans_db::entities::sea_orm_active_enums::BusinessEntity;
use bilans_db::repositories::HistoryRepository;

/// Creates the history routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/history", get(list_history).delete(clear_history))
}

/// Query parameters for listing and clearing.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Optional entity filter.
    pub entity: Option<BusinessEntity>,
}

/// GET `/history` — list entries, newest first.
async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let repo = HistoryRepository::new((*state.db).clone());
    match repo.list(query.entity).await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => internal_error(&e),
    }
}

/// DELETE `/history` — bulk clear, optionally scoped to one entity.
async fn clear_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let repo = HistoryRepository::new((*state.db).clone());
    match repo.clear(query.entity).await {
        Ok(deleted) => Json(json!({ "deleted": deleted })).into_response(),
        Err(e) => internal_error(&e),
    }
}
