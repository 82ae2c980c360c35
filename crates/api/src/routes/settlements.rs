//! Settlement management routes.
//!
//! Listing runs the integrity auditor first, so stale matches are repaired
//! before anyone looks at them.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::routes::{entity_key, error_response, internal_error};
use crate::routes::invoices::{extraction_error, read_upload};
use bilans_core::reconcile::PaymentDraft;
use bilans_core::statement::parse_statement_csv;
use bilans_db::entities::sea_orm_active_enums::BusinessEntity;
use bilans_db::repositories::{
    HistoryRepository, ReconciliationError, ReconciliationService, SettlementError,
    SettlementRepository, actions,
};

/// Creates the settlement routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/settlements", get(list_settlements))
        .route("/settlements/analyze", post(analyze_settlement))
        .route("/settlements/confirm", post(confirm_settlement))
        .route("/settlements/{id}", delete(delete_settlement))
        .route(
            "/settlements/{settlement_id}/payments/{payment_id}/link",
            post(link_payment),
        )
        .route(
            "/settlements/{settlement_id}/payments/{payment_id}/unlink",
            post(unlink_payment),
        )
}

/// Query parameters for listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Optional entity filter.
    pub entity: Option<BusinessEntity>,
}

/// Request body for confirming an analyzed settlement.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmSettlementRequest {
    /// Business entity the settlement belongs to.
    pub entity: BusinessEntity,
    /// Display name of the statement file.
    pub file_name: String,
    /// Storage keys returned by analyze.
    #[serde(default)]
    pub document_keys: Vec<String>,
    /// Payment rows as verified by the operator.
    pub payments: Vec<PaymentDraft>,
}

/// Request body for manually linking a payment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPaymentRequest {
    /// Invoice to link the payment to.
    pub invoice_id: Uuid,
}

/// GET `/settlements` — heal, then list.
async fn list_settlements(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let reconciliation = ReconciliationService::new((*state.db).clone());
    match reconciliation.heal_settlements(query.entity).await {
        Ok(outcome) => {
            if outcome.healed > 0 {
                info!(healed = outcome.healed, "settlement integrity repaired");
            }
            Json(outcome.settlements).into_response()
        }
        Err(e) => internal_error(&e),
    }
}

/// POST `/settlements/analyze` — store the statement files and turn them
/// into payment drafts, via the CSV parser or the extractor.
async fn analyze_settlement(
    State(state): State<AppState>,
    multipart: Multipart,
) -> impl IntoResponse {
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };
    if upload.files.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "no_files", "No files uploaded");
    }

    let mut document_keys = Vec::with_capacity(upload.files.len());
    for file in &upload.files {
        match state
            .storage
            .store(entity_key(upload.entity), &file.file_name, file.bytes.clone())
            .await
        {
            Ok(key) => document_keys.push(key),
            Err(e) => return internal_error(&e),
        }
    }

    // Bank CSV exports are parsed locally; everything else goes to the model.
    let mut drafts: Vec<PaymentDraft> = Vec::new();
    let mut for_extractor = Vec::new();
    for file in upload.files {
        if file.file_name.to_lowercase().ends_with(".csv") {
            drafts.extend(parse_statement_csv(&file.bytes));
        } else {
            for_extractor.push(file);
        }
    }
    if !for_extractor.is_empty() {
        match state.extractor.extract_statement(&for_extractor).await {
            Ok(extracted) => drafts.extend(extracted),
            Err(e) => return extraction_error(&e),
        }
    }

    let file_name = document_keys
        .first()
        .and_then(|key| key.rsplit('/').next())
        .unwrap_or("wyciag")
        .to_string();

    Json(json!({
        "fileName": file_name,
        "documentKeys": document_keys,
        "payments": drafts
    }))
    .into_response()
}

/// POST `/settlements/confirm` — run forward reconciliation over the
/// verified payments and persist the settlement.
async fn confirm_settlement(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmSettlementRequest>,
) -> impl IntoResponse {
    if payload.payments.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "no_payments",
            "The settlement has no payments",
        );
    }

    let reconciliation = ReconciliationService::new((*state.db).clone());
    match reconciliation
        .confirm_settlement(
            payload.entity,
            &payload.file_name,
            payload.document_keys,
            &payload.payments,
        )
        .await
    {
        Ok(settlement) => (StatusCode::CREATED, Json(settlement)).into_response(),
        Err(e) => internal_error(&e),
    }
}

/// DELETE `/settlements/{id}` — remove a settlement and its stored files.
async fn delete_settlement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = SettlementRepository::new((*state.db).clone());
    let deleted = match repo.delete(id).await {
        Ok(deleted) => deleted,
        Err(SettlementError::NotFound(_)) => {
            return error_response(StatusCode::NOT_FOUND, "not_found", "Settlement not found");
        }
        Err(e) => return internal_error(&e),
    };

    for key in &deleted.document_keys.0 {
        if let Err(e) = state.storage.delete(key).await {
            warn!(key, error = %e, "failed to delete stored document");
        }
    }

    let history = HistoryRepository::new((*state.db).clone());
    if let Err(e) = history
        .record(
            Some(deleted.entity),
            actions::SETTLEMENT_DELETED,
            &format!("Usunięto rozliczenie {}", deleted.file_name),
        )
        .await
    {
        error!(error = %e, "failed to record history");
    }

    Json(json!({ "deleted": deleted })).into_response()
}

/// POST `/settlements/{sid}/payments/{pid}/link` — manual override.
async fn link_payment(
    State(state): State<AppState>,
    Path((settlement_id, payment_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<LinkPaymentRequest>,
) -> impl IntoResponse {
    let reconciliation = ReconciliationService::new((*state.db).clone());
    match reconciliation
        .manual_link(settlement_id, payment_id, payload.invoice_id)
        .await
    {
        Ok(settlement) => Json(settlement).into_response(),
        Err(e) => reconciliation_error(e),
    }
}

/// POST `/settlements/{sid}/payments/{pid}/unlink` — undo a link.
async fn unlink_payment(
    State(state): State<AppState>,
    Path((settlement_id, payment_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    let reconciliation = ReconciliationService::new((*state.db).clone());
    match reconciliation.manual_unlink(settlement_id, payment_id).await {
        Ok(settlement) => Json(settlement).into_response(),
        Err(e) => reconciliation_error(e),
    }
}

fn reconciliation_error(err: ReconciliationError) -> axum::response::Response {
    match err {
        ReconciliationError::SettlementNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "not_found", "Settlement not found")
        }
        ReconciliationError::InvoiceNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "not_found", "Invoice not found")
        }
        ReconciliationError::PaymentNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "not_found", "Payment not found")
        }
        ReconciliationError::Database(e) => internal_error(&e),
    }
}
