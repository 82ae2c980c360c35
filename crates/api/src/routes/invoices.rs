//! Invoice management routes.
//!
//! The analyze/confirm split mirrors the upload flow: `analyze` stores the
//! files and returns the extractor's reading for the operator to verify,
//! `confirm` persists what the operator approved.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::routes::{entity_key, error_response, internal_error};
use bilans_core::extraction::{DocumentFile, ExtractionError, MediaType};
use bilans_core::matching::REVERSE_AMOUNT_TOLERANCE;
use bilans_db::entities::sea_orm_active_enums::{
    BusinessEntity, InvoiceSource, InvoiceStatus, SettlementStatus,
};
use bilans_db::repositories::{
    CreateInvoiceInput, HistoryRepository, InvoiceError, InvoiceRepository, ReconciliationService,
    SettlementRepository, UpdateInvoiceInput, actions,
};

/// Creates the invoice routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(list_invoices))
        .route("/invoices/analyze", post(analyze_invoice))
        .route("/invoices/confirm", post(confirm_invoice))
        .route("/invoices/{id}", put(update_invoice).delete(delete_invoice))
}

/// Query parameters for listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Optional entity filter.
    pub entity: Option<BusinessEntity>,
}

/// Request body for confirming an analyzed invoice.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmInvoiceRequest {
    /// Business entity the invoice belongs to.
    pub entity: BusinessEntity,
    /// Invoice number as printed.
    pub invoice_number: String,
    /// Counterparty name.
    pub contractor_name: String,
    /// Counterparty tax id.
    #[serde(default)]
    pub contractor_nip: Option<String>,
    /// Counterparty address.
    #[serde(default)]
    pub contractor_address: Option<String>,
    /// Net amount.
    #[serde(default)]
    pub net_amount: Option<Decimal>,
    /// VAT amount.
    #[serde(default)]
    pub vat_amount: Option<Decimal>,
    /// Gross amount due.
    pub gross_amount: Decimal,
    /// Currency code; defaults to PLN.
    #[serde(default)]
    pub currency: Option<String>,
    /// Issue date.
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    /// Sale date.
    #[serde(default)]
    pub sale_date: Option<NaiveDate>,
    /// Payment due date.
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    /// Bank account to pay into.
    #[serde(default)]
    pub account_number: Option<String>,
    /// Payment method.
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Cost category.
    #[serde(default)]
    pub category: Option<String>,
    /// Storage keys returned by analyze.
    #[serde(default)]
    pub document_keys: Vec<String>,
    /// Raw extraction payload, kept for audit.
    #[serde(default)]
    pub raw_extracted: Option<serde_json::Value>,
}

/// Request body for editing an invoice.
///
/// Absent fields stay unchanged; for the nullable ones an explicit JSON
/// `null` clears the stored value, hence the double `Option`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    /// New invoice number.
    #[serde(default)]
    pub invoice_number: Option<String>,
    /// New counterparty name.
    #[serde(default)]
    pub contractor_name: Option<String>,
    /// New counterparty tax id.
    #[serde(default, deserialize_with = "double_option")]
    pub contractor_nip: Option<Option<String>>,
    /// New issue date.
    #[serde(default, deserialize_with = "double_option")]
    pub issue_date: Option<Option<NaiveDate>>,
    /// New sale date.
    #[serde(default, deserialize_with = "double_option")]
    pub sale_date: Option<Option<NaiveDate>>,
    /// New payment date.
    #[serde(default, deserialize_with = "double_option")]
    pub payment_date: Option<Option<NaiveDate>>,
    /// New net amount.
    #[serde(default, deserialize_with = "double_option")]
    pub net_amount: Option<Option<Decimal>>,
    /// New VAT amount.
    #[serde(default, deserialize_with = "double_option")]
    pub vat_amount: Option<Option<Decimal>>,
    /// New gross amount.
    #[serde(default)]
    pub gross_amount: Option<Decimal>,
    /// New account number.
    #[serde(default, deserialize_with = "double_option")]
    pub account_number: Option<Option<String>>,
    /// New payment method.
    #[serde(default, deserialize_with = "double_option")]
    pub payment_method: Option<Option<String>>,
    /// New category.
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    /// New settlement status.
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
}

/// Keeps an explicit JSON `null` distinguishable from an absent field: a
/// present field always deserializes to `Some(..)`, with `null` becoming
/// `Some(None)`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// GET `/invoices` — list invoices, newest first.
async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let repo = InvoiceRepository::new((*state.db).clone());
    match repo.list(query.entity).await {
        Ok(invoices) => Json(invoices).into_response(),
        Err(e) => internal_error(&e),
    }
}

/// POST `/invoices/analyze` — store the uploaded documents, extract invoice
/// fields and look for a payment that already seems to cover them.
async fn analyze_invoice(
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

    let extracted = match state.extractor.extract_invoice(&upload.files).await {
        Ok(extracted) => extracted,
        Err(e) => return extraction_error(&e),
    };

    let potential_match = match find_potential_match(&state, upload.entity, extracted.gross_amount)
        .await
    {
        Ok(potential) => potential,
        Err(response) => return response,
    };

    Json(json!({
        "extracted": extracted,
        "documentKeys": document_keys,
        "potentialMatch": potential_match
    }))
    .into_response()
}

/// POST `/invoices/confirm` — persist an operator-approved invoice and try
/// to link it to already-recorded payments.
async fn confirm_invoice(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmInvoiceRequest>,
) -> impl IntoResponse {
    let repo = InvoiceRepository::new((*state.db).clone());
    let entity = payload.entity;

    let input = CreateInvoiceInput {
        entity,
        invoice_number: payload.invoice_number,
        contractor_name: payload.contractor_name,
        contractor_nip: payload.contractor_nip,
        contractor_address: payload.contractor_address,
        net_amount: payload.net_amount,
        vat_amount: payload.vat_amount,
        gross_amount: payload.gross_amount,
        currency: payload.currency,
        issue_date: payload.issue_date,
        sale_date: payload.sale_date,
        payment_date: payload.payment_date,
        account_number: payload.account_number,
        payment_method: payload.payment_method,
        category: payload.category,
        source: InvoiceSource::Manual,
        external_reference_number: None,
        document_keys: payload.document_keys,
        raw_extracted: payload.raw_extracted,
    };

    let invoice = match repo.create(input).await {
        Ok(invoice) => invoice,
        Err(InvoiceError::Duplicate(existing)) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": "DUPLICATE_INVOICE",
                    "message": format!(
                        "Faktura {} już istnieje dla tego podmiotu",
                        existing.invoice_number
                    ),
                    "existing": existing
                })),
            )
                .into_response();
        }
        Err(e) => return internal_error(&e),
    };

    // Reverse reconciliation is best effort; the invoice already exists.
    let reconciliation = ReconciliationService::new((*state.db).clone());
    let linked = match reconciliation.reverse_reconcile(&invoice).await {
        Ok(linked) => linked,
        Err(e) => {
            warn!(invoice_id = %invoice.id, error = %e, "reverse reconciliation failed");
            0
        }
    };

    let history = HistoryRepository::new((*state.db).clone());
    if let Err(e) = history
        .record(
            Some(entity),
            actions::INVOICE_ADDED,
            &format!(
                "Dodano fakturę {} ({})",
                invoice.invoice_number, invoice.contractor_name
            ),
        )
        .await
    {
        error!(error = %e, "failed to record history");
    }

    // Reverse matching may have flipped the status; return the current row.
    let invoice = if linked > 0 {
        match repo.find_by_id(invoice.id).await {
            Ok(Some(current)) => current,
            Ok(None) | Err(_) => invoice,
        }
    } else {
        invoice
    };

    (StatusCode::CREATED, Json(invoice)).into_response()
}

/// PUT `/invoices/{id}` — edit invoice fields.
async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInvoiceRequest>,
) -> impl IntoResponse {
    let repo = InvoiceRepository::new((*state.db).clone());

    let input = UpdateInvoiceInput {
        invoice_number: payload.invoice_number,
        contractor_name: payload.contractor_name,
        contractor_nip: payload.contractor_nip,
        issue_date: payload.issue_date,
        sale_date: payload.sale_date,
        payment_date: payload.payment_date,
        net_amount: payload.net_amount,
        vat_amount: payload.vat_amount,
        gross_amount: payload.gross_amount,
        account_number: payload.account_number,
        payment_method: payload.payment_method,
        category: payload.category,
        status: payload.status,
    };

    let invoice = match repo.update(id, input).await {
        Ok(invoice) => invoice,
        Err(InvoiceError::NotFound(_)) => {
            return error_response(StatusCode::NOT_FOUND, "not_found", "Invoice not found");
        }
        Err(e) => return internal_error(&e),
    };

    let history = HistoryRepository::new((*state.db).clone());
    if let Err(e) = history
        .record(
            Some(invoice.entity),
            actions::INVOICE_UPDATED,
            &format!("Zaktualizowano fakturę {}", invoice.invoice_number),
        )
        .await
    {
        error!(error = %e, "failed to record history");
    }

    Json(invoice).into_response()
}

/// DELETE `/invoices/{id}` — detach matched payments, remove stored
/// documents and delete the invoice.
async fn delete_invoice(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    let repo = InvoiceRepository::new((*state.db).clone());
    let invoice = match repo.find_by_id(id).await {
        Ok(Some(invoice)) => invoice,
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, "not_found", "Invoice not found");
        }
        Err(e) => return internal_error(&e),
    };

    let reconciliation = ReconciliationService::new((*state.db).clone());
    let unlinked = match reconciliation.unlink_invoice(&invoice).await {
        Ok(unlinked) => unlinked,
        Err(e) => return internal_error(&e),
    };

    // Stored documents are removed best effort; a stale object is not worth
    // failing the delete over.
    for key in &invoice.document_keys.0 {
        if let Err(e) = state.storage.delete(key).await {
            warn!(key, error = %e, "failed to delete stored document");
        }
    }

    let deleted = match repo.delete(id).await {
        Ok(deleted) => deleted,
        Err(InvoiceError::NotFound(_)) => {
            return error_response(StatusCode::NOT_FOUND, "not_found", "Invoice not found");
        }
        Err(e) => return internal_error(&e),
    };

    let history = HistoryRepository::new((*state.db).clone());
    if let Err(e) = history
        .record(
            Some(deleted.entity),
            actions::INVOICE_DELETED,
            &format!("Usunięto fakturę {}", deleted.invoice_number),
        )
        .await
    {
        error!(error = %e, "failed to record history");
    }

    info!(invoice_id = %id, unlinked, "invoice deleted");
    Json(json!({ "deleted": deleted, "unlinkedPayments": unlinked })).into_response()
}

/// An entity-tagged multipart upload, read fully into memory.
pub(crate) struct Upload {
    pub entity: BusinessEntity,
    pub files: Vec<DocumentFile>,
}

/// Reads the `entity` field and all files from a multipart body.
pub(crate) async fn read_upload(
    mut multipart: Multipart,
) -> Result<Upload, axum::response::Response> {
    let mut entity = None;
    let mut files = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    "invalid_multipart",
                    &e.to_string(),
                ));
            }
        };

        if let Some(file_name) = field.file_name().map(ToString::to_string) {
            let Some(media_type) = MediaType::from_file_name(&file_name) else {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    "unsupported_file",
                    &format!("Unsupported file type: {file_name}"),
                ));
            };
            let bytes = match field.bytes().await {
                Ok(bytes) => bytes.to_vec(),
                Err(e) => {
                    return Err(error_response(
                        StatusCode::BAD_REQUEST,
                        "invalid_multipart",
                        &e.to_string(),
                    ));
                }
            };
            files.push(DocumentFile {
                file_name,
                media_type,
                bytes,
            });
        } else if field.name() == Some("entity") {
            let value = field.text().await.unwrap_or_default();
            entity = crate::routes::parse_entity(&value);
            if entity.is_none() {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    "invalid_entity",
                    &format!("Unknown entity: {value}"),
                ));
            }
        }
    }

    let Some(entity) = entity else {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "missing_entity",
            "The entity field is required",
        ));
    };
    Ok(Upload { entity, files })
}

/// Maps extraction failures onto the error envelope.
pub(crate) fn extraction_error(err: &ExtractionError) -> axum::response::Response {
    error!(error = %err, "extraction failed");
    match err {
        ExtractionError::NotConfigured(_) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "extraction_not_configured",
            "Document extraction is not configured",
        ),
        ExtractionError::UnsupportedFile(name) => error_response(
            StatusCode::BAD_REQUEST,
            "unsupported_file",
            &format!("Unsupported file type: {name}"),
        ),
        _ => error_response(
            StatusCode::BAD_GATEWAY,
            "extraction_failed",
            "Document extraction failed",
        ),
    }
}

/// Loads the entity's settlements and looks for a payment that already
/// seems to cover the extracted amount.
async fn find_potential_match(
    state: &AppState,
    entity: BusinessEntity,
    gross_amount: Decimal,
) -> Result<Option<serde_json::Value>, axum::response::Response> {
    let repo = SettlementRepository::new((*state.db).clone());
    match repo.list(Some(entity)).await {
        Ok(settlements) => Ok(scan_for_potential_match(&settlements, gross_amount)),
        Err(e) => Err(internal_error(&e)),
    }
}

/// Scans processed settlements for an unmatched payment whose amount is
/// within the loose tolerance of what the extractor read. Settlements still
/// pending or in error carry unverified rows and are skipped.
fn scan_for_potential_match(
    settlements: &[bilans_db::entities::settlements::Model],
    gross_amount: Decimal,
) -> Option<serde_json::Value> {
    for settlement in settlements {
        if settlement.status != SettlementStatus::Processed {
            continue;
        }
        for payment in &settlement.payments.0 {
            let Some(amount) = payment.amount else {
                continue;
            };
            if payment.is_matched() {
                continue;
            }
            if (amount - gross_amount).abs() <= REVERSE_AMOUNT_TOLERANCE {
                return Some(json!({
                    "amount": amount,
                    "date": payment.date,
                    "contractor": payment.contractor,
                    "settlementFile": settlement.file_name
                }));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use bilans_core::matching::{Payment, PaymentKind};
    use bilans_db::entities::invoices::DocumentKeys;
    use bilans_db::entities::settlements::{self, PaymentsData};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn payment(amount: Decimal) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2026, 5, 12),
            amount: Some(amount),
            kind: PaymentKind::Incoming,
            contractor: "Gość hotelowy".into(),
            description: "Przelew przychodzący".into(),
            category: None,
            match_status: None,
            matched_invoice_id: None,
            matched_invoice_number: None,
        }
    }

    fn settlement(status: SettlementStatus, payments: Vec<Payment>) -> settlements::Model {
        let now = Utc::now().into();
        settlements::Model {
            id: Uuid::new_v4(),
            entity: BusinessEntity::ZlotyGron,
            file_name: "wyciag_maj.csv".into(),
            status,
            payments: PaymentsData(payments),
            matched_count: 0,
            document_keys: DocumentKeys(vec![]),
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_potential_match_found_in_processed_settlement() {
        let settlements = vec![settlement(
            SettlementStatus::Processed,
            vec![payment(dec!(1230.04))],
        )];

        let found = scan_for_potential_match(&settlements, dec!(1230.00));
        let found = found.unwrap();
        assert_eq!(found["settlementFile"], "wyciag_maj.csv");
        assert_eq!(found["contractor"], "Gość hotelowy");
    }

    #[test]
    fn test_unprocessed_settlements_are_skipped() {
        let settlements = vec![
            settlement(SettlementStatus::Pending, vec![payment(dec!(1230.00))]),
            settlement(SettlementStatus::Error, vec![payment(dec!(1230.00))]),
        ];

        assert_eq!(scan_for_potential_match(&settlements, dec!(1230.00)), None);
    }

    #[test]
    fn test_matched_and_amountless_payments_are_skipped() {
        let mut linked = payment(dec!(1230.00));
        linked.set_match(Uuid::new_v4(), "FV/3/2026");
        let mut blank = payment(dec!(0));
        blank.amount = None;

        let settlements = vec![settlement(SettlementStatus::Processed, vec![linked, blank])];

        assert_eq!(scan_for_potential_match(&settlements, dec!(1230.00)), None);
    }

    #[test]
    fn test_amount_outside_tolerance_is_not_offered() {
        let settlements = vec![settlement(
            SettlementStatus::Processed,
            vec![payment(dec!(1230.06))],
        )];

        assert_eq!(scan_for_potential_match(&settlements, dec!(1230.00)), None);
    }

    #[test]
    fn test_update_request_keeps_null_and_absent_apart() {
        let unchanged: UpdateInvoiceRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(unchanged.category, None);

        let cleared: UpdateInvoiceRequest =
            serde_json::from_str(r#"{"category": null}"#).unwrap();
        assert_eq!(cleared.category, Some(None));

        let replaced: UpdateInvoiceRequest =
            serde_json::from_str(r#"{"category": "Zakupy", "paymentDate": null}"#).unwrap();
        assert_eq!(replaced.category, Some(Some("Zakupy".to_string())));
        assert_eq!(replaced.payment_date, Some(None));
        assert_eq!(replaced.gross_amount, None);
    }
}
