//! E-invoice registry routes.
//!
//! Fetch, dedup-check and import flow for invoices issued to the company in
//! the national registry. Import never aborts the batch: each row succeeds,
//! is skipped as a duplicate, or lands in the per-row error list.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::AppState;
use crate::routes::{error_response, internal_error};
use bilans_core::registry::{RegistryError, RegistryInvoice};
use bilans_db::entities::sea_orm_active_enums::{BusinessEntity, InvoiceSource};
use bilans_db::repositories::{
    CreateInvoiceInput, HistoryRepository, InvoiceRepository, actions,
};

/// Creates the registry routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/registry/status", get(session_status))
        .route("/registry/refresh", post(refresh_session))
        .route("/registry/invoices", post(fetch_invoices))
        .route("/registry/check-duplicates", post(check_duplicates))
        .route("/registry/import", post(import_invoices))
}

/// Request body for a date-range fetch.
#[derive(Debug, Deserialize)]
pub struct FetchRequest {
    /// Range start, inclusive.
    pub from: Option<NaiveDate>,
    /// Range end, inclusive.
    pub to: Option<NaiveDate>,
}

/// Request body for the duplicate check.
#[derive(Debug, Deserialize)]
pub struct CheckDuplicatesRequest {
    /// Entity the invoices would be imported into.
    pub entity: BusinessEntity,
    /// Fetched invoices to classify.
    pub invoices: Vec<RegistryInvoice>,
}

/// Request body for the import.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    /// Entity to import into.
    pub entity: BusinessEntity,
    /// Invoices to import.
    pub invoices: Vec<RegistryInvoice>,
    /// When true, duplicates are counted and skipped instead of erroring.
    #[serde(default)]
    pub skip_duplicates: bool,
}

/// GET `/registry/status` — current session state.
async fn session_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.status().await)
}

/// POST `/registry/refresh` — open or reuse a session.
async fn refresh_session(State(state): State<AppState>) -> impl IntoResponse {
    match state.registry.refresh().await {
        Ok((status, already_valid)) => Json(json!({
            "status": status,
            "alreadyValid": already_valid
        }))
        .into_response(),
        Err(e) => registry_error(&e),
    }
}

/// POST `/registry/invoices` — fetch invoice headers for a date range.
async fn fetch_invoices(
    State(state): State<AppState>,
    Json(payload): Json<FetchRequest>,
) -> impl IntoResponse {
    let (Some(from), Some(to)) = (payload.from, payload.to) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing_range",
            "Both from and to dates are required",
        );
    };

    match state.registry.fetch_invoices(from, to).await {
        Ok(invoices) => Json(json!({ "invoices": invoices })).into_response(),
        Err(e) => registry_error(&e),
    }
}

/// POST `/registry/check-duplicates` — classify fetched invoices against
/// what is already in the database.
async fn check_duplicates(
    State(state): State<AppState>,
    Json(payload): Json<CheckDuplicatesRequest>,
) -> impl IntoResponse {
    let repo = InvoiceRepository::new((*state.db).clone());

    let mut duplicates = Vec::new();
    let mut new_invoices = Vec::new();
    for invoice in payload.invoices {
        match is_duplicate(&repo, payload.entity, &invoice).await {
            Ok(true) => duplicates.push(invoice),
            Ok(false) => new_invoices.push(invoice),
            Err(e) => return internal_error(&e),
        }
    }

    Json(json!({
        "duplicates": duplicates,
        "newInvoices": new_invoices,
        "hasDuplicates": !duplicates.is_empty()
    }))
    .into_response()
}

/// POST `/registry/import` — persist fetched invoices as unpaid externals.
async fn import_invoices(
    State(state): State<AppState>,
    Json(payload): Json<ImportRequest>,
) -> impl IntoResponse {
    let repo = InvoiceRepository::new((*state.db).clone());

    let mut imported = 0_usize;
    let mut skipped = 0_usize;
    let mut errors = Vec::new();

    for invoice in payload.invoices {
        if payload.skip_duplicates {
            match is_duplicate(&repo, payload.entity, &invoice).await {
                Ok(true) => {
                    skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => return internal_error(&e),
            }
        }

        let number = invoice.invoice_number.clone();
        match repo.create(to_create_input(payload.entity, invoice)).await {
            Ok(_) => imported += 1,
            Err(e) => {
                error!(invoice_number = %number, error = %e, "registry import row failed");
                errors.push(json!({
                    "invoiceNumber": number,
                    "error": e.to_string()
                }));
            }
        }
    }

    let history = HistoryRepository::new((*state.db).clone());
    if let Err(e) = history
        .record(
            Some(payload.entity),
            actions::REGISTRY_IMPORT,
            &format!("Zaimportowano {imported} faktur z rejestru (pominięto {skipped})"),
        )
        .await
    {
        error!(error = %e, "failed to record history");
    }

    info!(imported, skipped, errors = errors.len(), "registry import finished");
    Json(json!({
        "imported": imported,
        "skipped": skipped,
        "errors": errors
    }))
    .into_response()
}

/// A fetched invoice is a duplicate when its reference number is already
/// known, or an invoice with the same number exists for the entity.
async fn is_duplicate(
    repo: &InvoiceRepository,
    entity: BusinessEntity,
    invoice: &RegistryInvoice,
) -> Result<bool, bilans_db::repositories::InvoiceError> {
    if repo
        .find_by_external_reference(&invoice.reference_number)
        .await?
        .is_some()
    {
        return Ok(true);
    }
    Ok(repo
        .find_by_number(entity, &invoice.invoice_number)
        .await?
        .is_some())
}

fn to_create_input(entity: BusinessEntity, invoice: RegistryInvoice) -> CreateInvoiceInput {
    let invoice_number = if invoice.invoice_number.is_empty() {
        format!("KSEF-{}", invoice.reference_number)
    } else {
        invoice.invoice_number
    };
    CreateInvoiceInput {
        entity,
        invoice_number,
        contractor_name: invoice.contractor_name,
        contractor_nip: (!invoice.contractor_nip.is_empty()).then_some(invoice.contractor_nip),
        contractor_address: None,
        net_amount: Some(invoice.net_amount),
        vat_amount: Some(invoice.vat_amount),
        gross_amount: invoice.gross_amount,
        currency: Some(invoice.currency),
        issue_date: invoice.issue_date,
        sale_date: None,
        payment_date: None,
        account_number: None,
        payment_method: None,
        category: None,
        source: InvoiceSource::ExternalEfaktura,
        external_reference_number: Some(invoice.reference_number),
        document_keys: Vec::new(),
        raw_extracted: None,
    }
}

fn registry_error(err: &RegistryError) -> axum::response::Response {
    error!(error = %err, "registry request failed");
    match err {
        RegistryError::NotConfigured(_) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "registry_not_configured",
            "The e-invoice registry is not configured",
        ),
        RegistryError::AuthRejected => error_response(
            StatusCode::BAD_GATEWAY,
            "registry_auth_rejected",
            "The registry rejected our credentials",
        ),
        _ => error_response(
            StatusCode::BAD_GATEWAY,
            "registry_unavailable",
            "The registry request failed",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fetched(number: &str, reference: &str) -> RegistryInvoice {
        RegistryInvoice {
            reference_number: reference.to_string(),
            invoice_number: number.to_string(),
            issue_date: NaiveDate::from_ymd_opt(2026, 5, 10),
            contractor_name: "Dostawca Sp. z o.o.".into(),
            contractor_nip: "5272000000".into(),
            gross_amount: dec!(1230.00),
            net_amount: dec!(1000.00),
            vat_amount: dec!(230.00),
            currency: "PLN".into(),
        }
    }

    #[test]
    fn test_import_input_keeps_reference_and_source() {
        let input = to_create_input(BusinessEntity::ZlotyGron, fetched("FV/5/2026", "ref-123"));
        assert_eq!(input.invoice_number, "FV/5/2026");
        assert_eq!(input.external_reference_number.as_deref(), Some("ref-123"));
        assert_eq!(input.source, InvoiceSource::ExternalEfaktura);
        assert_eq!(input.gross_amount, dec!(1230.00));
    }

    #[test]
    fn test_import_input_falls_back_to_reference_number() {
        let input = to_create_input(BusinessEntity::SrebrnyBucznik, fetched("", "ref-9"));
        assert_eq!(input.invoice_number, "KSEF-ref-9");
    }

    #[test]
    fn test_import_input_drops_empty_nip() {
        let mut invoice = fetched("FV/1/2026", "r");
        invoice.contractor_nip = String::new();
        let input = to_create_input(BusinessEntity::ZlotyGron, invoice);
        assert!(input.contractor_nip.is_none());
    }
}
