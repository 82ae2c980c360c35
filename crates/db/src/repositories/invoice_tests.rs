//! Tests for the invoice repository contract.
//!
//! The duplicate guard runs before any insert, so a conflict must surface
//! the colliding row and leave the table as it was.

use chrono::Utc;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::entities::invoices::{self, DocumentKeys};
use crate::entities::sea_orm_active_enums::{BusinessEntity, InvoiceSource, InvoiceStatus};
use crate::repositories::invoice::InvoiceError;
use crate::repositories::InvoiceRepository;

fn stored_invoice(number: &str) -> invoices::Model {
    let now = Utc::now().into();
    invoices::Model {
        id: Uuid::new_v4(),
        entity: BusinessEntity::ZlotyGron,
        invoice_number: number.to_string(),
        contractor_name: "Dostawca Sp. z o.o.".into(),
        contractor_nip: Some("5272000000".into()),
        contractor_address: None,
        net_amount: Some(dec!(1000.00)),
        vat_amount: Some(dec!(230.00)),
        gross_amount: dec!(1230.00),
        currency: "PLN".into(),
        issue_date: None,
        sale_date: None,
        payment_date: None,
        account_number: None,
        payment_method: None,
        status: InvoiceStatus::Unpaid,
        category: None,
        source: InvoiceSource::Manual,
        external_reference_number: None,
        document_keys: DocumentKeys(vec![]),
        raw_extracted: None,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn test_duplicate_conflict_carries_the_existing_record() {
    let existing = stored_invoice("FV/7/2026");
    let existing_id = existing.id;

    let err = InvoiceRepository::reject_duplicate(Some(existing)).unwrap_err();

    match err {
        InvoiceError::Duplicate(model) => {
            assert_eq!(model.id, existing_id);
            assert_eq!(model.invoice_number, "FV/7/2026");
            assert_eq!(model.gross_amount, dec!(1230.00));
        }
        other => panic!("expected duplicate conflict, got {other:?}"),
    }
}

#[test]
fn test_duplicate_conflict_names_the_number() {
    let err = InvoiceRepository::reject_duplicate(Some(stored_invoice("FV/7/2026"))).unwrap_err();
    assert_eq!(err.to_string(), "invoice FV/7/2026 already exists");
}

#[test]
fn test_no_collision_passes_through() {
    assert!(InvoiceRepository::reject_duplicate(None).is_ok());
}
