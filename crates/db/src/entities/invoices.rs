//! `SeaORM` Entity for the invoices table.

use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{BusinessEntity, InvoiceSource, InvoiceStatus};

/// Storage keys of the uploaded source documents, kept as a JSONB array.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, FromJsonQueryResult)]
pub struct DocumentKeys(pub Vec<String>);

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub entity: BusinessEntity,
    pub invoice_number: String,
    pub contractor_name: String,
    pub contractor_nip: Option<String>,
    pub contractor_address: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))", nullable)]
    pub net_amount: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))", nullable)]
    pub vat_amount: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub gross_amount: Decimal,
    pub currency: String,
    pub issue_date: Option<Date>,
    pub sale_date: Option<Date>,
    pub payment_date: Option<Date>,
    pub account_number: Option<String>,
    pub payment_method: Option<String>,
    pub status: InvoiceStatus,
    pub category: Option<String>,
    pub source: InvoiceSource,
    /// Registry-wide reference number for imported e-invoices.
    pub external_reference_number: Option<String>,
    pub document_keys: DocumentKeys,
    /// Raw extraction payload, kept for traceability.
    pub raw_extracted: Option<Json>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// The slice of this invoice the match predicates need.
    #[must_use]
    pub fn to_candidate(&self) -> bilans_core::matching::InvoiceCandidate {
        bilans_core::matching::InvoiceCandidate {
            id: self.id,
            invoice_number: self.invoice_number.clone(),
            contractor_name: self.contractor_name.clone(),
            gross_amount: self.gross_amount,
        }
    }
}
