//! Postgres enum types shared by the entities.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The business entity the record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "business_entity")]
#[serde(rename_all = "snake_case")]
pub enum BusinessEntity {
    /// Hotel Złoty Groń.
    #[sea_orm(string_value = "zloty_gron")]
    ZlotyGron,
    /// Restauracja Srebrny Bucznik.
    #[sea_orm(string_value = "srebrny_bucznik")]
    SrebrnyBucznik,
}

/// Invoice settlement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "invoice_status")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// No payment has been matched yet.
    #[sea_orm(string_value = "unpaid")]
    Unpaid,
    /// A payment covering the gross amount was matched.
    #[sea_orm(string_value = "paid")]
    Paid,
    /// A payment was matched but does not cover the gross amount.
    #[sea_orm(string_value = "partial")]
    Partial,
}

/// Where an invoice entered the system from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "invoice_source")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceSource {
    /// Entered or uploaded by hand.
    #[sea_orm(string_value = "manual")]
    Manual,
    /// Created from a parsed statement or CSV import.
    #[sea_orm(string_value = "csv")]
    Csv,
    /// Imported from the national e-invoice registry.
    #[sea_orm(string_value = "external_efaktura")]
    ExternalEfaktura,
}

/// Settlement processing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "settlement_status")]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    /// Uploaded, not yet analyzed.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Analysis or reconciliation in progress.
    #[sea_orm(string_value = "processing")]
    Processing,
    /// Reconciliation finished.
    #[sea_orm(string_value = "processed")]
    Processed,
    /// Analysis failed; see the error message.
    #[sea_orm(string_value = "error")]
    Error,
}
