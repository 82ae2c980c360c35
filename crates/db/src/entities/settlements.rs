//! `SeaORM` Entity for the settlements table.

use bilans_core::matching::Payment;
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::invoices::DocumentKeys;
use super::sea_orm_active_enums::{BusinessEntity, SettlementStatus};

/// The settlement's payment rows, kept as a JSONB array.
///
/// Settlements exclusively own their payments; there is no payments table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, FromJsonQueryResult)]
pub struct PaymentsData(pub Vec<Payment>);

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "settlements")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub entity: BusinessEntity,
    pub file_name: String,
    pub status: SettlementStatus,
    pub payments: PaymentsData,
    /// Count of matched payments; recomputed by the integrity audit.
    pub matched_count: i32,
    pub document_keys: DocumentKeys,
    pub error_message: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
