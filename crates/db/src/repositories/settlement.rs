//! Settlement repository for database operations.

use bilans_core::matching::Payment;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::{
    invoices::DocumentKeys,
    sea_orm_active_enums::{BusinessEntity, SettlementStatus},
    settlements,
    settlements::PaymentsData,
};

/// Error types for settlement operations.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    /// Settlement not found.
    #[error("settlement not found: {0}")]
    NotFound(Uuid),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// Settlement repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct SettlementRepository {
    db: DatabaseConnection,
}

impl SettlementRepository {
    /// Creates a new settlement repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists settlements, newest first, optionally scoped to one entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(
        &self,
        entity: Option<BusinessEntity>,
    ) -> Result<Vec<settlements::Model>, SettlementError> {
        let mut query = settlements::Entity::find();
        if let Some(entity) = entity {
            query = query.filter(settlements::Column::Entity.eq(entity));
        }
        Ok(query
            .order_by_desc(settlements::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Finds a settlement by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<settlements::Model>, SettlementError> {
        Ok(settlements::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// All settlements for one entity, for reverse-reconciliation scans.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn for_entity(
        &self,
        entity: BusinessEntity,
    ) -> Result<Vec<settlements::Model>, SettlementError> {
        Ok(settlements::Entity::find()
            .filter(settlements::Column::Entity.eq(entity))
            .order_by_asc(settlements::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Inserts a settlement row on the given connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn insert_on<C: ConnectionTrait>(
        conn: &C,
        entity: BusinessEntity,
        file_name: &str,
        document_keys: Vec<String>,
        payments: Vec<Payment>,
        matched_count: i32,
        status: SettlementStatus,
    ) -> Result<settlements::Model, DbErr> {
        let now = Utc::now().into();
        settlements::ActiveModel {
            id: Set(Uuid::new_v4()),
            entity: Set(entity),
            file_name: Set(file_name.to_string()),
            status: Set(status),
            payments: Set(PaymentsData(payments)),
            matched_count: Set(matched_count),
            document_keys: Set(DocumentKeys(document_keys)),
            error_message: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await
    }

    /// Rewrites a settlement's payment list and matched counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn save_payments<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
        payments: Vec<Payment>,
        matched_count: i32,
        status: Option<SettlementStatus>,
    ) -> Result<settlements::Model, DbErr> {
        let mut active = settlements::ActiveModel {
            id: Set(id),
            payments: Set(PaymentsData(payments)),
            matched_count: Set(matched_count),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if let Some(status) = status {
            active.status = Set(status);
        }
        active.update(conn).await
    }

    /// Deletes a settlement and returns the deleted row.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::NotFound`] when the settlement does not
    /// exist.
    pub async fn delete(&self, id: Uuid) -> Result<settlements::Model, SettlementError> {
        let settlement = self
            .find_by_id(id)
            .await?
            .ok_or(SettlementError::NotFound(id))?;

        settlements::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(settlement)
    }
}
