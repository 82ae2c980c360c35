//! History repository for the append-only operation log.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::{history, sea_orm_active_enums::BusinessEntity};

/// Well-known history action names.
pub mod actions {
    /// An invoice was confirmed into the books.
    pub const INVOICE_ADDED: &str = "INVOICE_ADDED";
    /// An invoice's fields were edited.
    pub const INVOICE_UPDATED: &str = "INVOICE_UPDATED";
    /// An invoice was deleted.
    pub const INVOICE_DELETED: &str = "INVOICE_DELETED";
    /// A payment was automatically matched to an invoice.
    pub const PAYMENT_MATCHED: &str = "PAYMENT_MATCHED";
    /// A payment was linked to an invoice by hand.
    pub const PAYMENT_LINKED: &str = "PAYMENT_LINKED";
    /// A payment's link was removed by hand.
    pub const PAYMENT_UNLINKED: &str = "PAYMENT_UNLINKED";
    /// A statement batch finished reconciliation.
    pub const SETTLEMENT_PROCESSED: &str = "SETTLEMENT_PROCESSED";
    /// A settlement was deleted.
    pub const SETTLEMENT_DELETED: &str = "SETTLEMENT_DELETED";
    /// Invoices were imported from the e-invoice registry.
    pub const REGISTRY_IMPORT: &str = "REGISTRY_IMPORT";
}

/// History repository.
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    db: DatabaseConnection,
}

impl HistoryRepository {
    /// Creates a new history repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends one history row.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn record(
        &self,
        entity: Option<BusinessEntity>,
        action: &str,
        description: &str,
    ) -> Result<history::Model, DbErr> {
        Self::record_on(&self.db, entity, action, description).await
    }

    /// Appends one history row on the given connection, so log entries can
    /// join the transaction they describe.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn record_on<C: ConnectionTrait>(
        conn: &C,
        entity: Option<BusinessEntity>,
        action: &str,
        description: &str,
    ) -> Result<history::Model, DbErr> {
        history::ActiveModel {
            id: Set(Uuid::new_v4()),
            entity: Set(entity),
            action: Set(action.to_string()),
            description: Set(Some(description.to_string())),
            created_at: Set(chrono::Utc::now().into()),
        }
        .insert(conn)
        .await
    }

    /// Lists history rows, newest first, optionally scoped to one entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(
        &self,
        entity: Option<BusinessEntity>,
    ) -> Result<Vec<history::Model>, DbErr> {
        let mut query = history::Entity::find();
        if let Some(entity) = entity {
            query = query.filter(history::Column::Entity.eq(entity));
        }
        query
            .order_by_desc(history::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    /// Deletes history rows, optionally scoped to one entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn clear(&self, entity: Option<BusinessEntity>) -> Result<u64, DbErr> {
        let mut query = history::Entity::delete_many();
        if let Some(entity) = entity {
            query = query.filter(history::Column::Entity.eq(entity));
        }
        let result = query.exec(&self.db).await?;
        Ok(result.rows_affected)
    }
}
