//! Invoice repository for database operations.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::entities::{
    invoices,
    invoices::DocumentKeys,
    sea_orm_active_enums::{BusinessEntity, InvoiceSource, InvoiceStatus},
};

/// Error types for invoice operations.
#[derive(Debug, thiserror::Error)]
pub enum InvoiceError {
    /// Invoice not found.
    #[error("invoice not found: {0}")]
    NotFound(Uuid),

    /// An invoice with the same number already exists for the entity.
    #[error("invoice {} already exists", .0.invoice_number)]
    Duplicate(Box<invoices::Model>),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoiceInput {
    /// Business entity the invoice belongs to.
    pub entity: BusinessEntity,
    /// Invoice number as printed.
    pub invoice_number: String,
    /// Counterparty name.
    pub contractor_name: String,
    /// Counterparty tax id.
    pub contractor_nip: Option<String>,
    /// Counterparty address.
    pub contractor_address: Option<String>,
    /// Net amount.
    pub net_amount: Option<Decimal>,
    /// VAT amount.
    pub vat_amount: Option<Decimal>,
    /// Gross amount due.
    pub gross_amount: Decimal,
    /// Currency code; defaults to PLN.
    pub currency: Option<String>,
    /// Issue date.
    pub issue_date: Option<NaiveDate>,
    /// Sale date.
    pub sale_date: Option<NaiveDate>,
    /// Payment due date.
    pub payment_date: Option<NaiveDate>,
    /// Bank account to pay into.
    pub account_number: Option<String>,
    /// Payment method.
    pub payment_method: Option<String>,
    /// Cost category.
    pub category: Option<String>,
    /// Where the invoice entered the system from.
    pub source: InvoiceSource,
    /// Registry reference number for imported e-invoices.
    pub external_reference_number: Option<String>,
    /// Storage keys of the uploaded source documents.
    pub document_keys: Vec<String>,
    /// Raw extraction payload.
    pub raw_extracted: Option<serde_json::Value>,
}

/// Input for editing an invoice. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoiceInput {
    /// New invoice number.
    pub invoice_number: Option<String>,
    /// New counterparty name.
    pub contractor_name: Option<String>,
    /// New counterparty tax id.
    pub contractor_nip: Option<Option<String>>,
    /// New issue date.
    pub issue_date: Option<Option<NaiveDate>>,
    /// New sale date.
    pub sale_date: Option<Option<NaiveDate>>,
    /// New payment date.
    pub payment_date: Option<Option<NaiveDate>>,
    /// New net amount.
    pub net_amount: Option<Option<Decimal>>,
    /// New VAT amount.
    pub vat_amount: Option<Option<Decimal>>,
    /// New gross amount.
    pub gross_amount: Option<Decimal>,
    /// New account number.
    pub account_number: Option<Option<String>>,
    /// New payment method.
    pub payment_method: Option<Option<String>>,
    /// New category.
    pub category: Option<Option<String>>,
    /// New settlement status.
    pub status: Option<InvoiceStatus>,
}

/// Invoice repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    db: DatabaseConnection,
}

impl InvoiceRepository {
    /// Creates a new invoice repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists invoices, newest first, optionally scoped to one entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(
        &self,
        entity: Option<BusinessEntity>,
    ) -> Result<Vec<invoices::Model>, InvoiceError> {
        let mut query = invoices::Entity::find();
        if let Some(entity) = entity {
            query = query.filter(invoices::Column::Entity.eq(entity));
        }
        Ok(query
            .order_by_desc(invoices::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Finds an invoice by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<invoices::Model>, InvoiceError> {
        Ok(invoices::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Finds an invoice by number within one entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_by_number(
        &self,
        entity: BusinessEntity,
        invoice_number: &str,
    ) -> Result<Option<invoices::Model>, InvoiceError> {
        Ok(invoices::Entity::find()
            .filter(invoices::Column::Entity.eq(entity))
            .filter(invoices::Column::InvoiceNumber.eq(invoice_number))
            .one(&self.db)
            .await?)
    }

    /// Finds an invoice by its registry reference number.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_by_external_reference(
        &self,
        reference_number: &str,
    ) -> Result<Option<invoices::Model>, InvoiceError> {
        Ok(invoices::Entity::find()
            .filter(invoices::Column::ExternalReferenceNumber.eq(reference_number))
            .one(&self.db)
            .await?)
    }

    /// Lists unpaid and partially paid invoices for an entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn open_invoices(
        &self,
        entity: BusinessEntity,
    ) -> Result<Vec<invoices::Model>, InvoiceError> {
        Ok(Self::open_invoices_query(entity).all(&self.db).await?)
    }

    /// Same as [`Self::open_invoices`] but with `SELECT ... FOR UPDATE` on
    /// the given connection, for use inside a reconciliation transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn open_invoices_locked<C: ConnectionTrait>(
        conn: &C,
        entity: BusinessEntity,
    ) -> Result<Vec<invoices::Model>, DbErr> {
        Self::open_invoices_query(entity)
            .lock_exclusive()
            .all(conn)
            .await
    }

    fn open_invoices_query(entity: BusinessEntity) -> sea_orm::Select<invoices::Entity> {
        invoices::Entity::find()
            .filter(invoices::Column::Entity.eq(entity))
            .filter(
                invoices::Column::Status.is_in([InvoiceStatus::Unpaid, InvoiceStatus::Partial]),
            )
            .order_by_asc(invoices::Column::CreatedAt)
    }

    /// All invoice ids across both entities, for integrity checks.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn all_ids(&self) -> Result<HashSet<Uuid>, InvoiceError> {
        let ids: Vec<Uuid> = invoices::Entity::find()
            .select_only()
            .column(invoices::Column::Id)
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(ids.into_iter().collect())
    }

    /// Creates an invoice, rejecting duplicates of (entity, number).
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError::Duplicate`] with the existing row when the
    /// number is already taken for the entity.
    pub async fn create(&self, input: CreateInvoiceInput) -> Result<invoices::Model, InvoiceError> {
        Self::reject_duplicate(
            self.find_by_number(input.entity, &input.invoice_number)
                .await?,
        )?;

        let now = Utc::now().into();
        let invoice = invoices::ActiveModel {
            id: Set(Uuid::new_v4()),
            entity: Set(input.entity),
            invoice_number: Set(input.invoice_number),
            contractor_name: Set(input.contractor_name),
            contractor_nip: Set(input.contractor_nip),
            contractor_address: Set(input.contractor_address),
            net_amount: Set(input.net_amount),
            vat_amount: Set(input.vat_amount),
            gross_amount: Set(input.gross_amount),
            currency: Set(input.currency.unwrap_or_else(|| "PLN".to_string())),
            issue_date: Set(input.issue_date),
            sale_date: Set(input.sale_date),
            payment_date: Set(input.payment_date),
            account_number: Set(input.account_number),
            payment_method: Set(input.payment_method),
            status: Set(InvoiceStatus::Unpaid),
            category: Set(input.category),
            source: Set(input.source),
            external_reference_number: Set(input.external_reference_number),
            document_keys: Set(DocumentKeys(input.document_keys)),
            raw_extracted: Set(input.raw_extracted),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(invoice.insert(&self.db).await?)
    }

    /// Turns a colliding row into the conflict error that carries it, so
    /// callers can show the operator what already exists. Runs before the
    /// insert; a conflict leaves the table untouched.
    pub(crate) fn reject_duplicate(
        existing: Option<invoices::Model>,
    ) -> Result<(), InvoiceError> {
        match existing {
            Some(model) => Err(InvoiceError::Duplicate(Box::new(model))),
            None => Ok(()),
        }
    }

    /// Edits an invoice's fields.
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError::NotFound`] when the invoice does not exist.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateInvoiceInput,
    ) -> Result<invoices::Model, InvoiceError> {
        self.find_by_id(id)
            .await?
            .ok_or(InvoiceError::NotFound(id))?;

        let mut active = invoices::ActiveModel {
            id: Set(id),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if let Some(v) = input.invoice_number {
            active.invoice_number = Set(v);
        }
        if let Some(v) = input.contractor_name {
            active.contractor_name = Set(v);
        }
        if let Some(v) = input.contractor_nip {
            active.contractor_nip = Set(v);
        }
        if let Some(v) = input.issue_date {
            active.issue_date = Set(v);
        }
        if let Some(v) = input.sale_date {
            active.sale_date = Set(v);
        }
        if let Some(v) = input.payment_date {
            active.payment_date = Set(v);
        }
        if let Some(v) = input.net_amount {
            active.net_amount = Set(v);
        }
        if let Some(v) = input.vat_amount {
            active.vat_amount = Set(v);
        }
        if let Some(v) = input.gross_amount {
            active.gross_amount = Set(v);
        }
        if let Some(v) = input.account_number {
            active.account_number = Set(v);
        }
        if let Some(v) = input.payment_method {
            active.payment_method = Set(v);
        }
        if let Some(v) = input.category {
            active.category = Set(v);
        }
        if let Some(v) = input.status {
            active.status = Set(v);
        }

        Ok(active.update(&self.db).await?)
    }

    /// Deletes an invoice and returns the deleted row.
    ///
    /// Callers are responsible for first unlinking any payments that
    /// reference the invoice (see the reconciliation service).
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError::NotFound`] when the invoice does not exist.
    pub async fn delete(&self, id: Uuid) -> Result<invoices::Model, InvoiceError> {
        let invoice = self
            .find_by_id(id)
            .await?
            .ok_or(InvoiceError::NotFound(id))?;

        invoices::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(invoice)
    }
}

#[cfg(test)]
#[path = "invoice_tests.rs"]
mod tests;
