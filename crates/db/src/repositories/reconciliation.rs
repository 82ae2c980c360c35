//! Database-side orchestration of the reconciliation engine.
//!
//! The pure planners in `bilans_core` decide what should change; this
//! service runs them against the persisted invoices and settlements,
//! applies the resulting mutations and records history entries.

use bilans_core::audit;
use bilans_core::matching::InvoiceCandidate;
use bilans_core::reconcile::{PaymentDraft, SettledStatus, plan_forward, plan_reverse};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{
    invoices,
    sea_orm_active_enums::{BusinessEntity, InvoiceStatus, SettlementStatus},
    settlements,
};
use crate::repositories::{
    HistoryRepository, InvoiceRepository, SettlementRepository, history::actions,
};

/// Error types for reconciliation operations.
#[derive(Debug, thiserror::Error)]
pub enum ReconciliationError {
    /// Settlement not found.
    #[error("settlement not found: {0}")]
    SettlementNotFound(Uuid),

    /// Invoice not found.
    #[error("invoice not found: {0}")]
    InvoiceNotFound(Uuid),

    /// Payment not found inside the settlement's payment list.
    #[error("payment not found: {0}")]
    PaymentNotFound(Uuid),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// Result of one integrity sweep over the settlements.
#[derive(Debug, Clone)]
pub struct HealOutcome {
    /// The settlements after repair, in the order they were listed.
    pub settlements: Vec<settlements::Model>,
    /// Number of settlements that needed a repair write.
    pub healed: usize,
}

/// Runs the forward and reverse reconciliation flows and the integrity
/// auditor against the database.
#[derive(Debug, Clone)]
pub struct ReconciliationService {
    db: DatabaseConnection,
}

impl ReconciliationService {
    /// Creates a new reconciliation service.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Confirms a settlement: matches its payments against the entity's open
    /// invoices, persists the settlement and updates matched invoices, all in
    /// one transaction.
    ///
    /// Open invoices are read with `FOR UPDATE` so two concurrent
    /// confirmations cannot settle the same invoice twice.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement in the transaction fails.
    pub async fn confirm_settlement(
        &self,
        entity: BusinessEntity,
        file_name: &str,
        document_keys: Vec<String>,
        drafts: &[PaymentDraft],
    ) -> Result<settlements::Model, ReconciliationError> {
        let txn = self.db.begin().await?;

        let open = InvoiceRepository::open_invoices_locked(&txn, entity).await?;
        let candidates: Vec<InvoiceCandidate> = open.iter().map(invoices::Model::to_candidate).collect();
        let plan = plan_forward(drafts, &candidates);

        for update in &plan.updates {
            let mut active = invoices::ActiveModel {
                id: Set(update.invoice_id),
                status: Set(to_invoice_status(update.status)),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            };
            if update.payment_date.is_some() {
                active.payment_date = Set(update.payment_date);
            }
            if update.category.is_some() {
                active.category = Set(update.category.clone());
            }
            active.update(&txn).await?;

            HistoryRepository::record_on(
                &txn,
                Some(entity),
                actions::PAYMENT_MATCHED,
                &format!(
                    "Dopasowano płatność {} PLN do faktury {}",
                    update.amount, update.invoice_number
                ),
            )
            .await?;
        }

        let matched = i32::try_from(plan.matched).unwrap_or(i32::MAX);
        let settlement = SettlementRepository::insert_on(
            &txn,
            entity,
            file_name,
            document_keys,
            plan.payments,
            matched,
            SettlementStatus::Processed,
        )
        .await?;

        HistoryRepository::record_on(
            &txn,
            Some(entity),
            actions::SETTLEMENT_PROCESSED,
            &format!(
                "Przetworzono rozliczenie {file_name}. Dopasowano {matched} faktur."
            ),
        )
        .await?;

        txn.commit().await?;

        info!(
            settlement_id = %settlement.id,
            matched = plan.matched,
            skipped = plan.skipped,
            "settlement confirmed"
        );
        Ok(settlement)
    }

    /// Links a newly added invoice to any still-unmatched payments across the
    /// entity's settlements, and marks the invoice paid when at least one
    /// payment was found.
    ///
    /// Best effort: called after the invoice already exists, so callers may
    /// log and swallow the error rather than fail the creation.
    ///
    /// # Errors
    ///
    /// Returns an error if a settlement scan or write fails.
    pub async fn reverse_reconcile(
        &self,
        invoice: &invoices::Model,
    ) -> Result<usize, ReconciliationError> {
        let candidate = invoice.to_candidate();
        let settlements = self.settlements_for(invoice.entity).await?;

        let mut total = 0;
        for settlement in settlements {
            let mut payments = settlement.payments.0.clone();
            let linked = plan_reverse(&mut payments, &candidate);
            if linked == 0 {
                continue;
            }
            let count = audit::matched_count(&payments);
            SettlementRepository::save_payments(&self.db, settlement.id, payments, count, None)
                .await?;
            total += linked;
        }

        if total > 0 {
            invoices::ActiveModel {
                id: Set(invoice.id),
                status: Set(InvoiceStatus::Paid),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            }
            .update(&self.db)
            .await?;
            info!(invoice_id = %invoice.id, linked = total, "reverse reconciliation linked payments");
        }
        Ok(total)
    }

    /// Repairs settlements whose payments reference deleted invoices and
    /// whose matched counters drifted from the payment lists.
    ///
    /// Idempotent: a second sweep over a healthy database writes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if a query or a repair write fails.
    pub async fn heal_settlements(
        &self,
        entity: Option<BusinessEntity>,
    ) -> Result<HealOutcome, ReconciliationError> {
        let mut query = settlements::Entity::find();
        if let Some(entity) = entity {
            query = query.filter(settlements::Column::Entity.eq(entity));
        }
        let mut settlements = query
            .order_by_desc(settlements::Column::CreatedAt)
            .all(&self.db)
            .await?;

        // Live ids are collected across both entities; a cross-entity match
        // is the matcher's bug to prevent, not the auditor's to undo.
        let ids: Vec<Uuid> = invoices::Entity::find()
            .select_only()
            .column(invoices::Column::Id)
            .into_tuple()
            .all(&self.db)
            .await?;
        let live: std::collections::HashSet<Uuid> = ids.into_iter().collect();

        let mut healed = 0;
        for settlement in &mut settlements {
            let mut payments = settlement.payments.0.clone();
            let cleared = audit::clear_orphans(&mut payments, &live);
            let count = audit::matched_count(&payments);

            if cleared == 0 && count == settlement.matched_count {
                continue;
            }
            warn!(
                settlement_id = %settlement.id,
                cleared,
                old_count = settlement.matched_count,
                new_count = count,
                "repairing settlement integrity"
            );
            *settlement =
                SettlementRepository::save_payments(&self.db, settlement.id, payments, count, None)
                    .await?;
            healed += 1;
        }

        Ok(HealOutcome { settlements, healed })
    }

    /// Detaches every payment matched to the given invoice, across all of
    /// its entity's settlements. Used before the invoice itself is deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if a settlement scan or write fails.
    pub async fn unlink_invoice(
        &self,
        invoice: &invoices::Model,
    ) -> Result<usize, ReconciliationError> {
        let settlements = self.settlements_for(invoice.entity).await?;

        let mut unlinked = 0;
        for settlement in settlements {
            let mut payments = settlement.payments.0.clone();
            let changed = audit::detach_invoice(&mut payments, invoice.id);
            if changed == 0 {
                continue;
            }
            let count = audit::matched_count(&payments);
            SettlementRepository::save_payments(&self.db, settlement.id, payments, count, None)
                .await?;
            unlinked += changed;
        }
        Ok(unlinked)
    }

    /// Manually links one payment to one invoice, overriding the matcher.
    ///
    /// The invoice is marked paid and takes the payment's date; the operator
    /// asked for the link, so no tolerance check applies.
    ///
    /// # Errors
    ///
    /// Returns `SettlementNotFound`, `InvoiceNotFound` or `PaymentNotFound`
    /// when one of the three parties does not exist.
    pub async fn manual_link(
        &self,
        settlement_id: Uuid,
        payment_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<settlements::Model, ReconciliationError> {
        let settlement = settlements::Entity::find_by_id(settlement_id)
            .one(&self.db)
            .await?
            .ok_or(ReconciliationError::SettlementNotFound(settlement_id))?;
        let invoice = invoices::Entity::find_by_id(invoice_id)
            .one(&self.db)
            .await?
            .ok_or(ReconciliationError::InvoiceNotFound(invoice_id))?;

        let mut payments = settlement.payments.0.clone();
        let payment = payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .ok_or(ReconciliationError::PaymentNotFound(payment_id))?;

        payment.set_match(invoice.id, &invoice.invoice_number);
        let payment_date = payment.date;
        let amount = payment.amount;

        let count = audit::matched_count(&payments);
        let settlement =
            SettlementRepository::save_payments(&self.db, settlement.id, payments, count, None)
                .await?;

        let mut active = invoices::ActiveModel {
            id: Set(invoice.id),
            status: Set(InvoiceStatus::Paid),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if payment_date.is_some() {
            active.payment_date = Set(payment_date);
        }
        active.update(&self.db).await?;

        let amount = amount.map_or_else(|| "?".to_string(), |a| a.to_string());
        HistoryRepository::record_on(
            &self.db,
            Some(settlement.entity),
            actions::PAYMENT_LINKED,
            &format!(
                "Ręcznie powiązano płatność {amount} PLN z fakturą {}",
                invoice.invoice_number
            ),
        )
        .await?;

        Ok(settlement)
    }

    /// Manually detaches one payment from whatever invoice it points at and
    /// reopens that invoice (unpaid, payment date cleared) when it still
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns `SettlementNotFound` or `PaymentNotFound` when the target
    /// does not exist.
    pub async fn manual_unlink(
        &self,
        settlement_id: Uuid,
        payment_id: Uuid,
    ) -> Result<settlements::Model, ReconciliationError> {
        let settlement = settlements::Entity::find_by_id(settlement_id)
            .one(&self.db)
            .await?
            .ok_or(ReconciliationError::SettlementNotFound(settlement_id))?;

        let mut payments = settlement.payments.0.clone();
        let payment = payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .ok_or(ReconciliationError::PaymentNotFound(payment_id))?;

        let was_linked_to = payment.matched_invoice_id;
        let was_linked_number = payment.matched_invoice_number.clone();
        payment.clear_match();

        let count = audit::matched_count(&payments);
        let settlement =
            SettlementRepository::save_payments(&self.db, settlement.id, payments, count, None)
                .await?;

        // Orphaned links (invoice deleted since) still unlink cleanly.
        if let Some(invoice_id) = was_linked_to {
            let exists = invoices::Entity::find_by_id(invoice_id)
                .one(&self.db)
                .await?
                .is_some();
            if exists {
                invoices::ActiveModel {
                    id: Set(invoice_id),
                    status: Set(InvoiceStatus::Unpaid),
                    payment_date: Set(None),
                    updated_at: Set(Utc::now().into()),
                    ..Default::default()
                }
                .update(&self.db)
                .await?;
            }
        }

        HistoryRepository::record_on(
            &self.db,
            Some(settlement.entity),
            actions::PAYMENT_UNLINKED,
            &format!(
                "Odłączono płatność od faktury {}",
                was_linked_number.unwrap_or_else(|| "?".to_string())
            ),
        )
        .await?;

        Ok(settlement)
    }

    async fn settlements_for(
        &self,
        entity: BusinessEntity,
    ) -> Result<Vec<settlements::Model>, DbErr> {
        settlements::Entity::find()
            .filter(settlements::Column::Entity.eq(entity))
            .order_by_asc(settlements::Column::CreatedAt)
            .all(&self.db)
            .await
    }
}

const fn to_invoice_status(status: SettledStatus) -> InvoiceStatus {
    match status {
        SettledStatus::Paid => InvoiceStatus::Paid,
        SettledStatus::Partial => InvoiceStatus::Partial,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settled_status_maps_to_invoice_status() {
        assert_eq!(to_invoice_status(SettledStatus::Paid), InvoiceStatus::Paid);
        assert_eq!(
            to_invoice_status(SettledStatus::Partial),
            InvoiceStatus::Partial
        );
    }
}
