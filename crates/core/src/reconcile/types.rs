//! Inputs and outputs of the reconciliation planners.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::matching::{Payment, PaymentKind, RawAmount};

/// A payment row as verified by the user before a settlement is confirmed.
///
/// Amounts arrive either as JSON numbers or as bank-formatted strings and
/// are resolved leniently; everything else is taken as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDraft {
    /// Booking date.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Amount as provided by the client or parser.
    #[serde(default)]
    pub amount: Option<RawAmount>,
    /// Transaction direction.
    #[serde(default)]
    pub kind: PaymentKind,
    /// Counterparty name.
    #[serde(default)]
    pub contractor: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Cost category, when the source (CSV parser) supplied one.
    #[serde(default)]
    pub category: Option<String>,
}

/// Invoice status resulting from a successful match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettledStatus {
    /// The payment covers the invoice (within forward tolerance).
    Paid,
    /// The payment covers only part of the invoice.
    Partial,
}

/// A status/date/category change the engine wants applied to one invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceUpdate {
    /// Invoice to update.
    pub invoice_id: Uuid,
    /// Invoice number, for history entries.
    pub invoice_number: String,
    /// Matched payment amount, for history entries.
    pub amount: Decimal,
    /// New invoice status.
    pub status: SettledStatus,
    /// Payment date to record on the invoice.
    pub payment_date: Option<NaiveDate>,
    /// Category override carried by the payment (CSV categories win over
    /// extracted guesses).
    pub category: Option<String>,
}

/// Result of planning one forward reconciliation batch.
#[derive(Debug, Clone, Default)]
pub struct ForwardPlan {
    /// The final embedded payment list, annotated with match metadata.
    pub payments: Vec<Payment>,
    /// Invoice mutations to apply, in match order.
    pub updates: Vec<InvoiceUpdate>,
    /// Number of payments that matched an invoice.
    pub matched: usize,
    /// Number of rows skipped for an unparseable amount.
    pub skipped: usize,
}
