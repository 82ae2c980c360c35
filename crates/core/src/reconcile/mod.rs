//! Reconciliation planning.
//!
//! The planners are pure: they take an in-memory snapshot of payments and
//! candidate invoices and produce the decisions the persistence layer then
//! applies. This keeps the order-dependent matching semantics testable
//! without a database.

pub mod engine;
pub mod types;

pub use engine::{plan_forward, plan_reverse, settled_status};
pub use types::{ForwardPlan, InvoiceUpdate, PaymentDraft, SettledStatus};
