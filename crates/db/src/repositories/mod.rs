//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the
//! application. The reconciliation service sits on top of them and applies
//! the decisions produced by the core planners.

pub mod history;
pub mod invoice;
pub mod reconciliation;
pub mod settlement;

pub use history::{HistoryRepository, actions};
pub use invoice::{CreateInvoiceInput, InvoiceError, InvoiceRepository, UpdateInvoiceInput};
pub use reconciliation::{HealOutcome, ReconciliationError, ReconciliationService};
pub use settlement::{SettlementError, SettlementRepository};
