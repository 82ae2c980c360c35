//! Payment/invoice matching.
//!
//! Two independent predicates with asymmetric strictness: a loose one for
//! reverse reconciliation (a freshly confirmed invoice against payments
//! already on file) and a strict one for forward reconciliation (a freshly
//! confirmed bank statement against open invoices). See the functions'
//! documentation for the exact criteria.

pub mod amount;
pub mod matcher;
pub mod types;

pub use amount::{RawAmount, parse_amount};
pub use matcher::{
    FORWARD_AMOUNT_TOLERANCE, REVERSE_AMOUNT_TOLERANCE, forward_match, reverse_match,
};
pub use types::{InvoiceCandidate, MatchStatus, Payment, PaymentKind};
