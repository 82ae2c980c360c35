//! Domain types shared by the matcher, the reconciliation engine and the
//! settlement persistence layer.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a payment has been matched to an invoice.
///
/// Absent entirely on payments the engine has not looked at yet (e.g. rows
/// whose amount could not be parsed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// The payment is linked to an existing invoice.
    Matched,
    /// The engine looked at the payment and found no invoice for it.
    Unmatched,
}

/// Direction of a bank transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// Money arriving on the account.
    Incoming,
    /// Money leaving the account.
    #[default]
    Outgoing,
}

/// One bank transaction row embedded in a settlement's payment list.
///
/// Settlements exclusively own their payments; invoices are referenced only
/// by id (a weak back reference that the integrity auditor keeps honest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Stable identifier assigned when the settlement is confirmed.
    pub id: Uuid,
    /// Booking date.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Absolute transaction amount. Absent when the source row's amount was
    /// unparseable; such payments are kept but never match.
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Transaction direction.
    #[serde(default)]
    pub kind: PaymentKind,
    /// Counterparty name as recovered from the statement.
    #[serde(default)]
    pub contractor: String,
    /// Free-text transaction description.
    #[serde(default)]
    pub description: String,
    /// Cost category, if the statement parser could guess one.
    #[serde(default)]
    pub category: Option<String>,
    /// Match state; mutated only by the engine and the integrity auditor.
    #[serde(default)]
    pub match_status: Option<MatchStatus>,
    /// Id of the matched invoice, when matched.
    #[serde(default)]
    pub matched_invoice_id: Option<Uuid>,
    /// Number of the matched invoice, when matched (display convenience).
    #[serde(default)]
    pub matched_invoice_number: Option<String>,
}

impl Payment {
    /// True when the payment is currently linked to an invoice.
    #[must_use]
    pub fn is_matched(&self) -> bool {
        self.match_status == Some(MatchStatus::Matched)
    }

    /// Clears all match metadata and marks the payment unmatched.
    pub fn clear_match(&mut self) {
        self.matched_invoice_id = None;
        self.matched_invoice_number = None;
        self.match_status = Some(MatchStatus::Unmatched);
    }

    /// Links the payment to the given invoice.
    pub fn set_match(&mut self, invoice_id: Uuid, invoice_number: &str) {
        self.matched_invoice_id = Some(invoice_id);
        self.matched_invoice_number = Some(invoice_number.to_string());
        self.match_status = Some(MatchStatus::Matched);
    }
}

/// The slice of an invoice the matcher needs.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceCandidate {
    /// Invoice id.
    pub id: Uuid,
    /// Invoice number as printed on the document.
    pub invoice_number: String,
    /// Counterparty name.
    pub contractor_name: String,
    /// Gross amount due.
    pub gross_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_clear_match_resets_all_fields() {
        let mut payment = Payment {
            id: Uuid::new_v4(),
            date: None,
            amount: Some(dec!(100)),
            kind: PaymentKind::Outgoing,
            contractor: "Acme".into(),
            description: String::new(),
            category: None,
            match_status: Some(MatchStatus::Matched),
            matched_invoice_id: Some(Uuid::new_v4()),
            matched_invoice_number: Some("F/1".into()),
        };

        payment.clear_match();

        assert_eq!(payment.match_status, Some(MatchStatus::Unmatched));
        assert!(payment.matched_invoice_id.is_none());
        assert!(payment.matched_invoice_number.is_none());
    }

    #[test]
    fn test_payment_roundtrips_through_json() {
        let payment = Payment {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2026, 3, 14),
            amount: Some(dec!(1234.56)),
            kind: PaymentKind::Incoming,
            contractor: "Hotel Sp. z o.o.".into(),
            description: "przelew".into(),
            category: Some("KOSZTY OGÓLNE - MEDIA".into()),
            match_status: None,
            matched_invoice_id: None,
            matched_invoice_number: None,
        };

        let json = serde_json::to_string(&payment).unwrap();
        let back: Payment = serde_json::from_str(&json).unwrap();
        assert_eq!(payment, back);
    }

    #[test]
    fn test_payment_tolerates_missing_optional_fields() {
        // Rows written before the match metadata existed must still parse.
        let json = format!(r#"{{"id": "{}", "contractor": "X"}}"#, Uuid::new_v4());
        let payment: Payment = serde_json::from_str(&json).unwrap();
        assert!(payment.amount.is_none());
        assert!(payment.match_status.is_none());
        assert_eq!(payment.kind, PaymentKind::Outgoing);
    }
}
