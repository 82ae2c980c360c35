//! Forward and reverse reconciliation planners.

use std::collections::HashSet;

use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::matching::{
    FORWARD_AMOUNT_TOLERANCE, InvoiceCandidate, MatchStatus, Payment, forward_match, reverse_match,
};

use super::types::{ForwardPlan, InvoiceUpdate, PaymentDraft, SettledStatus};

/// Decides whether a matched amount settles the invoice in full.
///
/// Full payment means `amount >= gross - 0.20`; anything less is partial.
#[must_use]
pub fn settled_status(amount: Decimal, gross_amount: Decimal) -> SettledStatus {
    if amount >= gross_amount - FORWARD_AMOUNT_TOLERANCE {
        SettledStatus::Paid
    } else {
        SettledStatus::Partial
    }
}

/// Plans forward reconciliation of one confirmed statement batch.
///
/// Payments are processed in the order the user confirmed them. Candidates
/// are scanned in their given (database return) order and the first invoice
/// satisfying the strict predicate wins. An invoice claimed by one payment
/// leaves the candidate pool for the rest of the batch, so a single invoice
/// cannot absorb two payments from the same statement.
///
/// Rows with a missing or unparseable amount are kept in the payment list
/// untouched (no match status) and counted as skipped; they never abort the
/// batch.
#[must_use]
pub fn plan_forward(drafts: &[PaymentDraft], candidates: &[InvoiceCandidate]) -> ForwardPlan {
    let mut plan = ForwardPlan::default();
    let mut claimed: HashSet<Uuid> = HashSet::new();

    for draft in drafts {
        let mut payment = Payment {
            id: Uuid::new_v4(),
            date: draft.date,
            amount: None,
            kind: draft.kind,
            contractor: draft.contractor.clone(),
            description: draft.description.clone(),
            category: draft.category.clone(),
            match_status: None,
            matched_invoice_id: None,
            matched_invoice_number: None,
        };

        let Some(amount) = draft.resolve_amount() else {
            warn!(
                contractor = %draft.contractor,
                "skipping payment row with unparseable amount"
            );
            plan.skipped += 1;
            plan.payments.push(payment);
            continue;
        };
        payment.amount = Some(amount);

        let hit = candidates
            .iter()
            .filter(|inv| !claimed.contains(&inv.id))
            .find(|inv| forward_match(amount, &draft.contractor, &draft.description, inv));

        if let Some(invoice) = hit {
            debug!(
                amount = %amount,
                invoice_number = %invoice.invoice_number,
                "forward match"
            );
            claimed.insert(invoice.id);
            payment.set_match(invoice.id, &invoice.invoice_number);
            plan.updates.push(InvoiceUpdate {
                invoice_id: invoice.id,
                invoice_number: invoice.invoice_number.clone(),
                amount,
                status: settled_status(amount, invoice.gross_amount),
                payment_date: draft.date,
                category: draft.category.clone(),
            });
            plan.matched += 1;
        } else {
            payment.match_status = Some(MatchStatus::Unmatched);
        }

        plan.payments.push(payment);
    }

    plan
}

/// Plans reverse reconciliation of one settlement's payment list against a
/// newly confirmed invoice.
///
/// Every still-unmatched payment satisfying the loose predicate is linked;
/// a single invoice may satisfy several historical payments. Returns the
/// number of payments newly matched (zero means the list is unchanged).
pub fn plan_reverse(payments: &mut [Payment], invoice: &InvoiceCandidate) -> usize {
    let mut newly_matched = 0;

    for payment in payments.iter_mut() {
        if payment.is_matched() {
            continue;
        }
        if reverse_match(payment, invoice) {
            payment.set_match(invoice.id, &invoice.invoice_number);
            newly_matched += 1;
        }
    }

    newly_matched
}

impl PaymentDraft {
    /// Resolves the draft's amount to an absolute decimal, if possible.
    #[must_use]
    pub fn resolve_amount(&self) -> Option<Decimal> {
        self.amount.as_ref().and_then(crate::matching::RawAmount::to_decimal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{PaymentKind, RawAmount};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn candidate(number: &str, contractor: &str, gross: Decimal) -> InvoiceCandidate {
        InvoiceCandidate {
            id: Uuid::new_v4(),
            invoice_number: number.to_string(),
            contractor_name: contractor.to_string(),
            gross_amount: gross,
        }
    }

    fn draft(amount: RawAmount, contractor: &str, description: &str) -> PaymentDraft {
        PaymentDraft {
            date: NaiveDate::from_ymd_opt(2026, 7, 1),
            amount: Some(amount),
            kind: PaymentKind::Outgoing,
            contractor: contractor.to_string(),
            description: description.to_string(),
            category: None,
        }
    }

    #[test]
    fn test_full_payment_transitions_to_paid() {
        let invoices = vec![candidate("A123", "Acme", dec!(1000.00))];
        let drafts = vec![draft(RawAmount::Number(dec!(1000.00)), "A", "inv A123")];

        let plan = plan_forward(&drafts, &invoices);

        assert_eq!(plan.matched, 1);
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].status, SettledStatus::Paid);
        assert_eq!(
            plan.updates[0].payment_date,
            NaiveDate::from_ymd_opt(2026, 7, 1)
        );
        assert!(plan.payments[0].is_matched());
        assert_eq!(
            plan.payments[0].matched_invoice_number.as_deref(),
            Some("A123")
        );
    }

    #[test]
    fn test_partial_payment_transitions_to_partial() {
        let invoices = vec![candidate("A123", "Acme", dec!(1000.00))];
        let drafts = vec![draft(RawAmount::Number(dec!(600.00)), "Acme", "zaliczka")];

        let plan = plan_forward(&drafts, &invoices);

        assert_eq!(plan.updates[0].status, SettledStatus::Partial);
    }

    #[test]
    fn test_unparseable_amount_is_skipped_not_fatal() {
        let invoices = vec![candidate("A123", "Acme", dec!(1000.00))];
        let drafts = vec![
            draft(RawAmount::Text("n/a".into()), "Acme", "broken row"),
            draft(RawAmount::Number(dec!(1000.00)), "Acme", "inv A123"),
        ];

        let plan = plan_forward(&drafts, &invoices);

        assert_eq!(plan.skipped, 1);
        assert_eq!(plan.matched, 1);
        assert_eq!(plan.payments.len(), 2);
        // The broken row is kept verbatim, with no match status at all.
        assert!(plan.payments[0].match_status.is_none());
        assert!(plan.payments[0].amount.is_none());
    }

    #[test]
    fn test_string_amount_with_separators_is_parsed() {
        let invoices = vec![candidate("A123", "Acme", dec!(1234.56))];
        let drafts = vec![draft(RawAmount::Text("1 234,56".into()), "Acme", "x")];

        let plan = plan_forward(&drafts, &invoices);

        assert_eq!(plan.matched, 1);
        assert_eq!(plan.payments[0].amount, Some(dec!(1234.56)));
    }

    #[test]
    fn test_claimed_invoice_leaves_candidate_pool() {
        let invoices = vec![candidate("A123", "Acme", dec!(500.00))];
        let drafts = vec![
            draft(RawAmount::Number(dec!(500.00)), "Acme", "first"),
            draft(RawAmount::Number(dec!(500.00)), "Acme", "second"),
        ];

        let plan = plan_forward(&drafts, &invoices);

        assert_eq!(plan.matched, 1);
        assert!(plan.payments[0].is_matched());
        assert_eq!(plan.payments[1].match_status, Some(MatchStatus::Unmatched));
    }

    #[test]
    fn test_first_candidate_wins_in_scan_order() {
        let first = candidate("A1", "Acme", dec!(100.00));
        let second = candidate("A2", "Acme", dec!(100.00));
        let invoices = vec![first.clone(), second];
        let drafts = vec![draft(RawAmount::Number(dec!(100.00)), "Acme", "x")];

        let plan = plan_forward(&drafts, &invoices);

        assert_eq!(plan.updates[0].invoice_id, first.id);
    }

    #[test]
    fn test_unmatched_payment_is_annotated() {
        let invoices = vec![candidate("A123", "Acme", dec!(999.00))];
        let drafts = vec![draft(RawAmount::Number(dec!(1.00)), "Globex", "nothing")];

        let plan = plan_forward(&drafts, &invoices);

        assert_eq!(plan.matched, 0);
        assert_eq!(plan.payments[0].match_status, Some(MatchStatus::Unmatched));
        assert!(plan.payments[0].matched_invoice_id.is_none());
    }

    #[test]
    fn test_category_override_travels_with_the_update() {
        let invoices = vec![candidate("A123", "Acme", dec!(100.00))];
        let mut d = draft(RawAmount::Number(dec!(100.00)), "Acme", "inv A123");
        d.category = Some("KOSZTY OGÓLNE - MEDIA".into());

        let plan = plan_forward(&[d], &invoices);

        assert_eq!(
            plan.updates[0].category.as_deref(),
            Some("KOSZTY OGÓLNE - MEDIA")
        );
    }

    #[test]
    fn test_reverse_plan_marks_all_satisfying_payments() {
        let invoice = candidate("F/9", "Acme Corp", dec!(500.00));
        let mut payments = vec![
            Payment {
                id: Uuid::new_v4(),
                date: None,
                amount: Some(dec!(500.00)),
                kind: PaymentKind::Outgoing,
                contractor: "Acme".into(),
                description: String::new(),
                category: None,
                match_status: Some(MatchStatus::Unmatched),
                matched_invoice_id: None,
                matched_invoice_number: None,
            },
            Payment {
                id: Uuid::new_v4(),
                date: None,
                amount: Some(dec!(500.00)),
                kind: PaymentKind::Outgoing,
                contractor: "Acme".into(),
                description: String::new(),
                category: None,
                match_status: None,
                matched_invoice_id: None,
                matched_invoice_number: None,
            },
        ];

        let newly = plan_reverse(&mut payments, &invoice);

        assert_eq!(newly, 2);
        assert!(payments.iter().all(Payment::is_matched));
        assert!(
            payments
                .iter()
                .all(|p| p.matched_invoice_id == Some(invoice.id))
        );
    }

    #[test]
    fn test_reverse_plan_leaves_matched_payments_alone() {
        let other = Uuid::new_v4();
        let invoice = candidate("F/9", "Acme", dec!(500.00));
        let mut payments = vec![Payment {
            id: Uuid::new_v4(),
            date: None,
            amount: Some(dec!(500.00)),
            kind: PaymentKind::Outgoing,
            contractor: "Acme".into(),
            description: String::new(),
            category: None,
            match_status: Some(MatchStatus::Matched),
            matched_invoice_id: Some(other),
            matched_invoice_number: Some("OLD/1".into()),
        }];

        let newly = plan_reverse(&mut payments, &invoice);

        assert_eq!(newly, 0);
        assert_eq!(payments[0].matched_invoice_id, Some(other));
    }

    #[test]
    fn test_settled_status_boundary() {
        assert_eq!(settled_status(dec!(999.80), dec!(1000.00)), SettledStatus::Paid);
        assert_eq!(
            settled_status(dec!(999.79), dec!(1000.00)),
            SettledStatus::Partial
        );
    }
}
