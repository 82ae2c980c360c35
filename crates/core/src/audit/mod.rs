//! Self-healing checks for stored payment lists.
//!
//! Settlements embed their payment rows, so an invoice deleted elsewhere can
//! leave payments pointing at an id that no longer exists, and the stored
//! matched counter can drift from the list itself. Both repairs are pure list
//! transformations; the database layer decides which settlements to rewrite.

use std::collections::HashSet;

use tracing::warn;
use uuid::Uuid;

use crate::matching::Payment;

/// Clears match links that point at invoices absent from `live_invoices`.
///
/// Only payments that are both marked matched and carry an invoice id are
/// candidates; everything else is left untouched. Returns the number of
/// links cleared.
pub fn clear_orphans(payments: &mut [Payment], live_invoices: &HashSet<Uuid>) -> usize {
    let mut cleared = 0;

    for payment in payments.iter_mut() {
        let Some(invoice_id) = payment.matched_invoice_id else {
            continue;
        };
        if !payment.is_matched() {
            continue;
        }
        if !live_invoices.contains(&invoice_id) {
            warn!(%invoice_id, payment_id = %payment.id, "clearing orphaned payment link");
            payment.clear_match();
            cleared += 1;
        }
    }

    cleared
}

/// Recomputes the matched-payment counter from the list itself.
#[must_use]
pub fn matched_count(payments: &[Payment]) -> i32 {
    let matched = payments.iter().filter(|p| p.is_matched()).count();
    i32::try_from(matched).unwrap_or(i32::MAX)
}

/// Detaches every payment linked to the given invoice, ahead of its
/// deletion. Payments linked to other invoices are left alone. Returns the
/// number of links cleared.
pub fn detach_invoice(payments: &mut [Payment], invoice_id: Uuid) -> usize {
    let mut detached = 0;
    for payment in payments.iter_mut() {
        if payment.matched_invoice_id == Some(invoice_id) {
            payment.clear_match();
            detached += 1;
        }
    }
    detached
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{MatchStatus, PaymentKind};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn payment(matched_to: Option<Uuid>) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            date: None,
            amount: Some(dec!(100.00)),
            kind: PaymentKind::Outgoing,
            contractor: "Acme".into(),
            description: String::new(),
            category: None,
            match_status: matched_to.map(|_| MatchStatus::Matched),
            matched_invoice_id: matched_to,
            matched_invoice_number: matched_to.map(|_| "F/1".into()),
        }
    }

    #[test]
    fn test_orphaned_link_is_cleared() {
        let dead = Uuid::new_v4();
        let mut payments = vec![payment(Some(dead))];

        let cleared = clear_orphans(&mut payments, &HashSet::new());

        assert_eq!(cleared, 1);
        assert_eq!(payments[0].match_status, Some(MatchStatus::Unmatched));
        assert!(payments[0].matched_invoice_id.is_none());
        assert!(payments[0].matched_invoice_number.is_none());
    }

    #[test]
    fn test_live_link_survives() {
        let live = Uuid::new_v4();
        let mut payments = vec![payment(Some(live))];
        let live_set: HashSet<Uuid> = [live].into_iter().collect();

        let cleared = clear_orphans(&mut payments, &live_set);

        assert_eq!(cleared, 0);
        assert_eq!(payments[0].matched_invoice_id, Some(live));
    }

    #[test]
    fn test_unmatched_payments_are_not_touched() {
        let mut payments = vec![payment(None)];

        let cleared = clear_orphans(&mut payments, &HashSet::new());

        assert_eq!(cleared, 0);
        assert!(payments[0].match_status.is_none());
    }

    #[test]
    fn test_matched_count_counts_only_matched() {
        let live = Uuid::new_v4();
        let payments = vec![payment(Some(live)), payment(None), payment(Some(live))];

        assert_eq!(matched_count(&payments), 2);
    }

    #[test]
    fn test_detach_clears_exactly_the_invoices_links() {
        let doomed = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut payments = vec![
            payment(Some(doomed)),
            payment(Some(other)),
            payment(Some(doomed)),
            payment(None),
        ];
        let count_before = matched_count(&payments);

        let detached = detach_invoice(&mut payments, doomed);

        assert_eq!(detached, 2);
        assert_eq!(payments[0].match_status, Some(MatchStatus::Unmatched));
        assert!(payments[0].matched_invoice_id.is_none());
        assert_eq!(payments[2].match_status, Some(MatchStatus::Unmatched));
        // The link to the surviving invoice is untouched.
        assert_eq!(payments[1].matched_invoice_id, Some(other));
        assert_eq!(payments[1].match_status, Some(MatchStatus::Matched));
        assert_eq!(
            matched_count(&payments),
            count_before - i32::try_from(detached).unwrap()
        );
    }

    #[test]
    fn test_detach_leaves_unrelated_list_unchanged() {
        let doomed = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut payments = vec![payment(Some(other)), payment(None)];
        let snapshot = payments.clone();

        let detached = detach_invoice(&mut payments, doomed);

        assert_eq!(detached, 0);
        assert_eq!(payments, snapshot);
    }

    proptest! {
        #[test]
        fn prop_clear_orphans_is_idempotent(
            matched in proptest::collection::vec(any::<bool>(), 0..16),
        ) {
            let live = Uuid::new_v4();
            let mut payments: Vec<Payment> = matched
                .iter()
                .enumerate()
                .map(|(i, is_matched)| {
                    // Odd matched rows point at a dead invoice.
                    let target = if *is_matched {
                        Some(if i % 2 == 0 { live } else { Uuid::new_v4() })
                    } else {
                        None
                    };
                    payment(target)
                })
                .collect();
            let live_set: HashSet<Uuid> = [live].into_iter().collect();

            let first = clear_orphans(&mut payments, &live_set);
            let snapshot = payments.clone();
            let second = clear_orphans(&mut payments, &live_set);

            prop_assert_eq!(second, 0);
            prop_assert_eq!(&payments, &snapshot);
            prop_assert!(first <= matched.len());
        }

        #[test]
        fn prop_counter_matches_list_after_repair(
            matched in proptest::collection::vec(any::<bool>(), 0..16),
        ) {
            let mut payments: Vec<Payment> = matched
                .iter()
                .map(|is_matched| payment(is_matched.then(Uuid::new_v4)))
                .collect();

            clear_orphans(&mut payments, &HashSet::new());

            prop_assert_eq!(matched_count(&payments), 0);
            prop_assert!(payments.iter().all(|p| p.matched_invoice_id.is_none()));
        }
    }
}
