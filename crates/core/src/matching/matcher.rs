//! The two match predicates.
//!
//! Both require identity AND amount to agree, but with different
//! normalizations and tolerances. The asymmetry is deliberate: reverse
//! matching runs against rows the user already verified by hand, so a miss
//! is costly and the amount tolerance is tight; forward matching bulk-scans
//! a fresh statement, where a wrong auto-match silently corrupts a paid
//! status, so identity is checked against the invoice number first and the
//! amount tolerance absorbs bank rounding and fees.

use rust_decimal::Decimal;

use super::types::{InvoiceCandidate, Payment};

/// Amount tolerance for reverse (loose) matching, in currency units.
pub const REVERSE_AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Amount tolerance for forward (strict) matching, in currency units.
pub const FORWARD_AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

/// Lower-cases and strips all whitespace. Used for contractor names.
fn normalize_identity(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lower-cases and keeps only ASCII alphanumerics. Used when looking for an
/// invoice number inside a transaction description.
fn normalize_reference(value: &str) -> String {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .flat_map(char::to_lowercase)
        .collect()
}

/// Substring containment in either direction, after identity normalization.
/// Empty input on either side is a failure, never a wildcard.
fn contractor_names_agree(a: &str, b: &str) -> bool {
    let a = normalize_identity(a);
    let b = normalize_identity(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// Loose predicate used when a newly confirmed invoice is reconciled against
/// payments already on file.
///
/// Requires `|payment.amount - invoice.gross| <= 0.05` and contractor-name
/// containment. A payment without a parsed amount never matches.
#[must_use]
pub fn reverse_match(payment: &Payment, invoice: &InvoiceCandidate) -> bool {
    let Some(amount) = payment.amount else {
        return false;
    };
    if (amount - invoice.gross_amount).abs() > REVERSE_AMOUNT_TOLERANCE {
        return false;
    }
    contractor_names_agree(&payment.contractor, &invoice.contractor_name)
}

/// Strict predicate used when a new bank statement is bulk-processed against
/// open invoices.
///
/// Identity: the invoice number (alphanumeric-folded) appears inside the
/// payment description, or - only when that fails - the contractor names
/// agree. Amount: `|payment - |gross|| < 0.20`.
#[must_use]
pub fn forward_match(
    amount: Decimal,
    contractor: &str,
    description: &str,
    invoice: &InvoiceCandidate,
) -> bool {
    let mut identity = false;

    if !description.is_empty() && !invoice.invoice_number.is_empty() {
        let reference = normalize_reference(&invoice.invoice_number);
        if !reference.is_empty() && normalize_reference(description).contains(&reference) {
            identity = true;
        }
    }

    if !identity {
        identity = contractor_names_agree(contractor, &invoice.contractor_name);
    }

    identity && (invoice.gross_amount.abs() - amount).abs() < FORWARD_AMOUNT_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::types::PaymentKind;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn invoice(number: &str, contractor: &str, gross: Decimal) -> InvoiceCandidate {
        InvoiceCandidate {
            id: Uuid::new_v4(),
            invoice_number: number.to_string(),
            contractor_name: contractor.to_string(),
            gross_amount: gross,
        }
    }

    fn payment(amount: Option<Decimal>, contractor: &str) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            date: None,
            amount,
            kind: PaymentKind::Outgoing,
            contractor: contractor.to_string(),
            description: String::new(),
            category: None,
            match_status: None,
            matched_invoice_id: None,
            matched_invoice_number: None,
        }
    }

    #[test]
    fn test_reverse_match_contractor_containment_both_directions() {
        let inv = invoice("F/1", "Acme Corp", dec!(500.00));
        assert!(reverse_match(&payment(Some(dec!(500.00)), "Acme"), &inv));

        let inv = invoice("F/1", "Acme", dec!(500.00));
        assert!(reverse_match(
            &payment(Some(dec!(500.00)), "ACME CORP SP Z OO"),
            &inv
        ));
    }

    #[rstest]
    #[case::exact(dec!(500.00), true)]
    #[case::inside_tolerance(dec!(500.05), true)]
    #[case::just_outside(dec!(500.06), false)]
    #[case::below_inside(dec!(499.95), true)]
    #[case::below_outside(dec!(499.94), false)]
    fn test_reverse_match_tolerance_boundary(#[case] amount: Decimal, #[case] expected: bool) {
        let inv = invoice("F/1", "Acme", dec!(500.00));
        assert_eq!(reverse_match(&payment(Some(amount), "Acme"), &inv), expected);
    }

    #[test]
    fn test_reverse_match_missing_name_is_failure_not_wildcard() {
        let inv = invoice("F/1", "", dec!(100.00));
        assert!(!reverse_match(&payment(Some(dec!(100.00)), "Acme"), &inv));

        let inv = invoice("F/1", "Acme", dec!(100.00));
        assert!(!reverse_match(&payment(Some(dec!(100.00)), ""), &inv));
    }

    #[test]
    fn test_reverse_match_requires_parsed_amount() {
        let inv = invoice("F/1", "Acme", dec!(100.00));
        assert!(!reverse_match(&payment(None, "Acme"), &inv));
    }

    #[test]
    fn test_reverse_match_whitespace_and_case_insensitive() {
        let inv = invoice("F/1", "Hotel Złoty Groń", dec!(250.00));
        assert!(reverse_match(
            &payment(Some(dec!(250.00)), "HOTEL ZŁOTY GROŃ"),
            &inv
        ));
    }

    #[test]
    fn test_forward_match_invoice_number_in_description() {
        let inv = invoice("A123", "Somebody Else Entirely", dec!(1000.00));
        assert!(forward_match(
            dec!(1000.00),
            "no overlap here",
            "przelew za fakturę inv A-123",
            &inv
        ));
    }

    #[test]
    fn test_forward_match_contractor_fallback() {
        let inv = invoice("F/2026/07", "Tauron Sprzedaż", dec!(320.00));
        assert!(forward_match(
            dec!(320.00),
            "TAURON SPRZEDAŻ SA",
            "description with no number",
            &inv
        ));
    }

    #[rstest]
    // Strict boundary: |gross - amount| < 0.20.
    #[case::inside(dec!(1000.19), true)]
    #[case::at_boundary(dec!(1000.20), false)]
    #[case::outside(dec!(1000.21), false)]
    fn test_forward_match_tolerance_boundary(#[case] gross: Decimal, #[case] expected: bool) {
        let inv = invoice("A123", "Acme", gross);
        assert_eq!(
            forward_match(dec!(1000.00), "Acme", "whatever", &inv),
            expected
        );
    }

    #[test]
    fn test_forward_match_negative_gross_uses_absolute_value() {
        let inv = invoice("K/1", "Acme", dec!(-150.00));
        assert!(forward_match(dec!(150.00), "Acme", "korekta", &inv));
    }

    #[test]
    fn test_forward_match_requires_both_criteria() {
        // Identity agrees, amount does not.
        let inv = invoice("A123", "Acme", dec!(900.00));
        assert!(!forward_match(dec!(1000.00), "Acme", "inv A123", &inv));

        // Amount agrees, identity does not.
        let inv = invoice("A123", "Acme", dec!(1000.00));
        assert!(!forward_match(dec!(1000.00), "Globex", "unrelated", &inv));
    }

    #[test]
    fn test_normalize_reference_strips_punctuation() {
        assert_eq!(normalize_reference("FV/2026/03-17 A"), "fv20260317a");
    }
}
