//! Lenient parsing of statement amounts.
//!
//! Bank exports and verified upload payloads carry amounts as JSON numbers
//! or as strings like `"1 234,56"` (space thousands separator, comma decimal
//! mark). A row with an unparseable amount is skipped by the engine, never
//! a batch failure.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Parses a statement amount, tolerating whitespace separators and a comma
/// decimal mark. Returns the signed value; callers decide whether they need
/// the absolute one.
#[must_use]
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned).ok()
}

/// An amount as it arrives in a request payload: either a JSON number or a
/// bank-formatted string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    /// A plain JSON number.
    Number(Decimal),
    /// A formatted string, e.g. `"1 234,56"`.
    Text(String),
}

impl RawAmount {
    /// Resolves to an absolute decimal amount, or `None` when unparseable.
    #[must_use]
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Number(value) => Some(value.abs()),
            Self::Text(raw) => parse_amount(raw).map(|value| value.abs()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case::plain("123.45", dec!(123.45))]
    #[case::comma_decimal("123,45", dec!(123.45))]
    #[case::space_thousands("1 234,56", dec!(1234.56))]
    #[case::nbsp_thousands("1\u{a0}234,56", dec!(1234.56))]
    #[case::negative("-250,00", dec!(-250.00))]
    #[case::integer("42", dec!(42))]
    fn test_parse_amount_accepts(#[case] raw: &str, #[case] expected: Decimal) {
        assert_eq!(parse_amount(raw), Some(expected));
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace("   ")]
    #[case::words("brak danych")]
    #[case::double_separator("1.234,56")]
    fn test_parse_amount_rejects(#[case] raw: &str) {
        assert_eq!(parse_amount(raw), None);
    }

    #[test]
    fn test_raw_amount_from_number_takes_absolute_value() {
        let raw: RawAmount = serde_json::from_str("-600.5").unwrap();
        assert_eq!(raw.to_decimal(), Some(dec!(600.5)));
    }

    #[test]
    fn test_raw_amount_from_string() {
        let raw: RawAmount = serde_json::from_str("\"1 000,00\"").unwrap();
        assert_eq!(raw.to_decimal(), Some(dec!(1000.00)));
    }

    #[test]
    fn test_raw_amount_unparseable_string() {
        let raw = RawAmount::Text("n/a".into());
        assert_eq!(raw.to_decimal(), None);
    }
}
