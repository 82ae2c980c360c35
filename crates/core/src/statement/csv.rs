//! Windows-1250 CSV statement parser.
//!
//! The column layout is the one produced by the bank the two entities use:
//! col 0 is the booking date, col 3 the amount, col 6 the general title and
//! cols 7..=9 a varying mix of account number, counterparty and transfer
//! title. Rows are recognised by a leading ISO date; everything else
//! (headers, footers, blank lines) is ignored.

use std::sync::LazyLock;

use chrono::NaiveDate;
use encoding_rs::WINDOWS_1250;
use regex::Regex;
use tracing::debug;

use crate::matching::{PaymentKind, RawAmount, parse_amount};
use crate::reconcile::PaymentDraft;

use super::category::guess_category;

static DATA_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*"?\d{4}-\d{2}-\d{2}"#).unwrap());

static RECIPIENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Nazwa odbiorcy:\s*([^,]+)").unwrap());

static SENDER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Nazwa nadawcy:\s*([^,]+)").unwrap());

static LOCATION_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Lokalizacja: Adres:\s*([^,]+)").unwrap());

/// Tails that are transfer metadata rather than part of a counterparty name.
static CONTRACTOR_NOISE_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(Operacja:|Numer referencyjny:|Tytuł:|Lokalizacja:|Adres:|Data wykonania:|Oryginalna kwota:).*$",
    )
    .unwrap()
});

static CONTRACTOR_NOISE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Nazwa (odbiorcy|nadawcy):").unwrap());

/// Parses a raw statement export into payment drafts.
///
/// Rows with an unparseable amount are dropped here (they carry no usable
/// information at all), unlike confirmed payment rows, which the engine
/// keeps and merely skips.
#[must_use]
pub fn parse_statement_csv(bytes: &[u8]) -> Vec<PaymentDraft> {
    let (text, _, had_errors) = WINDOWS_1250.decode(bytes);
    if had_errors {
        debug!("statement contained bytes outside windows-1250");
    }

    let mut drafts = Vec::new();

    for line in text.lines() {
        if !DATA_ROW.is_match(line) {
            continue;
        }

        let cols = split_csv_line(line);
        if cols.len() < 4 {
            continue;
        }

        let Some(amount) = parse_amount(&cols[3]) else {
            continue;
        };
        let kind = if amount.is_sign_negative() {
            PaymentKind::Outgoing
        } else {
            PaymentKind::Incoming
        };

        let date = NaiveDate::parse_from_str(cols[0].trim(), "%Y-%m-%d").ok();

        let full_row = cols.join(" ");
        let contractor = clean_contractor(&extract_contractor(&full_row, &cols));

        let title = cols.get(6).map(String::as_str).unwrap_or_default();
        let operation = cols.get(9).map(String::as_str).unwrap_or_default();
        let description = format!("{title} {operation}").trim().to_string();

        let category = guess_category(&format!("{contractor} {title}"));

        drafts.push(PaymentDraft {
            date,
            amount: Some(RawAmount::Number(amount.abs())),
            kind,
            contractor,
            description,
            category,
        });
    }

    drafts
}

/// Splits one line on commas, honouring double-quoted cells.
///
/// Quote characters never reach the output; cells are trimmed.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut cols = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => cols.push(std::mem::take(&mut cell)),
            _ => cell.push(ch),
        }
    }
    cols.push(cell);

    cols.into_iter().map(|c| c.trim().to_string()).collect()
}

/// Picks the counterparty out of a row.
///
/// Explicit recipient and sender labels win, then card locations, then the
/// NETFLIX special case (its rows carry no labels at all), then whatever the
/// title column holds.
fn extract_contractor(full_row: &str, cols: &[String]) -> String {
    for re in [&RECIPIENT_NAME, &SENDER_NAME, &LOCATION_ADDRESS] {
        if let Some(caps) = re.captures(full_row) {
            let value = caps[1].split("Miasto:").next().unwrap_or_default().trim();
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }

    if full_row.to_lowercase().contains("netflix.com") {
        return "NETFLIX".to_string();
    }

    if let Some(col) = cols.get(8) {
        if col.contains("Lokalizacja:") {
            let value = col
                .replace("Lokalizacja: Adres:", "")
                .split("Miasto:")
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            if !value.is_empty() {
                return value;
            }
        }
    }

    cols.get(6)
        .filter(|c| !c.is_empty())
        .cloned()
        .unwrap_or_else(|| "Nieznany".to_string())
}

/// Strips transfer metadata from a counterparty candidate.
///
/// Falls back to a prefix of the raw text when cleaning eats everything.
fn clean_contractor(text: &str) -> String {
    let mut cleaned = CONTRACTOR_NOISE_TAIL.replace(text, "").into_owned();
    cleaned = CONTRACTOR_NOISE_PREFIX.replace(&cleaned, "").into_owned();
    cleaned = cleaned.replace(['\'', '"'], "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() < 2 {
        return text.chars().take(50).collect();
    }
    cleaned.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::PaymentKind;
    use rust_decimal_macros::dec;

    #[test]
    fn test_header_and_footer_rows_are_skipped() {
        let csv = "Data operacji,Data księgowania,Rodzaj,Kwota\n\
                   2026-07-01,2026-07-01,PRZELEW,\"-100,00\",PLN,X,opłata\n\
                   Saldo końcowe: 1 000,00";
        let drafts = parse_statement_csv(csv.as_bytes());
        assert_eq!(drafts.len(), 1);
    }

    #[test]
    fn test_amount_sign_decides_direction() {
        let csv = "2026-07-01,a,b,\"-1 234,56\",PLN,x,przelew\n\
                   2026-07-02,a,b,\"200,00\",PLN,x,wpłata";
        let drafts = parse_statement_csv(csv.as_bytes());

        assert_eq!(drafts[0].kind, PaymentKind::Outgoing);
        assert_eq!(drafts[0].resolve_amount(), Some(dec!(1234.56)));
        assert_eq!(drafts[1].kind, PaymentKind::Incoming);
        assert_eq!(drafts[1].resolve_amount(), Some(dec!(200.00)));
    }

    #[test]
    fn test_row_with_broken_amount_is_dropped() {
        let csv = "2026-07-01,a,b,n/a,PLN,x,przelew";
        assert!(parse_statement_csv(csv.as_bytes()).is_empty());
    }

    #[test]
    fn test_recipient_label_wins_over_title() {
        let csv = "2026-07-01,a,b,\"-50,00\",PLN,x,PRZELEW WYCHODZĄCY,rach,\
                   Nazwa odbiorcy: Tauron Sprzedaż Sp. z o.o.,Tytuł: FV 12/26";
        let drafts = parse_statement_csv(csv.as_bytes());

        assert_eq!(drafts[0].contractor, "Tauron Sprzedaż Sp. z o.o.");
        assert_eq!(drafts[0].category.as_deref(), Some("KOSZTY OGÓLNE - MEDIA"));
    }

    #[test]
    fn test_card_location_fallback() {
        let csv = "2026-07-01,a,b,\"-30,00\",PLN,x,PŁATNOŚĆ KARTĄ,rach,\
                   Lokalizacja: Adres: BIEDRONKA 77 Miasto: KRAKÓW,operacja";
        let drafts = parse_statement_csv(csv.as_bytes());

        assert_eq!(drafts[0].contractor, "BIEDRONKA 77");
        assert_eq!(
            drafts[0].category.as_deref(),
            Some("GASTRONOMIA KOSZTY - TOWARY")
        );
    }

    #[test]
    fn test_netflix_rows_get_a_name() {
        let csv = "2026-07-01,a,b,\"-43,00\",PLN,x,NETFLIX.COM 866-579-7172";
        let drafts = parse_statement_csv(csv.as_bytes());

        assert_eq!(drafts[0].contractor, "NETFLIX");
        assert_eq!(
            drafts[0].category.as_deref(),
            Some("KOSZTY OGÓLNE - OPROGRAMOWANIE")
        );
    }

    #[test]
    fn test_description_joins_title_and_operation() {
        let csv = "2026-07-01,a,b,\"-10,00\",c,d,TYTUŁEM FV 1/26,e,f,operacja kartą";
        let drafts = parse_statement_csv(csv.as_bytes());
        assert_eq!(drafts[0].description, "TYTUŁEM FV 1/26 operacja kartą");
    }

    #[test]
    fn test_windows_1250_bytes_decode() {
        // "żabka" with 0xBF for ż in windows-1250.
        let mut csv: Vec<u8> = b"2026-07-01,a,b,\"-5,00\",c,d,".to_vec();
        csv.extend_from_slice(&[0xBF]);
        csv.extend_from_slice(b"abka 123");
        let drafts = parse_statement_csv(&csv);

        assert_eq!(drafts[0].contractor, "żabka 123");
        assert_eq!(
            drafts[0].category.as_deref(),
            Some("GASTRONOMIA KOSZTY - TOWARY")
        );
    }

    #[test]
    fn test_date_is_parsed() {
        let csv = "2026-07-15,a,b,\"-5,00\",c,d,x";
        let drafts = parse_statement_csv(csv.as_bytes());
        assert_eq!(drafts[0].date, NaiveDate::from_ymd_opt(2026, 7, 15));
    }

    #[test]
    fn test_quoted_cells_keep_embedded_commas() {
        let cols = split_csv_line(r#""2026-07-01","a, b","c""#);
        assert_eq!(cols, vec!["2026-07-01", "a, b", "c"]);
    }
}
