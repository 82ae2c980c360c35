//! Upload and extraction result types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// File types the pipeline knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    /// PDF document, sent to the model as a document block.
    Pdf,
    /// PNG image.
    Png,
    /// JPEG image.
    Jpeg,
    /// CSV export, parsed locally when possible.
    Csv,
    /// Plain text, embedded into the prompt verbatim.
    Text,
}

impl MediaType {
    /// Guesses the media type from a file name's extension.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.').map(|(_, e)| e.to_lowercase())?;
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "csv" => Some(Self::Csv),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }

    /// MIME type used on the wire.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Csv => "text/csv",
            Self::Text => "text/plain",
        }
    }

    /// True for types embedded into the prompt as text rather than base64.
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(self, Self::Csv | Self::Text)
    }
}

/// One uploaded file, held in memory until stored.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    /// Original file name as uploaded.
    pub file_name: String,
    /// Detected media type.
    pub media_type: MediaType,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// Invoice fields as the model reports them.
///
/// Everything except the number and gross amount is best-effort; documents
/// routinely omit the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedInvoice {
    /// Invoice number as printed.
    pub invoice_number: String,
    /// Counterparty name.
    pub contractor_name: String,
    /// Counterparty tax id, when printed. The prompt asks for the key
    /// spelled `contractorNIP`.
    #[serde(default, rename = "contractorNIP")]
    pub contractor_nip: Option<String>,
    /// Issue date.
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    /// Sale date.
    #[serde(default)]
    pub sale_date: Option<NaiveDate>,
    /// Payment due date.
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    /// Net amount.
    #[serde(default)]
    pub net_amount: Option<Decimal>,
    /// VAT amount.
    #[serde(default)]
    pub vat_amount: Option<Decimal>,
    /// Gross amount due.
    pub gross_amount: Decimal,
    /// Bank account to pay into.
    #[serde(default)]
    pub account_number: Option<String>,
    /// Payment method, when printed.
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Cost category the model guessed from the document's content.
    #[serde(default)]
    pub category: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case("faktura.PDF", Some(MediaType::Pdf))]
    #[case("scan.jpeg", Some(MediaType::Jpeg))]
    #[case("wyciag.csv", Some(MediaType::Csv))]
    #[case("notes.txt", Some(MediaType::Text))]
    #[case("archive.zip", None)]
    #[case("no_extension", None)]
    fn test_media_type_detection(#[case] name: &str, #[case] expected: Option<MediaType>) {
        assert_eq!(MediaType::from_file_name(name), expected);
    }

    #[test]
    fn test_invoice_parses_with_minimal_fields() {
        let json = r#"{
            "invoiceNumber": "FV 12/07/2026",
            "contractorName": "Tauron Sprzedaż",
            "grossAmount": 1543.21
        }"#;
        let invoice: ExtractedInvoice = serde_json::from_str(json).unwrap();

        assert_eq!(invoice.invoice_number, "FV 12/07/2026");
        assert_eq!(invoice.gross_amount, dec!(1543.21));
        assert!(invoice.net_amount.is_none());
        assert!(invoice.issue_date.is_none());
    }

    #[test]
    fn test_invoice_parses_full_payload() {
        let json = r#"{
            "invoiceNumber": "FV 1/2026",
            "contractorName": "Acme Sp. z o.o.",
            "contractorNIP": "5272000000",
            "issueDate": "2026-07-01",
            "saleDate": "2026-06-30",
            "paymentDate": "2026-07-15",
            "netAmount": 1000.00,
            "vatAmount": 230.00,
            "grossAmount": 1230.00,
            "accountNumber": "PL61109010140000071219812874",
            "paymentMethod": "przelew",
            "category": "Media"
        }"#;
        let invoice: ExtractedInvoice = serde_json::from_str(json).unwrap();

        assert_eq!(invoice.contractor_nip.as_deref(), Some("5272000000"));
        assert_eq!(invoice.issue_date, NaiveDate::from_ymd_opt(2026, 7, 1));
        assert_eq!(invoice.vat_amount, Some(dec!(230.00)));
    }
}
