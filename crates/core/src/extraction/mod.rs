//! AI-assisted document extraction.
//!
//! Invoices arrive as scans or PDFs; bank statements additionally arrive as
//! CSV, which [`crate::statement`] handles locally without ever touching the
//! extractor. Everything else is sent to the model behind
//! [`DocumentExtractor`].

mod claude;
mod error;
mod types;

use async_trait::async_trait;

pub use claude::ClaudeExtractor;
pub use error::ExtractionError;
pub use types::{DocumentFile, ExtractedInvoice, MediaType};

use crate::reconcile::PaymentDraft;

/// Extracts structured data from uploaded documents.
///
/// Implemented for the hosted model client and for test doubles.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Reads the fields of one invoice, possibly spread over several pages.
    async fn extract_invoice(
        &self,
        files: &[DocumentFile],
    ) -> Result<ExtractedInvoice, ExtractionError>;

    /// Reads all transaction rows from a statement document.
    async fn extract_statement(
        &self,
        files: &[DocumentFile],
    ) -> Result<Vec<PaymentDraft>, ExtractionError>;
}
