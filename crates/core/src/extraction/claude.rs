//! Anthropic Messages API client.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bilans_shared::config::ExtractionConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reconcile::PaymentDraft;

use super::error::ExtractionError;
use super::types::{DocumentFile, ExtractedInvoice, MediaType};
use super::DocumentExtractor;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const PDF_BETA: &str = "pdfs-2024-09-25";
const MAX_TOKENS: u32 = 4096;

const INVOICE_PROMPT: &str = "\
Analyze this invoice (which may consist of multiple images or pages) and extract \
the following fields into a JSON object:
- invoiceNumber (string)
- contractorName (string)
- contractorNIP (string or null)
- issueDate (YYYY-MM-DD or null)
- saleDate (YYYY-MM-DD or null)
- paymentDate (YYYY-MM-DD or null)
- netAmount (number or null)
- vatAmount (number or null)
- grossAmount (number)
- accountNumber (string or null)
- paymentMethod (string or null)
- category (string, guess from content e.g. 'Paliwo', 'Biuro', 'Uslugi', 'Towar', 'Media', 'Leasing', 'Inne')

Return ONLY the JSON object. No markdown formatting, no explanations.";

const STATEMENT_PROMPT: &str = "\
Extract all payments/transactions from this document (which may consist of \
multiple images, pages, or text/CSV data). Return a JSON object with a key \
\"payments\" containing an array of transactions. Each transaction must have:
- date (YYYY-MM-DD)
- amount (number, absolute value)
- kind (string, 'incoming' or 'outgoing')
- contractor (string, guessed from description)
- description (string)

Return ONLY the JSON object.";

const INVOICE_SYSTEM: &str = "You are an expert accountant AI. Your task is to \
extract invoice data from the provided document(s) and output it as strict JSON.";

const STATEMENT_SYSTEM: &str = "You are an expert accountant AI. Analyze this bank \
statement (image, PDF, or CSV) and extract all transaction rows. Return strict JSON.";

/// Document extractor backed by the Anthropic Messages API.
pub struct ClaudeExtractor {
    config: ExtractionConfig,
    client: Client,
}

impl ClaudeExtractor {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Fails when the API key is missing or the HTTP client cannot be built.
    pub fn new(config: ExtractionConfig) -> Result<Self, ExtractionError> {
        if config.api_key.is_empty() {
            return Err(ExtractionError::NotConfigured(
                "extraction API key is empty".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExtractionError::NotConfigured(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn content_blocks(files: &[DocumentFile], prompt: &str) -> Vec<ContentBlock> {
        let mut blocks: Vec<ContentBlock> = files.iter().map(file_block).collect();
        blocks.push(ContentBlock::Text {
            text: prompt.to_string(),
        });
        blocks
    }

    async fn send(
        &self,
        system: &str,
        blocks: Vec<ContentBlock>,
        wants_pdf_beta: bool,
    ) -> Result<String, ExtractionError> {
        let request = MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: MAX_TOKENS,
            temperature: 0,
            system: system.to_string(),
            messages: vec![Message {
                role: "user",
                content: blocks,
            }],
        };

        debug!(model = %self.config.model, "sending extraction request");

        let mut builder = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION);
        if wants_pdf_beta {
            builder = builder.header("anthropic-beta", PDF_BETA);
        }

        let response = builder
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let api_response: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::InvalidResponse(e.to_string()))?;

        api_response
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| ExtractionError::InvalidResponse("response had no text block".into()))
    }
}

#[async_trait]
impl DocumentExtractor for ClaudeExtractor {
    async fn extract_invoice(
        &self,
        files: &[DocumentFile],
    ) -> Result<ExtractedInvoice, ExtractionError> {
        let wants_pdf = files.iter().any(|f| f.media_type == MediaType::Pdf);
        let blocks = Self::content_blocks(files, INVOICE_PROMPT);
        let text = self.send(INVOICE_SYSTEM, blocks, wants_pdf).await?;

        let json = extract_json_object(&text)
            .ok_or_else(|| ExtractionError::InvalidResponse("no JSON object in response".into()))?;
        serde_json::from_str(json).map_err(|e| ExtractionError::InvalidResponse(e.to_string()))
    }

    async fn extract_statement(
        &self,
        files: &[DocumentFile],
    ) -> Result<Vec<PaymentDraft>, ExtractionError> {
        let wants_pdf = files.iter().any(|f| f.media_type == MediaType::Pdf);
        let blocks = Self::content_blocks(files, STATEMENT_PROMPT);
        let text = self.send(STATEMENT_SYSTEM, blocks, wants_pdf).await?;

        let json = extract_json_object(&text)
            .ok_or_else(|| ExtractionError::InvalidResponse("no JSON object in response".into()))?;
        let payload: StatementPayload = serde_json::from_str(json)
            .map_err(|e| ExtractionError::InvalidResponse(e.to_string()))?;
        Ok(payload.payments)
    }
}

fn file_block(file: &DocumentFile) -> ContentBlock {
    if file.media_type.is_textual() {
        return ContentBlock::Text {
            text: format!(
                "[FILE CONTENT START ({})]\n{}\n[FILE CONTENT END]",
                file.file_name,
                String::from_utf8_lossy(&file.bytes)
            ),
        };
    }

    let source = Base64Source {
        kind: "base64",
        media_type: file.media_type.mime(),
        data: BASE64.encode(&file.bytes),
    };
    match file.media_type {
        MediaType::Pdf => ContentBlock::Document { source },
        _ => ContentBlock::Image { source },
    }
}

/// Cuts the outermost JSON object out of model chatter.
///
/// The prompt forbids markdown fences, but the model occasionally adds them
/// anyway; taking the first `{` to the last `}` recovers the object.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: u8,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentBlock {
    Text { text: String },
    Image { source: Base64Source },
    Document { source: Base64Source },
}

#[derive(Debug, Serialize)]
struct Base64Source {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'static str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementPayload {
    #[serde(default)]
    payments: Vec<PaymentDraft>,
}
