//! Extraction error type.

use thiserror::Error;

/// Errors from the document extractor.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The extractor is missing its API key or base configuration.
    #[error("extractor not configured: {0}")]
    NotConfigured(String),

    /// The uploaded file's type cannot be sent to the model.
    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),

    /// The request never got a usable response.
    #[error("extraction request failed: {0}")]
    Network(String),

    /// The API answered with a non-success status.
    #[error("extraction API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        message: String,
    },

    /// The model answered, but not with the JSON we asked for.
    #[error("unusable model response: {0}")]
    InvalidResponse(String),
}
