//! Registry error type.

use thiserror::Error;

/// Errors from the e-invoice registry client.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Credentials are missing from configuration.
    #[error("registry not configured: {0}")]
    NotConfigured(String),

    /// The request never got a usable response.
    #[error("registry request failed: {0}")]
    Network(String),

    /// The registry answered with a non-success status.
    #[error("registry API error {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        body: String,
    },

    /// The registry rejected our session token twice in a row.
    #[error("registry rejected the session token")]
    AuthRejected,

    /// The registry answered with a body we could not interpret.
    #[error("unexpected registry response: {0}")]
    InvalidResponse(String),
}
