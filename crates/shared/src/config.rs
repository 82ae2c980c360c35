//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Uploaded-document storage configuration.
    pub storage: StorageConfig,
    /// Extraction model configuration.
    pub extraction: ExtractionConfig,
    /// E-invoice registry configuration.
    pub registry: RegistryConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// Uploaded-document storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Storage backend: "fs" or "s3".
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    /// Root directory for the fs backend.
    #[serde(default = "default_storage_root")]
    pub root: String,
    /// Bucket name for the s3 backend.
    #[serde(default)]
    pub bucket: String,
    /// Endpoint for the s3 backend.
    #[serde(default)]
    pub endpoint: String,
    /// Region for the s3 backend.
    #[serde(default)]
    pub region: String,
    /// Access key id for the s3 backend.
    #[serde(default)]
    pub access_key_id: String,
    /// Secret access key for the s3 backend.
    #[serde(default)]
    pub secret_access_key: String,
}

fn default_storage_backend() -> String {
    "fs".to_string()
}

fn default_storage_root() -> String {
    "uploads".to_string()
}

/// Extraction model configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// API key for the extraction model.
    pub api_key: String,
    /// Model identifier.
    #[serde(default = "default_extraction_model")]
    pub model: String,
    /// Request timeout in seconds.
    #[serde(default = "default_extraction_timeout")]
    pub timeout_secs: u64,
}

fn default_extraction_model() -> String {
    "claude-sonnet-4-5".to_string()
}

fn default_extraction_timeout() -> u64 {
    120
}

/// E-invoice registry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Registry API base URL.
    #[serde(default = "default_registry_base_url")]
    pub base_url: String,
    /// Taxpayer identifier (NIP) used as the session context.
    #[serde(default)]
    pub nip: String,
    /// Pre-shared registry API token.
    #[serde(default)]
    pub api_token: String,
    /// Page size for invoice queries.
    #[serde(default = "default_registry_page_size")]
    pub page_size: u32,
}

fn default_registry_base_url() -> String {
    "https://ksef-test.mf.gov.pl/api".to_string()
}

fn default_registry_page_size() -> u32 {
    100
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("BILANS").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::host(default_host(), "0.0.0.0")]
    #[case::backend(default_storage_backend(), "fs")]
    #[case::root(default_storage_root(), "uploads")]
    fn test_string_defaults(#[case] actual: String, #[case] expected: &str) {
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_numeric_defaults() {
        assert_eq!(default_port(), 8080);
        assert_eq!(default_max_connections(), 10);
        assert_eq!(default_extraction_timeout(), 120);
        assert_eq!(default_registry_page_size(), 100);
    }
}
