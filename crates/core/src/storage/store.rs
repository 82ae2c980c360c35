//! Document store implementation using Apache OpenDAL.

use bilans_shared::config::StorageConfig;
use chrono::Utc;
use opendal::{Operator, services};

use super::error::StorageError;

/// Store for uploaded document originals.
pub struct DocumentStore {
    operator: Operator,
}

impl DocumentStore {
    /// Create a store from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be initialized or the backend
    /// name is unknown.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let operator = match config.backend.as_str() {
            "fs" => {
                let builder = services::Fs::default().root(&config.root);
                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            "s3" => {
                let builder = services::S3::default()
                    .endpoint(&config.endpoint)
                    .bucket(&config.bucket)
                    .region(&config.region)
                    .access_key_id(&config.access_key_id)
                    .secret_access_key(&config.secret_access_key);
                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            other => {
                return Err(StorageError::configuration(format!(
                    "unknown storage backend '{other}'"
                )));
            }
        };

        Ok(Self { operator })
    }

    /// Generate the storage key for a new upload.
    ///
    /// Format: `{entity}/{timestamp_millis}-{sanitized_filename}`. The
    /// timestamp prefix keeps repeated uploads of the same file distinct.
    #[must_use]
    pub fn generate_key(entity: &str, file_name: &str) -> String {
        format!(
            "{entity}/{}-{}",
            Utc::now().timestamp_millis(),
            sanitize_file_name(file_name)
        )
    }

    /// Write a document and return its storage key.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn store(
        &self,
        entity: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let key = Self::generate_key(entity, file_name);
        self.operator.write(&key, bytes).await?;
        Ok(key)
    }

    /// Read a stored document back.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not exist or the read fails.
    pub async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let buffer = self.operator.read(key).await?;
        Ok(buffer.to_vec())
    }

    /// Delete a stored document. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails for a reason other than absence.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self.operator.delete(key).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Sanitize a file name for use in a storage key.
///
/// Only ASCII alphanumerics and dots survive; everything else becomes an
/// underscore, and the result is lowercased.
fn sanitize_file_name(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
