//! Error types for QARAG

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QaragError {
    // Request errors
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    // Document errors
    #[error("Failed to process document {document_id}: {reason}")]
    DocumentProcessing { document_id: String, reason: String },

    // Collaborator errors
    #[error("Provider {provider} unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    #[error("Vector index unavailable: {reason}")]
    IndexUnavailable { reason: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl QaragError {
    /// Shorthand for a validation failure on a named field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), reason: reason.into() }
    }

    /// Shorthand for a provider failure
    pub fn provider(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable { provider: provider.into(), reason: reason.into() }
    }

    /// Shorthand for an index failure
    pub fn index(reason: impl Into<String>) -> Self {
        Self::IndexUnavailable { reason: reason.into() }
    }

    /// Whether a retry policy may attempt the failed call again.
    ///
    /// Only provider failures are transient; everything else either cannot
    /// succeed on a second attempt or has no degraded path.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable { .. })
    }
}

impl From<serde_json::Error> for QaragError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QaragError>;
