//! Error types

/// Data layer errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input failed model validation; message carries field-level detail
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage engine failure (I/O, transaction abort)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Encryption or decryption failure
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Legacy-store migration failure for a single record kind
    #[error("Migration error: {0}")]
    Migration(String),

    /// Record required by the operation does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
