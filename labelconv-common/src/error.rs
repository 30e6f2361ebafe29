//! Common error types for the conversion request service

use thiserror::Error;

/// Common result type for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the request lifecycle core
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error (wraps serde_json::Error)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// An active request already exists for the submitting email
    #[error("Request already exists (id: {existing_id})")]
    Conflict { existing_id: String },

    /// An object-storage write failed; the submission was aborted as a whole
    #[error("Storage write failed: {0}")]
    StorageWrite(String),

    /// The backing storage service cannot be reached
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl Error {
    /// True for errors caused by transient backend trouble, where a
    /// bounded retry may help
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::StorageUnavailable(_) | Error::Io(_))
    }
}
