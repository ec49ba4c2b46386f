//! Metadata store error types

use fintrust_types::FileId;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("File not found: {0}")]
    NotFound(FileId),

    #[error("File already exists: {0}")]
    AlreadyExists(FileId),

    #[error("Invalid file record: {0}")]
    Invalid(String),

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
