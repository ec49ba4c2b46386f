//! Gate error types

use fintrust_files::StoreError;
use fintrust_ledger::LedgerError;
use fintrust_types::{FileId, Identity, IdentifierError};
use thiserror::Error;

use crate::decision::DenialReason;

pub type GateResult<T> = Result<T, GateError>;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Invalid {field}: {source}")]
    InvalidInput {
        field: &'static str,
        #[source]
        source: IdentifierError,
    },

    #[error("Invalid file metadata: {0}")]
    InvalidRecord(String),

    #[error("File not found: {0}")]
    NotFound(FileId),

    #[error("File already exists: {0}")]
    AlreadyExists(FileId),

    #[error("{caller} is not the owner of file {file_id}")]
    Forbidden { file_id: FileId, caller: Identity },

    #[error("Access denied: {0}")]
    Denied(DenialReason),

    #[error("Ledger commit failed: {0}")]
    LedgerCommitFailed(LedgerError),

    #[error("Metadata store unavailable: {0}")]
    Metadata(String),
}

/// Coarse classification used by transport layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    AlreadyExists,
    Forbidden,
    NotAuthorized,
    LedgerUnavailable,
    LedgerCommitFailed,
    MetadataUnavailable,
}

impl ErrorKind {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotAuthorized => "not_authorized",
            ErrorKind::LedgerUnavailable => "ledger_unavailable",
            ErrorKind::LedgerCommitFailed => "ledger_commit_failed",
            ErrorKind::MetadataUnavailable => "metadata_unavailable",
        }
    }
}

impl GateError {
    pub(crate) fn invalid(field: &'static str) -> impl FnOnce(IdentifierError) -> GateError {
        move |source| GateError::InvalidInput { field, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GateError::InvalidInput { .. } | GateError::InvalidRecord(_) => ErrorKind::InvalidInput,
            GateError::NotFound(_) => ErrorKind::NotFound,
            GateError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            GateError::Forbidden { .. } => ErrorKind::Forbidden,
            GateError::Denied(DenialReason::NotAuthorized) => ErrorKind::NotAuthorized,
            GateError::Denied(DenialReason::LedgerUnavailable(_)) => ErrorKind::LedgerUnavailable,
            GateError::LedgerCommitFailed(_) => ErrorKind::LedgerCommitFailed,
            GateError::Metadata(_) => ErrorKind::MetadataUnavailable,
        }
    }
}

impl From<StoreError> for GateError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => GateError::NotFound(id),
            StoreError::AlreadyExists(id) => GateError::AlreadyExists(id),
            StoreError::Invalid(msg) => GateError::InvalidRecord(msg),
            other => GateError::Metadata(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_kinds() {
        let id = FileId::parse("f1").unwrap();
        assert_eq!(
            GateError::from(StoreError::NotFound(id.clone())).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            GateError::from(StoreError::AlreadyExists(id)).kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            GateError::from(StoreError::Invalid("bad".into())).kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn denial_kinds_stay_distinct() {
        assert_eq!(
            GateError::Denied(DenialReason::NotAuthorized).kind().code(),
            "not_authorized"
        );
        assert_eq!(
            GateError::Denied(DenialReason::LedgerUnavailable("down".into()))
                .kind()
                .code(),
            "ledger_unavailable"
        );
    }
}
