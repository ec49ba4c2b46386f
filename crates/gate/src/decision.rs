//! Outcomes of gate operations.

use std::fmt;

use chrono::{DateTime, Utc};
use fintrust_files::FileRecord;
use fintrust_ledger::TransactionReceipt;
use fintrust_types::{FileId, Identity};
use serde::Serialize;

/// Why a requester was authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizedBy {
    /// The requester is the recorded owner.
    Owner,
    /// The ledger holds a grant for the requester.
    Ledger,
}

/// Why a requester was denied.
///
/// `LedgerUnavailable` means no authoritative answer was obtained; it is
/// reported separately from a confirmed `NotAuthorized`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum DenialReason {
    NotAuthorized,
    LedgerUnavailable(String),
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::NotAuthorized => f.write_str("not authorized"),
            DenialReason::LedgerUnavailable(detail) => {
                write!(f, "authorization could not be confirmed: {detail}")
            }
        }
    }
}

/// Result of an access check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AccessDecision {
    Authorized { by: AuthorizedBy },
    Denied { reason: DenialReason },
}

impl AccessDecision {
    pub fn is_authorized(&self) -> bool {
        matches!(self, AccessDecision::Authorized { .. })
    }
}

/// What happened to the granted-party mirror after a ledger commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum CacheUpdate {
    Added,
    AlreadyPresent,
    /// The ledger grant stands; only the mirror lags.
    Failed(String),
}

/// Successful grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Committed {
    pub receipt: TransactionReceipt,
    pub cache: CacheUpdate,
}

/// File metadata and content pointer returned to an authorized requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileView {
    pub id: FileId,
    pub file_name: String,
    pub owner: Identity,
    pub content_ref: String,
    pub content_url: String,
    pub uploaded_at: DateTime<Utc>,
}

impl FileView {
    pub fn from_record(record: &FileRecord, gateway: &str) -> Self {
        Self {
            id: record.id.clone(),
            file_name: record.file_name.clone(),
            owner: record.owner.clone(),
            content_ref: record.content_ref.to_string(),
            content_url: record.content_ref.gateway_url(gateway),
            uploaded_at: record.uploaded_at,
        }
    }
}
