//! File record data model.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use fintrust_types::{ContentRef, FileHash, FileId, Identity};
use serde::{Deserialize, Serialize};

/// Maximum display-name length in characters.
pub const MAX_FILE_NAME_LEN: usize = 255;

/// Ownership and sharing metadata for one stored file.
///
/// `owner`, `content_ref` and `uploaded_at` are fixed at creation. The only
/// mutation a store performs is growing `authorized_parties`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Stable identifier; the ledger key is derived from it.
    pub id: FileId,

    /// Wallet-style identity of the uploader.
    pub owner: Identity,

    /// Display name.
    pub file_name: String,

    /// Pointer into bulk storage.
    pub content_ref: ContentRef,

    pub uploaded_at: DateTime<Utc>,

    /// Mirror of ledger grants, in canonical identity order.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub authorized_parties: BTreeSet<Identity>,
}

impl FileRecord {
    /// Create a record with a derived identifier, uploaded now.
    pub fn new(owner: Identity, file_name: impl Into<String>, content_ref: ContentRef) -> Self {
        Self::new_at_time(owner, file_name, content_ref, Utc::now())
    }

    /// Create a record with a derived identifier and explicit upload time.
    pub fn new_at_time(
        owner: Identity,
        file_name: impl Into<String>,
        content_ref: ContentRef,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        let id = FileId::derive(&owner, &content_ref, uploaded_at.timestamp_millis());
        Self::with_id(id, owner, file_name, content_ref, uploaded_at)
    }

    /// Create a record under an externally chosen identifier (e.g. a CID).
    pub fn with_id(
        id: FileId,
        owner: Identity,
        file_name: impl Into<String>,
        content_ref: ContentRef,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner,
            file_name: file_name.into(),
            content_ref,
            uploaded_at,
            authorized_parties: BTreeSet::new(),
        }
    }

    pub fn ledger_hash(&self) -> FileHash {
        self.id.ledger_hash()
    }

    pub fn is_owned_by(&self, identity: &Identity) -> bool {
        &self.owner == identity
    }

    /// Validate the record fields.
    pub fn validate(&self) -> Result<(), String> {
        let name = self.file_name.trim();
        if name.is_empty() {
            return Err("File name cannot be empty".to_string());
        }
        if name.chars().count() > MAX_FILE_NAME_LEN {
            return Err(format!(
                "File name too long (max {MAX_FILE_NAME_LEN} chars)"
            ));
        }
        if name.chars().any(|c| c.is_control()) {
            return Err("File name contains control characters".to_string());
        }
        Ok(())
    }
}
