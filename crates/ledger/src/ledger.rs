use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fintrust_types::{FileHash, Identity};
use serde::{Deserialize, Serialize};

use crate::error::LedgerResult;

/// Proof that a grant was durably recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Ledger transaction hash, `0x`-prefixed.
    pub tx_hash: String,
    pub file_hash: FileHash,
    pub party: Identity,
    pub committed_at: DateTime<Utc>,
}

/// Client for the external authorization ledger.
///
/// Every call is a fallible remote operation. Implementations must not retry
/// internally and must never report `true` without an authoritative answer.
#[async_trait]
pub trait AuthorizationLedger: Send + Sync {
    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;

    /// Whether `party` holds a grant for `file_hash`.
    async fn query_authorization(&self, file_hash: &FileHash, party: &Identity)
        -> LedgerResult<bool>;

    /// Record a grant for `party` on `file_hash`. Granting twice is harmless.
    async fn commit_authorization(
        &self,
        file_hash: &FileHash,
        party: &Identity,
    ) -> LedgerResult<TransactionReceipt>;
}
