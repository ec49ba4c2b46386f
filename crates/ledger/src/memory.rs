//! In-memory ledger with fault injection.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fintrust_types::{FileHash, Identity};
use parking_lot::RwLock;
use sha3::{Digest, Keccak256};
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{AuthorizationLedger, TransactionReceipt};

/// Failures and latency to inject into [`MemoryLedger`] calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerFaults {
    /// Queries fail with [`LedgerError::Unavailable`].
    pub fail_queries: bool,
    /// Commits fail with [`LedgerError::Unavailable`].
    pub fail_commits: bool,
    /// Commits fail with [`LedgerError::Rejected`].
    pub reject_commits: bool,
    /// Delay applied before every call.
    pub latency: Option<Duration>,
}

/// Monotone in-memory ledger. Grants can be added, never removed.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<MemoryLedgerInner>,
}

#[derive(Default)]
struct MemoryLedgerInner {
    grants: RwLock<HashSet<(FileHash, Identity)>>,
    sequence: AtomicU64,
    faults: RwLock<LedgerFaults>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: LedgerFaults) -> Self {
        let ledger = Self::new();
        ledger.set_faults(faults);
        ledger
    }

    pub fn set_faults(&self, faults: LedgerFaults) {
        *self.inner.faults.write() = faults;
    }

    pub fn clear_faults(&self) {
        self.set_faults(LedgerFaults::default());
    }

    /// Direct state inspection, bypassing faults.
    pub fn is_authorized(&self, file_hash: &FileHash, party: &Identity) -> bool {
        self.inner
            .grants
            .read()
            .contains(&(*file_hash, party.clone()))
    }

    pub fn grant_count(&self) -> usize {
        self.inner.grants.read().len()
    }

    async fn apply_latency(&self) {
        let latency = self.inner.faults.read().latency;
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
    }

    fn transaction_hash(file_hash: &FileHash, party: &Identity, sequence: u64) -> String {
        let mut hasher = Keccak256::new();
        hasher.update(file_hash.as_bytes());
        hasher.update(party.as_str().as_bytes());
        hasher.update(sequence.to_le_bytes());
        format!("0x{}", hex::encode(hasher.finalize()))
    }
}

#[async_trait]
impl AuthorizationLedger for MemoryLedger {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn query_authorization(
        &self,
        file_hash: &FileHash,
        party: &Identity,
    ) -> LedgerResult<bool> {
        self.apply_latency().await;
        if self.inner.faults.read().fail_queries {
            return Err(LedgerError::Unavailable(
                "injected query failure".to_string(),
            ));
        }
        Ok(self.is_authorized(file_hash, party))
    }

    async fn commit_authorization(
        &self,
        file_hash: &FileHash,
        party: &Identity,
    ) -> LedgerResult<TransactionReceipt> {
        self.apply_latency().await;
        {
            let faults = self.inner.faults.read();
            if faults.reject_commits {
                return Err(LedgerError::Rejected(
                    "injected commit rejection".to_string(),
                ));
            }
            if faults.fail_commits {
                return Err(LedgerError::Unavailable(
                    "injected commit failure".to_string(),
                ));
            }
        }

        let inserted = self
            .inner
            .grants
            .write()
            .insert((*file_hash, party.clone()));
        let sequence = self.inner.sequence.fetch_add(1, Ordering::SeqCst);
        debug!(
            "memory ledger commit {} for {} (new grant: {})",
            file_hash, party, inserted
        );

        Ok(TransactionReceipt {
            tx_hash: Self::transaction_hash(file_hash, party, sequence),
            file_hash: *file_hash,
            party: party.clone(),
            committed_at: Utc::now(),
        })
    }
}
