//! Access gate: per-file access checks and third-party grants.

use std::sync::Arc;

use fintrust_files::{FileRecord, MetadataStore};
use fintrust_ledger::{AuthorizationLedger, LedgerError};
use fintrust_types::{ContentRef, FileId, Identity};
use serde_json::json;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::audit::{AuditEvent, AuditEventKind, AuditSink};
use crate::config::GateConfig;
use crate::decision::{AccessDecision, AuthorizedBy, CacheUpdate, Committed, DenialReason, FileView};
use crate::error::{GateError, GateResult};

/// Decides file access and records third-party grants.
///
/// Non-owner access is answered by the ledger only. The granted-party set on
/// the file record is written after a successful commit and is never read
/// when deciding access.
pub struct AccessGate {
    store: Arc<dyn MetadataStore>,
    ledger: Arc<dyn AuthorizationLedger>,
    audit: Arc<dyn AuditSink>,
    config: GateConfig,
}

impl AccessGate {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        ledger: Arc<dyn AuthorizationLedger>,
        audit: Arc<dyn AuditSink>,
        config: GateConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            audit,
            config,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn ledger_name(&self) -> &'static str {
        self.ledger.name()
    }

    pub async fn file_count(&self) -> GateResult<u64> {
        Ok(self.store.count().await?)
    }

    /// Register a new file owned by `owner`.
    pub async fn register_file(
        &self,
        owner: &str,
        file_name: &str,
        content_ref: &str,
    ) -> GateResult<FileRecord> {
        let owner = Identity::parse(owner).map_err(GateError::invalid("owner"))?;
        let content_ref =
            ContentRef::parse(content_ref).map_err(GateError::invalid("content reference"))?;

        let record = FileRecord::new(owner, file_name.trim(), content_ref);
        record.validate().map_err(GateError::InvalidRecord)?;
        self.store.insert_file(record.clone()).await?;

        info!("Registered file {} for {}", record.id, record.owner);
        self.emit(
            AuditEvent::new(AuditEventKind::FileRegistered, &record.id, &record.owner)
                .with_details(json!({ "file_name": record.file_name })),
        )
        .await;
        Ok(record)
    }

    /// Decide whether `requester` may retrieve `file_id`.
    ///
    /// The owner is authorized without consulting the ledger. Anyone else is
    /// authorized only on a positive ledger answer within the configured
    /// timeout; a failed or late answer is a denial.
    pub async fn check_access(&self, file_id: &str, requester: &str) -> GateResult<AccessDecision> {
        let file_id = FileId::parse(file_id).map_err(GateError::invalid("file id"))?;
        let requester = Identity::parse(requester).map_err(GateError::invalid("requester"))?;
        let record = self.load(&file_id).await?;
        Ok(self.decide(&record, &requester).await)
    }

    /// Return the file view if `requester` is authorized.
    pub async fn fetch_file(&self, file_id: &str, requester: &str) -> GateResult<FileView> {
        let file_id = FileId::parse(file_id).map_err(GateError::invalid("file id"))?;
        let requester = Identity::parse(requester).map_err(GateError::invalid("requester"))?;
        let record = self.load(&file_id).await?;

        match self.decide(&record, &requester).await {
            AccessDecision::Authorized { .. } => {
                Ok(FileView::from_record(&record, &self.config.content_gateway))
            }
            AccessDecision::Denied { reason } => Err(GateError::Denied(reason)),
        }
    }

    /// Return the file view to a credentialed third party.
    ///
    /// Third-party identities are self-registered, so the owner shortcut does
    /// not apply here: the ledger must hold a grant for `party`.
    pub async fn fetch_granted_file(&self, file_id: &str, party: &str) -> GateResult<FileView> {
        let file_id = FileId::parse(file_id).map_err(GateError::invalid("file id"))?;
        let party = Identity::parse(party).map_err(GateError::invalid("third party"))?;
        let record = self.load(&file_id).await?;

        match self.consult_ledger(&record, &party).await {
            AccessDecision::Authorized { .. } => {
                Ok(FileView::from_record(&record, &self.config.content_gateway))
            }
            AccessDecision::Denied { reason } => Err(GateError::Denied(reason)),
        }
    }

    /// Record on the ledger that `third_party` may access `file_id`.
    ///
    /// Only the owner may grant. The grant-party mirror is updated after the
    /// ledger commit succeeds and never before.
    pub async fn authorize_third_party(
        &self,
        file_id: &str,
        caller: &str,
        third_party: &str,
    ) -> GateResult<Committed> {
        let file_id = FileId::parse(file_id).map_err(GateError::invalid("file id"))?;
        let caller = Identity::parse(caller).map_err(GateError::invalid("caller"))?;
        let third_party =
            Identity::parse(third_party).map_err(GateError::invalid("third party"))?;
        let record = self.load(&file_id).await?;

        if !record.is_owned_by(&caller) {
            warn!(
                "Rejected grant on {} for {}: {} is not the owner",
                file_id, third_party, caller
            );
            self.emit(
                AuditEvent::new(AuditEventKind::GrantForbidden, &file_id, &caller)
                    .with_subject(&third_party),
            )
            .await;
            return Err(GateError::Forbidden { file_id, caller });
        }

        let limit = self.config.ledger_timeout();
        let file_hash = record.ledger_hash();
        let outcome = match timeout(
            limit,
            self.ledger.commit_authorization(&file_hash, &third_party),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(LedgerError::Unavailable(format!(
                "commit timed out after {}ms",
                limit.as_millis()
            ))),
        };

        let receipt = match outcome {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(
                    "Ledger commit for {} on {} failed: {}",
                    third_party, file_id, err
                );
                self.emit(
                    AuditEvent::new(AuditEventKind::GrantFailed, &file_id, &caller)
                        .with_subject(&third_party)
                        .with_details(json!({ "error": err.to_string() })),
                )
                .await;
                return Err(GateError::LedgerCommitFailed(err));
            }
        };

        let cache = match self.store.add_authorized_party(&file_id, &third_party).await {
            Ok(true) => CacheUpdate::Added,
            Ok(false) => CacheUpdate::AlreadyPresent,
            Err(err) => {
                // The ledger grant is authoritative; the mirror catches up on the next grant.
                warn!(
                    "Ledger grant {} committed but cache update for {} failed: {}",
                    receipt.tx_hash, file_id, err
                );
                CacheUpdate::Failed(err.to_string())
            }
        };

        info!(
            "Granted {} access to {} (tx {})",
            third_party, file_id, receipt.tx_hash
        );
        self.emit(
            AuditEvent::new(AuditEventKind::GrantCommitted, &file_id, &caller)
                .with_subject(&third_party)
                .with_details(json!({ "tx_hash": receipt.tx_hash, "cache": cache })),
        )
        .await;

        Ok(Committed { receipt, cache })
    }

    /// Files owned by `owner`, newest first.
    pub async fn list_files(&self, owner: &str) -> GateResult<Vec<FileRecord>> {
        let owner = Identity::parse(owner).map_err(GateError::invalid("owner"))?;
        Ok(self.store.list_by_owner(&owner).await?)
    }

    async fn load(&self, file_id: &FileId) -> GateResult<FileRecord> {
        self.store
            .get_file(file_id)
            .await?
            .ok_or_else(|| GateError::NotFound(file_id.clone()))
    }

    async fn decide(&self, record: &FileRecord, requester: &Identity) -> AccessDecision {
        if record.is_owned_by(requester) {
            self.emit(AuditEvent::new(
                AuditEventKind::AccessGranted,
                &record.id,
                requester,
            ))
            .await;
            return AccessDecision::Authorized {
                by: AuthorizedBy::Owner,
            };
        }
        self.consult_ledger(record, requester).await
    }

    async fn consult_ledger(&self, record: &FileRecord, requester: &Identity) -> AccessDecision {
        let limit = self.config.ledger_timeout();
        let answer = timeout(
            limit,
            self.ledger
                .query_authorization(&record.ledger_hash(), requester),
        )
        .await;

        let (decision, kind, details) = match answer {
            Ok(Ok(true)) => (
                AccessDecision::Authorized {
                    by: AuthorizedBy::Ledger,
                },
                AuditEventKind::AccessGranted,
                serde_json::Value::Null,
            ),
            Ok(Ok(false)) => (
                AccessDecision::Denied {
                    reason: DenialReason::NotAuthorized,
                },
                AuditEventKind::AccessDenied,
                serde_json::Value::Null,
            ),
            Ok(Err(err)) => {
                warn!("Ledger query for {} failed: {}", record.id, err);
                let detail = err.to_string();
                (
                    AccessDecision::Denied {
                        reason: DenialReason::LedgerUnavailable(detail.clone()),
                    },
                    AuditEventKind::AccessUnverified,
                    json!({ "error": detail }),
                )
            }
            Err(_) => {
                let detail = format!("query timed out after {}ms", limit.as_millis());
                warn!("Ledger query for {} timed out", record.id);
                (
                    AccessDecision::Denied {
                        reason: DenialReason::LedgerUnavailable(detail.clone()),
                    },
                    AuditEventKind::AccessUnverified,
                    json!({ "error": detail }),
                )
            }
        };

        debug!("Access to {} by {}: {:?}", record.id, requester, decision);
        self.emit(AuditEvent::new(kind, &record.id, requester).with_details(details))
            .await;
        decision
    }

    async fn emit(&self, event: AuditEvent) {
        if let Err(err) = self.audit.record(&event).await {
            warn!("Failed to record audit event {}: {}", event.id, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use fintrust_files::MemoryFileStore;
    use fintrust_ledger::{LedgerFaults, MemoryLedger};

    struct Fixture {
        gate: AccessGate,
        store: MemoryFileStore,
        ledger: MemoryLedger,
        audit: Arc<MemoryAuditSink>,
    }

    fn fixture() -> Fixture {
        let store = MemoryFileStore::new();
        let ledger = MemoryLedger::new();
        let audit = Arc::new(MemoryAuditSink::new());
        let gate = AccessGate::new(
            Arc::new(store.clone()),
            Arc::new(ledger.clone()),
            audit.clone(),
            GateConfig {
                ledger_timeout_ms: 500,
                ..Default::default()
            },
        );
        Fixture {
            gate,
            store,
            ledger,
            audit,
        }
    }

    #[tokio::test]
    async fn test_owner_needs_no_ledger() {
        let f = fixture();
        let file = f.gate.register_file("0xAAA", "a.pdf", "QmA").await.unwrap();
        f.ledger.set_faults(LedgerFaults {
            fail_queries: true,
            ..Default::default()
        });

        let decision = f.gate.check_access(file.id.as_str(), "0xaaa").await.unwrap();
        assert_eq!(
            decision,
            AccessDecision::Authorized {
                by: AuthorizedBy::Owner
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_input_checked_before_lookup() {
        let f = fixture();
        assert!(matches!(
            f.gate.check_access("missing", "  ").await,
            Err(GateError::InvalidInput {
                field: "requester",
                ..
            })
        ));
        assert!(matches!(
            f.gate.check_access("missing", "0xBBB").await,
            Err(GateError::NotFound(_))
        ));
        assert!(matches!(
            f.gate.authorize_third_party("missing", "0xAAA", "").await,
            Err(GateError::InvalidInput {
                field: "third party",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_name() {
        let f = fixture();
        let err = f.gate.register_file("0xAAA", "   ", "QmA").await.unwrap_err();
        assert!(matches!(err, GateError::InvalidRecord(_)));
        assert_eq!(f.store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_grant_flow_is_audited() {
        let f = fixture();
        let file = f.gate.register_file("0xAAA", "a.pdf", "QmA").await.unwrap();

        let committed = f
            .gate
            .authorize_third_party(file.id.as_str(), "0xAAA", "0xBBB")
            .await
            .unwrap();
        assert_eq!(committed.cache, CacheUpdate::Added);
        assert!(f
            .gate
            .check_access(file.id.as_str(), "0xBBB")
            .await
            .unwrap()
            .is_authorized());

        assert_eq!(
            f.audit.kinds(),
            vec![
                AuditEventKind::FileRegistered,
                AuditEventKind::GrantCommitted,
                AuditEventKind::AccessGranted,
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_file_renders_gateway_url() {
        let f = fixture();
        let file = f.gate.register_file("0xAAA", "a.pdf", "QmA").await.unwrap();

        let view = f.gate.fetch_file(file.id.as_str(), "0xAAA").await.unwrap();
        assert_eq!(view.content_url, "https://ipfs.io/ipfs/QmA");

        let err = f.gate.fetch_file(file.id.as_str(), "0xCCC").await.unwrap_err();
        assert!(matches!(err, GateError::Denied(DenialReason::NotAuthorized)));
    }

    #[tokio::test]
    async fn test_granted_fetch_ignores_ownership() {
        let f = fixture();
        let file = f.gate.register_file("0xAAA", "a.pdf", "QmA").await.unwrap();

        let err = f
            .gate
            .fetch_granted_file(file.id.as_str(), "0xaaa")
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Denied(DenialReason::NotAuthorized)));

        f.gate
            .authorize_third_party(file.id.as_str(), "0xAAA", "0xAAA")
            .await
            .unwrap();
        let view = f
            .gate
            .fetch_granted_file(file.id.as_str(), "0xaaa")
            .await
            .unwrap();
        assert_eq!(view.owner.as_str(), "0xaaa");
        assert_eq!(f.ledger.grant_count(), 1);
    }
}
