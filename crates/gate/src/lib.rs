//! FinTrust access gate
//!
//! Decides whether a requester may retrieve a file and lets owners grant
//! third parties access. The authorization ledger is the only source of truth
//! for non-owner access; the granted-party set kept on each file record is a
//! mirror that is updated strictly after the ledger confirms a grant.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fintrust_gate::{AccessGate, GateConfig, TracingAuditSink};
//! use fintrust_files::MemoryFileStore;
//! use fintrust_ledger::MemoryLedger;
//!
//! let gate = AccessGate::new(
//!     Arc::new(MemoryFileStore::new()),
//!     Arc::new(MemoryLedger::new()),
//!     Arc::new(TracingAuditSink),
//!     GateConfig::default(),
//! );
//! let file = gate.register_file("0xAAA", "statement.pdf", "QmStatement").await?;
//! gate.authorize_third_party(file.id.as_str(), "0xAAA", "0xBBB").await?;
//! assert!(gate.check_access(file.id.as_str(), "0xBBB").await?.is_authorized());
//! ```

pub mod audit;
pub mod config;
pub mod credentials;
pub mod decision;
pub mod error;
pub mod gate;

pub use audit::{
    AuditEvent, AuditEventKind, AuditSink, JsonlAuditSink, MemoryAuditSink, TracingAuditSink,
};
pub use config::GateConfig;
pub use credentials::{CredentialError, IssuedCredential, ThirdPartyRegistry};
pub use decision::{AccessDecision, AuthorizedBy, CacheUpdate, Committed, DenialReason, FileView};
pub use error::{ErrorKind, GateError, GateResult};
pub use gate::AccessGate;
