//! FinTrust authorization ledger
//!
//! The ledger is the single source of truth for per-file third-party grants:
//! a monotone map `(file hash, party) -> authorized`, typically a smart
//! contract reached through a relayer. This crate defines the client seam and
//! ships an in-memory ledger plus an HTTP relayer client.

pub mod error;
pub mod http;
pub mod ledger;
pub mod memory;

pub use error::{LedgerError, LedgerResult};
pub use http::HttpLedger;
pub use ledger::{AuthorizationLedger, TransactionReceipt};
pub use memory::{LedgerFaults, MemoryLedger};
