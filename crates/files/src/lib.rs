//! FinTrust file records
//!
//! Tracks who owns which file and which third parties the owner has granted
//! access to. The granted-party set is a non-authoritative mirror of the
//! authorization ledger, kept for listings and display; access decisions are
//! never taken from it.

pub mod error;
pub mod record;
pub mod sled_store;
pub mod storage;

pub use error::{StoreError, StoreResult};
pub use record::FileRecord;
pub use sled_store::SledFileStore;
pub use storage::{MemoryFileStore, MetadataStore};
