//! Shared identifier types for the FinTrust access gate.
//!
//! Identities are compared case-insensitively through their canonical
//! (ASCII-lowercase) form. File identifiers are opaque strings; their
//! [`FileHash`] is the key under which the authorization ledger stores grants.

pub mod error;
pub mod file;
pub mod identity;

pub use error::IdentifierError;
pub use file::{ContentRef, FileHash, FileId, FILE_HASH_BYTES};
pub use identity::Identity;
