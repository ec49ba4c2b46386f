//! HTTP API for the FinTrust access gate.

pub mod files;
pub mod server;
pub mod third_party;

pub use server::{build_router, start_server, AppState};
