use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Upper bound on a single ledger query or commit, in milliseconds.
    pub ledger_timeout_ms: u64,
    /// Base URL used to render content pointers in file views.
    pub content_gateway: String,
}

impl GateConfig {
    pub fn ledger_timeout(&self) -> Duration {
        Duration::from_millis(self.ledger_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.ledger_timeout_ms == 0 {
            return Err("ledger timeout must be greater than zero".to_string());
        }
        if self.content_gateway.trim().is_empty() {
            return Err("content gateway must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            ledger_timeout_ms: 10_000,
            content_gateway: "https://ipfs.io/ipfs".to_string(),
        }
    }
}
