use thiserror::Error;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors returned by ledger clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No authoritative answer could be obtained (network, upstream outage).
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The ledger refused the transaction (insufficient rights, revert).
    #[error("ledger rejected transaction: {0}")]
    Rejected(String),

    /// The ledger answered with something we could not interpret.
    #[error("unexpected ledger response: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for LedgerError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Protocol(value.to_string())
        } else {
            Self::Unavailable(value.to_string())
        }
    }
}
