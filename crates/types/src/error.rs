/// Errors raised while parsing identifiers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IdentifierError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },
    #[error("{kind} exceeds {max} characters")]
    TooLong { kind: &'static str, max: usize },
    #[error("{kind} contains invalid character {ch:?}")]
    InvalidCharacter { kind: &'static str, ch: char },
    #[error("file hash must be 0x followed by {expected} hex characters, got {actual}")]
    InvalidHashLength { expected: usize, actual: usize },
    #[error("file hash is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
}
