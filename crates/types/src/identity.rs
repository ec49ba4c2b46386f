use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IdentifierError;

/// Identity of a file owner or third party.
///
/// Wallet addresses (`0x6FEA...`) and free-form party names (`XYZ NBFC`) are
/// both accepted. The value is stored in canonical ASCII-lowercase form, so
/// equality, ordering and hashing are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Maximum identity length in characters, after trimming.
    pub const MAX_LEN: usize = 256;

    /// Parse and canonicalise an identity string.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty { kind: "identity" });
        }
        if trimmed.chars().count() > Self::MAX_LEN {
            return Err(IdentifierError::TooLong {
                kind: "identity",
                max: Self::MAX_LEN,
            });
        }
        if let Some(ch) = trimmed.chars().find(|c| c.is_control()) {
            return Err(IdentifierError::InvalidCharacter {
                kind: "identity",
                ch,
            });
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Canonical (lowercase) form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against an unparsed identity string.
    pub fn matches(&self, raw: &str) -> bool {
        self.0.eq_ignore_ascii_case(raw.trim())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identity {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.0
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
