//! File identifiers, ledger keys and content pointers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::error::IdentifierError;
use crate::identity::Identity;

/// Number of raw bytes in a [`FileHash`].
pub const FILE_HASH_BYTES: usize = 32;

/// Stable identifier of a file record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId(String);

impl FileId {
    pub const MAX_LEN: usize = 128;

    /// Parse a file identifier. Printable ASCII only, no whitespace.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        if raw.is_empty() {
            return Err(IdentifierError::Empty { kind: "file id" });
        }
        if raw.len() > Self::MAX_LEN {
            return Err(IdentifierError::TooLong {
                kind: "file id",
                max: Self::MAX_LEN,
            });
        }
        if let Some(ch) = raw.chars().find(|c| !c.is_ascii_graphic()) {
            return Err(IdentifierError::InvalidCharacter {
                kind: "file id",
                ch,
            });
        }
        Ok(Self(raw.to_string()))
    }

    /// Derive a deterministic identifier for a newly registered file.
    ///
    /// BLAKE3 over a domain tag, the owner's canonical identity, the content
    /// reference and the upload time in milliseconds.
    pub fn derive(owner: &Identity, content_ref: &ContentRef, uploaded_at_ms: i64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"FINTRUST_FILE");
        hasher.update(owner.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(content_ref.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(&uploaded_at_ms.to_le_bytes());
        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ledger key for this file.
    pub fn ledger_hash(&self) -> FileHash {
        FileHash::of(self)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FileId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FileId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FileId> for String {
    fn from(value: FileId) -> Self {
        value.0
    }
}

/// Ledger key of a file: Keccak-256 over the UTF-8 bytes of its [`FileId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileHash([u8; FILE_HASH_BYTES]);

impl FileHash {
    pub fn of(id: &FileId) -> Self {
        let digest = Keccak256::digest(id.as_str().as_bytes());
        Self(digest.into())
    }

    pub fn from_bytes(bytes: [u8; FILE_HASH_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FILE_HASH_BYTES] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from hex, with or without the `0x` prefix.
    pub fn from_hex(value: &str) -> Result<Self, IdentifierError> {
        let digits = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .unwrap_or(value);
        if digits.len() != FILE_HASH_BYTES * 2 {
            return Err(IdentifierError::InvalidHashLength {
                expected: FILE_HASH_BYTES * 2,
                actual: digits.len(),
            });
        }
        let mut bytes = [0u8; FILE_HASH_BYTES];
        hex::decode_to_slice(digits, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for FileHash {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<FileHash> for String {
    fn from(value: FileHash) -> Self {
        value.to_hex()
    }
}

/// Opaque pointer into bulk object storage, e.g. an IPFS CID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentRef(String);

impl ContentRef {
    pub const MAX_LEN: usize = 512;

    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty {
                kind: "content reference",
            });
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(IdentifierError::TooLong {
                kind: "content reference",
                max: Self::MAX_LEN,
            });
        }
        if let Some(ch) = trimmed.chars().find(|c| !c.is_ascii_graphic()) {
            return Err(IdentifierError::InvalidCharacter {
                kind: "content reference",
                ch,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Retrieval URL under a content gateway, e.g. `https://ipfs.io/ipfs/<cid>`.
    pub fn gateway_url(&self, gateway: &str) -> String {
        format!("{}/{}", gateway.trim_end_matches('/'), self.0)
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContentRef {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentRef> for String {
    fn from(value: ContentRef) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_hash_is_keccak256_of_identifier() {
        let id = FileId::parse("abc").unwrap();
        assert_eq!(
            id.ledger_hash().to_hex(),
            "0x4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45"
        );
    }

    #[test]
    fn ledger_hash_is_deterministic() {
        let id = FileId::parse("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG").unwrap();
        assert_eq!(FileHash::of(&id), FileHash::of(&id.clone()));

        let other = FileId::parse("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdH").unwrap();
        assert_ne!(FileHash::of(&id), FileHash::of(&other));
    }

    #[test]
    fn file_hash_hex_parsing() {
        let hash = FileId::parse("f1").unwrap().ledger_hash();
        let hex = hash.to_hex();
        assert_eq!(hex.len(), 66);
        assert_eq!(FileHash::from_hex(&hex).unwrap(), hash);
        assert_eq!(FileHash::from_hex(&hex[2..]).unwrap(), hash);

        assert!(matches!(
            FileHash::from_hex("0x1234"),
            Err(IdentifierError::InvalidHashLength { actual: 4, .. })
        ));
        assert!(matches!(
            FileHash::from_hex(&format!("0x{}", "zz".repeat(32))),
            Err(IdentifierError::InvalidHex(_))
        ));
    }

    #[test]
    fn file_hash_errors_compare_by_value() {
        assert_eq!(
            FileHash::from_hex(&format!("0x{}", "zz".repeat(32))).unwrap_err(),
            IdentifierError::InvalidHex(hex::FromHexError::InvalidHexCharacter { c: 'z', index: 0 })
        );
        assert_ne!(
            FileHash::from_hex("0x1234").unwrap_err(),
            IdentifierError::InvalidHex(hex::FromHexError::OddLength)
        );
    }

    #[test]
    fn file_id_rejects_whitespace_and_empty() {
        assert!(matches!(
            FileId::parse(""),
            Err(IdentifierError::Empty { .. })
        ));
        assert!(matches!(
            FileId::parse("file one"),
            Err(IdentifierError::InvalidCharacter { ch: ' ', .. })
        ));
        assert!(FileId::parse(&"x".repeat(FileId::MAX_LEN + 1)).is_err());
    }

    #[test]
    fn derived_ids_depend_on_every_input() {
        let owner = Identity::parse("0xAAA").unwrap();
        let other_owner = Identity::parse("0xBBB").unwrap();
        let content = ContentRef::parse("bafy-one").unwrap();
        let other_content = ContentRef::parse("bafy-two").unwrap();

        let base = FileId::derive(&owner, &content, 1_000);
        assert_eq!(base, FileId::derive(&owner, &content, 1_000));
        assert_eq!(base.as_str().len(), 64);
        assert_ne!(base, FileId::derive(&other_owner, &content, 1_000));
        assert_ne!(base, FileId::derive(&owner, &other_content, 1_000));
        assert_ne!(base, FileId::derive(&owner, &content, 1_001));

        // Owner case does not change the identifier.
        let upper = Identity::parse("0XAAA").unwrap();
        assert_eq!(base, FileId::derive(&upper, &content, 1_000));
    }

    #[test]
    fn gateway_url_joins_without_double_slash() {
        let cid = ContentRef::parse("QmHash").unwrap();
        assert_eq!(
            cid.gateway_url("https://ipfs.io/ipfs/"),
            "https://ipfs.io/ipfs/QmHash"
        );
        assert_eq!(
            cid.gateway_url("https://ipfs.io/ipfs"),
            "https://ipfs.io/ipfs/QmHash"
        );
    }
}
