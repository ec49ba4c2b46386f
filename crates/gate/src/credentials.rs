//! Third-party credentials.
//!
//! Each registered third party holds one API key. Only the argon2 PHC hash of
//! the key is retained; the plaintext is returned once at registration.

use std::collections::HashMap;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{DateTime, Utc};
use fintrust_types::{IdentifierError, Identity};
use parking_lot::RwLock;
use rand::RngCore;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

const API_KEY_BYTES: usize = 24;
const MAX_NAME_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Invalid third party identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    #[error("Invalid third party name: {0}")]
    InvalidName(String),

    #[error("Third party already registered: {0}")]
    AlreadyRegistered(Identity),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Credential hashing failed: {0}")]
    Hashing(String),
}

/// Credential handed out once at registration.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedCredential {
    pub third_party_id: Identity,
    pub name: String,
    pub api_key: String,
    pub created_at: DateTime<Utc>,
}

struct ThirdPartyEntry {
    name: String,
    api_key_hash: String,
    created_at: DateTime<Utc>,
}

/// Registered third parties keyed by canonical identity.
pub struct ThirdPartyRegistry {
    parties: RwLock<HashMap<Identity, ThirdPartyEntry>>,
    hasher: Argon2<'static>,
}

impl Default for ThirdPartyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ThirdPartyRegistry {
    pub fn new() -> Self {
        Self::with_params(Params::default())
    }

    /// Registry hashing keys with explicit argon2id cost parameters.
    pub fn with_params(params: Params) -> Self {
        Self {
            parties: RwLock::new(HashMap::new()),
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Register a third party and issue its API key.
    pub fn register(
        &self,
        third_party_id: &str,
        name: &str,
    ) -> Result<IssuedCredential, CredentialError> {
        let id = Identity::parse(third_party_id)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CredentialError::InvalidName("name cannot be empty".into()));
        }
        if name.chars().count() > MAX_NAME_LEN || name.chars().any(char::is_control) {
            return Err(CredentialError::InvalidName(format!(
                "name must be at most {MAX_NAME_LEN} printable characters"
            )));
        }
        if self.parties.read().contains_key(&id) {
            return Err(CredentialError::AlreadyRegistered(id));
        }

        let api_key = generate_api_key();
        let salt = SaltString::generate(&mut OsRng);
        let api_key_hash = self
            .hasher
            .hash_password(api_key.as_bytes(), &salt)
            .map_err(|e| CredentialError::Hashing(e.to_string()))?
            .to_string();
        let created_at = Utc::now();

        {
            let mut parties = self.parties.write();
            if parties.contains_key(&id) {
                return Err(CredentialError::AlreadyRegistered(id));
            }
            parties.insert(
                id.clone(),
                ThirdPartyEntry {
                    name: name.to_string(),
                    api_key_hash,
                    created_at,
                },
            );
        }

        info!("Registered third party {}", id);
        Ok(IssuedCredential {
            third_party_id: id,
            name: name.to_string(),
            api_key,
            created_at,
        })
    }

    /// Verify `api_key` for `third_party_id`.
    ///
    /// Unknown identifiers and wrong keys are indistinguishable to the caller.
    pub fn authenticate(
        &self,
        third_party_id: &str,
        api_key: &str,
    ) -> Result<Identity, CredentialError> {
        let id = Identity::parse(third_party_id).map_err(|_| CredentialError::InvalidApiKey)?;
        let stored = match self.parties.read().get(&id) {
            Some(entry) => entry.api_key_hash.clone(),
            None => {
                debug!("Authentication for unknown third party {}", id);
                return Err(CredentialError::InvalidApiKey);
            }
        };

        let parsed =
            PasswordHash::new(&stored).map_err(|e| CredentialError::Hashing(e.to_string()))?;
        self.hasher
            .verify_password(api_key.trim().as_bytes(), &parsed)
            .map_err(|_| CredentialError::InvalidApiKey)?;
        Ok(id)
    }

    pub fn name_of(&self, id: &Identity) -> Option<String> {
        self.parties.read().get(id).map(|entry| entry.name.clone())
    }

    pub fn registered_at(&self, id: &Identity) -> Option<DateTime<Utc>> {
        self.parties.read().get(id).map(|entry| entry.created_at)
    }

    pub fn len(&self) -> usize {
        self.parties.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.parties.read().is_empty()
    }
}

fn generate_api_key() -> String {
    let mut bytes = [0u8; API_KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ThirdPartyRegistry {
        ThirdPartyRegistry::with_params(Params::new(1024, 1, 1, None).unwrap())
    }

    #[test]
    fn register_and_authenticate() {
        let registry = registry();
        let issued = registry.register("XYZ-NBFC", "XYZ NBFC Ltd").unwrap();
        assert_eq!(issued.third_party_id.as_str(), "xyz-nbfc");
        assert_eq!(issued.api_key.len(), API_KEY_BYTES * 2);

        let id = registry.authenticate("xyz-nbfc", &issued.api_key).unwrap();
        assert_eq!(id, issued.third_party_id);
        assert_eq!(registry.name_of(&id).as_deref(), Some("XYZ NBFC Ltd"));
    }

    #[test]
    fn wrong_key_and_unknown_party_look_the_same() {
        let registry = registry();
        registry.register("xyz-nbfc", "XYZ").unwrap();

        assert!(matches!(
            registry.authenticate("xyz-nbfc", "deadbeef"),
            Err(CredentialError::InvalidApiKey)
        ));
        assert!(matches!(
            registry.authenticate("abc-bank", "deadbeef"),
            Err(CredentialError::InvalidApiKey)
        ));
        assert!(matches!(
            registry.authenticate("", "deadbeef"),
            Err(CredentialError::InvalidApiKey)
        ));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let registry = registry();
        registry.register("xyz-nbfc", "XYZ").unwrap();
        assert!(matches!(
            registry.register("XYZ-NBFC", "XYZ again"),
            Err(CredentialError::AlreadyRegistered(_))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn invalid_registration_input() {
        let registry = registry();
        assert!(matches!(
            registry.register("  ", "XYZ"),
            Err(CredentialError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            registry.register("xyz", ""),
            Err(CredentialError::InvalidName(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn keys_are_unique_per_registration() {
        let registry = registry();
        let a = registry.register("a", "A").unwrap();
        let b = registry.register("b", "B").unwrap();
        assert_ne!(a.api_key, b.api_key);
        assert!(registry.authenticate("a", &b.api_key).is_err());
    }
}
