//! Process signing keys
//!
//! Sessions must survive process restarts, so the keys that seal refresh
//! tokens and sign access tokens live in the key-value store, not in
//! memory. The wire format of a key is a colon-delimited triple,
//! `<keyId>:<hex key material>:<hex salt>`; the `keyId` versions the key
//! for future rotation.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::{TryRngCore, rngs::OsRng};

use crate::{
    error::{CryptoError, Error},
    repositories::KeyValueRepository,
};

/// Store name of the key sealing refresh-token contents.
pub const REFRESH_TOKEN_KEY_NAME: &str = "refresh_token_key";

/// Store name of the key signing access tokens.
pub const ACCESS_TOKEN_SIGNING_KEY_NAME: &str = "access_token_signing_key";

/// Key id assigned to freshly generated keys.
const INITIAL_KEY_ID: &str = "1000";

const MATERIAL_LEN: usize = 64;
const SALT_LEN: usize = 8;

/// A versioned symmetric key, reconstructible from its persisted string
/// form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningKey {
    pub key_id: String,
    /// Hex-encoded key material.
    pub material: String,
    /// Hex-encoded salt / IV seed.
    pub salt: String,
}

impl SigningKey {
    /// Generate a fresh key with 512 bits of material.
    pub fn generate() -> Self {
        let mut material = [0u8; MATERIAL_LEN];
        let mut salt = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut material)
            .expect("OS RNG failure - system entropy source unavailable");
        OsRng
            .try_fill_bytes(&mut salt)
            .expect("OS RNG failure - system entropy source unavailable");

        Self {
            key_id: INITIAL_KEY_ID.to_string(),
            material: hex::encode(material),
            salt: hex::encode(salt),
        }
    }

    /// Decode the raw key material, e.g. for use as an HMAC secret.
    pub fn secret_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        hex::decode(&self.material)
            .map_err(|_| CryptoError::InvalidKey("key material is not valid hex".to_string()))
    }
}

impl FromStr for SigningKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(key_id), Some(material), Some(salt), None)
                if !key_id.is_empty() && !material.is_empty() && !salt.is_empty() =>
            {
                if hex::decode(material).is_err() || hex::decode(salt).is_err() {
                    return Err(CryptoError::InvalidKey(
                        "key material and salt must be hex encoded".to_string(),
                    ));
                }
                Ok(Self {
                    key_id: key_id.to_string(),
                    material: material.to_string(),
                    salt: salt.to_string(),
                })
            }
            _ => Err(CryptoError::InvalidKey(
                "expected <keyId>:<material>:<salt>".to_string(),
            )),
        }
    }
}

impl fmt::Display for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.key_id, self.material, self.salt)
    }
}

/// Service that loads process keys from the key-value store, generating
/// and persisting them on first use.
///
/// The store is the single source of truth: two processes bootstrapping
/// concurrently both end up with whichever key won the insert.
pub struct KeyService<K: KeyValueRepository> {
    repository: Arc<K>,
}

impl<K: KeyValueRepository> KeyService<K> {
    pub fn new(repository: Arc<K>) -> Self {
        Self { repository }
    }

    /// Fetch the named key, creating and persisting it if absent.
    pub async fn get_or_create(&self, name: &str) -> Result<SigningKey, Error> {
        if let Some(raw) = self.repository.get(name).await? {
            return Ok(raw.parse()?);
        }

        let fresh = SigningKey::generate();
        let stored = self
            .repository
            .set_if_absent(name, &fresh.to_string())
            .await?;
        tracing::debug!(key = name, "loaded signing key from store");
        Ok(stored.parse()?)
    }
}
