//! Cryptographic primitives for token sealing and chain hashing
//!
//! This module provides the symmetric cipher used to seal refresh-token
//! contents, the double-SHA256 hash that links a refresh-token chain, and
//! random token generation.
//!
//! # Security
//!
//! Encryption is AES-256-GCM with a fresh random nonce per call, so
//! identical plaintexts under the same key produce different ciphertexts.
//! The AEAD tag makes decryption under any other key fail deterministically
//! instead of returning garbled plaintext. Hash comparisons in the rotation
//! path go through [`constant_time_compare`] (the `subtle` crate) to avoid
//! timing side channels.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use hkdf::Hkdf;
use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::CryptoError;

const NONCE_LEN: usize = 12;

/// Domain-separation label for key derivation. Changing it invalidates
/// every sealed token, so it is versioned.
const HKDF_INFO: &[u8] = b"seki/refresh-token-seal/v1";

/// Derive the AEAD key from an arbitrary key string.
///
/// The key string is treated as opaque input keying material; a malformed
/// or wrong key still derives *some* AEAD key, and the failure surfaces as
/// a tag mismatch on decrypt rather than a parse error.
fn derive_aead_key(key: &str) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(None, key.as_bytes());
    let mut okm = [0u8; 32];
    hk.expand(HKDF_INFO, &mut okm)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    okm
}

/// Encrypt `plaintext` under `key`.
///
/// Returns a URL-safe base64 string of `nonce || ciphertext || tag`. The
/// nonce is freshly random per call.
pub fn encrypt(plaintext: &[u8], key: &str) -> Result<String, CryptoError> {
    let aead = Aes256Gcm::new_from_slice(&derive_aead_key(key))
        .expect("derived AEAD key is exactly 32 bytes");

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce_bytes)
        .expect("OS RNG failure - system entropy source unavailable");

    let ciphertext = aead
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| CryptoError::Encryption)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(BASE64_URL_SAFE_NO_PAD.encode(out))
}

/// Decrypt a string produced by [`encrypt`].
///
/// Fails with [`CryptoError::Decryption`] if the ciphertext is structurally
/// invalid or was not produced under `key`. Never returns partial
/// plaintext.
pub fn decrypt(ciphertext: &str, key: &str) -> Result<Vec<u8>, CryptoError> {
    let raw = BASE64_URL_SAFE_NO_PAD
        .decode(ciphertext)
        .map_err(|_| CryptoError::Decryption)?;
    if raw.len() < NONCE_LEN {
        return Err(CryptoError::Decryption);
    }
    let (nonce, sealed) = raw.split_at(NONCE_LEN);

    let aead = Aes256Gcm::new_from_slice(&derive_aead_key(key))
        .expect("derived AEAD key is exactly 32 bytes");

    aead.decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| CryptoError::Decryption)
}

/// Hex-encoded SHA256 of the input.
pub fn hash_sha256(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// The "hash2" of the refresh-token chain: SHA256 applied twice.
///
/// The store holds the double hash so that a single stored value can be
/// checked against both a presented token (hashed twice) and a token's
/// embedded parent hash (already hashed once by the issuer).
pub fn hash2(input: &str) -> String {
    hash_sha256(&hash_sha256(input))
}

/// Generate a cryptographically secure random token.
///
/// 256 bits of entropy, URL-safe base64 encoded.
///
/// # Panics
///
/// Panics if the OS random number generator fails; there is no safe
/// fallback for security-sensitive token generation.
pub fn generate_secure_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .expect("OS RNG failure - system entropy source unavailable");
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Perform constant-time comparison of two byte slices.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
