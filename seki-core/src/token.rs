//! Refresh-token wire codec
//!
//! A refresh token on the wire is `<sealed body>.<version>`: the body is
//! the JSON rotation-chain content encrypted under the process refresh key,
//! and the version suffix is the token-family discriminant ("V0" for FREE,
//! "V1" for PAID). The suffix stays outside the sealed body so the family
//! can be read before decryption.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    crypto,
    error::{Error, TokenError},
    keys::SigningKey,
};

/// Token-family discriminant, versioning the rotation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    Free,
    Paid,
}

impl TokenType {
    /// The closed serialization table: FREE <-> "V0", PAID <-> "V1".
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            TokenType::Free => "V0",
            TokenType::Paid => "V1",
        }
    }

    /// Look up a wire discriminant. Unknown strings yield `None` rather
    /// than an error or a default, so callers decide the trust policy for
    /// unrecognized families explicitly.
    pub fn from_wire_str(s: &str) -> Option<TokenType> {
        match s {
            "V0" => Some(TokenType::Free),
            "V1" => Some(TokenType::Paid),
            _ => None,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

/// A token string together with its validity window.
///
/// Expiry travels beside the token, not inside the sealed body; the store
/// record is authoritative for whether a session is still live.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Rotation-chain content supplied by the issuer.
#[derive(Debug, Clone)]
pub struct RefreshTokenPayload {
    pub session_handle: String,
    /// Hash2 of the previous token in the chain; `None` for the first
    /// token of a family.
    pub parent_refresh_token_hash_2: Option<String>,
    pub user_id: Option<String>,
    pub anti_csrf_token: Option<String>,
}

/// Rotation-chain content recovered from a presented token.
#[derive(Debug, Clone)]
pub struct DecodedRefreshToken {
    pub session_handle: String,
    /// Always present on the wire: a chain-initial token carries the hash2
    /// of its own nonce instead of a parent's hash.
    pub parent_refresh_token_hash_2: String,
    pub user_id: Option<String>,
    pub anti_csrf_token: Option<String>,
    /// `None` when the wire discriminant was unrecognized; such tokens are
    /// untrusted until the caller decides otherwise.
    pub token_type: Option<TokenType>,
}

/// The sealed JSON body.
#[derive(Debug, Serialize, Deserialize)]
struct SealedBody {
    session_handle: String,
    parent_refresh_token_hash_2: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    anti_csrf_token: Option<String>,
    nonce: String,
}

pub struct RefreshTokenCodec;

impl RefreshTokenCodec {
    /// Seal rotation-chain content into a wire token.
    ///
    /// Every call embeds a fresh nonce, so two tokens for the same chain
    /// position are never equal. When the payload has no parent hash the
    /// nonce's hash2 takes its place, keeping the field populated for
    /// every token ever decoded.
    pub fn encode(
        payload: &RefreshTokenPayload,
        key: &SigningKey,
        token_type: TokenType,
    ) -> Result<String, Error> {
        let nonce = crypto::generate_secure_token();
        let parent_refresh_token_hash_2 = payload
            .parent_refresh_token_hash_2
            .clone()
            .unwrap_or_else(|| crypto::hash2(&nonce));

        let body = SealedBody {
            session_handle: payload.session_handle.clone(),
            parent_refresh_token_hash_2,
            user_id: payload.user_id.clone(),
            anti_csrf_token: payload.anti_csrf_token.clone(),
            nonce,
        };
        let json = serde_json::to_string(&body)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;

        let sealed = crypto::encrypt(json.as_bytes(), &key.to_string())?;
        Ok(format!("{sealed}.{}", token_type.as_wire_str()))
    }

    /// Open a wire token.
    ///
    /// Structural problems surface as [`TokenError::Malformed`]; a body
    /// sealed under a different key surfaces as a decryption failure. An
    /// unknown version suffix is not an error: it decodes to an absent
    /// `token_type`.
    pub fn decode(token: &str, key: &SigningKey) -> Result<DecodedRefreshToken, Error> {
        let (sealed, version) = token
            .rsplit_once('.')
            .ok_or_else(|| TokenError::Malformed("missing version suffix".to_string()))?;
        let token_type = TokenType::from_wire_str(version);

        let plain = crypto::decrypt(sealed, &key.to_string())?;
        let body: SealedBody = serde_json::from_slice(&plain)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;

        Ok(DecodedRefreshToken {
            session_handle: body.session_handle,
            parent_refresh_token_hash_2: body.parent_refresh_token_hash_2,
            user_id: body.user_id,
            anti_csrf_token: body.anti_csrf_token,
            token_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CryptoError;

    fn payload(parent: Option<&str>) -> RefreshTokenPayload {
        RefreshTokenPayload {
            session_handle: "sessionHandle".to_string(),
            parent_refresh_token_hash_2: parent.map(str::to_string),
            user_id: None,
            anti_csrf_token: None,
        }
    }

    #[test]
    fn test_free_paid_version_table() {
        assert_eq!(TokenType::Free.to_string(), "V0");
        assert_eq!(TokenType::Paid.to_string(), "V1");
        assert_eq!(TokenType::from_wire_str("V0"), Some(TokenType::Free));
        assert_eq!(TokenType::from_wire_str("V1"), Some(TokenType::Paid));
        assert_eq!(TokenType::from_wire_str("random"), None);
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let key = SigningKey::generate();
        let token = RefreshTokenCodec::encode(
            &RefreshTokenPayload {
                session_handle: "sessionHandle".to_string(),
                parent_refresh_token_hash_2: Some("abc123".to_string()),
                user_id: Some("userId".to_string()),
                anti_csrf_token: Some("csrf".to_string()),
            },
            &key,
            TokenType::Paid,
        )
        .unwrap();

        let decoded = RefreshTokenCodec::decode(&token, &key).unwrap();
        assert_eq!(decoded.session_handle, "sessionHandle");
        assert_eq!(decoded.parent_refresh_token_hash_2, "abc123");
        assert_eq!(decoded.user_id, Some("userId".to_string()));
        assert_eq!(decoded.anti_csrf_token, Some("csrf".to_string()));
        assert_eq!(decoded.token_type, Some(TokenType::Paid));
    }

    #[test]
    fn test_chain_initial_token_has_parent_hash() {
        let key = SigningKey::generate();
        let token =
            RefreshTokenCodec::encode(&payload(None), &key, TokenType::Free).unwrap();

        let decoded = RefreshTokenCodec::decode(&token, &key).unwrap();
        assert!(!decoded.parent_refresh_token_hash_2.is_empty());
        assert_eq!(decoded.token_type, Some(TokenType::Free));
    }

    #[test]
    fn test_tokens_for_same_content_differ() {
        let key = SigningKey::generate();
        let first =
            RefreshTokenCodec::encode(&payload(Some("p")), &key, TokenType::Free).unwrap();
        let second =
            RefreshTokenCodec::encode(&payload(Some("p")), &key, TokenType::Free).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_unknown_version_decodes_to_absent_type() {
        let key = SigningKey::generate();
        let token = RefreshTokenCodec::encode(&payload(None), &key, TokenType::Free).unwrap();
        let (sealed, _) = token.rsplit_once('.').unwrap();

        let decoded = RefreshTokenCodec::decode(&format!("{sealed}.V9"), &key).unwrap();
        assert_eq!(decoded.token_type, None);
        assert_eq!(decoded.session_handle, "sessionHandle");
    }

    #[test]
    fn test_missing_version_suffix_is_malformed() {
        let key = SigningKey::generate();
        let err = RefreshTokenCodec::decode("noseparator", &key).unwrap_err();
        assert!(matches!(err, Error::Token(TokenError::Malformed(_))));
    }

    #[test]
    fn test_decode_with_wrong_key_fails_closed() {
        let key = SigningKey::generate();
        let other = SigningKey::generate();
        let token = RefreshTokenCodec::encode(&payload(None), &key, TokenType::Free).unwrap();

        let err = RefreshTokenCodec::decode(&token, &other).unwrap_err();
        assert!(matches!(err, Error::Crypto(CryptoError::Decryption)));
    }
}
