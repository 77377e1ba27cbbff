//! Session lifecycle manager
//!
//! Orchestrates creation, retrieval, payload updates, revocation and
//! refresh-token rotation. The persisted `refresh_token_hash_2` field is
//! the authoritative chain state; nothing here caches it across
//! operations.
//!
//! # Rotation and theft containment
//!
//! Each successful refresh advances the chain eagerly: the new token's
//! hash2 replaces the stored hash in one compare-and-swap, so exactly one
//! of any set of racing rotations wins. A presented token whose hash2 does
//! not match the stored value is stale: either it was captured and
//! replayed after a legitimate rotation, or it lost a race. Policy here is
//! to revoke the whole session family and report theft; the benign-race
//! caller re-authenticates, which is the safer failure.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::SessionConfig,
    crypto,
    error::{Error, TokenError, UnauthorisedError},
    keys::SigningKey,
    repositories::SessionRepository,
    session::{SessionHandle, SessionInfo, SessionRecord},
    token::{RefreshTokenCodec, RefreshTokenPayload, TokenInfo, TokenType},
};

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject - user ID
    pub sub: String,
    /// Handle of the backing session
    pub session_handle: String,
    /// Issued at in seconds (as UTC timestamp)
    pub iat: i64,
    /// Expiration time in seconds (as UTC timestamp)
    pub exp: i64,
    /// Issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// The session's mutable claims map
    #[serde(rename = "userData")]
    pub user_data: Value,
}

struct IssuedRefreshToken {
    info: TokenInfo,
    hash_2: String,
}

/// Service for session lifecycle operations
pub struct SessionService<R: SessionRepository> {
    repository: Arc<R>,
    config: SessionConfig,
    refresh_token_key: SigningKey,
    access_token_key: SigningKey,
}

impl<R: SessionRepository> SessionService<R> {
    /// Create a new SessionService over the given repository and process
    /// keys. Keys and config are read-only for the service's lifetime.
    pub fn new(
        repository: Arc<R>,
        config: SessionConfig,
        refresh_token_key: SigningKey,
        access_token_key: SigningKey,
    ) -> Self {
        Self {
            repository,
            config,
            refresh_token_key,
            access_token_key,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Create a new session for a user.
    ///
    /// Allocates a fresh handle, persists the record with an expiry of one
    /// refresh-token validity from now, issues the chain-initial refresh
    /// token and signs the first access token.
    pub async fn create_session(
        &self,
        user_id: &str,
        user_data_in_jwt: Value,
        user_data_in_database: Value,
    ) -> Result<SessionInfo, Error> {
        let handle = SessionHandle::new_random();
        let now = Utc::now();
        let anti_csrf_token = self
            .config
            .enable_anti_csrf
            .then(crypto::generate_secure_token);

        let refresh_token =
            self.issue_refresh_token(&handle, user_id, None, anti_csrf_token.clone(), now)?;

        self.repository
            .create(SessionRecord {
                handle: handle.clone(),
                user_id: user_id.to_string(),
                user_data_in_jwt: user_data_in_jwt.clone(),
                user_data_in_database,
                refresh_token_hash_2: refresh_token.hash_2,
                anti_csrf_token: anti_csrf_token.clone(),
                created_at: now,
                expires_at: now + self.config.refresh_token_validity,
            })
            .await?;

        let access_token = self.sign_access_token(&handle, user_id, &user_data_in_jwt, now)?;

        tracing::debug!(handle = %handle, "created session");

        Ok(SessionInfo {
            handle,
            user_id: user_id.to_string(),
            user_data_in_jwt,
            access_token,
            refresh_token: refresh_token.info,
            anti_csrf_token,
        })
    }

    /// Get the JWT claims map attached to a session.
    pub async fn get_jwt_data(&self, handle: &SessionHandle) -> Result<Value, Error> {
        let session = self.live_session(handle).await?;
        Ok(session.user_data_in_jwt)
    }

    /// Get the server-side data attached to a session.
    pub async fn get_session_data(&self, handle: &SessionHandle) -> Result<Value, Error> {
        let session = self.live_session(handle).await?;
        Ok(session.user_data_in_database)
    }

    /// Update a session's mutable payload.
    ///
    /// Every `None` argument means "no change": passing `None` for the JWT
    /// data leaves the existing claims map byte-for-byte intact rather
    /// than clearing it.
    pub async fn update_session(
        &self,
        handle: &SessionHandle,
        new_user_data_in_database: Option<Value>,
        new_user_data_in_jwt: Option<Value>,
        new_anti_csrf_token: Option<String>,
    ) -> Result<(), Error> {
        self.live_session(handle).await?;

        let updated = self
            .repository
            .update_payload(
                handle,
                new_user_data_in_jwt,
                new_user_data_in_database,
                new_anti_csrf_token,
            )
            .await?;

        // The record can vanish between the liveness check and the write.
        if !updated {
            return Err(UnauthorisedError::SessionMissing.into());
        }
        Ok(())
    }

    /// Verify a presented refresh token and rotate the chain.
    ///
    /// Missing and expired sessions are rejected before any chain
    /// comparison; a purged session has no chain state to compare against.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<SessionInfo, Error> {
        let decoded = RefreshTokenCodec::decode(refresh_token, &self.refresh_token_key)?;
        let handle = SessionHandle::from(decoded.session_handle);

        let session = self.live_session(&handle).await?;

        let presented_hash_2 = crypto::hash2(refresh_token);
        if !crypto::constant_time_compare(
            presented_hash_2.as_bytes(),
            session.refresh_token_hash_2.as_bytes(),
        ) {
            return self.contain_token_theft(&handle).await;
        }

        let now = Utc::now();
        let child = self.issue_refresh_token(
            &handle,
            &session.user_id,
            Some(presented_hash_2.clone()),
            session.anti_csrf_token.clone(),
            now,
        )?;

        let swapped = self
            .repository
            .rotate_refresh_token_hash(&handle, &presented_hash_2, &child.hash_2)
            .await?;
        if !swapped {
            // A concurrent rotation advanced the chain first; this token
            // is now stale.
            return self.contain_token_theft(&handle).await;
        }

        let access_token =
            self.sign_access_token(&handle, &session.user_id, &session.user_data_in_jwt, now)?;

        tracing::debug!(handle = %handle, "rotated refresh token");

        Ok(SessionInfo {
            handle,
            user_id: session.user_id,
            user_data_in_jwt: session.user_data_in_jwt,
            access_token,
            refresh_token: child.info,
            anti_csrf_token: session.anti_csrf_token,
        })
    }

    /// Revoke sessions by handle, returning how many existed.
    ///
    /// Revoking an already-revoked or unknown handle is not an error.
    pub async fn revoke_sessions(&self, handles: &[SessionHandle]) -> Result<u64, Error> {
        let revoked = self.repository.delete(handles).await?;
        tracing::info!(requested = handles.len(), revoked, "revoked sessions");
        Ok(revoked)
    }

    /// Remove every expired session record, returning how many were
    /// reaped.
    pub async fn remove_expired_sessions(&self) -> Result<u64, Error> {
        let removed = self.repository.delete_expired(Utc::now()).await?;
        if removed > 0 {
            tracing::debug!(removed, "reaped expired sessions");
        }
        Ok(removed)
    }

    /// Load a session and enforce expiry.
    ///
    /// Missing and expired records are indistinguishable to callers.
    async fn live_session(&self, handle: &SessionHandle) -> Result<SessionRecord, Error> {
        match self.repository.find_by_handle(handle).await? {
            Some(session) if !session.is_expired() => Ok(session),
            _ => Err(UnauthorisedError::SessionMissing.into()),
        }
    }

    fn issue_refresh_token(
        &self,
        handle: &SessionHandle,
        user_id: &str,
        parent_hash_2: Option<String>,
        anti_csrf_token: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<IssuedRefreshToken, Error> {
        let token = RefreshTokenCodec::encode(
            &RefreshTokenPayload {
                session_handle: handle.to_string(),
                parent_refresh_token_hash_2: parent_hash_2,
                user_id: Some(user_id.to_string()),
                anti_csrf_token,
            },
            &self.refresh_token_key,
            TokenType::Free,
        )?;
        let hash_2 = crypto::hash2(&token);

        Ok(IssuedRefreshToken {
            info: TokenInfo {
                token,
                expires_at: now + self.config.refresh_token_validity,
                created_at: now,
            },
            hash_2,
        })
    }

    fn sign_access_token(
        &self,
        handle: &SessionHandle,
        user_id: &str,
        user_data_in_jwt: &Value,
        now: DateTime<Utc>,
    ) -> Result<TokenInfo, Error> {
        let expires_at = now + self.config.access_token_validity;
        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            session_handle: handle.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.config.issuer.clone(),
            user_data: user_data_in_jwt.clone(),
        };

        let secret = self.access_token_key.secret_bytes()?;
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&secret),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(TokenInfo {
            token,
            expires_at,
            created_at: now,
        })
    }

    /// Theft containment: revoke the whole family and reject the caller.
    async fn contain_token_theft(&self, handle: &SessionHandle) -> Result<SessionInfo, Error> {
        self.repository
            .delete(std::slice::from_ref(handle))
            .await?;
        tracing::warn!(handle = %handle, "stale refresh token presented; session family revoked");
        Err(UnauthorisedError::TokenTheft {
            session_handle: handle.to_string(),
        }
        .into())
    }
}
