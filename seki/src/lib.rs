//! # seki
//!
//! Session management core for authentication backends. Seki issues,
//! verifies, rotates and revokes user sessions composed of an access token
//! and a refresh token, and detects refresh-token theft through a
//! hash-chained rotation scheme.
//!
//! HTTP routing and the concrete database are external collaborators: API
//! handlers translate client requests into calls on [`Seki`], and storage
//! backends implement the repository traits from [`seki_core`].
//!
//! # Example
//!
//! ```rust,no_run
//! use seki::{Seki, SessionConfig};
//! use seki_storage_memory::MemoryRepositoryProvider;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repositories = Arc::new(MemoryRepositoryProvider::new());
//!     let seki = Seki::new(repositories, SessionConfig::default()).await?;
//!
//!     let session = seki
//!         .create_session("user-1", json!({"role": "admin"}), json!({}))
//!         .await?;
//!     println!("refresh token: {}", session.refresh_token.token);
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use serde_json::Value;

use seki_core::{
    KeyService, SessionService,
    keys::{ACCESS_TOKEN_SIGNING_KEY_NAME, REFRESH_TOKEN_KEY_NAME},
    repositories::{KeyValueRepositoryAdapter, RepositoryProvider, SessionRepositoryAdapter},
};

pub use seki_core::{
    CryptoError, Error, SessionConfig, SessionHandle, SessionInfo, SessionRecord, SigningKey,
    StorageQueryError, TokenError, TokenInfo, TokenType, UnauthorisedError,
};

#[cfg(feature = "memory")]
pub use seki_storage_memory::MemoryRepositoryProvider;

/// The session-management coordinator.
///
/// `Seki` wires the lifecycle service to a repository provider and owns
/// the process keys, which it loads from (or persists into) the provider's
/// key-value store at construction so sessions survive restarts.
pub struct Seki<R: RepositoryProvider> {
    session_service: SessionService<SessionRepositoryAdapter<R>>,
}

impl<R: RepositoryProvider> Seki<R> {
    /// Construct the coordinator over a repository provider.
    ///
    /// Bootstraps the refresh-token and access-token signing keys through
    /// the key-value store: the first process to start generates them,
    /// every later one loads the same keys.
    pub async fn new(repositories: Arc<R>, config: SessionConfig) -> Result<Self, Error> {
        let key_service = KeyService::new(Arc::new(KeyValueRepositoryAdapter::new(
            repositories.clone(),
        )));
        let refresh_token_key = key_service.get_or_create(REFRESH_TOKEN_KEY_NAME).await?;
        let access_token_key = key_service
            .get_or_create(ACCESS_TOKEN_SIGNING_KEY_NAME)
            .await?;

        let session_service = SessionService::new(
            Arc::new(SessionRepositoryAdapter::new(repositories)),
            config,
            refresh_token_key,
            access_token_key,
        );

        tracing::debug!("session core initialized");
        Ok(Self { session_service })
    }

    /// Create a new session for a user.
    ///
    /// Returns the handle, the signed access token, the chain-initial
    /// refresh token and, when enabled, the anti-CSRF token.
    pub async fn create_session(
        &self,
        user_id: &str,
        user_data_in_jwt: Value,
        user_data_in_database: Value,
    ) -> Result<SessionInfo, Error> {
        self.session_service
            .create_session(user_id, user_data_in_jwt, user_data_in_database)
            .await
    }

    /// Get the JWT claims map of a session.
    ///
    /// Fails with [`UnauthorisedError::SessionMissing`] if the session is
    /// missing or expired; the two cases are indistinguishable.
    pub async fn get_jwt_data(&self, handle: &SessionHandle) -> Result<Value, Error> {
        self.session_service.get_jwt_data(handle).await
    }

    /// Get the server-side data of a session. Same error contract as
    /// [`Seki::get_jwt_data`].
    pub async fn get_session_data(&self, handle: &SessionHandle) -> Result<Value, Error> {
        self.session_service.get_session_data(handle).await
    }

    /// Update a session's payload; `None` arguments leave the
    /// corresponding field unchanged.
    pub async fn update_session(
        &self,
        handle: &SessionHandle,
        new_user_data_in_database: Option<Value>,
        new_user_data_in_jwt: Option<Value>,
        new_anti_csrf_token: Option<String>,
    ) -> Result<(), Error> {
        self.session_service
            .update_session(
                handle,
                new_user_data_in_database,
                new_user_data_in_jwt,
                new_anti_csrf_token,
            )
            .await
    }

    /// Verify a refresh token and rotate its chain, returning fresh token
    /// materials.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<SessionInfo, Error> {
        self.session_service.refresh_session(refresh_token).await
    }

    /// Revoke sessions by handle; unknown handles are skipped.
    pub async fn revoke_sessions(&self, handles: &[SessionHandle]) -> Result<u64, Error> {
        self.session_service.revoke_sessions(handles).await
    }

    /// Reap expired session records.
    pub async fn remove_expired_sessions(&self) -> Result<u64, Error> {
        self.session_service.remove_expired_sessions().await
    }
}
