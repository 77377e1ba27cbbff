//! Session records
//!
//! The core session record persisted by the store:
//!
//! | Field                   | Type             | Description                                          |
//! | ----------------------- | ---------------- | ---------------------------------------------------- |
//! | `handle`                | `SessionHandle`  | Opaque unique identifier, immutable for the session. |
//! | `user_id`               | `String`         | Owning principal, immutable.                         |
//! | `user_data_in_jwt`      | `Value`          | Claims map embedded in the access token. Mutable.    |
//! | `user_data_in_database` | `Value`          | Server-side metadata, never sent to clients. Mutable.|
//! | `refresh_token_hash_2`  | `String`         | Hash2 of the currently valid refresh token.          |
//! | `anti_csrf_token`       | `Option<String>` | Anti-CSRF token paired with the session, if enabled. |
//! | `created_at`            | `DateTime`       | When the session was created.                        |
//! | `expires_at`            | `DateTime`       | Instant at which the session becomes invalid.        |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::token::TokenInfo;

/// Opaque identifier naming one session record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new(handle: &str) -> Self {
        Self(handle.to_string())
    }

    pub fn new_random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl AsRef<str> for SessionHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionHandle {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SessionHandle {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One logical authenticated session, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub handle: SessionHandle,
    pub user_id: String,
    pub user_data_in_jwt: Value,
    pub user_data_in_database: Value,
    pub refresh_token_hash_2: String,
    pub anti_csrf_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// A session is invalid at or after its expiry instant; the boundary
    /// is closed.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Everything handed back to the API layer when a session is created or
/// refreshed.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub handle: SessionHandle,
    pub user_id: String,
    pub user_data_in_jwt: Value,
    pub access_token: TokenInfo,
    pub refresh_token: TokenInfo,
    pub anti_csrf_token: Option<String>,
}
