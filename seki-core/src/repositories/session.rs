use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    error::StorageQueryError,
    session::{SessionHandle, SessionRecord},
};

/// Repository for session records.
///
/// `update_payload` and `rotate_refresh_token_hash` must each be a single
/// atomic operation relative to concurrent reads and writes of the same
/// handle (a keyed transaction in a SQL backend, a per-entry lock in an
/// in-process one). Operations on different handles need no mutual
/// ordering.
#[async_trait]
pub trait SessionRepository: Send + Sync + 'static {
    /// Persist a new session record.
    async fn create(&self, record: SessionRecord) -> Result<(), StorageQueryError>;

    /// Find a session by handle.
    async fn find_by_handle(
        &self,
        handle: &SessionHandle,
    ) -> Result<Option<SessionRecord>, StorageQueryError>;

    /// Update the mutable payload fields of a session.
    ///
    /// Every `None` argument leaves the corresponding field untouched.
    /// Returns `false` if no record exists under `handle`.
    async fn update_payload(
        &self,
        handle: &SessionHandle,
        user_data_in_jwt: Option<Value>,
        user_data_in_database: Option<Value>,
        anti_csrf_token: Option<String>,
    ) -> Result<bool, StorageQueryError>;

    /// Advance the refresh-token chain: swap `refresh_token_hash_2` from
    /// `expected` to `new_hash` in one atomic step.
    ///
    /// Returns `false` if the record is missing or its stored hash is no
    /// longer `expected` (a concurrent rotation won). Of two racing
    /// rotations against the same hash, exactly one sees `true`.
    async fn rotate_refresh_token_hash(
        &self,
        handle: &SessionHandle,
        expected: &str,
        new_hash: &str,
    ) -> Result<bool, StorageQueryError>;

    /// Delete the given sessions, returning how many existed. Missing
    /// handles are skipped, so bulk revocation is idempotent.
    async fn delete(&self, handles: &[SessionHandle]) -> Result<u64, StorageQueryError>;

    /// Remove every session whose expiry is at or before `now`, returning
    /// how many were removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StorageQueryError>;
}
