use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    error::StorageQueryError,
    repositories::{KeyValueRepository, RepositoryProvider, SessionRepository},
    session::{SessionHandle, SessionRecord},
};

/// Adapter exposing a provider's session repository as a standalone
/// [`SessionRepository`], so services can be generic over one repository
/// instead of the whole provider.
pub struct SessionRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> SessionRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> SessionRepository for SessionRepositoryAdapter<R> {
    async fn create(&self, record: SessionRecord) -> Result<(), StorageQueryError> {
        self.provider.session().create(record).await
    }

    async fn find_by_handle(
        &self,
        handle: &SessionHandle,
    ) -> Result<Option<SessionRecord>, StorageQueryError> {
        self.provider.session().find_by_handle(handle).await
    }

    async fn update_payload(
        &self,
        handle: &SessionHandle,
        user_data_in_jwt: Option<Value>,
        user_data_in_database: Option<Value>,
        anti_csrf_token: Option<String>,
    ) -> Result<bool, StorageQueryError> {
        self.provider
            .session()
            .update_payload(handle, user_data_in_jwt, user_data_in_database, anti_csrf_token)
            .await
    }

    async fn rotate_refresh_token_hash(
        &self,
        handle: &SessionHandle,
        expected: &str,
        new_hash: &str,
    ) -> Result<bool, StorageQueryError> {
        self.provider
            .session()
            .rotate_refresh_token_hash(handle, expected, new_hash)
            .await
    }

    async fn delete(&self, handles: &[SessionHandle]) -> Result<u64, StorageQueryError> {
        self.provider.session().delete(handles).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StorageQueryError> {
        self.provider.session().delete_expired(now).await
    }
}

/// Adapter exposing a provider's key-value repository as a standalone
/// [`KeyValueRepository`].
pub struct KeyValueRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> KeyValueRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> KeyValueRepository for KeyValueRepositoryAdapter<R> {
    async fn get(&self, name: &str) -> Result<Option<String>, StorageQueryError> {
        self.provider.key_value().get(name).await
    }

    async fn set_if_absent(&self, name: &str, value: &str) -> Result<String, StorageQueryError> {
        self.provider.key_value().set_if_absent(name, value).await
    }
}
