use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;

use seki_core::{
    StorageQueryError,
    repositories::{KeyValueRepository, SessionRepository},
    session::{SessionHandle, SessionRecord},
};

/// Session records keyed by handle.
pub struct MemorySessionRepository {
    records: DashMap<String, SessionRecord>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }
}

impl Default for MemorySessionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create(&self, record: SessionRecord) -> Result<(), StorageQueryError> {
        self.records.insert(record.handle.to_string(), record);
        Ok(())
    }

    async fn find_by_handle(
        &self,
        handle: &SessionHandle,
    ) -> Result<Option<SessionRecord>, StorageQueryError> {
        Ok(self.records.get(handle.as_ref()).map(|r| r.value().clone()))
    }

    async fn update_payload(
        &self,
        handle: &SessionHandle,
        user_data_in_jwt: Option<Value>,
        user_data_in_database: Option<Value>,
        anti_csrf_token: Option<String>,
    ) -> Result<bool, StorageQueryError> {
        // Mutation happens under the entry lock, making the whole update
        // atomic per handle.
        let Some(mut record) = self.records.get_mut(handle.as_ref()) else {
            return Ok(false);
        };
        if let Some(jwt_data) = user_data_in_jwt {
            record.user_data_in_jwt = jwt_data;
        }
        if let Some(database_data) = user_data_in_database {
            record.user_data_in_database = database_data;
        }
        if let Some(anti_csrf) = anti_csrf_token {
            record.anti_csrf_token = Some(anti_csrf);
        }
        Ok(true)
    }

    async fn rotate_refresh_token_hash(
        &self,
        handle: &SessionHandle,
        expected: &str,
        new_hash: &str,
    ) -> Result<bool, StorageQueryError> {
        let Some(mut record) = self.records.get_mut(handle.as_ref()) else {
            return Ok(false);
        };
        if record.refresh_token_hash_2 != expected {
            return Ok(false);
        }
        record.refresh_token_hash_2 = new_hash.to_string();
        Ok(true)
    }

    async fn delete(&self, handles: &[SessionHandle]) -> Result<u64, StorageQueryError> {
        let mut removed = 0;
        for handle in handles {
            if self.records.remove(handle.as_ref()).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StorageQueryError> {
        let expired: Vec<String> = self
            .records
            .iter()
            .filter(|r| r.value().is_expired_at(now))
            .map(|r| r.key().clone())
            .collect();

        let mut removed = 0;
        for key in expired {
            // Re-check under the entry lock; the record may have been
            // replaced since the scan.
            if self
                .records
                .remove_if(&key, |_, record| record.is_expired_at(now))
                .is_some()
            {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Process key-value store.
pub struct MemoryKeyValueRepository {
    values: DashMap<String, String>,
}

impl MemoryKeyValueRepository {
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
        }
    }
}

impl Default for MemoryKeyValueRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueRepository for MemoryKeyValueRepository {
    async fn get(&self, name: &str) -> Result<Option<String>, StorageQueryError> {
        Ok(self.values.get(name).map(|v| v.value().clone()))
    }

    async fn set_if_absent(&self, name: &str, value: &str) -> Result<String, StorageQueryError> {
        let entry = self
            .values
            .entry(name.to_string())
            .or_insert_with(|| value.to_string());
        Ok(entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn record(handle: &SessionHandle, expires_in: Duration) -> SessionRecord {
        let now = Utc::now();
        SessionRecord {
            handle: handle.clone(),
            user_id: "userId".to_string(),
            user_data_in_jwt: json!({"key": "value"}),
            user_data_in_database: json!({"key": "value"}),
            refresh_token_hash_2: "hash-0".to_string(),
            anti_csrf_token: None,
            created_at: now,
            expires_at: now + expires_in,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = MemorySessionRepository::new();
        let handle = SessionHandle::new_random();
        repo.create(record(&handle, Duration::hours(1))).await.unwrap();

        let found = repo.find_by_handle(&handle).await.unwrap().unwrap();
        assert_eq!(found.handle, handle);
        assert!(repo
            .find_by_handle(&SessionHandle::new("missing"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_payload_none_leaves_fields_untouched() {
        let repo = MemorySessionRepository::new();
        let handle = SessionHandle::new_random();
        repo.create(record(&handle, Duration::hours(1))).await.unwrap();

        let updated = repo
            .update_payload(&handle, None, Some(json!({"db": 2})), None)
            .await
            .unwrap();
        assert!(updated);

        let found = repo.find_by_handle(&handle).await.unwrap().unwrap();
        assert_eq!(found.user_data_in_jwt, json!({"key": "value"}));
        assert_eq!(found.user_data_in_database, json!({"db": 2}));
    }

    #[tokio::test]
    async fn test_update_payload_missing_handle_reports_false() {
        let repo = MemorySessionRepository::new();
        let updated = repo
            .update_payload(&SessionHandle::new("missing"), Some(json!({})), None, None)
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_rotate_is_a_compare_and_swap() {
        let repo = MemorySessionRepository::new();
        let handle = SessionHandle::new_random();
        repo.create(record(&handle, Duration::hours(1))).await.unwrap();

        // Two rotations from the same starting hash: one winner.
        assert!(repo
            .rotate_refresh_token_hash(&handle, "hash-0", "hash-1")
            .await
            .unwrap());
        assert!(!repo
            .rotate_refresh_token_hash(&handle, "hash-0", "hash-2")
            .await
            .unwrap());

        let found = repo.find_by_handle(&handle).await.unwrap().unwrap();
        assert_eq!(found.refresh_token_hash_2, "hash-1");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let repo = MemorySessionRepository::new();
        let handle = SessionHandle::new_random();
        repo.create(record(&handle, Duration::hours(1))).await.unwrap();

        let handles = vec![handle.clone(), SessionHandle::new("missing")];
        assert_eq!(repo.delete(&handles).await.unwrap(), 1);
        assert_eq!(repo.delete(&handles).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_expired_only_reaps_past_expiry() {
        let repo = MemorySessionRepository::new();
        let live = SessionHandle::new_random();
        let dead = SessionHandle::new_random();
        repo.create(record(&live, Duration::hours(1))).await.unwrap();
        repo.create(record(&dead, Duration::seconds(-1))).await.unwrap();

        assert_eq!(repo.delete_expired(Utc::now()).await.unwrap(), 1);
        assert!(repo.find_by_handle(&live).await.unwrap().is_some());
        assert!(repo.find_by_handle(&dead).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_if_absent_keeps_first_value() {
        let repo = MemoryKeyValueRepository::new();
        assert_eq!(repo.set_if_absent("k", "first").await.unwrap(), "first");
        assert_eq!(repo.set_if_absent("k", "second").await.unwrap(), "first");
        assert_eq!(repo.get("k").await.unwrap(), Some("first".to_string()));
        assert_eq!(repo.get("other").await.unwrap(), None);
    }
}
