use async_trait::async_trait;

use crate::error::StorageQueryError;

/// Repository for the process key-value store.
///
/// Holds the persisted signing keys that make tokens reconstructible
/// across restarts.
#[async_trait]
pub trait KeyValueRepository: Send + Sync + 'static {
    /// Fetch the value stored under `name`.
    async fn get(&self, name: &str) -> Result<Option<String>, StorageQueryError>;

    /// Store `value` under `name` unless a value already exists, atomically.
    ///
    /// Returns the value that ends up under `name`: the existing one if a
    /// concurrent writer (or an earlier process) got there first,
    /// otherwise `value`.
    async fn set_if_absent(&self, name: &str, value: &str) -> Result<String, StorageQueryError>;
}
