//! In-process storage backend for the seki session core
//!
//! Backed by [`DashMap`], whose per-entry locking gives the per-handle
//! atomicity the repository contracts require: `update_payload` and
//! `rotate_refresh_token_hash` mutate a record while holding its shard
//! entry, so concurrent operations on one handle serialize while
//! operations on different handles proceed in parallel.
//!
//! This is the reference backend and the test substrate; production
//! deployments put a database behind the same traits.

mod repositories;

pub use repositories::{MemoryKeyValueRepository, MemorySessionRepository};

use seki_core::repositories::RepositoryProvider;

/// Repository provider keeping all state in process memory.
pub struct MemoryRepositoryProvider {
    session: MemorySessionRepository,
    key_value: MemoryKeyValueRepository,
}

impl MemoryRepositoryProvider {
    pub fn new() -> Self {
        Self {
            session: MemorySessionRepository::new(),
            key_value: MemoryKeyValueRepository::new(),
        }
    }
}

impl Default for MemoryRepositoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryProvider for MemoryRepositoryProvider {
    type SessionRepo = MemorySessionRepository;
    type KeyValueRepo = MemoryKeyValueRepository;

    fn session(&self) -> &Self::SessionRepo {
        &self.session
    }

    fn key_value(&self) -> &Self::KeyValueRepo {
        &self.key_value
    }
}
