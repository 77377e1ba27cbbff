//! Repository traits for the storage layer
//!
//! These traits define the contract the session core expects from the
//! external store. Backends implement the individual repositories and
//! expose them through [`RepositoryProvider`]; the service layer reaches
//! them through the adapters in [`adapter`].
//!
//! All operations are keyed by session handle. "Not found" is reported as
//! a value, never as an error; [`crate::StorageQueryError`] is reserved
//! for transport and storage failures.

pub mod adapter;
pub mod key_value;
pub mod session;

pub use adapter::{KeyValueRepositoryAdapter, SessionRepositoryAdapter};
pub use key_value::KeyValueRepository;
pub use session::SessionRepository;

/// Supertrait giving access to every repository a backend provides.
pub trait RepositoryProvider: Send + Sync + 'static {
    /// The session repository implementation type
    type SessionRepo: SessionRepository;
    /// The key-value repository implementation type
    type KeyValueRepo: KeyValueRepository;

    /// Get the session repository
    fn session(&self) -> &Self::SessionRepo;

    /// Get the key-value repository
    fn key_value(&self) -> &Self::KeyValueRepo;
}
