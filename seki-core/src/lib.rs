//! Core functionality for the seki session backend
//!
//! This crate contains the session-management core: the session record and
//! lifecycle service, the refresh-token codec and rotation scheme, the
//! symmetric cipher used to seal token contents, and the repository traits
//! that storage backends implement.
//!
//! See [`SessionService`] for the lifecycle entry points used by API layers,
//! [`RefreshTokenCodec`] for the refresh-token wire format, and
//! [`repositories`] for the storage contracts.

pub mod config;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod repositories;
pub mod services;
pub mod session;
pub mod token;

pub use config::SessionConfig;
pub use error::{CryptoError, Error, StorageQueryError, TokenError, UnauthorisedError};
pub use keys::{KeyService, SigningKey};
pub use services::SessionService;
pub use session::{SessionHandle, SessionInfo, SessionRecord};
pub use token::{DecodedRefreshToken, RefreshTokenCodec, RefreshTokenPayload, TokenInfo, TokenType};
