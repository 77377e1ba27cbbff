//! Service layer for session business logic
//!
//! The session lifecycle manager lives here; it is the entry point the
//! API layer calls into.

pub mod session;

pub use session::{AccessTokenClaims, SessionService};
