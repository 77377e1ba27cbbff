use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Unauthorised(#[from] UnauthorisedError),

    #[error(transparent)]
    Storage(#[from] StorageQueryError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// The session or refresh token presented by the caller is no longer valid.
///
/// These are terminal outcomes: retrying cannot make a revoked or expired
/// session valid again, so callers must not retry internally.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnauthorisedError {
    /// The session record is missing or past its expiry.
    ///
    /// The two cases share one message so callers cannot probe which
    /// handles ever existed.
    #[error("Session does not exist.")]
    SessionMissing,

    /// A refresh token was presented whose chain position is stale. The
    /// session family has been revoked as containment.
    #[error("Refresh token theft detected for session {session_handle}")]
    TokenTheft { session_handle: String },
}

/// Transport or storage failure while querying the external store.
///
/// Distinct from "not found"; repositories report missing records as
/// values, never through this error.
#[derive(Debug, Error)]
#[error("Storage query failed: {0}")]
pub struct StorageQueryError(pub String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Ciphertext failed integrity verification under the supplied key.
    #[error("Decryption failed")]
    Decryption,

    #[error("Encryption failed")]
    Encryption,

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The token string could not be parsed into its structural parts.
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Failed to sign access token: {0}")]
    Signing(String),
}

impl Error {
    /// Whether the API layer should answer this error with an
    /// authorization failure.
    ///
    /// Cryptographic and structural failures on untrusted token input are
    /// grouped with the explicit unauthorised outcomes so the boundary
    /// fails closed without leaking which check rejected the input.
    pub fn is_unauthorised(&self) -> bool {
        matches!(
            self,
            Error::Unauthorised(_)
                | Error::Crypto(CryptoError::Decryption)
                | Error::Crypto(CryptoError::InvalidKey(_))
                | Error::Token(TokenError::Malformed(_))
        )
    }
}
