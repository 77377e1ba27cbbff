//! Session configuration
//!
//! Validity durations and token options, constructed once at startup and
//! passed by reference into the services. Nothing here is mutated after
//! construction.

use chrono::Duration;

/// The configuration for the session core.
///
/// # Example
///
/// ```rust
/// use seki_core::SessionConfig;
///
/// let config = SessionConfig::default()
///     .with_access_token_validity_secs(3600)
///     .with_refresh_token_validity_mins(144_000.0);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long an access token stays valid.
    pub access_token_validity: Duration,
    /// How long a refresh token (and the session record) stays valid.
    pub refresh_token_validity: Duration,
    /// Whether created sessions carry an anti-CSRF token.
    pub enable_anti_csrf: bool,
    /// Issuer claim stamped into access tokens.
    pub issuer: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_token_validity: Duration::hours(1),
            refresh_token_validity: Duration::days(100),
            enable_anti_csrf: false,
            issuer: None,
        }
    }
}

impl SessionConfig {
    /// Set the access-token validity in whole seconds (minimum one).
    pub fn with_access_token_validity_secs(mut self, secs: u64) -> Self {
        self.access_token_validity = Duration::seconds((secs.max(1)) as i64);
        self
    }

    /// Set the refresh-token validity in minutes. Fractional values are
    /// allowed; the effective granularity is one second.
    pub fn with_refresh_token_validity_mins(mut self, mins: f64) -> Self {
        let secs = (mins * 60.0).round() as i64;
        self.refresh_token_validity = Duration::seconds(secs.max(1));
        self
    }

    /// Enable or disable anti-CSRF tokens on created sessions.
    pub fn with_anti_csrf(mut self, enabled: bool) -> Self {
        self.enable_anti_csrf = enabled;
        self
    }

    /// Set the issuer claim for access tokens.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }
}
