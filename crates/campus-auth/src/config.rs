//! Authentication and session configuration.

use chrono::Duration;

/// Session timing knobs. Expiry is absolute from creation; the
/// activity timeout slides with each validated request. The two are
/// evaluated independently.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Absolute session lifetime in seconds (default: 3600 = 60 minutes).
    pub session_duration_secs: u64,
    /// Maximum idle time between requests in seconds (default: 3600).
    pub activity_timeout_secs: u64,
}

impl SessionConfig {
    pub fn session_duration(&self) -> Duration {
        Duration::seconds(self.session_duration_secs as i64)
    }

    pub fn activity_timeout(&self) -> Duration {
        Duration::seconds(self.activity_timeout_secs as i64)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_duration_secs: 3600,
            activity_timeout_secs: 3600,
        }
    }
}

/// Configuration for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// PEM-encoded Ed25519 private key for identity token signing.
    pub jwt_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for identity token verification.
    pub jwt_public_key_pem: String,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Optional pepper prepended to passwords before Argon2id verification.
    pub pepper: Option<String>,
    pub session: SessionConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            jwt_issuer: "campus".into(),
            pepper: None,
            session: SessionConfig::default(),
        }
    }
}
