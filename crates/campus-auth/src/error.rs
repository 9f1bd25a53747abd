//! Authentication error types.

use campus_core::error::CampusError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    /// A backing store failed while the answer mattered. Callers treat
    /// this as a failed login or a denied request.
    #[error("authentication backend unavailable: {0}")]
    Unavailable(String),

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for CampusError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::AccountInactive
            | AuthError::TokenInvalid(_) => CampusError::AuthenticationFailed {
                reason: err.to_string(),
            },
            AuthError::Unavailable(msg) => CampusError::Database(msg),
            AuthError::Crypto(msg) => CampusError::Crypto(msg),
        }
    }
}
