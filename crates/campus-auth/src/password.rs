//! Password verification using Argon2id.

use argon2::{Argon2, PasswordVerifier};

use crate::error::AuthError;

/// Verifies login passwords against stored Argon2id PHC hashes.
///
/// The pepper, when configured, is prepended to the password and must
/// match the one `campus-db` used when hashing.
#[derive(Debug, Clone, Default)]
pub struct PasswordChecker {
    pepper: Option<String>,
}

impl PasswordChecker {
    pub fn new(pepper: Option<String>) -> Self {
        Self { pepper }
    }

    /// `Ok(true)` on match, `Ok(false)` on mismatch, `Err(Crypto)` if
    /// the stored hash cannot be parsed.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let input = match &self.pepper {
            Some(p) => format!("{p}{password}"),
            None => password.to_string(),
        };

        let parsed_hash = argon2::PasswordHash::new(hash)
            .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

        match Argon2::default().verify_password(input.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
        }
    }
}
