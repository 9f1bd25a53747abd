//! Identity token (EdDSA JWT) issuance/verification and opaque
//! session token generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use campus_core::models::role::Role;
use campus_core::models::user::User;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Random bytes per session token; 48 bytes encode to 64 base64url chars.
const SESSION_TOKEN_BYTES: usize = 48;

/// Characters of the raw session token that may appear in audit logs.
const TOKEN_PREFIX_LEN: usize = 8;

/// Claims embedded in every identity token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject — user ID (UUID string).
    pub sub: String,
    pub role: Role,
    /// College the user belongs to, if any (UUID string).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub college_id: Option<String>,
    /// Opaque session token the session store knows this login by.
    pub sid: String,
    pub iss: String,
    pub iat: i64,
    /// Matches the session's absolute expiry.
    pub exp: i64,
    pub jti: String,
}

impl IdentityClaims {
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|e| AuthError::TokenInvalid(format!("bad subject: {e}")))
    }

    pub fn college_id(&self) -> Option<Uuid> {
        self.college_id
            .as_deref()
            .and_then(|c| Uuid::parse_str(c).ok())
    }
}

/// Parsed signing/verification keys, built once at startup.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
}

impl TokenKeys {
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let encoding = EncodingKey::from_ed_pem(config.jwt_private_key_pem.as_bytes())
            .map_err(|e| AuthError::Crypto(format!("bad private key: {e}")))?;
        let decoding = DecodingKey::from_ed_pem(config.jwt_public_key_pem.as_bytes())
            .map_err(|e| AuthError::Crypto(format!("bad public key: {e}")))?;

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_issuer(&[&config.jwt_issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);
        // Expiry is enforced against the session record so the caller
        // learns why the session ended.
        validation.validate_exp = false;

        Ok(Self {
            encoding,
            decoding,
            validation,
            issuer: config.jwt_issuer.clone(),
        })
    }

    /// Sign an identity token for `user` bound to the given session.
    pub fn issue(
        &self,
        user: &User,
        session_token: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = IdentityClaims {
            sub: user.id.to_string(),
            role: user.role,
            college_id: user.college_id.map(|c| c.to_string()),
            sid: session_token.to_string(),
            iss: self.issuer.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::EdDSA), &claims, &self.encoding)
            .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
    }

    /// Verify signature and issuer, and return the claims.
    ///
    /// `exp` is not checked here: whether the session behind the token
    /// is still alive, expiry included, is the session manager's call.
    pub fn decode(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        jsonwebtoken::decode::<IdentityClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::TokenInvalid(e.to_string()))
    }
}

/// Generate a cryptographically random opaque session token
/// (48 bytes → 64 base64url chars, no padding).
pub fn generate_session_token() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::Rng::fill(&mut rng, &mut bytes[..]);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 of a raw session token, hex-encoded. This is what the
/// session store keeps.
pub fn hash_session_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Short, non-secret prefix of a session token for audit trails.
pub fn token_prefix(raw: &str) -> String {
    let prefix: String = raw.chars().take(TOKEN_PREFIX_LEN).collect();
    format!("{prefix}...")
}
