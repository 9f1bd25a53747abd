//! Session domain model.
//!
//! Each user owns exactly one session record. The record is either
//! logged out (no session fields at all) or holds one active session,
//! so a half-cleared session cannot be represented.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client fingerprint captured when a session is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Origin {
    pub ip_address: String,
    pub user_agent: String,
}

impl Origin {
    pub fn new(ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            user_agent: user_agent.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveSession {
    /// SHA-256 of the opaque session token, hex-encoded.
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    /// Always `created_at + session duration`; never slides.
    pub expires_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub origin: Origin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    Active(ActiveSession),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSession {
    pub user_id: Uuid,
    pub state: SessionState,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_logout: Option<DateTime<Utc>>,
}

impl UserSession {
    pub fn is_logged_in(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        match &self.state {
            SessionState::Active(session) => Some(session),
            SessionState::LoggedOut => None,
        }
    }
}

/// Input for writing a fresh session over a user's record.
///
/// `last_activity` and `last_login_at` are both set to `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSession {
    pub user_id: Uuid,
    pub token_hash: String,
    pub origin: Origin,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
