//! Session lifecycle: create, validate, terminate, refresh and sweep.
//!
//! Each user has at most one live session. The raw token is only ever
//! held by the client; the store keeps its SHA-256.

use std::fmt;
use std::sync::Arc;

use campus_core::models::audit::{AuditStatus, CreateAuditLogEntry, action};
use campus_core::models::security_event::{CreateSecurityEvent, Severity, event};
use campus_core::models::session::{CreateSession, Origin};
use campus_core::repository::{AuditLogRepository, SecurityEventRepository, SessionRepository};
use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::AuditSink;
use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::error::AuthError;
use crate::token;

/// Handed to the client after a session is created or refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Raw opaque session token. Never stored server-side.
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Why a presented session was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    NotLoggedIn,
    /// Another session owns the account; the stored one is left alone.
    InvalidToken,
    Expired,
    Inactive,
    /// Origin fingerprint changed mid-session.
    SecurityViolation,
    /// The store could not be read or written while deciding.
    StoreUnavailable,
}

impl InvalidReason {
    /// Stable machine-readable code, used in redirect query strings
    /// and JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            InvalidReason::NotLoggedIn => "not_logged_in",
            InvalidReason::InvalidToken => "invalid_token",
            InvalidReason::Expired => "expired",
            InvalidReason::Inactive => "inactivity_timeout",
            InvalidReason::SecurityViolation => "security_violation",
            InvalidReason::StoreUnavailable => "session_check_failed",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            InvalidReason::NotLoggedIn => "not logged in",
            InvalidReason::InvalidToken => "invalid token",
            InvalidReason::Expired => "expired",
            InvalidReason::Inactive => "inactivity timeout",
            InvalidReason::SecurityViolation => "security violation",
            InvalidReason::StoreUnavailable => "session check failed",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionValidation {
    Valid { expires_at: DateTime<Utc> },
    Invalid(InvalidReason),
}

impl SessionValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, SessionValidation::Valid { .. })
    }
}

/// Owns the single-session-per-user lifecycle.
///
/// Generic over the store and log repositories so the auth layer has
/// no dependency on the database crate.
pub struct SessionManager<S, A, E>
where
    S: SessionRepository,
    A: AuditLogRepository,
    E: SecurityEventRepository,
{
    sessions: S,
    audit: AuditSink<A, E>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl<S, A, E> SessionManager<S, A, E>
where
    S: SessionRepository,
    A: AuditLogRepository,
    E: SecurityEventRepository,
{
    pub fn new(sessions: S, audit: AuditSink<A, E>, config: SessionConfig) -> Self {
        Self::with_clock(sessions, audit, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        sessions: S,
        audit: AuditSink<A, E>,
        config: SessionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions,
            audit,
            clock,
            config,
        }
    }

    pub fn audit(&self) -> &AuditSink<A, E> {
        &self.audit
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Start a new session for `user_id`, superseding any existing one.
    ///
    /// With `terminate_others` the previous session is cleared and a
    /// `CONCURRENT_SESSION_TERMINATED` event recorded first. The new
    /// session is written over the record either way.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        ip_address: &str,
        user_agent: &str,
        terminate_others: bool,
    ) -> Result<SessionInfo, AuthError> {
        if terminate_others {
            self.terminate_others(user_id, ip_address, user_agent).await?;
        }

        let raw = token::generate_session_token();
        let now = self.clock.now();
        let expires_at = now + self.config.session_duration();

        self.sessions
            .start(CreateSession {
                user_id,
                token_hash: token::hash_session_token(&raw),
                origin: Origin::new(ip_address, user_agent),
                created_at: now,
                expires_at,
            })
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        info!(user_id = %user_id, %expires_at, "session created");
        self.audit
            .record(CreateAuditLogEntry {
                actor_id: Some(user_id),
                action: action::SESSION_CREATED.into(),
                details: format!(
                    "Session created with token {}",
                    token::token_prefix(&raw)
                ),
                ip_address: Some(ip_address.to_string()),
                user_agent: Some(user_agent.to_string()),
                status: AuditStatus::Success,
            })
            .await;

        Ok(SessionInfo {
            token: raw,
            expires_at,
        })
    }

    async fn terminate_others(
        &self,
        user_id: Uuid,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<(), AuthError> {
        let existing = self
            .sessions
            .get(user_id)
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let Some(previous) = existing.as_ref().and_then(|s| s.active()) else {
            return Ok(());
        };

        self.sessions
            .clear(user_id, self.clock.now())
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        self.audit
            .security(CreateSecurityEvent {
                user_id: Some(user_id),
                event_type: event::CONCURRENT_SESSION_TERMINATED.into(),
                details: format!(
                    "Previous session from {} terminated by new login",
                    previous.origin.ip_address
                ),
                ip_address: Some(ip_address.to_string()),
                user_agent: Some(user_agent.to_string()),
                severity: Severity::Medium,
            })
            .await;
        Ok(())
    }

    /// Decide whether `presented_token` is the user's live session.
    ///
    /// Checks run in a fixed order and the first failure wins. Any
    /// store failure rejects with [`InvalidReason::StoreUnavailable`].
    pub async fn validate_session(
        &self,
        user_id: Uuid,
        presented_token: &str,
        ip_address: &str,
        user_agent: &str,
    ) -> SessionValidation {
        let record = match self.sessions.get(user_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "session lookup failed");
                return SessionValidation::Invalid(InvalidReason::StoreUnavailable);
            }
        };

        let Some(active) = record.as_ref().and_then(|s| s.active()) else {
            return SessionValidation::Invalid(InvalidReason::NotLoggedIn);
        };

        let presented_hash = token::hash_session_token(presented_token);
        if !bool::from(
            presented_hash
                .as_bytes()
                .ct_eq(active.token_hash.as_bytes()),
        ) {
            self.audit
                .security(CreateSecurityEvent {
                    user_id: Some(user_id),
                    event_type: event::INVALID_SESSION_TOKEN.into(),
                    details: "Presented session token does not match the active session".into(),
                    ip_address: Some(ip_address.to_string()),
                    user_agent: Some(user_agent.to_string()),
                    severity: Severity::High,
                })
                .await;
            return SessionValidation::Invalid(InvalidReason::InvalidToken);
        }

        let now = self.clock.now();

        if now >= active.expires_at {
            self.end_session(
                user_id,
                Some(&active.token_hash),
                ip_address,
                user_agent,
                "Session expired",
            )
            .await;
            return SessionValidation::Invalid(InvalidReason::Expired);
        }

        if now - active.last_activity > self.config.activity_timeout() {
            self.end_session(
                user_id,
                Some(&active.token_hash),
                ip_address,
                user_agent,
                "Inactivity timeout",
            )
            .await;
            return SessionValidation::Invalid(InvalidReason::Inactive);
        }

        if active.origin.ip_address != ip_address || active.origin.user_agent != user_agent {
            self.audit
                .security(CreateSecurityEvent {
                    user_id: Some(user_id),
                    event_type: event::SESSION_HIJACK_ATTEMPT.into(),
                    details: format!(
                        "Session bound to {} / {} presented from {} / {}",
                        active.origin.ip_address, active.origin.user_agent, ip_address, user_agent
                    ),
                    ip_address: Some(ip_address.to_string()),
                    user_agent: Some(user_agent.to_string()),
                    severity: Severity::Critical,
                })
                .await;
            self.end_session(
                user_id,
                Some(&active.token_hash),
                ip_address,
                user_agent,
                "Security violation",
            )
            .await;
            return SessionValidation::Invalid(InvalidReason::SecurityViolation);
        }

        match self
            .sessions
            .touch(user_id, &active.token_hash, now)
            .await
        {
            Ok(true) => SessionValidation::Valid {
                expires_at: active.expires_at,
            },
            // Superseded between the read and the bump.
            Ok(false) => SessionValidation::Invalid(InvalidReason::InvalidToken),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "session activity update failed");
                SessionValidation::Invalid(InvalidReason::StoreUnavailable)
            }
        }
    }

    /// Clear the user's session. Safe to call repeatedly; never fails.
    pub async fn terminate_session(
        &self,
        user_id: Uuid,
        ip_address: &str,
        user_agent: &str,
        reason: &str,
    ) {
        self.end_session(user_id, None, ip_address, user_agent, reason)
            .await;
    }

    /// Clear the session. With `only_token`, a session that has since
    /// been replaced is left alone and nothing is recorded.
    async fn end_session(
        &self,
        user_id: Uuid,
        only_token: Option<&str>,
        ip_address: &str,
        user_agent: &str,
        reason: &str,
    ) {
        let now = self.clock.now();
        let cleared = match only_token {
            Some(token_hash) => self.sessions.clear_if_current(user_id, token_hash, now).await,
            None => self.sessions.clear(user_id, now).await.map(|()| true),
        };

        let status = match cleared {
            Ok(true) => {
                info!(user_id = %user_id, reason, "session terminated");
                AuditStatus::Success
            }
            Ok(false) => {
                debug!(user_id = %user_id, reason, "session already replaced, left in place");
                return;
            }
            Err(e) => {
                warn!(user_id = %user_id, reason, error = %e, "session termination failed");
                AuditStatus::Failure
            }
        };

        self.audit
            .record(CreateAuditLogEntry {
                actor_id: Some(user_id),
                action: action::SESSION_TERMINATED.into(),
                details: format!("Session terminated: {reason}"),
                ip_address: Some(ip_address.to_string()),
                user_agent: Some(user_agent.to_string()),
                status,
            })
            .await;
    }

    /// Validate and, when valid, return the session's token and fixed
    /// expiry. Only the activity window moves.
    pub async fn refresh_session(
        &self,
        user_id: Uuid,
        token: &str,
        ip_address: &str,
        user_agent: &str,
    ) -> Option<SessionInfo> {
        match self
            .validate_session(user_id, token, ip_address, user_agent)
            .await
        {
            SessionValidation::Valid { expires_at } => Some(SessionInfo {
                token: token.to_string(),
                expires_at,
            }),
            SessionValidation::Invalid(reason) => {
                debug!(user_id = %user_id, reason = %reason, "session refresh refused");
                None
            }
        }
    }

    /// Clear every expired or idle session in one store operation and
    /// return how many were cleared. Returns 0 if the store fails.
    pub async fn cleanup_expired_sessions(&self) -> u64 {
        let now = self.clock.now();
        let idle_cutoff = now - self.config.activity_timeout();

        let cleared = match self.sessions.clear_stale(now, idle_cutoff).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "session cleanup failed");
                return 0;
            }
        };

        info!(cleared, "session cleanup sweep finished");
        self.audit
            .record(CreateAuditLogEntry {
                actor_id: None,
                action: action::BULK_SESSION_CLEANUP.into(),
                details: format!("Cleaned up {cleared} expired sessions"),
                ip_address: None,
                user_agent: None,
                status: AuditStatus::Success,
            })
            .await;
        cleared
    }
}
