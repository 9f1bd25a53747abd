//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Implementations live in
//! `campus-db`; the auth layer only depends on these traits.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CampusResult;
use crate::models::{
    audit::{AuditLogEntry, CreateAuditLogEntry},
    security_event::{CreateSecurityEvent, SecurityEvent},
    session::{CreateSession, UserSession},
    user::{CreateUser, User, UserStatus},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = CampusResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CampusResult<User>> + Send;
    fn get_by_username(&self, username: &str)
    -> impl Future<Output = CampusResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = CampusResult<User>> + Send;
    fn set_status(
        &self,
        id: Uuid,
        status: UserStatus,
    ) -> impl Future<Output = CampusResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Sessions (one record per user)
// ---------------------------------------------------------------------------

pub trait SessionRepository: Send + Sync {
    /// Load the session record for a user. `None` if the user has
    /// never logged in.
    fn get(&self, user_id: Uuid)
    -> impl Future<Output = CampusResult<Option<UserSession>>> + Send;

    /// Write a fresh active session over the user's record in a single
    /// statement, replacing whatever was there.
    fn start(&self, input: CreateSession)
    -> impl Future<Output = CampusResult<UserSession>> + Send;

    /// Bump `last_activity`, but only while the stored token still
    /// matches `token_hash`. Returns `false` when nothing was updated.
    fn touch(
        &self,
        user_id: Uuid,
        token_hash: &str,
        at: DateTime<Utc>,
    ) -> impl Future<Output = CampusResult<bool>> + Send;

    /// Clear every session field, mark the user logged out and stamp
    /// `last_logout`. Clearing an already-cleared record is a no-op
    /// apart from the timestamp.
    fn clear(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = CampusResult<()>> + Send;

    /// Like [`clear`](Self::clear), but only while the stored token
    /// still matches `token_hash`. Returns `false` when the record held
    /// another session (or none) and was left alone.
    fn clear_if_current(
        &self,
        user_id: Uuid,
        token_hash: &str,
        at: DateTime<Utc>,
    ) -> impl Future<Output = CampusResult<bool>> + Send;

    /// Clear all logged-in sessions that expired before `now` or were
    /// last active before `idle_cutoff`. Returns the number cleared.
    fn clear_stale(
        &self,
        now: DateTime<Utc>,
        idle_cutoff: DateTime<Utc>,
    ) -> impl Future<Output = CampusResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Audit & security events (append-only)
// ---------------------------------------------------------------------------

/// Query filters for audit log entries.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub actor_id: Option<Uuid>,
    pub action: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub trait AuditLogRepository: Send + Sync {
    /// Append a new audit log entry. No update or delete operations exist.
    fn append(
        &self,
        input: CreateAuditLogEntry,
    ) -> impl Future<Output = CampusResult<AuditLogEntry>> + Send;
    fn list(
        &self,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> impl Future<Output = CampusResult<PaginatedResult<AuditLogEntry>>> + Send;
}

/// Query filters for security events.
#[derive(Debug, Clone, Default)]
pub struct SecurityEventFilter {
    pub user_id: Option<Uuid>,
    pub event_type: Option<String>,
}

pub trait SecurityEventRepository: Send + Sync {
    /// Append a new security event. No update or delete operations exist.
    fn append(
        &self,
        input: CreateSecurityEvent,
    ) -> impl Future<Output = CampusResult<SecurityEvent>> + Send;
    fn list(
        &self,
        filter: SecurityEventFilter,
        pagination: Pagination,
    ) -> impl Future<Output = CampusResult<PaginatedResult<SecurityEvent>>> + Send;
}
