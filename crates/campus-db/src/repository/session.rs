//! SurrealDB implementation of [`SessionRepository`].
//!
//! Each user has one `user_session` record whose record id is the
//! user id. Session fields are written and cleared together in a
//! single statement.

use campus_core::error::CampusResult;
use campus_core::models::session::{ActiveSession, CreateSession, Origin, SessionState, UserSession};
use campus_core::repository::SessionRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

const CLEAR_FIELDS: &str = "\
    token_hash = NONE, created_at = NONE, expires_at = NONE, \
    last_activity = NONE, ip_address = NONE, user_agent = NONE, \
    is_logged_in = false, last_logout = $at";

#[derive(Debug, SurrealValue)]
struct SessionRow {
    user_id: String,
    token_hash: Option<String>,
    created_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    last_activity: Option<DateTime<Utc>>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    is_logged_in: bool,
    last_login_at: Option<DateTime<Utc>>,
    last_logout: Option<DateTime<Utc>>,
}

impl SessionRow {
    /// A row flagged logged-in but missing any session field reads as
    /// logged out.
    fn try_into_session(self) -> Result<UserSession, DbError> {
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::Corrupt(format!("invalid user UUID: {e}")))?;

        let active = match (
            self.is_logged_in,
            self.token_hash,
            self.created_at,
            self.expires_at,
            self.last_activity,
            self.ip_address,
            self.user_agent,
        ) {
            (
                true,
                Some(token_hash),
                Some(created_at),
                Some(expires_at),
                Some(last_activity),
                Some(ip_address),
                Some(user_agent),
            ) => Some(ActiveSession {
                token_hash,
                created_at,
                expires_at,
                last_activity,
                origin: Origin {
                    ip_address,
                    user_agent,
                },
            }),
            _ => None,
        };

        Ok(UserSession {
            user_id,
            state: active.map_or(SessionState::LoggedOut, SessionState::Active),
            last_login_at: self.last_login_at,
            last_logout: self.last_logout,
        })
    }
}

/// SurrealDB implementation of the Session repository.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn get(&self, user_id: Uuid) -> CampusResult<Option<UserSession>> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('user_session', $user_id)")
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let session = rows
            .into_iter()
            .next()
            .map(SessionRow::try_into_session)
            .transpose()?;

        Ok(session)
    }

    async fn start(&self, input: CreateSession) -> CampusResult<UserSession> {
        let user_id_str = input.user_id.to_string();

        let result = self
            .db
            .query(
                "UPSERT type::record('user_session', $user_id) SET \
                 user_id = $user_id, \
                 token_hash = $token_hash, \
                 created_at = $created_at, \
                 expires_at = $expires_at, \
                 last_activity = $created_at, \
                 ip_address = $ip_address, \
                 user_agent = $user_agent, \
                 is_logged_in = true, \
                 last_login_at = $created_at",
            )
            .bind(("user_id", user_id_str.clone()))
            .bind(("token_hash", input.token_hash))
            .bind(("created_at", input.created_at))
            .bind(("expires_at", input.expires_at))
            .bind(("ip_address", input.origin.ip_address))
            .bind(("user_agent", input.origin.user_agent))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user_session".into(),
            id: user_id_str,
        })?;

        Ok(row.try_into_session()?)
    }

    async fn touch(&self, user_id: Uuid, token_hash: &str, at: DateTime<Utc>) -> CampusResult<bool> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('user_session', $user_id) SET \
                 last_activity = $at \
                 WHERE is_logged_in = true AND token_hash = $token_hash",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("token_hash", token_hash.to_string()))
            .bind(("at", at))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }

    async fn clear(&self, user_id: Uuid, at: DateTime<Utc>) -> CampusResult<()> {
        let query = format!(
            "UPDATE type::record('user_session', $user_id) SET {CLEAR_FIELDS}"
        );

        self.db
            .query(&query)
            .bind(("user_id", user_id.to_string()))
            .bind(("at", at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        Ok(())
    }

    async fn clear_if_current(
        &self,
        user_id: Uuid,
        token_hash: &str,
        at: DateTime<Utc>,
    ) -> CampusResult<bool> {
        let query = format!(
            "UPDATE type::record('user_session', $user_id) SET {CLEAR_FIELDS} \
             WHERE is_logged_in = true AND token_hash = $token_hash"
        );

        let mut result = self
            .db
            .query(&query)
            .bind(("user_id", user_id.to_string()))
            .bind(("token_hash", token_hash.to_string()))
            .bind(("at", at))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }

    async fn clear_stale(&self, now: DateTime<Utc>, idle_cutoff: DateTime<Utc>) -> CampusResult<u64> {
        // One UPDATE selects and clears; the returned rows are the count.
        let query = format!(
            "UPDATE user_session SET {CLEAR_FIELDS} \
             WHERE is_logged_in = true \
             AND (expires_at < $at OR last_activity < $idle_cutoff)"
        );

        let mut result = self
            .db
            .query(&query)
            .bind(("at", now))
            .bind(("idle_cutoff", idle_cutoff))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.len() as u64)
    }
}
