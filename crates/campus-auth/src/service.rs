//! Authentication service: credential login and logout orchestration.

use campus_core::error::CampusError;
use campus_core::models::audit::{AuditStatus, CreateAuditLogEntry, action};
use campus_core::models::role::Role;
use campus_core::models::user::{User, UserStatus};
use campus_core::repository::{
    AuditLogRepository, SecurityEventRepository, SessionRepository, UserRepository,
};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::AuditSink;
use crate::error::AuthError;
use crate::password::PasswordChecker;
use crate::session::SessionManager;
use crate::token::TokenKeys;

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
    pub ip_address: String,
    pub user_agent: String,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// Signed identity token carrying the session token as `sid`.
    pub identity_token: String,
    pub user_id: Uuid,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
    /// Landing page for the user's role.
    pub redirect_to: &'static str,
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct AuthService<U, S, A, E>
where
    U: UserRepository,
    S: SessionRepository,
    A: AuditLogRepository,
    E: SecurityEventRepository,
{
    users: U,
    sessions: SessionManager<S, A, E>,
    tokens: TokenKeys,
    passwords: PasswordChecker,
}

impl<U, S, A, E> AuthService<U, S, A, E>
where
    U: UserRepository,
    S: SessionRepository,
    A: AuditLogRepository,
    E: SecurityEventRepository,
{
    pub fn new(
        users: U,
        sessions: SessionManager<S, A, E>,
        tokens: TokenKeys,
        passwords: PasswordChecker,
    ) -> Self {
        Self {
            users,
            sessions,
            tokens,
            passwords,
        }
    }

    pub fn sessions(&self) -> &SessionManager<S, A, E> {
        &self.sessions
    }

    pub fn tokens(&self) -> &TokenKeys {
        &self.tokens
    }

    fn audit(&self) -> &AuditSink<A, E> {
        self.sessions.audit()
    }

    /// Authenticate with username/email + password, start a session
    /// (superseding any other) and issue an identity token for it.
    pub async fn login(&self, input: LoginInput) -> Result<LoginOutput, AuthError> {
        let user = match self.authenticate(&input).await {
            Ok(user) => user,
            Err((actor_id, err)) => {
                self.record_login(actor_id, &input, AuditStatus::Failure, &err.to_string())
                    .await;
                return Err(err);
            }
        };

        let session = match self
            .sessions
            .create_session(user.id, &input.ip_address, &input.user_agent, true)
            .await
        {
            Ok(session) => session,
            Err(err) => {
                self.record_login(Some(user.id), &input, AuditStatus::Failure, &err.to_string())
                    .await;
                return Err(err);
            }
        };

        let issued_at = self.sessions.now();
        let identity_token =
            match self
                .tokens
                .issue(&user, &session.token, issued_at, session.expires_at)
            {
                Ok(jwt) => jwt,
                Err(err) => {
                    self.sessions
                        .terminate_session(
                            user.id,
                            &input.ip_address,
                            &input.user_agent,
                            "Identity token issuance failed",
                        )
                        .await;
                    self.record_login(
                        Some(user.id),
                        &input,
                        AuditStatus::Failure,
                        &err.to_string(),
                    )
                    .await;
                    return Err(err);
                }
            };

        info!(user_id = %user.id, role = %user.role, "login succeeded");
        self.record_login(Some(user.id), &input, AuditStatus::Success, "Login succeeded")
            .await;

        Ok(LoginOutput {
            identity_token,
            user_id: user.id,
            role: user.role,
            expires_at: session.expires_at,
            redirect_to: user.role.landing_path(),
        })
    }

    /// End the user's session.
    pub async fn logout(&self, user_id: Uuid, ip_address: &str, user_agent: &str) {
        self.sessions
            .terminate_session(user_id, ip_address, user_agent, "User logout")
            .await;
    }

    /// Resolve and check the credentials. On failure, returns the
    /// user id when one was identified so the failure can be attributed.
    async fn authenticate(&self, input: &LoginInput) -> Result<User, (Option<Uuid>, AuthError)> {
        // Username first, then email.
        let user = match self.users.get_by_username(&input.username_or_email).await {
            Ok(u) => u,
            Err(CampusError::NotFound { .. }) => {
                match self.users.get_by_email(&input.username_or_email).await {
                    Ok(u) => u,
                    Err(CampusError::NotFound { .. }) => {
                        return Err((None, AuthError::InvalidCredentials));
                    }
                    Err(e) => return Err((None, AuthError::Unavailable(e.to_string()))),
                }
            }
            Err(e) => return Err((None, AuthError::Unavailable(e.to_string()))),
        };

        let valid = self
            .passwords
            .verify(&input.password, &user.password_hash)
            .map_err(|e| {
                warn!(user_id = %user.id, error = %e, "stored password hash unusable");
                (Some(user.id), AuthError::InvalidCredentials)
            })?;
        if !valid {
            return Err((Some(user.id), AuthError::InvalidCredentials));
        }

        if user.status == UserStatus::Inactive {
            return Err((Some(user.id), AuthError::AccountInactive));
        }

        Ok(user)
    }

    async fn record_login(
        &self,
        actor_id: Option<Uuid>,
        input: &LoginInput,
        status: AuditStatus,
        details: &str,
    ) {
        let action = match status {
            AuditStatus::Success => action::LOGIN_SUCCESS,
            _ => action::LOGIN_FAILED,
        };
        self.audit()
            .record(CreateAuditLogEntry {
                actor_id,
                action: action.into(),
                details: format!("{details} ({})", input.username_or_email),
                ip_address: Some(input.ip_address.clone()),
                user_agent: Some(input.user_agent.clone()),
                status,
            })
            .await;
    }
}
