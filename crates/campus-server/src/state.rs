//! Shared application state handed to the gate and the handlers.

use std::sync::Arc;

use axum::http::HeaderValue;
use campus_auth::{
    AuditSink, AuthConfig, AuthError, AuthService, Clock, PasswordChecker, SessionManager,
    SystemClock, TokenKeys,
};
use campus_db::repository::{
    SurrealAuditLogRepository, SurrealSecurityEventRepository, SurrealSessionRepository,
    SurrealUserRepository,
};
use surrealdb::Connection;

use crate::config::AccessPolicyConfig;
use crate::error::StartupError;
use crate::headers::content_security_policy;
use crate::policy::AccessPolicy;
use crate::rate_limit::RateLimitStore;

/// Login service wired to the SurrealDB repositories.
pub type CampusAuthService<C> = AuthService<
    SurrealUserRepository<C>,
    SurrealSessionRepository<C>,
    SurrealAuditLogRepository<C>,
    SurrealSecurityEventRepository<C>,
>;

pub type CampusSessionManager<C> = SessionManager<
    SurrealSessionRepository<C>,
    SurrealAuditLogRepository<C>,
    SurrealSecurityEventRepository<C>,
>;

/// Assemble the login service from its repositories and config.
pub fn auth_service<C: Connection>(
    users: SurrealUserRepository<C>,
    sessions: SurrealSessionRepository<C>,
    audit_log: SurrealAuditLogRepository<C>,
    security_events: SurrealSecurityEventRepository<C>,
    config: &AuthConfig,
) -> Result<CampusAuthService<C>, AuthError> {
    auth_service_with_clock(
        users,
        sessions,
        audit_log,
        security_events,
        config,
        Arc::new(SystemClock),
    )
}

/// As [`auth_service`], with session time read from `clock`.
pub fn auth_service_with_clock<C: Connection>(
    users: SurrealUserRepository<C>,
    sessions: SurrealSessionRepository<C>,
    audit_log: SurrealAuditLogRepository<C>,
    security_events: SurrealSecurityEventRepository<C>,
    config: &AuthConfig,
    clock: Arc<dyn Clock>,
) -> Result<CampusAuthService<C>, AuthError> {
    let manager = SessionManager::with_clock(
        sessions,
        AuditSink::new(audit_log, security_events),
        config.session.clone(),
        clock,
    );
    Ok(AuthService::new(
        users,
        manager,
        TokenKeys::from_config(config)?,
        PasswordChecker::new(config.pepper.clone()),
    ))
}

pub struct AppState<C: Connection> {
    pub auth: Arc<CampusAuthService<C>>,
    pub policy: Arc<AccessPolicy>,
    pub access: Arc<AccessPolicyConfig>,
    pub rate_limiter: Arc<dyn RateLimitStore>,
    pub csp: HeaderValue,
}

impl<C: Connection> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            policy: Arc::clone(&self.policy),
            access: Arc::clone(&self.access),
            rate_limiter: Arc::clone(&self.rate_limiter),
            csp: self.csp.clone(),
        }
    }
}

impl<C: Connection> AppState<C> {
    pub fn new(
        auth: CampusAuthService<C>,
        access: AccessPolicyConfig,
        rate_limiter: Arc<dyn RateLimitStore>,
    ) -> Result<Self, StartupError> {
        let csp = HeaderValue::from_str(&content_security_policy(&access.csp_widget_origins))?;
        let policy = AccessPolicy::new(access.rules.iter().cloned());

        Ok(Self {
            auth: Arc::new(auth),
            policy: Arc::new(policy),
            access: Arc::new(access),
            rate_limiter,
            csp,
        })
    }

    pub fn sessions(&self) -> &CampusSessionManager<C> {
        self.auth.sessions()
    }
}
