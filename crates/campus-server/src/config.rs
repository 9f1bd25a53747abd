//! Server configuration, populated from `CAMPUS_*` environment variables.

use std::str::FromStr;

use axum::http::Method;
use campus_auth::{AuthConfig, SessionConfig};
use campus_core::models::role::{Role, RoleSet};
use campus_db::DbConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("cannot read {var} file {path}: {source}")]
    KeyFile {
        var: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Fixed-window rate limit applied per `ip:path`.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
        }
    }
}

/// Path layout and the role table the request gate enforces.
#[derive(Debug, Clone)]
pub struct AccessPolicyConfig {
    /// Identity-provider routes; passed through untouched.
    pub bypass_prefix: String,
    pub login_path: String,
    pub forbidden_path: String,
    /// Reachable without an identity token.
    pub public_prefixes: Vec<String>,
    /// The only methods public prefixes accept.
    pub public_methods: Vec<Method>,
    /// Path prefix → roles allowed. Longest matching prefix wins.
    pub rules: Vec<(String, RoleSet)>,
    /// Third-party widget origins allowed by the CSP.
    pub csp_widget_origins: Vec<String>,
}

impl Default for AccessPolicyConfig {
    fn default() -> Self {
        use Role::*;

        let rules = vec![
            ("/super-admin", RoleSet::only([SuperAdmin])),
            ("/college-admin", RoleSet::only([CollegeAdmin])),
            ("/education-department", RoleSet::only([EducationDepartment])),
            ("/teacher", RoleSet::only([Teacher])),
            ("/student", RoleSet::only([Student])),
            ("/profile", RoleSet::All),
            ("/api/session", RoleSet::All),
            ("/api/super-admin", RoleSet::only([SuperAdmin])),
            ("/api/colleges", RoleSet::only([SuperAdmin, EducationDepartment])),
            ("/api/college-admin", RoleSet::only([CollegeAdmin])),
            ("/api/education-department", RoleSet::only([EducationDepartment])),
            ("/api/teacher", RoleSet::only([Teacher, CollegeAdmin])),
            ("/api/student", RoleSet::only([Student, Teacher, CollegeAdmin])),
        ];

        Self {
            bypass_prefix: "/api/auth".into(),
            login_path: "/login".into(),
            forbidden_path: "/unauthorized".into(),
            public_prefixes: [
                "/login",
                "/unauthorized",
                "/api/public",
                "/api/health",
                "/_next/static",
                "/static",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            public_methods: vec![Method::GET, Method::POST, Method::OPTIONS],
            rules: rules
                .into_iter()
                .map(|(prefix, roles)| (prefix.to_string(), roles))
                .collect(),
            csp_widget_origins: vec!["https://checkout.razorpay.com".into()],
        }
    }
}

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub db: DbConfig,
    pub auth: AuthConfig,
    pub access: AccessPolicyConfig,
    pub rate_limit: RateLimitConfig,
    pub sweep_interval_secs: u64,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_defaults = DbConfig::default();
        let session_defaults = SessionConfig::default();

        let db = DbConfig {
            url: lookup("CAMPUS_DB_URL").unwrap_or(db_defaults.url),
            namespace: lookup("CAMPUS_DB_NAMESPACE").unwrap_or(db_defaults.namespace),
            database: lookup("CAMPUS_DB_DATABASE").unwrap_or(db_defaults.database),
            username: lookup("CAMPUS_DB_USER").unwrap_or(db_defaults.username),
            password: lookup("CAMPUS_DB_PASSWORD").unwrap_or(db_defaults.password),
        };

        let session = SessionConfig {
            session_duration_secs: number(
                &lookup,
                "CAMPUS_SESSION_DURATION_SECS",
                session_defaults.session_duration_secs,
            )?,
            activity_timeout_secs: number(
                &lookup,
                "CAMPUS_ACTIVITY_TIMEOUT_SECS",
                session_defaults.activity_timeout_secs,
            )?,
        };

        let auth = AuthConfig {
            jwt_private_key_pem: key_file(&lookup, "CAMPUS_JWT_PRIVATE_KEY_FILE")?,
            jwt_public_key_pem: key_file(&lookup, "CAMPUS_JWT_PUBLIC_KEY_FILE")?,
            pepper: lookup("CAMPUS_PEPPER").filter(|p| !p.is_empty()),
            session,
            ..AuthConfig::default()
        };

        Ok(Self {
            bind_addr: lookup("CAMPUS_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            db,
            auth,
            access: AccessPolicyConfig::default(),
            rate_limit: RateLimitConfig::default(),
            sweep_interval_secs: number(&lookup, "CAMPUS_SWEEP_INTERVAL_SECS", 300)?,
        })
    }
}

fn number<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}

fn key_file(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<String, ConfigError> {
    let path = lookup(var).ok_or(ConfigError::Missing(var))?;
    std::fs::read_to_string(&path).map_err(|source| ConfigError::KeyFile { var, path, source })
}
