//! HTTP-facing error types.

use axum::Json;
use axum::http::header::{ALLOW, InvalidHeaderValue, RETRY_AFTER};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use campus_auth::{AuthError, InvalidReason};
use thiserror::Error;

use crate::validation::QueryViolation;

/// Why the request gate refused a request. Rendered as a JSON body;
/// page requests that fail authentication or authorization are turned
/// into redirects by the gate instead.
#[derive(Debug, Error)]
pub enum AccessDenied {
    #[error("too many requests")]
    RateLimited { retry_after_secs: u64 },

    #[error(transparent)]
    BadRequest(#[from] QueryViolation),

    #[error("method not allowed")]
    MethodNotAllowed { allow: String },

    #[error("authentication required")]
    Unauthenticated { reason: Option<InvalidReason> },

    #[error("forbidden")]
    Forbidden,
}

impl IntoResponse for AccessDenied {
    fn into_response(self) -> Response {
        let status = match &self {
            AccessDenied::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AccessDenied::BadRequest(_) => StatusCode::BAD_REQUEST,
            AccessDenied::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            AccessDenied::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            AccessDenied::Forbidden => StatusCode::FORBIDDEN,
        };

        let body = match &self {
            AccessDenied::Unauthenticated {
                reason: Some(reason),
            } => serde_json::json!({
                "error": self.to_string(),
                "reason": reason.code(),
                "message": reason.to_string(),
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };

        let mut response = (status, Json(body)).into_response();
        match self {
            AccessDenied::RateLimited { retry_after_secs } => {
                response
                    .headers_mut()
                    .insert(RETRY_AFTER, retry_after_secs.into());
            }
            AccessDenied::MethodNotAllowed { allow } => {
                if let Ok(value) = allow.parse() {
                    response.headers_mut().insert(ALLOW, value);
                }
            }
            _ => {}
        }
        response
    }
}

/// Login failure as returned by `POST /api/auth/login`.
#[derive(Debug)]
pub struct LoginFailure(pub AuthError);

impl IntoResponse for LoginFailure {
    fn into_response(self) -> Response {
        let (status, msg) = match &self.0 {
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid credentials"),
            AuthError::AccountInactive => (StatusCode::FORBIDDEN, "account is inactive"),
            AuthError::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "authentication temporarily unavailable",
            ),
            AuthError::TokenInvalid(_) | AuthError::Crypto(_) => {
                tracing::error!(error = %self.0, "login failed unexpectedly");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        };
        (status, Json(serde_json::json!({ "error": msg }))).into_response()
    }
}

/// Failures while assembling application state at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid Content-Security-Policy: {0}")]
    Csp(#[from] InvalidHeaderValue),

    #[error(transparent)]
    Auth(#[from] AuthError),
}
