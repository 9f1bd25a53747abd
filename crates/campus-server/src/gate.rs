//! Per-request authorization gate.
//!
//! Runs in order: identity-provider bypass, login-page redirect, rate
//! limit, query validation, public-path method check, then identity
//! and role checks. Everything past the bypass gets security and
//! cache headers.

use axum::extract::{Request, State};
use axum::http::header::{self, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use campus_auth::SessionValidation;
use campus_core::models::role::Role;
use chrono::{DateTime, Utc};
use serde::Serialize;
use surrealdb::Connection;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AccessDenied;
use crate::headers::{CachePolicy, apply_security_headers, dedupe_set_cookie};
use crate::policy::{any_prefix_matches, prefix_matches};
use crate::rate_limit::RateDecision;
use crate::state::AppState;
use crate::validation::validate_query;

/// Cookie carrying the identity token for browser clients.
pub const SESSION_COOKIE: &str = "campus_session";

const CALLBACK_PARAM: &str = "callbackUrl";

/// The authenticated caller, available to handlers as a request
/// extension.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
    pub college_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
}

/// Where the request came from, as far as proxies tell us.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: String,
}

impl ClientInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        Self {
            ip: forwarded.or(real_ip).unwrap_or("unknown").to_string(),
            user_agent: headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string(),
        }
    }
}

/// Identity token from `Authorization: Bearer`, else the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Decode the identity token and check that its session is still live.
pub async fn resolve_identity<C: Connection>(
    state: &AppState<C>,
    headers: &HeaderMap,
    client: &ClientInfo,
) -> Result<Identity, AccessDenied> {
    let token = session_token(headers).ok_or(AccessDenied::Unauthenticated { reason: None })?;
    let (claims, user_id) = state
        .auth
        .tokens()
        .decode(&token)
        .and_then(|claims| claims.user_id().map(|id| (claims, id)))
        .map_err(|e| {
            debug!(error = %e, "identity token rejected");
            AccessDenied::Unauthenticated { reason: None }
        })?;

    match state
        .sessions()
        .validate_session(user_id, &claims.sid, &client.ip, &client.user_agent)
        .await
    {
        SessionValidation::Valid { expires_at } => Ok(Identity {
            user_id,
            role: claims.role,
            college_id: claims.college_id(),
            expires_at,
        }),
        SessionValidation::Invalid(reason) => {
            info!(user_id = %user_id, reason = reason.code(), "session rejected");
            Err(AccessDenied::Unauthenticated {
                reason: Some(reason),
            })
        }
    }
}

/// Axum middleware entry point.
pub async fn access_gate<C: Connection>(
    State(state): State<AppState<C>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if prefix_matches(&state.access.bypass_prefix, &path) {
        return next.run(request).await;
    }

    let client = ClientInfo::from_headers(request.headers());

    let mut response = if prefix_matches(&state.access.login_path, &path) {
        let query = request.uri().query().map(str::to_string);
        match login_redirect(&state, request.headers(), query.as_deref(), &client).await {
            Some(redirect) => redirect,
            None => check(&state, request, next, &client, &path).await,
        }
    } else {
        check(&state, request, next, &client, &path).await
    };

    let headers = response.headers_mut();
    apply_security_headers(headers, &state.csp);
    headers.insert(
        header::CACHE_CONTROL,
        CachePolicy::for_path(&path, state.access.public_prefixes.as_slice()).header_value(),
    );
    dedupe_set_cookie(headers);
    response
}

/// Signed-in users visiting the login page go to their callback or
/// their role's landing page.
async fn login_redirect<C: Connection>(
    state: &AppState<C>,
    headers: &HeaderMap,
    query: Option<&str>,
    client: &ClientInfo,
) -> Option<Response> {
    session_token(headers)?;
    let identity = resolve_identity(state, headers, client).await.ok()?;

    let target = callback_url(query)
        .unwrap_or_else(|| identity.role.landing_path().to_string());
    Some(Redirect::temporary(&target).into_response())
}

async fn check<C: Connection>(
    state: &AppState<C>,
    mut request: Request,
    next: Next,
    client: &ClientInfo,
    path: &str,
) -> Response {
    let original = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.to_string());

    let key = format!("{}:{}", client.ip, path);
    if let RateDecision::Limited { retry_after_secs } =
        state.rate_limiter.hit(&key, state.sessions().now())
    {
        warn!(ip = %client.ip, path, "rate limit exceeded");
        return AccessDenied::RateLimited { retry_after_secs }.into_response();
    }

    if let Err(violation) = validate_query(request.uri().query()) {
        warn!(ip = %client.ip, path, %violation, "query rejected");
        return AccessDenied::from(violation).into_response();
    }

    let access = &state.access;
    if any_prefix_matches(access.public_prefixes.as_slice(), path) {
        if !access.public_methods.contains(request.method()) {
            let allow = access
                .public_methods
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return AccessDenied::MethodNotAllowed { allow }.into_response();
        }
        return next.run(request).await;
    }

    let identity = match resolve_identity(state, request.headers(), client).await {
        Ok(identity) => identity,
        Err(denied) => return deny(state, denied, path, &original),
    };

    if !state.policy.authorize(path, identity.role) {
        info!(user_id = %identity.user_id, role = %identity.role, path, "access forbidden");
        return deny(state, AccessDenied::Forbidden, path, &original);
    }

    request.extensions_mut().insert(identity);
    next.run(request).await
}

/// API callers get the JSON error; page requests are redirected.
fn deny<C: Connection>(
    state: &AppState<C>,
    denied: AccessDenied,
    path: &str,
    original: &str,
) -> Response {
    if prefix_matches("/api", path) {
        return denied.into_response();
    }

    match denied {
        AccessDenied::Unauthenticated { reason } => {
            let mut target = format!(
                "{}?{CALLBACK_PARAM}={}",
                state.access.login_path,
                urlencoding::encode(original)
            );
            if let Some(reason) = reason {
                target.push_str("&reason=");
                target.push_str(reason.code());
            }
            Redirect::temporary(&target).into_response()
        }
        AccessDenied::Forbidden => Redirect::temporary(&state.access.forbidden_path).into_response(),
        other => other.into_response(),
    }
}

/// The `callbackUrl` query parameter, if it is a same-origin path.
fn callback_url(query: Option<&str>) -> Option<String> {
    let raw = query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == CALLBACK_PARAM)
        .map(|(_, value)| value)?;
    let decoded = urlencoding::decode(raw).ok()?.into_owned();

    let same_origin =
        decoded.starts_with('/') && !decoded.starts_with("//") && !decoded.contains('\\');
    same_origin.then_some(decoded)
}
