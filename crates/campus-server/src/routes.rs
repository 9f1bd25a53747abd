//! HTTP handlers for login, logout and session status.

use axum::extract::State;
use axum::http::header::{HeaderMap, SET_COOKIE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use campus_auth::LoginInput;
use campus_core::models::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::Connection;
use uuid::Uuid;

use crate::error::LoginFailure;
use crate::gate::{ClientInfo, Identity, SESSION_COOKIE, resolve_identity};
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "username", alias = "email")]
    pub username_or_email: String,
    pub password: String,
}

/// Login response body. The identity token is also set as the
/// session cookie.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
    pub redirect_to: &'static str,
}

pub fn routes<C: Connection>() -> Router<AppState<C>> {
    Router::new()
        .route("/api/auth/login", post(login::<C>))
        .route("/api/auth/logout", post(logout::<C>))
        .route("/api/session", get(session_status))
        .route("/api/health", get(health))
}

/// Handle POST /api/auth/login.
async fn login<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Response, LoginFailure> {
    let client = ClientInfo::from_headers(&headers);
    let out = state
        .auth
        .login(LoginInput {
            username_or_email: body.username_or_email,
            password: body.password,
            ip_address: client.ip,
            user_agent: client.user_agent,
        })
        .await
        .map_err(LoginFailure)?;

    let max_age = (out.expires_at - state.sessions().now())
        .num_seconds()
        .max(0);
    let cookie = format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; Secure; SameSite=Strict; Max-Age={max_age}",
        out.identity_token
    );

    let body = LoginResponse {
        token: out.identity_token,
        user_id: out.user_id,
        role: out.role,
        expires_at: out.expires_at,
        redirect_to: out.redirect_to,
    };
    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Handle POST /api/auth/logout. Always clears the cookie; the session
/// is only terminated if the presented token still owns it.
async fn logout<C: Connection>(State(state): State<AppState<C>>, headers: HeaderMap) -> Response {
    let client = ClientInfo::from_headers(&headers);
    if let Ok(identity) = resolve_identity(&state, &headers, &client).await {
        state
            .auth
            .logout(identity.user_id, &client.ip, &client.user_agent)
            .await;
    }

    let cleared = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Secure; SameSite=Strict; Max-Age=0");
    (StatusCode::NO_CONTENT, [(SET_COOKIE, cleared)]).into_response()
}

/// Handle GET /api/session.
async fn session_status(Extension(identity): Extension<Identity>) -> Json<Identity> {
    Json(identity)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "not found" })),
    )
        .into_response()
}
