/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Create an account and open its session
/// - `POST /v1/auth/login` - Authenticate and get the account's session
/// - `POST /v1/auth/logout` - Revoke the presented session
///
/// Register and login return the token in the body and also set it as an
/// `HttpOnly` cookie, so both API clients and browsers can use it.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::session::{clear_session_cookie, session_cookie, session_token},
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tasktrack_shared::models::session::Session;
use uuid::Uuid;

/// Register request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Display name (defaults to the email's local part when blank)
    #[serde(default)]
    pub name: String,

    /// Email address
    pub email: String,

    /// Password, 8 characters to 72 bytes
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address
    pub email: String,

    /// Password
    pub password: String,
}

/// Session response for register and login
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Account that owns the session
    pub account_id: Uuid,

    /// Opaque session token
    pub token: String,

    /// When the session stops being valid
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            account_id: session.account_id,
            token: session.token.to_string(),
            expires_at: session.expires_at,
        }
    }
}

fn session_reply(state: &AppState, status: StatusCode, session: &Session) -> impl IntoResponse {
    let body = SessionResponse::from(session);
    let cookie = session_cookie(
        &body.token,
        session.expires_at,
        state.config.session.cookie_secure,
    );

    (status, [(header::SET_COOKIE, cookie)], Json(body))
}

/// Register a new account
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "name": "Alice",
///   "email": "a@x.com",
///   "password": "longpass1"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with a [`SessionResponse`] body and a `Set-Cookie` header.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: Email already registered
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let session = state
        .sessions
        .register(&req.name, &req.email, &req.password)
        .await?;

    Ok(session_reply(&state, StatusCode::CREATED, &session))
}

/// Log in
///
/// Returns the account's current session, unchanged if it is still valid.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `401 Unauthorized`: Unknown email or wrong password (same message for both)
/// - `503 Service Unavailable`: A concurrent login updated the session; retry
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let session = state.sessions.login(&req.email, &req.password).await?;

    Ok(session_reply(&state, StatusCode::OK, &session))
}

/// Log out
///
/// Revokes the session whose token is presented (header or cookie), whether
/// or not it has expired.
///
/// # Response
///
/// `204 No Content` and a cookie-clearing `Set-Cookie` header.
///
/// # Errors
///
/// - `401 Unauthorized`: No token, malformed token, or no such session
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let token = session_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing session token".to_string()))?;

    state.sessions.logout(&token).await?;

    let cookie = clear_session_cookie(state.config.session.cookie_secure);
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]))
}
