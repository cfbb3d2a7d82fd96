/// Session token transport and the gate middleware
///
/// Clients present their session token either as
///
/// - `Authorization: Bearer <token>`, or
/// - the `session_token` cookie set by register/login.
///
/// The header wins when both are present. [`require_session`] resolves the
/// token through the ownership gate and inserts the resulting
/// [`AuthContext`] into request extensions, where task handlers pick it up
/// with `Extension<AuthContext>`.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use tasktrack_shared::auth::gate::AuthContext;
use tracing::debug;

use crate::{app::AppState, error::ApiError};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session_token";

/// Extracts the session token from the request headers
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_token(headers))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.value().to_string())
}

/// Builds the `Set-Cookie` value carrying a session token
pub fn session_cookie(token: &str, expires_at: DateTime<Utc>, secure: bool) -> String {
    let max_age = (expires_at - Utc::now()).num_seconds().max(0);

    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(CookieDuration::seconds(max_age))
        .build()
        .to_string()
}

/// Builds the `Set-Cookie` value that deletes the session cookie
pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build();
    cookie.make_removal();
    cookie.to_string()
}

/// Gate middleware for routes that need an authenticated account
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(req.headers());

    let auth: AuthContext = state.gate.resolve(token.as_deref()).await.map_err(|e| {
        debug!(error = %e, path = %req.uri().path(), "Rejected unauthenticated request");
        ApiError::from(e)
    })?;

    debug!(
        account_id = %auth.account_id(),
        session_id = %auth.session_id(),
        "Request authenticated"
    );
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
