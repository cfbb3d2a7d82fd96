/// Session model and database operations
///
/// A session is the time-bounded proof that an account authenticated. Each
/// account owns at most one session row; its opaque token is what clients send
/// back on every request.
///
/// # Lifecycle
///
/// ```text
/// (none) ──login/register──> active ──time passes──> expired
///                              ^                        │
///                              └──────login (refresh)───┘
/// active/expired ──logout──> (none)
/// ```
///
/// A refresh replaces the token and expiry while keeping the row id.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sessions (
///     id UUID PRIMARY KEY,
///     account_id UUID NOT NULL REFERENCES accounts(id),
///     token UUID NOT NULL,
///     expires_at TIMESTAMPTZ NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT sessions_account_id_key UNIQUE (account_id),
///     CONSTRAINT sessions_token_key UNIQUE (token)
/// );
/// ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

/// Persisted session
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    /// Row ID, stable across refreshes
    pub id: Uuid,

    /// Owning account
    pub account_id: Uuid,

    /// Opaque bearer token (random UUID v4)
    pub token: Uuid,

    /// Authoritative expiry; the session is not valid at or after this instant
    pub expires_at: DateTime<Utc>,

    /// When the row was first created
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("account_id", &self.account_id)
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Input for creating a session row
#[derive(Debug, Clone)]
pub struct NewSession {
    pub account_id: Uuid,
    pub token: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Parses a client-supplied token
///
/// Returns `None` for anything that is not a lowercase hyphenated UUID, the
/// only spelling tokens are handed out in. Surrounding whitespace is ignored.
pub fn parse_token(raw: &str) -> Option<Uuid> {
    let raw = raw.trim();
    Uuid::try_parse(raw)
        .ok()
        .filter(|token| token.hyphenated().to_string() == raw)
}

impl NewSession {
    /// Builds a session for `account_id` with a fresh random token
    ///
    /// Returns `None` if `now + validity` is not a representable instant.
    pub fn issue(account_id: Uuid, validity: Duration) -> Option<Self> {
        let expires_at = Utc::now().checked_add_signed(validity)?;

        Some(Self {
            account_id,
            token: Uuid::new_v4(),
            expires_at,
        })
    }
}

impl Session {
    /// Whether the session has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the session has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Inserts a session row
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on `sessions_account_id_key` when the
    /// account already has a session (for example a concurrent login won).
    pub async fn create(pool: &PgPool, data: NewSession) -> Result<Self, sqlx::Error> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, account_id, token, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, account_id, token, expires_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.account_id)
        .bind(data.token)
        .bind(data.expires_at)
        .fetch_one(pool)
        .await?;

        Ok(session)
    }

    /// Finds the session owned by an account
    pub async fn find_by_account(
        pool: &PgPool,
        account_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, account_id, token, expires_at, created_at
            FROM sessions
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(pool)
        .await?;

        Ok(session)
    }

    /// Finds the session currently holding `token`
    pub async fn find_by_token(pool: &PgPool, token: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, account_id, token, expires_at, created_at
            FROM sessions
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(session)
    }

    /// Replaces token and expiry of session `id`, only if it still holds
    /// `previous_token`
    ///
    /// Returns `None` when another writer refreshed or deleted the row first.
    pub async fn refresh(
        pool: &PgPool,
        id: Uuid,
        previous_token: Uuid,
        token: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            UPDATE sessions
            SET token = $3,
                expires_at = $4
            WHERE id = $1 AND token = $2
            RETURNING id, account_id, token, expires_at, created_at
            "#,
        )
        .bind(id)
        .bind(previous_token)
        .bind(token)
        .bind(expires_at)
        .fetch_optional(pool)
        .await?;

        Ok(session)
    }

    /// Deletes session `id` if it still holds `token`
    ///
    /// Returns true if a row was removed.
    pub async fn delete(pool: &PgPool, id: Uuid, token: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1 AND token = $2")
            .bind(id)
            .bind(token)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
