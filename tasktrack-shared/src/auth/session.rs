/// Session manager: registration, login, logout and expiry-driven refresh
///
/// This is where credentials turn into sessions. Each account moves through
///
/// ```text
/// NoSession ──register/login──> Active ──expiry──> Expired ──login──> Active
///                                  │                  │
///                                  └─────logout───────┴──> Revoked (until next login)
/// ```
///
/// and owns at most one session row at any time.
///
/// # Concurrency
///
/// The manager holds no locks. Two logins racing to create a session for the
/// same account collide on the store's `sessions.account_id` unique
/// constraint; two logins racing to refresh the same expired session collide
/// on the refresh compare-and-swap. Either way the losing caller gets
/// [`AuthError::SessionConflict`] (a transient, storage-class failure) and may
/// simply retry the login. Nothing is retried here. A refresh that finds the
/// row deleted by a concurrent logout creates a new session instead.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tasktrack_shared::auth::password::{HasherConfig, PasswordHasher};
/// use tasktrack_shared::auth::session::{SessionConfig, SessionManager};
/// use tasktrack_shared::store::memory::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(MemoryStore::new());
/// let hasher = PasswordHasher::new(HasherConfig::default())?;
/// let manager = SessionManager::new(store.clone(), store, hasher, SessionConfig::default())?;
///
/// let session = manager.register("Alice", "a@x.com", "longpass1").await?;
/// let again = manager.login("a@x.com", "longpass1").await?;
/// assert_eq!(session.token, again.token);
///
/// manager.logout(&session.token.to_string()).await?;
/// # Ok(())
/// # }
/// ```

use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use super::password::{PasswordError, PasswordHasher, MAX_PASSWORD_BYTES};
use crate::error::ErrorKind;
use crate::models::{
    account::{normalize_email, CreateAccount},
    session::{parse_token, NewSession, Session},
};
use crate::store::{
    AccountStore, SessionStore, StoreError, ACCOUNTS_EMAIL_KEY, SESSIONS_ACCOUNT_ID_KEY,
};

/// Default session validity window (15 minutes)
pub const DEFAULT_SESSION_VALIDITY_SECS: i64 = 15 * 60;

/// Longest accepted session validity window (365 days)
pub const MAX_SESSION_VALIDITY_SECS: i64 = 365 * 24 * 60 * 60;

/// Error type for session manager operations
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A required field was empty
    #[error("{0} is required")]
    Required(&'static str),

    /// A field failed shape validation
    #[error("Invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },

    /// Password exceeds the hasher's input limit
    #[error("Password exceeds 72 bytes")]
    PasswordTooLong,

    /// Registration with an email that is already taken
    #[error("An account with this email already exists")]
    AccountAlreadyExists,

    /// Login with an unknown email
    #[error("Account not found")]
    AccountNotFound,

    /// Login with a wrong password
    #[error("Password does not match")]
    PasswordMismatch,

    /// Logout token is not a well-formed session token
    #[error("Malformed session token")]
    InvalidToken,

    /// No session holds the token
    #[error("Session not found")]
    SessionNotFound,

    /// Another request created or refreshed this account's session first
    #[error("Session was modified concurrently, retry")]
    SessionConflict,

    /// Validity window is not positive, exceeds the maximum, or yields an
    /// unrepresentable expiry
    #[error("Session validity window is out of range")]
    ValidityOutOfRange,

    /// Hashing failed for a reason other than input size
    #[error(transparent)]
    Password(PasswordError),

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Classification for the transport layer
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Required(_)
            | AuthError::Invalid { .. }
            | AuthError::PasswordTooLong
            | AuthError::ValidityOutOfRange => ErrorKind::Validation,
            AuthError::AccountAlreadyExists => ErrorKind::Conflict,
            AuthError::AccountNotFound | AuthError::SessionNotFound => ErrorKind::NotFound,
            AuthError::PasswordMismatch | AuthError::InvalidToken => ErrorKind::Authentication,
            AuthError::SessionConflict | AuthError::Store(_) => ErrorKind::Storage,
            AuthError::Password(e) => e.kind(),
        }
    }

    /// Whether this is one of the two login failures that must look identical
    /// to the client (unknown email, wrong password)
    pub fn is_bad_credentials(&self) -> bool {
        matches!(self, AuthError::AccountNotFound | AuthError::PasswordMismatch)
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooLong => AuthError::PasswordTooLong,
            other => AuthError::Password(other),
        }
    }
}

/// Session manager configuration
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// How long a freshly issued or refreshed session stays valid
    pub validity: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            validity: Duration::seconds(DEFAULT_SESSION_VALIDITY_SECS),
        }
    }
}

/// Email/password pair after shape validation
#[derive(Validate)]
struct Credentials {
    #[validate(email(message = "must be a valid email address"))]
    email: String,

    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    password: String,
}

impl Credentials {
    /// Normalizes and validates raw input
    ///
    /// Empty fields fail with `Required` before any other check.
    fn parse(email: &str, password: &str) -> Result<Self, AuthError> {
        let email = normalize_email(email);

        if email.is_empty() {
            return Err(AuthError::Required("email"));
        }
        if password.is_empty() {
            return Err(AuthError::Required("password"));
        }

        let credentials = Self {
            email,
            password: password.to_string(),
        };

        if let Err(errors) = credentials.validate() {
            let field_errors = errors.field_errors();
            for field in ["email", "password"] {
                if let Some(errs) = field_errors.get(field) {
                    let message = errs
                        .first()
                        .and_then(|e| e.message.as_ref())
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "validation failed".to_string());
                    return Err(AuthError::Invalid { field, message });
                }
            }
        }

        if credentials.password.len() > MAX_PASSWORD_BYTES {
            return Err(AuthError::PasswordTooLong);
        }

        Ok(credentials)
    }
}

/// Orchestrates registration, login, logout and session refresh
pub struct SessionManager {
    accounts: Arc<dyn AccountStore>,
    sessions: Arc<dyn SessionStore>,
    hasher: PasswordHasher,
    config: SessionConfig,
    /// Verified against on unknown-email logins so both failures cost the same
    dummy_hash: String,
}

impl SessionManager {
    /// Creates a session manager
    ///
    /// # Errors
    ///
    /// - `ValidityOutOfRange` unless `0 < validity <= MAX_SESSION_VALIDITY_SECS`
    /// - `Password` if the hasher cannot produce its timing-equalization hash
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        sessions: Arc<dyn SessionStore>,
        hasher: PasswordHasher,
        config: SessionConfig,
    ) -> Result<Self, AuthError> {
        if config.validity <= Duration::zero()
            || config.validity > Duration::seconds(MAX_SESSION_VALIDITY_SECS)
        {
            return Err(AuthError::ValidityOutOfRange);
        }

        let dummy_hash = hasher.hash(&Uuid::new_v4().to_string())?;

        Ok(Self {
            accounts,
            sessions,
            hasher,
            config,
            dummy_hash,
        })
    }

    /// Validity window applied to new and refreshed sessions
    pub fn validity(&self) -> Duration {
        self.config.validity
    }

    /// Registers a new account and opens its session
    ///
    /// # Errors
    ///
    /// - `Required` / `Invalid` / `PasswordTooLong` for bad input
    /// - `AccountAlreadyExists` if the email is taken (nothing is written)
    /// - `Store` for persistence failures, at either step
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let credentials = Credentials::parse(email, password)?;

        if self
            .accounts
            .find_account_by_email(&credentials.email)
            .await?
            .is_some()
        {
            debug!("Registration rejected: email already registered");
            return Err(AuthError::AccountAlreadyExists);
        }

        let password_hash = self.hasher.hash_async(&credentials.password).await?;

        let name = match name.trim() {
            "" => credentials
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string(),
            trimmed => trimmed.to_string(),
        };

        let account = self
            .accounts
            .insert_account(CreateAccount {
                name,
                email: credentials.email,
                password_hash,
            })
            .await
            .map_err(|e| {
                if e.is_unique_violation_on(ACCOUNTS_EMAIL_KEY) {
                    AuthError::AccountAlreadyExists
                } else {
                    AuthError::Store(e)
                }
            })?;

        info!(account_id = %account.id, "Account registered");

        self.resolve_session(account.id).await
    }

    /// Authenticates an account and returns its live session
    ///
    /// A still-valid session is returned unchanged (same token); an expired
    /// one is refreshed in place; a missing one is created.
    ///
    /// # Errors
    ///
    /// - `Required` / `Invalid` / `PasswordTooLong` for bad input
    /// - `AccountNotFound` for an unknown email
    /// - `PasswordMismatch` for a wrong password
    /// - `SessionConflict` if a concurrent login won the session write
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let credentials = Credentials::parse(email, password)?;

        let account = match self.accounts.find_account_by_email(&credentials.email).await? {
            Some(account) => account,
            None => {
                self.hasher
                    .verify_async(&self.dummy_hash, &credentials.password)
                    .await;
                debug!("Login rejected: unknown email");
                return Err(AuthError::AccountNotFound);
            }
        };

        if !self
            .hasher
            .verify_async(&account.password_hash, &credentials.password)
            .await
        {
            info!(account_id = %account.id, "Login rejected: password mismatch");
            return Err(AuthError::PasswordMismatch);
        }

        let session = self.resolve_session(account.id).await?;
        info!(account_id = %account.id, session_id = %session.id, "Login succeeded");

        Ok(session)
    }

    /// Revokes the session holding `token`
    ///
    /// The delete is keyed by session id and token in one statement, so a
    /// failed delete leaves the session exactly as it was.
    ///
    /// # Errors
    ///
    /// - `InvalidToken` if `token` is not a well-formed session token
    /// - `SessionNotFound` if no session holds it (or it was revoked meanwhile)
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let token = parse_token(token).ok_or(AuthError::InvalidToken)?;

        let session = self
            .sessions
            .find_session_by_token(token)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if !self.sessions.delete_session(session.id, token).await? {
            debug!(session_id = %session.id, "Logout lost a race with another revoke or refresh");
            return Err(AuthError::SessionNotFound);
        }

        info!(
            account_id = %session.account_id,
            session_id = %session.id,
            "Session revoked"
        );

        Ok(())
    }

    fn issue(&self, account_id: Uuid) -> Result<NewSession, AuthError> {
        NewSession::issue(account_id, self.config.validity).ok_or(AuthError::ValidityOutOfRange)
    }

    /// Returns the account's live session, creating or refreshing as needed
    async fn resolve_session(&self, account_id: Uuid) -> Result<Session, AuthError> {
        let existing = self.sessions.find_session_by_account(account_id).await?;

        match existing {
            None => self.create_session(account_id).await,
            Some(session) if session.is_expired() => {
                let fresh = self.issue(account_id)?;

                let refreshed = self
                    .sessions
                    .refresh_session(session.id, session.token, fresh.token, fresh.expires_at)
                    .await?;

                match refreshed {
                    Some(refreshed) => {
                        debug!(
                            %account_id,
                            session_id = %refreshed.id,
                            "Expired session refreshed"
                        );
                        Ok(refreshed)
                    }
                    None => self.after_lost_refresh(account_id, session.id).await,
                }
            }
            Some(session) => Ok(session),
        }
    }

    async fn create_session(&self, account_id: Uuid) -> Result<Session, AuthError> {
        let session = self
            .sessions
            .insert_session(self.issue(account_id)?)
            .await
            .map_err(|e| {
                if e.is_unique_violation_on(SESSIONS_ACCOUNT_ID_KEY) {
                    warn!(%account_id, "Concurrent session creation, this writer lost");
                    AuthError::SessionConflict
                } else {
                    AuthError::Store(e)
                }
            })?;

        debug!(%account_id, session_id = %session.id, "Session created");
        Ok(session)
    }

    /// The refresh compare-and-swap matched nothing: either another refresh
    /// won, or a logout removed the row
    async fn after_lost_refresh(
        &self,
        account_id: Uuid,
        session_id: Uuid,
    ) -> Result<Session, AuthError> {
        if self.sessions.find_session_by_account(account_id).await?.is_some() {
            warn!(%account_id, %session_id, "Concurrent session refresh, this writer lost");
            return Err(AuthError::SessionConflict);
        }

        debug!(%account_id, %session_id, "Session revoked during refresh, creating a new one");
        self.create_session(account_id).await
    }
}
