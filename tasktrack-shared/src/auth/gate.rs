/// Ownership gate: turns a presented session token into an [`AuthContext`]
///
/// Every task operation requires an `AuthContext`, and the only way to get one
/// is through [`OwnershipGate::resolve`]. Account identity therefore always
/// comes from a stored session, never from request input.
///
/// # Expiry
///
/// With [`GateConfig::enforce_expiry`] on (the default) a session at or past
/// its `expires_at` is rejected. Turning it off accepts any stored session
/// until logout; login still refreshes expired sessions either way.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tasktrack_shared::auth::gate::{GateConfig, GateError, OwnershipGate, UnauthenticatedReason};
/// use tasktrack_shared::store::memory::MemoryStore;
///
/// # async fn example() {
/// let gate = OwnershipGate::new(Arc::new(MemoryStore::new()), GateConfig::default());
///
/// match gate.resolve(None).await {
///     Err(GateError::Unauthenticated(UnauthenticatedReason::MissingToken)) => {}
///     other => panic!("unexpected: {:?}", other),
/// }
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::models::session::parse_token;
use crate::store::{SessionStore, StoreError};

/// Verified identity of the caller
///
/// Fields are private and there is no public constructor: a value of this type
/// proves the gate accepted a session for `account_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    account_id: Uuid,
    session_id: Uuid,
}

impl AuthContext {
    pub(crate) fn new(account_id: Uuid, session_id: Uuid) -> Self {
        Self {
            account_id,
            session_id,
        }
    }

    /// Account that owns the accepted session
    pub fn account_id(&self) -> Uuid {
        self.account_id
    }

    /// Accepted session
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }
}

/// Why a token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnauthenticatedReason {
    /// No token was presented
    MissingToken,

    /// Token is not a well-formed session token
    MalformedToken,

    /// No session holds the token
    UnknownSession,

    /// Session exists but has expired
    Expired,
}

impl fmt::Display for UnauthenticatedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            UnauthenticatedReason::MissingToken => "missing session token",
            UnauthenticatedReason::MalformedToken => "malformed session token",
            UnauthenticatedReason::UnknownSession => "unknown session",
            UnauthenticatedReason::Expired => "session expired",
        };
        f.write_str(message)
    }
}

/// Error type for the ownership gate
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(UnauthenticatedReason),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GateError {
    /// Classification for the transport layer
    pub fn kind(&self) -> ErrorKind {
        match self {
            GateError::Unauthenticated(_) => ErrorKind::Authentication,
            GateError::Store(e) => e.kind(),
        }
    }
}

/// Gate configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Reject sessions past their expiry
    pub enforce_expiry: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enforce_expiry: true,
        }
    }
}

/// Resolves session tokens to account identity
pub struct OwnershipGate {
    sessions: Arc<dyn SessionStore>,
    config: GateConfig,
}

impl OwnershipGate {
    pub fn new(sessions: Arc<dyn SessionStore>, config: GateConfig) -> Self {
        Self { sessions, config }
    }

    /// Resolves a presented token
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` with the reason the token was rejected
    /// - `Store` if the session lookup failed
    pub async fn resolve(&self, token: Option<&str>) -> Result<AuthContext, GateError> {
        let raw = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(GateError::Unauthenticated(UnauthenticatedReason::MissingToken))?;

        let token = parse_token(raw)
            .ok_or(GateError::Unauthenticated(UnauthenticatedReason::MalformedToken))?;

        let session = self
            .sessions
            .find_session_by_token(token)
            .await?
            .ok_or(GateError::Unauthenticated(UnauthenticatedReason::UnknownSession))?;

        if self.config.enforce_expiry && session.is_expired() {
            debug!(session_id = %session.id, "Rejected expired session");
            return Err(GateError::Unauthenticated(UnauthenticatedReason::Expired));
        }

        Ok(AuthContext::new(session.account_id, session.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::NewSession;
    use crate::store::memory::MemoryStore;
    use chrono::{Duration, Utc};

    async fn store_with_session(validity: Duration) -> (Arc<MemoryStore>, Uuid, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let account_id = Uuid::new_v4();
        let session = store
            .insert_session(NewSession::issue(account_id, validity).unwrap())
            .await
            .unwrap();
        (store, account_id, session.token)
    }

    fn reason(result: Result<AuthContext, GateError>) -> UnauthenticatedReason {
        match result {
            Err(GateError::Unauthenticated(reason)) => reason,
            other => panic!("expected Unauthenticated, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolve_valid_token() {
        let (store, account_id, token) = store_with_session(Duration::minutes(15)).await;
        let gate = OwnershipGate::new(store, GateConfig::default());

        let auth = gate.resolve(Some(&token.to_string())).await.unwrap();
        assert_eq!(auth.account_id(), account_id);
    }

    #[tokio::test]
    async fn test_resolve_rejections() {
        let (store, _, _) = store_with_session(Duration::minutes(15)).await;
        let gate = OwnershipGate::new(store, GateConfig::default());

        assert_eq!(reason(gate.resolve(None).await), UnauthenticatedReason::MissingToken);
        assert_eq!(reason(gate.resolve(Some("  ")).await), UnauthenticatedReason::MissingToken);
        assert_eq!(
            reason(gate.resolve(Some("garbage")).await),
            UnauthenticatedReason::MalformedToken
        );
        assert_eq!(
            reason(gate.resolve(Some(&Uuid::new_v4().to_string())).await),
            UnauthenticatedReason::UnknownSession
        );
    }

    #[tokio::test]
    async fn test_expired_session_rejected_by_default() {
        let (store, account_id, token) = store_with_session(Duration::minutes(15)).await;
        store
            .set_session_expiry(account_id, Utc::now() - Duration::seconds(1))
            .await;
        let gate = OwnershipGate::new(store, GateConfig::default());

        let err = gate.resolve(Some(&token.to_string())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(matches!(
            err,
            GateError::Unauthenticated(UnauthenticatedReason::Expired)
        ));
    }

    #[tokio::test]
    async fn test_expired_session_accepted_when_not_enforced() {
        let (store, account_id, token) = store_with_session(Duration::minutes(15)).await;
        store
            .set_session_expiry(account_id, Utc::now() - Duration::hours(1))
            .await;
        let gate = OwnershipGate::new(
            store,
            GateConfig {
                enforce_expiry: false,
            },
        );

        let auth = gate.resolve(Some(&token.to_string())).await.unwrap();
        assert_eq!(auth.account_id(), account_id);
    }

    #[tokio::test]
    async fn test_revoked_token_unknown() {
        let (store, _, token) = store_with_session(Duration::minutes(15)).await;
        let session = store.find_session_by_token(token).await.unwrap().unwrap();
        store.delete_session(session.id, token).await.unwrap();

        let gate = OwnershipGate::new(store, GateConfig::default());
        assert_eq!(
            reason(gate.resolve(Some(&token.to_string())).await),
            UnauthenticatedReason::UnknownSession
        );
    }
}
