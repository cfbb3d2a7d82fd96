/// Authentication: credentials, sessions and request identity
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and verification
/// - [`session`]: registration, login, logout and session refresh
/// - [`gate`]: session token to [`gate::AuthContext`] resolution
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id, salted, tunable cost, 72-byte input cap
/// - **Sessions**: one per account, opaque random tokens, fixed validity window
/// - **Ownership**: account identity only ever comes from a resolved session
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tasktrack_shared::auth::gate::{GateConfig, OwnershipGate};
/// use tasktrack_shared::auth::password::{HasherConfig, PasswordHasher};
/// use tasktrack_shared::auth::session::{SessionConfig, SessionManager};
/// use tasktrack_shared::store::memory::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(MemoryStore::new());
/// let hasher = PasswordHasher::new(HasherConfig::default())?;
/// let sessions =
///     SessionManager::new(store.clone(), store.clone(), hasher, SessionConfig::default())?;
/// let gate = OwnershipGate::new(store, GateConfig::default());
///
/// let session = sessions.register("Alice", "a@x.com", "longpass1").await?;
/// let auth = gate.resolve(Some(&session.token.to_string())).await?;
/// assert_eq!(auth.account_id(), session.account_id);
/// # Ok(())
/// # }
/// ```

pub mod gate;
pub mod password;
pub mod session;
