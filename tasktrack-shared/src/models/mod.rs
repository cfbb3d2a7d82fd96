/// Database models for tasktrack
///
/// Each model carries its row type, its creation input, and the PostgreSQL
/// queries for that table. The storage traits in [`crate::store`] sit on top
/// of these; domain code never calls them directly.
///
/// # Models
///
/// - `account`: registered accounts (unique email, password hash)
/// - `session`: one opaque-token session per account
/// - `task`: owner-scoped tasks with namespaced ids
///
/// # Example
///
/// ```no_run
/// use tasktrack_shared::models::account::{Account, CreateAccount};
/// use tasktrack_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let account = Account::create(&pool, CreateAccount {
///     name: "Alice".to_string(),
///     email: "alice@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod account;
pub mod session;
pub mod task;
