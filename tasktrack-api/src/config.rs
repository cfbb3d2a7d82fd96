/// Configuration management for the API server
///
/// Configuration comes from environment variables (and a `.env` file in
/// development), parsed into typed structs once at startup.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: *)
/// - `DATABASE_URL`: PostgreSQL connection string (optional, in-memory store if unset)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `SESSION_TTL_SECONDS`: Session validity window, at most one year (default: 900)
/// - `SESSION_COOKIE_SECURE`: Mark the session cookie `Secure` and send HSTS (default: false)
/// - `GATE_ENFORCE_EXPIRY`: Reject expired sessions on every request (default: true)
/// - `ARGON2_MEMORY_KIB`, `ARGON2_ITERATIONS`, `ARGON2_PARALLELISM`: Hashing cost
/// - `RUST_LOG`: Log filter (default: tasktrack_api=debug,tower_http=debug)
///
/// # Example
///
/// ```no_run
/// use tasktrack_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::{env, fmt::Display, str::FromStr};
use tasktrack_shared::auth::password::HasherConfig;
use tasktrack_shared::auth::session::{DEFAULT_SESSION_VALIDITY_SECS, MAX_SESSION_VALIDITY_SECS};

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration; `None` selects the in-memory store
    pub database: Option<DatabaseConfig>,

    /// Session and gate configuration
    pub session: SessionSettings,

    /// Password hashing cost
    pub hasher: HasherConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins (`*` = any)
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // URL may carry a password
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Session configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Validity window of new and refreshed sessions, in seconds
    pub ttl_seconds: i64,

    /// Set the `Secure` attribute on the session cookie
    pub cookie_secure: bool,

    /// Reject expired sessions in the ownership gate
    pub enforce_expiry: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
            },
            database: None,
            session: SessionSettings {
                ttl_seconds: DEFAULT_SESSION_VALIDITY_SECS,
                cookie_secure: false,
                enforce_expiry: true,
            },
            hasher: HasherConfig::default(),
        }
    }
}

/// Parses `key` with `lookup`, falling back to `default` when unset
fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value: {}", key, e)),
        None => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value of the wrong type or
    /// out of range.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let host = lookup("API_HOST").unwrap_or(defaults.api.host);
        let port = parse_var(&lookup, "API_PORT", defaults.api.port)?;

        let cors_origins = match lookup("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            None => defaults.api.cors_origins,
        };

        let database = match lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            }),
            None => None,
        };

        let ttl_seconds = parse_var(&lookup, "SESSION_TTL_SECONDS", defaults.session.ttl_seconds)?;
        if !(1..=MAX_SESSION_VALIDITY_SECS).contains(&ttl_seconds) {
            anyhow::bail!(
                "SESSION_TTL_SECONDS must be between 1 and {}",
                MAX_SESSION_VALIDITY_SECS
            );
        }

        let session = SessionSettings {
            ttl_seconds,
            cookie_secure: parse_var(
                &lookup,
                "SESSION_COOKIE_SECURE",
                defaults.session.cookie_secure,
            )?,
            enforce_expiry: parse_var(
                &lookup,
                "GATE_ENFORCE_EXPIRY",
                defaults.session.enforce_expiry,
            )?,
        };

        let hasher = HasherConfig {
            memory_kib: parse_var(&lookup, "ARGON2_MEMORY_KIB", defaults.hasher.memory_kib)?,
            iterations: parse_var(&lookup, "ARGON2_ITERATIONS", defaults.hasher.iterations)?,
            parallelism: parse_var(&lookup, "ARGON2_PARALLELISM", defaults.hasher.parallelism)?,
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
            },
            database,
            session,
            hasher,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Session validity as a chrono duration
    ///
    /// Values too large for a duration saturate; the session manager rejects
    /// anything above a year.
    pub fn session_validity(&self) -> chrono::Duration {
        chrono::Duration::try_seconds(self.session.ttl_seconds).unwrap_or(chrono::Duration::MAX)
    }
}
