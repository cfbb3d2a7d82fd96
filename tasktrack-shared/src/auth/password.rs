/// Password hashing module using Argon2id
///
/// Passwords are hashed with Argon2id (winner of the Password Hashing
/// Competition) using a random 16-byte salt from the OS RNG. The output is a
/// PHC string carrying algorithm, parameters and salt, so verification never
/// needs the original configuration.
///
/// # Cost
///
/// The cost factor is tunable through [`HasherConfig`]:
///
/// - **Memory**: 64 MiB by default
/// - **Iterations**: 3 passes by default
/// - **Parallelism**: 4 lanes by default
///
/// # Input limit
///
/// Inputs longer than [`MAX_PASSWORD_BYTES`] are rejected with
/// [`PasswordError::TooLong`] instead of being hashed.
///
/// # Example
///
/// ```
/// use tasktrack_shared::auth::password::{HasherConfig, PasswordHasher};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hasher = PasswordHasher::new(HasherConfig::default())?;
///
/// let hash = hasher.hash("super_secret_password_123")?;
/// assert!(hasher.verify(&hash, "super_secret_password_123"));
/// assert!(!hasher.verify(&hash, "wrong_password"));
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Largest accepted password, in bytes
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Input exceeds [`MAX_PASSWORD_BYTES`]
    #[error("Password exceeds 72 bytes")]
    TooLong,

    /// Cost parameters were rejected by argon2
    #[error("Invalid hasher parameters: {0}")]
    InvalidParams(String),

    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),
}

impl PasswordError {
    /// Classification for the transport layer
    pub fn kind(&self) -> ErrorKind {
        match self {
            PasswordError::TooLong => ErrorKind::Validation,
            PasswordError::InvalidParams(_) | PasswordError::HashError(_) => ErrorKind::Storage,
        }
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasherConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism (lanes)
    pub parallelism: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MiB
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl HasherConfig {
    /// Smallest cost argon2 accepts; only for tests
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Salted, memory-hard password hasher
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Creates a hasher, validating the cost parameters
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::InvalidParams` if argon2 rejects the parameters
    /// (e.g. memory below 8 KiB per lane).
    pub fn new(config: HasherConfig) -> Result<Self, PasswordError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            Some(32),
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hashes a password
    ///
    /// Returns a PHC string, e.g. `$argon2id$v=19$m=65536,t=3,p=4$<salt>$<hash>`.
    /// Two calls with the same input never return the same string.
    ///
    /// # Errors
    ///
    /// - `PasswordError::TooLong` if the input exceeds [`MAX_PASSWORD_BYTES`]
    /// - `PasswordError::HashError` if argon2 fails
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::TooLong);
        }

        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    /// Verifies a password against a stored hash
    ///
    /// Comparison is constant-time. Any failure, including a malformed hash,
    /// is reported as `false`; the cause is logged, never returned.
    pub fn verify(&self, hash: &str, password: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash could not be parsed");
                return false;
            }
        };

        // Parameters come from the PHC string, not from self
        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => true,
            Err(argon2::password_hash::Error::Password) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Password verification failed");
                false
            }
        }
    }

    /// [`hash`](Self::hash) on tokio's blocking pool
    pub async fn hash_async(&self, password: &str) -> Result<String, PasswordError> {
        let hasher = self.clone();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| PasswordError::HashError(format!("Hashing task failed: {}", e)))?
    }

    /// [`verify`](Self::verify) on tokio's blocking pool
    pub async fn verify_async(&self, hash: &str, password: &str) -> bool {
        let hasher = self.clone();
        let hash = hash.to_string();
        let password = password.to_string();

        match tokio::task::spawn_blocking(move || hasher.verify(&hash, &password)).await {
            Ok(matched) => matched,
            Err(e) => {
                tracing::warn!(error = %e, "Verification task failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(HasherConfig::insecure_fast()).expect("valid params")
    }

    #[test]
    fn test_hash_password_default_params() {
        let hasher = PasswordHasher::new(HasherConfig::default()).expect("valid params");
        let hash = hasher.hash("test_password_123").expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=65536"));
        assert!(hash.contains("t=3"));
        assert!(hash.contains("p=4"));
    }

    #[test]
    fn test_hash_password_produces_different_salts() {
        let hasher = hasher();

        let hash1 = hasher.hash("same_password").expect("Hash 1 should succeed");
        let hash2 = hasher.hash("same_password").expect("Hash 2 should succeed");

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password_correct_and_incorrect() {
        let hasher = hasher();
        let hash = hasher.hash("correct_password").expect("Hash should succeed");

        assert!(hasher.verify(&hash, "correct_password"));
        assert!(!hasher.verify(&hash, "wrong_password"));
        assert!(!hasher.verify(&hash, ""));
    }

    #[test]
    fn test_verify_malformed_hash_is_no_match() {
        let hasher = hasher();

        assert!(!hasher.verify("invalid_hash", "password"));
        assert!(!hasher.verify("$argon2id$invalid", "password"));
        assert!(!hasher.verify("", "password"));
    }

    #[test]
    fn test_hash_rejects_oversized_password() {
        let hasher = hasher();

        let at_limit = "a".repeat(MAX_PASSWORD_BYTES);
        assert!(hasher.hash(&at_limit).is_ok());

        let too_long = "a".repeat(MAX_PASSWORD_BYTES + 1);
        let err = hasher.hash(&too_long).unwrap_err();
        assert!(matches!(err, PasswordError::TooLong));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_limit_counts_bytes_not_chars() {
        // 25 three-byte characters = 75 bytes
        let password = "密".repeat(25);
        assert!(matches!(hasher().hash(&password), Err(PasswordError::TooLong)));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = PasswordHasher::new(HasherConfig {
            memory_kib: 1,
            iterations: 1,
            parallelism: 1,
        });
        assert!(matches!(result, Err(PasswordError::InvalidParams(_))));
    }

    #[test]
    fn test_hash_verify_roundtrip() {
        let hasher = hasher();
        let passwords = [
            "simple",
            "with spaces",
            "with-special-chars!@#$%",
            "unicode-密码-パスワード",
            "very_long_password_that_is_longer_than_usual_passwords_123456789",
        ];

        for password in passwords {
            let hash = hasher.hash(password).expect("Hash should succeed");
            assert!(hasher.verify(&hash, password), "Password '{}' should verify", password);
        }
    }

    #[tokio::test]
    async fn test_async_wrappers() {
        let hasher = hasher();
        let hash = hasher
            .hash_async("longpass1")
            .await
            .expect("Hash should succeed");

        assert!(hasher.verify_async(&hash, "longpass1").await);
        assert!(!hasher.verify_async(&hash, "longpass2").await);
    }
}
