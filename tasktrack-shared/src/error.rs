/// Error classification shared by every component
///
/// Each component keeps its own `thiserror` enum with precise variants. Callers
/// that only need to decide how to react (reject input, answer "not found",
/// ask the user to sign in, report a server fault) use [`ErrorKind`] instead of
/// matching on every variant or, worse, on formatted messages.
///
/// # Example
///
/// ```
/// use tasktrack_shared::error::ErrorKind;
/// use tasktrack_shared::tasks::TaskError;
///
/// let err = TaskError::NotFound;
/// assert_eq!(err.kind(), ErrorKind::NotFound);
/// ```

use serde::{Deserialize, Serialize};

/// Coarse error class used by the transport layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input: id shape, empty title, weak password, bad email
    Validation,

    /// No matching account, session or task (cross-account access included)
    NotFound,

    /// Duplicate email on registration
    Conflict,

    /// Missing/invalid/unknown token, or a password mismatch
    Authentication,

    /// Persistence failure, surfaced verbatim and never retried here
    Storage,
}

impl ErrorKind {
    /// Returns the snake_case name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Storage => "storage",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
