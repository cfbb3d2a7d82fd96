/// Error handling for the API server
///
/// Handlers return `Result<T, ApiError>`. Core errors convert into `ApiError`
/// through the `From` impls below, which is the only place HTTP status codes
/// are chosen.
///
/// | Core classification | Status |
/// |---|---|
/// | validation | 400 / 422 |
/// | not found | 404 |
/// | conflict | 409 |
/// | authentication | 401 |
/// | storage | 500 / 503 |
///
/// Unknown email and wrong password produce the same 401 body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tasktrack_shared::{
    auth::{gate::GateError, session::AuthError},
    store::StoreError,
    tasks::TaskError,
};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Message for both login failure causes
pub const BAD_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - e.g., duplicate email
    Conflict(String),

    /// Unprocessable entity (422) - field validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503) - transient, safe to retry
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error_code, message, details) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None),
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::Conflict(msg) => ("conflict", msg, None),
            ApiError::ValidationError(errors) => (
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg, None),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::InternalError(format!("Storage error: {}", err))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Required(field) => {
                ApiError::ValidationError(vec![ValidationErrorDetail::new(field, "is required")])
            }
            AuthError::Invalid { field, message } => {
                ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
            }
            AuthError::PasswordTooLong => ApiError::ValidationError(vec![
                ValidationErrorDetail::new("password", "must be at most 72 bytes"),
            ]),
            AuthError::AccountAlreadyExists => {
                ApiError::Conflict("An account with this email already exists".to_string())
            }
            AuthError::AccountNotFound | AuthError::PasswordMismatch => {
                ApiError::Unauthorized(BAD_CREDENTIALS_MESSAGE.to_string())
            }
            AuthError::InvalidToken | AuthError::SessionNotFound => {
                ApiError::Unauthorized("Invalid or expired session".to_string())
            }
            AuthError::SessionConflict => ApiError::ServiceUnavailable(
                "Session is being updated by another request, retry".to_string(),
            ),
            AuthError::ValidityOutOfRange => {
                ApiError::InternalError("Session validity is misconfigured".to_string())
            }
            AuthError::Password(e) => {
                ApiError::InternalError(format!("Password operation failed: {}", e))
            }
            AuthError::Store(e) => e.into(),
        }
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Unauthenticated(reason) => {
                ApiError::Unauthorized(format!("Authentication required: {}", reason))
            }
            GateError::Store(e) => e.into(),
        }
    }
}

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::InvalidTitle(message) => {
                ApiError::ValidationError(vec![ValidationErrorDetail::new("title", message)])
            }
            TaskError::InvalidId(e) => ApiError::BadRequest(format!("Invalid task id: {}", e)),
            TaskError::NotFound => ApiError::NotFound("Task not found".to_string()),
            TaskError::Store(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasktrack_shared::auth::gate::UnauthenticatedReason;
    use tasktrack_shared::models::task::TaskIdError;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Task not found".to_string());
        assert_eq!(err.to_string(), "Not found: Task not found");
    }

    #[test]
    fn test_login_failures_are_indistinguishable() {
        let unknown = ApiError::from(AuthError::AccountNotFound);
        let mismatch = ApiError::from(AuthError::PasswordMismatch);

        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.to_string(), mismatch.to_string());
    }

    #[test]
    fn test_auth_error_statuses() {
        let cases = [
            (AuthError::Required("email"), StatusCode::UNPROCESSABLE_ENTITY),
            (AuthError::PasswordTooLong, StatusCode::UNPROCESSABLE_ENTITY),
            (AuthError::AccountAlreadyExists, StatusCode::CONFLICT),
            (AuthError::InvalidToken, StatusCode::UNAUTHORIZED),
            (AuthError::SessionNotFound, StatusCode::UNAUTHORIZED),
            (AuthError::SessionConflict, StatusCode::SERVICE_UNAVAILABLE),
            (AuthError::ValidityOutOfRange, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_task_error_statuses() {
        assert_eq!(
            ApiError::from(TaskError::InvalidTitle("title must not be empty")).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(TaskError::InvalidId(TaskIdError::MissingPrefix)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(TaskError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_gate_error_status() {
        let err = ApiError::from(GateError::Unauthenticated(UnauthenticatedReason::Expired));
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert!(err.to_string().contains("session expired"));
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail::new("email", "must be a valid email address"),
            ValidationErrorDetail::new("password", "must be at least 8 characters"),
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
    }
}
