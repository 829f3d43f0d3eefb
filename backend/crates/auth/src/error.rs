//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Client-facing message for every infrastructure failure
const INTERNAL_MESSAGE: &str = "Internal server error";

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user or wrong password (never distinguished)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Credentials are valid but the account is not confirmed yet
    #[error("Account is pending activation")]
    PendingActivation,

    /// Token absent, malformed or not verifiable
    #[error("Invalid token")]
    TokenInvalid,

    /// Token past its expiry
    #[error("Token expired")]
    TokenExpired,

    /// Refresh token was revoked
    #[error("Token revoked")]
    TokenRevoked,

    /// Per-client limit exhausted
    #[error("Too many requests")]
    RateLimited { retry_after_secs: u64 },

    /// Missing credentials or insufficient role
    #[error("Unauthorized")]
    Unauthorized,

    /// Refresh token not found
    #[error("Refresh token not found")]
    NotFound,

    /// Request body could not be parsed
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// New password rejected
    #[error("{0}")]
    PasswordPolicy(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store did not answer before the deadline
    #[error("Store operation timed out")]
    StoreTimeout,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials
            | AuthError::PendingActivation
            | AuthError::TokenInvalid
            | AuthError::TokenExpired
            | AuthError::TokenRevoked
            | AuthError::Unauthorized => ErrorKind::Unauthorized,
            AuthError::RateLimited { .. } => ErrorKind::TooManyRequests,
            AuthError::NotFound => ErrorKind::NotFound,
            AuthError::MalformedRequest(_) | AuthError::PasswordPolicy(_) => {
                ErrorKind::BadRequest
            }
            AuthError::Database(_) | AuthError::StoreTimeout | AuthError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Whether the error is an infrastructure failure
    pub fn is_internal(&self) -> bool {
        self.kind().is_server_error()
    }

    /// Convert to AppError
    ///
    /// Infrastructure failures are replaced by a generic message; the cause
    /// stays in the server log.
    pub fn to_app_error(&self) -> AppError {
        match self {
            AuthError::RateLimited { retry_after_secs } => {
                AppError::too_many_requests(self.to_string()).with_retry_after(*retry_after_secs)
            }
            _ if self.is_internal() => AppError::internal(INTERNAL_MESSAGE),
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::StoreTimeout => {
                tracing::error!("Auth store deadline exceeded");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::RateLimited { retry_after_secs } => {
                tracing::warn!(retry_after_secs, "Refresh rate limit exceeded");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        AuthError::Internal(format!("blocking task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuthError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::PendingActivation.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::TokenRevoked.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AuthError::RateLimited { retry_after_secs: 3 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AuthError::MalformedRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::StoreTimeout.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_errors_are_sanitized() {
        let err = AuthError::Internal("connection to 10.0.0.5 refused".into());
        let app = err.to_app_error();
        assert_eq!(app.status_code(), 500);
        assert_eq!(app.message(), "Internal server error");
    }

    #[test]
    fn test_rate_limited_carries_retry_after() {
        let app = AuthError::RateLimited { retry_after_secs: 6 }.to_app_error();
        assert_eq!(app.retry_after(), Some(6));
        assert_eq!(app.status_code(), 429);
    }
}
