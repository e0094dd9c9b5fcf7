//! Application-wide error taxonomy.
//!
//! Domain errors from the core crate collapse into one of these variants
//! before they reach a caller, so every failure surfaces as a validation
//! rejection, a not-found condition, a conflict, or an internal failure.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Input or state rejected before any write.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Concurrent write collided with another (unique constraint, lock).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage failure or broken invariant.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Builds an `AppError` from an HTTP-style status code and a message.
    ///
    /// Domain errors carry their own status codes; this keeps the mapping
    /// from those codes to the caller-visible taxonomy in one place.
    #[must_use]
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 | 422 => Self::Validation(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::Validation("x".into()), 400, "VALIDATION_ERROR")]
    #[case(AppError::NotFound("x".into()), 404, "NOT_FOUND")]
    #[case(AppError::Conflict("x".into()), 409, "CONFLICT")]
    #[case(AppError::Internal("x".into()), 500, "INTERNAL_ERROR")]
    fn test_status_and_code(#[case] err: AppError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[rstest]
    #[case(400, "VALIDATION_ERROR")]
    #[case(422, "VALIDATION_ERROR")]
    #[case(404, "NOT_FOUND")]
    #[case(409, "CONFLICT")]
    #[case(500, "INTERNAL_ERROR")]
    #[case(503, "INTERNAL_ERROR")]
    fn test_from_status_collapses_codes(#[case] status: u16, #[case] code: &str) {
        assert_eq!(AppError::from_status(status, "x".into()).error_code(), code);
    }

    #[test]
    fn test_message_is_kept() {
        let err = AppError::from_status(409, "Transaction number already used".into());
        assert_eq!(err.to_string(), "Conflict: Transaction number already used");
    }
}
