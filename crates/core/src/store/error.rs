//! Storage error type.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by storage adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation {
        /// Name of the violated constraint or index.
        constraint: String,
    },

    /// An update or delete targeted a row that does not exist.
    #[error("Row not found in {table}: {id}")]
    RowNotFound {
        /// Table name.
        table: &'static str,
        /// Row identifier.
        id: Uuid,
    },

    /// A snapshot could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored row could not be mapped back into a domain value.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Returns true if this is a violation of the named constraint.
    #[must_use]
    pub fn violates(&self, name: &str) -> bool {
        matches!(self, Self::UniqueViolation { constraint } if constraint == name)
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UniqueViolation { .. } => "UNIQUE_VIOLATION",
            Self::RowNotFound { .. } => "ROW_NOT_FOUND",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Corrupt(_) => "CORRUPT_ROW",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UniqueViolation { .. } => 409,
            Self::RowNotFound { .. } => 404,
            Self::Serialization(_) | Self::Corrupt(_) | Self::Database(_) => 500,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violates_matches_constraint_name() {
        let err = StoreError::UniqueViolation {
            constraint: "uq_transactions_number".to_string(),
        };
        assert!(err.violates("uq_transactions_number"));
        assert!(!err.violates("uq_accounts_primary_owner"));
        assert!(!StoreError::Database("x".into()).violates("uq_transactions_number"));
    }

    #[test]
    fn test_status_codes() {
        let unique = StoreError::UniqueViolation {
            constraint: String::new(),
        };
        assert_eq!(unique.status_code(), 409);
        assert_eq!(
            StoreError::RowNotFound {
                table: "accounts",
                id: Uuid::nil()
            }
            .status_code(),
            404
        );
        assert_eq!(StoreError::Database(String::new()).status_code(), 500);
    }
}
