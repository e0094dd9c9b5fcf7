//! Account error types.

use thiserror::Error;

use kasir_shared::AppError;
use kasir_shared::types::{AccountId, StockWriteOffId};

use crate::account::types::{AccountKind, AccountOwner};
use crate::store::StoreError;

/// Errors that can occur during account registry operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Another account already is the primary account of the owner.
    #[error("{owner} already has a primary account")]
    DuplicatePrimary {
        /// The owner.
        owner: AccountOwner,
        /// The existing primary, when known.
        existing: Option<AccountId>,
    },

    /// The subtype of an existing account cannot change.
    #[error("Cannot change the kind of account {0}")]
    KindChangeNotAllowed(AccountId),

    /// The write-off owning the account is already posted.
    #[error("Cannot modify accounts of a POSTED write-off ({0})")]
    WriteOffPosted(StockWriteOffId),

    /// Write-off document not found.
    #[error("Write-off not found: {0}")]
    WriteOffNotFound(StockWriteOffId),

    /// Transactions still reference the account.
    #[error("Account {0} is referenced by transactions and cannot be deleted")]
    AccountInUse(AccountId),

    /// Account name is empty.
    #[error("Account name is required")]
    NameRequired,

    /// The kind has no shared per-branch account.
    #[error("{0} accounts cannot be created on demand")]
    NotScopeKind(AccountKind),

    /// Storage error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AccountError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::DuplicatePrimary { .. } => "DUPLICATE_PRIMARY_ACCOUNT",
            Self::KindChangeNotAllowed(_) => "ACCOUNT_KIND_CHANGE_NOT_ALLOWED",
            Self::WriteOffPosted(_) => "WRITE_OFF_POSTED",
            Self::WriteOffNotFound(_) => "WRITE_OFF_NOT_FOUND",
            Self::AccountInUse(_) => "ACCOUNT_IN_USE",
            Self::NameRequired => "ACCOUNT_NAME_REQUIRED",
            Self::NotScopeKind(_) => "NOT_SCOPE_ACCOUNT_KIND",
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::AccountNotFound(_) | Self::WriteOffNotFound(_) => 404,
            Self::AccountInUse(_) => 409,
            Self::DuplicatePrimary { .. }
            | Self::KindChangeNotAllowed(_)
            | Self::WriteOffPosted(_)
            | Self::NameRequired
            | Self::NotScopeKind(_) => 400,
            Self::Store(e) => e.status_code(),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        AppError::from_status(err.status_code(), err.to_string())
    }
}
