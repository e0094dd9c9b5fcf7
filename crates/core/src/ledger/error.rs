//! Ledger error types.
//!
//! Covers validation of new transactions and items, status transitions,
//! numbering, and the duplicate guard. Account and storage failures are
//! wrapped so orchestrators can propagate one error type.

use rust_decimal::Decimal;
use thiserror::Error;

use kasir_shared::AppError;
use kasir_shared::types::{AccountId, CompanyId, TransactionId, TransactionItemId};

use crate::account::AccountError;
use crate::ledger::types::TransactionStatus;
use crate::store::StoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Transaction amount cannot be negative.
    #[error("Transaction amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    /// Debit and credit account must differ.
    #[error("Debit and credit account must be different accounts ({0})")]
    SameAccount(AccountId),

    /// Account does not belong to the transaction's company.
    #[error("Account {account} does not belong to company {company}")]
    AccountCompanyMismatch {
        /// The account.
        account: AccountId,
        /// The transaction's company.
        company: CompanyId,
    },

    /// Item quantity must be positive.
    #[error("Item quantity must be greater than zero: {0}")]
    InvalidQuantity(Decimal),

    /// Item unit price cannot be negative.
    #[error("Item unit price cannot be negative: {0}")]
    InvalidUnitPrice(Decimal),

    /// Item tax rate must lie between 0 and 100.
    #[error("Item tax rate must be between 0 and 100: {0}")]
    InvalidTaxRate(Decimal),

    /// Item product name is empty.
    #[error("Item product name is required")]
    ProductNameRequired,

    /// An equivalent transaction already exists.
    #[error("Duplicate transaction: matches {number} ({existing})")]
    DuplicateTransaction {
        /// The existing transaction.
        existing: TransactionId,
        /// Its number.
        number: String,
    },

    // ========== Status Errors ==========
    /// Completed transactions never move back.
    #[error("Cannot move a COMPLETED transaction back to PENDING or DRAFT")]
    CompletedRegression,

    /// Reversing statuses are final.
    #[error("Cannot change the status of a {status} transaction")]
    StatusLocked {
        /// The current status.
        status: TransactionStatus,
    },

    /// Transition not allowed by the status machine.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: TransactionStatus,
        /// Requested status.
        to: TransactionStatus,
    },

    /// Items can only change while the transaction is DRAFT or PENDING.
    #[error("Cannot change items of a {status} transaction")]
    TransactionLocked {
        /// The current status.
        status: TransactionStatus,
    },

    // ========== Lookup Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Transaction item not found.
    #[error("Transaction item not found: {0}")]
    ItemNotFound(TransactionItemId),

    // ========== System Errors ==========
    /// No free transaction number was found.
    #[error("Could not generate a unique transaction number after {attempts} attempts")]
    NumberGenerationExhausted {
        /// Numbers tried.
        attempts: u32,
    },

    /// Ledger settings are invalid.
    #[error("Invalid ledger configuration: {0}")]
    InvalidConfiguration(String),

    /// Account registry error.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// Storage error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NegativeAmount(_) => "NEGATIVE_AMOUNT",
            Self::SameAccount(_) => "SAME_ACCOUNT",
            Self::AccountCompanyMismatch { .. } => "ACCOUNT_COMPANY_MISMATCH",
            Self::InvalidQuantity(_) => "INVALID_QUANTITY",
            Self::InvalidUnitPrice(_) => "INVALID_UNIT_PRICE",
            Self::InvalidTaxRate(_) => "INVALID_TAX_RATE",
            Self::ProductNameRequired => "PRODUCT_NAME_REQUIRED",
            Self::DuplicateTransaction { .. } => "DUPLICATE_TRANSACTION",
            Self::CompletedRegression => "COMPLETED_REGRESSION",
            Self::StatusLocked { .. } => "STATUS_LOCKED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::TransactionLocked { .. } => "TRANSACTION_LOCKED",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::ItemNotFound(_) => "ITEM_NOT_FOUND",
            Self::NumberGenerationExhausted { .. } => "NUMBER_GENERATION_EXHAUSTED",
            Self::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            Self::Account(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::AccountNotFound(_) | Self::TransactionNotFound(_) | Self::ItemNotFound(_) => 404,
            Self::NumberGenerationExhausted { .. } | Self::InvalidConfiguration(_) => 500,
            Self::Account(e) => e.status_code(),
            Self::Store(e) => e.status_code(),
            _ => 400,
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError::from_status(err.status_code(), err.to_string())
    }
}
