//! Posting error types.

use rust_decimal::Decimal;
use thiserror::Error;

use kasir_shared::AppError;
use kasir_shared::types::{AccountId, DocumentId, StockTakeId, StockWriteOffId, TransactionId};

use crate::account::AccountError;
use crate::document::DocumentError;
use crate::ledger::LedgerError;
use crate::store::StoreError;

/// Errors that can occur while posting documents and payments.
#[derive(Debug, Error)]
pub enum PostingError {
    /// Write-off not found.
    #[error("Write-off not found: {0}")]
    WriteOffNotFound(StockWriteOffId),

    /// Stock take not found.
    #[error("Stock take not found: {0}")]
    StockTakeNotFound(StockTakeId),

    /// Settlement document not found.
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// The account cannot take or make payments.
    #[error("Account {0} is not a bank or cash account of this company")]
    InvalidPaymentAccount(AccountId),

    /// An on-account settlement needs a customer or supplier.
    #[error("Document {0} has no counterparty to settle on account")]
    CounterpartyMissing(DocumentId),

    /// The transaction cannot be settled by this credit.
    #[error("Transaction {0} is not a pending credit sale of this customer")]
    InvalidSettlementTarget(TransactionId),

    /// The credit does not cover the sale.
    #[error("Credit of {available} does not cover {required}")]
    InsufficientCredit {
        /// Credit applied.
        available: Decimal,
        /// Amount outstanding.
        required: Decimal,
    },

    /// Amount must be greater than zero.
    #[error("Amount must be greater than zero: {0}")]
    NonPositiveAmount(Decimal),

    /// Document rule violated.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Ledger error.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Account registry error.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// Storage error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PostingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::WriteOffNotFound(_) => "WRITE_OFF_NOT_FOUND",
            Self::StockTakeNotFound(_) => "STOCK_TAKE_NOT_FOUND",
            Self::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
            Self::InvalidPaymentAccount(_) => "INVALID_PAYMENT_ACCOUNT",
            Self::CounterpartyMissing(_) => "COUNTERPARTY_MISSING",
            Self::InvalidSettlementTarget(_) => "INVALID_SETTLEMENT_TARGET",
            Self::InsufficientCredit { .. } => "INSUFFICIENT_CREDIT",
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::Document(e) => e.error_code(),
            Self::Ledger(e) => e.error_code(),
            Self::Account(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::WriteOffNotFound(_) | Self::StockTakeNotFound(_) | Self::DocumentNotFound(_) => {
                404
            }
            Self::Document(e) => e.status_code(),
            Self::Ledger(e) => e.status_code(),
            Self::Account(e) => e.status_code(),
            Self::Store(e) => e.status_code(),
            _ => 400,
        }
    }
}

impl From<PostingError> for AppError {
    fn from(err: PostingError) -> Self {
        AppError::from_status(err.status_code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_errors_keep_their_codes() {
        let err = PostingError::from(DocumentError::WriteOffPosted(StockWriteOffId::new()));
        assert_eq!(err.error_code(), "WRITE_OFF_POSTED");
        assert_eq!(err.status_code(), 400);

        let err = PostingError::from(LedgerError::TransactionNotFound(TransactionId::new()));
        assert!(matches!(AppError::from(err), AppError::NotFound(_)));
    }
}
