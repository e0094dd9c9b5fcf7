//! Document error types.

use rust_decimal::Decimal;
use thiserror::Error;

use kasir_shared::types::{DocumentId, StockTakeId, StockTakeLineId, StockWriteOffId, StockWriteOffItemId};

/// Errors raised by document rules.
#[derive(Debug, Error)]
pub enum DocumentError {
    // ========== Write-offs ==========
    /// Items of a posted write-off cannot change.
    #[error("Cannot modify items of a POSTED write-off ({0})")]
    WriteOffPosted(StockWriteOffId),

    /// Only DRAFT write-offs can be posted.
    #[error("Write-off {0} is not a DRAFT")]
    WriteOffNotDraft(StockWriteOffId),

    /// A write-off needs at least one item to post.
    #[error("Write-off {0} has no items")]
    EmptyWriteOff(StockWriteOffId),

    /// Write-off item not found.
    #[error("Write-off item not found: {0}")]
    WriteOffItemNotFound(StockWriteOffItemId),

    // ========== Stock takes ==========
    /// Only DRAFT stock takes can change or be approved.
    #[error("Stock take {0} is already APPROVED")]
    StockTakeApproved(StockTakeId),

    /// A stock take needs at least one line.
    #[error("Stock take {0} has no lines")]
    EmptyStockTake(StockTakeId),

    /// Stock take line not found.
    #[error("Stock take line not found: {0}")]
    StockTakeLineNotFound(StockTakeLineId),

    // ========== Settlement documents ==========
    /// The document is already settled.
    #[error("Document {0} is already SETTLED")]
    DocumentSettled(DocumentId),

    /// A settlement document needs at least one line.
    #[error("Document {0} has no lines")]
    EmptyDocument(DocumentId),

    /// Document reference is empty.
    #[error("Document reference is required")]
    ReferenceRequired,

    // ========== Lines ==========
    /// Quantities must be positive.
    #[error("Quantity must be greater than zero: {0}")]
    InvalidQuantity(Decimal),

    /// Counted or expected quantities cannot be negative.
    #[error("Quantity cannot be negative: {0}")]
    NegativeQuantity(Decimal),

    /// Unit costs cannot be negative.
    #[error("Unit cost cannot be negative: {0}")]
    InvalidUnitCost(Decimal),

    /// Product name is empty.
    #[error("Product name is required")]
    ProductNameRequired,
}

impl DocumentError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::WriteOffPosted(_) => "WRITE_OFF_POSTED",
            Self::WriteOffNotDraft(_) => "WRITE_OFF_NOT_DRAFT",
            Self::EmptyWriteOff(_) => "EMPTY_WRITE_OFF",
            Self::WriteOffItemNotFound(_) => "WRITE_OFF_ITEM_NOT_FOUND",
            Self::StockTakeApproved(_) => "STOCK_TAKE_APPROVED",
            Self::EmptyStockTake(_) => "EMPTY_STOCK_TAKE",
            Self::StockTakeLineNotFound(_) => "STOCK_TAKE_LINE_NOT_FOUND",
            Self::DocumentSettled(_) => "DOCUMENT_SETTLED",
            Self::EmptyDocument(_) => "EMPTY_DOCUMENT",
            Self::ReferenceRequired => "REFERENCE_REQUIRED",
            Self::InvalidQuantity(_) => "INVALID_QUANTITY",
            Self::NegativeQuantity(_) => "NEGATIVE_QUANTITY",
            Self::InvalidUnitCost(_) => "INVALID_UNIT_COST",
            Self::ProductNameRequired => "PRODUCT_NAME_REQUIRED",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::WriteOffItemNotFound(_) | Self::StockTakeLineNotFound(_) => 404,
            _ => 400,
        }
    }
}
