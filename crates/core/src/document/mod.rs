//! Source documents that posting orchestrators turn into ledger entries.
//!
//! # Modules
//!
//! - `write_off` - Stock write-offs (DRAFT → POSTED)
//! - `stock_take` - Stock counts (DRAFT → APPROVED)
//! - `settlement` - Sales, purchases and returns (OPEN → SETTLED)
//! - `error` - Document error types

pub mod error;
pub mod settlement;
pub mod stock_take;
pub mod write_off;

pub use error::DocumentError;
pub use settlement::{NewSettlementDocument, SettlementDocument, SettlementKind, SettlementStatus};
pub use stock_take::{NewStockTake, NewStockTakeLine, StockTake, StockTakeLine, StockTakeStatus};
pub use write_off::{
    NewWriteOff, NewWriteOffItem, StockWriteOff, StockWriteOffItem, WriteOffItemUpdate,
    WriteOffStatus,
};
