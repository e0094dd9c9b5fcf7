//! Transaction ledger.
//!
//! This module implements the ledger side of posting:
//! - Transaction and line item types with derived totals
//! - The status state machine
//! - Transaction numbering
//! - The ledger service recording transactions inside a unit of work
//! - Ledger settings and error types

pub mod error;
pub mod number;
pub mod service;
pub mod settings;
pub mod status;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod service_props;
#[cfg(test)]
mod status_props;

pub use error::LedgerError;
pub use number::{NumberSource, RandomNumberSource};
pub use service::{LedgerService, TransactionService};
pub use settings::LedgerSettings;
pub use status::StatusMachine;
pub use transaction::{
    CreateTransactionRequest, ItemUpdate, NewTransactionItem, Transaction, TransactionAmount,
    TransactionFilter, TransactionItem, items_total,
};
pub use types::{TransactionCategory, TransactionStatus, TransactionType};
