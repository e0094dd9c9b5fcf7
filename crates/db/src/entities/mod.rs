//! `SeaORM` entity definitions for the ledger tables.
//!
//! Enumerations are stored as text in their SCREAMING_SNAKE form and parsed
//! back through the domain types.

pub mod accounts;
pub mod audit_log;
pub mod settlement_documents;
pub mod stock_take_lines;
pub mod stock_takes;
pub mod stock_write_off_items;
pub mod stock_write_offs;
pub mod transaction_items;
pub mod transactions;
