//! Ledger posting core for Kasir.
//!
//! This crate contains the accounting core with ZERO web or database dependencies.
//! Persistence goes through the [`store`] port; `kasir-db` implements it for
//! PostgreSQL and [`store::memory`] implements it in memory.
//!
//! # Modules
//!
//! - `account` - Account registry and the primary-account-per-owner rule
//! - `ledger` - Transactions, line items, numbering, and the status machine
//! - `reversal` - Balance effects, reversal, and the duplicate guard
//! - `document` - Write-off, stock-take, and settlement documents
//! - `posting` - Orchestrators turning documents into ledger postings
//! - `reports` - Written-off totals, outstanding balances, statements
//! - `audit` - Audit records written alongside every mutation
//! - `store` - Unit-of-work storage port and in-memory adapter

pub mod account;
pub mod audit;
pub mod document;
pub mod ledger;
pub mod posting;
pub mod reports;
pub mod reversal;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
