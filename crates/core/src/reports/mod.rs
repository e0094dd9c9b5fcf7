//! Account-scoped reporting helpers.
//!
//! Read-only aggregations over the ledger:
//! - Total written off
//! - Customer outstanding balance
//! - Customer statement
//! - Account activity

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod statement_props;

pub use error::ReportError;
pub use service::ReportService;
pub use types::*;
