//! Account registry.
//!
//! Accounts are one record type with a tagged [`AccountDetails`] variant per
//! subtype (bank, cash, customer, supplier, ...). Owner-linked subtypes carry
//! an `is_primary` flag, and at most one account per owner may hold it.
//!
//! # Modules
//!
//! - `types` - Account kinds, owners, details, and request types
//! - `primary` - The single primary-per-owner routine
//! - `service` - Unit-of-work operations and the [`AccountRegistry`] facade
//! - `error` - Account error types

pub mod error;
pub mod primary;
pub mod service;
pub mod types;

#[cfg(test)]
mod primary_props;

pub use error::AccountError;
pub use primary::{PrimaryPlan, plan_primary, primary_count, promotion_candidate};
pub use service::{AccountRegistry, AccountService};
pub use types::{
    Account, AccountDetails, AccountFilter, AccountKind, AccountOwner, AccountUpdate, NewAccount,
    PrimaryRule,
};
