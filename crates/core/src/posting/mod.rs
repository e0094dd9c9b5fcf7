//! Posting orchestrators.
//!
//! Each orchestrator turns a source document or payment into one balanced
//! ledger transaction. Every call runs in a single unit of work covering the
//! document status change, the ledger write, account updates and audit
//! records: it commits whole or not at all. Failures are logged with the
//! document, amount and accounts involved and handed back to the caller.
//!
//! # Modules
//!
//! - `write_off` - Write-off editing and posting
//! - `stock_take` - Stock take approval
//! - `customer_credit` - Customer payments and credit application
//! - `settlement` - Sales, purchase and return settlement
//! - `error` - Posting error types

pub mod customer_credit;
pub mod error;
pub mod settlement;
pub mod stock_take;
pub mod write_off;

pub use customer_credit::{CustomerCreditOutcome, CustomerCreditRequest, CustomerCreditService};
pub use error::PostingError;
pub use settlement::{SettleRequest, SettlementOutcome, SettlementService};
pub use stock_take::{StockTakeOutcome, StockTakeService};
pub use write_off::{WriteOffOutcome, WriteOffService};

use kasir_shared::types::{AccountId, CompanyId};

use crate::account::Account;
use crate::store::StoreTx;

/// Loads a bank or cash account of `company` to pay from or into.
async fn payment_account<T: StoreTx>(
    tx: &mut T,
    id: AccountId,
    company: CompanyId,
) -> Result<Account, PostingError> {
    let account = tx
        .get_account(id)
        .await?
        .ok_or(PostingError::InvalidPaymentAccount(id))?;
    if !account.kind().is_payment_kind() || account.company != company {
        return Err(PostingError::InvalidPaymentAccount(id));
    }
    Ok(account)
}
