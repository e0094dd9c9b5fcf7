//! Storage port for the posting core.
//!
//! A [`LedgerStore`] hands out [`StoreTx`] units of work. Everything a posting
//! touches (document status, ledger rows, account balances, audit records)
//! goes through one `StoreTx` and becomes visible only on
//! [`StoreTx::commit`]. Dropping a `StoreTx` without committing rolls it back.
//!
//! # Modules
//!
//! - `error` - Storage error type shared by all adapters
//! - `memory` - Serialisable in-memory adapter

pub mod error;
pub mod memory;

use async_trait::async_trait;
use tracing::warn;

use kasir_shared::types::{
    AccountId, BranchId, CompanyId, DocumentId, StockTakeId, StockWriteOffId, TransactionId,
    TransactionItemId,
};

use crate::account::{Account, AccountFilter, AccountKind, AccountOwner};
use crate::audit::AuditRecord;
use crate::document::{SettlementDocument, StockTake, StockWriteOff};
use crate::ledger::{Transaction, TransactionFilter, TransactionItem};

pub use error::StoreError;
pub use memory::InMemoryStore;

/// Name of the unique constraint on `transactions.transaction_number`.
pub const TRANSACTION_NUMBER_CONSTRAINT: &str = "uq_transactions_number";

/// Name of the partial unique index allowing one primary account per owner.
pub const PRIMARY_ACCOUNT_CONSTRAINT: &str = "uq_accounts_primary_owner";

/// Source of units of work.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// The unit-of-work type.
    type Tx: StoreTx;

    /// Opens a unit of work (one database transaction).
    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// One unit of work against the ledger tables.
///
/// Reads return `Ok(None)` for missing rows; updates of missing rows fail with
/// [`StoreError::RowNotFound`]. Listing methods return rows in creation order
/// unless stated otherwise.
#[async_trait]
pub trait StoreTx: Send {
    // ========== Locking ==========

    /// Takes a lock held until the unit of work ends, keyed by `key`.
    async fn lock_key(&mut self, key: &str) -> Result<(), StoreError>;

    /// Locks and returns every account belonging to `owner`.
    async fn lock_owner_accounts(
        &mut self,
        owner: AccountOwner,
    ) -> Result<Vec<Account>, StoreError>;

    // ========== Accounts ==========

    /// Fetches an account.
    async fn get_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Fetches the oldest ownerless account of `kind` in a company branch.
    ///
    /// Write-off accounts linked to a write-off document are not scope accounts.
    async fn find_scope_account(
        &mut self,
        company: CompanyId,
        branch: BranchId,
        kind: AccountKind,
    ) -> Result<Option<Account>, StoreError>;

    /// Lists the write-off accounts linked to a write-off document.
    async fn find_write_off_accounts(
        &mut self,
        write_off: StockWriteOffId,
    ) -> Result<Vec<Account>, StoreError>;

    /// Lists accounts matching a filter.
    async fn list_accounts(&mut self, filter: &AccountFilter) -> Result<Vec<Account>, StoreError>;

    /// Inserts an account.
    async fn insert_account(&mut self, account: &Account) -> Result<(), StoreError>;

    /// Updates an account.
    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError>;

    /// Deletes an account.
    async fn delete_account(&mut self, id: AccountId) -> Result<(), StoreError>;

    /// Returns true if any transaction debits or credits the account.
    async fn account_has_transactions(&mut self, id: AccountId) -> Result<bool, StoreError>;

    // ========== Transactions ==========

    /// Fetches a transaction.
    async fn get_transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, StoreError>;

    /// Returns true if a transaction already uses `number`.
    async fn transaction_number_exists(&mut self, number: &str) -> Result<bool, StoreError>;

    /// Lists transactions matching a filter, ordered by transaction date.
    async fn find_transactions(
        &mut self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// Inserts a transaction.
    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError>;

    /// Updates a transaction. The stored transaction number is never rewritten.
    async fn update_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError>;

    // ========== Transaction items ==========

    /// Lists the items of a transaction.
    async fn list_items(
        &mut self,
        transaction: TransactionId,
    ) -> Result<Vec<TransactionItem>, StoreError>;

    /// Fetches an item.
    async fn get_item(
        &mut self,
        id: TransactionItemId,
    ) -> Result<Option<TransactionItem>, StoreError>;

    /// Inserts an item.
    async fn insert_item(&mut self, item: &TransactionItem) -> Result<(), StoreError>;

    /// Updates an item.
    async fn update_item(&mut self, item: &TransactionItem) -> Result<(), StoreError>;

    /// Deletes an item.
    async fn delete_item(&mut self, id: TransactionItemId) -> Result<(), StoreError>;

    // ========== Documents ==========

    /// Fetches a write-off with its items.
    async fn get_write_off(
        &mut self,
        id: StockWriteOffId,
    ) -> Result<Option<StockWriteOff>, StoreError>;

    /// Inserts a write-off with its items.
    async fn insert_write_off(&mut self, write_off: &StockWriteOff) -> Result<(), StoreError>;

    /// Updates a write-off, replacing its items.
    async fn update_write_off(&mut self, write_off: &StockWriteOff) -> Result<(), StoreError>;

    /// Fetches a stock take with its lines.
    async fn get_stock_take(&mut self, id: StockTakeId) -> Result<Option<StockTake>, StoreError>;

    /// Inserts a stock take with its lines.
    async fn insert_stock_take(&mut self, stock_take: &StockTake) -> Result<(), StoreError>;

    /// Updates a stock take, replacing its lines.
    async fn update_stock_take(&mut self, stock_take: &StockTake) -> Result<(), StoreError>;

    /// Fetches a settlement document.
    async fn get_settlement_document(
        &mut self,
        id: DocumentId,
    ) -> Result<Option<SettlementDocument>, StoreError>;

    /// Inserts a settlement document.
    async fn insert_settlement_document(
        &mut self,
        document: &SettlementDocument,
    ) -> Result<(), StoreError>;

    /// Updates a settlement document.
    async fn update_settlement_document(
        &mut self,
        document: &SettlementDocument,
    ) -> Result<(), StoreError>;

    // ========== Audit ==========

    /// Appends an audit record.
    async fn record_audit(&mut self, record: &AuditRecord) -> Result<(), StoreError>;

    // ========== Completion ==========

    /// Commits the unit of work.
    async fn commit(self) -> Result<(), StoreError>;

    /// Rolls the unit of work back.
    async fn rollback(self) -> Result<(), StoreError>;
}

/// Ends a unit of work according to `result`.
///
/// `Ok` commits; `Err` rolls back and hands the original error back. A failed
/// rollback is logged and otherwise ignored, since the database discards the
/// transaction anyway once the connection drops it.
pub async fn finish<T, V, E>(tx: T, result: Result<V, E>) -> Result<V, E>
where
    T: StoreTx,
    E: From<StoreError>,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
