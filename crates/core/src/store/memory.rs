//! In-memory storage adapter.
//!
//! One async mutex guards the whole state and is held for the lifetime of a
//! unit of work, so units of work are fully serialised. Writes go to a
//! working copy that replaces the shared state on commit. The unique
//! transaction number and the one-primary-per-owner index are emulated.
//!
//! A task must not open a second unit of work while holding one; it would
//! wait on itself.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use kasir_shared::types::{
    AccountId, BranchId, CompanyId, DocumentId, StockTakeId, StockWriteOffId, TransactionId,
    TransactionItemId,
};

use crate::account::{Account, AccountFilter, AccountKind, AccountOwner};
use crate::audit::AuditRecord;
use crate::document::{SettlementDocument, StockTake, StockWriteOff};
use crate::ledger::{Transaction, TransactionFilter, TransactionItem};
use crate::store::{
    LedgerStore, PRIMARY_ACCOUNT_CONSTRAINT, StoreError, StoreTx, TRANSACTION_NUMBER_CONSTRAINT,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    accounts: BTreeMap<AccountId, Account>,
    transactions: BTreeMap<TransactionId, Transaction>,
    items: BTreeMap<TransactionItemId, TransactionItem>,
    write_offs: HashMap<StockWriteOffId, StockWriteOff>,
    stock_takes: HashMap<StockTakeId, StockTake>,
    documents: HashMap<DocumentId, SettlementDocument>,
    audit: Vec<AuditRecord>,
}

impl MemoryState {
    fn sorted_accounts<'a>(accounts: impl Iterator<Item = &'a Account>) -> Vec<Account> {
        let mut accounts: Vec<Account> = accounts.cloned().collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        accounts
    }

    fn check_primary(&self, account: &Account) -> Result<(), StoreError> {
        let Some(owner) = account.owner() else {
            return Ok(());
        };
        if !account.is_primary() {
            return Ok(());
        }
        let clash = self
            .accounts
            .values()
            .any(|other| other.id != account.id && other.owner() == Some(owner) && other.is_primary());
        if clash {
            return Err(StoreError::UniqueViolation {
                constraint: PRIMARY_ACCOUNT_CONSTRAINT.to_string(),
            });
        }
        Ok(())
    }
}

/// Storage adapter keeping everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every committed audit record in write order.
    pub async fn audit_log(&self) -> Vec<AuditRecord> {
        self.state.lock().await.audit.clone()
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTx { guard, working })
    }
}

/// Unit of work over an [`InMemoryStore`].
pub struct InMemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn lock_key(&mut self, _key: &str) -> Result<(), StoreError> {
        // The unit of work already holds the store-wide lock.
        Ok(())
    }

    async fn lock_owner_accounts(
        &mut self,
        owner: AccountOwner,
    ) -> Result<Vec<Account>, StoreError> {
        Ok(MemoryState::sorted_accounts(
            self.working
                .accounts
                .values()
                .filter(|account| account.owner() == Some(owner)),
        ))
    }

    async fn get_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.working.accounts.get(&id).cloned())
    }

    async fn find_scope_account(
        &mut self,
        company: CompanyId,
        branch: BranchId,
        kind: AccountKind,
    ) -> Result<Option<Account>, StoreError> {
        Ok(MemoryState::sorted_accounts(self.working.accounts.values().filter(|account| {
            account.company == company
                && account.branch == branch
                && account.kind() == kind
                && account.owner().is_none()
                && account.details.write_off().is_none()
        }))
        .into_iter()
        .next())
    }

    async fn find_write_off_accounts(
        &mut self,
        write_off: StockWriteOffId,
    ) -> Result<Vec<Account>, StoreError> {
        Ok(MemoryState::sorted_accounts(
            self.working
                .accounts
                .values()
                .filter(|account| account.details.write_off() == Some(write_off)),
        ))
    }

    async fn list_accounts(&mut self, filter: &AccountFilter) -> Result<Vec<Account>, StoreError> {
        Ok(MemoryState::sorted_accounts(
            self.working
                .accounts
                .values()
                .filter(|account| filter.matches(account)),
        ))
    }

    async fn insert_account(&mut self, account: &Account) -> Result<(), StoreError> {
        self.working.check_primary(account)?;
        self.working.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError> {
        if !self.working.accounts.contains_key(&account.id) {
            return Err(StoreError::RowNotFound {
                table: "accounts",
                id: account.id.into_inner(),
            });
        }
        self.working.check_primary(account)?;
        self.working.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn delete_account(&mut self, id: AccountId) -> Result<(), StoreError> {
        self.working
            .accounts
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RowNotFound {
                table: "accounts",
                id: id.into_inner(),
            })
    }

    async fn account_has_transactions(&mut self, id: AccountId) -> Result<bool, StoreError> {
        Ok(self.working.transactions.values().any(|txn| txn.touches(id)))
    }

    async fn get_transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, StoreError> {
        Ok(self.working.transactions.get(&id).cloned())
    }

    async fn transaction_number_exists(&mut self, number: &str) -> Result<bool, StoreError> {
        Ok(self
            .working
            .transactions
            .values()
            .any(|txn| txn.number == number))
    }

    async fn find_transactions(
        &mut self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StoreError> {
        let mut found: Vec<Transaction> = self
            .working
            .transactions
            .values()
            .filter(|txn| filter.matches(txn))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.transaction_date
                .cmp(&b.transaction_date)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.number.cmp(&b.number))
        });
        Ok(found)
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        let taken = self
            .working
            .transactions
            .values()
            .any(|txn| txn.number == transaction.number);
        if taken {
            return Err(StoreError::UniqueViolation {
                constraint: TRANSACTION_NUMBER_CONSTRAINT.to_string(),
            });
        }
        self.working
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn update_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        let stored = self
            .working
            .transactions
            .get_mut(&transaction.id)
            .ok_or(StoreError::RowNotFound {
                table: "transactions",
                id: transaction.id.into_inner(),
            })?;
        let number = std::mem::take(&mut stored.number);
        *stored = transaction.clone();
        stored.number = number;
        Ok(())
    }

    async fn list_items(
        &mut self,
        transaction: TransactionId,
    ) -> Result<Vec<TransactionItem>, StoreError> {
        let mut items: Vec<TransactionItem> = self
            .working
            .items
            .values()
            .filter(|item| item.transaction() == transaction)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at().cmp(&b.created_at()).then(a.id().cmp(&b.id())));
        Ok(items)
    }

    async fn get_item(
        &mut self,
        id: TransactionItemId,
    ) -> Result<Option<TransactionItem>, StoreError> {
        Ok(self.working.items.get(&id).cloned())
    }

    async fn insert_item(&mut self, item: &TransactionItem) -> Result<(), StoreError> {
        if !self.working.transactions.contains_key(&item.transaction()) {
            return Err(StoreError::RowNotFound {
                table: "transactions",
                id: item.transaction().into_inner(),
            });
        }
        self.working.items.insert(item.id(), item.clone());
        Ok(())
    }

    async fn update_item(&mut self, item: &TransactionItem) -> Result<(), StoreError> {
        match self.working.items.get_mut(&item.id()) {
            Some(stored) => {
                *stored = item.clone();
                Ok(())
            }
            None => Err(StoreError::RowNotFound {
                table: "transaction_items",
                id: item.id().into_inner(),
            }),
        }
    }

    async fn delete_item(&mut self, id: TransactionItemId) -> Result<(), StoreError> {
        self.working
            .items
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RowNotFound {
                table: "transaction_items",
                id: id.into_inner(),
            })
    }

    async fn get_write_off(
        &mut self,
        id: StockWriteOffId,
    ) -> Result<Option<StockWriteOff>, StoreError> {
        Ok(self.working.write_offs.get(&id).cloned())
    }

    async fn insert_write_off(&mut self, write_off: &StockWriteOff) -> Result<(), StoreError> {
        self.working
            .write_offs
            .insert(write_off.id, write_off.clone());
        Ok(())
    }

    async fn update_write_off(&mut self, write_off: &StockWriteOff) -> Result<(), StoreError> {
        match self.working.write_offs.get_mut(&write_off.id) {
            Some(stored) => {
                *stored = write_off.clone();
                Ok(())
            }
            None => Err(StoreError::RowNotFound {
                table: "stock_write_offs",
                id: write_off.id.into_inner(),
            }),
        }
    }

    async fn get_stock_take(&mut self, id: StockTakeId) -> Result<Option<StockTake>, StoreError> {
        Ok(self.working.stock_takes.get(&id).cloned())
    }

    async fn insert_stock_take(&mut self, stock_take: &StockTake) -> Result<(), StoreError> {
        self.working
            .stock_takes
            .insert(stock_take.id, stock_take.clone());
        Ok(())
    }

    async fn update_stock_take(&mut self, stock_take: &StockTake) -> Result<(), StoreError> {
        match self.working.stock_takes.get_mut(&stock_take.id) {
            Some(stored) => {
                *stored = stock_take.clone();
                Ok(())
            }
            None => Err(StoreError::RowNotFound {
                table: "stock_takes",
                id: stock_take.id.into_inner(),
            }),
        }
    }

    async fn get_settlement_document(
        &mut self,
        id: DocumentId,
    ) -> Result<Option<SettlementDocument>, StoreError> {
        Ok(self.working.documents.get(&id).cloned())
    }

    async fn insert_settlement_document(
        &mut self,
        document: &SettlementDocument,
    ) -> Result<(), StoreError> {
        self.working.documents.insert(document.id, document.clone());
        Ok(())
    }

    async fn update_settlement_document(
        &mut self,
        document: &SettlementDocument,
    ) -> Result<(), StoreError> {
        match self.working.documents.get_mut(&document.id) {
            Some(stored) => {
                *stored = document.clone();
                Ok(())
            }
            None => Err(StoreError::RowNotFound {
                table: "settlement_documents",
                id: document.id.into_inner(),
            }),
        }
    }

    async fn record_audit(&mut self, record: &AuditRecord) -> Result<(), StoreError> {
        self.working.audit.push(record.clone());
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        *self.guard = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
