//! Ledger service: recording transactions, item changes, status changes.
//!
//! Every operation takes an open unit of work and an explicit actor, and
//! performs its steps in a fixed order: validate, guard against duplicates,
//! write, audit, apply balance effects, then advance the status. Nothing is
//! visible to other units of work until the caller commits.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use kasir_shared::types::{
    AccountId, CompanyId, TransactionId, TransactionItemId, UserId, round_money,
};

use crate::account::Account;
use crate::audit::{AuditEntity, AuditRecord};
use crate::ledger::error::LedgerError;
use crate::ledger::number::{NumberSource, RandomNumberSource, format_number};
use crate::ledger::settings::LedgerSettings;
use crate::ledger::status::StatusMachine;
use crate::ledger::transaction::{
    CreateTransactionRequest, ItemUpdate, NewTransactionItem, Transaction, TransactionAmount,
    TransactionFilter, TransactionItem, items_total,
};
use crate::ledger::types::TransactionStatus;
use crate::reversal::{BalanceEffect, DuplicateGuard, DuplicateKey, ReversalEngine};
use crate::store::{LedgerStore, StoreTx, TRANSACTION_NUMBER_CONSTRAINT, finish};

/// Ledger operations over an open unit of work.
#[derive(Clone)]
pub struct LedgerService {
    settings: LedgerSettings,
    numbers: Arc<dyn NumberSource>,
}

impl LedgerService {
    /// Creates a service with random transaction numbers.
    #[must_use]
    pub fn new(settings: LedgerSettings) -> Self {
        Self::with_number_source(settings, Arc::new(RandomNumberSource))
    }

    /// Creates a service drawing number suffixes from `numbers`.
    #[must_use]
    pub fn with_number_source(settings: LedgerSettings, numbers: Arc<dyn NumberSource>) -> Self {
        Self { settings, numbers }
    }

    /// The active settings.
    #[must_use]
    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    // ========== Recording ==========

    /// Records a new transaction.
    ///
    /// The transaction is stored as DRAFT, its balance effect is applied, and
    /// it moves to PENDING. Categories configured for auto-completion then
    /// move on to COMPLETED.
    pub async fn create_transaction<T: StoreTx>(
        &self,
        tx: &mut T,
        actor: UserId,
        request: CreateTransactionRequest,
    ) -> Result<Transaction, LedgerError> {
        if let TransactionAmount::Fixed(amount) = request.amount
            && amount < Decimal::ZERO
        {
            return Err(LedgerError::NegativeAmount(amount));
        }
        if request.debit_account == request.credit_account {
            return Err(LedgerError::SameAccount(request.debit_account));
        }
        Self::load_account(tx, request.debit_account, request.company).await?;
        Self::load_account(tx, request.credit_account, request.company).await?;

        let id = TransactionId::new();
        let (items, total_amount) = match request.amount {
            TransactionAmount::Fixed(amount) => (Vec::new(), round_money(amount)),
            TransactionAmount::Itemized(lines) => {
                let items = lines
                    .into_iter()
                    .map(|line| TransactionItem::new(id, line))
                    .collect::<Result<Vec<_>, _>>()?;
                let total = items_total(&items);
                (items, total)
            }
        };

        let now = Utc::now();
        let mut txn = Transaction {
            id,
            company: request.company,
            branch: request.branch,
            customer: request.customer,
            supplier: request.supplier,
            debit_account: request.debit_account,
            credit_account: request.credit_account,
            transaction_type: request.transaction_type,
            category: request.category,
            number: String::new(),
            status: TransactionStatus::Draft,
            total_amount,
            reversal_applied: false,
            reference: request.reference,
            description: request.description,
            transaction_date: now,
            created_by: actor,
            created_at: now,
            updated_at: now,
        };

        DuplicateGuard::check(
            tx,
            &DuplicateKey::of(&txn),
            self.settings.duplicate_window,
            now,
        )
        .await?;

        self.insert_numbered(tx, &mut txn).await?;
        tx.record_audit(&AuditRecord::created(
            actor,
            AuditEntity::Transaction,
            txn.id,
            &txn,
        )?)
        .await?;

        for item in &items {
            tx.insert_item(item).await?;
            tx.record_audit(&AuditRecord::created(
                actor,
                AuditEntity::TransactionItem,
                item.id(),
                item,
            )?)
            .await?;
        }

        BalanceEffect::forward(&txn).apply(tx, actor).await?;
        debug!(transaction_id = %txn.id, number = %txn.number, "transaction recorded");

        self.set_status(tx, actor, &mut txn, TransactionStatus::Pending)
            .await?;
        if self.settings.auto_completes(txn.category) {
            self.set_status(tx, actor, &mut txn, TransactionStatus::Completed)
                .await?;
        }

        info!(
            transaction_id = %txn.id,
            number = %txn.number,
            category = %txn.category,
            amount = %txn.total_amount,
            debit_account = %txn.debit_account,
            credit_account = %txn.credit_account,
            status = %txn.status,
            "transaction created"
        );
        Ok(txn)
    }

    /// Assigns a fresh number and inserts `txn`, regenerating on collision.
    async fn insert_numbered<T: StoreTx>(
        &self,
        tx: &mut T,
        txn: &mut Transaction,
    ) -> Result<(), LedgerError> {
        let attempts = self.settings.number_retry_limit.saturating_add(1);
        for attempt in 1..=attempts {
            let number = format_number(&self.settings.number_prefix, &self.numbers.next_suffix());
            if tx.transaction_number_exists(&number).await? {
                debug!(%number, attempt, "transaction number taken");
                continue;
            }
            txn.number = number;
            match tx.insert_transaction(txn).await {
                Ok(()) => return Ok(()),
                Err(e) if e.violates(TRANSACTION_NUMBER_CONSTRAINT) => {
                    debug!(number = %txn.number, attempt, "transaction number collided on insert");
                }
                Err(e) => return Err(e.into()),
            }
        }
        txn.number.clear();
        Err(LedgerError::NumberGenerationExhausted { attempts })
    }

    // ========== Items ==========

    /// Adds a line item and recomputes the total.
    pub async fn add_item<T: StoreTx>(
        &self,
        tx: &mut T,
        actor: UserId,
        transaction_id: TransactionId,
        input: NewTransactionItem,
    ) -> Result<(TransactionItem, Transaction), LedgerError> {
        let txn = Self::load(tx, transaction_id).await?;
        Self::ensure_items_editable(&txn)?;

        let item = TransactionItem::new(txn.id, input)?;
        tx.insert_item(&item).await?;
        tx.record_audit(&AuditRecord::created(
            actor,
            AuditEntity::TransactionItem,
            item.id(),
            &item,
        )?)
        .await?;

        let txn = self.recompute_total(tx, actor, txn).await?;
        Ok((item, txn))
    }

    /// Changes a line item and recomputes the total.
    pub async fn update_item<T: StoreTx>(
        &self,
        tx: &mut T,
        actor: UserId,
        item_id: TransactionItemId,
        update: ItemUpdate,
    ) -> Result<(TransactionItem, Transaction), LedgerError> {
        let before = tx
            .get_item(item_id)
            .await?
            .ok_or(LedgerError::ItemNotFound(item_id))?;
        let txn = Self::load(tx, before.transaction()).await?;
        Self::ensure_items_editable(&txn)?;

        let mut after = before.clone();
        after.apply(update)?;
        tx.update_item(&after).await?;
        tx.record_audit(&AuditRecord::updated(
            actor,
            AuditEntity::TransactionItem,
            after.id(),
            &before,
            &after,
        )?)
        .await?;

        let txn = self.recompute_total(tx, actor, txn).await?;
        Ok((after, txn))
    }

    /// Removes a line item and recomputes the total.
    pub async fn remove_item<T: StoreTx>(
        &self,
        tx: &mut T,
        actor: UserId,
        item_id: TransactionItemId,
    ) -> Result<Transaction, LedgerError> {
        let item = tx
            .get_item(item_id)
            .await?
            .ok_or(LedgerError::ItemNotFound(item_id))?;
        let txn = Self::load(tx, item.transaction()).await?;
        Self::ensure_items_editable(&txn)?;

        tx.delete_item(item_id).await?;
        tx.record_audit(&AuditRecord::deleted(
            actor,
            AuditEntity::TransactionItem,
            item_id,
            &item,
        )?)
        .await?;

        self.recompute_total(tx, actor, txn).await
    }

    /// Recomputes the total from the items, storing it only if it changed.
    ///
    /// Only DRAFT and PENDING transactions are recomputed. A transaction
    /// without items keeps its fixed total. A change moves both account
    /// balances by the difference.
    pub async fn update_total_amount<T: StoreTx>(
        &self,
        tx: &mut T,
        actor: UserId,
        transaction_id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        let txn = Self::load(tx, transaction_id).await?;
        Self::ensure_items_editable(&txn)?;
        if tx.list_items(transaction_id).await?.is_empty() {
            return Ok(txn);
        }
        self.recompute_total(tx, actor, txn).await
    }

    /// Sets the total to the sum of the current items. Callers check that
    /// the transaction is editable.
    async fn recompute_total<T: StoreTx>(
        &self,
        tx: &mut T,
        actor: UserId,
        before: Transaction,
    ) -> Result<Transaction, LedgerError> {
        let items = tx.list_items(before.id).await?;
        let total = items_total(&items);

        if total == before.total_amount {
            return Ok(before);
        }

        let mut after = before.clone();
        after.total_amount = total;
        after.updated_at = Utc::now();
        tx.update_transaction(&after).await?;
        tx.record_audit(&AuditRecord::updated(
            actor,
            AuditEntity::Transaction,
            after.id,
            &before,
            &after,
        )?)
        .await?;

        if !after.reversal_applied {
            BalanceEffect::delta(&after, total - before.total_amount)
                .apply(tx, actor)
                .await?;
        }

        debug!(
            transaction_id = %after.id,
            old_total = %before.total_amount,
            new_total = %after.total_amount,
            "transaction total updated"
        );
        Ok(after)
    }

    // ========== Status ==========

    /// Moves a transaction to `status`.
    ///
    /// Entering a reversing status undoes the balance effect once. Setting a
    /// reversing status the transaction already has is accepted and never
    /// reverses twice.
    pub async fn change_status<T: StoreTx>(
        &self,
        tx: &mut T,
        actor: UserId,
        transaction_id: TransactionId,
        status: TransactionStatus,
    ) -> Result<Transaction, LedgerError> {
        let mut txn = Self::load(tx, transaction_id).await?;
        self.set_status(tx, actor, &mut txn, status).await?;
        ReversalEngine::reverse(tx, actor, &mut txn).await?;
        Ok(txn)
    }

    /// Moves a pending transaction to COMPLETED.
    pub async fn complete<T: StoreTx>(
        &self,
        tx: &mut T,
        actor: UserId,
        transaction_id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        self.change_status(tx, actor, transaction_id, TransactionStatus::Completed)
            .await
    }

    /// Marks a transaction FAILED.
    pub async fn fail<T: StoreTx>(
        &self,
        tx: &mut T,
        actor: UserId,
        transaction_id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        self.change_status(tx, actor, transaction_id, TransactionStatus::Failed)
            .await
    }

    /// Voids a transaction, undoing its balance effect.
    pub async fn void<T: StoreTx>(
        &self,
        tx: &mut T,
        actor: UserId,
        transaction_id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        self.change_status(tx, actor, transaction_id, TransactionStatus::Voided)
            .await
    }

    async fn set_status<T: StoreTx>(
        &self,
        tx: &mut T,
        actor: UserId,
        txn: &mut Transaction,
        status: TransactionStatus,
    ) -> Result<(), LedgerError> {
        let next = StatusMachine::transition(txn.status, status).inspect_err(|e| {
            warn!(transaction_id = %txn.id, from = %txn.status, to = %status, error = %e, "status change rejected");
        })?;
        if next == txn.status {
            return Ok(());
        }

        let before = txn.clone();
        txn.status = next;
        txn.updated_at = Utc::now();
        tx.update_transaction(txn).await?;
        tx.record_audit(&AuditRecord::updated(
            actor,
            AuditEntity::Transaction,
            txn.id,
            &before,
            &*txn,
        )?)
        .await?;
        debug!(transaction_id = %txn.id, from = %before.status, to = %next, "status changed");
        Ok(())
    }

    // ========== Queries ==========

    /// Fetches a transaction.
    pub async fn get_transaction<T: StoreTx>(
        tx: &mut T,
        id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        Self::load(tx, id).await
    }

    /// Lists transactions matching a filter in chronological order.
    pub async fn list_transactions<T: StoreTx>(
        tx: &mut T,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, LedgerError> {
        Ok(tx.find_transactions(filter).await?)
    }

    /// Lists the items of a transaction.
    pub async fn list_items<T: StoreTx>(
        tx: &mut T,
        transaction_id: TransactionId,
    ) -> Result<Vec<TransactionItem>, LedgerError> {
        Self::load(tx, transaction_id).await?;
        Ok(tx.list_items(transaction_id).await?)
    }

    async fn load<T: StoreTx>(tx: &mut T, id: TransactionId) -> Result<Transaction, LedgerError> {
        tx.get_transaction(id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    async fn load_account<T: StoreTx>(
        tx: &mut T,
        id: AccountId,
        company: CompanyId,
    ) -> Result<Account, LedgerError> {
        let account = tx
            .get_account(id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))?;
        if account.company != company {
            return Err(LedgerError::AccountCompanyMismatch {
                account: id,
                company,
            });
        }
        Ok(account)
    }

    fn ensure_items_editable(txn: &Transaction) -> Result<(), LedgerError> {
        if txn.status.allows_item_changes() {
            Ok(())
        } else {
            Err(LedgerError::TransactionLocked { status: txn.status })
        }
    }
}

/// Ledger backed by a store, one unit of work per call.
pub struct TransactionService<S: LedgerStore> {
    store: Arc<S>,
    ledger: LedgerService,
}

impl<S: LedgerStore> TransactionService<S> {
    /// Creates a service over `store`.
    pub fn new(store: Arc<S>, ledger: LedgerService) -> Self {
        Self { store, ledger }
    }

    /// Records a new transaction.
    pub async fn create_transaction(
        &self,
        actor: UserId,
        request: CreateTransactionRequest,
    ) -> Result<Transaction, LedgerError> {
        let mut tx = self.store.begin().await?;
        let result = self.ledger.create_transaction(&mut tx, actor, request).await;
        finish(tx, result).await
    }

    /// Adds a line item.
    pub async fn add_item(
        &self,
        actor: UserId,
        transaction_id: TransactionId,
        input: NewTransactionItem,
    ) -> Result<(TransactionItem, Transaction), LedgerError> {
        let mut tx = self.store.begin().await?;
        let result = self
            .ledger
            .add_item(&mut tx, actor, transaction_id, input)
            .await;
        finish(tx, result).await
    }

    /// Changes a line item.
    pub async fn update_item(
        &self,
        actor: UserId,
        item_id: TransactionItemId,
        update: ItemUpdate,
    ) -> Result<(TransactionItem, Transaction), LedgerError> {
        let mut tx = self.store.begin().await?;
        let result = self.ledger.update_item(&mut tx, actor, item_id, update).await;
        finish(tx, result).await
    }

    /// Removes a line item.
    pub async fn remove_item(
        &self,
        actor: UserId,
        item_id: TransactionItemId,
    ) -> Result<Transaction, LedgerError> {
        let mut tx = self.store.begin().await?;
        let result = self.ledger.remove_item(&mut tx, actor, item_id).await;
        finish(tx, result).await
    }

    /// Recomputes a transaction total from its items.
    pub async fn update_total_amount(
        &self,
        actor: UserId,
        transaction_id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        let mut tx = self.store.begin().await?;
        let result = self
            .ledger
            .update_total_amount(&mut tx, actor, transaction_id)
            .await;
        finish(tx, result).await
    }

    /// Moves a transaction to `status`.
    pub async fn change_status(
        &self,
        actor: UserId,
        transaction_id: TransactionId,
        status: TransactionStatus,
    ) -> Result<Transaction, LedgerError> {
        let mut tx = self.store.begin().await?;
        let result = self
            .ledger
            .change_status(&mut tx, actor, transaction_id, status)
            .await;
        finish(tx, result).await
    }

    /// Fetches a transaction.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        let mut tx = self.store.begin().await?;
        let result = LedgerService::get_transaction(&mut tx, id).await;
        finish(tx, result).await
    }

    /// Lists transactions matching a filter.
    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let mut tx = self.store.begin().await?;
        let result = LedgerService::list_transactions(&mut tx, filter).await;
        finish(tx, result).await
    }

    /// Lists the items of a transaction.
    pub async fn list_items(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Vec<TransactionItem>, LedgerError> {
        let mut tx = self.store.begin().await?;
        let result = LedgerService::list_items(&mut tx, transaction_id).await;
        finish(tx, result).await
    }
}
