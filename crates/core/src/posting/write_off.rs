//! Write-off posting.
//!
//! Posting a write-off debits its write-off account and credits the branch
//! purchases account with the write-off total, itemized like the write-off.
//! The write-off account records the amount, and the write-off becomes
//! POSTED. From then on its items and accounts are frozen.

use std::sync::Arc;

use tracing::{error, info};

use kasir_shared::types::{StockWriteOffId, StockWriteOffItemId, UserId};

use crate::account::{Account, AccountKind, AccountService};
use crate::audit::{AuditEntity, AuditRecord};
use crate::document::{
    DocumentError, NewWriteOff, NewWriteOffItem, StockWriteOff, WriteOffItemUpdate,
};
use crate::ledger::{
    CreateTransactionRequest, LedgerService, Transaction, TransactionAmount, TransactionCategory,
    TransactionType,
};
use crate::posting::error::PostingError;
use crate::store::{LedgerStore, StoreTx, finish};

/// Result of posting a write-off.
#[derive(Debug, Clone)]
pub struct WriteOffOutcome {
    /// The posted write-off.
    pub write_off: StockWriteOff,
    /// The ledger transaction.
    pub transaction: Transaction,
    /// The write-off account debited.
    pub account: Account,
}

/// Write-off editing and posting.
pub struct WriteOffService<S: LedgerStore> {
    store: Arc<S>,
    ledger: LedgerService,
}

impl<S: LedgerStore> WriteOffService<S> {
    /// Creates a service over `store`.
    pub fn new(store: Arc<S>, ledger: LedgerService) -> Self {
        Self { store, ledger }
    }

    /// Creates an empty DRAFT write-off.
    pub async fn create_write_off(
        &self,
        actor: UserId,
        input: NewWriteOff,
    ) -> Result<StockWriteOff, PostingError> {
        let mut tx = self.store.begin().await?;
        let write_off = StockWriteOff::new(input, actor);
        let result = Self::insert(&mut tx, actor, &write_off).await;
        finish(tx, result.map(|()| write_off)).await
    }

    /// Fetches a write-off.
    pub async fn get_write_off(&self, id: StockWriteOffId) -> Result<StockWriteOff, PostingError> {
        let mut tx = self.store.begin().await?;
        let result = Self::load(&mut tx, id).await;
        finish(tx, result).await
    }

    /// Adds an item to a DRAFT write-off.
    pub async fn add_item(
        &self,
        actor: UserId,
        id: StockWriteOffId,
        input: NewWriteOffItem,
    ) -> Result<StockWriteOff, PostingError> {
        self.edit(actor, id, |write_off| write_off.add_item(input).map(|_| ()))
            .await
    }

    /// Changes an item of a DRAFT write-off.
    pub async fn update_item(
        &self,
        actor: UserId,
        id: StockWriteOffId,
        item: StockWriteOffItemId,
        update: WriteOffItemUpdate,
    ) -> Result<StockWriteOff, PostingError> {
        self.edit(actor, id, |write_off| {
            write_off.update_item(item, update).map(|_| ())
        })
        .await
    }

    /// Removes an item from a DRAFT write-off.
    pub async fn remove_item(
        &self,
        actor: UserId,
        id: StockWriteOffId,
        item: StockWriteOffItemId,
    ) -> Result<StockWriteOff, PostingError> {
        self.edit(actor, id, |write_off| write_off.remove_item(item).map(|_| ()))
            .await
    }

    /// Posts a DRAFT write-off to the ledger.
    pub async fn post_write_off(
        &self,
        actor: UserId,
        id: StockWriteOffId,
    ) -> Result<WriteOffOutcome, PostingError> {
        let mut tx = self.store.begin().await?;
        let result = self.post(&mut tx, actor, id).await;
        if let Err(e) = &result {
            error!(write_off_id = %id, error = %e, "write-off posting failed");
        }
        finish(tx, result).await
    }

    async fn post<T: StoreTx>(
        &self,
        tx: &mut T,
        actor: UserId,
        id: StockWriteOffId,
    ) -> Result<WriteOffOutcome, PostingError> {
        let mut write_off = Self::load(tx, id).await?;
        write_off.ensure_postable()?;
        let amount = write_off.total();

        let debit = AccountService::get_or_create_write_off_account(
            tx,
            actor,
            write_off.company,
            write_off.branch,
            id,
        )
        .await?;
        let credit = AccountService::get_or_create_account(
            tx,
            actor,
            write_off.company,
            write_off.branch,
            AccountKind::Purchases,
        )
        .await?;

        let request = CreateTransactionRequest {
            company: write_off.company,
            branch: write_off.branch,
            debit_account: debit.id,
            credit_account: credit.id,
            transaction_type: TransactionType::Outgoing,
            category: TransactionCategory::WriteOff,
            amount: TransactionAmount::Itemized(write_off.ledger_lines()),
            customer: None,
            supplier: None,
            reference: Some(id.to_string()),
            description: write_off.reason.clone(),
        };
        let transaction = self
            .ledger
            .create_transaction(tx, actor, request)
            .await
            .inspect_err(|e| {
                error!(
                    write_off_id = %id,
                    %amount,
                    debit_account = %debit.id,
                    credit_account = %credit.id,
                    error = %e,
                    "ledger rejected write-off"
                );
            })?;

        let account =
            AccountService::record_written_off(tx, actor, debit.id, transaction.total_amount)
                .await?;

        let before = write_off.clone();
        write_off.mark_posted(transaction.id)?;
        tx.update_write_off(&write_off).await?;
        tx.record_audit(&AuditRecord::updated(
            actor,
            AuditEntity::StockWriteOff,
            id,
            &before,
            &write_off,
        )?)
        .await?;

        info!(
            write_off_id = %id,
            transaction_id = %transaction.id,
            number = %transaction.number,
            amount = %transaction.total_amount,
            "write-off posted"
        );
        Ok(WriteOffOutcome {
            write_off,
            transaction,
            account,
        })
    }

    async fn edit<F>(
        &self,
        actor: UserId,
        id: StockWriteOffId,
        change: F,
    ) -> Result<StockWriteOff, PostingError>
    where
        F: FnOnce(&mut StockWriteOff) -> Result<(), DocumentError>,
    {
        let mut tx = self.store.begin().await?;
        let result: Result<StockWriteOff, PostingError> = async {
            let before = Self::load(&mut tx, id).await?;
            let mut after = before.clone();
            change(&mut after)?;
            tx.update_write_off(&after).await?;
            tx.record_audit(&AuditRecord::updated(
                actor,
                AuditEntity::StockWriteOff,
                id,
                &before,
                &after,
            )?)
            .await?;
            Ok(after)
        }
        .await;
        finish(tx, result).await
    }

    async fn insert<T: StoreTx>(
        tx: &mut T,
        actor: UserId,
        write_off: &StockWriteOff,
    ) -> Result<(), PostingError> {
        tx.insert_write_off(write_off).await?;
        tx.record_audit(&AuditRecord::created(
            actor,
            AuditEntity::StockWriteOff,
            write_off.id,
            write_off,
        )?)
        .await?;
        Ok(())
    }

    async fn load<T: StoreTx>(
        tx: &mut T,
        id: StockWriteOffId,
    ) -> Result<StockWriteOff, PostingError> {
        tx.get_write_off(id)
            .await?
            .ok_or(PostingError::WriteOffNotFound(id))
    }
}
