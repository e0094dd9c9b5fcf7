//! Stock take approval.
//!
//! A net shortage debits the branch expense account and credits purchases.
//! A net surplus does the opposite. A stock take that balances is approved
//! without a ledger transaction.

use std::sync::Arc;

use tracing::{error, info};

use kasir_shared::types::{StockTakeId, StockTakeLineId, UserId};

use crate::account::{AccountKind, AccountService};
use crate::audit::{AuditEntity, AuditRecord};
use crate::document::{NewStockTake, NewStockTakeLine, StockTake};
use crate::ledger::{
    CreateTransactionRequest, LedgerService, Transaction, TransactionCategory, TransactionType,
};
use crate::posting::error::PostingError;
use crate::store::{LedgerStore, StoreTx, finish};

/// Result of approving a stock take.
#[derive(Debug, Clone)]
pub struct StockTakeOutcome {
    /// The approved stock take.
    pub stock_take: StockTake,
    /// The adjustment, absent when the count matched.
    pub transaction: Option<Transaction>,
}

/// Stock take editing and approval.
pub struct StockTakeService<S: LedgerStore> {
    store: Arc<S>,
    ledger: LedgerService,
}

impl<S: LedgerStore> StockTakeService<S> {
    /// Creates a service over `store`.
    pub fn new(store: Arc<S>, ledger: LedgerService) -> Self {
        Self { store, ledger }
    }

    /// Records a DRAFT stock take.
    pub async fn create_stock_take(
        &self,
        actor: UserId,
        input: NewStockTake,
    ) -> Result<StockTake, PostingError> {
        let mut tx = self.store.begin().await?;
        let result: Result<StockTake, PostingError> = async {
            let stock_take = StockTake::new(input, actor)?;
            tx.insert_stock_take(&stock_take).await?;
            tx.record_audit(&AuditRecord::created(
                actor,
                AuditEntity::StockTake,
                stock_take.id,
                &stock_take,
            )?)
            .await?;
            Ok(stock_take)
        }
        .await;
        finish(tx, result).await
    }

    /// Fetches a stock take.
    pub async fn get_stock_take(&self, id: StockTakeId) -> Result<StockTake, PostingError> {
        let mut tx = self.store.begin().await?;
        let result = Self::load(&mut tx, id).await;
        finish(tx, result).await
    }

    /// Adds a count line to a DRAFT stock take.
    pub async fn add_line(
        &self,
        actor: UserId,
        id: StockTakeId,
        input: NewStockTakeLine,
    ) -> Result<StockTake, PostingError> {
        let mut tx = self.store.begin().await?;
        let result = Self::edit(&mut tx, actor, id, |stock_take| {
            stock_take.add_line(input).map(|_| ())
        })
        .await;
        finish(tx, result).await
    }

    /// Removes a count line from a DRAFT stock take.
    pub async fn remove_line(
        &self,
        actor: UserId,
        id: StockTakeId,
        line: StockTakeLineId,
    ) -> Result<StockTake, PostingError> {
        let mut tx = self.store.begin().await?;
        let result = Self::edit(&mut tx, actor, id, |stock_take| {
            stock_take.remove_line(line).map(|_| ())
        })
        .await;
        finish(tx, result).await
    }

    /// Approves a DRAFT stock take and books its net variance.
    pub async fn approve_stock_take(
        &self,
        actor: UserId,
        id: StockTakeId,
    ) -> Result<StockTakeOutcome, PostingError> {
        let mut tx = self.store.begin().await?;
        let result = self.approve(&mut tx, actor, id).await;
        if let Err(e) = &result {
            error!(stock_take_id = %id, error = %e, "stock take approval failed");
        }
        finish(tx, result).await
    }

    async fn approve<T: StoreTx>(
        &self,
        tx: &mut T,
        actor: UserId,
        id: StockTakeId,
    ) -> Result<StockTakeOutcome, PostingError> {
        let mut stock_take = Self::load(tx, id).await?;
        stock_take.ensure_approvable()?;
        let variance = stock_take.net_variance();

        let transaction = if variance.is_zero() {
            None
        } else {
            Some(self.book_variance(tx, actor, &stock_take).await?)
        };

        let before = stock_take.clone();
        stock_take.mark_approved(transaction.as_ref().map(|txn| txn.id))?;
        tx.update_stock_take(&stock_take).await?;
        tx.record_audit(&AuditRecord::updated(
            actor,
            AuditEntity::StockTake,
            id,
            &before,
            &stock_take,
        )?)
        .await?;

        info!(
            stock_take_id = %id,
            %variance,
            transaction_id = ?transaction.as_ref().map(|txn| txn.id),
            "stock take approved"
        );
        Ok(StockTakeOutcome {
            stock_take,
            transaction,
        })
    }

    async fn book_variance<T: StoreTx>(
        &self,
        tx: &mut T,
        actor: UserId,
        stock_take: &StockTake,
    ) -> Result<Transaction, PostingError> {
        let variance = stock_take.net_variance();
        let expense = AccountService::get_or_create_account(
            tx,
            actor,
            stock_take.company,
            stock_take.branch,
            AccountKind::Expense,
        )
        .await?;
        let purchases = AccountService::get_or_create_account(
            tx,
            actor,
            stock_take.company,
            stock_take.branch,
            AccountKind::Purchases,
        )
        .await?;

        let (debit, credit, transaction_type) = if variance.is_sign_negative() {
            (expense.id, purchases.id, TransactionType::Outgoing)
        } else {
            (purchases.id, expense.id, TransactionType::Incoming)
        };

        let mut request = CreateTransactionRequest::fixed(
            stock_take.company,
            stock_take.branch,
            debit,
            credit,
            transaction_type,
            TransactionCategory::Adjustment,
            variance.abs(),
        );
        request.reference = Some(stock_take.id.to_string());
        request.description = Some("Stock take variance".into());

        self.ledger
            .create_transaction(tx, actor, request)
            .await
            .inspect_err(|e| {
                error!(
                    stock_take_id = %stock_take.id,
                    %variance,
                    debit_account = %debit,
                    credit_account = %credit,
                    error = %e,
                    "ledger rejected stock take variance"
                );
            })
            .map_err(PostingError::from)
    }

    async fn edit<T, F>(
        tx: &mut T,
        actor: UserId,
        id: StockTakeId,
        change: F,
    ) -> Result<StockTake, PostingError>
    where
        T: StoreTx,
        F: FnOnce(&mut StockTake) -> Result<(), crate::document::DocumentError>,
    {
        let before = Self::load(tx, id).await?;
        let mut after = before.clone();
        change(&mut after)?;
        tx.update_stock_take(&after).await?;
        tx.record_audit(&AuditRecord::updated(
            actor,
            AuditEntity::StockTake,
            id,
            &before,
            &after,
        )?)
        .await?;
        Ok(after)
    }

    async fn load<T: StoreTx>(tx: &mut T, id: StockTakeId) -> Result<StockTake, PostingError> {
        tx.get_stock_take(id)
            .await?
            .ok_or(PostingError::StockTakeNotFound(id))
    }
}
