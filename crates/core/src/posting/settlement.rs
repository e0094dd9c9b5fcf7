//! Sales, purchase and return settlement.
//!
//! Settling a document records one itemized transaction between the branch
//! sales or purchases account and a settlement account. The settlement
//! account is a bank or cash account when the document is paid. Otherwise it
//! is the counterparty's primary account, and the transaction stays PENDING
//! until a payment completes it.

use std::sync::Arc;

use tracing::{error, info};

use kasir_shared::types::{AccountId, DocumentId, UserId};

use crate::account::{Account, AccountKind, AccountService};
use crate::audit::{AuditEntity, AuditRecord};
use crate::document::{NewSettlementDocument, SettlementDocument};
use crate::ledger::{
    CreateTransactionRequest, LedgerService, Transaction, TransactionAmount, TransactionStatus,
};
use crate::posting::error::PostingError;
use crate::posting::payment_account;
use crate::store::{LedgerStore, StoreTx, finish};

/// Input for settling a document.
#[derive(Debug, Clone, Copy)]
pub struct SettleRequest {
    /// Document to settle.
    pub document: DocumentId,
    /// Bank or cash account paid from or into; `None` settles on account.
    pub payment_account: Option<AccountId>,
}

/// Result of settling a document.
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    /// The settled document.
    pub document: SettlementDocument,
    /// The ledger transaction.
    pub transaction: Transaction,
}

/// Settles sales, purchases and returns.
pub struct SettlementService<S: LedgerStore> {
    store: Arc<S>,
    ledger: LedgerService,
}

impl<S: LedgerStore> SettlementService<S> {
    /// Creates a service over `store`.
    pub fn new(store: Arc<S>, ledger: LedgerService) -> Self {
        Self { store, ledger }
    }

    /// Records an OPEN settlement document.
    pub async fn create_document(
        &self,
        actor: UserId,
        input: NewSettlementDocument,
    ) -> Result<SettlementDocument, PostingError> {
        let mut tx = self.store.begin().await?;
        let result: Result<SettlementDocument, PostingError> = async {
            let document = SettlementDocument::new(input, actor)?;
            tx.insert_settlement_document(&document).await?;
            tx.record_audit(&AuditRecord::created(
                actor,
                AuditEntity::SettlementDocument,
                document.id,
                &document,
            )?)
            .await?;
            Ok(document)
        }
        .await;
        finish(tx, result).await
    }

    /// Fetches a settlement document.
    pub async fn get_document(&self, id: DocumentId) -> Result<SettlementDocument, PostingError> {
        let mut tx = self.store.begin().await?;
        let result = Self::load(&mut tx, id).await;
        finish(tx, result).await
    }

    /// Settles an OPEN document.
    pub async fn settle(
        &self,
        actor: UserId,
        request: SettleRequest,
    ) -> Result<SettlementOutcome, PostingError> {
        let mut tx = self.store.begin().await?;
        let result = self.settle_in(&mut tx, actor, request).await;
        if let Err(e) = &result {
            error!(
                document_id = %request.document,
                payment_account = ?request.payment_account,
                error = %e,
                "settlement failed"
            );
        }
        finish(tx, result).await
    }

    async fn settle_in<T: StoreTx>(
        &self,
        tx: &mut T,
        actor: UserId,
        request: SettleRequest,
    ) -> Result<SettlementOutcome, PostingError> {
        let mut document = Self::load(tx, request.document).await?;
        document.ensure_settleable()?;

        let settlement = Self::settlement_account(tx, actor, &document, request).await?;
        let scope_kind = if document.kind.is_sales_side() {
            AccountKind::Sales
        } else {
            AccountKind::Purchases
        };
        let scope = AccountService::get_or_create_account(
            tx,
            actor,
            document.company,
            document.branch,
            scope_kind,
        )
        .await?;

        let (debit, credit) = if document.kind.debits_counterparty() {
            (settlement.id, scope.id)
        } else {
            (scope.id, settlement.id)
        };

        let ledger_request = CreateTransactionRequest {
            company: document.company,
            branch: document.branch,
            debit_account: debit,
            credit_account: credit,
            transaction_type: document.kind.transaction_type(),
            category: document.kind.category(),
            amount: TransactionAmount::Itemized(document.lines.clone()),
            customer: document.customer,
            supplier: document.supplier,
            reference: Some(document.reference.clone()),
            description: None,
        };
        let mut transaction = self
            .ledger
            .create_transaction(tx, actor, ledger_request)
            .await
            .inspect_err(|e| {
                error!(
                    document_id = %document.id,
                    amount = %document.total(),
                    debit_account = %debit,
                    credit_account = %credit,
                    error = %e,
                    "ledger rejected settlement"
                );
            })?;

        if request.payment_account.is_some() && transaction.status == TransactionStatus::Pending {
            transaction = self.ledger.complete(tx, actor, transaction.id).await?;
        }

        let before = document.clone();
        document.mark_settled(transaction.id)?;
        tx.update_settlement_document(&document).await?;
        tx.record_audit(&AuditRecord::updated(
            actor,
            AuditEntity::SettlementDocument,
            document.id,
            &before,
            &document,
        )?)
        .await?;

        info!(
            document_id = %document.id,
            kind = %document.kind,
            transaction_id = %transaction.id,
            number = %transaction.number,
            status = %transaction.status,
            "document settled"
        );
        Ok(SettlementOutcome {
            document,
            transaction,
        })
    }

    async fn settlement_account<T: StoreTx>(
        tx: &mut T,
        actor: UserId,
        document: &SettlementDocument,
        request: SettleRequest,
    ) -> Result<Account, PostingError> {
        if let Some(id) = request.payment_account {
            return payment_account(tx, id, document.company).await;
        }
        let owner = document
            .counterparty()
            .ok_or(PostingError::CounterpartyMissing(document.id))?;
        Ok(AccountService::get_or_create_primary_account(
            tx,
            actor,
            document.company,
            document.branch,
            owner,
        )
        .await?)
    }

    async fn load<T: StoreTx>(
        tx: &mut T,
        id: DocumentId,
    ) -> Result<SettlementDocument, PostingError> {
        tx.get_settlement_document(id)
            .await?
            .ok_or(PostingError::DocumentNotFound(id))
    }
}
