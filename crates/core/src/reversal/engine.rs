//! Reversal engine.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, info};

use kasir_shared::types::{AccountId, UserId, round_money, zero_money};

use crate::account::{AccountDetails, AccountService};
use crate::audit::{AuditEntity, AuditRecord};
use crate::ledger::{LedgerError, Transaction, TransactionCategory};
use crate::reversal::effect::BalanceEffect;
use crate::store::StoreTx;

/// What a reversal call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReversalOutcome {
    /// The transaction is not in a reversing status.
    NotApplicable,
    /// The reversal had already been applied; nothing changed.
    AlreadyApplied,
    /// The balance effect was undone now.
    Applied,
}

/// Stateless reversal of a transaction's balance effect.
pub struct ReversalEngine;

impl ReversalEngine {
    /// Undoes the balance effect of `txn` exactly once.
    ///
    /// Runs only when `txn` is in a reversing status and `reversal_applied`
    /// is still false. The flag is set and stored after both accounts are
    /// updated. On error `txn` is left untouched and the enclosing unit of
    /// work must be rolled back.
    pub async fn reverse<T: StoreTx>(
        tx: &mut T,
        actor: UserId,
        txn: &mut Transaction,
    ) -> Result<ReversalOutcome, LedgerError> {
        if !txn.status.is_reversing() {
            return Ok(ReversalOutcome::NotApplicable);
        }
        if txn.reversal_applied {
            debug!(transaction_id = %txn.id, "reversal already applied");
            return Ok(ReversalOutcome::AlreadyApplied);
        }

        let effect = BalanceEffect::forward(txn).inverse();
        let result = Self::apply(tx, actor, txn, &effect).await;

        match result {
            Ok(reversed) => {
                *txn = reversed;
                info!(
                    transaction_id = %txn.id,
                    number = %txn.number,
                    amount = %txn.total_amount,
                    status = %txn.status,
                    "transaction reversed"
                );
                Ok(ReversalOutcome::Applied)
            }
            Err(e) => {
                error!(
                    transaction_id = %txn.id,
                    number = %txn.number,
                    amount = %txn.total_amount,
                    debit_account = %txn.debit_account,
                    credit_account = %txn.credit_account,
                    error = %e,
                    "reversal failed"
                );
                Err(e)
            }
        }
    }

    async fn apply<T: StoreTx>(
        tx: &mut T,
        actor: UserId,
        txn: &Transaction,
        effect: &BalanceEffect,
    ) -> Result<Transaction, LedgerError> {
        effect.apply(tx, actor).await?;
        if txn.category == TransactionCategory::WriteOff {
            Self::release_written_off(tx, actor, txn.debit_account, txn.total_amount).await?;
        }

        let mut reversed = txn.clone();
        reversed.reversal_applied = true;
        reversed.updated_at = Utc::now();
        tx.update_transaction(&reversed).await?;
        tx.record_audit(&AuditRecord::updated(
            actor,
            AuditEntity::Transaction,
            reversed.id,
            txn,
            &reversed,
        )?)
        .await?;
        Ok(reversed)
    }

    /// Takes `amount` back out of the value held by a write-off account,
    /// never below zero.
    async fn release_written_off<T: StoreTx>(
        tx: &mut T,
        actor: UserId,
        account: AccountId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        let before = tx
            .get_account(account)
            .await?
            .ok_or(LedgerError::AccountNotFound(account))?;
        let mut after = before.clone();
        let AccountDetails::WriteOff { amount: held, .. } = &mut after.details else {
            return Ok(());
        };
        *held = round_money(*held - amount).max(zero_money());
        after.updated_at = Utc::now();
        AccountService::save(tx, actor, &before, &after).await?;
        debug!(account_id = %account, %amount, "written-off value released");
        Ok(())
    }
}
