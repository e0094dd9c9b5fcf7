//! Balance effect of a transaction on its two accounts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kasir_shared::types::{AccountId, UserId};

use crate::account::AccountService;
use crate::ledger::{LedgerError, Transaction};
use crate::store::StoreTx;

/// A debit of `amount` on one account and a credit on another.
///
/// `amount` may be negative when a total shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEffect {
    /// Account whose balance rises by `amount`.
    pub debit_account: AccountId,
    /// Account whose balance falls by `amount`.
    pub credit_account: AccountId,
    /// Amount moved.
    pub amount: Decimal,
}

impl BalanceEffect {
    /// The effect of recording `txn`.
    #[must_use]
    pub fn forward(txn: &Transaction) -> Self {
        Self {
            debit_account: txn.debit_account,
            credit_account: txn.credit_account,
            amount: txn.total_amount,
        }
    }

    /// The effect of moving `txn`'s total by `delta`.
    #[must_use]
    pub fn delta(txn: &Transaction, delta: Decimal) -> Self {
        Self {
            amount: delta,
            ..Self::forward(txn)
        }
    }

    /// The effect that undoes this one: roles swapped, same amount.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            debit_account: self.credit_account,
            credit_account: self.debit_account,
            amount: self.amount,
        }
    }

    /// Net change this effect makes to `account`.
    #[must_use]
    pub fn net_change(&self, account: AccountId) -> Decimal {
        let mut net = Decimal::ZERO;
        if account == self.debit_account {
            net += self.amount;
        }
        if account == self.credit_account {
            net -= self.amount;
        }
        net
    }

    /// Applies the effect to both stored accounts.
    pub async fn apply<T: StoreTx>(&self, tx: &mut T, actor: UserId) -> Result<(), LedgerError> {
        if self.amount.is_zero() {
            return Ok(());
        }

        let before = tx
            .get_account(self.debit_account)
            .await?
            .ok_or(LedgerError::AccountNotFound(self.debit_account))?;
        let mut after = before.clone();
        after.apply_debit(self.amount);
        AccountService::save(tx, actor, &before, &after).await?;

        let before = tx
            .get_account(self.credit_account)
            .await?
            .ok_or(LedgerError::AccountNotFound(self.credit_account))?;
        let mut after = before.clone();
        after.apply_credit(self.amount);
        AccountService::save(tx, actor, &before, &after).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_inverse_swaps_roles() {
        let effect = BalanceEffect {
            debit_account: AccountId::new(),
            credit_account: AccountId::new(),
            amount: dec!(35.00),
        };
        let inverse = effect.inverse();

        assert_eq!(inverse.debit_account, effect.credit_account);
        assert_eq!(inverse.credit_account, effect.debit_account);
        assert_eq!(inverse.amount, effect.amount);
        assert_eq!(effect.net_change(effect.debit_account), dec!(35.00));
        assert_eq!(inverse.net_change(effect.debit_account), dec!(-35.00));
    }
}
