//! Duplicate-transaction guard.
//!
//! Two transactions are equivalent when they share company, branch, debit
//! account, credit account, category, total amount, customer, supplier and
//! reference. A new transaction is rejected while an equivalent one that is
//! neither FAILED nor in a reversing status was created within the
//! configured window. The check runs under a lock covering the accounts,
//! category and amount, so concurrent posts of the same thing serialise.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::warn;

use kasir_shared::types::{AccountId, BranchId, CompanyId, CustomerId, SupplierId};

use crate::ledger::{LedgerError, Transaction, TransactionCategory, TransactionFilter};
use crate::store::StoreTx;

/// The fields two equivalent transactions share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKey {
    /// Owning company.
    pub company: CompanyId,
    /// Owning branch.
    pub branch: BranchId,
    /// Account debited.
    pub debit_account: AccountId,
    /// Account credited.
    pub credit_account: AccountId,
    /// Business category.
    pub category: TransactionCategory,
    /// Total amount.
    pub total_amount: Decimal,
    /// Customer involved.
    pub customer: Option<CustomerId>,
    /// Supplier involved.
    pub supplier: Option<SupplierId>,
    /// External reference.
    pub reference: Option<String>,
}

impl DuplicateKey {
    /// The key of an existing transaction.
    #[must_use]
    pub fn of(txn: &Transaction) -> Self {
        Self {
            company: txn.company,
            branch: txn.branch,
            debit_account: txn.debit_account,
            credit_account: txn.credit_account,
            category: txn.category,
            total_amount: txn.total_amount,
            customer: txn.customer,
            supplier: txn.supplier,
            reference: txn.reference.clone(),
        }
    }

    /// Lock key serialising checks for this key.
    ///
    /// Leaves out customer, supplier and reference, so postings that differ
    /// only in those wait on each other. Equivalent postings always share a
    /// lock.
    #[must_use]
    pub fn lock_key(&self) -> String {
        format!(
            "txn-dup:{}:{}:{}:{}:{}:{}",
            self.company,
            self.branch,
            self.debit_account,
            self.credit_account,
            self.category,
            self.total_amount.normalize()
        )
    }

    /// Returns true if `txn` is equivalent to this key.
    #[must_use]
    pub fn matches(&self, txn: &Transaction) -> bool {
        *self == Self::of(txn)
    }
}

/// Stateless duplicate check.
pub struct DuplicateGuard;

impl DuplicateGuard {
    /// Fails with `DuplicateTransaction` if a live equivalent exists.
    ///
    /// A zero window disables the guard.
    pub async fn check<T: StoreTx>(
        tx: &mut T,
        key: &DuplicateKey,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if window <= Duration::zero() {
            return Ok(());
        }

        tx.lock_key(&key.lock_key()).await?;

        let filter = TransactionFilter {
            company: Some(key.company),
            branch: Some(key.branch),
            debit_account: Some(key.debit_account),
            credit_account: Some(key.credit_account),
            category: Some(key.category),
            created_after: Some(now - window),
            ..TransactionFilter::default()
        };

        let existing = tx
            .find_transactions(&filter)
            .await?
            .into_iter()
            .find(|txn| txn.status.is_live() && key.matches(txn));

        match existing {
            Some(txn) => {
                warn!(
                    existing_id = %txn.id,
                    number = %txn.number,
                    amount = %key.total_amount,
                    category = %key.category,
                    "duplicate transaction rejected"
                );
                Err(LedgerError::DuplicateTransaction {
                    existing: txn.id,
                    number: txn.number,
                })
            }
            None => Ok(()),
        }
    }
}
