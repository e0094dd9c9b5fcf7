//! Report data types.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kasir_shared::types::{AccountId, CompanyId, CustomerId, TransactionId, round_money, zero_money};

use crate::ledger::{Transaction, TransactionCategory, TransactionItem, TransactionStatus};
use crate::reports::error::ReportError;

/// Inclusive date range. An open end is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included.
    pub from: Option<NaiveDate>,
    /// Last day included.
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// A range with both ends set.
    #[must_use]
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    /// Fails when `from` is after `to`.
    pub fn validate(&self) -> Result<(), ReportError> {
        match (self.from, self.to) {
            (Some(start), Some(end)) if start > end => {
                Err(ReportError::InvalidDateRange { start, end })
            }
            _ => Ok(()),
        }
    }

    /// Returns true if `date` falls inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }

    /// Returns true if `date` falls before the range starts.
    #[must_use]
    pub fn precedes(&self, date: NaiveDate) -> bool {
        self.from.is_some_and(|from| date < from)
    }
}

/// The accounts of one customer and how transactions move them.
#[derive(Debug, Clone, Default)]
pub struct CustomerExposure {
    accounts: HashSet<AccountId>,
}

impl CustomerExposure {
    /// Exposure over the given customer accounts.
    pub fn new(accounts: impl IntoIterator<Item = AccountId>) -> Self {
        Self {
            accounts: accounts.into_iter().collect(),
        }
    }

    /// Returns true if the customer has no accounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Returns true if `txn` counts toward the customer's balance.
    ///
    /// Reversed transactions net to nothing and are left out.
    #[must_use]
    pub fn counts(&self, txn: &Transaction) -> bool {
        !txn.status.is_reversing()
            && (self.accounts.contains(&txn.debit_account)
                || self.accounts.contains(&txn.credit_account))
    }

    /// Debit and credit amounts `txn` posts to the customer's accounts.
    #[must_use]
    pub fn movement(&self, txn: &Transaction) -> (Decimal, Decimal) {
        let debit = if self.accounts.contains(&txn.debit_account) {
            txn.total_amount
        } else {
            zero_money()
        };
        let credit = if self.accounts.contains(&txn.credit_account) {
            txn.total_amount
        } else {
            zero_money()
        };
        (debit, credit)
    }

    /// Debits minus credits over `txns`, skipping those that do not count.
    #[must_use]
    pub fn net<'a>(&self, txns: impl IntoIterator<Item = &'a Transaction>) -> Decimal {
        round_money(
            txns.into_iter()
                .filter(|txn| self.counts(txn))
                .map(|txn| {
                    let (debit, credit) = self.movement(txn);
                    debit - credit
                })
                .fold(zero_money(), |acc, v| acc + v),
        )
    }
}

/// One transaction on a customer statement.
#[derive(Debug, Clone, Serialize)]
pub struct StatementLine {
    /// Transaction ID.
    pub transaction_id: TransactionId,
    /// Transaction number.
    pub number: String,
    /// Transaction date.
    pub date: DateTime<Utc>,
    /// Business category.
    pub category: TransactionCategory,
    /// Status at report time.
    pub status: TransactionStatus,
    /// External reference.
    pub reference: Option<String>,
    /// Amount debited to the customer.
    pub debit: Decimal,
    /// Amount credited to the customer.
    pub credit: Decimal,
    /// Balance after this line.
    pub balance: Decimal,
    /// Line items.
    pub items: Vec<TransactionItem>,
}

/// Customer statement over a date range.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerStatement {
    /// Company.
    pub company: CompanyId,
    /// Customer.
    pub customer: CustomerId,
    /// Period covered.
    pub range: DateRange,
    /// Balance before the range.
    pub opening_balance: Decimal,
    /// Transactions in the range, oldest first.
    pub lines: Vec<StatementLine>,
    /// Total debits in the range.
    pub total_debit: Decimal,
    /// Total credits in the range.
    pub total_credit: Decimal,
    /// Balance at the end of the range.
    pub closing_balance: Decimal,
}

impl CustomerStatement {
    /// Builds a statement from the customer's transactions, oldest first.
    ///
    /// `items` supplies the line items of each transaction in the range.
    pub fn build<F>(
        company: CompanyId,
        customer: CustomerId,
        range: DateRange,
        exposure: &CustomerExposure,
        txns: &[Transaction],
        mut items: F,
    ) -> Self
    where
        F: FnMut(TransactionId) -> Vec<TransactionItem>,
    {
        let opening_balance =
            exposure.net(txns.iter().filter(|txn| range.precedes(txn.transaction_date.date_naive())));

        let mut balance = opening_balance;
        let mut total_debit = zero_money();
        let mut total_credit = zero_money();
        let mut lines = Vec::new();
        for txn in txns {
            if !exposure.counts(txn) || !range.contains(txn.transaction_date.date_naive()) {
                continue;
            }
            let (debit, credit) = exposure.movement(txn);
            balance = round_money(balance + debit - credit);
            total_debit += debit;
            total_credit += credit;
            lines.push(StatementLine {
                transaction_id: txn.id,
                number: txn.number.clone(),
                date: txn.transaction_date,
                category: txn.category,
                status: txn.status,
                reference: txn.reference.clone(),
                debit,
                credit,
                balance,
                items: items(txn.id),
            });
        }

        Self {
            company,
            customer,
            range,
            opening_balance,
            lines,
            total_debit: round_money(total_debit),
            total_credit: round_money(total_credit),
            closing_balance: balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let range = DateRange::between(date(2026, 3, 1), date(2026, 2, 1));
        assert!(matches!(
            range.validate(),
            Err(ReportError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let range = DateRange::between(date(2026, 1, 1), date(2026, 1, 31));
        assert!(range.contains(date(2026, 1, 1)));
        assert!(range.contains(date(2026, 1, 31)));
        assert!(!range.contains(date(2026, 2, 1)));
        assert!(range.precedes(date(2025, 12, 31)));
        assert!(!range.precedes(date(2026, 1, 1)));
    }

    #[test]
    fn test_open_range_contains_everything() {
        let range = DateRange::default();
        assert!(range.validate().is_ok());
        assert!(range.contains(date(1999, 1, 1)));
        assert!(!range.precedes(date(1999, 1, 1)));
    }
}
