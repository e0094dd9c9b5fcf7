//! Property-based tests for customer statements.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use kasir_shared::types::{AccountId, BranchId, CompanyId, CustomerId, TransactionId, UserId};

use crate::ledger::{
    Transaction, TransactionCategory, TransactionStatus, TransactionType,
};
use crate::reports::types::{CustomerExposure, CustomerStatement, DateRange};

struct Book {
    company: CompanyId,
    receivable: AccountId,
    other: AccountId,
}

impl Book {
    fn new() -> Self {
        Self {
            company: CompanyId::new(),
            receivable: AccountId::new(),
            other: AccountId::new(),
        }
    }

    /// A transaction `day` days into 2026 debiting the customer when `sale`.
    fn txn(&self, day: i64, cents: i64, sale: bool, status: TransactionStatus) -> Transaction {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap() + Duration::days(day);
        let (debit_account, credit_account) = if sale {
            (self.receivable, self.other)
        } else {
            (self.other, self.receivable)
        };
        Transaction {
            id: TransactionId::new(),
            company: self.company,
            branch: BranchId::new(),
            customer: None,
            supplier: None,
            debit_account,
            credit_account,
            transaction_type: TransactionType::Incoming,
            category: TransactionCategory::Sale,
            number: format!("TXN-{day:012}"),
            status,
            total_amount: Decimal::new(cents, 2),
            reversal_applied: false,
            reference: None,
            description: None,
            transaction_date: at,
            created_by: UserId::new(),
            created_at: at,
            updated_at: at,
        }
    }
}

fn arb_status() -> impl Strategy<Value = TransactionStatus> {
    prop::sample::select(TransactionStatus::ALL.to_vec())
}

fn arb_moves() -> impl Strategy<Value = Vec<(i64, i64, bool, TransactionStatus)>> {
    prop::collection::vec((0i64..60, 0i64..1_000_000, any::<bool>(), arb_status()), 0..30)
}

fn day(offset: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Days::new(offset)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Closing balance equals opening balance plus debits minus credits.
    #[test]
    fn prop_statement_closes_on_running_balance(moves in arb_moves(), from in 0u64..40) {
        let book = Book::new();
        let mut txns: Vec<Transaction> = moves
            .iter()
            .map(|(d, cents, sale, status)| book.txn(*d, *cents, *sale, *status))
            .collect();
        txns.sort_by_key(|txn| txn.transaction_date);
        let exposure = CustomerExposure::new([book.receivable]);
        let range = DateRange { from: Some(day(from)), to: None };

        let statement = CustomerStatement::build(
            book.company,
            CustomerId::new(),
            range,
            &exposure,
            &txns,
            |_| Vec::new(),
        );

        prop_assert_eq!(
            statement.closing_balance,
            statement.opening_balance + statement.total_debit - statement.total_credit
        );
        if let Some(last) = statement.lines.last() {
            prop_assert_eq!(last.balance, statement.closing_balance);
        }
        prop_assert_eq!(statement.closing_balance, exposure.net(&txns));
    }

    // Reversed transactions never show on a statement.
    #[test]
    fn prop_reversing_statuses_are_excluded(moves in arb_moves()) {
        let book = Book::new();
        let txns: Vec<Transaction> = moves
            .iter()
            .map(|(d, cents, sale, status)| book.txn(*d, *cents, *sale, *status))
            .collect();
        let exposure = CustomerExposure::new([book.receivable]);

        let statement = CustomerStatement::build(
            book.company,
            CustomerId::new(),
            DateRange::default(),
            &exposure,
            &txns,
            |_| Vec::new(),
        );

        prop_assert!(statement.lines.iter().all(|line| !line.status.is_reversing()));
        let counted = txns.iter().filter(|txn| !txn.status.is_reversing()).count();
        prop_assert_eq!(statement.lines.len(), counted);
    }
}
