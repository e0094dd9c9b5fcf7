//! Report generation service.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use kasir_shared::types::{AccountId, BranchId, CompanyId, CustomerId, round_money, zero_money};

use crate::account::{AccountFilter, AccountKind, AccountOwner};
use crate::ledger::{Transaction, TransactionFilter};
use crate::reports::error::ReportError;
use crate::reports::types::{CustomerExposure, CustomerStatement, DateRange};
use crate::store::{LedgerStore, StoreTx, finish};

/// Read-only reports over a store, one unit of work per call.
pub struct ReportService<S: LedgerStore> {
    store: Arc<S>,
}

impl<S: LedgerStore> ReportService<S> {
    /// Creates a service over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Sum of the amounts held by write-off accounts; `0.00` when there are none.
    pub async fn total_written_off(
        &self,
        company: CompanyId,
        branch: Option<BranchId>,
    ) -> Result<Decimal, ReportError> {
        let mut tx = self.store.begin().await?;
        let result: Result<Decimal, ReportError> = async {
            let accounts = tx
                .list_accounts(&AccountFilter {
                    company: Some(company),
                    branch,
                    kind: Some(AccountKind::WriteOff),
                    owner: None,
                })
                .await?;
            Ok(round_money(
                accounts
                    .iter()
                    .filter_map(|account| account.details.written_off_amount())
                    .fold(zero_money(), |acc, v| acc + v),
            ))
        }
        .await;
        finish(tx, result).await
    }

    /// Debits to a customer's accounts minus credits within `range`.
    pub async fn customer_outstanding_balance(
        &self,
        company: CompanyId,
        customer: CustomerId,
        range: DateRange,
    ) -> Result<Decimal, ReportError> {
        range.validate()?;
        let mut tx = self.store.begin().await?;
        let result: Result<Decimal, ReportError> = async {
            let exposure = Self::exposure(&mut tx, company, customer).await?;
            if exposure.is_empty() {
                return Ok(zero_money());
            }
            let txns = Self::company_transactions(&mut tx, company, range).await?;
            Ok(exposure.net(&txns))
        }
        .await;
        finish(tx, result).await
    }

    /// Statement of a customer's account movements within `range`.
    pub async fn customer_statement(
        &self,
        company: CompanyId,
        customer: CustomerId,
        range: DateRange,
    ) -> Result<CustomerStatement, ReportError> {
        range.validate()?;
        let mut tx = self.store.begin().await?;
        let result: Result<CustomerStatement, ReportError> = async {
            let exposure = Self::exposure(&mut tx, company, customer).await?;
            let history = DateRange {
                from: None,
                to: range.to,
            };
            let txns: Vec<Transaction> = Self::company_transactions(&mut tx, company, history)
                .await?
                .into_iter()
                .filter(|txn| exposure.counts(txn))
                .collect();

            let mut items = std::collections::HashMap::new();
            for txn in txns
                .iter()
                .filter(|txn| range.contains(txn.transaction_date.date_naive()))
            {
                items.insert(txn.id, tx.list_items(txn.id).await?);
            }

            let statement = CustomerStatement::build(
                company,
                customer,
                range,
                &exposure,
                &txns,
                |id| items.remove(&id).unwrap_or_default(),
            );
            debug!(
                %company,
                %customer,
                lines = statement.lines.len(),
                closing = %statement.closing_balance,
                "customer statement built"
            );
            Ok(statement)
        }
        .await;
        finish(tx, result).await
    }

    /// Transactions touching an account within `range`, oldest first.
    pub async fn account_activity(
        &self,
        account: AccountId,
        range: DateRange,
    ) -> Result<Vec<Transaction>, ReportError> {
        range.validate()?;
        let mut tx = self.store.begin().await?;
        let result: Result<Vec<Transaction>, ReportError> = async {
            tx.get_account(account)
                .await?
                .ok_or(ReportError::AccountNotFound(account))?;
            Ok(tx
                .find_transactions(&TransactionFilter {
                    account: Some(account),
                    date_from: range.from,
                    date_to: range.to,
                    ..Default::default()
                })
                .await?)
        }
        .await;
        finish(tx, result).await
    }

    async fn exposure<T: StoreTx>(
        tx: &mut T,
        company: CompanyId,
        customer: CustomerId,
    ) -> Result<CustomerExposure, ReportError> {
        let accounts = tx
            .list_accounts(&AccountFilter {
                company: Some(company),
                owner: Some(AccountOwner::Customer(customer)),
                ..Default::default()
            })
            .await?;
        Ok(CustomerExposure::new(accounts.iter().map(|a| a.id)))
    }

    async fn company_transactions<T: StoreTx>(
        tx: &mut T,
        company: CompanyId,
        range: DateRange,
    ) -> Result<Vec<Transaction>, ReportError> {
        Ok(tx
            .find_transactions(&TransactionFilter {
                company: Some(company),
                date_from: range.from,
                date_to: range.to,
                ..Default::default()
            })
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{NewWriteOff, NewWriteOffItem};
    use crate::ledger::TransactionStatus;
    use crate::posting::{CustomerCreditRequest, CustomerCreditService, WriteOffService};
    use crate::store::InMemoryStore;
    use crate::testing::Fixture;
    use chrono::{Duration, Utc};
    use kasir_shared::types::TransactionId;
    use rust_decimal_macros::dec;

    fn reports(fx: &Fixture) -> ReportService<InMemoryStore> {
        ReportService::new(Arc::clone(&fx.store))
    }

    async fn receivable(fx: &Fixture, customer: CustomerId) -> AccountId {
        fx.registry()
            .get_or_create_primary_account(
                fx.actor,
                fx.company,
                fx.branch,
                AccountOwner::Customer(customer),
            )
            .await
            .unwrap()
            .id
    }

    async fn credit_sale(fx: &Fixture, customer: CustomerId, amount: Decimal) -> Transaction {
        let debit = receivable(fx, customer).await;
        let sales = fx.sales_account().await;
        let mut request = fx.sale_request(debit, sales.id, amount);
        request.customer = Some(customer);
        fx.transactions()
            .create_transaction(fx.actor, request)
            .await
            .unwrap()
    }

    async fn pay(fx: &Fixture, customer: CustomerId, amount: Decimal) {
        let cash = fx.cash_account().await;
        CustomerCreditService::new(Arc::clone(&fx.store), fx.ledger.clone())
            .apply_customer_credit(
                fx.actor,
                CustomerCreditRequest {
                    company: fx.company,
                    branch: fx.branch,
                    customer,
                    payment_account: cash.id,
                    amount,
                    reference: None,
                    settle: None,
                },
            )
            .await
            .unwrap();
    }

    async fn backdate(fx: &Fixture, id: TransactionId, days: i64) {
        let mut tx = fx.store.begin().await.unwrap();
        let mut txn = tx.get_transaction(id).await.unwrap().unwrap();
        txn.transaction_date -= Duration::days(days);
        tx.update_transaction(&txn).await.unwrap();
        tx.commit().await.unwrap();
    }

    async fn written_off(fx: &Fixture, branch: BranchId, quantity: Decimal, unit_cost: Decimal) {
        let service = WriteOffService::new(Arc::clone(&fx.store), fx.ledger.clone());
        let write_off = service
            .create_write_off(
                fx.actor,
                NewWriteOff {
                    company: fx.company,
                    branch,
                    reason: Some("Damaged".into()),
                },
            )
            .await
            .unwrap();
        service
            .add_item(
                fx.actor,
                write_off.id,
                NewWriteOffItem {
                    product: None,
                    product_name: "Eggs (tray)".into(),
                    quantity,
                    unit_cost,
                },
            )
            .await
            .unwrap();
        service.post_write_off(fx.actor, write_off.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_total_written_off_sums_posted_write_offs_per_branch() {
        let fx = Fixture::new();
        let other_branch = BranchId::new();
        written_off(&fx, fx.branch, dec!(3), dec!(10.00)).await;
        written_off(&fx, fx.branch, dec!(2), dec!(2.25)).await;
        written_off(&fx, other_branch, dec!(1), dec!(40.00)).await;
        let reports = reports(&fx);

        let company = reports.total_written_off(fx.company, None).await.unwrap();
        let own = reports
            .total_written_off(fx.company, Some(fx.branch))
            .await
            .unwrap();
        let other = reports
            .total_written_off(fx.company, Some(other_branch))
            .await
            .unwrap();
        let foreign = reports
            .total_written_off(CompanyId::new(), None)
            .await
            .unwrap();

        assert_eq!(company, dec!(74.50));
        assert_eq!(own, dec!(34.50));
        assert_eq!(other, dec!(40.00));
        assert_eq!(foreign, dec!(0.00));
    }

    #[tokio::test]
    async fn test_total_written_off_defaults_to_zero() {
        let fx = Fixture::new();

        let total = reports(&fx).total_written_off(fx.company, None).await.unwrap();

        assert_eq!(total, dec!(0.00));
        assert_eq!(total.scale(), 2);
    }

    #[tokio::test]
    async fn test_outstanding_balance_nets_sales_and_payments() {
        let fx = Fixture::new();
        let customer = CustomerId::new();
        credit_sale(&fx, customer, dec!(120.00)).await;
        credit_sale(&fx, customer, dec!(30.00)).await;
        pay(&fx, customer, dec!(100.00)).await;
        credit_sale(&fx, CustomerId::new(), dec!(999.00)).await;

        let balance = reports(&fx)
            .customer_outstanding_balance(fx.company, customer, DateRange::default())
            .await
            .unwrap();

        assert_eq!(balance, dec!(50.00));
    }

    #[tokio::test]
    async fn test_outstanding_balance_skips_voided_sales() {
        let fx = Fixture::new();
        let customer = CustomerId::new();
        credit_sale(&fx, customer, dec!(20.00)).await;
        let voided = credit_sale(&fx, customer, dec!(70.00)).await;
        fx.transactions()
            .change_status(fx.actor, voided.id, TransactionStatus::Voided)
            .await
            .unwrap();

        let balance = reports(&fx)
            .customer_outstanding_balance(fx.company, customer, DateRange::default())
            .await
            .unwrap();

        assert_eq!(balance, dec!(20.00));
    }

    #[tokio::test]
    async fn test_customer_without_accounts_owes_nothing() {
        let fx = Fixture::new();

        let balance = reports(&fx)
            .customer_outstanding_balance(fx.company, CustomerId::new(), DateRange::default())
            .await
            .unwrap();

        assert_eq!(balance, dec!(0.00));
    }

    #[tokio::test]
    async fn test_statement_carries_opening_balance() {
        let fx = Fixture::new();
        let customer = CustomerId::new();
        let old = credit_sale(&fx, customer, dec!(40.00)).await;
        backdate(&fx, old.id, 45).await;
        let recent = credit_sale(&fx, customer, dec!(15.00)).await;
        pay(&fx, customer, dec!(25.00)).await;

        let today = Utc::now().date_naive();
        let range = DateRange::between(today - Duration::days(7), today);
        let statement = reports(&fx)
            .customer_statement(fx.company, customer, range)
            .await
            .unwrap();

        assert_eq!(statement.opening_balance, dec!(40.00));
        assert_eq!(statement.lines.len(), 2);
        assert_eq!(statement.lines[0].transaction_id, recent.id);
        assert_eq!(statement.lines[0].debit, dec!(15.00));
        assert_eq!(statement.lines[0].balance, dec!(55.00));
        assert_eq!(statement.lines[1].credit, dec!(25.00));
        assert_eq!(statement.lines[1].balance, dec!(30.00));
        assert_eq!(statement.total_debit, dec!(15.00));
        assert_eq!(statement.total_credit, dec!(25.00));
        assert_eq!(statement.closing_balance, dec!(30.00));
    }

    #[tokio::test]
    async fn test_statement_lists_items() {
        let fx = Fixture::new();
        let customer = CustomerId::new();
        let sale = credit_sale(&fx, customer, dec!(0)).await;
        fx.transactions()
            .add_item(
                fx.actor,
                sale.id,
                crate::ledger::NewTransactionItem::untaxed("Tea", dec!(2), dec!(3.50)),
            )
            .await
            .unwrap();

        let statement = reports(&fx)
            .customer_statement(fx.company, customer, DateRange::default())
            .await
            .unwrap();

        assert_eq!(statement.lines.len(), 1);
        assert_eq!(statement.lines[0].items.len(), 1);
        assert_eq!(statement.lines[0].debit, dec!(7.00));
        assert_eq!(statement.closing_balance, dec!(7.00));
    }

    #[tokio::test]
    async fn test_account_activity_is_chronological() {
        let fx = Fixture::new();
        let cash = fx.cash_account().await;
        let sales = fx.sales_account().await;
        let first = fx.post_fixed(cash.id, sales.id, dec!(5.00)).await;
        backdate(&fx, first.id, 2).await;
        let second = fx.post_fixed(cash.id, sales.id, dec!(6.00)).await;

        let activity = reports(&fx)
            .account_activity(cash.id, DateRange::default())
            .await
            .unwrap();

        let ids: Vec<_> = activity.iter().map(|txn| txn.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_account_activity_of_unknown_account_fails() {
        let fx = Fixture::new();
        let id = AccountId::new();

        let result = reports(&fx).account_activity(id, DateRange::default()).await;

        assert!(matches!(result, Err(ReportError::AccountNotFound(found)) if found == id));
    }
}
