//! Customer payments.
//!
//! A payment debits a bank or cash account and credits the customer's
//! primary account. It can also settle one pending credit sale of that
//! customer, which the payment must cover in full.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info};

use kasir_shared::types::{AccountId, BranchId, CompanyId, CustomerId, TransactionId, UserId};

use crate::account::{AccountOwner, AccountService};
use crate::ledger::{
    CreateTransactionRequest, LedgerService, Transaction, TransactionCategory, TransactionStatus,
    TransactionType,
};
use crate::posting::error::PostingError;
use crate::posting::payment_account;
use crate::store::{LedgerStore, StoreTx, finish};

/// Input for applying a customer payment.
#[derive(Debug, Clone)]
pub struct CustomerCreditRequest {
    /// Owning company.
    pub company: CompanyId,
    /// Branch receiving the payment.
    pub branch: BranchId,
    /// Paying customer.
    pub customer: CustomerId,
    /// Bank or cash account receiving the money.
    pub payment_account: AccountId,
    /// Amount paid.
    pub amount: Decimal,
    /// External reference, e.g. a receipt number.
    pub reference: Option<String>,
    /// Pending credit sale to settle.
    pub settle: Option<TransactionId>,
}

/// Result of applying a customer payment.
#[derive(Debug, Clone)]
pub struct CustomerCreditOutcome {
    /// The payment transaction.
    pub payment: Transaction,
    /// The sale completed by this payment.
    pub settled: Option<Transaction>,
}

/// Applies customer payments.
pub struct CustomerCreditService<S: LedgerStore> {
    store: Arc<S>,
    ledger: LedgerService,
}

impl<S: LedgerStore> CustomerCreditService<S> {
    /// Creates a service over `store`.
    pub fn new(store: Arc<S>, ledger: LedgerService) -> Self {
        Self { store, ledger }
    }

    /// Records a customer payment and optionally settles a credit sale.
    pub async fn apply_customer_credit(
        &self,
        actor: UserId,
        request: CustomerCreditRequest,
    ) -> Result<CustomerCreditOutcome, PostingError> {
        let mut tx = self.store.begin().await?;
        let result = self.apply(&mut tx, actor, &request).await;
        if let Err(e) = &result {
            error!(
                customer_id = %request.customer,
                payment_account = %request.payment_account,
                amount = %request.amount,
                error = %e,
                "customer credit failed"
            );
        }
        finish(tx, result).await
    }

    async fn apply<T: StoreTx>(
        &self,
        tx: &mut T,
        actor: UserId,
        request: &CustomerCreditRequest,
    ) -> Result<CustomerCreditOutcome, PostingError> {
        if request.amount <= Decimal::ZERO {
            return Err(PostingError::NonPositiveAmount(request.amount));
        }

        let target = match request.settle {
            Some(id) => Some(Self::settlement_target(tx, request, id).await?),
            None => None,
        };

        let debit = payment_account(tx, request.payment_account, request.company).await?;
        let credit = AccountService::get_or_create_primary_account(
            tx,
            actor,
            request.company,
            request.branch,
            AccountOwner::Customer(request.customer),
        )
        .await?;

        let mut payment_request = CreateTransactionRequest::fixed(
            request.company,
            request.branch,
            debit.id,
            credit.id,
            TransactionType::Incoming,
            TransactionCategory::Payment,
            request.amount,
        );
        payment_request.customer = Some(request.customer);
        payment_request.reference.clone_from(&request.reference);
        let payment = self
            .ledger
            .create_transaction(tx, actor, payment_request)
            .await?;

        let settled = match target {
            Some(sale) => Some(self.ledger.complete(tx, actor, sale.id).await?),
            None => None,
        };

        info!(
            transaction_id = %payment.id,
            number = %payment.number,
            customer_id = %request.customer,
            amount = %payment.total_amount,
            settled = ?settled.as_ref().map(|sale| sale.id),
            "customer credit applied"
        );
        Ok(CustomerCreditOutcome { payment, settled })
    }

    async fn settlement_target<T: StoreTx>(
        tx: &mut T,
        request: &CustomerCreditRequest,
        id: TransactionId,
    ) -> Result<Transaction, PostingError> {
        let sale = LedgerService::get_transaction(tx, id).await?;
        let eligible = sale.company == request.company
            && sale.customer == Some(request.customer)
            && sale.category == TransactionCategory::Sale
            && sale.status == TransactionStatus::Pending;
        if !eligible {
            return Err(PostingError::InvalidSettlementTarget(id));
        }
        if request.amount < sale.total_amount {
            return Err(PostingError::InsufficientCredit {
                available: request.amount,
                required: sale.total_amount,
            });
        }
        Ok(sale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{Account, AccountKind};
    use crate::ledger::LedgerError;
    use crate::store::InMemoryStore;
    use crate::testing::Fixture;
    use rust_decimal_macros::dec;

    fn service(fx: &Fixture) -> CustomerCreditService<InMemoryStore> {
        CustomerCreditService::new(Arc::clone(&fx.store), fx.ledger.clone())
    }

    fn request(fx: &Fixture, customer: CustomerId, payment: &Account) -> CustomerCreditRequest {
        CustomerCreditRequest {
            company: fx.company,
            branch: fx.branch,
            customer,
            payment_account: payment.id,
            amount: dec!(50.00),
            reference: Some("RCPT-1".into()),
            settle: None,
        }
    }

    async fn credit_sale(fx: &Fixture, customer: CustomerId, amount: Decimal) -> Transaction {
        let receivable = fx
            .registry()
            .get_or_create_primary_account(
                fx.actor,
                fx.company,
                fx.branch,
                AccountOwner::Customer(customer),
            )
            .await
            .unwrap();
        let sales = fx.sales_account().await;
        let mut sale = fx.sale_request(receivable.id, sales.id, amount);
        sale.customer = Some(customer);
        fx.transactions()
            .create_transaction(fx.actor, sale)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_payment_credits_customer_primary_account() {
        let fx = Fixture::new();
        let customer = CustomerId::new();
        let cash = fx.cash_account().await;

        let outcome = service(&fx)
            .apply_customer_credit(fx.actor, request(&fx, customer, &cash))
            .await
            .unwrap();

        let payment = outcome.payment;
        let receivable = fx.registry().get_account(payment.credit_account).await.unwrap();
        assert_eq!(receivable.kind(), AccountKind::Customer);
        assert!(receivable.is_primary());
        assert_eq!(payment.category, TransactionCategory::Payment);
        assert_eq!(payment.transaction_type, TransactionType::Incoming);
        assert_eq!(payment.status, TransactionStatus::Completed);
        assert_eq!(payment.customer, Some(customer));
        assert_eq!(fx.balance(cash.id).await, dec!(50.00));
        assert_eq!(receivable.balance, dec!(-50.00));
        assert!(outcome.settled.is_none());
    }

    #[tokio::test]
    async fn test_payment_settles_pending_sale() {
        let fx = Fixture::new();
        let customer = CustomerId::new();
        let cash = fx.cash_account().await;
        let sale = credit_sale(&fx, customer, dec!(40.00)).await;
        assert_eq!(sale.status, TransactionStatus::Pending);

        let mut req = request(&fx, customer, &cash);
        req.settle = Some(sale.id);
        let outcome = service(&fx)
            .apply_customer_credit(fx.actor, req)
            .await
            .unwrap();

        let settled = outcome.settled.unwrap();
        assert_eq!(settled.id, sale.id);
        assert_eq!(settled.status, TransactionStatus::Completed);
        assert_eq!(fx.balance(sale.debit_account).await, dec!(-10.00));
    }

    #[tokio::test]
    async fn test_short_payment_does_not_settle() {
        let fx = Fixture::new();
        let customer = CustomerId::new();
        let cash = fx.cash_account().await;
        let sale = credit_sale(&fx, customer, dec!(80.00)).await;

        let mut req = request(&fx, customer, &cash);
        req.settle = Some(sale.id);
        let result = service(&fx).apply_customer_credit(fx.actor, req).await;

        assert!(matches!(
            result,
            Err(PostingError::InsufficientCredit { available, required })
                if available == dec!(50.00) && required == dec!(80.00)
        ));
        assert_eq!(fx.balance(cash.id).await, dec!(0));
        let stored = fx.transactions().get_transaction(sale.id).await.unwrap();
        assert_eq!(stored.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_other_customers_sale_is_rejected() {
        let fx = Fixture::new();
        let cash = fx.cash_account().await;
        let sale = credit_sale(&fx, CustomerId::new(), dec!(10.00)).await;

        let mut req = request(&fx, CustomerId::new(), &cash);
        req.settle = Some(sale.id);
        let result = service(&fx).apply_customer_credit(fx.actor, req).await;

        assert!(matches!(result, Err(PostingError::InvalidSettlementTarget(id)) if id == sale.id));
    }

    #[tokio::test]
    async fn test_non_payment_account_is_rejected() {
        let fx = Fixture::new();
        let sales = fx.sales_account().await;

        let result = service(&fx)
            .apply_customer_credit(fx.actor, request(&fx, CustomerId::new(), &sales))
            .await;

        assert!(matches!(result, Err(PostingError::InvalidPaymentAccount(id)) if id == sales.id));
    }

    #[tokio::test]
    async fn test_zero_amount_is_rejected() {
        let fx = Fixture::new();
        let cash = fx.cash_account().await;
        let mut req = request(&fx, CustomerId::new(), &cash);
        req.amount = dec!(0);

        let result = service(&fx).apply_customer_credit(fx.actor, req).await;

        assert!(matches!(result, Err(PostingError::NonPositiveAmount(_))));
    }

    #[tokio::test]
    async fn test_repeated_payment_is_a_duplicate() {
        let fx = Fixture::new();
        let customer = CustomerId::new();
        let cash = fx.cash_account().await;
        let service = service(&fx);
        service
            .apply_customer_credit(fx.actor, request(&fx, customer, &cash))
            .await
            .unwrap();

        let again = service
            .apply_customer_credit(fx.actor, request(&fx, customer, &cash))
            .await;

        assert!(matches!(
            again,
            Err(PostingError::Ledger(LedgerError::DuplicateTransaction { .. }))
        ));
        assert_eq!(fx.balance(cash.id).await, dec!(50.00));
    }
}
