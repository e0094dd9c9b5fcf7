//! Shared fixtures for unit tests.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use kasir_shared::types::{AccountId, BranchId, CompanyId, UserId};

use crate::account::{
    Account, AccountDetails, AccountKind, AccountRegistry, NewAccount, PrimaryRule,
};
use crate::ledger::{
    CreateTransactionRequest, LedgerService, LedgerSettings, NumberSource, Transaction,
    TransactionCategory, TransactionService, TransactionType,
};
use crate::store::InMemoryStore;

/// Number source that always returns the same suffix.
pub(crate) struct FixedNumberSource(pub &'static str);

impl NumberSource for FixedNumberSource {
    fn next_suffix(&self) -> String {
        self.0.to_string()
    }
}

/// One company branch over a fresh in-memory store.
pub(crate) struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub actor: UserId,
    pub company: CompanyId,
    pub branch: BranchId,
    pub ledger: LedgerService,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_settings(LedgerSettings::default())
    }

    pub fn with_settings(settings: LedgerSettings) -> Self {
        Self::with_ledger(LedgerService::new(settings))
    }

    pub fn with_ledger(ledger: LedgerService) -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            actor: UserId::new(),
            company: CompanyId::new(),
            branch: BranchId::new(),
            ledger,
        }
    }

    pub fn registry(&self) -> AccountRegistry<InMemoryStore> {
        AccountRegistry::new(Arc::clone(&self.store))
    }

    pub fn transactions(&self) -> TransactionService<InMemoryStore> {
        TransactionService::new(Arc::clone(&self.store), self.ledger.clone())
    }

    pub async fn scope_account(&self, kind: AccountKind) -> Account {
        self.registry()
            .get_or_create_account(self.actor, self.company, self.branch, kind)
            .await
            .unwrap()
    }

    pub async fn cash_account(&self) -> Account {
        self.scope_account(AccountKind::Cash).await
    }

    pub async fn sales_account(&self) -> Account {
        self.scope_account(AccountKind::Sales).await
    }

    pub async fn purchases_account(&self) -> Account {
        self.scope_account(AccountKind::Purchases).await
    }

    pub async fn bank_account(&self) -> Account {
        self.registry()
            .create_account(
                self.actor,
                NewAccount {
                    company: self.company,
                    branch: self.branch,
                    name: "Operating account".into(),
                    details: AccountDetails::Bank {
                        bank_name: "Bank Mandiri".into(),
                        account_number: Some("1234567890".into()),
                    },
                    primary_rule: PrimaryRule::Demote,
                },
            )
            .await
            .unwrap()
    }

    /// A fixed-amount SALE request with a unique reference.
    pub fn sale_request(
        &self,
        debit: AccountId,
        credit: AccountId,
        amount: Decimal,
    ) -> CreateTransactionRequest {
        let mut request = CreateTransactionRequest::fixed(
            self.company,
            self.branch,
            debit,
            credit,
            TransactionType::Incoming,
            TransactionCategory::Sale,
            amount,
        );
        request.reference = Some(format!("REF-{}", Uuid::new_v4().simple()));
        request
    }

    /// Records a PENDING sale of `amount`.
    pub async fn post_fixed(
        &self,
        debit: AccountId,
        credit: AccountId,
        amount: Decimal,
    ) -> Transaction {
        self.transactions()
            .create_transaction(self.actor, self.sale_request(debit, credit, amount))
            .await
            .unwrap()
    }

    pub async fn balance(&self, id: AccountId) -> Decimal {
        self.registry().get_account(id).await.unwrap().balance
    }
}
