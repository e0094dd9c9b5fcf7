//! Demo data seeder for Kasir development and testing.
//!
//! Seeds one company branch with its shared accounts, a bank account, a
//! customer with a credit sale and a payment, and a posted write-off. All
//! rows go through the posting services, so balances and audit records are
//! the same as in production.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use rust_decimal_macros::dec;
use tracing::info;
use uuid::Uuid;

use kasir_core::account::{
    AccountDetails, AccountFilter, AccountKind, AccountOwner, AccountRegistry, NewAccount,
    PrimaryRule,
};
use kasir_core::document::{
    NewSettlementDocument, NewWriteOff, NewWriteOffItem, SettlementKind,
};
use kasir_core::ledger::{
    LedgerService, LedgerSettings, NewTransactionItem, TransactionFilter, TransactionService,
};
use kasir_core::posting::{
    CustomerCreditRequest, CustomerCreditService, SettleRequest, SettlementService,
    WriteOffService,
};
use kasir_db::SeaLedgerStore;
use kasir_shared::AppConfig;
use kasir_shared::telemetry::init_tracing;
use kasir_shared::types::{AccountId, BranchId, CompanyId, CustomerId, ProductId, UserId};

/// Demo company (consistent for all seeds)
const DEMO_COMPANY_ID: &str = "00000000-0000-0000-0000-000000000001";
/// Demo branch
const DEMO_BRANCH_ID: &str = "00000000-0000-0000-0000-000000000002";
/// User recorded as the actor of every seeded change
const DEMO_USER_ID: &str = "00000000-0000-0000-0000-000000000003";
/// Demo customer
const DEMO_CUSTOMER_ID: &str = "00000000-0000-0000-0000-000000000004";

struct Demo {
    store: Arc<SeaLedgerStore>,
    ledger: LedgerService,
    actor: UserId,
    company: CompanyId,
    branch: BranchId,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    info!("connecting to database");
    let db = kasir_db::connect(&config.database)
        .await
        .context("failed to connect to database")?;

    let demo = Demo {
        store: Arc::new(SeaLedgerStore::new(db)),
        ledger: LedgerService::new(LedgerSettings::from_config(&config.ledger)?),
        actor: UserId::from_uuid(Uuid::parse_str(DEMO_USER_ID)?),
        company: CompanyId::from_uuid(Uuid::parse_str(DEMO_COMPANY_ID)?),
        branch: BranchId::from_uuid(Uuid::parse_str(DEMO_BRANCH_ID)?),
    };

    info!("seeding accounts");
    let bank = demo.seed_accounts().await?;

    if demo.has_transactions().await? {
        info!("demo transactions already present, skipping postings");
    } else {
        info!("seeding customer sale and payment");
        demo.seed_sale(bank).await?;

        info!("seeding stock write-off");
        demo.seed_write_off().await?;
    }

    info!("seeding complete");
    Ok(())
}

impl Demo {
    fn registry(&self) -> AccountRegistry<SeaLedgerStore> {
        AccountRegistry::new(Arc::clone(&self.store))
    }

    /// Creates the shared accounts and returns the demo bank account.
    async fn seed_accounts(&self) -> anyhow::Result<AccountId> {
        let registry = self.registry();
        for kind in [
            AccountKind::Cash,
            AccountKind::Sales,
            AccountKind::Purchases,
            AccountKind::Expense,
        ] {
            let account = registry
                .get_or_create_account(self.actor, self.company, self.branch, kind)
                .await?;
            info!(account_id = %account.id, kind = %kind, "shared account ready");
        }

        let banks = registry
            .list_accounts(&AccountFilter {
                company: Some(self.company),
                branch: Some(self.branch),
                kind: Some(AccountKind::Bank),
                owner: None,
            })
            .await?;
        if let Some(bank) = banks.first() {
            return Ok(bank.id);
        }

        let bank = registry
            .create_account(
                self.actor,
                NewAccount {
                    company: self.company,
                    branch: self.branch,
                    name: "Operating account".to_string(),
                    details: AccountDetails::Bank {
                        bank_name: "Bank Central Asia".to_string(),
                        account_number: Some("8830-112-004".to_string()),
                    },
                    primary_rule: PrimaryRule::Demote,
                },
            )
            .await?;
        info!(account_id = %bank.id, "bank account created");
        Ok(bank.id)
    }

    async fn has_transactions(&self) -> anyhow::Result<bool> {
        let transactions = TransactionService::new(Arc::clone(&self.store), self.ledger.clone())
            .list_transactions(&TransactionFilter {
                company: Some(self.company),
                ..TransactionFilter::default()
            })
            .await?;
        Ok(!transactions.is_empty())
    }

    /// A sale on account followed by the customer paying it off.
    async fn seed_sale(&self, bank: AccountId) -> anyhow::Result<()> {
        let customer = CustomerId::from_uuid(Uuid::parse_str(DEMO_CUSTOMER_ID)?);
        self.registry()
            .get_or_create_primary_account(
                self.actor,
                self.company,
                self.branch,
                AccountOwner::Customer(customer),
            )
            .await?;

        let settlements = SettlementService::new(Arc::clone(&self.store), self.ledger.clone());
        let document = settlements
            .create_document(
                self.actor,
                NewSettlementDocument {
                    company: self.company,
                    branch: self.branch,
                    kind: SettlementKind::Sale,
                    reference: "INV-0001".to_string(),
                    customer: Some(customer),
                    supplier: None,
                    lines: vec![
                        NewTransactionItem {
                            product: Some(ProductId::new()),
                            product_name: "Arabica beans 1kg".to_string(),
                            quantity: dec!(2),
                            unit_price: dec!(185000),
                            tax_rate: dec!(11),
                        },
                        NewTransactionItem::untaxed("Paper filters", dec!(3), dec!(25000)),
                    ],
                },
            )
            .await?;
        let sale = settlements
            .settle(
                self.actor,
                SettleRequest {
                    document: document.id,
                    payment_account: None,
                },
            )
            .await?;
        info!(
            transaction_number = %sale.transaction.number,
            amount = %sale.transaction.total_amount,
            "credit sale recorded"
        );

        let payment = CustomerCreditService::new(Arc::clone(&self.store), self.ledger.clone())
            .apply_customer_credit(
                self.actor,
                CustomerCreditRequest {
                    company: self.company,
                    branch: self.branch,
                    customer,
                    payment_account: bank,
                    amount: sale.transaction.total_amount,
                    reference: Some("RCPT-0001".to_string()),
                    settle: Some(sale.transaction.id),
                },
            )
            .await?;
        info!(
            transaction_number = %payment.payment.number,
            "customer payment recorded"
        );
        Ok(())
    }

    async fn seed_write_off(&self) -> anyhow::Result<()> {
        let write_offs = WriteOffService::new(Arc::clone(&self.store), self.ledger.clone());
        let write_off = write_offs
            .create_write_off(
                self.actor,
                NewWriteOff {
                    company: self.company,
                    branch: self.branch,
                    reason: Some("Expired stock".to_string()),
                },
            )
            .await?;
        write_offs
            .add_item(
                self.actor,
                write_off.id,
                NewWriteOffItem {
                    product: Some(ProductId::new()),
                    product_name: "Fresh milk 1L".to_string(),
                    quantity: dec!(6),
                    unit_cost: dec!(18500),
                },
            )
            .await?;
        let posted = write_offs.post_write_off(self.actor, write_off.id).await?;
        info!(
            write_off_id = %posted.write_off.id,
            amount = %posted.transaction.total_amount,
            "write-off posted"
        );
        Ok(())
    }
}
