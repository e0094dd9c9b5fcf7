//! Account registry operations.
//!
//! [`AccountService`] holds the operations as associated functions over an
//! open unit of work, so posting orchestrators can compose them with ledger
//! writes. [`AccountRegistry`] wraps each one in its own unit of work for
//! callers that only touch accounts.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info};

use kasir_shared::types::{AccountId, BranchId, CompanyId, StockWriteOffId, UserId};

use crate::account::error::AccountError;
use crate::account::primary::{plan_primary, promotion_candidate};
use crate::account::types::{
    Account, AccountDetails, AccountFilter, AccountKind, AccountOwner, AccountUpdate, NewAccount,
    PrimaryRule,
};
use crate::audit::{AuditEntity, AuditRecord};
use crate::store::{LedgerStore, PRIMARY_ACCOUNT_CONSTRAINT, StoreError, StoreTx, finish};

/// Stateless account operations over an open unit of work.
pub struct AccountService;

impl AccountService {
    /// Fetches an account or fails with `AccountNotFound`.
    pub async fn get<T: StoreTx>(tx: &mut T, id: AccountId) -> Result<Account, AccountError> {
        tx.get_account(id)
            .await?
            .ok_or(AccountError::AccountNotFound(id))
    }

    /// Lists accounts matching a filter.
    pub async fn list<T: StoreTx>(
        tx: &mut T,
        filter: &AccountFilter,
    ) -> Result<Vec<Account>, AccountError> {
        Ok(tx.list_accounts(filter).await?)
    }

    /// Creates an account, enforcing the primary rule for owner accounts.
    pub async fn create<T: StoreTx>(
        tx: &mut T,
        actor: UserId,
        input: NewAccount,
    ) -> Result<Account, AccountError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AccountError::NameRequired);
        }
        Self::ensure_write_off_mutable(tx, &input.details).await?;

        let account = Account::new(input.company, input.branch, name, input.details);
        Self::apply_primary_rule(tx, actor, &account, input.primary_rule).await?;

        tx.insert_account(&account)
            .await
            .map_err(|e| Self::translate_primary(e, &account))?;
        tx.record_audit(&AuditRecord::created(
            actor,
            AuditEntity::Account,
            account.id,
            &account,
        )?)
        .await?;

        debug!(account_id = %account.id, kind = %account.kind(), "account created");
        Ok(account)
    }

    /// Updates the name or subtype data of an account.
    pub async fn update<T: StoreTx>(
        tx: &mut T,
        actor: UserId,
        input: AccountUpdate,
    ) -> Result<Account, AccountError> {
        let before = Self::get(tx, input.id).await?;
        Self::ensure_write_off_mutable(tx, &before.details).await?;

        let mut after = before.clone();
        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AccountError::NameRequired);
            }
            after.name = name;
        }
        if let Some(details) = input.details {
            if details.kind() != before.kind() {
                return Err(AccountError::KindChangeNotAllowed(before.id));
            }
            Self::ensure_write_off_mutable(tx, &details).await?;
            after.details = details;
        }
        after.updated_at = Utc::now();

        Self::apply_primary_rule(tx, actor, &after, input.primary_rule).await?;
        Self::save(tx, actor, &before, &after).await?;

        debug!(account_id = %after.id, "account updated");
        Ok(after)
    }

    /// Deletes an account that no transaction references.
    pub async fn delete<T: StoreTx>(
        tx: &mut T,
        actor: UserId,
        id: AccountId,
    ) -> Result<(), AccountError> {
        let account = Self::get(tx, id).await?;
        Self::ensure_write_off_mutable(tx, &account.details).await?;
        if tx.account_has_transactions(id).await? {
            return Err(AccountError::AccountInUse(id));
        }

        tx.delete_account(id).await?;
        tx.record_audit(&AuditRecord::deleted(
            actor,
            AuditEntity::Account,
            id,
            &account,
        )?)
        .await?;

        debug!(account_id = %id, "account deleted");
        Ok(())
    }

    /// Persists a changed account and audits the change.
    ///
    /// Balance movements from the ledger go through here too.
    pub async fn save<T: StoreTx>(
        tx: &mut T,
        actor: UserId,
        before: &Account,
        after: &Account,
    ) -> Result<(), AccountError> {
        tx.update_account(after)
            .await
            .map_err(|e| Self::translate_primary(e, after))?;
        tx.record_audit(&AuditRecord::updated(
            actor,
            AuditEntity::Account,
            after.id,
            before,
            after,
        )?)
        .await?;
        Ok(())
    }

    /// Returns the shared account of `kind` for a company branch, creating it if needed.
    ///
    /// Only cash, expense, sales, purchases and write-off pool accounts are shared.
    pub async fn get_or_create_account<T: StoreTx>(
        tx: &mut T,
        actor: UserId,
        company: CompanyId,
        branch: BranchId,
        kind: AccountKind,
    ) -> Result<Account, AccountError> {
        let details = AccountDetails::for_scope(kind).ok_or(AccountError::NotScopeKind(kind))?;

        tx.lock_key(&format!("account-scope:{company}:{branch}:{kind}"))
            .await?;
        if let Some(account) = tx.find_scope_account(company, branch, kind).await? {
            return Ok(account);
        }

        let account = Self::create(
            tx,
            actor,
            NewAccount {
                company,
                branch,
                name: kind.default_name().to_string(),
                details,
                primary_rule: PrimaryRule::Demote,
            },
        )
        .await?;
        info!(account_id = %account.id, %company, %branch, %kind, "scope account created");
        Ok(account)
    }

    /// Returns the primary account of `owner` within a company.
    ///
    /// If the owner has accounts but none is primary, the oldest is promoted.
    /// If it has none, a primary account is created in `branch`.
    pub async fn get_or_create_primary_account<T: StoreTx>(
        tx: &mut T,
        actor: UserId,
        company: CompanyId,
        branch: BranchId,
        owner: AccountOwner,
    ) -> Result<Account, AccountError> {
        let siblings: Vec<Account> = Self::lock_owner(tx, owner)
            .await?
            .into_iter()
            .filter(|account| account.company == company)
            .collect();

        if let Some(primary) = siblings.iter().find(|account| account.is_primary()) {
            return Ok(primary.clone());
        }

        if let Some(candidate) = promotion_candidate(&siblings) {
            let before = candidate.clone();
            let mut after = before.clone();
            after.details.set_primary(true);
            after.updated_at = Utc::now();
            Self::save(tx, actor, &before, &after).await?;
            info!(account_id = %after.id, %owner, "account promoted to primary");
            return Ok(after);
        }

        Self::create(
            tx,
            actor,
            NewAccount {
                company,
                branch,
                name: owner.kind().default_name().to_string(),
                details: AccountDetails::for_owner(owner, true),
                primary_rule: PrimaryRule::RejectExisting,
            },
        )
        .await
    }

    /// Returns the write-off account of a write-off document, creating it if needed.
    pub async fn get_or_create_write_off_account<T: StoreTx>(
        tx: &mut T,
        actor: UserId,
        company: CompanyId,
        branch: BranchId,
        write_off: StockWriteOffId,
    ) -> Result<Account, AccountError> {
        tx.lock_key(&format!("write-off-account:{write_off}")).await?;
        if let Some(account) = tx
            .find_write_off_accounts(write_off)
            .await?
            .into_iter()
            .next()
        {
            return Ok(account);
        }

        Self::create(
            tx,
            actor,
            NewAccount {
                company,
                branch,
                name: format!("Write-off {write_off}"),
                details: AccountDetails::WriteOff {
                    write_off: Some(write_off),
                    amount: kasir_shared::types::zero_money(),
                },
                primary_rule: PrimaryRule::Demote,
            },
        )
        .await
    }

    /// Sets the value held by a write-off account.
    ///
    /// Used while posting, before the write-off is marked POSTED.
    pub async fn record_written_off<T: StoreTx>(
        tx: &mut T,
        actor: UserId,
        id: AccountId,
        amount: Decimal,
    ) -> Result<Account, AccountError> {
        let before = Self::get(tx, id).await?;
        Self::ensure_write_off_mutable(tx, &before.details).await?;

        let mut after = before.clone();
        if let AccountDetails::WriteOff { amount: held, .. } = &mut after.details {
            *held = amount;
        }
        after.updated_at = Utc::now();
        Self::save(tx, actor, &before, &after).await?;
        Ok(after)
    }

    /// Serialises primary-flag changes of one owner, including its first account.
    async fn lock_owner<T: StoreTx>(
        tx: &mut T,
        owner: AccountOwner,
    ) -> Result<Vec<Account>, AccountError> {
        tx.lock_key(&format!("account-owner:{owner}")).await?;
        Ok(tx.lock_owner_accounts(owner).await?)
    }

    async fn apply_primary_rule<T: StoreTx>(
        tx: &mut T,
        actor: UserId,
        incoming: &Account,
        rule: PrimaryRule,
    ) -> Result<(), AccountError> {
        let Some(owner) = incoming.owner() else {
            return Ok(());
        };
        if !incoming.is_primary() {
            return Ok(());
        }

        let siblings = Self::lock_owner(tx, owner).await?;
        let plan = plan_primary(owner, &siblings, incoming.id, true, rule)?;

        for sibling in siblings.iter().filter(|a| plan.demote.contains(&a.id)) {
            let mut demoted = sibling.clone();
            demoted.details.set_primary(false);
            demoted.updated_at = Utc::now();
            Self::save(tx, actor, sibling, &demoted).await?;
            debug!(account_id = %demoted.id, %owner, "primary account demoted");
        }
        Ok(())
    }

    async fn ensure_write_off_mutable<T: StoreTx>(
        tx: &mut T,
        details: &AccountDetails,
    ) -> Result<(), AccountError> {
        let Some(write_off_id) = details.write_off() else {
            return Ok(());
        };
        let write_off = tx
            .get_write_off(write_off_id)
            .await?
            .ok_or(AccountError::WriteOffNotFound(write_off_id))?;
        if write_off.is_posted() {
            return Err(AccountError::WriteOffPosted(write_off_id));
        }
        Ok(())
    }

    fn translate_primary(err: StoreError, account: &Account) -> AccountError {
        match account.owner() {
            Some(owner) if err.violates(PRIMARY_ACCOUNT_CONSTRAINT) => {
                AccountError::DuplicatePrimary {
                    owner,
                    existing: None,
                }
            }
            _ => AccountError::Store(err),
        }
    }
}

/// Account registry backed by a store, one unit of work per call.
pub struct AccountRegistry<S: LedgerStore> {
    store: Arc<S>,
}

impl<S: LedgerStore> AccountRegistry<S> {
    /// Creates a registry over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Fetches an account.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, AccountError> {
        let mut tx = self.store.begin().await?;
        let result = AccountService::get(&mut tx, id).await;
        finish(tx, result).await
    }

    /// Lists accounts matching a filter.
    pub async fn list_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>, AccountError> {
        let mut tx = self.store.begin().await?;
        let result = AccountService::list(&mut tx, filter).await;
        finish(tx, result).await
    }

    /// Creates an account.
    pub async fn create_account(
        &self,
        actor: UserId,
        input: NewAccount,
    ) -> Result<Account, AccountError> {
        let mut tx = self.store.begin().await?;
        let result = AccountService::create(&mut tx, actor, input).await;
        finish(tx, result).await
    }

    /// Updates an account.
    pub async fn update_account(
        &self,
        actor: UserId,
        input: AccountUpdate,
    ) -> Result<Account, AccountError> {
        let mut tx = self.store.begin().await?;
        let result = AccountService::update(&mut tx, actor, input).await;
        finish(tx, result).await
    }

    /// Deletes an account.
    pub async fn delete_account(&self, actor: UserId, id: AccountId) -> Result<(), AccountError> {
        let mut tx = self.store.begin().await?;
        let result = AccountService::delete(&mut tx, actor, id).await;
        finish(tx, result).await
    }

    /// Returns the shared account of `kind` for a company branch.
    pub async fn get_or_create_account(
        &self,
        actor: UserId,
        company: CompanyId,
        branch: BranchId,
        kind: AccountKind,
    ) -> Result<Account, AccountError> {
        let mut tx = self.store.begin().await?;
        let result =
            AccountService::get_or_create_account(&mut tx, actor, company, branch, kind).await;
        finish(tx, result).await
    }

    /// Returns the primary account of an owner.
    pub async fn get_or_create_primary_account(
        &self,
        actor: UserId,
        company: CompanyId,
        branch: BranchId,
        owner: AccountOwner,
    ) -> Result<Account, AccountError> {
        let mut tx = self.store.begin().await?;
        let result =
            AccountService::get_or_create_primary_account(&mut tx, actor, company, branch, owner)
                .await;
        finish(tx, result).await
    }

    /// Returns the write-off account of a write-off document.
    pub async fn get_or_create_write_off_account(
        &self,
        actor: UserId,
        company: CompanyId,
        branch: BranchId,
        write_off: StockWriteOffId,
    ) -> Result<Account, AccountError> {
        let mut tx = self.store.begin().await?;
        let result = AccountService::get_or_create_write_off_account(
            &mut tx, actor, company, branch, write_off,
        )
        .await;
        finish(tx, result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::primary::primary_count;
    use crate::audit::AuditAction;
    use crate::testing::Fixture;
    use kasir_shared::types::CustomerId;

    fn customer_account(fx: &Fixture, customer: CustomerId, primary: bool) -> NewAccount {
        NewAccount {
            company: fx.company,
            branch: fx.branch,
            name: "Receivable".into(),
            details: AccountDetails::for_owner(AccountOwner::Customer(customer), primary),
            primary_rule: PrimaryRule::Demote,
        }
    }

    async fn owner_accounts(fx: &Fixture, owner: AccountOwner) -> Vec<Account> {
        fx.registry()
            .list_accounts(&AccountFilter {
                owner: Some(owner),
                ..AccountFilter::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_second_primary_demotes_first() {
        let fx = Fixture::new();
        let registry = fx.registry();
        let customer = CustomerId::new();
        let owner = AccountOwner::Customer(customer);

        let a = registry
            .create_account(fx.actor, customer_account(&fx, customer, true))
            .await
            .unwrap();
        let b = registry
            .create_account(fx.actor, customer_account(&fx, customer, true))
            .await
            .unwrap();

        let accounts = owner_accounts(&fx, owner).await;
        assert_eq!(primary_count(&accounts, owner), 1);
        assert!(!registry.get_account(a.id).await.unwrap().is_primary());
        assert!(registry.get_account(b.id).await.unwrap().is_primary());
    }

    #[tokio::test]
    async fn test_reject_rule_keeps_existing_primary() {
        let fx = Fixture::new();
        let registry = fx.registry();
        let customer = CustomerId::new();
        let a = registry
            .create_account(fx.actor, customer_account(&fx, customer, true))
            .await
            .unwrap();

        let mut input = customer_account(&fx, customer, true);
        input.primary_rule = PrimaryRule::RejectExisting;
        let result = registry.create_account(fx.actor, input).await;

        assert!(matches!(
            result,
            Err(AccountError::DuplicatePrimary { existing: Some(id), .. }) if id == a.id
        ));
        assert!(registry.get_account(a.id).await.unwrap().is_primary());
    }

    #[tokio::test]
    async fn test_updating_current_primary_keeps_it_primary() {
        let fx = Fixture::new();
        let registry = fx.registry();
        let customer = CustomerId::new();
        let a = registry
            .create_account(fx.actor, customer_account(&fx, customer, true))
            .await
            .unwrap();

        let updated = registry
            .update_account(
                fx.actor,
                AccountUpdate {
                    id: a.id,
                    name: Some("Main receivable".into()),
                    details: None,
                    primary_rule: PrimaryRule::RejectExisting,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Main receivable");
        assert!(updated.is_primary());
    }

    #[tokio::test]
    async fn test_update_rejects_kind_change() {
        let fx = Fixture::new();
        let registry = fx.registry();
        let cash = fx.cash_account().await;

        let result = registry
            .update_account(
                fx.actor,
                AccountUpdate {
                    id: cash.id,
                    name: None,
                    details: Some(AccountDetails::Sales),
                    primary_rule: PrimaryRule::Demote,
                },
            )
            .await;

        assert!(matches!(result, Err(AccountError::KindChangeNotAllowed(id)) if id == cash.id));
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let fx = Fixture::new();
        let mut input = customer_account(&fx, CustomerId::new(), false);
        input.name = "   ".into();

        let result = fx.registry().create_account(fx.actor, input).await;
        assert!(matches!(result, Err(AccountError::NameRequired)));
    }

    #[tokio::test]
    async fn test_get_or_create_account_is_stable() {
        let fx = Fixture::new();
        let registry = fx.registry();

        let first = registry
            .get_or_create_account(fx.actor, fx.company, fx.branch, AccountKind::Purchases)
            .await
            .unwrap();
        let second = registry
            .get_or_create_account(fx.actor, fx.company, fx.branch, AccountKind::Purchases)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.name, "Purchases");
    }

    #[tokio::test]
    async fn test_get_or_create_account_rejects_owner_kinds() {
        let fx = Fixture::new();
        let result = fx
            .registry()
            .get_or_create_account(fx.actor, fx.company, fx.branch, AccountKind::Customer)
            .await;

        assert!(matches!(
            result,
            Err(AccountError::NotScopeKind(AccountKind::Customer))
        ));
    }

    #[tokio::test]
    async fn test_get_or_create_primary_promotes_existing_account() {
        let fx = Fixture::new();
        let registry = fx.registry();
        let customer = CustomerId::new();
        let existing = registry
            .create_account(fx.actor, customer_account(&fx, customer, false))
            .await
            .unwrap();

        let primary = registry
            .get_or_create_primary_account(
                fx.actor,
                fx.company,
                fx.branch,
                AccountOwner::Customer(customer),
            )
            .await
            .unwrap();

        assert_eq!(primary.id, existing.id);
        assert!(primary.is_primary());
    }

    #[tokio::test]
    async fn test_get_or_create_primary_creates_when_missing() {
        let fx = Fixture::new();
        let customer = CustomerId::new();
        let owner = AccountOwner::Customer(customer);

        let primary = fx
            .registry()
            .get_or_create_primary_account(fx.actor, fx.company, fx.branch, owner)
            .await
            .unwrap();

        assert!(primary.is_primary());
        assert_eq!(primary.owner(), Some(owner));
        assert_eq!(owner_accounts(&fx, owner).await.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_rejects_account_in_use() {
        let fx = Fixture::new();
        let cash = fx.cash_account().await;
        let sales = fx.sales_account().await;
        fx.post_fixed(cash.id, sales.id, rust_decimal_macros::dec!(10.00))
            .await;

        let result = fx.registry().delete_account(fx.actor, cash.id).await;
        assert!(matches!(result, Err(AccountError::AccountInUse(id)) if id == cash.id));
    }

    #[tokio::test]
    async fn test_delete_unused_account_is_audited() {
        let fx = Fixture::new();
        let registry = fx.registry();
        let account = registry
            .create_account(fx.actor, customer_account(&fx, CustomerId::new(), false))
            .await
            .unwrap();

        registry.delete_account(fx.actor, account.id).await.unwrap();

        assert!(matches!(
            registry.get_account(account.id).await,
            Err(AccountError::AccountNotFound(_))
        ));
        let audit = fx.store.audit_log().await;
        assert!(audit.iter().any(|r| r.entity_id == account.id.into_inner()
            && r.action == AuditAction::Delete
            && r.actor == fx.actor));
    }
}
