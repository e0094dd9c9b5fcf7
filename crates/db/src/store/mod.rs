//! PostgreSQL adapter for the ledger storage port.
//!
//! [`SeaLedgerStore`] opens one database transaction per unit of work and
//! [`SeaStoreTx`] runs every [`StoreTx`] operation inside it. Locks taken via
//! `lock_key` and `lock_owner_accounts` are released at commit or rollback.
//!
//! Row ordering mirrors [`kasir_core::store::InMemoryStore`] so that services
//! behave the same on both adapters.

mod error;
pub mod mapping;

use async_trait::async_trait;
use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Statement,
    TransactionTrait, Value,
};
use tracing::debug;
use uuid::Uuid;

use kasir_core::account::{Account, AccountFilter, AccountKind, AccountOwner};
use kasir_core::audit::AuditRecord;
use kasir_core::document::{SettlementDocument, StockTake, StockWriteOff};
use kasir_core::ledger::{Transaction, TransactionFilter, TransactionItem};
use kasir_core::store::{LedgerStore, StoreError, StoreTx};
use kasir_shared::types::{
    AccountId, BranchId, CompanyId, DocumentId, StockTakeId, StockWriteOffId, TransactionId,
    TransactionItemId,
};

use crate::entities::{
    accounts, audit_log, settlement_documents, stock_take_lines, stock_takes,
    stock_write_off_items, stock_write_offs, transaction_items, transactions,
};
use error::db_err;
use mapping::{
    account_from_row, account_row, audit_row, item_from_row, item_row, settlement_from_row,
    settlement_row, stock_take_from_rows, stock_take_rows, transaction_from_row, transaction_row,
    write_off_from_rows, write_off_rows,
};

/// Ledger store backed by a `SeaORM` connection pool.
#[derive(Debug, Clone)]
pub struct SeaLedgerStore {
    db: DatabaseConnection,
}

impl SeaLedgerStore {
    /// Wraps a connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for SeaLedgerStore {
    type Tx = SeaStoreTx;

    async fn begin(&self) -> Result<SeaStoreTx, StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        Ok(SeaStoreTx { txn })
    }
}

/// One database transaction.
///
/// Dropping it without calling `commit` rolls the transaction back.
pub struct SeaStoreTx {
    txn: DatabaseTransaction,
}

impl SeaStoreTx {
    /// Returns the underlying transaction for ad-hoc queries.
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    async fn accounts(&self, query: Select<accounts::Entity>) -> Result<Vec<Account>, StoreError> {
        query
            .order_by_asc(accounts::Column::CreatedAt)
            .order_by_asc(accounts::Column::Id)
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(account_from_row)
            .collect()
    }

    async fn write_off_items(
        &self,
        write_off: Uuid,
    ) -> Result<Vec<stock_write_off_items::Model>, StoreError> {
        stock_write_off_items::Entity::find()
            .filter(stock_write_off_items::Column::WriteOffId.eq(write_off))
            .order_by_asc(stock_write_off_items::Column::Position)
            .all(&self.txn)
            .await
            .map_err(db_err)
    }

    async fn stock_take_lines(
        &self,
        stock_take: Uuid,
    ) -> Result<Vec<stock_take_lines::Model>, StoreError> {
        stock_take_lines::Entity::find()
            .filter(stock_take_lines::Column::StockTakeId.eq(stock_take))
            .order_by_asc(stock_take_lines::Column::Position)
            .all(&self.txn)
            .await
            .map_err(db_err)
    }

    async fn replace_write_off_items(
        &self,
        write_off: Uuid,
        items: Vec<stock_write_off_items::ActiveModel>,
    ) -> Result<(), StoreError> {
        stock_write_off_items::Entity::delete_many()
            .filter(stock_write_off_items::Column::WriteOffId.eq(write_off))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        if !items.is_empty() {
            stock_write_off_items::Entity::insert_many(items)
                .exec_without_returning(&self.txn)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    async fn replace_stock_take_lines(
        &self,
        stock_take: Uuid,
        lines: Vec<stock_take_lines::ActiveModel>,
    ) -> Result<(), StoreError> {
        stock_take_lines::Entity::delete_many()
            .filter(stock_take_lines::Column::StockTakeId.eq(stock_take))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        if !lines.is_empty() {
            stock_take_lines::Entity::insert_many(lines)
                .exec_without_returning(&self.txn)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }
}

/// Fails with [`StoreError::RowNotFound`] when an update touched nothing.
fn ensure_updated(rows_affected: u64, table: &'static str, id: Uuid) -> Result<(), StoreError> {
    if rows_affected == 0 {
        return Err(StoreError::RowNotFound { table, id });
    }
    Ok(())
}

fn account_condition(filter: &AccountFilter) -> Condition {
    let mut condition = Condition::all();
    if let Some(company) = filter.company {
        condition = condition.add(accounts::Column::CompanyId.eq(company.into_inner()));
    }
    if let Some(branch) = filter.branch {
        condition = condition.add(accounts::Column::BranchId.eq(branch.into_inner()));
    }
    if let Some(kind) = filter.kind {
        condition = condition.add(accounts::Column::Kind.eq(kind.as_str()));
    }
    if let Some(owner) = filter.owner {
        condition = condition.add(owner_condition(owner));
    }
    condition
}

fn owner_condition(owner: AccountOwner) -> Condition {
    Condition::all()
        .add(accounts::Column::Kind.eq(owner.kind().as_str()))
        .add(accounts::Column::OwnerId.eq(owner.id()))
}

/// Start of a UTC calendar day.
fn day_start(date: NaiveDate) -> DateTime<FixedOffset> {
    date.and_time(NaiveTime::MIN).and_utc().fixed_offset()
}

/// Translates a filter into SQL. Dates compare against UTC calendar days.
fn transaction_condition(filter: &TransactionFilter) -> Condition {
    use transactions::Column;

    let mut condition = Condition::all();
    if let Some(company) = filter.company {
        condition = condition.add(Column::CompanyId.eq(company.into_inner()));
    }
    if let Some(branch) = filter.branch {
        condition = condition.add(Column::BranchId.eq(branch.into_inner()));
    }
    if let Some(customer) = filter.customer {
        condition = condition.add(Column::CustomerId.eq(customer.into_inner()));
    }
    if let Some(supplier) = filter.supplier {
        condition = condition.add(Column::SupplierId.eq(supplier.into_inner()));
    }
    if let Some(debit) = filter.debit_account {
        condition = condition.add(Column::DebitAccountId.eq(debit.into_inner()));
    }
    if let Some(credit) = filter.credit_account {
        condition = condition.add(Column::CreditAccountId.eq(credit.into_inner()));
    }
    if let Some(account) = filter.account {
        condition = condition.add(
            Condition::any()
                .add(Column::DebitAccountId.eq(account.into_inner()))
                .add(Column::CreditAccountId.eq(account.into_inner())),
        );
    }
    if let Some(category) = filter.category {
        condition = condition.add(Column::Category.eq(category.as_str()));
    }
    if let Some(status) = filter.status {
        condition = condition.add(Column::Status.eq(status.as_str()));
    }
    if let Some(from) = filter.date_from {
        condition = condition.add(Column::TransactionDate.gte(day_start(from)));
    }
    if let Some(to) = filter.date_to
        && let Some(next) = to.checked_add_days(Days::new(1))
    {
        condition = condition.add(Column::TransactionDate.lt(day_start(next)));
    }
    if let Some(after) = filter.created_after {
        condition = condition.add(Column::CreatedAt.gt(after.fixed_offset()));
    }
    condition
}

#[async_trait]
impl StoreTx for SeaStoreTx {
    // ========== Locking ==========

    async fn lock_key(&mut self, key: &str) -> Result<(), StoreError> {
        debug!(key, "taking advisory lock");
        self.txn
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "SELECT pg_advisory_xact_lock(hashtext($1))",
                [Value::from(key)],
            ))
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn lock_owner_accounts(
        &mut self,
        owner: AccountOwner,
    ) -> Result<Vec<Account>, StoreError> {
        self.accounts(
            accounts::Entity::find()
                .filter(owner_condition(owner))
                .lock_exclusive(),
        )
        .await
    }

    // ========== Accounts ==========

    async fn get_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        accounts::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(account_from_row)
            .transpose()
    }

    async fn find_scope_account(
        &mut self,
        company: CompanyId,
        branch: BranchId,
        kind: AccountKind,
    ) -> Result<Option<Account>, StoreError> {
        accounts::Entity::find()
            .filter(accounts::Column::CompanyId.eq(company.into_inner()))
            .filter(accounts::Column::BranchId.eq(branch.into_inner()))
            .filter(accounts::Column::Kind.eq(kind.as_str()))
            .filter(accounts::Column::OwnerId.is_null())
            .filter(accounts::Column::WriteOffId.is_null())
            .order_by_asc(accounts::Column::CreatedAt)
            .order_by_asc(accounts::Column::Id)
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(account_from_row)
            .transpose()
    }

    async fn find_write_off_accounts(
        &mut self,
        write_off: StockWriteOffId,
    ) -> Result<Vec<Account>, StoreError> {
        self.accounts(
            accounts::Entity::find()
                .filter(accounts::Column::WriteOffId.eq(write_off.into_inner())),
        )
        .await
    }

    async fn list_accounts(&mut self, filter: &AccountFilter) -> Result<Vec<Account>, StoreError> {
        self.accounts(accounts::Entity::find().filter(account_condition(filter)))
            .await
    }

    async fn insert_account(&mut self, account: &Account) -> Result<(), StoreError> {
        accounts::Entity::insert(account_row(account))
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError> {
        let mut row = account_row(account);
        row.id = NotSet;
        row.created_at = NotSet;
        let result = accounts::Entity::update_many()
            .set(row)
            .filter(accounts::Column::Id.eq(account.id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        ensure_updated(result.rows_affected, "accounts", account.id.into_inner())
    }

    async fn delete_account(&mut self, id: AccountId) -> Result<(), StoreError> {
        let result = accounts::Entity::delete_by_id(id.into_inner())
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        ensure_updated(result.rows_affected, "accounts", id.into_inner())
    }

    async fn account_has_transactions(&mut self, id: AccountId) -> Result<bool, StoreError> {
        let count = transactions::Entity::find()
            .filter(
                Condition::any()
                    .add(transactions::Column::DebitAccountId.eq(id.into_inner()))
                    .add(transactions::Column::CreditAccountId.eq(id.into_inner())),
            )
            .count(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    // ========== Transactions ==========

    async fn get_transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, StoreError> {
        transactions::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(transaction_from_row)
            .transpose()
    }

    async fn transaction_number_exists(&mut self, number: &str) -> Result<bool, StoreError> {
        let count = transactions::Entity::find()
            .filter(transactions::Column::TransactionNumber.eq(number))
            .count(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn find_transactions(
        &mut self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StoreError> {
        transactions::Entity::find()
            .filter(transaction_condition(filter))
            .order_by_asc(transactions::Column::TransactionDate)
            .order_by_asc(transactions::Column::CreatedAt)
            .order_by_asc(transactions::Column::TransactionNumber)
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(transaction_from_row)
            .collect()
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        transactions::Entity::insert(transaction_row(transaction))
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        let mut row = transaction_row(transaction);
        row.id = NotSet;
        row.transaction_number = NotSet;
        row.created_at = NotSet;
        let result = transactions::Entity::update_many()
            .set(row)
            .filter(transactions::Column::Id.eq(transaction.id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        ensure_updated(
            result.rows_affected,
            "transactions",
            transaction.id.into_inner(),
        )
    }

    // ========== Transaction items ==========

    async fn list_items(
        &mut self,
        transaction: TransactionId,
    ) -> Result<Vec<TransactionItem>, StoreError> {
        transaction_items::Entity::find()
            .filter(transaction_items::Column::TransactionId.eq(transaction.into_inner()))
            .order_by_asc(transaction_items::Column::CreatedAt)
            .order_by_asc(transaction_items::Column::Id)
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(item_from_row)
            .collect()
    }

    async fn get_item(
        &mut self,
        id: TransactionItemId,
    ) -> Result<Option<TransactionItem>, StoreError> {
        transaction_items::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(item_from_row)
            .transpose()
    }

    async fn insert_item(&mut self, item: &TransactionItem) -> Result<(), StoreError> {
        let parent = transactions::Entity::find_by_id(item.transaction().into_inner())
            .count(&self.txn)
            .await
            .map_err(db_err)?;
        if parent == 0 {
            return Err(StoreError::RowNotFound {
                table: "transactions",
                id: item.transaction().into_inner(),
            });
        }
        transaction_items::Entity::insert(item_row(item))
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_item(&mut self, item: &TransactionItem) -> Result<(), StoreError> {
        let mut row = item_row(item);
        row.id = NotSet;
        row.created_at = NotSet;
        let result = transaction_items::Entity::update_many()
            .set(row)
            .filter(transaction_items::Column::Id.eq(item.id().into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        ensure_updated(
            result.rows_affected,
            "transaction_items",
            item.id().into_inner(),
        )
    }

    async fn delete_item(&mut self, id: TransactionItemId) -> Result<(), StoreError> {
        let result = transaction_items::Entity::delete_by_id(id.into_inner())
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        ensure_updated(result.rows_affected, "transaction_items", id.into_inner())
    }

    // ========== Documents ==========

    async fn get_write_off(
        &mut self,
        id: StockWriteOffId,
    ) -> Result<Option<StockWriteOff>, StoreError> {
        let Some(row) = stock_write_offs::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };
        let items = self.write_off_items(row.id).await?;
        write_off_from_rows(row, items).map(Some)
    }

    async fn insert_write_off(&mut self, write_off: &StockWriteOff) -> Result<(), StoreError> {
        let (header, items) = write_off_rows(write_off)?;
        stock_write_offs::Entity::insert(header)
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        self.replace_write_off_items(write_off.id.into_inner(), items)
            .await
    }

    async fn update_write_off(&mut self, write_off: &StockWriteOff) -> Result<(), StoreError> {
        let (mut header, items) = write_off_rows(write_off)?;
        header.id = NotSet;
        header.created_at = NotSet;
        let result = stock_write_offs::Entity::update_many()
            .set(header)
            .filter(stock_write_offs::Column::Id.eq(write_off.id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        ensure_updated(
            result.rows_affected,
            "stock_write_offs",
            write_off.id.into_inner(),
        )?;
        self.replace_write_off_items(write_off.id.into_inner(), items)
            .await
    }

    async fn get_stock_take(&mut self, id: StockTakeId) -> Result<Option<StockTake>, StoreError> {
        let Some(row) = stock_takes::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };
        let lines = self.stock_take_lines(row.id).await?;
        stock_take_from_rows(row, lines).map(Some)
    }

    async fn insert_stock_take(&mut self, stock_take: &StockTake) -> Result<(), StoreError> {
        let (header, lines) = stock_take_rows(stock_take)?;
        stock_takes::Entity::insert(header)
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        self.replace_stock_take_lines(stock_take.id.into_inner(), lines)
            .await
    }

    async fn update_stock_take(&mut self, stock_take: &StockTake) -> Result<(), StoreError> {
        let (mut header, lines) = stock_take_rows(stock_take)?;
        header.id = NotSet;
        header.created_at = NotSet;
        let result = stock_takes::Entity::update_many()
            .set(header)
            .filter(stock_takes::Column::Id.eq(stock_take.id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        ensure_updated(
            result.rows_affected,
            "stock_takes",
            stock_take.id.into_inner(),
        )?;
        self.replace_stock_take_lines(stock_take.id.into_inner(), lines)
            .await
    }

    async fn get_settlement_document(
        &mut self,
        id: DocumentId,
    ) -> Result<Option<SettlementDocument>, StoreError> {
        settlement_documents::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(settlement_from_row)
            .transpose()
    }

    async fn insert_settlement_document(
        &mut self,
        document: &SettlementDocument,
    ) -> Result<(), StoreError> {
        settlement_documents::Entity::insert(settlement_row(document)?)
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_settlement_document(
        &mut self,
        document: &SettlementDocument,
    ) -> Result<(), StoreError> {
        let mut row = settlement_row(document)?;
        row.id = NotSet;
        row.created_at = NotSet;
        let result = settlement_documents::Entity::update_many()
            .set(row)
            .filter(settlement_documents::Column::Id.eq(document.id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        ensure_updated(
            result.rows_affected,
            "settlement_documents",
            document.id.into_inner(),
        )
    }

    // ========== Audit ==========

    async fn record_audit(&mut self, record: &AuditRecord) -> Result<(), StoreError> {
        audit_log::Entity::insert(audit_row(record))
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    // ========== Completion ==========

    async fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().await.map_err(db_err)
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.txn.rollback().await.map_err(db_err)
    }
}

/// Loads the audit trail of one entity, oldest first.
pub async fn audit_trail<C: ConnectionTrait>(
    db: &C,
    entity_id: Uuid,
) -> Result<Vec<AuditRecord>, StoreError> {
    audit_log::Entity::find()
        .filter(audit_log::Column::EntityId.eq(entity_id))
        .order_by_asc(audit_log::Column::RecordedAt)
        .order_by_asc(audit_log::Column::Id)
        .all(db)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(mapping::audit_from_row)
        .collect()
}
