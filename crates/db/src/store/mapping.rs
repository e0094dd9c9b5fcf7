//! Conversions between `SeaORM` models and ledger types.
//!
//! Enumerations are stored as their `as_str` form. Unknown values and
//! missing subtype columns surface as [`StoreError::Corrupt`].

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::prelude::DateTimeWithTimeZone;

use kasir_core::account::{Account, AccountDetails, AccountKind, AccountOwner};
use kasir_core::audit::{AuditAction, AuditEntity, AuditRecord};
use kasir_core::document::{
    SettlementDocument, SettlementKind, SettlementStatus, StockTake, StockTakeLine,
    StockTakeStatus, StockWriteOff, StockWriteOffItem, WriteOffStatus,
};
use kasir_core::ledger::{
    Transaction, TransactionCategory, TransactionItem, TransactionStatus, TransactionType,
};
use kasir_core::store::StoreError;
use kasir_shared::types::{
    AccountId, AuditRecordId, BranchId, CompanyId, CustomerId, DocumentId, ProductId,
    StockTakeId, StockTakeLineId, StockWriteOffId, StockWriteOffItemId, SupplierId,
    TransactionId, TransactionItemId, UserId, zero_money,
};

use crate::entities::{
    accounts, audit_log, settlement_documents, stock_take_lines, stock_takes,
    stock_write_off_items, stock_write_offs, transaction_items, transactions,
};

fn utc(at: DateTimeWithTimeZone) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

fn stored(at: DateTime<Utc>) -> DateTimeWithTimeZone {
    at.fixed_offset()
}

fn corrupt(table: &str, column: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{table}.{column}: {detail}"))
}

fn parse_enum<T>(
    table: &str,
    column: &str,
    value: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<T, StoreError> {
    parse(value).ok_or_else(|| corrupt(table, column, format!("unknown value {value:?}")))
}

/// Position of a child row, stored as `INTEGER`.
fn position(index: usize) -> Result<i32, StoreError> {
    i32::try_from(index).map_err(|_| StoreError::Corrupt(format!("too many rows: {index}")))
}

// ========== Accounts ==========

/// Builds the row for an account.
pub fn account_row(account: &Account) -> accounts::ActiveModel {
    let mut row = accounts::ActiveModel {
        id: Set(account.id.into_inner()),
        company_id: Set(account.company.into_inner()),
        branch_id: Set(account.branch.into_inner()),
        name: Set(account.name.clone()),
        kind: Set(account.kind().as_str().to_string()),
        balance: Set(account.balance),
        owner_id: Set(account.owner().map(|owner| owner.id())),
        is_primary: Set(account.is_primary()),
        bank_name: Set(None),
        account_number: Set(None),
        expense_category: Set(None),
        write_off_id: Set(None),
        written_off_amount: Set(None),
        created_at: Set(stored(account.created_at)),
        updated_at: Set(stored(account.updated_at)),
    };
    match &account.details {
        AccountDetails::Bank {
            bank_name,
            account_number,
        } => {
            row.bank_name = Set(Some(bank_name.clone()));
            row.account_number = Set(account_number.clone());
        }
        AccountDetails::Expense { expense_category } => {
            row.expense_category = Set(expense_category.clone());
        }
        AccountDetails::WriteOff { write_off, amount } => {
            row.write_off_id = Set(write_off.map(StockWriteOffId::into_inner));
            row.written_off_amount = Set(Some(*amount));
        }
        _ => {}
    }
    row
}

/// Rebuilds an account from its row.
pub fn account_from_row(row: accounts::Model) -> Result<Account, StoreError> {
    let kind = parse_enum("accounts", "kind", &row.kind, AccountKind::parse)?;
    let details = match kind {
        AccountKind::Bank => AccountDetails::Bank {
            bank_name: row
                .bank_name
                .ok_or_else(|| corrupt("accounts", "bank_name", "missing for BANK"))?,
            account_number: row.account_number,
        },
        AccountKind::Cash => AccountDetails::Cash,
        AccountKind::Sales => AccountDetails::Sales,
        AccountKind::Purchases => AccountDetails::Purchases,
        AccountKind::Expense => AccountDetails::Expense {
            expense_category: row.expense_category,
        },
        AccountKind::WriteOff => AccountDetails::WriteOff {
            write_off: row.write_off_id.map(StockWriteOffId::from_uuid),
            amount: row.written_off_amount.unwrap_or_else(zero_money),
        },
        AccountKind::Customer
        | AccountKind::Supplier
        | AccountKind::Loan
        | AccountKind::Branch
        | AccountKind::Employee => {
            let owner = row
                .owner_id
                .and_then(|id| AccountOwner::from_parts(kind, id))
                .ok_or_else(|| corrupt("accounts", "owner_id", format!("missing for {kind}")))?;
            AccountDetails::for_owner(owner, row.is_primary)
        }
    };
    Ok(Account {
        id: AccountId::from_uuid(row.id),
        company: CompanyId::from_uuid(row.company_id),
        branch: BranchId::from_uuid(row.branch_id),
        name: row.name,
        balance: row.balance,
        details,
        created_at: utc(row.created_at),
        updated_at: utc(row.updated_at),
    })
}

// ========== Transactions ==========

/// Builds the row for a transaction.
pub fn transaction_row(txn: &Transaction) -> transactions::ActiveModel {
    transactions::ActiveModel {
        id: Set(txn.id.into_inner()),
        company_id: Set(txn.company.into_inner()),
        branch_id: Set(txn.branch.into_inner()),
        customer_id: Set(txn.customer.map(CustomerId::into_inner)),
        supplier_id: Set(txn.supplier.map(SupplierId::into_inner)),
        debit_account_id: Set(txn.debit_account.into_inner()),
        credit_account_id: Set(txn.credit_account.into_inner()),
        transaction_type: Set(txn.transaction_type.as_str().to_string()),
        category: Set(txn.category.as_str().to_string()),
        transaction_number: Set(txn.number.clone()),
        status: Set(txn.status.as_str().to_string()),
        total_amount: Set(txn.total_amount),
        reversal_applied: Set(txn.reversal_applied),
        reference: Set(txn.reference.clone()),
        description: Set(txn.description.clone()),
        transaction_date: Set(stored(txn.transaction_date)),
        created_by: Set(txn.created_by.into_inner()),
        created_at: Set(stored(txn.created_at)),
        updated_at: Set(stored(txn.updated_at)),
    }
}

/// Rebuilds a transaction from its row.
pub fn transaction_from_row(row: transactions::Model) -> Result<Transaction, StoreError> {
    Ok(Transaction {
        id: TransactionId::from_uuid(row.id),
        company: CompanyId::from_uuid(row.company_id),
        branch: BranchId::from_uuid(row.branch_id),
        customer: row.customer_id.map(CustomerId::from_uuid),
        supplier: row.supplier_id.map(SupplierId::from_uuid),
        debit_account: AccountId::from_uuid(row.debit_account_id),
        credit_account: AccountId::from_uuid(row.credit_account_id),
        transaction_type: parse_enum(
            "transactions",
            "transaction_type",
            &row.transaction_type,
            TransactionType::parse,
        )?,
        category: parse_enum(
            "transactions",
            "category",
            &row.category,
            TransactionCategory::parse,
        )?,
        number: row.transaction_number,
        status: parse_enum("transactions", "status", &row.status, TransactionStatus::parse)?,
        total_amount: row.total_amount,
        reversal_applied: row.reversal_applied,
        reference: row.reference,
        description: row.description,
        transaction_date: utc(row.transaction_date),
        created_by: UserId::from_uuid(row.created_by),
        created_at: utc(row.created_at),
        updated_at: utc(row.updated_at),
    })
}

/// Builds the row for a line item.
pub fn item_row(item: &TransactionItem) -> transaction_items::ActiveModel {
    transaction_items::ActiveModel {
        id: Set(item.id().into_inner()),
        transaction_id: Set(item.transaction().into_inner()),
        product_id: Set(item.product().map(ProductId::into_inner)),
        product_name: Set(item.product_name().to_string()),
        quantity: Set(item.quantity()),
        unit_price: Set(item.unit_price()),
        tax_rate: Set(item.tax_rate()),
        total_price: Set(item.total_price()),
        created_at: Set(stored(item.created_at())),
    }
}

/// Rebuilds a line item, re-deriving its total.
pub fn item_from_row(row: transaction_items::Model) -> Result<TransactionItem, StoreError> {
    let id = row.id;
    TransactionItem::from_parts(
        TransactionItemId::from_uuid(row.id),
        TransactionId::from_uuid(row.transaction_id),
        row.product_id.map(ProductId::from_uuid),
        row.product_name,
        row.quantity,
        row.unit_price,
        row.tax_rate,
        utc(row.created_at),
    )
    .map_err(|e| corrupt("transaction_items", "id", format!("{id}: {e}")))
}

// ========== Write-offs ==========

/// Builds the rows for a write-off and its items.
pub fn write_off_rows(
    write_off: &StockWriteOff,
) -> Result<(stock_write_offs::ActiveModel, Vec<stock_write_off_items::ActiveModel>), StoreError> {
    let header = stock_write_offs::ActiveModel {
        id: Set(write_off.id.into_inner()),
        company_id: Set(write_off.company.into_inner()),
        branch_id: Set(write_off.branch.into_inner()),
        reason: Set(write_off.reason.clone()),
        status: Set(write_off.status.as_str().to_string()),
        transaction_id: Set(write_off.transaction.map(TransactionId::into_inner)),
        created_by: Set(write_off.created_by.into_inner()),
        created_at: Set(stored(write_off.created_at)),
        posted_at: Set(write_off.posted_at.map(stored)),
    };
    let items = write_off
        .items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            Ok(stock_write_off_items::ActiveModel {
                id: Set(item.id.into_inner()),
                write_off_id: Set(write_off.id.into_inner()),
                position: Set(position(index)?),
                product_id: Set(item.product.map(ProductId::into_inner)),
                product_name: Set(item.product_name.clone()),
                quantity: Set(item.quantity),
                unit_cost: Set(item.unit_cost),
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    Ok((header, items))
}

/// Rebuilds a write-off from its row and its item rows in position order.
pub fn write_off_from_rows(
    row: stock_write_offs::Model,
    items: Vec<stock_write_off_items::Model>,
) -> Result<StockWriteOff, StoreError> {
    Ok(StockWriteOff {
        id: StockWriteOffId::from_uuid(row.id),
        company: CompanyId::from_uuid(row.company_id),
        branch: BranchId::from_uuid(row.branch_id),
        reason: row.reason,
        status: parse_enum("stock_write_offs", "status", &row.status, WriteOffStatus::parse)?,
        items: items
            .into_iter()
            .map(|item| StockWriteOffItem {
                id: StockWriteOffItemId::from_uuid(item.id),
                product: item.product_id.map(ProductId::from_uuid),
                product_name: item.product_name,
                quantity: item.quantity,
                unit_cost: item.unit_cost,
            })
            .collect(),
        transaction: row.transaction_id.map(TransactionId::from_uuid),
        created_by: UserId::from_uuid(row.created_by),
        created_at: utc(row.created_at),
        posted_at: row.posted_at.map(utc),
    })
}

// ========== Stock takes ==========

/// Builds the rows for a stock take and its lines.
pub fn stock_take_rows(
    stock_take: &StockTake,
) -> Result<(stock_takes::ActiveModel, Vec<stock_take_lines::ActiveModel>), StoreError> {
    let header = stock_takes::ActiveModel {
        id: Set(stock_take.id.into_inner()),
        company_id: Set(stock_take.company.into_inner()),
        branch_id: Set(stock_take.branch.into_inner()),
        status: Set(stock_take.status.as_str().to_string()),
        transaction_id: Set(stock_take.transaction.map(TransactionId::into_inner)),
        created_by: Set(stock_take.created_by.into_inner()),
        created_at: Set(stored(stock_take.created_at)),
        approved_at: Set(stock_take.approved_at.map(stored)),
    };
    let lines = stock_take
        .lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            Ok(stock_take_lines::ActiveModel {
                id: Set(line.id.into_inner()),
                stock_take_id: Set(stock_take.id.into_inner()),
                position: Set(position(index)?),
                product_id: Set(line.product.map(ProductId::into_inner)),
                product_name: Set(line.product_name.clone()),
                expected_quantity: Set(line.expected_quantity),
                counted_quantity: Set(line.counted_quantity),
                unit_cost: Set(line.unit_cost),
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    Ok((header, lines))
}

/// Rebuilds a stock take from its row and its line rows in position order.
pub fn stock_take_from_rows(
    row: stock_takes::Model,
    lines: Vec<stock_take_lines::Model>,
) -> Result<StockTake, StoreError> {
    Ok(StockTake {
        id: StockTakeId::from_uuid(row.id),
        company: CompanyId::from_uuid(row.company_id),
        branch: BranchId::from_uuid(row.branch_id),
        status: parse_enum("stock_takes", "status", &row.status, StockTakeStatus::parse)?,
        lines: lines
            .into_iter()
            .map(|line| StockTakeLine {
                id: StockTakeLineId::from_uuid(line.id),
                product: line.product_id.map(ProductId::from_uuid),
                product_name: line.product_name,
                expected_quantity: line.expected_quantity,
                counted_quantity: line.counted_quantity,
                unit_cost: line.unit_cost,
            })
            .collect(),
        transaction: row.transaction_id.map(TransactionId::from_uuid),
        created_by: UserId::from_uuid(row.created_by),
        created_at: utc(row.created_at),
        approved_at: row.approved_at.map(utc),
    })
}

// ========== Settlement documents ==========

/// Builds the row for a settlement document; lines are stored as JSON.
pub fn settlement_row(
    document: &SettlementDocument,
) -> Result<settlement_documents::ActiveModel, StoreError> {
    Ok(settlement_documents::ActiveModel {
        id: Set(document.id.into_inner()),
        company_id: Set(document.company.into_inner()),
        branch_id: Set(document.branch.into_inner()),
        kind: Set(document.kind.as_str().to_string()),
        status: Set(document.status.as_str().to_string()),
        reference: Set(document.reference.clone()),
        customer_id: Set(document.customer.map(CustomerId::into_inner)),
        supplier_id: Set(document.supplier.map(SupplierId::into_inner)),
        lines: Set(serde_json::to_value(&document.lines)?),
        transaction_id: Set(document.transaction.map(TransactionId::into_inner)),
        created_by: Set(document.created_by.into_inner()),
        created_at: Set(stored(document.created_at)),
        settled_at: Set(document.settled_at.map(stored)),
    })
}

/// Rebuilds a settlement document from its row.
pub fn settlement_from_row(
    row: settlement_documents::Model,
) -> Result<SettlementDocument, StoreError> {
    Ok(SettlementDocument {
        id: DocumentId::from_uuid(row.id),
        company: CompanyId::from_uuid(row.company_id),
        branch: BranchId::from_uuid(row.branch_id),
        kind: parse_enum("settlement_documents", "kind", &row.kind, SettlementKind::parse)?,
        status: parse_enum(
            "settlement_documents",
            "status",
            &row.status,
            SettlementStatus::parse,
        )?,
        reference: row.reference,
        customer: row.customer_id.map(CustomerId::from_uuid),
        supplier: row.supplier_id.map(SupplierId::from_uuid),
        lines: serde_json::from_value(row.lines)?,
        transaction: row.transaction_id.map(TransactionId::from_uuid),
        created_by: UserId::from_uuid(row.created_by),
        created_at: utc(row.created_at),
        settled_at: row.settled_at.map(utc),
    })
}

// ========== Audit ==========

/// Builds the row for an audit record.
pub fn audit_row(record: &AuditRecord) -> audit_log::ActiveModel {
    audit_log::ActiveModel {
        id: Set(record.id.into_inner()),
        actor_id: Set(record.actor.into_inner()),
        action: Set(record.action.as_str().to_string()),
        entity: Set(record.entity.as_str().to_string()),
        entity_id: Set(record.entity_id),
        before: Set(record.before.clone()),
        after: Set(record.after.clone()),
        recorded_at: Set(stored(record.recorded_at)),
    }
}

/// Rebuilds an audit record from its row.
pub fn audit_from_row(row: audit_log::Model) -> Result<AuditRecord, StoreError> {
    Ok(AuditRecord {
        id: AuditRecordId::from_uuid(row.id),
        actor: UserId::from_uuid(row.actor_id),
        action: parse_enum("audit_log", "action", &row.action, AuditAction::parse)?,
        entity: parse_enum("audit_log", "entity", &row.entity, AuditEntity::parse)?,
        entity_id: row.entity_id,
        before: row.before,
        after: row.after,
        recorded_at: utc(row.recorded_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kasir_core::document::{NewWriteOff, NewWriteOffItem};
    use kasir_core::ledger::NewTransactionItem;
    use rust_decimal_macros::dec;
    use sea_orm::ActiveValue;

    fn value<T: Into<sea_orm::Value>>(field: ActiveValue<T>) -> T
    where
        T: Clone,
    {
        match field {
            ActiveValue::Set(v) | ActiveValue::Unchanged(v) => v,
            ActiveValue::NotSet => panic!("field not set"),
        }
    }

    fn account_model(account: &Account) -> accounts::Model {
        let row = account_row(account);
        accounts::Model {
            id: value(row.id),
            company_id: value(row.company_id),
            branch_id: value(row.branch_id),
            name: value(row.name),
            kind: value(row.kind),
            balance: value(row.balance),
            owner_id: value(row.owner_id),
            is_primary: value(row.is_primary),
            bank_name: value(row.bank_name),
            account_number: value(row.account_number),
            expense_category: value(row.expense_category),
            write_off_id: value(row.write_off_id),
            written_off_amount: value(row.written_off_amount),
            created_at: value(row.created_at),
            updated_at: value(row.updated_at),
        }
    }

    fn account(details: AccountDetails) -> Account {
        Account::new(CompanyId::new(), BranchId::new(), "Test".into(), details)
    }

    #[test]
    fn test_owner_account_keeps_owner_and_primary_flag() {
        let customer = CustomerId::new();
        let original = account(AccountDetails::for_owner(AccountOwner::Customer(customer), true));

        let row = account_model(&original);
        assert_eq!(row.kind, "CUSTOMER");
        assert_eq!(row.owner_id, Some(customer.into_inner()));
        assert!(row.is_primary);

        let restored = account_from_row(row).unwrap();
        assert_eq!(restored.owner(), Some(AccountOwner::Customer(customer)));
        assert!(restored.is_primary());
        assert_eq!(restored.id, original.id);
    }

    #[test]
    fn test_write_off_account_keeps_link_and_amount() {
        let write_off = StockWriteOffId::new();
        let mut original = account(AccountDetails::WriteOff {
            write_off: Some(write_off),
            amount: dec!(35.00),
        });
        original.balance = dec!(35.00);

        let restored = account_from_row(account_model(&original)).unwrap();

        assert_eq!(restored.details.write_off(), Some(write_off));
        assert_eq!(restored.details.written_off_amount(), Some(dec!(35.00)));
        assert_eq!(restored.balance, dec!(35.00));
    }

    #[test]
    fn test_bank_account_without_bank_name_is_corrupt() {
        let mut row = account_model(&account(AccountDetails::Bank {
            bank_name: "BCA".into(),
            account_number: None,
        }));
        row.bank_name = None;

        assert!(matches!(account_from_row(row), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_unknown_kind_is_corrupt() {
        let mut row = account_model(&account(AccountDetails::Cash));
        row.kind = "PETTY_CASH".into();

        let err = account_from_row(row).unwrap_err();
        assert!(err.to_string().contains("accounts.kind"));
    }

    #[test]
    fn test_owner_kind_without_owner_is_corrupt() {
        let mut row = account_model(&account(AccountDetails::for_owner(
            AccountOwner::Supplier(SupplierId::new()),
            false,
        )));
        row.owner_id = None;

        assert!(matches!(account_from_row(row), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_write_off_items_keep_their_order() {
        let mut write_off = StockWriteOff::new(
            NewWriteOff {
                company: CompanyId::new(),
                branch: BranchId::new(),
                reason: None,
            },
            UserId::new(),
        );
        for name in ["First", "Second", "Third"] {
            write_off
                .add_item(NewWriteOffItem {
                    product: None,
                    product_name: name.into(),
                    quantity: dec!(1),
                    unit_cost: dec!(2.50),
                })
                .unwrap();
        }

        let (_, items) = write_off_rows(&write_off).unwrap();
        let positions: Vec<i32> = items.into_iter().map(|item| value(item.position)).collect();

        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_settlement_lines_survive_json() {
        let lines = vec![NewTransactionItem::untaxed("Coffee", dec!(2), dec!(12.50))];
        let json = serde_json::to_value(&lines).unwrap();

        let restored: Vec<NewTransactionItem> = serde_json::from_value(json).unwrap();

        assert_eq!(restored, lines);
    }
}
