//! Transaction aggregate and line items.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kasir_shared::types::{
    AccountId, BranchId, CompanyId, CustomerId, ProductId, SupplierId, TransactionId,
    TransactionItemId, UserId, line_total, round_money, round_quantity, zero_money,
};

use crate::ledger::error::LedgerError;
use crate::ledger::types::{TransactionCategory, TransactionStatus, TransactionType};

/// A ledger transaction: one debit account, one credit account, one amount.
///
/// `number` is assigned once when the transaction is first stored; stores
/// never rewrite it on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction identifier.
    pub id: TransactionId,
    /// Owning company.
    pub company: CompanyId,
    /// Owning branch.
    pub branch: BranchId,
    /// Customer involved, if any.
    pub customer: Option<CustomerId>,
    /// Supplier involved, if any.
    pub supplier: Option<SupplierId>,
    /// Account debited.
    pub debit_account: AccountId,
    /// Account credited.
    pub credit_account: AccountId,
    /// Direction.
    pub transaction_type: TransactionType,
    /// Business category.
    pub category: TransactionCategory,
    /// Unique system-generated number.
    pub number: String,
    /// Lifecycle status.
    pub status: TransactionStatus,
    /// Non-negative total with 2 fractional digits.
    pub total_amount: Decimal,
    /// Set once the balance effect has been undone.
    pub reversal_applied: bool,
    /// External reference, e.g. a document number.
    pub reference: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Business date, set at creation.
    pub transaction_date: DateTime<Utc>,
    /// User who recorded the transaction.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Returns true if `account` is the debit or credit side.
    #[must_use]
    pub fn touches(&self, account: AccountId) -> bool {
        self.debit_account == account || self.credit_account == account
    }
}

/// Input for a new line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransactionItem {
    /// Product, if the line refers to one.
    pub product: Option<ProductId>,
    /// Product label.
    pub product_name: String,
    /// Quantity, greater than zero.
    pub quantity: Decimal,
    /// Unit price, not negative.
    pub unit_price: Decimal,
    /// Tax percentage between 0 and 100.
    pub tax_rate: Decimal,
}

impl NewTransactionItem {
    /// A tax-free line.
    #[must_use]
    pub fn untaxed(product_name: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            product: None,
            product_name: product_name.into(),
            quantity,
            unit_price,
            tax_rate: Decimal::ZERO,
        }
    }

    /// The derived line total.
    #[must_use]
    pub fn total(&self) -> Decimal {
        line_total(round_quantity(self.quantity), self.unit_price, self.tax_rate)
    }
}

/// Changes to a line item. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemUpdate {
    /// New product label.
    pub product_name: Option<String>,
    /// New quantity.
    pub quantity: Option<Decimal>,
    /// New unit price.
    pub unit_price: Option<Decimal>,
    /// New tax rate.
    pub tax_rate: Option<Decimal>,
}

/// A line split of a transaction.
///
/// `total_price` is always derived from quantity, unit price and tax rate;
/// there is no way to set it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionItem {
    id: TransactionItemId,
    transaction: TransactionId,
    product: Option<ProductId>,
    product_name: String,
    quantity: Decimal,
    unit_price: Decimal,
    tax_rate: Decimal,
    total_price: Decimal,
    created_at: DateTime<Utc>,
}

impl TransactionItem {
    /// Validates `input` and builds a new item of `transaction`.
    pub fn new(transaction: TransactionId, input: NewTransactionItem) -> Result<Self, LedgerError> {
        Self::from_parts(
            TransactionItemId::new(),
            transaction,
            input.product,
            input.product_name,
            input.quantity,
            input.unit_price,
            input.tax_rate,
            Utc::now(),
        )
    }

    /// Rebuilds an item from stored fields, re-deriving the total.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: TransactionItemId,
        transaction: TransactionId,
        product: Option<ProductId>,
        product_name: String,
        quantity: Decimal,
        unit_price: Decimal,
        tax_rate: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        let mut item = Self {
            id,
            transaction,
            product,
            product_name,
            quantity,
            unit_price,
            tax_rate,
            total_price: zero_money(),
            created_at,
        };
        item.validate_and_derive()?;
        Ok(item)
    }

    /// Applies `update`, re-validating and re-deriving the total.
    ///
    /// On error the item is left unchanged.
    pub fn apply(&mut self, update: ItemUpdate) -> Result<(), LedgerError> {
        let mut next = self.clone();
        if let Some(name) = update.product_name {
            next.product_name = name;
        }
        if let Some(quantity) = update.quantity {
            next.quantity = quantity;
        }
        if let Some(unit_price) = update.unit_price {
            next.unit_price = unit_price;
        }
        if let Some(tax_rate) = update.tax_rate {
            next.tax_rate = tax_rate;
        }
        next.validate_and_derive()?;
        *self = next;
        Ok(())
    }

    fn validate_and_derive(&mut self) -> Result<(), LedgerError> {
        self.product_name = self.product_name.trim().to_string();
        if self.product_name.is_empty() {
            return Err(LedgerError::ProductNameRequired);
        }
        let quantity = round_quantity(self.quantity);
        if quantity <= Decimal::ZERO {
            return Err(LedgerError::InvalidQuantity(self.quantity));
        }
        if self.unit_price < Decimal::ZERO {
            return Err(LedgerError::InvalidUnitPrice(self.unit_price));
        }
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE_HUNDRED {
            return Err(LedgerError::InvalidTaxRate(self.tax_rate));
        }
        self.quantity = quantity;
        self.total_price = line_total(quantity, self.unit_price, self.tax_rate);
        Ok(())
    }

    /// Item identifier.
    #[must_use]
    pub fn id(&self) -> TransactionItemId {
        self.id
    }

    /// Parent transaction.
    #[must_use]
    pub fn transaction(&self) -> TransactionId {
        self.transaction
    }

    /// Product, if any.
    #[must_use]
    pub fn product(&self) -> Option<ProductId> {
        self.product
    }

    /// Product label.
    #[must_use]
    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    /// Quantity, rounded to 4 places.
    #[must_use]
    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    /// Unit price.
    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    /// Tax percentage.
    #[must_use]
    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    /// Derived line total.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.total_price
    }

    /// Creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Sum of item totals, rounded to money scale.
#[must_use]
pub fn items_total(items: &[TransactionItem]) -> Decimal {
    round_money(items.iter().map(TransactionItem::total_price).sum())
}

/// How the amount of a new transaction is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionAmount {
    /// A fixed total without line items.
    Fixed(Decimal),
    /// Line items; the total is their sum.
    Itemized(Vec<NewTransactionItem>),
}

/// Input for recording a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionRequest {
    /// Owning company.
    pub company: CompanyId,
    /// Owning branch.
    pub branch: BranchId,
    /// Account debited.
    pub debit_account: AccountId,
    /// Account credited.
    pub credit_account: AccountId,
    /// Direction.
    pub transaction_type: TransactionType,
    /// Business category.
    pub category: TransactionCategory,
    /// Amount or line items.
    pub amount: TransactionAmount,
    /// Customer involved.
    pub customer: Option<CustomerId>,
    /// Supplier involved.
    pub supplier: Option<SupplierId>,
    /// External reference.
    pub reference: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
}

impl CreateTransactionRequest {
    /// A request with a fixed amount and no counterparty or reference.
    #[must_use]
    pub fn fixed(
        company: CompanyId,
        branch: BranchId,
        debit_account: AccountId,
        credit_account: AccountId,
        transaction_type: TransactionType,
        category: TransactionCategory,
        amount: Decimal,
    ) -> Self {
        Self {
            company,
            branch,
            debit_account,
            credit_account,
            transaction_type,
            category,
            amount: TransactionAmount::Fixed(amount),
            customer: None,
            supplier: None,
            reference: None,
            description: None,
        }
    }
}

/// Criteria for finding transactions. `None` matches everything.
///
/// Dates are inclusive and compare against the transaction date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Owning company.
    pub company: Option<CompanyId>,
    /// Owning branch.
    pub branch: Option<BranchId>,
    /// Customer.
    pub customer: Option<CustomerId>,
    /// Supplier.
    pub supplier: Option<SupplierId>,
    /// Exact debit account.
    pub debit_account: Option<AccountId>,
    /// Exact credit account.
    pub credit_account: Option<AccountId>,
    /// Either side.
    pub account: Option<AccountId>,
    /// Category.
    pub category: Option<TransactionCategory>,
    /// Status.
    pub status: Option<TransactionStatus>,
    /// Earliest transaction date.
    pub date_from: Option<NaiveDate>,
    /// Latest transaction date.
    pub date_to: Option<NaiveDate>,
    /// Only rows created strictly after this instant.
    pub created_after: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    /// Returns true if `txn` satisfies every criterion.
    #[must_use]
    pub fn matches(&self, txn: &Transaction) -> bool {
        let date = txn.transaction_date.date_naive();
        self.company.is_none_or(|v| txn.company == v)
            && self.branch.is_none_or(|v| txn.branch == v)
            && self.customer.is_none_or(|v| txn.customer == Some(v))
            && self.supplier.is_none_or(|v| txn.supplier == Some(v))
            && self.debit_account.is_none_or(|v| txn.debit_account == v)
            && self.credit_account.is_none_or(|v| txn.credit_account == v)
            && self.account.is_none_or(|v| txn.touches(v))
            && self.category.is_none_or(|v| txn.category == v)
            && self.status.is_none_or(|v| txn.status == v)
            && self.date_from.is_none_or(|v| date >= v)
            && self.date_to.is_none_or(|v| date <= v)
            && self.created_after.is_none_or(|v| txn.created_at > v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn item(quantity: Decimal, unit_price: Decimal, tax_rate: Decimal) -> NewTransactionItem {
        NewTransactionItem {
            product: None,
            product_name: "Widget".into(),
            quantity,
            unit_price,
            tax_rate,
        }
    }

    #[rstest]
    #[case(dec!(3), dec!(10.00), dec!(0), dec!(30.00))]
    #[case(dec!(1), dec!(5.00), dec!(0), dec!(5.00))]
    #[case(dec!(2), dec!(9.99), dec!(10), dec!(21.98))]
    #[case(dec!(1), dec!(0.05), dec!(10), dec!(0.06))]
    #[case(dec!(0.3333), dec!(3.00), dec!(0), dec!(1.00))]
    fn test_total_price_is_derived(
        #[case] quantity: Decimal,
        #[case] unit_price: Decimal,
        #[case] tax_rate: Decimal,
        #[case] expected: Decimal,
    ) {
        let item =
            TransactionItem::new(TransactionId::new(), item(quantity, unit_price, tax_rate))
                .unwrap();
        assert_eq!(item.total_price(), expected);
    }

    #[rstest]
    #[case(dec!(0), dec!(1), dec!(0))]
    #[case(dec!(-1), dec!(1), dec!(0))]
    #[case(dec!(0.00001), dec!(1), dec!(0))]
    fn test_quantity_must_be_positive(
        #[case] quantity: Decimal,
        #[case] unit_price: Decimal,
        #[case] tax_rate: Decimal,
    ) {
        let result = TransactionItem::new(TransactionId::new(), item(quantity, unit_price, tax_rate));
        assert!(matches!(result, Err(LedgerError::InvalidQuantity(_))));
    }

    #[test]
    fn test_unit_price_and_tax_rate_bounds() {
        let id = TransactionId::new();
        assert!(matches!(
            TransactionItem::new(id, item(dec!(1), dec!(-0.01), dec!(0))),
            Err(LedgerError::InvalidUnitPrice(_))
        ));
        assert!(matches!(
            TransactionItem::new(id, item(dec!(1), dec!(1), dec!(100.01))),
            Err(LedgerError::InvalidTaxRate(_))
        ));
        assert!(TransactionItem::new(id, item(dec!(1), dec!(0), dec!(100))).is_ok());
    }

    #[test]
    fn test_apply_rederives_total_and_keeps_item_on_error() {
        let mut item =
            TransactionItem::new(TransactionId::new(), item(dec!(2), dec!(10.00), dec!(0)))
                .unwrap();

        item.apply(ItemUpdate {
            quantity: Some(dec!(4)),
            ..ItemUpdate::default()
        })
        .unwrap();
        assert_eq!(item.total_price(), dec!(40.00));

        let result = item.apply(ItemUpdate {
            unit_price: Some(dec!(-1)),
            quantity: Some(dec!(1)),
            ..ItemUpdate::default()
        });
        assert!(result.is_err());
        assert_eq!(item.quantity(), dec!(4.0000));
        assert_eq!(item.total_price(), dec!(40.00));
    }

    #[test]
    fn test_items_total_of_nothing_is_zero_money() {
        let total = items_total(&[]);
        assert_eq!(total, dec!(0));
        assert_eq!(total.to_string(), "0.00");
    }
}
