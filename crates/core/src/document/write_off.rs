//! Stock write-off documents.
//!
//! A write-off records stock removed from inventory (damage, expiry, loss).
//! Items can change while the write-off is DRAFT. Posting freezes it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use kasir_shared::types::{
    BranchId, CompanyId, ProductId, StockWriteOffId, StockWriteOffItemId, TransactionId, UserId,
    round_money, round_quantity, zero_money,
};

use crate::document::error::DocumentError;
use crate::ledger::NewTransactionItem;

/// Write-off lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteOffStatus {
    /// Editable.
    Draft,
    /// Posted to the ledger; immutable.
    Posted,
}

impl WriteOffStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Posted => "POSTED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "POSTED" => Some(Self::Posted),
            _ => None,
        }
    }
}

impl fmt::Display for WriteOffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for a write-off item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWriteOffItem {
    /// Product written off.
    pub product: Option<ProductId>,
    /// Product label.
    pub product_name: String,
    /// Quantity, greater than zero.
    pub quantity: Decimal,
    /// Cost per unit.
    pub unit_cost: Decimal,
}

/// Changes to a write-off item. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOffItemUpdate {
    /// New quantity.
    pub quantity: Option<Decimal>,
    /// New unit cost.
    pub unit_cost: Option<Decimal>,
}

/// A line of a write-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockWriteOffItem {
    /// Item identifier.
    pub id: StockWriteOffItemId,
    /// Product written off.
    pub product: Option<ProductId>,
    /// Product label.
    pub product_name: String,
    /// Quantity with 4 fractional digits.
    pub quantity: Decimal,
    /// Cost per unit with 2 fractional digits.
    pub unit_cost: Decimal,
}

impl StockWriteOffItem {
    fn new(input: NewWriteOffItem) -> Result<Self, DocumentError> {
        let product_name = input.product_name.trim().to_string();
        if product_name.is_empty() {
            return Err(DocumentError::ProductNameRequired);
        }
        Ok(Self {
            id: StockWriteOffItemId::new(),
            product: input.product,
            product_name,
            quantity: valid_quantity(input.quantity)?,
            unit_cost: valid_cost(input.unit_cost)?,
        })
    }

    /// Value written off by this line.
    #[must_use]
    pub fn total(&self) -> Decimal {
        round_money(self.quantity * self.unit_cost)
    }
}

fn valid_quantity(quantity: Decimal) -> Result<Decimal, DocumentError> {
    let rounded = round_quantity(quantity);
    if rounded <= Decimal::ZERO {
        return Err(DocumentError::InvalidQuantity(quantity));
    }
    Ok(rounded)
}

fn valid_cost(unit_cost: Decimal) -> Result<Decimal, DocumentError> {
    if unit_cost < Decimal::ZERO {
        return Err(DocumentError::InvalidUnitCost(unit_cost));
    }
    Ok(round_money(unit_cost))
}

/// Input for a new write-off.
#[derive(Debug, Clone)]
pub struct NewWriteOff {
    /// Owning company.
    pub company: CompanyId,
    /// Owning branch.
    pub branch: BranchId,
    /// Why the stock is written off.
    pub reason: Option<String>,
}

/// A stock write-off document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockWriteOff {
    /// Write-off identifier.
    pub id: StockWriteOffId,
    /// Owning company.
    pub company: CompanyId,
    /// Owning branch.
    pub branch: BranchId,
    /// Why the stock is written off.
    pub reason: Option<String>,
    /// Lifecycle status.
    pub status: WriteOffStatus,
    /// Lines.
    pub items: Vec<StockWriteOffItem>,
    /// Ledger transaction created by posting.
    pub transaction: Option<TransactionId>,
    /// User who created the write-off.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the write-off was posted.
    pub posted_at: Option<DateTime<Utc>>,
}

impl StockWriteOff {
    /// Builds an empty DRAFT write-off.
    #[must_use]
    pub fn new(input: NewWriteOff, created_by: UserId) -> Self {
        Self {
            id: StockWriteOffId::new(),
            company: input.company,
            branch: input.branch,
            reason: input.reason,
            status: WriteOffStatus::Draft,
            items: Vec::new(),
            transaction: None,
            created_by,
            created_at: Utc::now(),
            posted_at: None,
        }
    }

    /// Returns true once posted.
    #[must_use]
    pub fn is_posted(&self) -> bool {
        self.status == WriteOffStatus::Posted
    }

    /// Fails if the write-off is posted.
    pub fn ensure_editable(&self) -> Result<(), DocumentError> {
        if self.is_posted() {
            return Err(DocumentError::WriteOffPosted(self.id));
        }
        Ok(())
    }

    /// Adds an item.
    pub fn add_item(&mut self, input: NewWriteOffItem) -> Result<&StockWriteOffItem, DocumentError> {
        self.ensure_editable()?;
        self.items.push(StockWriteOffItem::new(input)?);
        Ok(&self.items[self.items.len() - 1])
    }

    /// Changes an item.
    pub fn update_item(
        &mut self,
        id: StockWriteOffItemId,
        update: WriteOffItemUpdate,
    ) -> Result<&StockWriteOffItem, DocumentError> {
        self.ensure_editable()?;
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(DocumentError::WriteOffItemNotFound(id))?;
        let quantity = update.quantity.map(valid_quantity).transpose()?;
        let unit_cost = update.unit_cost.map(valid_cost).transpose()?;
        if let Some(quantity) = quantity {
            item.quantity = quantity;
        }
        if let Some(unit_cost) = unit_cost {
            item.unit_cost = unit_cost;
        }
        Ok(item)
    }

    /// Removes an item.
    pub fn remove_item(&mut self, id: StockWriteOffItemId) -> Result<StockWriteOffItem, DocumentError> {
        self.ensure_editable()?;
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or(DocumentError::WriteOffItemNotFound(id))?;
        Ok(self.items.remove(index))
    }

    /// Total value written off.
    #[must_use]
    pub fn total(&self) -> Decimal {
        round_money(
            self.items
                .iter()
                .map(StockWriteOffItem::total)
                .fold(zero_money(), |acc, v| acc + v),
        )
    }

    /// Fails unless the write-off is a DRAFT with at least one item.
    pub fn ensure_postable(&self) -> Result<(), DocumentError> {
        if self.status != WriteOffStatus::Draft {
            return Err(DocumentError::WriteOffNotDraft(self.id));
        }
        if self.items.is_empty() {
            return Err(DocumentError::EmptyWriteOff(self.id));
        }
        Ok(())
    }

    /// Ledger lines mirroring the items.
    #[must_use]
    pub fn ledger_lines(&self) -> Vec<NewTransactionItem> {
        self.items
            .iter()
            .map(|item| NewTransactionItem {
                product: item.product,
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_cost,
                tax_rate: Decimal::ZERO,
            })
            .collect()
    }

    /// Marks the write-off POSTED against `transaction`.
    pub fn mark_posted(&mut self, transaction: TransactionId) -> Result<(), DocumentError> {
        self.ensure_postable()?;
        self.status = WriteOffStatus::Posted;
        self.transaction = Some(transaction);
        self.posted_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn draft() -> StockWriteOff {
        StockWriteOff::new(
            NewWriteOff {
                company: CompanyId::new(),
                branch: BranchId::new(),
                reason: Some("Water damage".into()),
            },
            UserId::new(),
        )
    }

    fn line(quantity: Decimal, unit_cost: Decimal) -> NewWriteOffItem {
        NewWriteOffItem {
            product: None,
            product_name: "Rice 5kg".into(),
            quantity,
            unit_cost,
        }
    }

    #[test]
    fn test_total_sums_items() {
        let mut write_off = draft();
        write_off.add_item(line(dec!(3), dec!(10))).unwrap();
        write_off.add_item(line(dec!(1), dec!(5))).unwrap();

        assert_eq!(write_off.total(), dec!(35.00));
        assert_eq!(write_off.total().to_string(), "35.00");
    }

    #[test]
    fn test_empty_total_is_zero_money() {
        assert_eq!(draft().total().to_string(), "0.00");
    }

    #[test]
    fn test_quantity_keeps_four_places() {
        let mut write_off = draft();
        let item = write_off.add_item(line(dec!(1.23456), dec!(2))).unwrap();
        assert_eq!(item.quantity, dec!(1.2346));
        assert_eq!(item.total(), dec!(2.47));
    }

    #[test]
    fn test_posted_write_off_rejects_item_changes() {
        let mut write_off = draft();
        let id = write_off.add_item(line(dec!(1), dec!(1))).unwrap().id;
        write_off.mark_posted(TransactionId::new()).unwrap();

        assert!(matches!(
            write_off.add_item(line(dec!(1), dec!(1))),
            Err(DocumentError::WriteOffPosted(_))
        ));
        assert!(matches!(
            write_off.update_item(id, WriteOffItemUpdate::default()),
            Err(DocumentError::WriteOffPosted(_))
        ));
        assert!(matches!(
            write_off.remove_item(id),
            Err(DocumentError::WriteOffPosted(_))
        ));
    }

    #[test]
    fn test_posting_requires_items_and_draft() {
        let mut write_off = draft();
        assert!(matches!(
            write_off.ensure_postable(),
            Err(DocumentError::EmptyWriteOff(_))
        ));

        write_off.add_item(line(dec!(1), dec!(1))).unwrap();
        write_off.mark_posted(TransactionId::new()).unwrap();
        assert!(matches!(
            write_off.mark_posted(TransactionId::new()),
            Err(DocumentError::WriteOffNotDraft(_))
        ));
    }

    #[test]
    fn test_invalid_update_leaves_item_unchanged() {
        let mut write_off = draft();
        let id = write_off.add_item(line(dec!(2), dec!(3))).unwrap().id;

        let result = write_off.update_item(
            id,
            WriteOffItemUpdate {
                quantity: Some(dec!(5)),
                unit_cost: Some(dec!(-1)),
            },
        );

        assert!(matches!(result, Err(DocumentError::InvalidUnitCost(_))));
        assert_eq!(write_off.items[0].quantity, dec!(2));
    }
}
