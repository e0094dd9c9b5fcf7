//! Stock take documents.
//!
//! A stock take compares expected and counted quantities. Approving it posts
//! the net value of the differences.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use kasir_shared::types::{
    BranchId, CompanyId, ProductId, StockTakeId, StockTakeLineId, TransactionId, UserId,
    round_money, round_quantity, zero_money,
};

use crate::document::error::DocumentError;

/// Stock take lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockTakeStatus {
    /// Counting in progress.
    Draft,
    /// Approved; immutable.
    Approved,
}

impl StockTakeStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Approved => "APPROVED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "APPROVED" => Some(Self::Approved),
            _ => None,
        }
    }
}

impl fmt::Display for StockTakeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for a count line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockTakeLine {
    /// Product counted.
    pub product: Option<ProductId>,
    /// Product label.
    pub product_name: String,
    /// Quantity on record.
    pub expected_quantity: Decimal,
    /// Quantity counted.
    pub counted_quantity: Decimal,
    /// Cost per unit.
    pub unit_cost: Decimal,
}

/// A count line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTakeLine {
    /// Line identifier.
    pub id: StockTakeLineId,
    /// Product counted.
    pub product: Option<ProductId>,
    /// Product label.
    pub product_name: String,
    /// Quantity on record.
    pub expected_quantity: Decimal,
    /// Quantity counted.
    pub counted_quantity: Decimal,
    /// Cost per unit.
    pub unit_cost: Decimal,
}

impl StockTakeLine {
    fn new(input: NewStockTakeLine) -> Result<Self, DocumentError> {
        let product_name = input.product_name.trim().to_string();
        if product_name.is_empty() {
            return Err(DocumentError::ProductNameRequired);
        }
        for quantity in [input.expected_quantity, input.counted_quantity] {
            if quantity < Decimal::ZERO {
                return Err(DocumentError::NegativeQuantity(quantity));
            }
        }
        if input.unit_cost < Decimal::ZERO {
            return Err(DocumentError::InvalidUnitCost(input.unit_cost));
        }
        Ok(Self {
            id: StockTakeLineId::new(),
            product: input.product,
            product_name,
            expected_quantity: round_quantity(input.expected_quantity),
            counted_quantity: round_quantity(input.counted_quantity),
            unit_cost: round_money(input.unit_cost),
        })
    }

    /// Counted minus expected; negative for a shortage.
    #[must_use]
    pub fn variance_quantity(&self) -> Decimal {
        self.counted_quantity - self.expected_quantity
    }

    /// Value of the variance.
    #[must_use]
    pub fn variance_value(&self) -> Decimal {
        round_money(self.variance_quantity() * self.unit_cost)
    }
}

/// Input for a new stock take.
#[derive(Debug, Clone)]
pub struct NewStockTake {
    /// Owning company.
    pub company: CompanyId,
    /// Owning branch.
    pub branch: BranchId,
    /// Count lines.
    pub lines: Vec<NewStockTakeLine>,
}

/// A stock take document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTake {
    /// Stock take identifier.
    pub id: StockTakeId,
    /// Owning company.
    pub company: CompanyId,
    /// Owning branch.
    pub branch: BranchId,
    /// Lifecycle status.
    pub status: StockTakeStatus,
    /// Count lines.
    pub lines: Vec<StockTakeLine>,
    /// Adjustment transaction, absent when nothing differed.
    pub transaction: Option<TransactionId>,
    /// User who created the stock take.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the stock take was approved.
    pub approved_at: Option<DateTime<Utc>>,
}

impl StockTake {
    /// Builds a DRAFT stock take.
    pub fn new(input: NewStockTake, created_by: UserId) -> Result<Self, DocumentError> {
        let lines = input
            .lines
            .into_iter()
            .map(StockTakeLine::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: StockTakeId::new(),
            company: input.company,
            branch: input.branch,
            status: StockTakeStatus::Draft,
            lines,
            transaction: None,
            created_by,
            created_at: Utc::now(),
            approved_at: None,
        })
    }

    /// Adds a count line to a DRAFT stock take.
    pub fn add_line(&mut self, input: NewStockTakeLine) -> Result<&StockTakeLine, DocumentError> {
        self.ensure_draft()?;
        self.lines.push(StockTakeLine::new(input)?);
        Ok(&self.lines[self.lines.len() - 1])
    }

    /// Removes a count line from a DRAFT stock take.
    pub fn remove_line(&mut self, id: StockTakeLineId) -> Result<StockTakeLine, DocumentError> {
        self.ensure_draft()?;
        let index = self
            .lines
            .iter()
            .position(|line| line.id == id)
            .ok_or(DocumentError::StockTakeLineNotFound(id))?;
        Ok(self.lines.remove(index))
    }

    /// Sum of line variance values; negative for a net shortage.
    #[must_use]
    pub fn net_variance(&self) -> Decimal {
        round_money(
            self.lines
                .iter()
                .map(StockTakeLine::variance_value)
                .fold(zero_money(), |acc, v| acc + v),
        )
    }

    /// Fails unless the stock take is a DRAFT with at least one line.
    pub fn ensure_approvable(&self) -> Result<(), DocumentError> {
        self.ensure_draft()?;
        if self.lines.is_empty() {
            return Err(DocumentError::EmptyStockTake(self.id));
        }
        Ok(())
    }

    /// Marks the stock take APPROVED.
    pub fn mark_approved(&mut self, transaction: Option<TransactionId>) -> Result<(), DocumentError> {
        self.ensure_approvable()?;
        self.status = StockTakeStatus::Approved;
        self.transaction = transaction;
        self.approved_at = Some(Utc::now());
        Ok(())
    }

    fn ensure_draft(&self) -> Result<(), DocumentError> {
        if self.status == StockTakeStatus::Approved {
            return Err(DocumentError::StockTakeApproved(self.id));
        }
        Ok(())
    }
}
