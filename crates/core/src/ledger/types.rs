//! Ledger enumerations: transaction type, category, and status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a transaction relative to the company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money or value flowing in.
    Incoming,
    /// Money or value flowing out.
    Outgoing,
}

impl TransactionType {
    /// Returns the string representation of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "INCOMING",
            Self::Outgoing => "OUTGOING",
        }
    }

    /// Parses a type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "INCOMING" => Some(Self::Incoming),
            "OUTGOING" => Some(Self::Outgoing),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Business category of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionCategory {
    /// Sale to a customer.
    Sale,
    /// Purchase from a supplier.
    Purchase,
    /// Goods returned by a customer.
    SalesReturn,
    /// Goods returned to a supplier.
    PurchaseReturn,
    /// Stock or balance adjustment.
    Adjustment,
    /// Transfer between accounts.
    Transfer,
    /// Stock written off.
    WriteOff,
    /// Payment received or made.
    Payment,
    /// Operating expense.
    Expense,
}

impl TransactionCategory {
    /// All categories, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Sale,
        Self::Purchase,
        Self::SalesReturn,
        Self::PurchaseReturn,
        Self::Adjustment,
        Self::Transfer,
        Self::WriteOff,
        Self::Payment,
        Self::Expense,
    ];

    /// Returns the string representation of the category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "SALE",
            Self::Purchase => "PURCHASE",
            Self::SalesReturn => "SALES_RETURN",
            Self::PurchaseReturn => "PURCHASE_RETURN",
            Self::Adjustment => "ADJUSTMENT",
            Self::Transfer => "TRANSFER",
            Self::WriteOff => "WRITE_OFF",
            Self::Payment => "PAYMENT",
            Self::Expense => "EXPENSE",
        }
    }

    /// Parses a category, accepting `SALES RETURN` style spellings.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_uppercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
    }
}

impl fmt::Display for TransactionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction lifecycle status.
///
/// The valid transitions are:
/// - Draft → Pending | Failed
/// - Pending → Completed | Failed
/// - Draft | Pending | Completed | Failed → Cancelled | Reversed | Voided
///
/// Cancelled, Reversed and Voided are the reversing statuses. Entering one
/// undoes the balance effect of the transaction, and none can be left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Being recorded.
    Draft,
    /// Recorded, awaiting settlement.
    Pending,
    /// Settled.
    Completed,
    /// Failed to settle.
    Failed,
    /// Cancelled before taking effect.
    Cancelled,
    /// Reversed after taking effect.
    Reversed,
    /// Voided.
    Voided,
}

impl TransactionStatus {
    /// All statuses, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Draft,
        Self::Pending,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
        Self::Reversed,
        Self::Voided,
    ];

    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Reversed => "REVERSED",
            Self::Voided => "VOIDED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
    }

    /// Returns true for statuses that undo the balance effect.
    #[must_use]
    pub fn is_reversing(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Reversed | Self::Voided)
    }

    /// Returns true while line items may still change.
    #[must_use]
    pub fn allows_item_changes(&self) -> bool {
        matches!(self, Self::Draft | Self::Pending)
    }

    /// Returns true if a duplicate guard should still see the transaction.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.is_reversing() && *self != Self::Failed
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
