//! Sales, purchase and return documents awaiting settlement.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use kasir_shared::types::{
    BranchId, CompanyId, CustomerId, DocumentId, SupplierId, TransactionId, UserId, round_money,
};

use crate::account::AccountOwner;
use crate::document::error::DocumentError;
use crate::ledger::{NewTransactionItem, TransactionCategory, TransactionType};

/// What a settlement document records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementKind {
    /// Sale to a customer.
    Sale,
    /// Purchase from a supplier.
    Purchase,
    /// Goods returned by a customer.
    SalesReturn,
    /// Goods returned to a supplier.
    PurchaseReturn,
}

impl SettlementKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "SALE",
            Self::Purchase => "PURCHASE",
            Self::SalesReturn => "SALES_RETURN",
            Self::PurchaseReturn => "PURCHASE_RETURN",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "SALE" => Some(Self::Sale),
            "PURCHASE" => Some(Self::Purchase),
            "SALES_RETURN" => Some(Self::SalesReturn),
            "PURCHASE_RETURN" => Some(Self::PurchaseReturn),
            _ => None,
        }
    }

    /// Ledger category of the settlement transaction.
    #[must_use]
    pub fn category(&self) -> TransactionCategory {
        match self {
            Self::Sale => TransactionCategory::Sale,
            Self::Purchase => TransactionCategory::Purchase,
            Self::SalesReturn => TransactionCategory::SalesReturn,
            Self::PurchaseReturn => TransactionCategory::PurchaseReturn,
        }
    }

    /// Direction of the settlement transaction.
    #[must_use]
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            Self::Sale | Self::PurchaseReturn => TransactionType::Incoming,
            Self::Purchase | Self::SalesReturn => TransactionType::Outgoing,
        }
    }

    /// Returns true for sales and sales returns.
    #[must_use]
    pub fn is_sales_side(&self) -> bool {
        matches!(self, Self::Sale | Self::SalesReturn)
    }

    /// Returns true if value flows toward the counterparty.
    ///
    /// Sales and purchase returns debit the payment or counterparty account;
    /// purchases and sales returns credit it.
    #[must_use]
    pub fn debits_counterparty(&self) -> bool {
        matches!(self, Self::Sale | Self::PurchaseReturn)
    }
}

impl fmt::Display for SettlementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settlement document status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    /// Not yet recorded in the ledger.
    Open,
    /// Recorded in the ledger.
    Settled,
}

impl SettlementStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Settled => "SETTLED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "OPEN" => Some(Self::Open),
            "SETTLED" => Some(Self::Settled),
            _ => None,
        }
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for a new settlement document.
#[derive(Debug, Clone)]
pub struct NewSettlementDocument {
    /// Owning company.
    pub company: CompanyId,
    /// Owning branch.
    pub branch: BranchId,
    /// Document kind.
    pub kind: SettlementKind,
    /// Document number, carried into the transaction reference.
    pub reference: String,
    /// Customer of a sale or sales return.
    pub customer: Option<CustomerId>,
    /// Supplier of a purchase or purchase return.
    pub supplier: Option<SupplierId>,
    /// Priced lines.
    pub lines: Vec<NewTransactionItem>,
}

/// A sale, purchase or return document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementDocument {
    /// Document identifier.
    pub id: DocumentId,
    /// Owning company.
    pub company: CompanyId,
    /// Owning branch.
    pub branch: BranchId,
    /// Document kind.
    pub kind: SettlementKind,
    /// Lifecycle status.
    pub status: SettlementStatus,
    /// Document number.
    pub reference: String,
    /// Customer of a sale or sales return.
    pub customer: Option<CustomerId>,
    /// Supplier of a purchase or purchase return.
    pub supplier: Option<SupplierId>,
    /// Priced lines.
    pub lines: Vec<NewTransactionItem>,
    /// Settlement transaction.
    pub transaction: Option<TransactionId>,
    /// User who created the document.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the document was settled.
    pub settled_at: Option<DateTime<Utc>>,
}

impl SettlementDocument {
    /// Builds an OPEN document.
    pub fn new(input: NewSettlementDocument, created_by: UserId) -> Result<Self, DocumentError> {
        let reference = input.reference.trim().to_string();
        if reference.is_empty() {
            return Err(DocumentError::ReferenceRequired);
        }
        Ok(Self {
            id: DocumentId::new(),
            company: input.company,
            branch: input.branch,
            kind: input.kind,
            status: SettlementStatus::Open,
            reference,
            customer: input.customer,
            supplier: input.supplier,
            lines: input.lines,
            transaction: None,
            created_by,
            created_at: Utc::now(),
            settled_at: None,
        })
    }

    /// Total of the lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        round_money(self.lines.iter().map(NewTransactionItem::total).sum())
    }

    /// Owner whose primary account carries an on-account settlement.
    #[must_use]
    pub fn counterparty(&self) -> Option<AccountOwner> {
        if self.kind.is_sales_side() {
            self.customer.map(AccountOwner::Customer)
        } else {
            self.supplier.map(AccountOwner::Supplier)
        }
    }

    /// Fails unless the document is OPEN with at least one line.
    pub fn ensure_settleable(&self) -> Result<(), DocumentError> {
        if self.status == SettlementStatus::Settled {
            return Err(DocumentError::DocumentSettled(self.id));
        }
        if self.lines.is_empty() {
            return Err(DocumentError::EmptyDocument(self.id));
        }
        Ok(())
    }

    /// Marks the document SETTLED against `transaction`.
    pub fn mark_settled(&mut self, transaction: TransactionId) -> Result<(), DocumentError> {
        self.ensure_settleable()?;
        self.status = SettlementStatus::Settled;
        self.transaction = Some(transaction);
        self.settled_at = Some(Utc::now());
        Ok(())
    }
}
