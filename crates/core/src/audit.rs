//! Audit records written alongside ledger mutations.
//!
//! Every create, update or delete of an account, transaction, item or
//! document appends one [`AuditRecord`] through the same unit of work, so the
//! record commits or rolls back with the change it describes. The acting user
//! is always passed in explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use kasir_shared::types::{AuditRecordId, UserId};

use crate::store::StoreError;

/// Kind of mutation recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Row inserted.
    Create,
    /// Row changed.
    Update,
    /// Row removed.
    Delete,
}

impl AuditAction {
    /// Returns the string representation of the action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    /// Parses an action from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CREATE" => Some(Self::Create),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of entity an audit record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEntity {
    /// Ledger account.
    Account,
    /// Ledger transaction.
    Transaction,
    /// Transaction line item.
    TransactionItem,
    /// Stock write-off document.
    StockWriteOff,
    /// Stock take document.
    StockTake,
    /// Sale, purchase or return document.
    SettlementDocument,
}

impl AuditEntity {
    /// Returns the string representation of the entity kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "ACCOUNT",
            Self::Transaction => "TRANSACTION",
            Self::TransactionItem => "TRANSACTION_ITEM",
            Self::StockWriteOff => "STOCK_WRITE_OFF",
            Self::StockTake => "STOCK_TAKE",
            Self::SettlementDocument => "SETTLEMENT_DOCUMENT",
        }
    }

    /// Parses an entity kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ACCOUNT" => Some(Self::Account),
            "TRANSACTION" => Some(Self::Transaction),
            "TRANSACTION_ITEM" => Some(Self::TransactionItem),
            "STOCK_WRITE_OFF" => Some(Self::StockWriteOff),
            "STOCK_TAKE" => Some(Self::StockTake),
            "SETTLEMENT_DOCUMENT" => Some(Self::SettlementDocument),
            _ => None,
        }
    }
}

impl fmt::Display for AuditEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One audited mutation with before/after JSON snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Record identifier.
    pub id: AuditRecordId,
    /// User who performed the change.
    pub actor: UserId,
    /// Kind of mutation.
    pub action: AuditAction,
    /// Kind of entity changed.
    pub entity: AuditEntity,
    /// Identifier of the changed entity.
    pub entity_id: Uuid,
    /// Snapshot before the change (absent on create).
    pub before: Option<serde_json::Value>,
    /// Snapshot after the change (absent on delete).
    pub after: Option<serde_json::Value>,
    /// When the change was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Builds a CREATE record.
    pub fn created<T: Serialize>(
        actor: UserId,
        entity: AuditEntity,
        entity_id: impl Into<Uuid>,
        after: &T,
    ) -> Result<Self, StoreError> {
        Ok(Self::new(
            actor,
            AuditAction::Create,
            entity,
            entity_id.into(),
            None,
            Some(serde_json::to_value(after)?),
        ))
    }

    /// Builds an UPDATE record.
    pub fn updated<T: Serialize>(
        actor: UserId,
        entity: AuditEntity,
        entity_id: impl Into<Uuid>,
        before: &T,
        after: &T,
    ) -> Result<Self, StoreError> {
        Ok(Self::new(
            actor,
            AuditAction::Update,
            entity,
            entity_id.into(),
            Some(serde_json::to_value(before)?),
            Some(serde_json::to_value(after)?),
        ))
    }

    /// Builds a DELETE record.
    pub fn deleted<T: Serialize>(
        actor: UserId,
        entity: AuditEntity,
        entity_id: impl Into<Uuid>,
        before: &T,
    ) -> Result<Self, StoreError> {
        Ok(Self::new(
            actor,
            AuditAction::Delete,
            entity,
            entity_id.into(),
            Some(serde_json::to_value(before)?),
            None,
        ))
    }

    fn new(
        actor: UserId,
        action: AuditAction,
        entity: AuditEntity,
        entity_id: Uuid,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: AuditRecordId::new(),
            actor,
            action,
            entity,
            entity_id,
            before,
            after,
            recorded_at: Utc::now(),
        }
    }
}
