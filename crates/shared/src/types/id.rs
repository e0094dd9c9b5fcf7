//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `CustomerId` where a `SupplierId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

typed_id!(UserId, "Unique identifier for the user acting on the ledger.");
typed_id!(CompanyId, "Unique identifier for a company (tenant).");
typed_id!(BranchId, "Unique identifier for a company branch.");
typed_id!(AccountId, "Unique identifier for a ledger account.");
typed_id!(TransactionId, "Unique identifier for a ledger transaction.");
typed_id!(
    TransactionItemId,
    "Unique identifier for a transaction line item."
);
typed_id!(CustomerId, "Unique identifier for a customer.");
typed_id!(SupplierId, "Unique identifier for a supplier.");
typed_id!(EmployeeId, "Unique identifier for an employee.");
typed_id!(LoanId, "Unique identifier for a loan.");
typed_id!(ProductId, "Unique identifier for a product.");
typed_id!(StockWriteOffId, "Unique identifier for a stock write-off.");
typed_id!(
    StockWriteOffItemId,
    "Unique identifier for a stock write-off line."
);
typed_id!(StockTakeId, "Unique identifier for a stock take.");
typed_id!(StockTakeLineId, "Unique identifier for a stock take count line.");
typed_id!(DocumentId, "Unique identifier for a settlement document.");
typed_id!(AuditRecordId, "Unique identifier for an audit record.");
