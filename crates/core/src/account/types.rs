//! Account domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use kasir_shared::types::{
    AccountId, BranchId, CompanyId, CustomerId, EmployeeId, LoanId, StockWriteOffId, SupplierId,
    zero_money,
};

/// Account subtype discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountKind {
    /// Bank account.
    Bank,
    /// Cash drawer.
    Cash,
    /// Receivable account of a customer.
    Customer,
    /// Payable account of a supplier.
    Supplier,
    /// Internal expense bucket.
    Expense,
    /// Internal sales bucket.
    Sales,
    /// Internal purchases bucket.
    Purchases,
    /// Written-off stock value.
    WriteOff,
    /// Loan account.
    Loan,
    /// Account of a branch.
    Branch,
    /// Account of an employee.
    Employee,
}

impl AccountKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Bank,
        Self::Cash,
        Self::Customer,
        Self::Supplier,
        Self::Expense,
        Self::Sales,
        Self::Purchases,
        Self::WriteOff,
        Self::Loan,
        Self::Branch,
        Self::Employee,
    ];

    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bank => "BANK",
            Self::Cash => "CASH",
            Self::Customer => "CUSTOMER",
            Self::Supplier => "SUPPLIER",
            Self::Expense => "EXPENSE",
            Self::Sales => "SALES",
            Self::Purchases => "PURCHASES",
            Self::WriteOff => "WRITE_OFF",
            Self::Loan => "LOAN",
            Self::Branch => "BRANCH",
            Self::Employee => "EMPLOYEE",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_uppercase().replace([' ', '-'], "_");
        Self::ALL.into_iter().find(|kind| kind.as_str() == normalized)
    }

    /// Returns true if accounts of this kind carry an `is_primary` flag.
    #[must_use]
    pub fn supports_primary(&self) -> bool {
        matches!(
            self,
            Self::Customer | Self::Supplier | Self::Employee | Self::Loan | Self::Branch
        )
    }

    /// Returns true if this kind has one shared account per company branch.
    #[must_use]
    pub fn is_scope_kind(&self) -> bool {
        matches!(
            self,
            Self::Cash | Self::Expense | Self::Sales | Self::Purchases | Self::WriteOff
        )
    }

    /// Returns true if payments can be drawn from or deposited to this kind.
    #[must_use]
    pub fn is_payment_kind(&self) -> bool {
        matches!(self, Self::Bank | Self::Cash)
    }

    /// Default label used for accounts created on demand.
    #[must_use]
    pub fn default_name(&self) -> &'static str {
        match self {
            Self::Bank => "Bank",
            Self::Cash => "Cash",
            Self::Customer => "Customer receivable",
            Self::Supplier => "Supplier payable",
            Self::Expense => "Expenses",
            Self::Sales => "Sales",
            Self::Purchases => "Purchases",
            Self::WriteOff => "Stock write-offs",
            Self::Loan => "Loan",
            Self::Branch => "Branch account",
            Self::Employee => "Employee account",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The entity a primary-capable account belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountOwner {
    /// A customer.
    Customer(CustomerId),
    /// A supplier.
    Supplier(SupplierId),
    /// An employee.
    Employee(EmployeeId),
    /// A loan.
    Loan(LoanId),
    /// A branch.
    Branch(BranchId),
}

impl AccountOwner {
    /// Account kind owned by this owner type.
    #[must_use]
    pub fn kind(&self) -> AccountKind {
        match self {
            Self::Customer(_) => AccountKind::Customer,
            Self::Supplier(_) => AccountKind::Supplier,
            Self::Employee(_) => AccountKind::Employee,
            Self::Loan(_) => AccountKind::Loan,
            Self::Branch(_) => AccountKind::Branch,
        }
    }

    /// Raw identifier of the owner.
    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            Self::Customer(id) => id.into_inner(),
            Self::Supplier(id) => id.into_inner(),
            Self::Employee(id) => id.into_inner(),
            Self::Loan(id) => id.into_inner(),
            Self::Branch(id) => id.into_inner(),
        }
    }

    /// Rebuilds an owner from a stored kind and identifier.
    #[must_use]
    pub fn from_parts(kind: AccountKind, id: Uuid) -> Option<Self> {
        match kind {
            AccountKind::Customer => Some(Self::Customer(CustomerId::from_uuid(id))),
            AccountKind::Supplier => Some(Self::Supplier(SupplierId::from_uuid(id))),
            AccountKind::Employee => Some(Self::Employee(EmployeeId::from_uuid(id))),
            AccountKind::Loan => Some(Self::Loan(LoanId::from_uuid(id))),
            AccountKind::Branch => Some(Self::Branch(BranchId::from_uuid(id))),
            _ => None,
        }
    }
}

impl fmt::Display for AccountOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

/// Subtype-specific account data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountDetails {
    /// Bank account.
    Bank {
        /// Name of the bank.
        bank_name: String,
        /// Account number at the bank.
        account_number: Option<String>,
    },
    /// Cash drawer.
    Cash,
    /// Customer receivable.
    Customer {
        /// Owning customer.
        customer: CustomerId,
        /// Default account for the customer.
        is_primary: bool,
    },
    /// Supplier payable.
    Supplier {
        /// Owning supplier.
        supplier: SupplierId,
        /// Default account for the supplier.
        is_primary: bool,
    },
    /// Expense bucket.
    Expense {
        /// Free-form expense category.
        expense_category: Option<String>,
    },
    /// Sales bucket.
    Sales,
    /// Purchases bucket.
    Purchases,
    /// Written-off stock value.
    WriteOff {
        /// Write-off document this account belongs to, if any.
        write_off: Option<StockWriteOffId>,
        /// Value written off through this account.
        amount: Decimal,
    },
    /// Loan account.
    Loan {
        /// Owning loan.
        loan: LoanId,
        /// Default account for the loan.
        is_primary: bool,
    },
    /// Branch account.
    Branch {
        /// Owning branch.
        branch: BranchId,
        /// Default account for the branch.
        is_primary: bool,
    },
    /// Employee account.
    Employee {
        /// Owning employee.
        employee: EmployeeId,
        /// Default account for the employee.
        is_primary: bool,
    },
}

impl AccountDetails {
    /// Details for a fresh account of an ownerless kind.
    ///
    /// Returns `None` for kinds that need an owner or a bank name.
    #[must_use]
    pub fn for_scope(kind: AccountKind) -> Option<Self> {
        match kind {
            AccountKind::Cash => Some(Self::Cash),
            AccountKind::Sales => Some(Self::Sales),
            AccountKind::Purchases => Some(Self::Purchases),
            AccountKind::Expense => Some(Self::Expense {
                expense_category: None,
            }),
            AccountKind::WriteOff => Some(Self::WriteOff {
                write_off: None,
                amount: zero_money(),
            }),
            _ => None,
        }
    }

    /// Details for a fresh account of an owner.
    #[must_use]
    pub fn for_owner(owner: AccountOwner, is_primary: bool) -> Self {
        match owner {
            AccountOwner::Customer(customer) => Self::Customer {
                customer,
                is_primary,
            },
            AccountOwner::Supplier(supplier) => Self::Supplier {
                supplier,
                is_primary,
            },
            AccountOwner::Employee(employee) => Self::Employee {
                employee,
                is_primary,
            },
            AccountOwner::Loan(loan) => Self::Loan { loan, is_primary },
            AccountOwner::Branch(branch) => Self::Branch { branch, is_primary },
        }
    }

    /// The subtype discriminator.
    #[must_use]
    pub fn kind(&self) -> AccountKind {
        match self {
            Self::Bank { .. } => AccountKind::Bank,
            Self::Cash => AccountKind::Cash,
            Self::Customer { .. } => AccountKind::Customer,
            Self::Supplier { .. } => AccountKind::Supplier,
            Self::Expense { .. } => AccountKind::Expense,
            Self::Sales => AccountKind::Sales,
            Self::Purchases => AccountKind::Purchases,
            Self::WriteOff { .. } => AccountKind::WriteOff,
            Self::Loan { .. } => AccountKind::Loan,
            Self::Branch { .. } => AccountKind::Branch,
            Self::Employee { .. } => AccountKind::Employee,
        }
    }

    /// Owner of a primary-capable account.
    #[must_use]
    pub fn owner(&self) -> Option<AccountOwner> {
        match self {
            Self::Customer { customer, .. } => Some(AccountOwner::Customer(*customer)),
            Self::Supplier { supplier, .. } => Some(AccountOwner::Supplier(*supplier)),
            Self::Employee { employee, .. } => Some(AccountOwner::Employee(*employee)),
            Self::Loan { loan, .. } => Some(AccountOwner::Loan(*loan)),
            Self::Branch { branch, .. } => Some(AccountOwner::Branch(*branch)),
            _ => None,
        }
    }

    /// Returns the `is_primary` flag; false for kinds without one.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        match self {
            Self::Customer { is_primary, .. }
            | Self::Supplier { is_primary, .. }
            | Self::Employee { is_primary, .. }
            | Self::Loan { is_primary, .. }
            | Self::Branch { is_primary, .. } => *is_primary,
            _ => false,
        }
    }

    /// Sets the `is_primary` flag. No effect on kinds without one.
    pub fn set_primary(&mut self, primary: bool) {
        match self {
            Self::Customer { is_primary, .. }
            | Self::Supplier { is_primary, .. }
            | Self::Employee { is_primary, .. }
            | Self::Loan { is_primary, .. }
            | Self::Branch { is_primary, .. } => *is_primary = primary,
            _ => {}
        }
    }

    /// Write-off document of a write-off account.
    #[must_use]
    pub fn write_off(&self) -> Option<StockWriteOffId> {
        match self {
            Self::WriteOff { write_off, .. } => *write_off,
            _ => None,
        }
    }

    /// Value held by a write-off account.
    #[must_use]
    pub fn written_off_amount(&self) -> Option<Decimal> {
        match self {
            Self::WriteOff { amount, .. } => Some(*amount),
            _ => None,
        }
    }
}

/// A ledger account.
///
/// `balance` is debit-positive: debits add, credits subtract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier.
    pub id: AccountId,
    /// Owning company.
    pub company: CompanyId,
    /// Owning branch.
    pub branch: BranchId,
    /// Display label.
    pub name: String,
    /// Running balance.
    pub balance: Decimal,
    /// Subtype data.
    pub details: AccountDetails,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Builds a fresh account with a zero balance.
    #[must_use]
    pub fn new(company: CompanyId, branch: BranchId, name: String, details: AccountDetails) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new(),
            company,
            branch,
            name,
            balance: zero_money(),
            details,
            created_at: now,
            updated_at: now,
        }
    }

    /// The subtype discriminator.
    #[must_use]
    pub fn kind(&self) -> AccountKind {
        self.details.kind()
    }

    /// Owner of a primary-capable account.
    #[must_use]
    pub fn owner(&self) -> Option<AccountOwner> {
        self.details.owner()
    }

    /// Returns the `is_primary` flag.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.details.is_primary()
    }

    /// Records a debit of `amount`.
    pub fn apply_debit(&mut self, amount: Decimal) {
        self.balance += amount;
        self.updated_at = Utc::now();
    }

    /// Records a credit of `amount`.
    pub fn apply_credit(&mut self, amount: Decimal) {
        self.balance -= amount;
        self.updated_at = Utc::now();
    }
}

/// How the primary flag of an incoming account treats existing primaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrimaryRule {
    /// Demote every other primary account of the owner.
    #[default]
    Demote,
    /// Fail if another primary account exists.
    RejectExisting,
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Owning company.
    pub company: CompanyId,
    /// Owning branch.
    pub branch: BranchId,
    /// Display label.
    pub name: String,
    /// Subtype data.
    pub details: AccountDetails,
    /// Handling of existing primaries.
    pub primary_rule: PrimaryRule,
}

/// Input for updating an account.
///
/// The kind of an account never changes; `details` must match it.
#[derive(Debug, Clone)]
pub struct AccountUpdate {
    /// Account to update.
    pub id: AccountId,
    /// New label.
    pub name: Option<String>,
    /// New subtype data.
    pub details: Option<AccountDetails>,
    /// Handling of existing primaries.
    pub primary_rule: PrimaryRule,
}

/// Criteria for listing accounts. `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountFilter {
    /// Owning company.
    pub company: Option<CompanyId>,
    /// Owning branch.
    pub branch: Option<BranchId>,
    /// Subtype.
    pub kind: Option<AccountKind>,
    /// Owner.
    pub owner: Option<AccountOwner>,
}

impl AccountFilter {
    /// Returns true if `account` satisfies every criterion.
    #[must_use]
    pub fn matches(&self, account: &Account) -> bool {
        self.company.is_none_or(|company| account.company == company)
            && self.branch.is_none_or(|branch| account.branch == branch)
            && self.kind.is_none_or(|kind| account.kind() == kind)
            && self.owner.is_none_or(|owner| account.owner() == Some(owner))
    }
}
