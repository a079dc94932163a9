//! Core types for the bookkeeping ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (Decimal for money)

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Acting principal, as supplied by the external identity provider.
///
/// The core trusts the identifier as already authenticated. The `superuser`
/// flag is a tenant-independent capability that bypasses membership checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Principal identifier
    pub id: Uuid,

    /// Global admin capability (bypasses tenant membership)
    pub superuser: bool,
}

impl Principal {
    /// Create a regular principal
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            superuser: false,
        }
    }

    /// Create a superuser principal
    pub fn superuser(id: Uuid) -> Self {
        Self { id, superuser: true }
    }
}

/// Default accounting regime of a company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Regime {
    /// Cash basis (transactions recognized at cash date)
    Cash = 1,
    /// Accrual basis (transactions recognized at competence date)
    Accrual = 2,
}

/// Company (tenant). Owns all other entities transitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    /// Unique company ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Tax identifier (optional)
    pub tax_id: Option<String>,

    /// Default accounting regime
    pub regime: Regime,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

/// Membership role within a company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Role {
    /// Full control over the company
    Admin = 1,
    /// Day-to-day bookkeeping
    Collaborator = 2,
    /// External accountant access
    Accountant = 3,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "admin",
            Role::Collaborator => "collaborator",
            Role::Accountant => "accountant",
        };
        write!(f, "{}", s)
    }
}

/// Links a principal to a company. Resolves the many-to-many relation
/// consumed exclusively by the access rule; any role grants access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantMembership {
    /// Company this membership belongs to
    pub company_id: Uuid,

    /// Member principal
    pub principal_id: Uuid,

    /// Role within the company
    pub role: Role,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

/// Chart-of-accounts classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AccountKind {
    /// Asset accounts (debit-normal)
    Asset = 1,
    /// Liability accounts (credit-normal)
    Liability = 2,
    /// Equity accounts (credit-normal)
    Equity = 3,
    /// Revenue accounts (credit-normal)
    Revenue = 4,
    /// Expense accounts (debit-normal)
    Expense = 5,
}

impl AccountKind {
    /// Whether a positive (debit) amount increases this account
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountKind::Asset | AccountKind::Expense)
    }
}

/// Chart-of-accounts entry. Accounts form a tree via `parent_id`;
/// deleting a parent nulls the child reference, never cascades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique account ID
    pub id: Uuid,

    /// Owning company
    pub company_id: Uuid,

    /// Human code, unique per company (e.g. "1.1.01")
    pub code: String,

    /// Display name
    pub name: String,

    /// Classification
    pub kind: AccountKind,

    /// Free-text sub-type (optional)
    pub subtype: Option<String>,

    /// Parent account (tree structure, optional)
    pub parent_id: Option<Uuid>,

    /// Active flag
    pub active: bool,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

/// Cost center for analytic allocation of entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostCenter {
    /// Unique cost center ID
    pub id: Uuid,

    /// Owning company
    pub company_id: Uuid,

    /// Display name
    pub name: String,

    /// Active flag
    pub active: bool,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

/// Financial account (bank account, wallet, cash drawer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialAccount {
    /// Unique financial account ID
    pub id: Uuid,

    /// Owning company
    pub company_id: Uuid,

    /// Display name
    pub name: String,

    /// Free-text kind (checking, wallet, ...)
    pub kind: String,

    /// Opening balance
    pub opening_balance: Decimal,

    /// Active flag
    pub active: bool,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

/// Business classification of a transaction header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum HeaderKind {
    /// Money in
    Income = 1,
    /// Money out
    Expense = 2,
}

/// Lifecycle status of a transaction header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum HeaderStatus {
    /// Planned for a future date
    Scheduled = 1,
    /// Awaiting settlement
    Pending = 2,
    /// Settled
    Realized = 3,
    /// Matched against a bank statement
    Reconciled = 4,
}

/// Recurrence metadata for transaction series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recurrence {
    /// One-off transaction
    None,
    /// Part of an installment series (1-based index out of total)
    Installment {
        /// Total installments in the series
        total: u32,
        /// Position in the series, 1-based
        index: u32,
        /// Originating header of the series
        origin: Uuid,
    },
    /// Fixed repetition (e.g. monthly rent)
    Fixed {
        /// Originating header of the series
        origin: Uuid,
    },
}

/// Transaction header: one business event grouping a balanced set of
/// ledger entries (an invoice, a transfer, a payroll run).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionHeader {
    /// Unique header ID
    pub id: Uuid,

    /// Owning company
    pub company_id: Uuid,

    /// Income or expense
    pub kind: HeaderKind,

    /// Cached total of the positive legs (maintained by the caller)
    pub total: Decimal,

    /// Cash date (settlement)
    pub cash_date: NaiveDate,

    /// Competence date (accrual)
    pub competence_date: NaiveDate,

    /// Lifecycle status
    pub status: HeaderStatus,

    /// Recurrence metadata
    pub recurrence: Recurrence,

    /// Description shown to users
    pub description: String,

    /// Free-text notes (optional)
    pub notes: Option<String>,

    /// Financial account reference (optional)
    pub financial_account_id: Option<Uuid>,

    /// Default ledger account reference (optional)
    pub account_id: Option<Uuid>,

    /// Default cost center reference (optional)
    pub cost_center_id: Option<Uuid>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

/// One debit or credit leg of a transaction.
///
/// The sign of `amount` is the side indicator: positive = debit,
/// negative = credit. There is no separate debit/credit field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry ID (UUIDv7 for creation ordering)
    pub id: Uuid,

    /// Owning company, denormalized from the header at insert time.
    /// Derived field, never independently editable.
    pub company_id: Uuid,

    /// Header this entry belongs to
    pub header_id: Uuid,

    /// Ledger account of this leg
    pub account_id: Uuid,

    /// Cost center allocation (optional)
    pub cost_center_id: Option<Uuid>,

    /// Signed amount, 2 decimal places (positive = debit, negative = credit)
    pub amount: Decimal,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Whether this leg is a debit
    pub fn is_debit(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

/// Input line for entry insertion. Company and header references are
/// derived by the store; callers only supply the leg itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntry {
    /// Ledger account of this leg
    pub account_id: Uuid,

    /// Signed amount (positive = debit, negative = credit)
    pub amount: Decimal,

    /// Cost center allocation (optional)
    pub cost_center_id: Option<Uuid>,
}
