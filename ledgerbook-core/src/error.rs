//! Error types for the bookkeeping ledger

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Principal lacks tenant membership for the row's company.
    /// Deliberately carries no identifiers: a denial must not reveal
    /// whether the row exists.
    #[error("Permission denied")]
    PermissionDenied,

    /// Company not found (or not visible to the principal)
    #[error("Company not found: {0}")]
    CompanyNotFound(Uuid),

    /// Transaction header not found (or not visible to the principal)
    #[error("Transaction not found: {0}")]
    HeaderNotFound(Uuid),

    /// Ledger entry not found (or not visible to the principal)
    #[error("Ledger entry not found: {0}")]
    EntryNotFound(Uuid),

    /// Account not found (or not visible to the principal)
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Cost center not found (or not visible to the principal)
    #[error("Cost center not found: {0}")]
    CostCenterNotFound(Uuid),

    /// Financial account not found (or not visible to the principal)
    #[error("Financial account not found: {0}")]
    FinancialAccountNotFound(Uuid),

    /// Membership not found
    #[error("Principal {principal_id} is not a member of company {company_id}")]
    MembershipNotFound {
        /// Company looked up
        company_id: Uuid,
        /// Principal looked up
        principal_id: Uuid,
    },

    /// Insert targeting an id that is already in use. Inserts never
    /// overwrite; updates go through the explicit update operations,
    /// which check visibility against the existing row.
    #[error("Row already exists: {0}")]
    AlreadyExists(Uuid),

    /// Account code already in use within the company
    #[error("Account code already in use: {0}")]
    DuplicateAccountCode(String),

    /// Commit-time violation: fewer than two entry lines
    #[error("Transaction {header_id} must have at least two entry lines")]
    TooFewLines {
        /// Offending transaction header
        header_id: Uuid,
    },

    /// Commit-time violation: entry amounts do not sum to zero
    #[error("Transaction {header_id} is unbalanced: lines sum to {sum}")]
    Unbalanced {
        /// Offending transaction header
        header_id: Uuid,
        /// The non-zero sum, to aid correction
        sum: Decimal,
    },

    /// Invalid entry line (zero amount, dangling reference, ...)
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    /// Operation attempted on a committed or aborted transaction
    #[error("Transaction is no longer open")]
    TransactionClosed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
