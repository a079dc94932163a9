//! # Ledgerbook Core
//!
//! Multi-tenant double-entry bookkeeping engine with deferred invariant
//! validation, built on RocksDB.
//!
//! ## Components
//!
//! - **Tenancy access rule** - every row is owned by a company; a principal
//!   sees a row only through a membership (or the superuser capability)
//! - **Entry store** - transaction headers and their signed entry lines,
//!   persisted in RocksDB column families
//! - **Balance checker** - the double-entry invariant: at least two lines
//!   per header and an exact zero sum
//! - **Ambient transactions** - writes stage in an overlay and validate at
//!   commit, so multi-step edits may pass through unbalanced intermediate
//!   states that no other transaction observes
//!
//! ## Example
//!
//! ```no_run
//! use ledgerbook_core::{Config, Ledger, Principal};
//! use uuid::Uuid;
//!
//! fn main() -> ledgerbook_core::Result<()> {
//!     let ledger = Ledger::open(Config::default())?;
//!     let principal = Principal::new(Uuid::new_v4());
//!
//!     let txn = ledger.begin(&principal);
//!     // stage company, header and entry writes, then:
//!     txn.commit()?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod access;

pub mod balance;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod storage;
pub mod txn;
pub mod types;

pub use config::{Config, RocksDBConfig};
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use metrics::Metrics;
pub use storage::{Storage, StorageStats};
pub use txn::{TxnState, WriteTxn};
pub use types::{
    Account, AccountKind, Company, CostCenter, FinancialAccount, HeaderKind, HeaderStatus,
    LedgerEntry, NewEntry, Principal, Recurrence, Regime, Role, TenantMembership,
    TransactionHeader,
};
