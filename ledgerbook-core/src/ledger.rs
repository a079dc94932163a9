//! Main ledger orchestration layer
//!
//! This module ties together storage, tenancy access, and ambient
//! transactions into a high-level API for bookkeeping writes.
//!
//! # Example
//!
//! ```no_run
//! use ledgerbook_core::{Config, Ledger, Principal};
//! use uuid::Uuid;
//!
//! fn main() -> ledgerbook_core::Result<()> {
//!     let config = Config::default();
//!     let ledger = Ledger::open(config)?;
//!
//!     let principal = Principal::new(Uuid::new_v4());
//!     let txn = ledger.begin(&principal);
//!     // ... stage writes ...
//!     txn.commit()?;
//!
//!     Ok(())
//! }
//! ```

use crate::{
    access,
    error::{Error, Result},
    metrics::Metrics,
    storage::{self, StorageStats, View},
    txn::WriteTxn,
    types::{
        Account, Company, CostCenter, FinancialAccount, LedgerEntry, Principal,
        TenantMembership, TransactionHeader,
    },
    Config, Storage,
};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Main ledger interface
pub struct Ledger {
    /// Storage backend
    storage: Storage,

    /// Metrics collector
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger with configuration
    pub fn open(config: Config) -> Result<Self> {
        let storage = Storage::open(&config)?;
        let metrics = Metrics::new().map_err(|e| Error::Other(e.to_string()))?;

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            "Ledger opened"
        );

        Ok(Self {
            storage,
            metrics,
            config,
        })
    }

    /// Begin an ambient write transaction for the acting principal
    pub fn begin(&self, principal: &Principal) -> WriteTxn<'_> {
        WriteTxn::new(&self.storage, &self.metrics, principal.clone())
    }

    /// Whether the principal may touch rows owned by `company_id`
    pub fn can_access(&self, principal: &Principal, company_id: Uuid) -> Result<bool> {
        let view = View::committed(&self.storage);
        access::can_access(&view, principal, company_id)
    }

    // Committed-state reads. Rows the principal cannot access behave
    // exactly like missing rows; list reads filter silently.

    /// Get a company visible to the principal
    pub fn get_company(&self, principal: &Principal, id: Uuid) -> Result<Company> {
        let view = View::committed(&self.storage);
        let company = view.company(id)?.ok_or(Error::CompanyNotFound(id))?;
        if !access::can_access(&view, principal, company.id)? {
            return Err(Error::CompanyNotFound(id));
        }
        Ok(company)
    }

    /// List the companies the principal belongs to (all, for a superuser)
    pub fn list_companies(&self, principal: &Principal) -> Result<Vec<Company>> {
        let view = View::committed(&self.storage);
        let mut visible = Vec::new();
        for company in view.companies()? {
            if access::can_access(&view, principal, company.id)? {
                visible.push(company);
            }
        }
        Ok(visible)
    }

    /// List the memberships of a company visible to the principal
    pub fn list_members(
        &self,
        principal: &Principal,
        company_id: Uuid,
    ) -> Result<Vec<TenantMembership>> {
        self.get_company(principal, company_id)?;
        View::committed(&self.storage).members(company_id)
    }

    /// Get a transaction header visible to the principal
    pub fn get_header(&self, principal: &Principal, id: Uuid) -> Result<TransactionHeader> {
        let view = View::committed(&self.storage);
        let header = view.header(id)?.ok_or(Error::HeaderNotFound(id))?;
        if !access::can_access(&view, principal, header.company_id)? {
            return Err(Error::HeaderNotFound(id));
        }
        Ok(header)
    }

    /// List a company's transaction headers
    pub fn list_headers(
        &self,
        principal: &Principal,
        company_id: Uuid,
    ) -> Result<Vec<TransactionHeader>> {
        self.get_company(principal, company_id)?;

        let view = View::committed(&self.storage);
        let mut headers = Vec::new();
        for id in view.index_ids(storage::IDX_HEADER, company_id)? {
            if let Some(header) = view.header(id)? {
                headers.push(header);
            }
        }
        Ok(headers)
    }

    /// List a header's entries in creation order
    pub fn list_entries(&self, principal: &Principal, header_id: Uuid) -> Result<Vec<LedgerEntry>> {
        self.get_header(principal, header_id)?;
        View::committed(&self.storage).entries(header_id)
    }

    /// Sum and count of a header's committed entries
    pub fn sum_and_count(&self, principal: &Principal, header_id: Uuid) -> Result<(Decimal, u64)> {
        self.get_header(principal, header_id)?;
        View::committed(&self.storage).sum_and_count(header_id)
    }

    /// Get a chart-of-accounts entry visible to the principal
    pub fn get_account(&self, principal: &Principal, id: Uuid) -> Result<Account> {
        let view = View::committed(&self.storage);
        let account = view.account(id)?.ok_or(Error::AccountNotFound(id))?;
        if !access::can_access(&view, principal, account.company_id)? {
            return Err(Error::AccountNotFound(id));
        }
        Ok(account)
    }

    /// List a company's chart of accounts
    pub fn list_accounts(&self, principal: &Principal, company_id: Uuid) -> Result<Vec<Account>> {
        self.get_company(principal, company_id)?;

        let view = View::committed(&self.storage);
        let mut accounts = Vec::new();
        for id in view.index_ids(storage::IDX_ACCOUNT, company_id)? {
            if let Some(account) = view.account(id)? {
                accounts.push(account);
            }
        }
        Ok(accounts)
    }

    /// List a company's cost centers
    pub fn list_cost_centers(
        &self,
        principal: &Principal,
        company_id: Uuid,
    ) -> Result<Vec<CostCenter>> {
        self.get_company(principal, company_id)?;

        let view = View::committed(&self.storage);
        let mut centers = Vec::new();
        for id in view.index_ids(storage::IDX_COST_CENTER, company_id)? {
            if let Some(cc) = view.cost_center(id)? {
                centers.push(cc);
            }
        }
        Ok(centers)
    }

    /// List a company's financial accounts
    pub fn list_financial_accounts(
        &self,
        principal: &Principal,
        company_id: Uuid,
    ) -> Result<Vec<FinancialAccount>> {
        self.get_company(principal, company_id)?;

        let view = View::committed(&self.storage);
        let mut accounts = Vec::new();
        for id in view.index_ids(storage::IDX_FINANCIAL_ACCOUNT, company_id)? {
            if let Some(fa) = view.financial_account(id)? {
                accounts.push(fa);
            }
        }
        Ok(accounts)
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration this ledger was opened with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AccountKind, HeaderKind, HeaderStatus, NewEntry, Recurrence, Regime, Role,
    };
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn create_test_ledger() -> (Ledger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Ledger::open(config).unwrap(), temp_dir)
    }

    fn test_company() -> Company {
        Company {
            id: Uuid::now_v7(),
            name: "Acme Ltda".to_string(),
            tax_id: None,
            regime: Regime::Cash,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_account(company_id: Uuid, code: &str, kind: AccountKind) -> Account {
        Account {
            id: Uuid::now_v7(),
            company_id,
            code: code.to_string(),
            name: format!("Account {}", code),
            kind,
            subtype: None,
            parent_id: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_header(company_id: Uuid) -> TransactionHeader {
        TransactionHeader {
            id: Uuid::now_v7(),
            company_id,
            kind: HeaderKind::Expense,
            total: Decimal::new(10000, 2),
            cash_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            competence_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            status: HeaderStatus::Pending,
            recurrence: Recurrence::None,
            description: "Office supplies".to_string(),
            notes: None,
            financial_account_id: None,
            account_id: None,
            cost_center_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Seed a company with two accounts, owned by `principal`
    fn seed_company(ledger: &Ledger, principal: &Principal) -> (Company, Account, Account) {
        let company = test_company();
        let cash = test_account(company.id, "1.1.01", AccountKind::Asset);
        let expenses = test_account(company.id, "4.1.01", AccountKind::Expense);

        let mut txn = ledger.begin(principal);
        txn.insert_company(company.clone()).unwrap();
        txn.insert_account(cash.clone()).unwrap();
        txn.insert_account(expenses.clone()).unwrap();
        txn.commit().unwrap();

        (company, cash, expenses)
    }

    #[test]
    fn test_open_and_stats() {
        let (ledger, _temp) = create_test_ledger();
        let stats = ledger.stats().unwrap();
        assert_eq!(stats.total_companies, 0);
    }

    #[test]
    fn test_balanced_transaction_commits() {
        let (ledger, _temp) = create_test_ledger();
        let principal = Principal::new(Uuid::new_v4());
        let (company, cash, expenses) = seed_company(&ledger, &principal);

        let header = test_header(company.id);
        let mut txn = ledger.begin(&principal);
        txn.insert_header(header.clone()).unwrap();
        txn.insert_entries(
            header.id,
            &[
                NewEntry {
                    account_id: expenses.id,
                    amount: Decimal::new(10000, 2),
                    cost_center_id: None,
                },
                NewEntry {
                    account_id: cash.id,
                    amount: Decimal::new(-10000, 2),
                    cost_center_id: None,
                },
            ],
        )
        .unwrap();
        txn.commit().unwrap();

        let (sum, count) = ledger.sum_and_count(&principal, header.id).unwrap();
        assert_eq!(sum, Decimal::ZERO);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_single_line_rejected_and_nothing_persists() {
        let (ledger, _temp) = create_test_ledger();
        let principal = Principal::new(Uuid::new_v4());
        let (company, _cash, expenses) = seed_company(&ledger, &principal);

        let header = test_header(company.id);
        let mut txn = ledger.begin(&principal);
        txn.insert_header(header.clone()).unwrap();
        txn.insert_entries(
            header.id,
            &[NewEntry {
                account_id: expenses.id,
                amount: Decimal::new(5000, 2),
                cost_center_id: None,
            }],
        )
        .unwrap();

        let err = txn.commit().unwrap_err();
        assert!(matches!(err, Error::TooFewLines { header_id } if header_id == header.id));

        // Rollback was total: not even the header survived
        assert!(matches!(
            ledger.get_header(&principal, header.id),
            Err(Error::HeaderNotFound(_))
        ));
    }

    #[test]
    fn test_unbalanced_rejected_with_sum() {
        let (ledger, _temp) = create_test_ledger();
        let principal = Principal::new(Uuid::new_v4());
        let (company, cash, expenses) = seed_company(&ledger, &principal);

        let header = test_header(company.id);
        let mut txn = ledger.begin(&principal);
        txn.insert_header(header.clone()).unwrap();
        txn.insert_entries(
            header.id,
            &[
                NewEntry {
                    account_id: expenses.id,
                    amount: Decimal::new(10000, 2),
                    cost_center_id: None,
                },
                NewEntry {
                    account_id: cash.id,
                    amount: Decimal::new(-9000, 2),
                    cost_center_id: None,
                },
            ],
        )
        .unwrap();

        let err = txn.commit().unwrap_err();
        match err {
            Error::Unbalanced { header_id, sum } => {
                assert_eq!(header_id, header.id);
                assert_eq!(sum, Decimal::new(1000, 2));
            }
            other => panic!("expected Unbalanced, got {:?}", other),
        }
        assert!(ledger.get_header(&principal, header.id).is_err());
    }

    #[test]
    fn test_replace_all_lines_in_one_transaction() {
        let (ledger, _temp) = create_test_ledger();
        let principal = Principal::new(Uuid::new_v4());
        let (company, cash, expenses) = seed_company(&ledger, &principal);

        let header = test_header(company.id);
        let mut txn = ledger.begin(&principal);
        txn.insert_header(header.clone()).unwrap();
        txn.insert_entries(
            header.id,
            &[
                NewEntry {
                    account_id: expenses.id,
                    amount: Decimal::new(10000, 2),
                    cost_center_id: None,
                },
                NewEntry {
                    account_id: cash.id,
                    amount: Decimal::new(-10000, 2),
                    cost_center_id: None,
                },
            ],
        )
        .unwrap();
        txn.commit().unwrap();

        // Edit: delete both lines, insert a three-leg split. The header is
        // momentarily line-less inside the transaction; only the final
        // state is validated.
        let mut txn = ledger.begin(&principal);
        let removed = txn.delete_entries(header.id).unwrap();
        assert_eq!(removed, 2);
        let (sum, count) = txn.sum_and_count(header.id).unwrap();
        assert_eq!((sum, count), (Decimal::ZERO, 0));

        txn.insert_entries(
            header.id,
            &[
                NewEntry {
                    account_id: expenses.id,
                    amount: Decimal::new(30000, 2),
                    cost_center_id: None,
                },
                NewEntry {
                    account_id: cash.id,
                    amount: Decimal::new(-15000, 2),
                    cost_center_id: None,
                },
                NewEntry {
                    account_id: cash.id,
                    amount: Decimal::new(-15000, 2),
                    cost_center_id: None,
                },
            ],
        )
        .unwrap();
        txn.commit().unwrap();

        let entries = ledger.list_entries(&principal, header.id).unwrap();
        assert_eq!(entries.len(), 3);
        let (sum, count) = ledger.sum_and_count(&principal, header.id).unwrap();
        assert_eq!((sum, count), (Decimal::ZERO, 3));
    }

    #[test]
    fn test_tenancy_isolation() {
        let (ledger, _temp) = create_test_ledger();
        let owner = Principal::new(Uuid::new_v4());
        let outsider = Principal::new(Uuid::new_v4());
        let (company, cash, expenses) = seed_company(&ledger, &owner);

        let header = test_header(company.id);
        let mut txn = ledger.begin(&owner);
        txn.insert_header(header.clone()).unwrap();
        txn.insert_entries(
            header.id,
            &[
                NewEntry {
                    account_id: expenses.id,
                    amount: Decimal::new(10000, 2),
                    cost_center_id: None,
                },
                NewEntry {
                    account_id: cash.id,
                    amount: Decimal::new(-10000, 2),
                    cost_center_id: None,
                },
            ],
        )
        .unwrap();
        txn.commit().unwrap();

        // The outsider knows every identifier and still sees nothing
        assert!(ledger.list_companies(&outsider).unwrap().is_empty());
        assert!(matches!(
            ledger.get_company(&outsider, company.id),
            Err(Error::CompanyNotFound(_))
        ));
        assert!(matches!(
            ledger.get_header(&outsider, header.id),
            Err(Error::HeaderNotFound(_))
        ));
        assert!(matches!(
            ledger.list_entries(&outsider, header.id),
            Err(Error::HeaderNotFound(_))
        ));
        assert!(matches!(
            ledger.get_account(&outsider, cash.id),
            Err(Error::AccountNotFound(_))
        ));

        // Writes are denied without leaking existence
        let mut txn = ledger.begin(&outsider);
        assert!(matches!(
            txn.insert_header(test_header(company.id)),
            Err(Error::PermissionDenied)
        ));
        txn.rollback();

        // A superuser bypasses membership entirely
        let root = Principal::superuser(Uuid::new_v4());
        assert_eq!(ledger.list_companies(&root).unwrap().len(), 1);
        assert!(ledger.get_header(&root, header.id).is_ok());
    }

    #[test]
    fn test_membership_grants_access() {
        let (ledger, _temp) = create_test_ledger();
        let owner = Principal::new(Uuid::new_v4());
        let accountant = Principal::new(Uuid::new_v4());
        let (company, _, _) = seed_company(&ledger, &owner);

        let mut txn = ledger.begin(&owner);
        txn.add_member(TenantMembership {
            company_id: company.id,
            principal_id: accountant.id,
            role: Role::Accountant,
            created_at: Utc::now(),
        })
        .unwrap();
        txn.commit().unwrap();

        assert!(ledger.can_access(&accountant, company.id).unwrap());
        assert_eq!(ledger.list_companies(&accountant).unwrap().len(), 1);
        assert_eq!(ledger.list_members(&owner, company.id).unwrap().len(), 2);

        let mut txn = ledger.begin(&owner);
        txn.remove_member(company.id, accountant.id).unwrap();
        txn.commit().unwrap();
        assert!(!ledger.can_access(&accountant, company.id).unwrap());
    }

    #[test]
    fn test_delete_header_cascades_entries() {
        let (ledger, _temp) = create_test_ledger();
        let principal = Principal::new(Uuid::new_v4());
        let (company, cash, expenses) = seed_company(&ledger, &principal);

        let header = test_header(company.id);
        let mut txn = ledger.begin(&principal);
        txn.insert_header(header.clone()).unwrap();
        txn.insert_entries(
            header.id,
            &[
                NewEntry {
                    account_id: expenses.id,
                    amount: Decimal::new(10000, 2),
                    cost_center_id: None,
                },
                NewEntry {
                    account_id: cash.id,
                    amount: Decimal::new(-10000, 2),
                    cost_center_id: None,
                },
            ],
        )
        .unwrap();
        txn.commit().unwrap();

        let mut txn = ledger.begin(&principal);
        txn.delete_header(header.id).unwrap();
        txn.commit().unwrap();

        assert!(ledger.get_header(&principal, header.id).is_err());
        assert!(ledger.list_headers(&principal, company.id).unwrap().is_empty());
    }

    #[test]
    fn test_rollback_discards_staged_writes() {
        let (ledger, _temp) = create_test_ledger();
        let principal = Principal::new(Uuid::new_v4());
        let (company, _, _) = seed_company(&ledger, &principal);

        let header = test_header(company.id);
        let mut txn = ledger.begin(&principal);
        txn.insert_header(header.clone()).unwrap();
        txn.rollback();

        assert!(ledger.get_header(&principal, header.id).is_err());
        assert!(ledger.list_headers(&principal, company.id).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_account_code_rejected() {
        let (ledger, _temp) = create_test_ledger();
        let principal = Principal::new(Uuid::new_v4());
        let (company, _, _) = seed_company(&ledger, &principal);

        let mut txn = ledger.begin(&principal);
        let dup = test_account(company.id, "1.1.01", AccountKind::Asset);
        assert!(matches!(
            txn.insert_account(dup),
            Err(Error::DuplicateAccountCode(code)) if code == "1.1.01"
        ));
        txn.rollback();
    }

    #[test]
    fn test_parent_account_deletion_nulls_children() {
        let (ledger, _temp) = create_test_ledger();
        let principal = Principal::new(Uuid::new_v4());
        let (company, cash, _) = seed_company(&ledger, &principal);

        let mut child = test_account(company.id, "1.1.02", AccountKind::Asset);
        child.parent_id = Some(cash.id);

        let mut txn = ledger.begin(&principal);
        txn.insert_account(child.clone()).unwrap();
        txn.commit().unwrap();

        let mut txn = ledger.begin(&principal);
        txn.delete_account(cash.id).unwrap();
        txn.commit().unwrap();

        let surviving = ledger.get_account(&principal, child.id).unwrap();
        assert_eq!(surviving.parent_id, None);
        assert!(ledger.get_account(&principal, cash.id).is_err());
    }

    #[test]
    fn test_reinserting_existing_company_rejected() {
        let (ledger, _temp) = create_test_ledger();
        let owner = Principal::new(Uuid::new_v4());
        let (company, _, _) = seed_company(&ledger, &owner);

        // An outsider who learned the company id cannot re-insert it to
        // overwrite the row and forge an admin membership for themselves
        let outsider = Principal::new(Uuid::new_v4());
        let mut forged = test_company();
        forged.id = company.id;
        forged.name = "Hostile takeover".to_string();

        let mut txn = ledger.begin(&outsider);
        assert!(matches!(
            txn.insert_company(forged),
            Err(Error::AlreadyExists(id)) if id == company.id
        ));
        txn.rollback();

        assert!(!ledger.can_access(&outsider, company.id).unwrap());
        assert_eq!(
            ledger.get_company(&owner, company.id).unwrap().name,
            company.name
        );
        assert_eq!(ledger.list_members(&owner, company.id).unwrap().len(), 1);
    }

    #[test]
    fn test_insert_cannot_overwrite_foreign_row() {
        let (ledger, _temp) = create_test_ledger();
        let victim = Principal::new(Uuid::new_v4());
        let (victim_co, victim_cash, victim_expenses) = seed_company(&ledger, &victim);

        let header = test_header(victim_co.id);
        let victim_cc = CostCenter {
            id: Uuid::now_v7(),
            company_id: victim_co.id,
            name: "Operations".to_string(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let mut txn = ledger.begin(&victim);
        txn.insert_header(header.clone()).unwrap();
        txn.insert_cost_center(victim_cc.clone()).unwrap();
        txn.insert_entries(
            header.id,
            &[
                NewEntry {
                    account_id: victim_expenses.id,
                    amount: Decimal::new(10000, 2),
                    cost_center_id: None,
                },
                NewEntry {
                    account_id: victim_cash.id,
                    amount: Decimal::new(-10000, 2),
                    cost_center_id: None,
                },
            ],
        )
        .unwrap();
        txn.commit().unwrap();

        // An attacker with a tenant of their own passes the written-value
        // check against their company but cannot clobber the victim's rows
        // by re-using their ids
        let attacker = Principal::new(Uuid::new_v4());
        let (attacker_co, _, _) = seed_company(&ledger, &attacker);

        let mut txn = ledger.begin(&attacker);
        let mut forged_account = test_account(attacker_co.id, "9.9.99", AccountKind::Asset);
        forged_account.id = victim_cash.id;
        assert!(matches!(
            txn.insert_account(forged_account),
            Err(Error::AlreadyExists(id)) if id == victim_cash.id
        ));

        let mut forged_header = test_header(attacker_co.id);
        forged_header.id = header.id;
        assert!(matches!(
            txn.insert_header(forged_header),
            Err(Error::AlreadyExists(id)) if id == header.id
        ));

        let mut forged_cc = victim_cc.clone();
        forged_cc.company_id = attacker_co.id;
        assert!(matches!(
            txn.insert_cost_center(forged_cc),
            Err(Error::AlreadyExists(id)) if id == victim_cc.id
        ));
        txn.rollback();

        // Victim rows remain intact under their own tenant
        assert_eq!(
            ledger.get_account(&victim, victim_cash.id).unwrap().company_id,
            victim_co.id
        );
        assert_eq!(
            ledger.get_header(&victim, header.id).unwrap().company_id,
            victim_co.id
        );
        assert_eq!(
            ledger.list_entries(&victim, header.id).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_entries_written_counts_new_rows_only() {
        let (ledger, _temp) = create_test_ledger();
        let principal = Principal::new(Uuid::new_v4());
        let (company, cash, expenses) = seed_company(&ledger, &principal);

        let header = test_header(company.id);
        let mut txn = ledger.begin(&principal);
        txn.insert_header(header.clone()).unwrap();
        let inserted = txn
            .insert_entries(
                header.id,
                &[
                    NewEntry {
                        account_id: expenses.id,
                        amount: Decimal::new(10000, 2),
                        cost_center_id: None,
                    },
                    NewEntry {
                        account_id: cash.id,
                        amount: Decimal::new(-10000, 2),
                        cost_center_id: None,
                    },
                ],
            )
            .unwrap();
        txn.commit().unwrap();
        assert_eq!(ledger.metrics().entries_written_total.get(), 2);

        // Rewriting an existing line stages a put over a committed key;
        // the counter only tracks rows new to the store
        let mut txn = ledger.begin(&principal);
        txn.update_entry(
            header.id,
            inserted[0].id,
            NewEntry {
                account_id: expenses.id,
                amount: Decimal::new(10000, 2),
                cost_center_id: None,
            },
        )
        .unwrap();
        txn.commit().unwrap();
        assert_eq!(ledger.metrics().entries_written_total.get(), 2);
    }

    #[test]
    fn test_zero_amount_entry_rejected_eagerly() {
        let (ledger, _temp) = create_test_ledger();
        let principal = Principal::new(Uuid::new_v4());
        let (company, _, expenses) = seed_company(&ledger, &principal);

        let header = test_header(company.id);
        let mut txn = ledger.begin(&principal);
        txn.insert_header(header.clone()).unwrap();
        let err = txn
            .insert_entries(
                header.id,
                &[NewEntry {
                    account_id: expenses.id,
                    amount: Decimal::ZERO,
                    cost_center_id: None,
                }],
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEntry(_)));
        txn.rollback();
    }
}
