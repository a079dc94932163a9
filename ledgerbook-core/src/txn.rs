//! Ambient write transactions with deferred invariant validation
//!
//! A [`WriteTxn`] groups any number of writes into one atomic unit. Writes
//! are staged in an in-memory overlay; nothing reaches RocksDB until
//! [`WriteTxn::commit`]. Every entry write records its header id in a
//! dirty-header set, and commit runs the balance invariant checker once per
//! dirty header over the final merged state. Any violation aborts the whole
//! transaction and discards every staged write.
//!
//! This is the explicit-commit-hook rendition of a deferred constraint
//! trigger: multiple writes to the same header's lines may pass through
//! intermediate unbalanced states invisible to any other transaction, and
//! only the final state at commit time is validated. The common edit
//! pattern "delete all lines for header X, then insert the new full set"
//! therefore works without tripping the invariant mid-edit.
//!
//! # Lifecycle
//!
//! ```text
//! Open -> Committing -> { Committed | Aborted }
//! ```
//!
//! Commits serialize on the storage commit lock, so validation and apply
//! form one critical section: two transactions rewriting the same header's
//! lines cannot interleave check and apply.

use crate::{
    access, balance,
    balance::Violation,
    error::{Error, Result},
    metrics::Metrics,
    storage::{
        self, encode, index_key, key_pair, key_uuid, Cf, Overlay, Storage, View,
    },
    types::{
        Account, Company, CostCenter, FinancialAccount, LedgerEntry, NewEntry, Principal, Role,
        TenantMembership, TransactionHeader,
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::time::Instant;
use uuid::Uuid;

/// Lifecycle state of an ambient transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    /// Accepting reads and writes
    Open,
    /// Running deferred validation
    Committing,
    /// Writes are durable
    Committed,
    /// Writes were discarded
    Aborted,
}

/// One ambient write transaction, bound to an acting principal.
///
/// All writes are checked against the tenancy rule at staging time
/// (per-row, not deferred); the balance invariant is checked at commit.
pub struct WriteTxn<'a> {
    storage: &'a Storage,
    metrics: &'a Metrics,
    principal: Principal,

    /// Staged writes, applied atomically at commit
    overlay: Overlay,

    /// Header ids touched by entry writes; each is validated exactly once
    dirty: HashSet<Uuid>,

    state: TxnState,
}

impl<'a> WriteTxn<'a> {
    pub(crate) fn new(storage: &'a Storage, metrics: &'a Metrics, principal: Principal) -> Self {
        tracing::debug!(principal_id = %principal.id, "Transaction opened");
        Self {
            storage,
            metrics,
            principal,
            overlay: Overlay::new(),
            dirty: HashSet::new(),
            state: TxnState::Open,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> TxnState {
        self.state
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == TxnState::Open {
            Ok(())
        } else {
            Err(Error::TransactionClosed)
        }
    }

    fn view(&self) -> View<'_> {
        View::merged(self.storage, &self.overlay)
    }

    fn stage_put<T: serde::Serialize>(&mut self, cf: Cf, key: Vec<u8>, value: &T) -> Result<()> {
        let bytes = encode(value)?;
        self.overlay.insert((cf, key), Some(bytes));
        Ok(())
    }

    fn stage_delete(&mut self, cf: Cf, key: Vec<u8>) {
        self.overlay.insert((cf, key), None);
    }

    // Visibility helpers: a row the principal cannot access behaves
    // exactly like a missing row.

    fn visible_company(&self, id: Uuid) -> Result<Company> {
        let view = self.view();
        let company = view.company(id)?.ok_or(Error::CompanyNotFound(id))?;
        if !access::can_access(&view, &self.principal, company.id)? {
            return Err(Error::CompanyNotFound(id));
        }
        Ok(company)
    }

    fn visible_header(&self, id: Uuid) -> Result<TransactionHeader> {
        let view = self.view();
        let header = view.header(id)?.ok_or(Error::HeaderNotFound(id))?;
        if !access::can_access(&view, &self.principal, header.company_id)? {
            return Err(Error::HeaderNotFound(id));
        }
        Ok(header)
    }

    fn visible_account(&self, id: Uuid) -> Result<Account> {
        let view = self.view();
        let account = view.account(id)?.ok_or(Error::AccountNotFound(id))?;
        if !access::can_access(&view, &self.principal, account.company_id)? {
            return Err(Error::AccountNotFound(id));
        }
        Ok(account)
    }

    fn visible_cost_center(&self, id: Uuid) -> Result<CostCenter> {
        let view = self.view();
        let cc = view.cost_center(id)?.ok_or(Error::CostCenterNotFound(id))?;
        if !access::can_access(&view, &self.principal, cc.company_id)? {
            return Err(Error::CostCenterNotFound(id));
        }
        Ok(cc)
    }

    fn visible_financial_account(&self, id: Uuid) -> Result<FinancialAccount> {
        let view = self.view();
        let fa = view
            .financial_account(id)?
            .ok_or(Error::FinancialAccountNotFound(id))?;
        if !access::can_access(&view, &self.principal, fa.company_id)? {
            return Err(Error::FinancialAccountNotFound(id));
        }
        Ok(fa)
    }

    // Company and membership writes

    /// Insert a new company. Any authenticated principal may create one;
    /// the creator is staged as its first admin member, so follow-up writes
    /// in the same transaction already pass the access rule.
    ///
    /// The id must be fresh: re-using an existing company id would overwrite
    /// a tenant the principal may not even see, so it is rejected outright.
    pub fn insert_company(&mut self, company: Company) -> Result<()> {
        self.ensure_open()?;
        if self.view().company(company.id)?.is_some() {
            return Err(Error::AlreadyExists(company.id));
        }

        let membership = TenantMembership {
            company_id: company.id,
            principal_id: self.principal.id,
            role: Role::Admin,
            created_at: Utc::now(),
        };

        self.stage_put(Cf::Companies, key_uuid(company.id).to_vec(), &company)?;
        self.stage_put(
            Cf::Memberships,
            key_pair(company.id, membership.principal_id).to_vec(),
            &membership,
        )?;
        Ok(())
    }

    /// Update a company. The row must be visible to the principal.
    pub fn update_company(&mut self, mut company: Company) -> Result<()> {
        self.ensure_open()?;
        let existing = self.visible_company(company.id)?;

        company.created_at = existing.created_at;
        company.updated_at = Utc::now();
        self.stage_put(Cf::Companies, key_uuid(company.id).to_vec(), &company)?;
        Ok(())
    }

    /// Add a member to a company the principal can access. Role changes go
    /// through remove and re-add; an existing membership is not overwritten.
    pub fn add_member(&mut self, membership: TenantMembership) -> Result<()> {
        self.ensure_open()?;
        access::check_write(&self.view(), &self.principal, membership.company_id)?;
        if self
            .view()
            .membership(membership.company_id, membership.principal_id)?
            .is_some()
        {
            return Err(Error::AlreadyExists(membership.principal_id));
        }

        self.stage_put(
            Cf::Memberships,
            key_pair(membership.company_id, membership.principal_id).to_vec(),
            &membership,
        )?;
        Ok(())
    }

    /// Remove a member from a company the principal can access
    pub fn remove_member(&mut self, company_id: Uuid, principal_id: Uuid) -> Result<()> {
        self.ensure_open()?;
        access::check_write(&self.view(), &self.principal, company_id)?;

        if self.view().membership(company_id, principal_id)?.is_none() {
            return Err(Error::MembershipNotFound {
                company_id,
                principal_id,
            });
        }
        self.stage_delete(Cf::Memberships, key_pair(company_id, principal_id).to_vec());
        Ok(())
    }

    // Chart of accounts

    /// Insert a chart-of-accounts entry. The id must be fresh, the code
    /// must be unique within the company and the parent, if any, must
    /// belong to the same company.
    pub fn insert_account(&mut self, account: Account) -> Result<()> {
        self.ensure_open()?;
        access::check_write(&self.view(), &self.principal, account.company_id)?;
        // The existence check runs after the access check so non-members
        // cannot probe foreign ids
        if self.view().account(account.id)?.is_some() {
            return Err(Error::AlreadyExists(account.id));
        }
        self.validate_account(&account)?;

        self.stage_put(Cf::Accounts, key_uuid(account.id).to_vec(), &account)?;
        self.stage_put(
            Cf::Indices,
            index_key(storage::IDX_ACCOUNT, account.company_id, account.id),
            &(),
        )?;
        Ok(())
    }

    /// Update a chart-of-accounts entry. The company cannot change.
    pub fn update_account(&mut self, mut account: Account) -> Result<()> {
        self.ensure_open()?;
        let existing = self.visible_account(account.id)?;
        if existing.company_id != account.company_id {
            return Err(Error::InvalidEntry(
                "account company cannot change".to_string(),
            ));
        }
        self.validate_account(&account)?;

        account.created_at = existing.created_at;
        account.updated_at = Utc::now();
        self.stage_put(Cf::Accounts, key_uuid(account.id).to_vec(), &account)?;
        Ok(())
    }

    /// Delete a chart-of-accounts entry. Children keep existing with their
    /// parent reference nulled; deletion never cascades down the tree.
    pub fn delete_account(&mut self, id: Uuid) -> Result<()> {
        self.ensure_open()?;
        let account = self.visible_account(id)?;

        let siblings = self
            .view()
            .index_ids(storage::IDX_ACCOUNT, account.company_id)?;
        for sibling_id in siblings {
            let Some(mut sibling) = self.view().account(sibling_id)? else {
                continue;
            };
            if sibling.parent_id == Some(id) {
                sibling.parent_id = None;
                sibling.updated_at = Utc::now();
                self.stage_put(Cf::Accounts, key_uuid(sibling.id).to_vec(), &sibling)?;
            }
        }

        self.stage_delete(Cf::Accounts, key_uuid(id).to_vec());
        self.stage_delete(
            Cf::Indices,
            index_key(storage::IDX_ACCOUNT, account.company_id, id),
        );
        Ok(())
    }

    fn validate_account(&self, account: &Account) -> Result<()> {
        for other_id in self
            .view()
            .index_ids(storage::IDX_ACCOUNT, account.company_id)?
        {
            if other_id == account.id {
                continue;
            }
            if let Some(other) = self.view().account(other_id)? {
                if other.code == account.code {
                    return Err(Error::DuplicateAccountCode(account.code.clone()));
                }
            }
        }

        if let Some(parent_id) = account.parent_id {
            let parent = self
                .view()
                .account(parent_id)?
                .ok_or(Error::AccountNotFound(parent_id))?;
            if parent.company_id != account.company_id {
                return Err(Error::AccountNotFound(parent_id));
            }
        }
        Ok(())
    }

    // Cost centers and financial accounts

    /// Insert a cost center. The id must be fresh.
    pub fn insert_cost_center(&mut self, cc: CostCenter) -> Result<()> {
        self.ensure_open()?;
        access::check_write(&self.view(), &self.principal, cc.company_id)?;
        if self.view().cost_center(cc.id)?.is_some() {
            return Err(Error::AlreadyExists(cc.id));
        }

        self.stage_put(Cf::CostCenters, key_uuid(cc.id).to_vec(), &cc)?;
        self.stage_put(
            Cf::Indices,
            index_key(storage::IDX_COST_CENTER, cc.company_id, cc.id),
            &(),
        )?;
        Ok(())
    }

    /// Update a cost center. The company cannot change.
    pub fn update_cost_center(&mut self, mut cc: CostCenter) -> Result<()> {
        self.ensure_open()?;
        let existing = self.visible_cost_center(cc.id)?;
        if existing.company_id != cc.company_id {
            return Err(Error::InvalidEntry(
                "cost center company cannot change".to_string(),
            ));
        }

        cc.created_at = existing.created_at;
        cc.updated_at = Utc::now();
        self.stage_put(Cf::CostCenters, key_uuid(cc.id).to_vec(), &cc)?;
        Ok(())
    }

    /// Delete a cost center
    pub fn delete_cost_center(&mut self, id: Uuid) -> Result<()> {
        self.ensure_open()?;
        let cc = self.visible_cost_center(id)?;

        self.stage_delete(Cf::CostCenters, key_uuid(id).to_vec());
        self.stage_delete(
            Cf::Indices,
            index_key(storage::IDX_COST_CENTER, cc.company_id, id),
        );
        Ok(())
    }

    /// Insert a financial account. The id must be fresh.
    pub fn insert_financial_account(&mut self, fa: FinancialAccount) -> Result<()> {
        self.ensure_open()?;
        access::check_write(&self.view(), &self.principal, fa.company_id)?;
        if self.view().financial_account(fa.id)?.is_some() {
            return Err(Error::AlreadyExists(fa.id));
        }

        self.stage_put(Cf::FinancialAccounts, key_uuid(fa.id).to_vec(), &fa)?;
        self.stage_put(
            Cf::Indices,
            index_key(storage::IDX_FINANCIAL_ACCOUNT, fa.company_id, fa.id),
            &(),
        )?;
        Ok(())
    }

    /// Update a financial account. The company cannot change.
    pub fn update_financial_account(&mut self, mut fa: FinancialAccount) -> Result<()> {
        self.ensure_open()?;
        let existing = self.visible_financial_account(fa.id)?;
        if existing.company_id != fa.company_id {
            return Err(Error::InvalidEntry(
                "financial account company cannot change".to_string(),
            ));
        }

        fa.created_at = existing.created_at;
        fa.updated_at = Utc::now();
        self.stage_put(Cf::FinancialAccounts, key_uuid(fa.id).to_vec(), &fa)?;
        Ok(())
    }

    /// Delete a financial account
    pub fn delete_financial_account(&mut self, id: Uuid) -> Result<()> {
        self.ensure_open()?;
        let fa = self.visible_financial_account(id)?;

        self.stage_delete(Cf::FinancialAccounts, key_uuid(id).to_vec());
        self.stage_delete(
            Cf::Indices,
            index_key(storage::IDX_FINANCIAL_ACCOUNT, fa.company_id, id),
        );
        Ok(())
    }

    // Transaction headers

    /// Insert a transaction header. The id must be fresh.
    pub fn insert_header(&mut self, header: TransactionHeader) -> Result<()> {
        self.ensure_open()?;
        access::check_write(&self.view(), &self.principal, header.company_id)?;
        if self.view().header(header.id)?.is_some() {
            return Err(Error::AlreadyExists(header.id));
        }
        if self.view().company(header.company_id)?.is_none() {
            return Err(Error::CompanyNotFound(header.company_id));
        }
        self.validate_header_refs(&header)?;

        self.stage_put(Cf::Headers, key_uuid(header.id).to_vec(), &header)?;
        self.stage_put(
            Cf::Indices,
            index_key(storage::IDX_HEADER, header.company_id, header.id),
            &(),
        )?;
        Ok(())
    }

    /// Update a transaction header. The company cannot change: the entry
    /// rows carry a denormalized copy of it.
    pub fn update_header(&mut self, mut header: TransactionHeader) -> Result<()> {
        self.ensure_open()?;
        let existing = self.visible_header(header.id)?;
        if existing.company_id != header.company_id {
            return Err(Error::InvalidEntry(
                "transaction company cannot change".to_string(),
            ));
        }
        self.validate_header_refs(&header)?;

        header.created_at = existing.created_at;
        header.updated_at = Utc::now();
        self.stage_put(Cf::Headers, key_uuid(header.id).to_vec(), &header)?;
        Ok(())
    }

    /// Delete a transaction header, cascading to all of its entries
    pub fn delete_header(&mut self, id: Uuid) -> Result<()> {
        self.ensure_open()?;
        let header = self.visible_header(id)?;

        let entries = self.view().entries(id)?;
        for entry in entries {
            self.stage_delete(Cf::Entries, key_pair(id, entry.id).to_vec());
        }
        self.dirty.insert(id);

        self.stage_delete(Cf::Headers, key_uuid(id).to_vec());
        self.stage_delete(
            Cf::Indices,
            index_key(storage::IDX_HEADER, header.company_id, id),
        );
        Ok(())
    }

    fn validate_header_refs(&self, header: &TransactionHeader) -> Result<()> {
        if let Some(account_id) = header.account_id {
            let account = self
                .view()
                .account(account_id)?
                .ok_or(Error::AccountNotFound(account_id))?;
            if account.company_id != header.company_id {
                return Err(Error::AccountNotFound(account_id));
            }
        }
        if let Some(cc_id) = header.cost_center_id {
            let cc = self
                .view()
                .cost_center(cc_id)?
                .ok_or(Error::CostCenterNotFound(cc_id))?;
            if cc.company_id != header.company_id {
                return Err(Error::CostCenterNotFound(cc_id));
            }
        }
        if let Some(fa_id) = header.financial_account_id {
            let fa = self
                .view()
                .financial_account(fa_id)?
                .ok_or(Error::FinancialAccountNotFound(fa_id))?;
            if fa.company_id != header.company_id {
                return Err(Error::FinancialAccountNotFound(fa_id));
            }
        }
        Ok(())
    }

    // Ledger entries

    /// Insert entry lines for a header. The company id of each row is
    /// denormalized from the header; amounts are rounded to 2 decimal
    /// places and must be non-zero. Marks the header dirty for the
    /// deferred balance check.
    pub fn insert_entries(
        &mut self,
        header_id: Uuid,
        lines: &[NewEntry],
    ) -> Result<Vec<LedgerEntry>> {
        self.ensure_open()?;
        let header = self.visible_header(header_id)?;
        access::check_write(&self.view(), &self.principal, header.company_id)?;

        let mut inserted = Vec::with_capacity(lines.len());
        for line in lines {
            let amount = self.validate_line(header.company_id, line)?;

            let now = Utc::now();
            let entry = LedgerEntry {
                id: Uuid::now_v7(),
                company_id: header.company_id,
                header_id,
                account_id: line.account_id,
                cost_center_id: line.cost_center_id,
                amount,
                created_at: now,
                updated_at: now,
            };
            self.stage_put(Cf::Entries, key_pair(header_id, entry.id).to_vec(), &entry)?;
            tracing::debug!(
                entry_id = %entry.id,
                %header_id,
                amount = %entry.amount,
                "Entry staged"
            );
            inserted.push(entry);
        }

        self.dirty.insert(header_id);
        Ok(inserted)
    }

    /// Replace the payload of one entry line. Company and header references
    /// are derived fields and cannot be retargeted.
    pub fn update_entry(
        &mut self,
        header_id: Uuid,
        entry_id: Uuid,
        line: NewEntry,
    ) -> Result<LedgerEntry> {
        self.ensure_open()?;
        let header = self.visible_header(header_id)?;

        let mut entry = self
            .view()
            .entry(header_id, entry_id)?
            .ok_or(Error::EntryNotFound(entry_id))?;

        entry.amount = self.validate_line(header.company_id, &line)?;
        entry.account_id = line.account_id;
        entry.cost_center_id = line.cost_center_id;
        entry.updated_at = Utc::now();

        self.stage_put(Cf::Entries, key_pair(header_id, entry_id).to_vec(), &entry)?;
        self.dirty.insert(header_id);
        Ok(entry)
    }

    /// Delete one entry line
    pub fn delete_entry(&mut self, header_id: Uuid, entry_id: Uuid) -> Result<()> {
        self.ensure_open()?;
        self.visible_header(header_id)?;

        if self.view().entry(header_id, entry_id)?.is_none() {
            return Err(Error::EntryNotFound(entry_id));
        }
        self.stage_delete(Cf::Entries, key_pair(header_id, entry_id).to_vec());
        self.dirty.insert(header_id);
        Ok(())
    }

    /// Delete every entry line of a header (the replace-all edit pattern).
    /// Returns the number of lines removed.
    pub fn delete_entries(&mut self, header_id: Uuid) -> Result<u64> {
        self.ensure_open()?;
        self.visible_header(header_id)?;

        let entries = self.view().entries(header_id)?;
        let removed = entries.len() as u64;
        for entry in entries {
            self.stage_delete(Cf::Entries, key_pair(header_id, entry.id).to_vec());
        }
        self.dirty.insert(header_id);
        Ok(removed)
    }

    fn validate_line(&self, company_id: Uuid, line: &NewEntry) -> Result<Decimal> {
        let amount = line.amount.round_dp(2);
        if amount.is_zero() {
            return Err(Error::InvalidEntry(
                "entry amount must be non-zero".to_string(),
            ));
        }

        let account = self
            .view()
            .account(line.account_id)?
            .ok_or(Error::AccountNotFound(line.account_id))?;
        if account.company_id != company_id {
            return Err(Error::AccountNotFound(line.account_id));
        }

        if let Some(cc_id) = line.cost_center_id {
            let cc = self
                .view()
                .cost_center(cc_id)?
                .ok_or(Error::CostCenterNotFound(cc_id))?;
            if cc.company_id != company_id {
                return Err(Error::CostCenterNotFound(cc_id));
            }
        }
        Ok(amount)
    }

    // Reads (merged view: own staged writes are visible)

    /// Get a header visible to the principal
    pub fn get_header(&self, id: Uuid) -> Result<TransactionHeader> {
        self.ensure_open()?;
        self.visible_header(id)
    }

    /// List a header's entries in creation order
    pub fn list_entries(&self, header_id: Uuid) -> Result<Vec<LedgerEntry>> {
        self.ensure_open()?;
        self.visible_header(header_id)?;
        self.view().entries(header_id)
    }

    /// The aggregate the invariant checker consumes, over the merged view
    pub fn sum_and_count(&self, header_id: Uuid) -> Result<(Decimal, u64)> {
        self.ensure_open()?;
        self.visible_header(header_id)?;
        self.view().sum_and_count(header_id)
    }

    // Commit and rollback

    /// Run deferred validation and, if every dirty header passes, apply all
    /// staged writes atomically. On violation the transaction aborts: no
    /// staged write reaches the store and the violation is returned.
    pub fn commit(mut self) -> Result<()> {
        self.ensure_open()?;
        self.state = TxnState::Committing;
        let started = Instant::now();

        // Validation and apply are one critical section
        let _guard = self.storage.commit_lock().lock();

        let mut dirty: Vec<Uuid> = self.dirty.iter().copied().collect();
        dirty.sort_unstable();

        for header_id in dirty {
            let view = self.view();
            // A header deleted in this transaction has nothing to check
            if view.header(header_id)?.is_none() {
                continue;
            }
            let (sum, count) = view.sum_and_count(header_id)?;
            if let Err(violation) = balance::check(count, sum) {
                self.state = TxnState::Aborted;
                self.metrics.record_abort();
                tracing::warn!(%header_id, %sum, count, "Commit aborted: {}", violation);
                return Err(match violation {
                    Violation::TooFewLines => Error::TooFewLines { header_id },
                    Violation::Unbalanced(sum) => Error::Unbalanced { header_id, sum },
                });
            }
        }

        // Only rows absent from committed state count as written; staged
        // updates to existing lines do not inflate the counter
        let mut entries_written = 0u64;
        for ((cf, key), value) in &self.overlay {
            if *cf == Cf::Entries
                && value.is_some()
                && self.storage.get_raw(Cf::Entries, key)?.is_none()
            {
                entries_written += 1;
            }
        }

        if !self.overlay.is_empty() {
            self.storage.apply(&self.overlay)?;
        }
        self.state = TxnState::Committed;

        self.metrics.record_commit(started.elapsed().as_secs_f64());
        self.metrics.record_entries_written(entries_written);
        tracing::debug!(
            ops = self.overlay.len(),
            entries = entries_written,
            "Transaction committed"
        );
        Ok(())
    }

    /// Discard all staged writes
    pub fn rollback(mut self) {
        self.state = TxnState::Aborted;
        tracing::debug!(ops = self.overlay.len(), "Transaction rolled back");
    }
}

impl Drop for WriteTxn<'_> {
    fn drop(&mut self) {
        // Dropping an open transaction discards the overlay, same as rollback
        if self.state == TxnState::Open && !self.overlay.is_empty() {
            tracing::debug!(
                ops = self.overlay.len(),
                "Open transaction dropped; staged writes discarded"
            );
        }
    }
}
