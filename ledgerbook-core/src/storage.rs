//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `companies` - Companies/tenants (key: company_id)
//! - `memberships` - Tenant memberships (key: company_id || principal_id)
//! - `accounts` - Chart of accounts (key: account_id)
//! - `cost_centers` - Cost centers (key: cost_center_id)
//! - `financial_accounts` - Financial accounts (key: financial_account_id)
//! - `headers` - Transaction headers (key: header_id)
//! - `entries` - Ledger entries (key: header_id || entry_id)
//! - `indices` - Per-company secondary indices (key: tag || company_id || id)
//!
//! Entry keys embed the header id as a prefix so one range scan yields a
//! header's full line set in creation order (entry ids are UUIDv7).
//!
//! All mutations reach the database through [`Storage::apply`], which turns
//! a staged overlay into a single atomic `WriteBatch`. Uncommitted state
//! lives only in the overlay, never in RocksDB.

use crate::{
    error::{Error, Result},
    types::{
        Account, Company, CostCenter, FinancialAccount, LedgerEntry, TenantMembership,
        TransactionHeader,
    },
    Config,
};
use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Direction, IteratorMode,
    Options, WriteBatch, DB,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_COMPANIES: &str = "companies";
const CF_MEMBERSHIPS: &str = "memberships";
const CF_ACCOUNTS: &str = "accounts";
const CF_COST_CENTERS: &str = "cost_centers";
const CF_FINANCIAL_ACCOUNTS: &str = "financial_accounts";
const CF_HEADERS: &str = "headers";
const CF_ENTRIES: &str = "entries";
const CF_INDICES: &str = "indices";

/// Index tags for the `indices` column family
pub(crate) const IDX_HEADER: u8 = 1;
pub(crate) const IDX_ACCOUNT: u8 = 2;
pub(crate) const IDX_COST_CENTER: u8 = 3;
pub(crate) const IDX_FINANCIAL_ACCOUNT: u8 = 4;

/// Logical column family identifier, used to address staged writes
/// before they are bound to RocksDB handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Cf {
    Companies,
    Memberships,
    Accounts,
    CostCenters,
    FinancialAccounts,
    Headers,
    Entries,
    Indices,
}

impl Cf {
    fn name(self) -> &'static str {
        match self {
            Cf::Companies => CF_COMPANIES,
            Cf::Memberships => CF_MEMBERSHIPS,
            Cf::Accounts => CF_ACCOUNTS,
            Cf::CostCenters => CF_COST_CENTERS,
            Cf::FinancialAccounts => CF_FINANCIAL_ACCOUNTS,
            Cf::Headers => CF_HEADERS,
            Cf::Entries => CF_ENTRIES,
            Cf::Indices => CF_INDICES,
        }
    }
}

/// Staged writes of one ambient transaction: key -> Some(value) for a put,
/// None for a delete. Ordered so prefix scans can merge committed and
/// staged state.
pub(crate) type Overlay = BTreeMap<(Cf, Vec<u8>), Option<Vec<u8>>>;

// Key helpers

pub(crate) fn key_uuid(id: Uuid) -> [u8; 16] {
    *id.as_bytes()
}

pub(crate) fn key_pair(a: Uuid, b: Uuid) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(a.as_bytes());
    key[16..].copy_from_slice(b.as_bytes());
    key
}

pub(crate) fn index_key(tag: u8, company_id: Uuid, id: Uuid) -> Vec<u8> {
    let mut key = Vec::with_capacity(33);
    key.push(tag);
    key.extend_from_slice(company_id.as_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

pub(crate) fn index_prefix(tag: u8, company_id: Uuid) -> Vec<u8> {
    let mut key = Vec::with_capacity(17);
    key.push(tag);
    key.extend_from_slice(company_id.as_bytes());
    key
}

pub(crate) fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

/// Storage wrapper for RocksDB
pub struct Storage {
    db: DB,

    /// Serializes commit validation and apply into one critical section
    commit_lock: Mutex<()>,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);
        db_opts.set_level_zero_file_num_compaction_trigger(
            config.rocksdb.level0_file_num_compaction_trigger,
        );

        // Universal compaction for write-heavy workload
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_COMPANIES, Self::cf_options_reference()),
            ColumnFamilyDescriptor::new(CF_MEMBERSHIPS, Self::cf_options_reference()),
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_reference()),
            ColumnFamilyDescriptor::new(CF_COST_CENTERS, Self::cf_options_reference()),
            ColumnFamilyDescriptor::new(CF_FINANCIAL_ACCOUNTS, Self::cf_options_reference()),
            ColumnFamilyDescriptor::new(CF_HEADERS, Self::cf_options_ledger()),
            ColumnFamilyDescriptor::new(CF_ENTRIES, Self::cf_options_ledger()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self {
            db,
            commit_lock: Mutex::new(()),
        })
    }

    // Column family options

    fn cf_options_ledger() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_reference() -> Options {
        let mut opts = Options::default();
        // Reference data is frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Indices benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false); // 10 bits per key
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf(&self, cf: Cf) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(cf.name())
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", cf.name())))
    }

    /// Point read of committed state
    pub(crate) fn get_raw(&self, cf: Cf, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let handle = self.cf(cf)?;
        Ok(self.db.get_cf(&handle, key)?)
    }

    /// Range scan of committed state, restricted to keys with `prefix`
    pub(crate) fn scan_prefix(&self, cf: Cf, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let handle = self.cf(cf)?;
        let iter = self
            .db
            .iterator_cf(&handle, IteratorMode::From(prefix, Direction::Forward));

        let mut pairs = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            pairs.push((key.to_vec(), value.to_vec()));
        }
        Ok(pairs)
    }

    /// Apply a staged overlay as one atomic write batch
    pub(crate) fn apply(&self, overlay: &Overlay) -> Result<()> {
        let mut batch = WriteBatch::default();

        for ((cf, key), value) in overlay {
            let handle = self.cf(*cf)?;
            match value {
                Some(v) => batch.put_cf(&handle, key, v),
                None => batch.delete_cf(&handle, key),
            }
        }

        self.db.write(batch)?;

        tracing::debug!(ops = overlay.len(), "Overlay applied");
        Ok(())
    }

    /// Lock serializing deferred validation against concurrent commits
    pub(crate) fn commit_lock(&self) -> &Mutex<()> {
        &self.commit_lock
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            total_companies: self.approximate_count(Cf::Companies)?,
            total_headers: self.approximate_count(Cf::Headers)?,
            total_entries: self.approximate_count(Cf::Entries)?,
        })
    }

    fn approximate_count(&self, cf: Cf) -> Result<u64> {
        let handle = self.cf(cf)?;
        // RocksDB property for approximate count
        let prop = self
            .db
            .property_int_value_cf(&handle, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);
        Ok(prop)
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Approximate number of companies
    pub total_companies: u64,
    /// Approximate number of transaction headers
    pub total_headers: u64,
    /// Approximate number of ledger entries
    pub total_entries: u64,
}

/// A read view over committed state, optionally merged with the staged
/// overlay of one ambient transaction.
///
/// This is the isolation boundary: a transaction sees previously committed
/// state plus its own uncommitted writes, never the overlay of a
/// concurrent transaction.
pub(crate) struct View<'a> {
    storage: &'a Storage,
    overlay: Option<&'a Overlay>,
}

impl<'a> View<'a> {
    /// View of committed state only
    pub(crate) fn committed(storage: &'a Storage) -> Self {
        Self {
            storage,
            overlay: None,
        }
    }

    /// View merged with a transaction's staged writes
    pub(crate) fn merged(storage: &'a Storage, overlay: &'a Overlay) -> Self {
        Self {
            storage,
            overlay: Some(overlay),
        }
    }

    fn get_raw(&self, cf: Cf, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(overlay) = self.overlay {
            if let Some(staged) = overlay.get(&(cf, key.to_vec())) {
                return Ok(staged.clone());
            }
        }
        self.storage.get_raw(cf, key)
    }

    fn scan_prefix(&self, cf: Cf, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.storage.scan_prefix(cf, prefix)?.into_iter().collect();

        if let Some(overlay) = self.overlay {
            let from = (cf, prefix.to_vec());
            for ((ocf, key), value) in
                overlay.range((Bound::Included(from), Bound::Unbounded))
            {
                if *ocf != cf || !key.starts_with(prefix) {
                    break;
                }
                match value {
                    Some(v) => {
                        merged.insert(key.clone(), v.clone());
                    }
                    None => {
                        merged.remove(key);
                    }
                }
            }
        }

        Ok(merged.into_iter().collect())
    }

    fn get<T: DeserializeOwned>(&self, cf: Cf, key: &[u8]) -> Result<Option<T>> {
        match self.get_raw(cf, key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    // Typed reads

    pub(crate) fn company(&self, id: Uuid) -> Result<Option<Company>> {
        self.get(Cf::Companies, &key_uuid(id))
    }

    pub(crate) fn companies(&self) -> Result<Vec<Company>> {
        self.scan_prefix(Cf::Companies, &[])?
            .iter()
            .map(|(_, v)| decode(v))
            .collect()
    }

    pub(crate) fn membership(
        &self,
        company_id: Uuid,
        principal_id: Uuid,
    ) -> Result<Option<TenantMembership>> {
        self.get(Cf::Memberships, &key_pair(company_id, principal_id))
    }

    pub(crate) fn members(&self, company_id: Uuid) -> Result<Vec<TenantMembership>> {
        self.scan_prefix(Cf::Memberships, &key_uuid(company_id))?
            .iter()
            .map(|(_, v)| decode(v))
            .collect()
    }

    pub(crate) fn account(&self, id: Uuid) -> Result<Option<Account>> {
        self.get(Cf::Accounts, &key_uuid(id))
    }

    pub(crate) fn cost_center(&self, id: Uuid) -> Result<Option<CostCenter>> {
        self.get(Cf::CostCenters, &key_uuid(id))
    }

    pub(crate) fn financial_account(&self, id: Uuid) -> Result<Option<FinancialAccount>> {
        self.get(Cf::FinancialAccounts, &key_uuid(id))
    }

    pub(crate) fn header(&self, id: Uuid) -> Result<Option<TransactionHeader>> {
        self.get(Cf::Headers, &key_uuid(id))
    }

    pub(crate) fn entry(&self, header_id: Uuid, entry_id: Uuid) -> Result<Option<LedgerEntry>> {
        self.get(Cf::Entries, &key_pair(header_id, entry_id))
    }

    /// All entries of a header, in creation order
    pub(crate) fn entries(&self, header_id: Uuid) -> Result<Vec<LedgerEntry>> {
        self.scan_prefix(Cf::Entries, &key_uuid(header_id))?
            .iter()
            .map(|(_, v)| decode(v))
            .collect()
    }

    /// The aggregate the invariant checker consumes. Reads the merged view,
    /// so same-transaction writes are visible.
    pub(crate) fn sum_and_count(&self, header_id: Uuid) -> Result<(Decimal, u64)> {
        let entries = self.entries(header_id)?;
        let sum = entries.iter().map(|e| e.amount).sum();
        Ok((sum, entries.len() as u64))
    }

    /// Ids recorded under a per-company index tag
    pub(crate) fn index_ids(&self, tag: u8, company_id: Uuid) -> Result<Vec<Uuid>> {
        let prefix = index_prefix(tag, company_id);
        let pairs = self.scan_prefix(Cf::Indices, &prefix)?;

        let mut ids = Vec::with_capacity(pairs.len());
        for (key, _) in pairs {
            if key.len() == 33 {
                let bytes: [u8; 16] = key[17..33]
                    .try_into()
                    .map_err(|_| Error::Storage("Malformed index key".to_string()))?;
                ids.push(Uuid::from_bytes(bytes));
            }
        }
        Ok(ids)
    }
}
