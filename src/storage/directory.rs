// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet-to-customer directory backed by redb.
//!
//! Maps a normalized wallet address to the payment processor's customer id.
//! The processor adapter reads this association on every resolve; writes
//! happen only through the admin API. How an association comes to exist
//! (checkout flow, support tooling) is outside this service.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::models::WalletAddress;

/// Map: lowercase wallet address → processor customer id.
const WALLET_CUSTOMERS: TableDefinition<&str, &str> = TableDefinition::new("wallet_customers");

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Embedded wallet-to-customer association store.
pub struct CustomerDirectory {
    db: Database,
}

impl CustomerDirectory {
    /// Open (or create) the directory database at the given path.
    pub fn open(path: &Path) -> DirectoryResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(WALLET_CUSTOMERS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Look up the customer id linked to a wallet.
    pub fn get(&self, wallet: &WalletAddress) -> DirectoryResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLET_CUSTOMERS)?;
        Ok(table
            .get(wallet.as_str())?
            .map(|value| value.value().to_string()))
    }

    /// Associate a wallet with a customer id, replacing any existing link.
    pub fn link(&self, wallet: &WalletAddress, customer_id: &str) -> DirectoryResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(WALLET_CUSTOMERS)?;
            table.insert(wallet.as_str(), customer_id)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Remove a wallet's association. Returns whether a link existed.
    pub fn unlink(&self, wallet: &WalletAddress) -> DirectoryResult<bool> {
        let write_txn = self.db.begin_write()?;
        let existed;
        {
            let mut table = write_txn.open_table(WALLET_CUSTOMERS)?;
            existed = table.remove(wallet.as_str())?.is_some();
        }
        write_txn.commit()?;
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet() -> WalletAddress {
        WalletAddress::parse("0x742d35cc6634c0532925a3b844bc9e7595f4ab12").unwrap()
    }

    fn open_temp() -> (tempfile::TempDir, CustomerDirectory) {
        let dir = tempfile::tempdir().unwrap();
        let directory = CustomerDirectory::open(&dir.path().join("directory.redb")).unwrap();
        (dir, directory)
    }

    #[test]
    fn get_on_fresh_database_is_none() {
        let (_tmp, directory) = open_temp();
        assert_eq!(directory.get(&wallet()).unwrap(), None);
    }

    #[test]
    fn link_then_get_round_trips() {
        let (_tmp, directory) = open_temp();
        directory.link(&wallet(), "cus_123").unwrap();
        assert_eq!(directory.get(&wallet()).unwrap(), Some("cus_123".to_string()));
    }

    #[test]
    fn link_replaces_existing_association() {
        let (_tmp, directory) = open_temp();
        directory.link(&wallet(), "cus_123").unwrap();
        directory.link(&wallet(), "cus_456").unwrap();
        assert_eq!(directory.get(&wallet()).unwrap(), Some("cus_456".to_string()));
    }

    #[test]
    fn unlink_reports_whether_link_existed() {
        let (_tmp, directory) = open_temp();
        assert!(!directory.unlink(&wallet()).unwrap());

        directory.link(&wallet(), "cus_123").unwrap();
        assert!(directory.unlink(&wallet()).unwrap());
        assert_eq!(directory.get(&wallet()).unwrap(), None);
    }
}
