//! RocksDB implementation of the [`IndexStorage`] trait.
//!
//! Records live in the default column family under their
//! [`StorageKey`] encoding. `cas_write` runs inside an optimistic
//! transaction: `get_for_update` registers the key, the commit fails with
//! `Busy` or `TryAgain` if another writer touched it since, and the edit is
//! re-run on a fresh transaction. An edit that returns the current bytes
//! writes nothing, so an absent record stays absent.
//!
//! RocksDB calls block, so every operation runs on tokio's blocking pool.

use crate::rocksdb_init::RocksDbInit;
use crate::storage_trait::{CasEdit, IndexStorage, ReadReply};
use meshdex_commons::{RecordKey, StorageError, StorageKey, StorageResult, StorageSettings};
use rocksdb::{ErrorKind, OptimisticTransactionDB};
use std::sync::Arc;

/// RocksDB-backed record store.
///
/// ## Example
///
/// ```rust,ignore
/// use meshdex_store::{IndexSession, RocksDbBackend};
/// use std::sync::Arc;
///
/// let backend = RocksDbBackend::open(&config.storage)?;
/// let session = IndexSession::with_settings(Arc::new(backend), &config.index);
/// ```
pub struct RocksDbBackend {
    db: Arc<OptimisticTransactionDB>,
    max_retries: u32,
}

impl RocksDbBackend {
    /// Creates a new RocksDB backend with the given database handle.
    pub fn new(db: Arc<OptimisticTransactionDB>, max_retries: u32) -> Self {
        Self {
            db,
            max_retries: max_retries.max(1),
        }
    }

    /// Open the database at `settings.data_path`.
    pub fn open(settings: &StorageSettings) -> anyhow::Result<Self> {
        let db = RocksDbInit::from_settings(settings).open()?;
        Ok(Self::new(db, settings.cas_max_retries))
    }

    /// Returns a reference to the underlying database.
    pub fn db(&self) -> &Arc<OptimisticTransactionDB> {
        &self.db
    }

    async fn run_blocking<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&OptimisticTransactionDB) -> StorageResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| StorageError::Other(format!("blocking task failed: {}", e)))?
    }
}

fn io_error(err: rocksdb::Error) -> StorageError {
    StorageError::IoError(err.to_string())
}

fn is_conflict(err: &rocksdb::Error) -> bool {
    matches!(err.kind(), ErrorKind::Busy | ErrorKind::TryAgain)
}

fn cas_blocking(
    db: &OptimisticTransactionDB,
    key: &RecordKey,
    edit: &CasEdit,
    max_retries: u32,
) -> StorageResult<()> {
    let raw = key.storage_key();

    for attempt in 1..=max_retries {
        let txn = db.transaction();
        let current = txn
            .get_for_update(&raw, true)
            .map_err(io_error)?
            .unwrap_or_default();
        let next = edit(&current)?;

        // Unchanged bytes are not written. The commit still validates the
        // key registered by `get_for_update`.
        if next != current {
            txn.put(&raw, next).map_err(io_error)?;
        }
        match txn.commit() {
            Ok(()) => return Ok(()),
            Err(e) if is_conflict(&e) => {
                log::trace!("CAS conflict on {} (attempt {}): {}", key, attempt, e);
            }
            Err(e) => return Err(io_error(e)),
        }
    }

    Err(StorageError::CasConflict {
        key: key.to_string(),
        attempts: max_retries,
    })
}

#[async_trait::async_trait]
impl IndexStorage for RocksDbBackend {
    async fn read(&self, key: &RecordKey) -> StorageResult<Vec<u8>> {
        let key = *key;
        self.run_blocking(move |db| {
            let txn = db.transaction();
            let value = txn.get(key.storage_key()).map_err(io_error)?;
            value.ok_or_else(|| StorageError::NotFound(key.to_string()))
        })
        .await
    }

    async fn bulk_read(&self, keys: &[RecordKey]) -> StorageResult<Vec<ReadReply>> {
        let keys = keys.to_vec();
        self.run_blocking(move |db| {
            let txn = db.transaction();
            let mut replies = Vec::with_capacity(keys.len());
            for key in keys {
                if let Some(data) = txn.get(key.storage_key()).map_err(io_error)? {
                    replies.push(ReadReply { key, data });
                }
            }
            Ok(replies)
        })
        .await
    }

    async fn cas_write(&self, key: &RecordKey, edit: CasEdit) -> StorageResult<()> {
        let key = *key;
        let max_retries = self.max_retries;
        self.run_blocking(move |db| cas_blocking(db, &key, &edit, max_retries))
            .await
    }
}
