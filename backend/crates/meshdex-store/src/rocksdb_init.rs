//! RocksDB initialization utilities for meshdex.
//!
//! Opens the optimistic-transaction database the RocksDB backend runs its
//! compare-and-swap writes on.

use anyhow::{Context, Result};
use meshdex_commons::StorageSettings;
use rocksdb::{BlockBasedOptions, Cache, OptimisticTransactionDB, Options};
use std::path::Path;
use std::sync::Arc;

/// RocksDB initializer for creating/opening the record database.
pub struct RocksDbInit {
    db_path: String,
    settings: StorageSettings,
}

impl RocksDbInit {
    /// Create a new initializer for the given path with custom settings.
    pub fn new(db_path: impl Into<String>, settings: StorageSettings) -> Self {
        Self {
            db_path: db_path.into(),
            settings,
        }
    }

    /// Create an initializer for `settings.data_path`.
    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self::new(settings.data_path.clone(), settings.clone())
    }

    /// Create a new initializer with default settings.
    pub fn with_defaults(db_path: impl Into<String>) -> Self {
        Self::new(db_path, StorageSettings::default())
    }

    /// Open or create the database.
    pub fn open(&self) -> Result<Arc<OptimisticTransactionDB>> {
        let path = Path::new(&self.db_path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.set_max_open_files(self.settings.max_open_files);

        // Records are only ever read by exact key.
        let cache = Cache::new_lru_cache(self.settings.block_cache_size);
        db_opts.set_block_based_table_factory(&create_block_options_with_cache(&cache));
        db_opts.optimize_for_point_lookup(block_cache_size_mb(self.settings.block_cache_size));

        let db: OptimisticTransactionDB = OptimisticTransactionDB::open(&db_opts, path)
            .with_context(|| format!("Failed to open RocksDB at {}", self.db_path))?;
        log::info!("Opened record database at {}", self.db_path);

        Ok(Arc::new(db))
    }
}

fn block_cache_size_mb(bytes: usize) -> u64 {
    std::cmp::max(1, (bytes / (1024 * 1024)) as u64)
}

pub(crate) fn create_block_options_with_cache(cache: &Cache) -> BlockBasedOptions {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);
    block_opts.set_bloom_filter(10.0, false);
    block_opts.set_cache_index_and_filter_blocks(true);
    block_opts.set_whole_key_filtering(true);
    block_opts
}
