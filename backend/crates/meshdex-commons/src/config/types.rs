use super::defaults::*;
use serde::{Deserialize, Serialize};

/// Top-level meshdex configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshdexConfig {
    #[serde(default)]
    pub index: IndexSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Index maintenance settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Domain-separation suffix appended to an object id before hashing it
    /// into the object's forward-record location.
    ///
    /// Every client of one store must agree on this value.
    #[serde(default = "default_forward_key_suffix")]
    pub forward_key_suffix: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            forward_key_suffix: default_forward_key_suffix(),
        }
    }
}

/// Storage backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory for the RocksDB backend
    #[serde(default = "default_data_path")]
    pub data_path: String,

    /// How many times a backend re-runs an edit after losing a CAS race
    #[serde(default = "default_cas_max_retries")]
    pub cas_max_retries: u32,

    /// RocksDB block cache size in bytes
    #[serde(default = "default_block_cache_size")]
    pub block_cache_size: usize,

    /// RocksDB open file limit (-1 = unlimited)
    #[serde(default = "default_max_open_files")]
    pub max_open_files: i32,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            cas_max_retries: default_cas_max_retries(),
            block_cache_size: default_block_cache_size(),
            max_open_files: default_max_open_files(),
        }
    }
}
