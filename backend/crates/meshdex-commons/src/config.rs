//! Configuration for meshdex index sessions and storage backends.
//!
//! Loaded from a TOML file whose sections are all optional:
//!
//! ```toml
//! [index]
//! forward_key_suffix = "index"
//!
//! [storage]
//! data_path = "./data"
//! cas_max_retries = 16
//! block_cache_size = 8388608
//! max_open_files = 512
//! ```

pub mod defaults;
pub mod loader;
pub mod types;

pub use types::{IndexSettings, MeshdexConfig, StorageSettings};
