//! # meshdex-commons
//!
//! Shared types for meshdex secondary indexes.
//!
//! ## Contents
//!
//! - [`ids`]: 64-byte identifiers (`RawId`) and record locations (`RecordKey`)
//! - [`models`]: `MembershipEntry` and its canonical order
//! - [`serialization`]: the versioned `MembershipRecord` wire format
//! - [`errors`]: `StorageError` (collaborator failures) and `IndexError`
//!   (protocol failures)
//! - [`config`]: TOML configuration for sessions and backends
//!
//! ## Example Usage
//!
//! ```rust
//! use meshdex_commons::{MembershipEntry, MembershipRecord, RawId};
//!
//! let mut record = MembershipRecord::default();
//! record.insert(MembershipEntry::new(RawId::new([1u8; 64]), b"meta".to_vec()));
//!
//! let bytes = record.encode().unwrap();
//! assert_eq!(MembershipRecord::decode(&bytes).unwrap(), record);
//! ```

pub mod config;
pub mod errors;
pub mod ids;
pub mod models;
pub mod serialization;
pub mod storage_key;

// Re-export commonly used types at crate root
pub use config::{IndexSettings, MeshdexConfig, StorageSettings};
pub use errors::{IndexError, Result, StorageError, StorageResult};
pub use ids::{RawId, RecordKey, RAW_ID_LEN};
pub use models::MembershipEntry;
pub use serialization::{MembershipRecord, MEMBERSHIP_RECORD_VERSION};
pub use storage_key::StorageKey;
