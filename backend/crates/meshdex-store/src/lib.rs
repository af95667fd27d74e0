//! # meshdex-store
//!
//! Secondary indexes over a content-addressed key/value store, maintained
//! with nothing but compare-and-swap writes.
//!
//! ## Architecture
//!
//! ```text
//! IndexSession (update / find / check)
//!     ↓
//! index engines (diff, batch, rollback)
//!     ↓
//! IndexStorage (read / bulk_read / cas_write)
//!     ↓
//! MemoryBackend | RocksDbBackend
//! ```
//!
//! ## Records
//!
//! - **Forward record**: at `transform(object_id ++ suffix)`, lists the
//!   indexes an object belongs to
//! - **Reverse record**: at the index id, lists the objects in the index

pub mod index;
pub mod key_transform;
pub mod memory_backend;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_impl;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_init;
pub mod session;
pub mod storage_trait;

pub use index::{BatchState, MembershipDelta};
pub use key_transform::{forward_location, reverse_location, KeyTransform, Sha512Transform};
pub use memory_backend::MemoryBackend;
#[cfg(feature = "rocksdb")]
pub use rocksdb_impl::RocksDbBackend;
#[cfg(feature = "rocksdb")]
pub use rocksdb_init::RocksDbInit;
pub use session::IndexSession;
pub use storage_trait::{CasEdit, IndexStorage, ReadReply};

// Re-export the shared types so callers need a single dependency
pub use meshdex_commons::{
    IndexError, MembershipEntry, MembershipRecord, RawId, RecordKey, Result, StorageError,
    StorageResult,
};

// Make test_utils available for testing in dependent crates
pub mod test_utils;
