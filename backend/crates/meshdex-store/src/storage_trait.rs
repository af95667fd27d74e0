//! Storage collaborator abstraction consumed by the index protocol.
//!
//! The index engines never talk to a storage engine directly. They go through
//! the narrow [`IndexStorage`] trait, which offers exactly three primitives:
//!
//! - `read` for a single record (missing records are an error)
//! - `bulk_read` for many records at once (missing records are omitted, so
//!   the reply may be shorter than the request)
//! - `cas_write` for optimistic read-edit-write of one record
//!
//! ## Compare-and-swap contract
//!
//! `cas_write(key, edit)` reads the current bytes at `key` (empty when the
//! record does not exist), calls `edit(current)` and stores the returned
//! bytes only if the record did not change since it was read. Retrying after
//! a lost race, and therefore calling `edit` more than once, is the
//! implementation's business; callers must supply an edit function that can
//! be re-run. An `Err` from `edit` aborts the write and is returned as-is.
//!
//! ## Implementing a Custom Backend
//!
//! ```rust,ignore
//! use meshdex_store::storage_trait::{CasEdit, IndexStorage, ReadReply};
//!
//! struct MyBackend { /* connection state */ }
//!
//! #[async_trait::async_trait]
//! impl IndexStorage for MyBackend {
//!     async fn read(&self, key: &RecordKey) -> StorageResult<Vec<u8>> { todo!() }
//!     async fn bulk_read(&self, keys: &[RecordKey]) -> StorageResult<Vec<ReadReply>> { todo!() }
//!     async fn cas_write(&self, key: &RecordKey, edit: CasEdit) -> StorageResult<()> { todo!() }
//! }
//! ```

use meshdex_commons::{RecordKey, StorageResult};
use std::sync::Arc;

/// Edit function applied by [`IndexStorage::cas_write`]: current bytes in,
/// replacement bytes out.
pub type CasEdit = Arc<dyn Fn(&[u8]) -> StorageResult<Vec<u8>> + Send + Sync>;

/// One record returned by [`IndexStorage::bulk_read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadReply {
    pub key: RecordKey,
    pub data: Vec<u8>,
}

/// Read and compare-and-swap primitives of the underlying store.
///
/// Implementations must be thread-safe: completions of concurrent calls are
/// consumed from arbitrary tokio worker threads.
#[async_trait::async_trait]
pub trait IndexStorage: Send + Sync {
    /// Read one record. A missing record is an error
    /// (`StorageError::NotFound` by convention).
    async fn read(&self, key: &RecordKey) -> StorageResult<Vec<u8>>;

    /// Read many records in one request. Records that do not exist are left
    /// out of the reply.
    async fn bulk_read(&self, keys: &[RecordKey]) -> StorageResult<Vec<ReadReply>>;

    /// Apply `edit` to the record at `key` under compare-and-swap.
    async fn cas_write(&self, key: &RecordKey, edit: CasEdit) -> StorageResult<()>;
}

#[async_trait::async_trait]
impl<S: IndexStorage + ?Sized> IndexStorage for Arc<S> {
    async fn read(&self, key: &RecordKey) -> StorageResult<Vec<u8>> {
        (**self).read(key).await
    }

    async fn bulk_read(&self, keys: &[RecordKey]) -> StorageResult<Vec<ReadReply>> {
        (**self).bulk_read(keys).await
    }

    async fn cas_write(&self, key: &RecordKey, edit: CasEdit) -> StorageResult<()> {
        (**self).cas_write(key, edit).await
    }
}
