//! Test utilities for meshdex-store.
//!
//! Provides a fault-injecting storage wrapper and short builders for ids and
//! entries, so protocol tests can script exactly which mutations fail.

use crate::memory_backend::MemoryBackend;
use crate::storage_trait::{CasEdit, IndexStorage, ReadReply};
use meshdex_commons::{MembershipEntry, RawId, RecordKey, StorageError, StorageResult, RAW_ID_LEN};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Identifier filled with `tag`.
pub fn raw_id(tag: u8) -> RawId {
    RawId::new([tag; RAW_ID_LEN])
}

/// Entry for `raw_id(tag)` carrying `payload`.
pub fn entry(tag: u8, payload: &str) -> MembershipEntry {
    MembershipEntry::new(raw_id(tag), payload.as_bytes().to_vec())
}

#[derive(Debug, Clone, Copy, Default)]
struct CasFault {
    /// Writes still let through before failures start.
    pass: usize,
    /// Writes still to fail.
    fail: usize,
}

/// [`MemoryBackend`] wrapper that fails, delays or truncates operations on
/// request and counts calls.
///
/// An injected CAS failure is reported without the edit ever running, as if
/// the store had been unreachable.
///
/// # Example
///
/// ```no_run
/// use meshdex_store::test_utils::{raw_id, FaultyStorage};
/// use meshdex_store::{reverse_location, MemoryBackend};
/// use std::sync::Arc;
///
/// let storage = FaultyStorage::new(Arc::new(MemoryBackend::new()));
/// storage.fail_cas(reverse_location(&raw_id(1)), 1);
/// ```
pub struct FaultyStorage {
    inner: Arc<MemoryBackend>,
    cas_faults: Mutex<HashMap<RecordKey, CasFault>>,
    cas_delays: Mutex<HashMap<RecordKey, Duration>>,
    bulk_read_limit: Mutex<Option<usize>>,
    read_calls: AtomicUsize,
    bulk_read_calls: AtomicUsize,
    cas_calls: AtomicUsize,
}

impl FaultyStorage {
    pub fn new(inner: Arc<MemoryBackend>) -> Self {
        Self {
            inner,
            cas_faults: Mutex::new(HashMap::new()),
            cas_delays: Mutex::new(HashMap::new()),
            bulk_read_limit: Mutex::new(None),
            read_calls: AtomicUsize::new(0),
            bulk_read_calls: AtomicUsize::new(0),
            cas_calls: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &Arc<MemoryBackend> {
        &self.inner
    }

    /// Fail the next `times` CAS writes to `key`.
    pub fn fail_cas(&self, key: RecordKey, times: usize) {
        self.fail_cas_after(key, 0, times);
    }

    /// Let `pass` CAS writes to `key` through, then fail the next `fail`.
    pub fn fail_cas_after(&self, key: RecordKey, pass: usize, fail: usize) {
        self.cas_faults.lock().insert(key, CasFault { pass, fail });
    }

    /// Hold every CAS write to `key` for `delay` before running it.
    pub fn delay_cas(&self, key: RecordKey, delay: Duration) {
        self.cas_delays.lock().insert(key, delay);
    }

    /// Return at most `limit` records from every bulk read.
    pub fn truncate_bulk_reads(&self, limit: usize) {
        *self.bulk_read_limit.lock() = Some(limit);
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn bulk_read_calls(&self) -> usize {
        self.bulk_read_calls.load(Ordering::SeqCst)
    }

    pub fn cas_calls(&self) -> usize {
        self.cas_calls.load(Ordering::SeqCst)
    }

    /// Consume one step of the fault script for `key`; `true` means fail.
    fn should_fail(&self, key: &RecordKey) -> bool {
        let mut faults = self.cas_faults.lock();
        match faults.get_mut(key) {
            Some(fault) if fault.pass > 0 => {
                fault.pass -= 1;
                false
            }
            Some(fault) if fault.fail > 0 => {
                fault.fail -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait::async_trait]
impl IndexStorage for FaultyStorage {
    async fn read(&self, key: &RecordKey) -> StorageResult<Vec<u8>> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.read(key).await
    }

    async fn bulk_read(&self, keys: &[RecordKey]) -> StorageResult<Vec<ReadReply>> {
        self.bulk_read_calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = self.inner.bulk_read(keys).await?;
        if let Some(limit) = *self.bulk_read_limit.lock() {
            replies.truncate(limit);
        }
        Ok(replies)
    }

    async fn cas_write(&self, key: &RecordKey, edit: CasEdit) -> StorageResult<()> {
        self.cas_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.cas_delays.lock().get(key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail(key) {
            return Err(StorageError::IoError(format!("injected failure on {}", key)));
        }
        self.inner.cas_write(key, edit).await
    }
}
