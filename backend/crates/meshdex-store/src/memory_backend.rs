//! In-process implementation of the [`IndexStorage`] trait.
//!
//! Every record is a versioned slot. `cas_write` snapshots a slot, runs the
//! edit function without holding the lock, and commits only if the slot's
//! version is still the one it read; otherwise it retries, up to
//! `max_retries` attempts. An edit that hands back the current bytes
//! commits without writing.

use crate::storage_trait::{CasEdit, IndexStorage, ReadReply};
use meshdex_commons::{RecordKey, StorageError, StorageResult, StorageSettings};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
struct Slot {
    version: u64,
    data: Vec<u8>,
}

/// Thread-safe in-memory record store with optimistic CAS.
#[derive(Debug)]
pub struct MemoryBackend {
    slots: RwLock<HashMap<RecordKey, Slot>>,
    max_retries: u32,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_max_retries(StorageSettings::default().cas_max_retries)
    }

    pub fn with_settings(settings: &StorageSettings) -> Self {
        Self::with_max_retries(settings.cas_max_retries)
    }

    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            max_retries: max_retries.max(1),
        }
    }

    /// Current bytes at `key`, if any.
    pub fn get(&self, key: &RecordKey) -> Option<Vec<u8>> {
        self.slots.read().get(key).map(|slot| slot.data.clone())
    }

    /// Overwrite `key` unconditionally (fixtures, repairs).
    pub fn put(&self, key: RecordKey, data: Vec<u8>) {
        let mut slots = self.slots.write();
        let slot = slots.entry(key).or_default();
        slot.version += 1;
        slot.data = data;
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    fn snapshot(&self, key: &RecordKey) -> (u64, Vec<u8>) {
        self.slots
            .read()
            .get(key)
            .map(|slot| (slot.version, slot.data.clone()))
            .unwrap_or_default()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IndexStorage for MemoryBackend {
    async fn read(&self, key: &RecordKey) -> StorageResult<Vec<u8>> {
        self.get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn bulk_read(&self, keys: &[RecordKey]) -> StorageResult<Vec<ReadReply>> {
        let slots = self.slots.read();
        Ok(keys
            .iter()
            .filter_map(|key| {
                slots.get(key).map(|slot| ReadReply {
                    key: *key,
                    data: slot.data.clone(),
                })
            })
            .collect())
    }

    async fn cas_write(&self, key: &RecordKey, edit: CasEdit) -> StorageResult<()> {
        for attempt in 1..=self.max_retries {
            let (version, current) = self.snapshot(key);
            let next = edit(&current)?;

            let committed = {
                let mut slots = self.slots.write();
                let stored_version = slots.get(key).map_or(0, |slot| slot.version);
                if stored_version != version {
                    false
                } else {
                    // Unchanged bytes are not written; an absent record stays absent.
                    if next != current {
                        let slot = slots.entry(*key).or_default();
                        slot.version += 1;
                        slot.data = next;
                    }
                    true
                }
            };
            if committed {
                return Ok(());
            }

            log::trace!("CAS conflict on {} (attempt {})", key, attempt);
            tokio::task::yield_now().await;
        }

        Err(StorageError::CasConflict {
            key: key.to_string(),
            attempts: self.max_retries,
        })
    }
}
