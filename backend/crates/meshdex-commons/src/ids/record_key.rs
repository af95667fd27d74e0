//! Location of a record in the store.

use crate::ids::raw_id::{RawId, RAW_ID_LEN};
use crate::storage_key::StorageKey;
use std::fmt;

/// Where a record lives: its identifier plus the store's routing fields.
///
/// Index maintenance always addresses records with both routing fields set
/// to zero, letting the store place the record by id alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    id: RawId,
    group_id: u32,
    column: u32,
}

impl RecordKey {
    /// Key for `id` with zeroed routing fields.
    pub const fn new(id: RawId) -> Self {
        Self {
            id,
            group_id: 0,
            column: 0,
        }
    }

    pub const fn with_routing(id: RawId, group_id: u32, column: u32) -> Self {
        Self {
            id,
            group_id,
            column,
        }
    }

    pub fn id(&self) -> &RawId {
        &self.id
    }

    pub fn group_id(&self) -> u32 {
        self.group_id
    }

    pub fn column(&self) -> u32 {
        self.column
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.column, self.id.short())
    }
}

impl StorageKey for RecordKey {
    /// `group_id (BE) | column (BE) | id`, so records of one group sort together.
    fn storage_key(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(8 + RAW_ID_LEN);
        key.extend_from_slice(&self.group_id.to_be_bytes());
        key.extend_from_slice(&self.column.to_be_bytes());
        key.extend_from_slice(self.id.as_bytes());
        key
    }

    fn from_storage_key(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() != 8 + RAW_ID_LEN {
            return Err(format!(
                "record key must be {} bytes, got {}",
                8 + RAW_ID_LEN,
                bytes.len()
            ));
        }
        let group_id = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let column = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let id = RawId::from_slice(&bytes[8..]).map_err(|e| e.to_string())?;
        Ok(Self::with_routing(id, group_id, column))
    }
}
