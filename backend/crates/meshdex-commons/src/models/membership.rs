//! Membership entries and their canonical order.

use crate::ids::RawId;
use std::cmp::Ordering;

/// One `(identifier, payload)` pair of an object ↔ index relation.
///
/// In a forward record `id` is an index id; in a reverse record it is an
/// object id. `payload` is caller-supplied metadata for the relation and is
/// stored identically on both sides.
///
/// ## Ordering
///
/// Entries sort by `id` **descending**, then by payload length ascending,
/// then by payload bytes ascending. Every sorted list of entries in the store
/// (forward and reverse records alike) uses this order, and diff,
/// intersection and binary search all rely on it. It differs from the
/// ascending order of [`RawId`] itself; records written by other clients
/// are laid out this way, so it must not change.
///
/// Two entries compare `Equal` exactly when both id and payload are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MembershipEntry {
    pub id: RawId,
    pub payload: Vec<u8>,
}

impl MembershipEntry {
    pub fn new(id: RawId, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    /// Entry with an empty payload.
    pub fn bare(id: RawId) -> Self {
        Self {
            id,
            payload: Vec::new(),
        }
    }
}

impl Ord for MembershipEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .id
            .as_bytes()
            .cmp(self.id.as_bytes())
            .then_with(|| self.payload.len().cmp(&other.payload.len()))
            .then_with(|| self.payload.cmp(&other.payload))
    }
}

impl PartialOrd for MembershipEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort into canonical order and drop duplicates.
pub fn canonicalize(mut entries: Vec<MembershipEntry>) -> Vec<MembershipEntry> {
    entries.sort();
    entries.dedup();
    entries
}

/// Insert `entry` into a canonically sorted list.
///
/// Returns `false` (list untouched) when an equal entry is already present.
pub fn insert_sorted(entries: &mut Vec<MembershipEntry>, entry: MembershipEntry) -> bool {
    match entries.binary_search(&entry) {
        Ok(_) => false,
        Err(pos) => {
            entries.insert(pos, entry);
            true
        }
    }
}

/// Remove `entry` from a canonically sorted list.
///
/// Returns `false` (list untouched) when no equal entry is present.
pub fn remove_sorted(entries: &mut Vec<MembershipEntry>, entry: &MembershipEntry) -> bool {
    match entries.binary_search(entry) {
        Ok(pos) => {
            entries.remove(pos);
            true
        }
        Err(_) => false,
    }
}
