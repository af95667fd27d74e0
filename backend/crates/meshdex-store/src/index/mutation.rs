//! Single reverse-record mutations and their CAS edit functions.

use crate::key_transform::reverse_location;
use crate::storage_trait::CasEdit;
use meshdex_commons::{MembershipEntry, MembershipRecord, RawId, RecordKey, StorageResult};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Insert,
    Remove,
}

impl MutationKind {
    pub fn inverse(self) -> Self {
        match self {
            MutationKind::Insert => MutationKind::Remove,
            MutationKind::Remove => MutationKind::Insert,
        }
    }
}

/// Add or drop one object in one index's reverse record.
///
/// `index` is the forward-side entry: its id names the reverse record, its
/// payload travels with the object id into that record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub kind: MutationKind,
    pub index: MembershipEntry,
}

impl Mutation {
    pub fn insert(index: MembershipEntry) -> Self {
        Self {
            kind: MutationKind::Insert,
            index,
        }
    }

    pub fn remove(index: MembershipEntry) -> Self {
        Self {
            kind: MutationKind::Remove,
            index,
        }
    }

    /// The compensating mutation.
    pub fn inverse(&self) -> Self {
        Self {
            kind: self.kind.inverse(),
            index: self.index.clone(),
        }
    }

    pub fn key(&self) -> RecordKey {
        reverse_location(&self.index.id)
    }

    /// Entry this mutation adds to or drops from the reverse record.
    pub fn reverse_entry(&self, object: RawId) -> MembershipEntry {
        MembershipEntry::new(object, self.index.payload.clone())
    }

    /// CAS edit applying this mutation for `object`.
    ///
    /// Inserting a present entry or removing an absent one hands the current
    /// bytes back unchanged.
    pub fn edit(&self, object: RawId) -> CasEdit {
        let kind = self.kind;
        let entry = self.reverse_entry(object);

        Arc::new(move |current: &[u8]| -> StorageResult<Vec<u8>> {
            let mut record = MembershipRecord::decode_or_empty(current)?;
            let changed = match kind {
                MutationKind::Insert => record.insert(entry.clone()),
                MutationKind::Remove => record.remove(&entry),
            };
            if !changed {
                return Ok(current.to_vec());
            }
            Ok(record.encode()?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshdex_commons::{IndexError, StorageError, RAW_ID_LEN};

    fn id(tag: u8) -> RawId {
        RawId::new([tag; RAW_ID_LEN])
    }

    fn index(tag: u8, payload: &str) -> MembershipEntry {
        MembershipEntry::new(id(tag), payload.as_bytes().to_vec())
    }

    #[test]
    fn test_insert_into_absent_record() {
        let mutation = Mutation::insert(index(10, "meta"));
        let bytes = (mutation.edit(id(1)))(&[]).unwrap();

        let record = MembershipRecord::decode(&bytes).unwrap();
        assert_eq!(record.entries, vec![MembershipEntry::new(id(1), b"meta".to_vec())]);
        assert_eq!(mutation.key(), RecordKey::new(id(10)));
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mutation = Mutation::insert(index(10, "meta"));
        let once = (mutation.edit(id(1)))(&[]).unwrap();
        let twice = (mutation.edit(id(1)))(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let existing = MembershipRecord::new(vec![MembershipEntry::new(id(2), b"x".to_vec())])
            .encode()
            .unwrap();

        let mutation = Mutation::remove(index(10, "meta"));
        let bytes = (mutation.edit(id(1)))(&existing).unwrap();
        assert_eq!(bytes, existing);

        // An absent record stays absent-equivalent.
        assert!((mutation.edit(id(1)))(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_remove_matches_full_entry() {
        let mut record = MembershipRecord::default();
        record.insert(MembershipEntry::new(id(1), b"meta".to_vec()));
        record.insert(MembershipEntry::new(id(1), b"other".to_vec()));
        record.related.push(id(99));
        let existing = record.encode().unwrap();

        let bytes = (Mutation::remove(index(10, "meta")).edit(id(1)))(&existing).unwrap();
        let after = MembershipRecord::decode(&bytes).unwrap();
        assert_eq!(after.entries, vec![MembershipEntry::new(id(1), b"other".to_vec())]);
        assert_eq!(after.related, vec![id(99)]);
    }

    #[test]
    fn test_malformed_record_fails_edit_with_decode_error() {
        let err = (Mutation::insert(index(10, "")).edit(id(1)))(&[0x01]).unwrap_err();
        match err {
            StorageError::Edit(inner) => assert!(matches!(*inner, IndexError::Decode(_))),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_inverse() {
        let mutation = Mutation::insert(index(3, "p"));
        assert_eq!(mutation.inverse(), Mutation::remove(index(3, "p")));
        assert_eq!(mutation.inverse().inverse(), mutation);
    }
}
