//! Objects that belong to every one of a set of indexes.

use super::diff::intersect_sorted;
use crate::key_transform::reverse_location;
use crate::storage_trait::IndexStorage;
use meshdex_commons::{IndexError, MembershipEntry, MembershipRecord, RawId, RecordKey, Result};

/// Intersect the reverse records of `indexes`.
///
/// An empty request returns an empty result without any I/O. A bulk read
/// that returns fewer records than requested (for instance because one of
/// the indexes has no reverse record yet) fails as a whole.
///
/// Reverse records are only ever written in canonical order, so replies are
/// intersected as decoded.
pub async fn find_indexes(storage: &dyn IndexStorage, indexes: &[RawId]) -> Result<Vec<MembershipEntry>> {
    if indexes.is_empty() {
        return Ok(Vec::new());
    }

    let keys: Vec<RecordKey> = indexes.iter().map(reverse_location).collect();
    let replies = storage.bulk_read(&keys).await?;
    if replies.len() < keys.len() {
        return Err(IndexError::IncompleteResponse {
            requested: keys.len(),
            received: replies.len(),
        });
    }

    let mut replies = replies.into_iter();
    let mut common = match replies.next() {
        Some(first) => MembershipRecord::decode(&first.data)?.entries,
        None => return Ok(Vec::new()),
    };
    for reply in replies {
        if common.is_empty() {
            break;
        }
        let entries = MembershipRecord::decode(&reply.data)?.entries;
        common = intersect_sorted(&common, &entries);
    }

    log::trace!(
        "Found {} objects common to {} indexes",
        common.len(),
        indexes.len()
    );
    Ok(common)
}
