//! Read back the indexes an object currently claims.

use crate::storage_trait::IndexStorage;
use meshdex_commons::{MembershipEntry, MembershipRecord, RecordKey, Result};

/// Decode the forward record at `forward`.
///
/// This is a plain read: a missing record surfaces the storage error as-is
/// instead of reading as an empty list.
pub async fn check_indexes(storage: &dyn IndexStorage, forward: &RecordKey) -> Result<Vec<MembershipEntry>> {
    let bytes = storage.read(forward).await?;
    Ok(MembershipRecord::decode(&bytes)?.entries)
}
