//! Forward-record update and the reverse-record batch it triggers.

use super::batch::IndexBatch;
use super::diff::MembershipDelta;
use crate::storage_trait::{CasEdit, IndexStorage};
use meshdex_commons::models::canonicalize;
use meshdex_commons::{MembershipEntry, MembershipRecord, RawId, RecordKey, Result, StorageResult};
use parking_lot::Mutex;
use std::sync::Arc;

/// Replace the forward record at `forward` with `desired`, then bring every
/// affected reverse record in line.
///
/// The forward write happens first and is never undone; see
/// [`super::rollback`].
pub async fn update_indexes(
    storage: &Arc<dyn IndexStorage>,
    forward: &RecordKey,
    object: RawId,
    desired: Vec<MembershipEntry>,
) -> Result<()> {
    let desired = canonicalize(desired);
    let observed = Arc::new(Mutex::new(Vec::new()));

    storage
        .cas_write(forward, forward_edit(desired.clone(), Arc::clone(&observed)))
        .await?;

    let observed = canonicalize(std::mem::take(&mut *observed.lock()));
    let delta = MembershipDelta::compute(&desired, &observed);
    if delta.is_empty() {
        log::trace!("Indexes of {} already up to date", object.short());
        return Ok(());
    }

    log::debug!(
        "Updating indexes of {}: {} to insert, {} to remove",
        object.short(),
        delta.to_insert.len(),
        delta.to_remove.len()
    );
    IndexBatch::start(Arc::clone(storage), object, delta)
        .wait()
        .await
}

/// CAS edit writing `desired` as the forward record.
///
/// The entries it replaced are left in `observed`. A retried edit overwrites
/// them, so after a successful write they are the ones the committed attempt
/// saw. Related ids already on the record are kept.
fn forward_edit(desired: Vec<MembershipEntry>, observed: Arc<Mutex<Vec<MembershipEntry>>>) -> CasEdit {
    Arc::new(move |current: &[u8]| -> StorageResult<Vec<u8>> {
        let stored = MembershipRecord::decode_or_empty(current)?;
        let next = MembershipRecord {
            entries: desired.clone(),
            related: stored.related,
        };
        *observed.lock() = stored.entries;
        Ok(next.encode()?)
    })
}
