//! Compensation of a partially applied batch.
//!
//! Only reverse-record mutations are undone. The forward record written
//! before the batch started stays as it is.

use super::batch::{BatchScope, BatchState, IndexBatch, Phase};
use super::mutation::Mutation;
use meshdex_commons::MembershipEntry;
use std::sync::Arc;

/// Inverse mutations for everything the failed phase applied: landed inserts
/// are removed again, landed removals are re-inserted.
pub fn compensations(inserted: &[MembershipEntry], removed: &[MembershipEntry]) -> Vec<Mutation> {
    inserted
        .iter()
        .cloned()
        .map(|index| Mutation::insert(index).inverse())
        .chain(
            removed
                .iter()
                .cloned()
                .map(|index| Mutation::remove(index).inverse()),
        )
        .collect()
}

impl IndexBatch {
    /// Enter `RollingBack` and submit the compensation phase.
    ///
    /// Called with the scope lock held by the completion that resolved the
    /// forward phase. Compensation completions block on that lock until this
    /// returns, and `expected` is set before any of them is spawned.
    pub(super) fn begin_rollback(self: &Arc<Self>, scope: &mut BatchScope) {
        let undo = compensations(&scope.inserted, &scope.removed);

        scope.state = BatchState::RollingBack;
        scope.expected = undo.len();
        scope.finished = 0;
        scope.failed = 0;

        for mutation in undo {
            self.submit(Phase::Compensation, mutation);
        }
    }
}
