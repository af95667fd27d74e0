//! Reverse-record maintenance batch.
//!
//! One [`IndexBatch`] drives all reverse-record mutations caused by a single
//! forward-record update. Every mutation runs as its own tokio task and
//! reports back through [`IndexBatch::on_complete`]; the shared
//! [`BatchScope`] is only touched under the batch's single mutex.
//!
//! ## State machine
//!
//! ```text
//! Fanning ──► AwaitingPhaseCompletion ──► Done
//!                      │
//!                      └──► RollingBack ──► Done
//! ```
//!
//! A phase is resolved by the completion that brings `finished` up to
//! `expected`, inside the same critical section that observed it. No other
//! transition exists, so the outcome is reported exactly once no matter how
//! completions race.

use super::diff::MembershipDelta;
use super::mutation::{Mutation, MutationKind};
use crate::storage_trait::IndexStorage;
use meshdex_commons::{IndexError, MembershipEntry, RawId, Result, StorageError, StorageResult};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Lifecycle of a maintenance batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// Forward-phase mutations are being submitted.
    Fanning,
    /// Every forward-phase mutation is submitted, some are still in flight.
    AwaitingPhaseCompletion,
    /// The forward phase partially failed; compensations are in flight.
    RollingBack,
    /// The outcome has been reported.
    Done,
}

/// Which fan-out a completion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Phase {
    Forward,
    Compensation,
}

pub(super) struct BatchScope {
    pub(super) state: BatchState,
    pub(super) expected: usize,
    pub(super) finished: usize,
    /// Forward-phase entries whose insert landed.
    pub(super) inserted: Vec<MembershipEntry>,
    /// Forward-phase entries whose removal landed.
    pub(super) removed: Vec<MembershipEntry>,
    /// First forward-phase failure; later ones only bump `failed`.
    pub(super) first_failure: Option<StorageError>,
    pub(super) failed: usize,
    reply: Option<oneshot::Sender<Result<()>>>,
}

impl BatchScope {
    fn new(reply: oneshot::Sender<Result<()>>) -> Self {
        Self {
            state: BatchState::Fanning,
            expected: 0,
            finished: 0,
            inserted: Vec::new(),
            removed: Vec::new(),
            first_failure: None,
            failed: 0,
            reply: Some(reply),
        }
    }

    /// Report the terminal outcome. Only the first call has any effect.
    pub(super) fn finish(&mut self, outcome: Result<()>) {
        self.state = BatchState::Done;
        if let Some(reply) = self.reply.take() {
            // The caller may have stopped waiting; nothing left to do then.
            let _ = reply.send(outcome);
        }
    }

    /// The error a failed batch reports: the first forward-phase failure.
    pub(super) fn take_failure(&mut self) -> IndexError {
        match self.first_failure.take() {
            Some(err) => IndexError::from(err),
            None => IndexError::Abandoned,
        }
    }
}

/// Shared, reference-counted state of one maintenance batch.
pub struct IndexBatch {
    pub(super) storage: Arc<dyn IndexStorage>,
    pub(super) object: RawId,
    pub(super) scope: Mutex<BatchScope>,
}

/// Caller side of a running batch.
pub struct BatchHandle {
    batch: Arc<IndexBatch>,
    outcome: oneshot::Receiver<Result<()>>,
}

impl BatchHandle {
    pub fn state(&self) -> BatchState {
        self.batch.state()
    }

    /// Wait for the terminal outcome.
    ///
    /// A batch whose tasks all went away without reporting (a panicking
    /// storage backend, a runtime shutting down) yields
    /// [`IndexError::Abandoned`].
    pub async fn wait(self) -> Result<()> {
        match self.outcome.await {
            Ok(outcome) => outcome,
            Err(_) => Err(IndexError::Abandoned),
        }
    }
}

impl IndexBatch {
    /// Submit every mutation of `delta` for `object` and return a handle to
    /// the outcome.
    ///
    /// Must be called from within a tokio runtime. An empty delta is reported
    /// as success without touching storage.
    pub fn start(
        storage: Arc<dyn IndexStorage>,
        object: RawId,
        delta: MembershipDelta,
    ) -> BatchHandle {
        let (reply, outcome) = oneshot::channel();
        let batch = Arc::new(IndexBatch {
            storage,
            object,
            scope: Mutex::new(BatchScope::new(reply)),
        });

        let mutations: Vec<Mutation> = delta
            .to_insert
            .into_iter()
            .map(Mutation::insert)
            .chain(delta.to_remove.into_iter().map(Mutation::remove))
            .collect();

        if mutations.is_empty() {
            batch.scope.lock().finish(Ok(()));
        } else {
            batch.fan_out(mutations);
        }

        BatchHandle { batch, outcome }
    }

    pub fn object(&self) -> &RawId {
        &self.object
    }

    pub fn state(&self) -> BatchState {
        self.scope.lock().state
    }

    /// Submit the forward phase.
    ///
    /// `expected` is fixed before the first task is spawned, so the phase
    /// cannot resolve until every mutation has been submitted and completed.
    fn fan_out(self: &Arc<Self>, mutations: Vec<Mutation>) {
        log::debug!(
            "Index batch for {}: submitting {} reverse-record mutations",
            self.object.short(),
            mutations.len()
        );

        {
            let mut scope = self.scope.lock();
            scope.state = BatchState::Fanning;
            scope.expected = mutations.len();
            scope.finished = 0;
        }

        for mutation in mutations {
            self.submit(Phase::Forward, mutation);
        }

        let mut scope = self.scope.lock();
        if scope.state == BatchState::Fanning {
            scope.state = BatchState::AwaitingPhaseCompletion;
        }
    }

    /// Run one mutation as a detached task that reports back to this batch.
    pub(super) fn submit(self: &Arc<Self>, phase: Phase, mutation: Mutation) {
        let batch = Arc::clone(self);
        tokio::spawn(async move {
            let key = mutation.key();
            let outcome = batch
                .storage
                .cas_write(&key, mutation.edit(batch.object))
                .await;
            batch.on_complete(phase, mutation, outcome);
        });
    }

    /// Completion callback shared by every mutation of every phase.
    pub(super) fn on_complete(
        self: &Arc<Self>,
        phase: Phase,
        mutation: Mutation,
        outcome: StorageResult<()>,
    ) {
        let mut scope = self.scope.lock();
        scope.finished += 1;

        match (phase, outcome) {
            (Phase::Forward, Ok(())) => {
                log::trace!(
                    "{:?} of {} in index {} applied",
                    mutation.kind,
                    self.object.short(),
                    mutation.index.id.short()
                );
                match mutation.kind {
                    MutationKind::Insert => scope.inserted.push(mutation.index),
                    MutationKind::Remove => scope.removed.push(mutation.index),
                }
            }
            (Phase::Forward, Err(err)) => {
                log::trace!(
                    "{:?} of {} in index {} failed: {}",
                    mutation.kind,
                    self.object.short(),
                    mutation.index.id.short(),
                    err
                );
                scope.failed += 1;
                if scope.first_failure.is_none() {
                    scope.first_failure = Some(err);
                }
            }
            (Phase::Compensation, Ok(())) => {
                log::trace!(
                    "Compensating {:?} of {} in index {} applied",
                    mutation.kind,
                    self.object.short(),
                    mutation.index.id.short()
                );
            }
            (Phase::Compensation, Err(err)) => {
                scope.failed += 1;
                log::error!(
                    "Compensating {:?} of {} in index {} failed, reverse record left inconsistent: {}",
                    mutation.kind,
                    self.object.short(),
                    mutation.index.id.short(),
                    err
                );
            }
        }

        if scope.finished == scope.expected {
            self.resolve_phase(&mut scope, phase);
        }
    }

    /// Decide a phase's outcome. Runs once per phase, under the scope lock.
    fn resolve_phase(self: &Arc<Self>, scope: &mut BatchScope, phase: Phase) {
        match phase {
            Phase::Forward => {
                let succeeded = scope.inserted.len() + scope.removed.len();
                if scope.first_failure.is_none() {
                    scope.finish(Ok(()));
                } else if succeeded == 0 {
                    log::debug!(
                        "Index batch for {}: all {} mutations failed, nothing to undo",
                        self.object.short(),
                        scope.failed
                    );
                    let err = scope.take_failure();
                    scope.finish(Err(err));
                } else {
                    log::warn!(
                        "Index batch for {}: {} of {} mutations failed, rolling back {}",
                        self.object.short(),
                        scope.failed,
                        scope.expected,
                        succeeded
                    );
                    self.begin_rollback(scope);
                }
            }
            Phase::Compensation => {
                if scope.failed > 0 {
                    log::error!(
                        "Index batch for {}: {} of {} compensations failed",
                        self.object.short(),
                        scope.failed,
                        scope.expected
                    );
                }
                let err = scope.take_failure();
                scope.finish(Err(err));
            }
        }
    }
}
