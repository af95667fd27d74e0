//! Index maintenance protocol.
//!
//! - [`update`]: write an object's forward record, then fan out reverse-record
//!   mutations through a [`batch::IndexBatch`]
//! - [`rollback`]: undo the landed part of a partially failed batch
//! - [`find`]: intersect reverse records
//! - [`check`]: read a forward record back

pub mod batch;
pub mod check;
pub mod diff;
pub mod find;
pub mod mutation;
pub mod rollback;
pub mod update;

pub use batch::{BatchHandle, BatchState, IndexBatch};
pub use check::check_indexes;
pub use diff::{intersect_sorted, MembershipDelta};
pub use find::find_indexes;
pub use mutation::{Mutation, MutationKind};
pub use rollback::compensations;
pub use update::update_indexes;
