pub mod membership;

pub use membership::{canonicalize, insert_sorted, remove_sorted, MembershipEntry};
