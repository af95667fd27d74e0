//! Serialization of persisted index records.
//!
//! Membership records use a versioned MessagePack envelope (`rmp-serde`) so
//! that records written by other store clients stay readable.

pub mod membership_codec;

pub use membership_codec::{MembershipRecord, MEMBERSHIP_RECORD_VERSION};
