//! Versioned MessagePack container for membership records.
//!
//! ## Wire format
//!
//! ```text
//! [ version: uint16 = 1,
//!   entries: [ [ id: bin(64), payload: bin ], ... ],
//!   related: [ bin(64), ... ] ]
//! ```
//!
//! Anything else (non-array envelope, wrong element count, another version,
//! identifiers that are not 64 bytes, type mismatches) fails with
//! [`IndexError::Decode`].

use crate::errors::{IndexError, Result};
use crate::ids::RawId;
use crate::models::membership::{insert_sorted, remove_sorted, MembershipEntry};
use serde::de::{self, IgnoredAny, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The only record version this crate reads or writes.
pub const MEMBERSHIP_RECORD_VERSION: u16 = 1;

/// Ordered membership list stored at a forward or reverse location.
///
/// `entries` is kept unique and in canonical [`MembershipEntry`] order.
/// `related` is opaque to index maintenance and carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipRecord {
    pub entries: Vec<MembershipEntry>,
    pub related: Vec<RawId>,
}

impl MembershipRecord {
    pub fn new(entries: Vec<MembershipEntry>) -> Self {
        Self {
            entries,
            related: Vec::new(),
        }
    }

    pub fn version(&self) -> u16 {
        MEMBERSHIP_RECORD_VERSION
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec(self).map_err(|e| IndexError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        rmp_serde::from_slice(bytes).map_err(|e| IndexError::Decode(e.to_string()))
    }

    /// Like [`MembershipRecord::decode`], but an empty value (absent record)
    /// decodes to an empty record.
    pub fn decode_or_empty(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        Self::decode(bytes)
    }

    pub fn contains(&self, entry: &MembershipEntry) -> bool {
        self.entries.binary_search(entry).is_ok()
    }

    /// Sorted insert; `false` when the entry was already present.
    pub fn insert(&mut self, entry: MembershipEntry) -> bool {
        insert_sorted(&mut self.entries, entry)
    }

    /// Sorted remove; `false` when the entry was absent.
    pub fn remove(&mut self, entry: &MembershipEntry) -> bool {
        remove_sorted(&mut self.entries, entry)
    }
}

impl Serialize for MembershipEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.id)?;
        tuple.serialize_element(serde_bytes::Bytes::new(&self.payload))?;
        tuple.end()
    }
}

struct EntryVisitor;

impl<'de> Visitor<'de> for EntryVisitor {
    type Value = MembershipEntry;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a [id, payload] pair")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
        let id: RawId = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let payload: serde_bytes::ByteBuf = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        if seq.next_element::<IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(3, &self));
        }
        Ok(MembershipEntry {
            id,
            payload: payload.into_vec(),
        })
    }
}

impl<'de> Deserialize<'de> for MembershipEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_seq(EntryVisitor)
    }
}

impl Serialize for MembershipRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&MEMBERSHIP_RECORD_VERSION)?;
        tuple.serialize_element(&self.entries)?;
        tuple.serialize_element(&self.related)?;
        tuple.end()
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = MembershipRecord;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a [version, entries, related] membership record")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
        let version: u16 = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        if version != MEMBERSHIP_RECORD_VERSION {
            return Err(de::Error::custom(format!(
                "unsupported membership record version {}",
                version
            )));
        }

        let entries: Vec<MembershipEntry> = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        let related: Vec<RawId> = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(2, &self))?;
        if seq.next_element::<IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(4, &self));
        }

        Ok(MembershipRecord { entries, related })
    }
}

impl<'de> Deserialize<'de> for MembershipRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_seq(RecordVisitor)
    }
}
