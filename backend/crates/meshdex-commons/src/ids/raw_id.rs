//! Fixed-width content-addressed identifier.
//!
//! Every object and every index in the store is addressed by a 64-byte
//! identifier (a SHA-512 digest in the default key transform). The same type
//! is used on both sides of a membership relation: in a forward record the
//! entry ids are index ids, in a reverse record they are object ids.

use crate::errors::IndexError;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Width of every identifier, in bytes.
pub const RAW_ID_LEN: usize = 64;

/// 64-byte identifier of an object or an index.
///
/// `Ord` is plain ascending byte order. Membership entries use their own
/// order (see [`crate::models::MembershipEntry`]), which is not derived from
/// this one.
///
/// On the wire a `RawId` is a MessagePack `bin` of exactly 64 bytes; any other
/// length or type is rejected at decode time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawId([u8; RAW_ID_LEN]);

impl RawId {
    /// Wrap raw identifier bytes.
    pub const fn new(bytes: [u8; RAW_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// All-zero identifier.
    pub const fn zero() -> Self {
        Self([0u8; RAW_ID_LEN])
    }

    /// Build an identifier from a slice that must be exactly 64 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IndexError> {
        let arr: [u8; RAW_ID_LEN] = bytes.try_into().map_err(|_| {
            IndexError::InvalidId(format!(
                "expected {} byte identifier, got {} bytes",
                RAW_ID_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; RAW_ID_LEN] {
        &self.0
    }

    /// Full lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 bytes in hex, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Default for RawId {
    fn default() -> Self {
        Self::zero()
    }
}

impl AsRef<[u8]> for RawId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; RAW_ID_LEN]> for RawId {
    fn from(bytes: [u8; RAW_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for RawId {
    type Error = IndexError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_slice(bytes)
    }
}

impl fmt::Debug for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawId({}..)", self.short())
    }
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for RawId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

struct RawIdVisitor;

impl<'de> Visitor<'de> for RawIdVisitor {
    type Value = RawId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a {} byte binary identifier", RAW_ID_LEN)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<RawId, E> {
        let arr: [u8; RAW_ID_LEN] = v
            .try_into()
            .map_err(|_| E::invalid_length(v.len(), &self))?;
        Ok(RawId(arr))
    }
}

impl<'de> Deserialize<'de> for RawId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_bytes(RawIdVisitor)
    }
}
