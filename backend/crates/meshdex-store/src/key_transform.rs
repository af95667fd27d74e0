//! Content-addressed location derivation.
//!
//! Reverse records live at the index id itself. Forward records live at
//! `transform(object_id ++ suffix)`, where the suffix separates the forward
//! record from the object's own data stored at `object_id`.

use meshdex_commons::{RawId, RecordKey, RAW_ID_LEN};
use sha2::{Digest, Sha512};

/// Hash function turning arbitrary bytes into a store identifier.
pub trait KeyTransform: Send + Sync {
    fn transform(&self, data: &[u8]) -> RawId;
}

/// SHA-512 key transform; digests are exactly [`RAW_ID_LEN`] bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha512Transform;

impl KeyTransform for Sha512Transform {
    fn transform(&self, data: &[u8]) -> RawId {
        let digest = Sha512::digest(data);
        let mut bytes = [0u8; RAW_ID_LEN];
        bytes.copy_from_slice(digest.as_slice());
        RawId::new(bytes)
    }
}

/// Location of the forward record of `object`.
pub fn forward_location(transform: &dyn KeyTransform, object: &RawId, suffix: &str) -> RecordKey {
    let mut key = Vec::with_capacity(RAW_ID_LEN + suffix.len());
    key.extend_from_slice(object.as_bytes());
    key.extend_from_slice(suffix.as_bytes());
    RecordKey::new(transform.transform(&key))
}

/// Location of the reverse record of `index`.
pub fn reverse_location(index: &RawId) -> RecordKey {
    RecordKey::new(*index)
}
