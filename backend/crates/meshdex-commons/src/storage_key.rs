//! Storage key trait for explicit key serialization.
//!
//! Backends that persist records under byte keys (RocksDB) go through this
//! trait instead of `AsRef<[u8]>`, so composite keys always serialize every
//! component.

/// Trait for types that can be used as storage keys.
pub trait StorageKey: Clone + Send + Sync + 'static {
    /// Serialize the key for the storage engine.
    fn storage_key(&self) -> Vec<u8>;

    /// Parse a key previously produced by [`StorageKey::storage_key`].
    fn from_storage_key(bytes: &[u8]) -> Result<Self, String>
    where
        Self: Sized;
}
