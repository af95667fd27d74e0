//! Client-facing entry point for index maintenance and lookup.

use crate::index::{check_indexes, find_indexes, update_indexes};
use crate::key_transform::{forward_location, KeyTransform, Sha512Transform};
use crate::storage_trait::IndexStorage;
use meshdex_commons::{IndexError, IndexSettings, MembershipEntry, MeshdexConfig, RawId, RecordKey, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Index operations over one storage collaborator.
///
/// Cheap to share behind an `Arc`; every call is independent and several may
/// run concurrently. Concurrent updates of the *same* object are not
/// serialized against each other beyond what the forward-record CAS gives.
///
/// # Example
///
/// ```rust,ignore
/// let session = IndexSession::new(Arc::new(MemoryBackend::new()));
/// session.update_indexes_by_name("docs/42", &["lang:rust", "status:draft"]).await?;
/// let drafts = session.find_indexes_by_name(&["status:draft"]).await?;
/// ```
pub struct IndexSession {
    storage: Arc<dyn IndexStorage>,
    transform: Arc<dyn KeyTransform>,
    forward_suffix: String,
    runtime: Option<Handle>,
}

impl IndexSession {
    /// Session with default settings. Picks up the current tokio runtime, if
    /// any, for the blocking wrappers.
    pub fn new(storage: Arc<dyn IndexStorage>) -> Self {
        Self::with_settings(storage, &IndexSettings::default())
    }

    pub fn with_settings(storage: Arc<dyn IndexStorage>, settings: &IndexSettings) -> Self {
        Self {
            storage,
            transform: Arc::new(Sha512Transform),
            forward_suffix: settings.forward_key_suffix.clone(),
            runtime: Handle::try_current().ok(),
        }
    }

    pub fn from_config(storage: Arc<dyn IndexStorage>, config: &MeshdexConfig) -> Self {
        Self::with_settings(storage, &config.index)
    }

    /// Replace the key transform. All clients of one store must use the same
    /// transform.
    pub fn with_transform(mut self, transform: Arc<dyn KeyTransform>) -> Self {
        self.transform = transform;
        self
    }

    /// Runtime the blocking wrappers drive. It must be a multi-thread runtime.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn storage(&self) -> &Arc<dyn IndexStorage> {
        &self.storage
    }

    /// Location of `object`'s forward record.
    pub fn forward_location(&self, object: &RawId) -> RecordKey {
        forward_location(self.transform.as_ref(), object, &self.forward_suffix)
    }

    /// Identifier for a human-readable object key or index name.
    pub fn id_for(&self, name: &str) -> RawId {
        self.transform.transform(name.as_bytes())
    }

    /// Make `desired` the exact index membership of `object`.
    ///
    /// Writes the forward record, then inserts `object` into every newly
    /// listed index and removes it from every index no longer listed. If some
    /// of those reverse-record changes fail, the ones that landed are undone
    /// and the first failure is returned. The forward record keeps `desired`
    /// either way.
    pub async fn update_indexes(&self, object: RawId, desired: Vec<MembershipEntry>) -> Result<()> {
        let forward = self.forward_location(&object);
        update_indexes(&self.storage, &forward, object, desired).await
    }

    /// [`IndexSession::update_indexes`] with ids derived from names and empty
    /// payloads.
    pub async fn update_indexes_by_name<S: AsRef<str>>(&self, object_key: &str, index_names: &[S]) -> Result<()> {
        let desired = index_names
            .iter()
            .map(|name| MembershipEntry::bare(self.id_for(name.as_ref())))
            .collect();
        self.update_indexes(self.id_for(object_key), desired).await
    }

    /// Objects that belong to every index in `indexes`.
    pub async fn find_indexes(&self, indexes: &[RawId]) -> Result<Vec<MembershipEntry>> {
        find_indexes(self.storage.as_ref(), indexes).await
    }

    pub async fn find_indexes_by_name<S: AsRef<str>>(&self, index_names: &[S]) -> Result<Vec<MembershipEntry>> {
        let indexes: Vec<RawId> = index_names
            .iter()
            .map(|name| self.id_for(name.as_ref()))
            .collect();
        self.find_indexes(&indexes).await
    }

    /// Indexes `object` currently claims, read from its forward record.
    pub async fn check_indexes(&self, object: &RawId) -> Result<Vec<MembershipEntry>> {
        check_indexes(self.storage.as_ref(), &self.forward_location(object)).await
    }

    pub async fn check_indexes_by_name(&self, object_key: &str) -> Result<Vec<MembershipEntry>> {
        self.check_indexes(&self.id_for(object_key)).await
    }

    /// Blocking form of [`IndexSession::update_indexes`] for threads outside
    /// the runtime.
    pub fn blocking_update_indexes(&self, object: RawId, desired: Vec<MembershipEntry>) -> Result<()> {
        self.block_on(self.update_indexes(object, desired))
    }

    pub fn blocking_find_indexes(&self, indexes: &[RawId]) -> Result<Vec<MembershipEntry>> {
        self.block_on(self.find_indexes(indexes))
    }

    pub fn blocking_check_indexes(&self, object: &RawId) -> Result<Vec<MembershipEntry>> {
        self.block_on(self.check_indexes(object))
    }

    fn block_on<T>(&self, future: impl Future<Output = Result<T>>) -> Result<T> {
        if Handle::try_current().is_ok() {
            return Err(IndexError::Runtime(
                "blocking index call made from inside a tokio runtime".to_string(),
            ));
        }
        let runtime = self.runtime.as_ref().ok_or_else(|| {
            IndexError::Runtime("no tokio runtime configured for blocking calls".to_string())
        })?;
        runtime.block_on(future)
    }
}
