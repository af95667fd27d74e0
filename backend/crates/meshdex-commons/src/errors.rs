//! Error types shared by the meshdex crates.
//!
//! [`StorageError`] is what a storage collaborator reports for a failed read
//! or compare-and-swap. [`IndexError`] is what the index protocol reports to
//! its caller; collaborator failures reach the caller wrapped in
//! [`IndexError::Mutation`] without being rewritten. Protocol errors raised
//! inside an edit function cross the collaborator as [`StorageError::Edit`]
//! and are unwrapped back to their own kind.

use thiserror::Error;

/// Result type for index protocol operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Result type for storage collaborator operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Errors reported by a storage collaborator.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// No record is stored at the requested location
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Generic I/O error from the underlying engine
    #[error("I/O error: {0}")]
    IoError(String),

    /// The compare-and-swap kept losing to concurrent writers
    #[error("CAS conflict on {key}: gave up after {attempts} attempts")]
    CasConflict { key: String, attempts: u32 },

    /// The edit function refused the current bytes
    #[error("Edit rejected: {0}")]
    EditRejected(String),

    /// An index protocol error raised inside an edit function, carried
    /// through the collaborator unchanged
    #[error("Edit failed: {0}")]
    Edit(Box<IndexError>),

    /// Other errors
    #[error("Storage error: {0}")]
    Other(String),
}

/// Errors reported by the index maintenance and query protocols.
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    /// A stored membership record is malformed or has an unsupported version
    #[error("Failed to decode membership record: {0}")]
    Decode(String),

    /// A membership record could not be encoded
    #[error("Failed to encode membership record: {0}")]
    Encode(String),

    /// An identifier had the wrong width
    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    /// A CAS or read against the store failed
    #[error("Index mutation failed: {0}")]
    Mutation(#[source] StorageError),

    /// A bulk read answered for fewer locations than were requested
    #[error("Incomplete response: requested {requested} records, received {received}")]
    IncompleteResponse { requested: usize, received: usize },

    /// The batch dropped its completion handle without reporting
    #[error("Index batch abandoned before completion")]
    Abandoned,

    /// Blocking wrappers need a runtime handle and must not run on a runtime thread
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<IndexError> for StorageError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Mutation(inner) => inner,
            other => StorageError::Edit(Box::new(other)),
        }
    }
}

impl From<StorageError> for IndexError {
    /// An error raised by an edit function comes back as itself; anything
    /// else the collaborator reports is a failed mutation.
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Edit(inner) => *inner,
            other => IndexError::Mutation(other),
        }
    }
}
