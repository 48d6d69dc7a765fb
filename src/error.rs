//! Error types for the storage engine.

use thiserror::Error;

use crate::types::PageId;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt file '{0}': size is not a positive multiple of the page size")]
    CorruptFile(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("file '{0}' already exists in the catalog")]
    NameExists(String),

    #[error("no such file '{0}' in the catalog")]
    NoSuchFile(String),

    #[error("page {0:?} is not resident in the buffer pool")]
    NotResident(PageId),

    #[error("catalog is missing the file for resident page {0:?}")]
    CatalogMissing(PageId),

    #[error("bad slot {slot} (capacity {capacity})")]
    BadSlot { slot: usize, capacity: usize },

    #[error("delete is not supported on a B+Tree file")]
    DeleteNotSupported,

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}
