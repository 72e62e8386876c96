//! Storage traits and error types
//!
//! This module defines the document-store interface used for scan history
//! and its error type.

use crate::state::ScanId;
use crate::storage::ScanResult;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Scan result already stored: {0}")]
    Duplicate(ScanId),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt record {id}: {message}")]
    Corrupt { id: String, message: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Document store holding one `ScanResult` per scan, keyed by scan id
///
/// Implementations must be safe to share between concurrently running scans
/// and query handlers.
pub trait ResultStore: Send + Sync {
    /// Stores a scan result
    fn insert(&self, result: &ScanResult) -> StorageResult<()>;

    /// All scan results, newest first
    fn find_all(&self) -> StorageResult<Vec<ScanResult>>;

    /// The scan result with this id, if any
    fn find_by_id(&self, id: &ScanId) -> StorageResult<Option<ScanResult>>;

    /// Scan results of one site (see `ScanResult::task`), newest first
    fn find_by_task(&self, task: &str) -> StorageResult<Vec<ScanResult>>;

    /// Deletes every scan result, returning how many were removed
    fn delete_all(&self) -> StorageResult<u64>;

    /// Deletes one scan result, returning how many were removed (0 or 1)
    fn delete_by_id(&self, id: &ScanId) -> StorageResult<u64>;

    /// Number of stored scan results
    fn count(&self) -> StorageResult<u64>;
}
