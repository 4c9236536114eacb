//! Storage traits and error types
//!
//! The crawl persists three things: the request queue, a key-value store for
//! progress and diagnostic artifacts, and the dataset of output records.

use crate::crawler::CrawlRequest;
use crate::state::RequestState;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Request not found: {0}")]
    RequestNotFound(String),

    #[error("Invalid state transition for {key}: {from} -> {to}")]
    InvalidTransition {
        key: String,
        from: RequestState,
        to: RequestState,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistent, deduplicating request queue
pub trait RequestQueue {
    /// Adds a request unless one with the same unique key already exists
    ///
    /// # Arguments
    ///
    /// * `request` - The request to add
    /// * `forefront` - Place the request ahead of everything pending
    ///
    /// # Returns
    ///
    /// `true` if the request was added, `false` if its key was already known
    fn add_request(&mut self, request: &CrawlRequest, forefront: bool) -> StorageResult<bool>;

    /// Takes the next pending request and marks it in progress
    fn fetch_next(&mut self) -> StorageResult<Option<CrawlRequest>>;

    /// Marks an in-progress request as handled
    fn mark_handled(&mut self, unique_key: &str) -> StorageResult<()>;

    /// Returns an in-progress request to the back of the queue
    ///
    /// The stored retry count and error messages are replaced with the ones
    /// carried by `request`.
    fn reclaim(&mut self, request: &CrawlRequest) -> StorageResult<()>;

    /// Marks an in-progress request as permanently failed
    fn mark_failed(&mut self, request: &CrawlRequest) -> StorageResult<()>;

    /// True when nothing is pending and nothing is in progress
    fn is_finished(&self) -> StorageResult<bool>;

    /// Gets the current state of a request
    fn request_state(&self, unique_key: &str) -> StorageResult<Option<RequestState>>;

    /// Counts requests in a specific state
    fn count_by_state(&self, state: RequestState) -> StorageResult<u64>;

    /// Returns requests left in progress by an interrupted run to pending
    ///
    /// # Returns
    ///
    /// The number of recovered requests
    fn recover_interrupted(&mut self) -> StorageResult<u64>;
}

/// Named binary values
pub trait KeyValueStore {
    fn get_value(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value
    fn set_value(&mut self, key: &str, value: &[u8], content_type: &str) -> StorageResult<()>;
}

/// Append-only list of JSON output records
pub trait Dataset {
    /// Appends all records in one transaction
    fn push_records(&mut self, records: &[serde_json::Value]) -> StorageResult<()>;

    /// All records in insertion order
    fn records(&self) -> StorageResult<Vec<serde_json::Value>>;

    fn record_count(&self) -> StorageResult<u64>;
}
