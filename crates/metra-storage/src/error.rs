/// Errors that can occur within the storage layer.
///
/// Whether an error is fatal is the caller's call: a failed snapshot
/// restore aborts startup, while the periodic dump and the write-through
/// path log and continue.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Snapshot file could not be read or written.
    #[error("Storage: I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot serialization or deserialization failure.
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An underlying SQLite error from the write-through backend.
    #[error("Storage: SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Write-through gave up after its retry budget.
    #[error("Storage: write-through exhausted retries: {0}")]
    WriteThrough(#[from] metra_common::retry::RetriesExhausted<rusqlite::Error>),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
