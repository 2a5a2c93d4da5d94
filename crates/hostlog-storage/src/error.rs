use hostlog_common::payload::PayloadError;

/// Errors that can occur within the storage layer.
///
/// # Examples
///
/// ```rust
/// use hostlog_storage::error::StorageError;
///
/// let err = StorageError::UnsupportedUrl("postgres://db/logs".to_string());
/// assert!(err.to_string().contains("postgres"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An underlying SQLite error.
    #[error("Storage: SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON encoding or decoding of a collection column failed.
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A schemaless `log_data` payload could not be decoded.
    #[error("Storage: {0}")]
    Payload(#[from] PayloadError),

    /// A stored timestamp is not valid RFC 3339.
    #[error("Storage: invalid timestamp in column '{column}': {value}")]
    InvalidTimestamp { column: &'static str, value: String },

    /// The database URL names a scheme this build cannot open.
    #[error("Storage: unsupported database URL '{0}'")]
    UnsupportedUrl(String),

    /// Creating the database directory failed.
    #[error("Storage: I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
