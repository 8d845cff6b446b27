use thiserror::Error;

/// Errors from exporting results or persisting player states.
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO error reading/writing file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Persisted file whose header names a different cell than its path.
    #[error("{} holds players for {}", .path.display(), .found)]
    Mismatch { path: std::path::PathBuf, found: String },

    /// CSV writing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
