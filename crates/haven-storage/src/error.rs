//! Error types

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend cannot be reached
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for haven_core::Error {
    fn from(err: Error) -> Self {
        haven_core::Error::StorageUnavailable(err.to_string())
    }
}
