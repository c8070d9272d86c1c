//! Error types for Haven Core
//!
//! Failure taxonomy for credential, envelope and vault operations. A wrong
//! PIN and a corrupt envelope are deliberately the same error, and no
//! message names a PIN role.

use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Authentication failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Wrong PIN, or the data it protects is damaged. Never distinguished.
    #[error("Invalid PIN or corrupt data")]
    InvalidPinOrCorrupt,
}

/// Haven Core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Secret store or record store could not be reached
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Envelope version byte is not one this build understands
    #[error("Unsupported envelope version: {0}")]
    UnsupportedVersion(u8),

    /// Re-keying stopped before anything was written
    #[error("Re-key aborted: {0}")]
    RekeyAborted(String),

    /// PIN does not satisfy the PIN policy
    #[error("Invalid PIN format: {0}")]
    InvalidPinFormat(String),

    /// No evidence record with this id
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Key derivation error
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Cipher failure while sealing
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] haven_params::Error),

    /// Operation was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for the authentication failure
    pub fn auth() -> Self {
        Error::Auth(AuthError::InvalidPinOrCorrupt)
    }

    /// Check if the error is transient and the same call may succeed later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::StorageUnavailable(_))
    }

    /// Check if error is a user-facing error (vs internal error)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::Auth(_) | Error::InvalidPinFormat(_) | Error::RecordNotFound(_)
        )
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Error::Auth(_) => "Incorrect PIN".to_string(),
            Error::InvalidPinFormat(detail) => detail.clone(),
            Error::StorageUnavailable(_) => {
                "Storage is temporarily unavailable. Please try again.".to_string()
            }
            Error::RekeyAborted(_) => {
                "Your PIN was not changed. No data was modified.".to_string()
            }
            Error::RecordNotFound(_) => "That item no longer exists.".to_string(),
            Error::Cancelled => "Cancelled.".to_string(),
            _ => "Something went wrong.".to_string(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::StorageUnavailable(_) => ErrorCategory::Storage,
            Error::Auth(_) | Error::InvalidPinFormat(_) => ErrorCategory::Auth,
            Error::UnsupportedVersion(_) | Error::KeyDerivation(_) | Error::Encryption(_) => {
                ErrorCategory::Crypto
            }
            Error::RekeyAborted(_) | Error::RecordNotFound(_) => ErrorCategory::Vault,
            Error::Cancelled => ErrorCategory::Cancelled,
            Error::Config(_) | Error::Serialization(_) => ErrorCategory::Internal,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Storage-related errors
    Storage,
    /// PIN and authentication errors
    Auth,
    /// Envelope and key derivation errors
    Crypto,
    /// Evidence vault errors
    Vault,
    /// Cancelled operations
    Cancelled,
    /// Internal/system errors
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Storage => write!(f, "Storage"),
            ErrorCategory::Auth => write!(f, "Auth"),
            ErrorCategory::Crypto => write!(f, "Crypto"),
            ErrorCategory::Vault => write!(f, "Vault"),
            ErrorCategory::Cancelled => write!(f, "Cancelled"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}
