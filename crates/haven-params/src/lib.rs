//! Haven tunable parameters and configuration
//!
//! This crate provides the key-derivation cost profile, cipher suite
//! identifiers, PIN policy, retry backoff policy and the on-disk
//! configuration file used by the rest of the workspace.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cipher;
pub mod config;
pub mod kdf;
pub mod policy;

pub use cipher::CipherSuite;
pub use config::{default_data_dir, HavenConfig, CONFIG_FILE_NAME, DATA_DIR_ENV};
pub use kdf::KdfParams;
pub use policy::{BackoffPolicy, PinPolicy, MAX_PIN_LENGTH, MIN_PIN_LENGTH};

/// Error types for parameter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid KDF cost parameters
    #[error("Invalid KDF parameters: {0}")]
    InvalidKdfParams(String),

    /// Invalid PIN policy
    #[error("Invalid PIN policy: {0}")]
    InvalidPinPolicy(String),

    /// Unknown cipher suite identifier
    #[error("Unknown cipher suite: {0}")]
    UnknownCipherSuite(u8),

    /// Config file could not be read or written
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for parameter operations
pub type Result<T> = std::result::Result<T, Error>;
