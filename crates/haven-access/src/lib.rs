//! Access control for the disguised app
//!
//! Interprets a completed PIN entry against every PIN role and drives the
//! app between the calculator disguise, the real app, the decoy facade and
//! the failure screen. State lives only in memory; every process starts
//! disguised.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod controller;
pub mod pin_pad;
pub mod setup;
pub mod state;

pub use controller::{AccessController, EntryResult};
pub use pin_pad::{PadStatus, PinPad};
pub use setup::{SetupFlow, SetupOutcome, SetupStep, MISMATCH_MESSAGE};
pub use state::{next_state, AccessEvent, AccessState, Facade, InvalidTransition, Screen};

/// Access control errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Credential, storage or vault failure
    #[error(transparent)]
    Core(#[from] haven_core::Error),

    /// Event not valid in the current state
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// Cancel is not available until a real PIN exists
    #[error("Cancel is unavailable during first-run setup")]
    CancelSuppressed,
}

impl Error {
    /// Check if the same call may succeed later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Core(e) if e.is_retryable())
    }
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
