//! Haven cryptographic core
//!
//! This crate implements the PIN types and role table, Argon2id key
//! derivation, the versioned AEAD envelope codec, constant-time
//! comparison and cooperative cancellation shared by the storage and
//! access-control crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cancel;
pub mod ct;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod pin;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use cancel::CancelToken;
pub use ct::constant_time_eq;
pub use envelope::{
    decrypt, encrypt, EncryptionEnvelope, EnvelopeCodec, ENVELOPE_HEADER_LEN, MIN_ENVELOPE_LEN,
    NONCE_LEN, TAG_LEN,
};
pub use error::{AuthError, Error, ErrorCategory, Result};
pub use kdf::{derive_key, generate_salt, SymmetricKey, KEY_LEN, SALT_LEN};
pub use pin::{Pin, PinRole, ROLE_PRIORITY};

pub use haven_params::{CipherSuite, KdfParams, PinPolicy};
