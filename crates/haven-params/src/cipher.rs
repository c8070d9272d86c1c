//! AEAD cipher suites and their envelope version bytes

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Cipher suite used for new envelopes.
///
/// The discriminant is the envelope version byte. Both suites use
/// Argon2id for key derivation, a 12-byte nonce and a 16-byte tag.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CipherSuite {
    /// Argon2id + ChaCha20-Poly1305
    #[default]
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305 = 1,
    /// Argon2id + AES-256-GCM
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm = 2,
}

impl CipherSuite {
    /// Envelope version byte for this suite
    pub const fn version(self) -> u8 {
        self as u8
    }

    /// Look up the suite for an envelope version byte
    pub fn from_version(version: u8) -> Result<Self> {
        match version {
            1 => Ok(Self::ChaCha20Poly1305),
            2 => Ok(Self::Aes256Gcm),
            other => Err(Error::UnknownCipherSuite(other)),
        }
    }

    /// Human-readable name
    pub const fn name(self) -> &'static str {
        match self {
            Self::ChaCha20Poly1305 => "chacha20-poly1305",
            Self::Aes256Gcm => "aes-256-gcm",
        }
    }
}
