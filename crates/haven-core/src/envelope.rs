//! Versioned AEAD envelope
//!
//! An envelope carries everything needed to decrypt it except the PIN:
//!
//! ```text
//! [version:1][m_cost:4 LE][t_cost:4 LE][p_cost:4 LE][salt:16][nonce:12][ciphertext][tag:16]
//! ```
//!
//! The version byte selects the cipher suite (1 = ChaCha20-Poly1305,
//! 2 = AES-256-GCM, both keyed by Argon2id). The 41-byte header is bound to
//! the ciphertext as associated data, so editing the cost parameters, salt
//! or nonce fails authentication just like editing the ciphertext does.

use crate::kdf::{derive_key, generate_salt, SymmetricKey, SALT_LEN};
use crate::{Error, Pin, Result};
use aes_gcm::Aes256Gcm;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305,
};
use haven_params::{CipherSuite, HavenConfig, KdfParams};
use rand::{rngs::OsRng, RngCore};
use std::fmt;
use zeroize::Zeroizing;

/// Nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// Authentication tag length in bytes
pub const TAG_LEN: usize = 16;

/// Version byte, KDF params, salt and nonce
pub const ENVELOPE_HEADER_LEN: usize = 1 + 12 + SALT_LEN + NONCE_LEN;

/// Smallest well-formed envelope (empty plaintext)
pub const MIN_ENVELOPE_LEN: usize = ENVELOPE_HEADER_LEN + TAG_LEN;

/// Self-describing ciphertext.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionEnvelope {
    /// Format version; selects the cipher suite
    pub version: u8,
    /// Argon2id parameters the key was derived with
    pub kdf: KdfParams,
    /// Per-envelope salt
    pub salt: [u8; SALT_LEN],
    /// Per-envelope nonce
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext without the tag
    pub ciphertext: Vec<u8>,
    /// AEAD tag
    pub tag: [u8; TAG_LEN],
}

impl EncryptionEnvelope {
    /// Cipher suite named by the version byte
    pub fn suite(&self) -> Result<CipherSuite> {
        CipherSuite::from_version(self.version).map_err(|_| Error::UnsupportedVersion(self.version))
    }

    fn header_bytes(&self) -> [u8; ENVELOPE_HEADER_LEN] {
        let mut header = [0u8; ENVELOPE_HEADER_LEN];
        header[0] = self.version;
        header[1..13].copy_from_slice(&self.kdf.to_le_bytes());
        header[13..13 + SALT_LEN].copy_from_slice(&self.salt);
        header[13 + SALT_LEN..].copy_from_slice(&self.nonce);
        header
    }

    /// Serialize to the binary layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MIN_ENVELOPE_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.header_bytes());
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }

    /// Parse the binary layout.
    ///
    /// An unknown version fails with [`Error::UnsupportedVersion`]; anything
    /// else malformed is indistinguishable from a wrong PIN.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let Some(&version) = data.first() else {
            return Err(Error::auth());
        };
        CipherSuite::from_version(version).map_err(|_| Error::UnsupportedVersion(version))?;

        if data.len() < MIN_ENVELOPE_LEN {
            return Err(Error::auth());
        }

        let mut params = [0u8; 12];
        params.copy_from_slice(&data[1..13]);
        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&data[13..13 + SALT_LEN]);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&data[13 + SALT_LEN..ENVELOPE_HEADER_LEN]);
        let tag_start = data.len() - TAG_LEN;
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&data[tag_start..]);

        Ok(Self {
            version,
            kdf: KdfParams::from_le_bytes(params),
            salt,
            nonce,
            ciphertext: data[ENVELOPE_HEADER_LEN..tag_start].to_vec(),
            tag,
        })
    }

    /// Standard base64 of the binary layout, as stored in JSON blobs
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Parse the base64 form
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD.decode(encoded).map_err(|_| Error::auth())?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for EncryptionEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionEnvelope")
            .field("version", &self.version)
            .field("kdf", &self.kdf)
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

/// Seals and opens envelopes with a configured suite and KDF profile.
///
/// The configuration only affects sealing; opening always follows the
/// envelope's own header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeCodec {
    suite: CipherSuite,
    kdf: KdfParams,
}

impl EnvelopeCodec {
    /// Create a codec, validating the KDF profile
    pub fn new(suite: CipherSuite, kdf: KdfParams) -> Result<Self> {
        kdf.validate()?;
        Ok(Self { suite, kdf })
    }

    /// Codec for the suite and profile in `config`
    pub fn from_config(config: &HavenConfig) -> Result<Self> {
        Self::new(config.cipher, config.kdf)
    }

    pub(crate) fn from_parts(suite: CipherSuite, kdf: KdfParams) -> Self {
        Self { suite, kdf }
    }

    /// Suite used for sealing
    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// KDF profile used for sealing
    pub fn kdf_params(&self) -> KdfParams {
        self.kdf
    }

    /// Encrypt `plaintext` under `pin` with a fresh salt and nonce.
    pub fn seal(&self, plaintext: &[u8], pin: &Pin) -> Result<EncryptionEnvelope> {
        let salt = generate_salt();
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let key = derive_key(pin, &salt, &self.kdf)?;

        let mut envelope = EncryptionEnvelope {
            version: self.suite.version(),
            kdf: self.kdf,
            salt,
            nonce,
            ciphertext: Vec::new(),
            tag: [0u8; TAG_LEN],
        };
        let header = envelope.header_bytes();
        let payload = Payload {
            msg: plaintext,
            aad: &header,
        };

        let mut sealed = match self.suite {
            CipherSuite::ChaCha20Poly1305 => chacha_cipher(&key).encrypt(nonce_ref(&nonce), payload),
            CipherSuite::Aes256Gcm => aes_cipher(&key).encrypt(nonce_ref(&nonce), payload),
        }
        .map_err(|e| Error::Encryption(e.to_string()))?;

        let tag_start = sealed.len() - TAG_LEN;
        envelope.tag.copy_from_slice(&sealed[tag_start..]);
        sealed.truncate(tag_start);
        envelope.ciphertext = sealed;

        tracing::debug!(
            "Sealed envelope v{} ({} bytes)",
            envelope.version,
            envelope.ciphertext.len()
        );
        Ok(envelope)
    }

    /// Decrypt `envelope` with `pin`.
    ///
    /// Unknown versions fail with [`Error::UnsupportedVersion`]. A wrong PIN,
    /// an edited header, a bad tag or out-of-bounds KDF parameters all fail
    /// with the same authentication error.
    pub fn open(&self, envelope: &EncryptionEnvelope, pin: &Pin) -> Result<Zeroizing<Vec<u8>>> {
        let suite = envelope.suite()?;
        envelope.kdf.validate().map_err(|_| Error::auth())?;

        let key = derive_key(pin, &envelope.salt, &envelope.kdf)?;

        let header = envelope.header_bytes();
        let mut body = Vec::with_capacity(envelope.ciphertext.len() + TAG_LEN);
        body.extend_from_slice(&envelope.ciphertext);
        body.extend_from_slice(&envelope.tag);
        let payload = Payload {
            msg: &body,
            aad: &header,
        };

        let plaintext = match suite {
            CipherSuite::ChaCha20Poly1305 => {
                chacha_cipher(&key).decrypt(nonce_ref(&envelope.nonce), payload)
            }
            CipherSuite::Aes256Gcm => aes_cipher(&key).decrypt(nonce_ref(&envelope.nonce), payload),
        }
        .map_err(|_| Error::auth())?;

        Ok(Zeroizing::new(plaintext))
    }
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self {
            suite: CipherSuite::default(),
            kdf: KdfParams::default(),
        }
    }
}

fn chacha_cipher(key: &SymmetricKey) -> ChaCha20Poly1305 {
    ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key.as_bytes()))
}

fn aes_cipher(key: &SymmetricKey) -> Aes256Gcm {
    Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

fn nonce_ref(nonce: &[u8; NONCE_LEN]) -> &chacha20poly1305::Nonce {
    chacha20poly1305::Nonce::from_slice(nonce)
}

/// Encrypt with the default suite and PIN profile.
pub fn encrypt(plaintext: &[u8], pin: &Pin) -> Result<EncryptionEnvelope> {
    EnvelopeCodec::default().seal(plaintext, pin)
}

/// Decrypt any supported envelope.
pub fn decrypt(envelope: &EncryptionEnvelope, pin: &Pin) -> Result<Zeroizing<Vec<u8>>> {
    EnvelopeCodec::default().open(envelope, pin)
}
