//! PIN credential manager
//!
//! One credential per role, stored in the secret store as JSON:
//! a fresh 16-byte salt, the 32-byte Argon2id output and the cost
//! parameters it was computed with.
//!
//! Verification always pays for one full key derivation, whether or not the
//! role is configured, and role matching always checks all four roles. An
//! observer timing `match_any_role` learns nothing about which roles exist
//! or which one matched.

use crate::SecretStore;
use haven_core::{
    constant_time_eq, derive_key, generate_salt, Error, KdfParams, Pin, PinPolicy, PinRole,
    Result, KEY_LEN, ROLE_PRIORITY, SALT_LEN,
};
use haven_params::HavenConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Secret store key prefix for credentials
pub const CREDENTIAL_KEY_PREFIX: &str = "haven.pin.";

/// Secret store key for `role`
pub fn credential_key(role: PinRole) -> String {
    format!("{}{}", CREDENTIAL_KEY_PREFIX, role.as_str())
}

/// A stored PIN verifier
#[derive(Clone)]
pub struct Credential {
    /// Role this credential unlocks
    pub role: PinRole,
    /// Per-credential salt, regenerated on every set
    pub salt: [u8; SALT_LEN],
    /// Argon2id output
    pub hash: Zeroizing<[u8; KEY_LEN]>,
    /// Cost parameters used for `hash`
    pub kdf: KdfParams,
}

#[derive(Serialize, Deserialize)]
struct StoredCredential {
    role: PinRole,
    salt: String,
    hash: String,
    kdf: KdfParams,
}

impl Credential {
    fn to_json(&self) -> Result<Zeroizing<String>> {
        let stored = StoredCredential {
            role: self.role,
            salt: hex::encode(self.salt),
            hash: hex::encode(&self.hash[..]),
            kdf: self.kdf,
        };
        Ok(Zeroizing::new(serde_json::to_string(&stored)?))
    }

    fn from_json(raw: &str) -> Option<Self> {
        let stored: StoredCredential = serde_json::from_str(raw).ok()?;
        let salt: [u8; SALT_LEN] = hex::decode(&stored.salt).ok()?.try_into().ok()?;
        let hash: [u8; KEY_LEN] = hex::decode(&stored.hash).ok()?.try_into().ok()?;
        stored.kdf.validate().ok()?;
        Some(Self {
            role: stored.role,
            salt,
            hash: Zeroizing::new(hash),
            kdf: stored.kdf,
        })
    }
}

/// Sets, verifies and matches PIN credentials.
pub struct CredentialManager {
    secrets: Arc<dyn SecretStore>,
    kdf: KdfParams,
    policy: PinPolicy,
}

impl CredentialManager {
    /// Create a manager using the KDF profile and PIN policy from `config`
    pub fn new(secrets: Arc<dyn SecretStore>, config: &HavenConfig) -> Self {
        Self::with_params(secrets, config.kdf, config.pin)
    }

    /// Create a manager with an explicit KDF profile and PIN policy
    pub fn with_params(secrets: Arc<dyn SecretStore>, kdf: KdfParams, policy: PinPolicy) -> Self {
        Self {
            secrets,
            kdf,
            policy,
        }
    }

    /// PIN policy applied when setting credentials
    pub fn policy(&self) -> &PinPolicy {
        &self.policy
    }

    /// KDF profile for new credentials
    pub fn kdf_params(&self) -> KdfParams {
        self.kdf
    }

    /// Store a credential for `role`, replacing any previous one.
    ///
    /// Fails with [`Error::InvalidPinFormat`] if `pin` violates the policy.
    pub fn set_credential(&self, role: PinRole, pin: &Pin) -> Result<()> {
        pin.check(&self.policy)?;

        let salt = generate_salt();
        let key = derive_key(pin, &salt, &self.kdf)?;
        let credential = Credential {
            role,
            salt,
            hash: Zeroizing::new(*key.as_bytes()),
            kdf: self.kdf,
        };

        self.secrets
            .set_secret(&credential_key(role), &credential.to_json()?)?;
        tracing::debug!("Credential stored");
        Ok(())
    }

    /// Check `pin` against the credential for `role`.
    ///
    /// An unset role costs the same key derivation as a set one and returns
    /// `false`, exactly like a wrong PIN. A malformed stored credential is
    /// treated as unset.
    pub fn verify_credential(&self, role: PinRole, pin: &Pin) -> Result<bool> {
        match self.load(role)? {
            Some(credential) => {
                let key = derive_key(pin, &credential.salt, &credential.kdf)?;
                Ok(constant_time_eq(key.as_bytes(), &credential.hash[..]))
            }
            None => {
                let dummy_salt = [0u8; SALT_LEN];
                let key = derive_key(pin, &dummy_salt, &self.kdf)?;
                let dummy_hash = [0u8; KEY_LEN];
                // Result discarded: the comparison only keeps the work identical.
                let _ = constant_time_eq(key.as_bytes(), &dummy_hash);
                Ok(false)
            }
        }
    }

    /// Find the role `pin` unlocks.
    ///
    /// All four roles are verified every time, in [`ROLE_PRIORITY`] order;
    /// the first matching role in that order wins.
    pub fn match_any_role(&self, pin: &Pin) -> Result<Option<PinRole>> {
        let mut matched = None;
        for role in ROLE_PRIORITY {
            let ok = self.verify_credential(role, pin)?;
            if ok && matched.is_none() {
                matched = Some(role);
            }
        }
        Ok(matched)
    }

    /// Returns `true` if `role` has a credential
    pub fn is_configured(&self, role: PinRole) -> Result<bool> {
        Ok(self.load(role)?.is_some())
    }

    /// Role whose PIN protects the evidence vault: Vault if set, else Real
    pub fn vault_secret_role(&self) -> Result<PinRole> {
        if self.is_configured(PinRole::Vault)? {
            Ok(PinRole::Vault)
        } else {
            Ok(PinRole::Real)
        }
    }

    /// Check `pin` against the vault secret
    pub fn verify_vault_secret(&self, pin: &Pin) -> Result<bool> {
        let role = self.vault_secret_role()?;
        self.verify_credential(role, pin)
    }

    /// Remove the credential for `role`
    pub fn clear_role(&self, role: PinRole) -> Result<()> {
        self.secrets.delete_secret(&credential_key(role))?;
        Ok(())
    }

    /// Remove every credential. Every role is attempted even if one fails.
    pub fn clear_all(&self) -> Result<()> {
        let mut first_error = None;
        for role in PinRole::ALL {
            if let Err(e) = self.clear_role(role) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn load(&self, role: PinRole) -> Result<Option<Credential>> {
        let Some(raw) = self.secrets.get_secret(&credential_key(role))? else {
            return Ok(None);
        };
        let raw = Zeroizing::new(raw);
        match Credential::from_json(&raw) {
            Some(credential) if credential.role == role => Ok(Some(credential)),
            _ => {
                tracing::warn!("Ignoring unreadable credential entry");
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("kdf", &self.kdf)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Shorthand used by callers that need an auth failure from a `false` verify
pub(crate) fn require(verified: bool) -> Result<()> {
    if verified {
        Ok(())
    } else {
        Err(Error::auth())
    }
}
