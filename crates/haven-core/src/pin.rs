//! PINs and PIN roles

use crate::{Error, Result};
use haven_params::PinPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// What a PIN does when entered on the disguise surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinRole {
    /// Opens the real app
    Real,
    /// Opens a harmless facade
    Decoy,
    /// Destroys all credentials and evidence, then looks like a wrong PIN
    Wipe,
    /// Protects the evidence vault when set separately from the real PIN
    Vault,
}

/// Order in which matching roles win when two roles share a PIN.
///
/// Wipe comes first so a duress wipe can never be shadowed by another role.
pub const ROLE_PRIORITY: [PinRole; 4] = [PinRole::Wipe, PinRole::Real, PinRole::Decoy, PinRole::Vault];

impl PinRole {
    /// Every role, in declaration order
    pub const ALL: [PinRole; 4] = [PinRole::Real, PinRole::Decoy, PinRole::Wipe, PinRole::Vault];

    /// Stable storage name
    pub const fn as_str(self) -> &'static str {
        match self {
            PinRole::Real => "real",
            PinRole::Decoy => "decoy",
            PinRole::Wipe => "wipe",
            PinRole::Vault => "vault",
        }
    }

    /// Position in [`ROLE_PRIORITY`]; lower wins
    pub fn priority(self) -> usize {
        ROLE_PRIORITY
            .iter()
            .position(|r| *r == self)
            .unwrap_or(ROLE_PRIORITY.len())
    }
}

impl fmt::Display for PinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PinRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "real" => Ok(PinRole::Real),
            "decoy" => Ok(PinRole::Decoy),
            "wipe" => Ok(PinRole::Wipe),
            "vault" => Ok(PinRole::Vault),
            other => Err(format!("unknown PIN role: {}", other)),
        }
    }
}

/// A PIN held in a zeroizing buffer.
///
/// Construction does not validate; call [`Pin::check`] where the format
/// matters (setting a credential). Verification accepts anything and simply
/// fails to match.
#[derive(Clone)]
pub struct Pin(Zeroizing<String>);

impl Pin {
    /// Wrap a PIN
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Wrap a PIN, rejecting it if it violates `policy`
    pub fn parse(value: impl Into<String>, policy: &PinPolicy) -> Result<Self> {
        let pin = Self::new(value);
        pin.check(policy)?;
        Ok(pin)
    }

    /// Check the PIN against `policy`
    pub fn check(&self, policy: &PinPolicy) -> Result<()> {
        match policy.violation(&self.0) {
            Some(reason) => Err(Error::InvalidPinFormat(reason)),
            None => Ok(()),
        }
    }

    /// PIN bytes for key derivation
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Number of digits
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the PIN is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(<redacted>)")
    }
}

impl From<&str> for Pin {
    fn from(value: &str) -> Self {
        Pin::new(value)
    }
}
