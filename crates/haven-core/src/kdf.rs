//! Argon2id key derivation

use crate::{Error, Pin, Result};
use argon2::{Algorithm, Argon2, ParamsBuilder, Version};
use haven_params::KdfParams;
use rand::{rngs::OsRng, RngCore};
use std::fmt;
use zeroize::Zeroizing;

/// Salt length in bytes
pub const SALT_LEN: usize = 16;

/// Derived key length in bytes
pub const KEY_LEN: usize = 32;

/// 256-bit symmetric key, zeroized on drop.
pub struct SymmetricKey(Zeroizing<[u8; KEY_LEN]>);

impl SymmetricKey {
    /// Get key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// Generate a fresh random salt
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive a 32-byte key from `pin` and `salt` with Argon2id v1.3.
///
/// The cost parameters are checked before anything is allocated.
pub fn derive_key(pin: &Pin, salt: &[u8], params: &KdfParams) -> Result<SymmetricKey> {
    if salt.len() < SALT_LEN {
        return Err(Error::KeyDerivation("Salt too short".to_string()));
    }
    params
        .validate()
        .map_err(|e| Error::KeyDerivation(e.to_string()))?;

    let argon_params = ParamsBuilder::new()
        .m_cost(params.m_cost)
        .t_cost(params.t_cost)
        .p_cost(params.p_cost)
        .output_len(KEY_LEN)
        .build()
        .map_err(|e| Error::KeyDerivation(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(pin.as_bytes(), salt, &mut *key)
        .map_err(|e| Error::KeyDerivation(e.to_string()))?;

    Ok(SymmetricKey(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::fast_kdf_params;

    #[test]
    fn test_derivation_is_deterministic() {
        let salt = [7u8; SALT_LEN];
        let pin = Pin::new("123456");
        let k1 = derive_key(&pin, &salt, &fast_kdf_params()).unwrap();
        let k2 = derive_key(&pin, &salt, &fast_kdf_params()).unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes());
        assert!(k1.as_bytes().iter().any(|&b| b != 0));
    }

    #[test]
    fn test_salt_and_pin_change_key() {
        let params = fast_kdf_params();
        let pin = Pin::new("123456");
        let a = derive_key(&pin, &generate_salt(), &params).unwrap();
        let b = derive_key(&pin, &generate_salt(), &params).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());

        let salt = generate_salt();
        let c = derive_key(&Pin::new("123456"), &salt, &params).unwrap();
        let d = derive_key(&Pin::new("123457"), &salt, &params).unwrap();
        assert_ne!(c.as_bytes(), d.as_bytes());
    }

    #[test]
    fn test_params_change_key() {
        let salt = generate_salt();
        let pin = Pin::new("123456");
        let fast = fast_kdf_params();
        let slower = KdfParams::new(fast.m_cost * 2, fast.t_cost, fast.p_cost).unwrap();
        let a = derive_key(&pin, &salt, &fast).unwrap();
        let b = derive_key(&pin, &salt, &slower).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_short_salt_rejected() {
        let pin = Pin::new("123456");
        assert!(matches!(
            derive_key(&pin, &[0u8; 15], &fast_kdf_params()),
            Err(Error::KeyDerivation(_))
        ));
    }

    #[test]
    fn test_out_of_bounds_params_rejected() {
        let pin = Pin::new("123456");
        let params = KdfParams {
            m_cost: u32::MAX,
            t_cost: 1,
            p_cost: 1,
        };
        assert!(derive_key(&pin, &generate_salt(), &params).is_err());
    }

    #[test]
    fn test_pin_profile_derives() {
        // Full-cost profile once, to catch a profile argon2 would reject.
        let key = derive_key(&Pin::new("000000"), &generate_salt(), &KdfParams::PIN_PROFILE);
        assert!(key.is_ok());
    }
}
