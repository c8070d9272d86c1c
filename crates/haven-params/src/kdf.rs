//! Argon2id cost profile

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Lower bound for the memory cost, in KiB.
pub const MIN_M_COST: u32 = 8;
/// Upper bound for the memory cost, in KiB (256 MiB).
pub const MAX_M_COST: u32 = 262_144;
/// Upper bound for the number of passes.
pub const MAX_T_COST: u32 = 16;
/// Upper bound for the number of lanes.
pub const MAX_P_COST: u32 = 16;

/// Argon2id cost parameters.
///
/// Every credential and every envelope records the parameters it was
/// produced with, so changing the configured profile never invalidates
/// existing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub m_cost: u32,
    /// Number of passes
    pub t_cost: u32,
    /// Degree of parallelism
    pub p_cost: u32,
}

impl KdfParams {
    /// PIN profile: 16 MiB, 2 passes, 2 lanes.
    ///
    /// Keeps a verification under roughly half a second on low-end phones
    /// while still making an offline sweep of the 6-digit space expensive.
    pub const PIN_PROFILE: Self = Self {
        m_cost: 16_384,
        t_cost: 2,
        p_cost: 2,
    };

    /// Create parameters, checking them against the accepted bounds.
    pub fn new(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self> {
        let params = Self {
            m_cost,
            t_cost,
            p_cost,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check the parameters against the accepted bounds.
    ///
    /// Parameters read back from disk go through this before any memory is
    /// allocated, so a forged header cannot request an unbounded derivation.
    pub fn validate(&self) -> Result<()> {
        if self.p_cost == 0 || self.p_cost > MAX_P_COST {
            return Err(Error::InvalidKdfParams(format!(
                "parallelism must be 1..={}, got {}",
                MAX_P_COST, self.p_cost
            )));
        }
        if self.t_cost == 0 || self.t_cost > MAX_T_COST {
            return Err(Error::InvalidKdfParams(format!(
                "passes must be 1..={}, got {}",
                MAX_T_COST, self.t_cost
            )));
        }
        let floor = MIN_M_COST.max(8 * self.p_cost);
        if self.m_cost < floor || self.m_cost > MAX_M_COST {
            return Err(Error::InvalidKdfParams(format!(
                "memory must be {}..={} KiB, got {}",
                floor, MAX_M_COST, self.m_cost
            )));
        }
        Ok(())
    }

    /// Serialize as 12 little-endian bytes: m, t, p.
    pub fn to_le_bytes(&self) -> [u8; 12] {
        let mut out = [0u8; 12];
        out[0..4].copy_from_slice(&self.m_cost.to_le_bytes());
        out[4..8].copy_from_slice(&self.t_cost.to_le_bytes());
        out[8..12].copy_from_slice(&self.p_cost.to_le_bytes());
        out
    }

    /// Parse the 12-byte form produced by [`KdfParams::to_le_bytes`].
    pub fn from_le_bytes(bytes: [u8; 12]) -> Self {
        let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Self {
            m_cost: word(0),
            t_cost: word(4),
            p_cost: word(8),
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::PIN_PROFILE
    }
}
