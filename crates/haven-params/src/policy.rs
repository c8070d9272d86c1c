//! PIN format and failed-attempt backoff policies

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shortest PIN length a policy may require
pub const MIN_PIN_LENGTH: usize = 4;
/// Longest PIN length a policy may require
pub const MAX_PIN_LENGTH: usize = 12;

/// PIN format policy: fixed length, ASCII digits only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinPolicy {
    /// Exact number of digits a PIN must have
    pub length: usize,
}

impl PinPolicy {
    /// Create a policy for the given length
    pub fn new(length: usize) -> Result<Self> {
        let policy = Self { length };
        policy.validate()?;
        Ok(policy)
    }

    /// Check the policy itself
    pub fn validate(&self) -> Result<()> {
        if !(MIN_PIN_LENGTH..=MAX_PIN_LENGTH).contains(&self.length) {
            return Err(Error::InvalidPinPolicy(format!(
                "length must be {}..={}, got {}",
                MIN_PIN_LENGTH, MAX_PIN_LENGTH, self.length
            )));
        }
        Ok(())
    }

    /// Describe why `candidate` is not an acceptable PIN, if it is not.
    pub fn violation(&self, candidate: &str) -> Option<String> {
        if candidate.len() != self.length {
            return Some(format!("PIN must be exactly {} digits", self.length));
        }
        if !candidate.bytes().all(|b| b.is_ascii_digit()) {
            return Some("PIN must contain only digits".to_string());
        }
        None
    }

    /// Returns `true` if `candidate` satisfies the policy
    pub fn accepts(&self, candidate: &str) -> bool {
        self.violation(candidate).is_none()
    }
}

impl Default for PinPolicy {
    fn default() -> Self {
        Self { length: 6 }
    }
}

/// Advisory delay after repeated failed unlocks.
///
/// This never locks the user out; it only yields a `retry_after` hint the
/// disguise surface can honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    /// Failures tolerated before any delay applies
    pub free_attempts: u32,
    /// Delay after the first failure past the free attempts, in ms
    pub base_delay_ms: u64,
    /// Cap on the delay, in ms
    pub max_delay_ms: u64,
}

impl BackoffPolicy {
    /// Delay to suggest after `failures` consecutive failed attempts.
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures <= self.free_attempts {
            return Duration::ZERO;
        }
        let exponent = (failures - self.free_attempts - 1).min(16);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            free_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}
