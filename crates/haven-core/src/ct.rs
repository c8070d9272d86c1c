//! Constant-time comparison

use subtle::ConstantTimeEq;

/// Compare two byte strings without early exit on the first difference.
///
/// Lengths are not secret here (hashes are fixed-size), so a length
/// mismatch returns `false` immediately.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
