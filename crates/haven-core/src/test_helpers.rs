//! Fast parameters for tests.
//!
//! Only compiled for this crate's tests or with the `test-helpers` feature.

use crate::{CipherSuite, EnvelopeCodec, KdfParams};

/// Cheapest Argon2id profile the bounds accept: 64 KiB, 1 pass, 1 lane.
pub fn fast_kdf_params() -> KdfParams {
    KdfParams {
        m_cost: 64,
        t_cost: 1,
        p_cost: 1,
    }
}

/// Envelope codec using [`fast_kdf_params`]
pub fn fast_codec(suite: CipherSuite) -> EnvelopeCodec {
    EnvelopeCodec::from_parts(suite, fast_kdf_params())
}
