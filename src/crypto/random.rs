//! Secure random number generation.
//!
//! Nonces and the random filler of the reply come straight from the
//! operating system's entropy source.

use rand::RngCore;
use rand_core::OsRng;

/// Cryptographically secure random number generator.
pub struct SecureRandom;

impl SecureRandom {
    /// Fill a buffer with cryptographically secure random bytes.
    pub fn fill(dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }

    /// Generate a fixed-size array of random bytes.
    pub fn bytes<const N: usize>() -> [u8; N] {
        let mut buf = [0u8; N];
        OsRng.fill_bytes(&mut buf);
        buf
    }
}

/// Generate random filler of the specified length.
pub fn random_padding(len: usize) -> Vec<u8> {
    let mut padding = vec![0u8; len];
    SecureRandom::fill(&mut padding);
    padding
}
