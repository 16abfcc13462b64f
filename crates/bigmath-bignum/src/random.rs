//! Random value construction.
//!
//! Callers supply any [`rand::RngCore`]; operations that need randomness but
//! take none (primality testing) fall back to the operating system's CSPRNG
//! via [`rand::rngs::OsRng`].

use rand::RngCore;

use crate::bigint::BigInt;
use crate::convert::mag_from_be_bytes;

impl BigInt {
    /// Uniformly random non-negative value in `[0, 2^num_bits)`.
    pub fn random_bits(num_bits: usize, rng: &mut dyn RngCore) -> BigInt {
        let num_bytes = (num_bits + 7) / 8;
        let mut bytes = vec![0u8; num_bytes];
        if num_bytes > 0 {
            rng.fill_bytes(&mut bytes);
            // Mask out any excess bits in the most significant byte.
            let excess_bits = 8 * num_bytes - num_bits;
            bytes[0] &= ((1u16 << (8 - excess_bits)) - 1) as u8;
        }
        BigInt::from_mag(mag_from_be_bytes(&bytes), 1)
    }
}
