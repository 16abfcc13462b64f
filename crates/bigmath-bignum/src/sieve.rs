//! A bit sieve over odd candidate offsets, used to cull prime candidates
//! with small-prime trial division before the expensive tests run.
//!
//! Bit `i` of the sieve represents the candidate `base + 2*i + 1`; a set bit
//! marks a known composite. A shared sieve of the odd integers themselves
//! enumerates the small primes that drive the marking.

use std::sync::LazyLock;

use rand::RngCore;

use crate::bigint::BigInt;
use crate::mutable;

/// Sieve of the odd integers 1, 3, 5, ...; bit i represents 2*i + 1.
/// Large enough to hold the small primes worth trial-dividing by.
static SMALL_SIEVE: LazyLock<BitSieve> = LazyLock::new(BitSieve::small_sieve);

pub(crate) struct BitSieve {
    bits: Vec<u64>,
    /// Number of candidate bits in the sieve.
    length: usize,
}

fn unit_index(bit_index: usize) -> usize {
    bit_index >> 6
}

fn bit(bit_index: usize) -> u64 {
    1u64 << (bit_index & 0x3f)
}

impl BitSieve {
    fn small_sieve() -> BitSieve {
        let length = 150 * 64;
        let mut sieve = BitSieve {
            bits: vec![0u64; unit_index(length - 1) + 1],
            length,
        };
        sieve.set(0); // 1 is not prime

        let mut next_index = 1;
        let mut next_prime = 3;
        loop {
            sieve.sieve_single(length, next_index + next_prime, next_prime);
            match sieve.sieve_search(length, next_index + 1) {
                Some(i) => {
                    next_index = i;
                    next_prime = 2 * i + 1;
                }
                None => break,
            }
            if next_prime >= length {
                break;
            }
        }
        sieve
    }

    /// Sieve for `search_len` odd candidates above the even `base`,
    /// marking off the multiples of every small prime.
    pub(crate) fn new(base: &BigInt, search_len: usize) -> BitSieve {
        let mut sieve = BitSieve {
            bits: vec![0u64; unit_index(search_len - 1) + 1],
            length: search_len,
        };

        let small = &*SMALL_SIEVE;
        let mut step = match small.sieve_search(small.length, 0) {
            Some(s) => s,
            None => return sieve,
        };
        let mut converted_step = 2 * step + 1;

        loop {
            // First odd multiple of converted_step above base.
            let rem = mutable::rem_by_limb(base.mag(), converted_step as u32) as usize;
            let mut start = converted_step - rem;
            if start % 2 == 0 {
                start += converted_step;
            }
            sieve.sieve_single(search_len, (start - 1) / 2, converted_step);

            match small.sieve_search(small.length, step + 1) {
                Some(s) => {
                    step = s;
                    converted_step = 2 * s + 1;
                }
                None => break,
            }
        }
        sieve
    }

    fn get(&self, bit_index: usize) -> bool {
        self.bits[unit_index(bit_index)] & bit(bit_index) != 0
    }

    fn set(&mut self, bit_index: usize) {
        self.bits[unit_index(bit_index)] |= bit(bit_index);
    }

    /// Index of the first clear bit at or after `start`, below `limit`.
    fn sieve_search(&self, limit: usize, start: usize) -> Option<usize> {
        if start >= limit {
            return None;
        }
        let mut index = start;
        loop {
            if !self.get(index) {
                return Some(index);
            }
            index += 1;
            if index >= limit - 1 {
                return None;
            }
        }
    }

    /// Mark every `step`-th bit starting at `start`.
    fn sieve_single(&mut self, limit: usize, mut start: usize, step: usize) {
        while start < limit {
            self.set(start);
            start += step;
        }
    }

    /// First surviving candidate that also passes the expensive test, or
    /// `None` if the window is exhausted.
    pub(crate) fn retrieve(
        &self,
        init_value: &BigInt,
        certainty: u32,
        rng: &mut dyn RngCore,
    ) -> Option<BigInt> {
        let mut offset: u64 = 1;
        for unit in self.bits.iter() {
            let mut next = !unit;
            for _ in 0..64 {
                if next & 1 == 1 {
                    let candidate = init_value.add(&BigInt::from_u64(offset));
                    if candidate.prime_to_certainty(certainty, rng) {
                        return Some(candidate);
                    }
                }
                next >>= 1;
                offset += 2;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_small_sieve_marks_composites() {
        let small = &*SMALL_SIEVE;
        // Bit i represents 2i+1: primes clear, composites set.
        assert!(small.get(0)); // 1
        assert!(!small.get(1)); // 3
        assert!(!small.get(2)); // 5
        assert!(!small.get(3)); // 7
        assert!(small.get(4)); // 9
        assert!(!small.get(5)); // 11
        assert!(small.get(7)); // 15
        assert!(small.get(60)); // 121 = 11^2
        assert!(!small.get(63)); // 127
    }

    #[test]
    fn test_candidate_sieve_agrees_with_trial_division() {
        // base = 10^4 (even); candidates are 10001, 10003, ...
        let base = BigInt::from_u64(10_000);
        let sieve = BitSieve::new(&base, 128);
        for i in 0..128usize {
            let candidate = 10_001u64 + 2 * i as u64;
            let mut divisible = false;
            let mut p = 3u64;
            while p * p <= candidate && p < 19_200 {
                if candidate % p == 0 {
                    divisible = true;
                    break;
                }
                p += 2;
            }
            if divisible {
                assert!(
                    sieve.get(i),
                    "composite candidate {candidate} not marked"
                );
            }
        }
    }

    #[test]
    fn test_retrieve_finds_prime() {
        let base = BigInt::from_u64(1_000_000);
        let sieve = BitSieve::new(&base, 512);
        let mut rng = OsRng;
        let p = sieve.retrieve(&base, 100, &mut rng).unwrap();
        // 1000003 is the first prime above 10^6.
        assert_eq!(p, BigInt::from_u64(1_000_003));
    }
}
