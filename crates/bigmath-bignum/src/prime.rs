//! Primality testing and prime generation.
//!
//! Candidates below 95 bits are generated directly and pre-tested with a
//! single multi-prime product; larger ones go through a [`BitSieve`] window.
//! Testing runs Miller-Rabin rounds scaled to the bit length, plus one
//! Lucas-Lehmer round from 100 bits up.

use bigmath_types::BigIntError;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::bigint::BigInt;
use crate::mutable;
use crate::sieve::BitSieve;

/// Bit length below which the sieve-free generation path is used.
const SMALL_PRIME_THRESHOLD: usize = 95;

/// Certainty used when the caller does not specify one.
const DEFAULT_PRIME_CERTAINTY: u32 = 100;

/// 3 * 5 * 7 * 11 * ... * 41: one modulus covers trial division by every
/// prime up to 41.
const SMALL_PRIME_PRODUCT: u64 = 3 * 5 * 7 * 11 * 13 * 17 * 19 * 23 * 29 * 31 * 37 * 41;

impl BigInt {
    /// True if this value is probably prime with probability at least
    /// 1 - 1/2^certainty; false if it is definitely composite. Certainty 0
    /// accepts everything.
    pub fn is_probable_prime(&self, certainty: u32) -> bool {
        if certainty == 0 {
            return true;
        }
        let w = self.abs();
        if w == BigInt::two() {
            return true;
        }
        if !w.test_bit(0) || w.is_one() {
            return false;
        }
        let mut rng = OsRng;
        w.prime_to_certainty(certainty, &mut rng)
    }

    /// Core primality test for odd values above 2. Round counts follow the
    /// ANSI X9.80 schedule; sizes of 100 bits and up add a Lucas-Lehmer
    /// round.
    pub(crate) fn prime_to_certainty(&self, certainty: u32, rng: &mut dyn RngCore) -> bool {
        // Each Miller-Rabin round buys two bits of certainty.
        let n = certainty / 2 + (certainty & 1);

        let size_in_bits = self.bit_len();
        if size_in_bits < 100 {
            let rounds = 50.min(n);
            return self.passes_miller_rabin(rounds as usize, rng);
        }

        let rounds: u32 = if size_in_bits < 256 {
            27
        } else if size_in_bits < 512 {
            15
        } else if size_in_bits < 768 {
            8
        } else if size_in_bits < 1024 {
            4
        } else {
            2
        };
        let rounds = rounds.min(n);

        self.passes_miller_rabin(rounds as usize, rng) && self.passes_lucas_lehmer()
    }

    /// Miller-Rabin with uniformly random witnesses in (1, self).
    /// Assumes self is positive, odd and greater than 2.
    fn passes_miller_rabin(&self, iterations: usize, rng: &mut dyn RngCore) -> bool {
        // Find a and m such that m is odd and self == 1 + 2^a * m.
        let this_minus_one = self.subtract(&BigInt::one());
        let a = this_minus_one.lowest_set_bit().unwrap_or(0);
        let m = this_minus_one.shr(a);

        let two = BigInt::two();
        for _ in 0..iterations {
            let b = loop {
                let c = BigInt::random_bits(self.bit_len(), rng);
                if c > BigInt::one() && c < *self {
                    break c;
                }
            };

            let mut j = 0;
            let mut z = b.odd_mod_pow(&m, self);
            loop {
                if (j == 0 && z.is_one()) || z == this_minus_one {
                    break;
                }
                if j > 0 && z.is_one() {
                    return false;
                }
                j += 1;
                if j == a {
                    return false;
                }
                z = z.odd_mod_pow(&two, self);
            }
        }
        true
    }

    /// Lucas-Lehmer probable-prime test. Assumes self is positive and odd.
    fn passes_lucas_lehmer(&self) -> bool {
        let this_plus_one = self.add(&BigInt::one());

        // Find the first D in 5, -7, 9, -11, ... with Jacobi(D, self) = -1.
        let mut d = 5i32;
        while jacobi_symbol(d, self) != -1 {
            d = if d < 0 { d.abs() + 2 } else { -(d + 2) };
        }

        // Probable prime iff U_{self+1} = 0 (mod self).
        let u = lucas_lehmer_sequence(d, &this_plus_one, self);
        u.mod_positive(self).is_zero()
    }

    /// A random value of exactly `bit_length` bits that is probably prime
    /// with the default certainty of 100.
    pub fn probable_prime(
        bit_length: usize,
        rng: &mut dyn RngCore,
    ) -> Result<BigInt, BigIntError> {
        BigInt::probable_prime_with_certainty(bit_length, DEFAULT_PRIME_CERTAINTY, rng)
    }

    /// A random value of exactly `bit_length` bits that is probably prime
    /// with probability at least 1 - 1/2^certainty.
    pub fn probable_prime_with_certainty(
        bit_length: usize,
        certainty: u32,
        rng: &mut dyn RngCore,
    ) -> Result<BigInt, BigIntError> {
        if bit_length < 2 {
            return Err(BigIntError::Domain("prime bit length below 2"));
        }
        Ok(if bit_length < SMALL_PRIME_THRESHOLD {
            small_prime(bit_length, certainty, rng)
        } else {
            large_prime(bit_length, certainty, rng)
        })
    }

    /// The smallest probable prime greater than `self`. Never skips a
    /// prime: if `p` is returned there is no prime between `self` and `p`.
    pub fn next_probable_prime(&self) -> Result<BigInt, BigIntError> {
        if self.signum() < 0 {
            return Err(BigIntError::Domain("next prime of a negative start"));
        }

        if self.signum() == 0 || self.is_one() {
            return Ok(BigInt::two());
        }

        let two = BigInt::two();
        let mut result = self.add(&BigInt::one());
        let mut rng = OsRng;

        // Fast path for small numbers.
        if result.bit_len() < SMALL_PRIME_THRESHOLD {
            if !result.test_bit(0) {
                result = result.add(&BigInt::one());
            }
            loop {
                // Cheap pre-test against the product of the primes to 41.
                if result.bit_len() > 6 {
                    let r = mutable::rem_by_u64(result.mag(), SMALL_PRIME_PRODUCT);
                    if divisible_by_small_prime(r) {
                        result = result.add(&two);
                        continue;
                    }
                }

                // Every candidate of bit length 2 or 3 is prime here.
                if result.bit_len() < 4 {
                    return Ok(result);
                }

                if result.prime_to_certainty(DEFAULT_PRIME_CERTAINTY, &mut rng) {
                    return Ok(result);
                }
                result = result.add(&two);
            }
        }

        // Start at the previous even number and sieve forward.
        if result.test_bit(0) {
            result = result.subtract(&BigInt::one());
        }
        let search_len = (result.bit_len() / 20) * 64;
        loop {
            let sieve = BitSieve::new(&result, search_len);
            if let Some(candidate) =
                sieve.retrieve(&result, DEFAULT_PRIME_CERTAINTY, &mut rng)
            {
                return Ok(candidate);
            }
            result = result.add(&BigInt::from_u64(2 * search_len as u64));
        }
    }
}

fn divisible_by_small_prime(r: u64) -> bool {
    r % 3 == 0
        || r % 5 == 0
        || r % 7 == 0
        || r % 11 == 0
        || r % 13 == 0
        || r % 17 == 0
        || r % 19 == 0
        || r % 23 == 0
        || r % 29 == 0
        || r % 31 == 0
        || r % 37 == 0
        || r % 41 == 0
}

/// Random probable prime below 95 bits: draw, pre-test against the small
/// prime product, then run the full test.
fn small_prime(bit_length: usize, certainty: u32, rng: &mut dyn RngCore) -> BigInt {
    let mag_len = (bit_length + 31) >> 5;
    let high_bit = 1u32 << ((bit_length + 31) & 0x1f); // high bit of top limb
    let high_mask = (high_bit << 1).wrapping_sub(1); // bits to keep in top limb

    loop {
        // Construct a candidate with the exact bit length, odd unless the
        // bit length is 2.
        let mut temp = vec![0u32; mag_len];
        for limb in temp.iter_mut() {
            *limb = rng.next_u32();
        }
        temp[0] = (temp[0] & high_mask) | high_bit;
        if bit_length > 2 {
            temp[mag_len - 1] |= 1;
        }

        let p = BigInt::from_mag(temp, 1);

        if bit_length > 6 {
            let r = mutable::rem_by_u64(p.mag(), SMALL_PRIME_PRODUCT);
            if divisible_by_small_prime(r) {
                continue;
            }
        }

        // Every candidate of bit length 2 and 3 is prime by this point.
        if bit_length < 4 {
            return p;
        }

        if p.prime_to_certainty(certainty, rng) {
            return p;
        }
    }
}

/// Random probable prime of 95 bits and up, via a sieve window over odd
/// offsets from an even random base.
fn large_prime(bit_length: usize, certainty: u32, rng: &mut dyn RngCore) -> BigInt {
    let mut p = BigInt::random_bits(bit_length, rng)
        .set_bit(bit_length - 1)
        .clear_bit(0);

    // A sieve length likely to contain the next prime.
    let search_len = (bit_length / 20) * 64;
    let mut sieve = BitSieve::new(&p, search_len);
    let mut candidate = sieve.retrieve(&p, certainty, rng);

    loop {
        if let Some(c) = candidate {
            if c.bit_len() == bit_length {
                return c;
            }
        }
        p = p.add(&BigInt::from_u64(2 * search_len as u64));
        if p.bit_len() != bit_length {
            p = BigInt::random_bits(bit_length, rng).set_bit(bit_length - 1);
        }
        p = p.clear_bit(0);
        sieve = BitSieve::new(&p, search_len);
        candidate = sieve.retrieve(&p, certainty, rng);
    }
}

/// Jacobi(p, n) for odd positive n >= 3.
fn jacobi_symbol(p: i32, n: &BigInt) -> i32 {
    if p == 0 {
        return 0;
    }

    let mut j = 1i32;
    let mut u = n.mag()[n.mag().len() - 1]; // lowest limb

    // Make p positive.
    let mut p = if p < 0 {
        let n8 = u & 7;
        if n8 == 3 || n8 == 7 {
            j = -j; // 3 (011) or 7 (111) mod 8
        }
        (-p) as u32
    } else {
        p as u32
    };

    // Get rid of factors of 2 in p.
    while p & 3 == 0 {
        p >>= 2;
    }
    if p & 1 == 0 {
        p >>= 1;
        if ((u ^ (u >> 1)) & 2) != 0 {
            j = -j; // 3 (011) or 5 (101) mod 8
        }
    }
    if p == 1 {
        return j;
    }
    // Apply quadratic reciprocity.
    if (p & u & 2) != 0 {
        j = -j;
    }
    // Reduce u mod p.
    let mut u = low_limb(&n.mod_positive(&BigInt::from_u32(p)));

    // Now compute Jacobi(u, p), u < p.
    while u != 0 {
        while u & 3 == 0 {
            u >>= 2;
        }
        if u & 1 == 0 {
            u >>= 1;
            if ((p ^ (p >> 1)) & 2) != 0 {
                j = -j;
            }
        }
        if u == 1 {
            return j;
        }
        // Both u and p are odd, so use quadratic reciprocity.
        debug_assert!(u < p);
        std::mem::swap(&mut u, &mut p);
        if (u & p & 2) != 0 {
            j = -j;
        }
        u %= p;
    }
    0
}

fn low_limb(v: &BigInt) -> u32 {
    if v.is_zero() {
        0
    } else {
        v.mag()[v.mag().len() - 1]
    }
}

/// The (k)-th term U_k of the Lucas U-sequence for parameter D = z, reduced
/// mod n. The half-steps add or subtract n before shifting when the
/// intermediate is odd.
fn lucas_lehmer_sequence(z: i32, k: &BigInt, n: &BigInt) -> BigInt {
    let d = BigInt::from_i64(z as i64);
    let mut u = BigInt::one();
    let mut v = BigInt::one();

    for i in (0..=k.bit_len() - 2).rev() {
        let u2 = u.multiply(&v).mod_positive(n);

        let mut v2 = v
            .square()
            .add(&d.multiply(&u.square()))
            .mod_positive(n);
        if v2.test_bit(0) {
            v2 = v2.subtract(n);
        }
        v2 = v2.shr(1);

        u = u2;
        v = v2;
        if k.test_bit(i) {
            let mut u2 = u.add(&v).mod_positive(n);
            if u2.test_bit(0) {
                u2 = u2.subtract(n);
            }
            u2 = u2.shr(1);

            let mut v2 = v.add(&d.multiply(&u)).mod_positive(n);
            if v2.test_bit(0) {
                v2 = v2.subtract(n);
            }
            v2 = v2.shr(1);

            u = u2;
            v = v2;
        }
    }
    u
}
