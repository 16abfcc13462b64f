//! Modular arithmetic: reduction, exponentiation and inverses.
//!
//! Odd moduli use Montgomery-form sliding-window exponentiation; even moduli
//! are split into an odd part and a power of two and recombined by CRT.
//! Montgomery scratch buffers hold secret-derived material and are zeroized
//! before they are dropped.

use std::cmp::Ordering;

use bigmath_types::BigIntError;
use zeroize::Zeroize;

use crate::bigint::BigInt;
use crate::magnitude::{mag_bit_len, shift_left_mag, Limb};
use crate::multiply::{add_one, mul_add, multiply_to_len, square_to_len};
use crate::mutable;

/// Exponent bit lengths at which the sliding window widens by one bit.
static BN_EXP_MOD_THRESH_TABLE: [usize; 7] =
    [7, 25, 81, 241, 673, 1793, usize::MAX];

impl BigInt {
    /// `self mod m`, always in `[0, m)`. The modulus must be positive.
    pub fn modulo(&self, m: &BigInt) -> Result<BigInt, BigIntError> {
        if m.signum <= 0 {
            return Err(BigIntError::Domain("modulus not positive"));
        }
        Ok(self.mod_positive(m))
    }

    /// `self mod m` for a modulus already known to be positive.
    pub(crate) fn mod_positive(&self, m: &BigInt) -> BigInt {
        let (_, result) = self.div_rem_unchecked(m);
        if result.signum >= 0 {
            result
        } else {
            result.add(m)
        }
    }

    /// `self^exponent mod m`. The modulus must be positive; a negative
    /// exponent is permitted when the base is invertible mod `m`.
    pub fn mod_pow(&self, exponent: &BigInt, m: &BigInt) -> Result<BigInt, BigIntError> {
        if m.signum <= 0 {
            return Err(BigIntError::Domain("modulus not positive"));
        }

        // Trivial cases.
        if exponent.signum == 0 {
            return Ok(if m.is_one() { BigInt::zero() } else { BigInt::one() });
        }
        if self.is_one() {
            return Ok(if m.is_one() { BigInt::zero() } else { BigInt::one() });
        }
        if self.is_zero() && exponent.signum >= 0 {
            return Ok(BigInt::zero());
        }
        if *self == BigInt::one().negate() && !exponent.test_bit(0) {
            return Ok(if m.is_one() { BigInt::zero() } else { BigInt::one() });
        }

        let invert_result = exponent.signum < 0;
        let exponent = if invert_result {
            exponent.negate()
        } else {
            exponent.clone()
        };

        let base = if self.signum < 0 || self.compare_magnitude(m) != Ordering::Less {
            self.modulo(m)?
        } else {
            self.clone()
        };

        let result = if m.is_odd() {
            base.odd_mod_pow(&exponent, m)
        } else {
            // Even modulus: tear into an odd part m1 and a power of two m2,
            // exponentiate mod each, and recombine with CRT.
            let p = m.lowest_set_bit().unwrap_or(0);

            let m1 = m.shr(p); // m / 2^p
            let m2 = BigInt::one().shl(p); // 2^p

            let base2 = if self.signum < 0 || self.compare_magnitude(&m1) != Ordering::Less
            {
                self.modulo(&m1)?
            } else {
                self.clone()
            };

            let a1 = if m1.is_one() {
                BigInt::zero()
            } else {
                base2.odd_mod_pow(&exponent, &m1)
            };
            let a2 = base.mod_pow2(&exponent, p);

            let y1 = m2.mod_inverse(&m1)?;
            let y2 = m1.mod_inverse(&m2)?;

            a1.multiply(&m2)
                .multiply(&y1)
                .add(&a2.multiply(&m1).multiply(&y2))
                .modulo(m)?
        };

        if invert_result {
            result.mod_inverse(m)
        } else {
            Ok(result)
        }
    }

    /// Montgomery sliding-window exponentiation. Assumes `z` is odd and
    /// `self` is reduced mod `z`.
    pub(crate) fn odd_mod_pow(&self, y: &BigInt, z: &BigInt) -> BigInt {
        // Special case for exponent of one.
        if y.is_one() {
            return self.clone();
        }
        // Special case for base of zero.
        if self.signum == 0 {
            return BigInt::zero();
        }

        let exp = &y.mag;
        let modv = &z.mag;
        let mod_len = modv.len();

        // Select the window size from the exponent length; 65537 gets the
        // minimum window.
        let mut wbits = 0usize;
        let total_ebits = mag_bit_len(exp);
        if !(total_ebits == 17 && exp[0] == 65537) {
            while total_ebits > BN_EXP_MOD_THRESH_TABLE[wbits] {
                wbits += 1;
            }
        }
        let tblmask = 1usize << wbits;

        // inv = -m^-1 mod 2^32, from the least significant modulus limb.
        let inv = inverse_mod_32(modv[mod_len - 1]).wrapping_neg();

        // Convert the base to Montgomery form: base * 2^(32*modLen) mod m.
        let a_shifted = shift_left_mag(&self.mag, mod_len << 5);
        let (_, t0) = mutable::div_rem_knuth(&a_shifted, modv);
        let mut table: Vec<Vec<Limb>> = Vec::with_capacity(tblmask);
        table.push(left_pad(&t0, mod_len));

        // The Montgomery square of the base seeds the odd-power table and
        // doubles as the initial accumulator for top patterns of the form
        // 10...0 (saving one squaring).
        let mut mont_sq = square_to_len(&table[0]);
        mont_reduce(&mut mont_sq, modv, mod_len, inv);
        mont_sq.truncate(mod_len);

        for i in 1..tblmask {
            let mut prod = multiply_to_len(&mont_sq, &table[i - 1]);
            mont_reduce(&mut prod, modv, mod_len, inv);
            prod.truncate(mod_len);
            table.push(prod);
        }

        // Preload the lookahead window with the top wbits+1 exponent bits.
        let mut ebits = total_ebits;
        let mut bitpos = 1u32 << ((ebits - 1) & 31);
        let mut buf = 0usize;
        let mut elen = exp.len();
        let mut e_index = 0usize;
        for _ in 0..=wbits {
            buf = (buf << 1) | usize::from(exp[e_index] & bitpos != 0);
            bitpos >>= 1;
            if bitpos == 0 {
                e_index += 1;
                bitpos = 1 << 31;
                elen -= 1;
            }
        }

        // First window, hoisted out of the main loop.
        ebits -= 1;
        let mut isone = true;
        let mut multpos = ebits as isize - wbits as isize;
        while buf & 1 == 0 {
            buf >>= 1;
            multpos += 1;
        }
        let mut mult = table[buf >> 1].clone();
        buf = 0;
        let mut acc = mont_sq.clone();
        if multpos == ebits as isize {
            isone = false;
        }

        // The main loop: square per exponent bit, multiply when the
        // scheduled window position is reached.
        loop {
            ebits -= 1;
            buf <<= 1;

            if elen != 0 {
                buf |= usize::from(exp[e_index] & bitpos != 0);
                bitpos >>= 1;
                if bitpos == 0 {
                    e_index += 1;
                    bitpos = 1 << 31;
                    elen -= 1;
                }
            }

            // Examine the window for pending multiplies.
            if buf & tblmask != 0 {
                multpos = ebits as isize - wbits as isize;
                while buf & 1 == 0 {
                    buf >>= 1;
                    multpos += 1;
                }
                mult = table[buf >> 1].clone();
                buf = 0;
            }

            // Perform a multiply scheduled for this position.
            if ebits as isize == multpos {
                if isone {
                    acc = mult.clone();
                    isone = false;
                } else {
                    let mut prod = multiply_to_len(&acc, &mult);
                    mont_reduce(&mut prod, modv, mod_len, inv);
                    prod.truncate(mod_len);
                    acc.zeroize();
                    acc = prod;
                }
            }

            if ebits == 0 {
                break;
            }

            // Square the accumulator.
            if !isone {
                let mut sq = square_to_len(&acc);
                mont_reduce(&mut sq, modv, mod_len, inv);
                sq.truncate(mod_len);
                acc.zeroize();
                acc = sq;
            }
        }

        // Convert the result out of Montgomery form.
        let mut t2 = vec![0u32; 2 * mod_len];
        t2[mod_len..].copy_from_slice(&acc);
        mont_reduce(&mut t2, modv, mod_len, inv);
        let result = t2[..mod_len].to_vec();

        t2.zeroize();
        acc.zeroize();
        mont_sq.zeroize();
        mult.zeroize();
        for entry in table.iter_mut() {
            entry.zeroize();
        }

        BigInt::from_stripped_mag(result, 1)
    }

    /// `self^exponent mod 2^p` by repeated squaring with a mask.
    fn mod_pow2(&self, exponent: &BigInt, p: usize) -> BigInt {
        let mut result = BigInt::one();
        let mut base_to_pow2 = self.mod2(p);
        let mut exp_offset = 0usize;

        let mut limit = exponent.bit_len();
        if self.test_bit(0) {
            // For odd bases the order divides 2^(p-1).
            limit = limit.min(p.saturating_sub(1));
        }

        while exp_offset < limit {
            if exponent.test_bit(exp_offset) {
                result = result.multiply(&base_to_pow2).mod2(p);
            }
            exp_offset += 1;
            if exp_offset < limit {
                base_to_pow2 = base_to_pow2.square().mod2(p);
            }
        }

        result
    }

    /// `self mod 2^p` for non-negative `self` and positive `p`.
    fn mod2(&self, p: usize) -> BigInt {
        if self.bit_len() <= p {
            return self.clone();
        }
        let num_limbs = (p + 31) >> 5;
        let mut mag = self.mag[self.mag.len() - num_limbs..].to_vec();
        let excess = (num_limbs << 5) - p;
        mag[0] &= ((1u64 << (32 - excess)) - 1) as u32;
        BigInt::from_stripped_mag(mag, 1)
    }

    /// `self^-1 mod m`, or `NotInvertible` when gcd(self, m) != 1.
    pub fn mod_inverse(&self, m: &BigInt) -> Result<BigInt, BigIntError> {
        if m.signum != 1 {
            return Err(BigIntError::Domain("modulus not positive"));
        }
        if m.is_one() {
            return Ok(BigInt::zero());
        }

        let mod_val = if self.signum < 0 || self.compare_magnitude(m) != Ordering::Less {
            self.modulo(m)?
        } else {
            self.clone()
        };
        if mod_val.is_one() {
            return Ok(BigInt::one());
        }
        if mod_val.is_zero() {
            return Err(BigIntError::NotInvertible);
        }

        // Extended Euclid, tracking only the Bezout coefficient of self.
        let mut old_r = mod_val;
        let mut r = m.clone();
        let mut old_s = BigInt::one();
        let mut s = BigInt::zero();

        while !r.is_zero() {
            let (quotient, remainder) = old_r.div_rem(&r)?;
            old_r = r;
            r = remainder;

            let new_s = old_s.subtract(&quotient.multiply(&s));
            old_s = s;
            s = new_s;
        }

        if !old_r.is_one() {
            return Err(BigIntError::NotInvertible);
        }

        if old_s.signum() < 0 {
            old_s = old_s.add(m);
        }
        old_s.modulo(m)
    }

    /// Greatest common divisor of the absolute values; gcd(0, 0) = 0.
    pub fn gcd(&self, val: &BigInt) -> BigInt {
        if val.signum == 0 {
            return self.abs();
        }
        if self.signum == 0 {
            return val.abs();
        }
        BigInt::from_mag(mutable::gcd_mag(&self.mag, &val.mag), 1)
    }
}

/// Pads a magnitude with leading zeros to `len` limbs.
fn left_pad(mag: &[Limb], len: usize) -> Vec<Limb> {
    let mut out = vec![0u32; len];
    out[len - mag.len()..].copy_from_slice(mag);
    out
}

/// `v^-1 mod 2^32` for odd `v`, by Newton iteration: each step doubles the
/// number of correct low bits, and v itself is correct to three.
pub(crate) fn inverse_mod_32(v: Limb) -> Limb {
    let mut t = v;
    t = t.wrapping_mul(2u32.wrapping_sub(v.wrapping_mul(t)));
    t = t.wrapping_mul(2u32.wrapping_sub(v.wrapping_mul(t)));
    t = t.wrapping_mul(2u32.wrapping_sub(v.wrapping_mul(t)));
    t = t.wrapping_mul(2u32.wrapping_sub(v.wrapping_mul(t)));
    t
}

/// Montgomery reduction: reduces `n` (2*mlen limbs) modulo `mod` and divides
/// by 2^(32*mlen). The result lands in the first `mlen` limbs.
pub(crate) fn mont_reduce(n: &mut [Limb], modv: &[Limb], mlen: usize, inv: Limb) {
    let mut c: i64 = 0;
    let mut offset = 0usize;
    for _ in 0..mlen {
        let n_end = n[n.len() - 1 - offset];
        let carry = mul_add(n, modv, offset, mlen, inv.wrapping_mul(n_end));
        c += add_one(n, offset, mlen, carry) as i64;
        offset += 1;
    }

    while c > 0 {
        c += sub_n(n, modv, mlen) as i64;
    }
    while cmp_to_len(n, modv, mlen) != Ordering::Less {
        sub_n(n, modv, mlen);
    }
}

/// Subtracts `b` from the first `len` limbs of `a`, returning the borrow
/// (-1 or 0).
fn sub_n(a: &mut [Limb], b: &[Limb], len: usize) -> i32 {
    let mut sum: i64 = 0;
    for i in (0..len).rev() {
        sum = a[i] as i64 - b[i] as i64 + (sum >> 32);
        a[i] = sum as Limb;
    }
    (sum >> 32) as i32
}

fn cmp_to_len(a: &[Limb], b: &[Limb], len: usize) -> Ordering {
    for i in 0..len {
        if a[i] != b[i] {
            return a[i].cmp(&b[i]);
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bi(v: i64) -> BigInt {
        BigInt::from_i64(v)
    }

    #[test]
    fn test_modulo_always_non_negative() {
        let m = bi(7);
        assert_eq!(bi(10).modulo(&m).unwrap(), bi(3));
        assert_eq!(bi(-10).modulo(&m).unwrap(), bi(4));
        assert_eq!(bi(0).modulo(&m).unwrap(), bi(0));
        assert!(matches!(
            bi(5).modulo(&bi(0)),
            Err(BigIntError::Domain(_))
        ));
        assert!(matches!(
            bi(5).modulo(&bi(-3)),
            Err(BigIntError::Domain(_))
        ));
    }

    #[test]
    fn test_inverse_mod_32() {
        for v in [1u32, 3, 5, 17, 0xFFFF_FFFF, 0x1234_5679] {
            let inv = inverse_mod_32(v);
            assert_eq!(v.wrapping_mul(inv), 1, "v={v:#x}");
        }
    }

    #[test]
    fn test_mod_pow_small_odd_modulus() {
        // 4^13 mod 497 = 445
        assert_eq!(bi(4).mod_pow(&bi(13), &bi(497)).unwrap(), bi(445));
        // Fermat: a^(p-1) = 1 mod p for prime p
        let p = bi(1_000_003);
        for a in [2i64, 3, 65537, 999_999] {
            assert_eq!(
                bi(a).mod_pow(&p.subtract(&BigInt::one()), &p).unwrap(),
                BigInt::one(),
                "a={a}"
            );
        }
    }

    #[test]
    fn test_mod_pow_trivial_cases() {
        assert_eq!(bi(5).mod_pow(&bi(0), &bi(9)).unwrap(), BigInt::one());
        assert_eq!(bi(5).mod_pow(&bi(0), &BigInt::one()).unwrap(), BigInt::zero());
        assert_eq!(bi(1).mod_pow(&bi(100), &bi(9)).unwrap(), BigInt::one());
        assert_eq!(bi(0).mod_pow(&bi(5), &bi(9)).unwrap(), BigInt::zero());
        assert_eq!(bi(-1).mod_pow(&bi(4), &bi(9)).unwrap(), BigInt::one());
        assert_eq!(bi(-1).mod_pow(&bi(3), &bi(9)).unwrap(), bi(8));
    }

    #[test]
    fn test_mod_pow_matches_pow_mod() {
        for a in [-9i64, -2, 2, 3, 10, 12345] {
            for e in [1u32, 2, 3, 7, 16, 17] {
                for m in [3i64, 4, 16, 97, 1 << 20, (1 << 20) - 1] {
                    let expected = bi(a).pow(e).modulo(&bi(m)).unwrap();
                    let got = bi(a).mod_pow(&BigInt::from_u64(e as u64), &bi(m)).unwrap();
                    assert_eq!(got, expected, "a={a} e={e} m={m}");
                }
            }
        }
    }

    #[test]
    fn test_mod_pow_even_modulus_crt() {
        // 2^10 mod 12 = 4: base shares a factor with the modulus.
        assert_eq!(bi(2).mod_pow(&bi(10), &bi(12)).unwrap(), bi(4));
        // Large even modulus.
        let m = bi(1i64 << 40).multiply(&bi(1_000_003));
        let got = bi(123_456).mod_pow(&bi(5), &m).unwrap();
        let expected = bi(123_456).pow(5).modulo(&m).unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_mod_pow_negative_exponent() {
        // 3^-1 mod 7 = 5; 3^-2 mod 7 = 25 mod 7 = 4
        assert_eq!(bi(3).mod_pow(&bi(-1), &bi(7)).unwrap(), bi(5));
        assert_eq!(bi(3).mod_pow(&bi(-2), &bi(7)).unwrap(), bi(4));
        assert!(bi(6).mod_pow(&bi(-1), &bi(9)).is_err());
    }

    #[test]
    fn test_mod_pow_65537_window() {
        // The RSA exponent takes the dedicated window-1 path. Check against
        // Fermat: 42^65537 = 42^(65537 mod 96) mod 97 = 42^65 mod 97.
        let m = bi(97);
        let got = bi(42).mod_pow(&bi(65537), &m).unwrap();
        let expected = bi(42).pow(65).modulo(&m).unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_mod_inverse() {
        assert_eq!(bi(3).mod_inverse(&bi(7)).unwrap(), bi(5));
        let inv = bi(17).mod_inverse(&bi(97)).unwrap();
        assert_eq!(bi(17).multiply(&inv).modulo(&bi(97)).unwrap(), BigInt::one());
        // Negative values are reduced first.
        let inv = bi(-5).mod_inverse(&bi(11)).unwrap();
        assert_eq!(
            bi(-5).multiply(&inv).modulo(&bi(11)).unwrap(),
            BigInt::one()
        );
        assert!(matches!(
            bi(6).mod_inverse(&bi(9)),
            Err(BigIntError::NotInvertible)
        ));
        assert_eq!(bi(5).mod_inverse(&BigInt::one()).unwrap(), BigInt::zero());
    }

    #[test]
    fn test_gcd() {
        assert_eq!(bi(12).gcd(&bi(8)), bi(4));
        assert_eq!(bi(-12).gcd(&bi(8)), bi(4));
        assert_eq!(bi(12).gcd(&bi(-8)), bi(4));
        assert_eq!(bi(0).gcd(&bi(0)), bi(0));
        assert_eq!(bi(0).gcd(&bi(-5)), bi(5));
        assert_eq!(bi(7).gcd(&bi(0)), bi(7));
    }

    #[test]
    fn test_mont_reduce_round_trip() {
        // Montgomery-reduce (x * R) to recover x for a handful of values.
        let m = [0x8000_0001u32, 0x0000_000B]; // odd two-limb modulus
        let inv = inverse_mod_32(m[1]).wrapping_neg();
        for x in [1u64, 2, 0xFFFF, 0x1_0000_0001] {
            let x_mag = [(x >> 32) as u32, x as u32];
            // n = x * 2^64, length 4
            let mut n = [x_mag[0], x_mag[1], 0, 0];
            mont_reduce(&mut n, &m, 2, inv);
            let got = ((n[0] as u64) << 32) | n[1] as u64;
            let modulus = ((m[0] as u64) << 32) | m[1] as u64;
            assert_eq!(got, x % modulus, "x={x}");
        }
    }
}
