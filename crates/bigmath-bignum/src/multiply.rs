//! Multiplication and squaring kernels.
//!
//! Dispatch is by operand length in limbs: grade-school below 50, Karatsuba
//! below 75, then 3-way Toom-Cook until the Schönhage-Strassen crossover
//! table says otherwise. The crossover tables are part of the contract; see
//! `ssmul.rs` for the transform itself and the `algorithms` module for the
//! forced entry points used in differential tests.

use crate::bigint::BigInt;
use crate::magnitude::{mul_by_limb, primitive_left_shift, shift_left_mag, Limb};
use crate::ssmul;

/// Limb-count threshold below which grade-school multiplication is used.
pub(crate) const KARATSUBA_THRESHOLD: usize = 50;
/// Limb-count threshold below which Karatsuba multiplication is used.
pub(crate) const TOOM_COOK_THRESHOLD: usize = 75;
/// Limb-count threshold below which grade-school squaring is used.
pub(crate) const KARATSUBA_SQUARE_THRESHOLD: usize = 90;
/// Limb-count threshold below which Karatsuba squaring is used.
pub(crate) const TOOM_COOK_SQUARE_THRESHOLD: usize = 140;

impl BigInt {
    /// `self * val`.
    pub fn multiply(&self, val: &BigInt) -> BigInt {
        if val.signum == 0 || self.signum == 0 {
            return BigInt::zero();
        }

        let xlen = self.mag.len();
        let ylen = val.mag.len();

        if xlen < KARATSUBA_THRESHOLD || ylen < KARATSUBA_THRESHOLD {
            multiply_schoolbook(self, val)
        } else if xlen < TOOM_COOK_THRESHOLD && ylen < TOOM_COOK_THRESHOLD {
            multiply_karatsuba(self, val)
        } else if !should_multiply_ss(xlen * 32) || !should_multiply_ss(ylen * 32) {
            multiply_toom_cook3(self, val)
        } else {
            ssmul::multiply_ss(self, val)
        }
    }

    /// `self * self`, using the squaring variant of each kernel.
    pub fn square(&self) -> BigInt {
        if self.signum == 0 {
            return BigInt::zero();
        }
        let len = self.mag.len();
        if len < KARATSUBA_SQUARE_THRESHOLD {
            square_schoolbook(self)
        } else if len < TOOM_COOK_SQUARE_THRESHOLD {
            square_karatsuba(self)
        } else if !should_square_ss(len * 32) {
            square_toom_cook3(self)
        } else {
            ssmul::square_ss(self)
        }
    }

    /// `self` raised to `exponent`. Powers of two in the base are factored
    /// out and re-applied as shifts.
    pub fn pow(&self, exponent: u32) -> BigInt {
        if self.signum == 0 {
            return if exponent == 0 {
                BigInt::one()
            } else {
                BigInt::zero()
            };
        }

        let mut part_to_square = self.abs();
        let powers_of_two = part_to_square.lowest_set_bit().unwrap_or(0);
        let negative_result = self.signum < 0 && exponent & 1 == 1;

        if powers_of_two > 0 {
            part_to_square = part_to_square.shr(powers_of_two);
        }
        let remaining_bits = part_to_square.bit_len();
        if remaining_bits == 1 {
            // Nothing left but +/- 1.
            let shifted = BigInt::one().shl(powers_of_two as usize * exponent as usize);
            return if negative_result {
                shifted.negate()
            } else {
                shifted
            };
        }

        let scale_factor = remaining_bits as u64 * exponent as u64;
        if part_to_square.mag.len() == 1 && scale_factor <= 62 {
            // Small number algorithm: everything fits into a u64.
            let mut result: u64 = 1;
            let mut base = part_to_square.mag[0] as u64;
            let mut working = exponent;
            while working != 0 {
                if working & 1 == 1 {
                    result *= base;
                }
                working >>= 1;
                if working != 0 {
                    base *= base;
                }
            }
            let answer = BigInt::from_u64(result)
                .shl(powers_of_two * exponent as usize);
            if negative_result {
                answer.negate()
            } else {
                answer
            }
        } else {
            // Repeated squaring with the large-number kernels.
            let mut answer = BigInt::one();
            let mut working = exponent;
            while working != 0 {
                if working & 1 == 1 {
                    answer = answer.multiply(&part_to_square);
                }
                working >>= 1;
                if working != 0 {
                    part_to_square = part_to_square.square();
                }
            }
            if powers_of_two > 0 {
                answer = answer.shl(powers_of_two * exponent as usize);
            }
            if negative_result {
                answer.negate()
            } else {
                answer
            }
        }
    }

    /// Toom-Cook slice `slice` (0 = most significant) of size `lower_size`
    /// limbs (`upper_size` for slice 0), aligned against `full_size`.
    /// Slices are non-negative; the product's sign is fixed up afterwards.
    fn get_toom_slice(
        &self,
        lower_size: usize,
        upper_size: usize,
        slice: usize,
        full_size: usize,
    ) -> BigInt {
        let len = self.mag.len() as isize;
        let offset = full_size as isize - len;

        let (mut start, end): (isize, isize);
        if slice == 0 {
            start = -offset;
            end = upper_size as isize - 1 - offset;
        } else {
            start = upper_size as isize + (slice as isize - 1) * lower_size as isize - offset;
            end = start + lower_size as isize - 1;
        }

        if start < 0 {
            start = 0;
        }
        if end < 0 {
            return BigInt::zero();
        }
        let slice_size = end - start + 1;
        if slice_size <= 0 {
            return BigInt::zero();
        }
        if start == 0 && slice_size >= len {
            return self.abs();
        }

        let slice = self.mag[start as usize..=(end as usize)].to_vec();
        BigInt::from_stripped_mag(slice, 1)
    }

    /// Exact division by 3, via multiplication by the inverse of 3 mod 2^32.
    /// Results are undefined if the value is not divisible by 3.
    fn exact_divide_by_3(&self) -> BigInt {
        let len = self.mag.len();
        let mut result = vec![0u32; len];
        let mut borrow: u64 = 0;
        for i in (0..len).rev() {
            let x = self.mag[i] as u64;
            let w = x.wrapping_sub(borrow);
            borrow = if borrow > x { 1 } else { 0 };

            // 0xAAAAAAAB is the inverse of 3 mod 2^32, so this divides by 3
            // in a single multiply per limb.
            let q = w.wrapping_mul(0xAAAA_AAAB) & 0xFFFF_FFFF;
            result[i] = q as Limb;

            if q >= 0x5555_5556 {
                borrow += 1;
                if q >= 0xAAAA_AAAB {
                    borrow += 1;
                }
            }
        }
        BigInt::from_stripped_mag(result, self.signum)
    }
}

/// Grade-school product, with a single-limb fast path.
pub(crate) fn multiply_schoolbook(x: &BigInt, y: &BigInt) -> BigInt {
    if x.signum == 0 || y.signum == 0 {
        return BigInt::zero();
    }
    let result_sign = if x.signum == y.signum { 1 } else { -1 };
    if y.mag.len() == 1 {
        return multiply_by_limb(&x.mag, y.mag[0], result_sign);
    }
    if x.mag.len() == 1 {
        return multiply_by_limb(&y.mag, x.mag[0], result_sign);
    }
    let result = multiply_to_len(&x.mag, &y.mag);
    BigInt::from_stripped_mag(result, result_sign)
}

/// Multiply a magnitude by a single limb; a power-of-two limb becomes a
/// shift.
fn multiply_by_limb(x: &[Limb], y: Limb, sign: i32) -> BigInt {
    if y.count_ones() == 1 {
        return BigInt::from_mag(shift_left_mag(x, y.trailing_zeros() as usize), sign);
    }
    BigInt::from_mag(mul_by_limb(x, y), sign)
}

/// O(n*m) product of two magnitudes, most significant limb first.
/// The result has `x.len() + y.len()` limbs before stripping.
pub(crate) fn multiply_to_len(x: &[Limb], y: &[Limb]) -> Vec<Limb> {
    let xlen = x.len();
    let ylen = y.len();
    let xstart = xlen - 1;
    let ystart = ylen - 1;
    let mut z = vec![0u32; xlen + ylen];

    let mut carry: u64 = 0;
    let mut k = ystart + 1 + xstart;
    for j in (0..=ystart).rev() {
        let product = y[j] as u64 * x[xstart] as u64 + carry;
        z[k] = product as Limb;
        carry = product >> 32;
        k = k.wrapping_sub(1);
    }
    z[xstart] = carry as Limb;

    for i in (0..xstart).rev() {
        carry = 0;
        let mut k = ystart + 1 + i;
        for j in (0..=ystart).rev() {
            let product = y[j] as u64 * x[i] as u64 + z[k] as u64 + carry;
            z[k] = product as Limb;
            carry = product >> 32;
            k = k.wrapping_sub(1);
        }
        z[i] = carry as Limb;
    }
    z
}

/// Karatsuba product: three half-size multiplies instead of four.
pub(crate) fn multiply_karatsuba(x: &BigInt, y: &BigInt) -> BigInt {
    let xlen = x.mag.len();
    let ylen = y.mag.len();

    // The number of limbs in each half of the number.
    let half = (xlen.max(ylen) + 1) / 2;

    let xl = x.get_lower(half);
    let xh = x.get_upper(half);
    let yl = y.get_lower(half);
    let yh = y.get_upper(half);

    let p1 = xh.multiply(&yh);
    let p2 = xl.multiply(&yl);
    let p3 = xh.add(&xl).multiply(&yh.add(&yl));

    // result = p1 * 2^(64*half) + (p3 - p1 - p2) * 2^(32*half) + p2
    let result = p1
        .shl(32 * half)
        .add(&p3.subtract(&p1).subtract(&p2))
        .shl(32 * half)
        .add(&p2);

    if x.signum != y.signum {
        result.negate()
    } else {
        result
    }
}

/// 3-way Toom-Cook product with Bodrato's evaluation/interpolation scheme:
/// five point multiplications, two exact halvings and one exact division
/// by 3.
pub(crate) fn multiply_toom_cook3(a: &BigInt, b: &BigInt) -> BigInt {
    let alen = a.mag.len();
    let blen = b.mag.len();
    let largest = alen.max(blen);

    // k is the size (in limbs) of the lower-order slices.
    let k = (largest + 2) / 3;
    // r is the size (in limbs) of the highest-order slice.
    let r = largest - 2 * k;

    let a2 = a.get_toom_slice(k, r, 0, largest);
    let a1 = a.get_toom_slice(k, r, 1, largest);
    let a0 = a.get_toom_slice(k, r, 2, largest);
    let b2 = b.get_toom_slice(k, r, 0, largest);
    let b1 = b.get_toom_slice(k, r, 1, largest);
    let b0 = b.get_toom_slice(k, r, 2, largest);

    let v0 = a0.multiply(&b0);
    let mut da1 = a2.add(&a0);
    let mut db1 = b2.add(&b0);
    let vm1 = da1.subtract(&a1).multiply(&db1.subtract(&b1));
    da1 = da1.add(&a1);
    db1 = db1.add(&b1);
    let v1 = da1.multiply(&db1);
    let v2 = da1
        .add(&a2)
        .shl(1)
        .subtract(&a0)
        .multiply(&db1.add(&b2).shl(1).subtract(&b0));
    let vinf = a2.multiply(&b2);

    // The interpolation needs two exact divisions by 2 (right shifts) and
    // one exact division by 3.
    let mut t2 = v2.subtract(&vm1).exact_divide_by_3();
    let mut tm1 = v1.subtract(&vm1).shr(1);
    let mut t1 = v1.subtract(&v0);
    t2 = t2.subtract(&t1).shr(1);
    t1 = t1.subtract(&tm1).subtract(&vinf);
    t2 = t2.subtract(&vinf.shl(1));
    tm1 = tm1.subtract(&t2);

    // Number of bits to shift left per slice position.
    let ss = k * 32;

    let result = vinf
        .shl(ss)
        .add(&t2)
        .shl(ss)
        .add(&t1)
        .shl(ss)
        .add(&tm1)
        .shl(ss)
        .add(&v0);

    if a.signum != b.signum {
        result.negate()
    } else {
        result
    }
}

/// Grade-school square. The off-diagonal partial products mirror across the
/// diagonal, so the work is halved: accumulate the diagonal squares shifted
/// right one bit, add the off-diagonal sums, shift back and restore the low
/// bit.
pub(crate) fn square_schoolbook(x: &BigInt) -> BigInt {
    if x.signum == 0 {
        return BigInt::zero();
    }
    let z = square_to_len(&x.mag);
    BigInt::from_stripped_mag(z, 1)
}

pub(crate) fn square_to_len(x: &[Limb]) -> Vec<Limb> {
    let len = x.len();
    let zlen = len << 1;
    let mut z = vec![0u32; zlen];

    // Store the squares, right shifted one bit.
    let mut last_product_low: Limb = 0;
    let mut i = 0;
    for &limb in x.iter() {
        let piece = limb as u64;
        let product = piece * piece;
        z[i] = (last_product_low << 31) | ((product >> 33) as Limb);
        z[i + 1] = (product >> 1) as Limb;
        last_product_low = product as Limb;
        i += 2;
    }

    // Add in off-diagonal sums.
    let mut offset = 1;
    for i in (1..=len).rev() {
        let t = x[i - 1];
        let t = mul_add(&mut z, x, offset, i - 1, t);
        add_one(&mut z, offset - 1, i, t);
        offset += 2;
    }

    // Shift back up and set the low bit.
    primitive_left_shift(&mut z, zlen, 1);
    z[zlen - 1] |= x[len - 1] & 1;
    z
}

/// Multiply the first `len` limbs of `inn` by `k` and add into `out` ending
/// `offset` limbs from the right edge; returns the carry.
pub(crate) fn mul_add(out: &mut [Limb], inn: &[Limb], offset: usize, len: usize, k: Limb) -> Limb {
    let k64 = k as u64;
    let mut carry: u64 = 0;
    let mut pos = out.len() - offset - 1;
    for j in (0..len).rev() {
        let product = inn[j] as u64 * k64 + out[pos] as u64 + carry;
        out[pos] = product as Limb;
        pos = pos.wrapping_sub(1);
        carry = product >> 32;
    }
    carry as Limb
}

/// Add `carry` into `a` at `mlen + offset` limbs from the right edge;
/// returns the carry out of the number.
pub(crate) fn add_one(a: &mut [Limb], offset: usize, mlen: usize, carry: Limb) -> Limb {
    let mut pos = a.len() - 1 - mlen - offset;
    let t = a[pos] as u64 + carry as u64;
    a[pos] = t as Limb;
    if t >> 32 == 0 {
        return 0;
    }
    let mut mlen = mlen;
    while mlen > 0 {
        mlen -= 1;
        if pos == 0 {
            // Carry out of number.
            return 1;
        }
        pos -= 1;
        a[pos] = a[pos].wrapping_add(1);
        if a[pos] != 0 {
            return 0;
        }
    }
    1
}

/// Karatsuba squaring.
pub(crate) fn square_karatsuba(x: &BigInt) -> BigInt {
    let half = (x.mag.len() + 1) / 2;

    let xl = x.get_lower(half);
    let xh = x.get_upper(half);

    let xhs = xh.square();
    let xls = xl.square();

    // xh^2 << 64 + ((xl+xh)^2 - (xh^2 + xl^2)) << 32 + xl^2, in half-limbs.
    xhs.shl(half * 32)
        .add(&xl.add(&xh).square().subtract(&xhs.add(&xls)))
        .shl(half * 32)
        .add(&xls)
}

/// 3-way Toom-Cook squaring.
pub(crate) fn square_toom_cook3(a: &BigInt) -> BigInt {
    let len = a.mag.len();
    let k = (len + 2) / 3;
    let r = len - 2 * k;

    let a2 = a.get_toom_slice(k, r, 0, len);
    let a1 = a.get_toom_slice(k, r, 1, len);
    let a0 = a.get_toom_slice(k, r, 2, len);

    let v0 = a0.square();
    let mut da1 = a2.add(&a0);
    let vm1 = da1.subtract(&a1).square();
    da1 = da1.add(&a1);
    let v1 = da1.square();
    let vinf = a2.square();
    let v2 = da1.add(&a2).shl(1).subtract(&a0).square();

    let mut t2 = v2.subtract(&vm1).exact_divide_by_3();
    let mut tm1 = v1.subtract(&vm1).shr(1);
    let mut t1 = v1.subtract(&v0);
    t2 = t2.subtract(&t1).shr(1);
    t1 = t1.subtract(&tm1).subtract(&vinf);
    t2 = t2.subtract(&vinf.shl(1));
    tm1 = tm1.subtract(&t2);

    let ss = k * 32;
    vinf.shl(ss)
        .add(&t2)
        .shl(ss)
        .add(&t1)
        .shl(ss)
        .add(&tm1)
        .shl(ss)
        .add(&v0)
}

/// Whether Schönhage-Strassen multiplication beats Toom-Cook at the given
/// factor bit length. The breakpoints are piecewise and deliberate: the
/// two methods trade places several times before SS wins for good.
pub(crate) fn should_multiply_ss(bit_length: usize) -> bool {
    if bit_length < 247_000 {
        return false;
    }
    if bit_length < 262_144 {
        // 2^18
        return true;
    }
    if bit_length < 422_000 {
        return false;
    }
    if bit_length < 524_288 {
        // 2^19
        return true;
    }
    if bit_length < 701_000 {
        return false;
    }
    if bit_length < 1_048_576 {
        // 2^20
        return true;
    }
    if bit_length < 1_249_000 {
        return false;
    }
    true
}

/// The squaring analogue of [`should_multiply_ss`]; squaring crosses over
/// earlier.
pub(crate) fn should_square_ss(bit_length: usize) -> bool {
    if bit_length < 128_000 {
        return false;
    }
    if bit_length < 131_072 {
        // 2^17
        return true;
    }
    if bit_length < 223_000 {
        return false;
    }
    if bit_length < 262_144 {
        // 2^18
        return true;
    }
    if bit_length < 379_000 {
        return false;
    }
    if bit_length < 524_288 {
        // 2^19
        return true;
    }
    if bit_length < 631_000 {
        return false;
    }
    if bit_length < 1_048_576 {
        // 2^20
        return true;
    }
    if bit_length < 1_120_000 {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng(seed: u64) -> impl FnMut() -> u64 {
        let mut state = seed.max(1);
        move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        }
    }

    fn random_bigint(limbs: usize, next: &mut impl FnMut() -> u64) -> BigInt {
        let mag: Vec<u32> = (0..limbs).map(|_| next() as u32).collect();
        BigInt::from_stripped_mag(mag, 1)
    }

    #[test]
    fn test_schoolbook_small_values() {
        let a = BigInt::from_i64(-12345);
        let b = BigInt::from_i64(67890);
        assert_eq!(a.multiply(&b), BigInt::from_i64(-12345 * 67890));
        assert_eq!(a.multiply(&BigInt::zero()), BigInt::zero());
        assert_eq!(a.multiply(&BigInt::one()), a);
    }

    #[test]
    fn test_multiply_by_power_of_two_limb() {
        let a = BigInt::from_u64(0x1_0000_0001);
        let b = BigInt::from_u64(16);
        assert_eq!(a.multiply(&b), BigInt::from_u64(0x10_0000_0010));
    }

    #[test]
    fn test_karatsuba_matches_schoolbook() {
        let mut next = rng(42);
        for &limbs in &[50, 60, 74, 75, 100] {
            let a = random_bigint(limbs, &mut next);
            let b = random_bigint(limbs, &mut next);
            let expected = multiply_schoolbook(&a, &b);
            assert_eq!(multiply_karatsuba(&a, &b), expected, "limbs={limbs}");
            assert_eq!(
                multiply_karatsuba(&a.negate(), &b),
                expected.negate(),
                "limbs={limbs} negative"
            );
        }
    }

    #[test]
    fn test_karatsuba_unequal_lengths() {
        let mut next = rng(43);
        let a = random_bigint(120, &mut next);
        let b = random_bigint(51, &mut next);
        assert_eq!(multiply_karatsuba(&a, &b), multiply_schoolbook(&a, &b));
    }

    #[test]
    fn test_toom_cook3_matches_schoolbook() {
        let mut next = rng(44);
        for &limbs in &[75, 76, 90, 139, 140, 200] {
            let a = random_bigint(limbs, &mut next);
            let b = random_bigint(limbs, &mut next);
            assert_eq!(
                multiply_toom_cook3(&a, &b),
                multiply_schoolbook(&a, &b),
                "limbs={limbs}"
            );
        }
    }

    #[test]
    fn test_toom_cook3_unequal_lengths() {
        let mut next = rng(45);
        let a = random_bigint(300, &mut next);
        let b = random_bigint(76, &mut next);
        assert_eq!(multiply_toom_cook3(&a, &b), multiply_schoolbook(&a, &b));
        assert_eq!(
            multiply_toom_cook3(&b, &a.negate()),
            multiply_schoolbook(&b, &a.negate())
        );
    }

    #[test]
    fn test_square_variants_agree() {
        let mut next = rng(46);
        for &limbs in &[1, 10, 89, 90, 139, 140, 160] {
            let a = random_bigint(limbs, &mut next);
            let expected = multiply_schoolbook(&a, &a);
            assert_eq!(square_schoolbook(&a), expected, "schoolbook limbs={limbs}");
            assert_eq!(square_karatsuba(&a), expected, "karatsuba limbs={limbs}");
            assert_eq!(square_toom_cook3(&a), expected, "toom limbs={limbs}");
            assert_eq!(a.square(), expected, "dispatch limbs={limbs}");
        }
    }

    #[test]
    fn test_square_negative() {
        let a = BigInt::from_i64(-5);
        assert_eq!(a.square(), BigInt::from_i64(25));
    }

    #[test]
    fn test_exact_divide_by_3() {
        let mut next = rng(47);
        for limbs in [1usize, 3, 10, 80] {
            let a = random_bigint(limbs, &mut next);
            let tripled = a.multiply(&BigInt::from_u64(3));
            assert_eq!(tripled.exact_divide_by_3(), a, "limbs={limbs}");
        }
    }

    #[test]
    fn test_pow() {
        assert_eq!(BigInt::from_i64(2).pow(10), BigInt::from_i64(1024));
        assert_eq!(BigInt::from_i64(-2).pow(9), BigInt::from_i64(-512));
        assert_eq!(BigInt::from_i64(-2).pow(10), BigInt::from_i64(1024));
        assert_eq!(BigInt::from_i64(0).pow(0), BigInt::one());
        assert_eq!(BigInt::from_i64(0).pow(5), BigInt::zero());
        assert_eq!(BigInt::from_i64(1).pow(1000), BigInt::one());
        // 3^40 exceeds the small-path scale cap, exercising repeated
        // squaring with the large kernels.
        let v = BigInt::from_i64(3).pow(40);
        assert_eq!(v, BigInt::from_str_radix("12157665459056928801", 10).unwrap());
        // Power-of-two base becomes a pure shift.
        assert_eq!(BigInt::from_i64(8).pow(21), BigInt::one().shl(63));
    }

    #[test]
    fn test_ss_threshold_table() {
        assert!(!should_multiply_ss(246_999));
        assert!(should_multiply_ss(247_000));
        assert!(should_multiply_ss(262_143));
        assert!(!should_multiply_ss(262_144));
        assert!(should_multiply_ss(422_000));
        assert!(!should_multiply_ss(524_288));
        assert!(should_multiply_ss(701_000));
        assert!(!should_multiply_ss(1_048_576));
        assert!(should_multiply_ss(1_249_000));
        assert!(should_multiply_ss(50_000_000));

        assert!(!should_square_ss(127_999));
        assert!(should_square_ss(128_000));
        assert!(!should_square_ss(131_072));
        assert!(should_square_ss(223_000));
        assert!(!should_square_ss(1_100_000));
        assert!(should_square_ss(1_120_000));
    }
}
