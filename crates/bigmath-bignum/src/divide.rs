//! Division kernels: dispatch, Burnikel-Ziegler recursion, Barrett with a
//! Newton reciprocal.
//!
//! Quotients truncate toward zero and the remainder takes the dividend's
//! sign. Dispatch is Knuth below 50 limbs on either side, then
//! Burnikel-Ziegler, then Barrett once both operands clear the piecewise
//! bit-length table.

use bigmath_types::BigIntError;

use crate::bigint::BigInt;
use crate::mutable;

/// Limb-length below which recursion falls back to Knuth division.
pub(crate) const BURNIKEL_ZIEGLER_THRESHOLD: usize = 50;
/// Bit threshold for seeding the Newton reciprocal with plain division.
pub(crate) const NEWTON_THRESHOLD: usize = 100;

impl BigInt {
    /// `self / val`, truncated toward zero.
    pub fn divide(&self, val: &BigInt) -> Result<BigInt, BigIntError> {
        Ok(self.div_rem(val)?.0)
    }

    /// `self % val`; the sign follows the dividend.
    pub fn remainder(&self, val: &BigInt) -> Result<BigInt, BigIntError> {
        Ok(self.div_rem(val)?.1)
    }

    /// Quotient and remainder in one pass.
    pub fn div_rem(&self, val: &BigInt) -> Result<(BigInt, BigInt), BigIntError> {
        if val.signum == 0 {
            return Err(BigIntError::Domain("division by zero"));
        }
        Ok(self.div_rem_unchecked(val))
    }

    /// Dispatching division; the divisor must be nonzero.
    pub(crate) fn div_rem_unchecked(&self, val: &BigInt) -> (BigInt, BigInt) {
        let r = self.mag.len();
        let s = val.mag.len();
        if r < BURNIKEL_ZIEGLER_THRESHOLD || s < BURNIKEL_ZIEGLER_THRESHOLD {
            div_rem_knuth_pair(self, val)
        } else if !should_divide_barrett(r * 32) || !should_divide_barrett(s * 32) {
            div_rem_burnikel_ziegler(self, val)
        } else {
            div_rem_barrett(self, val)
        }
    }

    /// `blockLength` limbs of `self` starting `index * blockLength` limbs
    /// from the bottom; the top block takes whatever is left.
    fn get_block(&self, index: usize, num_blocks: usize, block_length: usize) -> BigInt {
        let block_start = index * block_length;
        if block_start >= self.mag.len() {
            return BigInt::zero();
        }
        let block_end = if index == num_blocks - 1 {
            (self.bit_len() + 31) / 32
        } else {
            (index + 1) * block_length
        };
        if block_end > self.mag.len() {
            return BigInt::zero();
        }
        let new_mag =
            self.mag[self.mag.len() - block_end..self.mag.len() - block_start].to_vec();
        BigInt::from_stripped_mag(new_mag, self.signum)
    }

    /// `self.shift_right_limbs(n).get_lower(n)`: limbs n..2n.
    fn shift_and_truncate(&self, n: usize) -> BigInt {
        let len = self.mag.len();
        if len <= n {
            return BigInt::zero();
        }
        if len <= 2 * n {
            BigInt::from_stripped_mag(self.mag[..len - n].to_vec(), self.signum)
        } else {
            BigInt::from_stripped_mag(self.mag[len - 2 * n..len - n].to_vec(), self.signum)
        }
    }

    /// `2^(bit_len + n) / self` by Newton iteration
    /// `z <- 2z - self*z^2` in fixed point, doubling the precision each step
    /// from a plain-division seed.
    fn inverse(&self, n: usize) -> BigInt {
        let m = self.bit_len();
        if n <= NEWTON_THRESHOLD {
            let dividend = BigInt::one().shl(n * 2);
            let divisor = self.shift_right_rounded(m as isize - n as isize);
            return div_rem_knuth_pair(&dividend, &divisor).0;
        }

        // Precision ladder: halve down from n, clamping at the seed size.
        let num_steps = bit_len_usize((n + NEWTON_THRESHOLD - 1) / NEWTON_THRESHOLD);
        let mut k = vec![0usize; num_steps];
        let mut ki = n;
        for slot in k.iter_mut().rev() {
            ki = (ki + 1) / 2;
            *slot = ki.max(NEWTON_THRESHOLD);
        }

        // 1/self truncated to k[0] fraction digits.
        let seed_dividend = BigInt::one().shl(k[0] * 2);
        let seed_divisor = self.shift_right_rounded(m as isize - k[0] as isize);
        let mut z = div_rem_knuth_pair(&seed_dividend, &seed_divisor).0;

        for i in 0..num_steps {
            let ki = k[i];
            // Fixed-point values are a * 2^(-exponent); each step doubles
            // the number of valid fraction digits.
            let s = z.square();
            let t = self.shift_right_rounded(m as isize - 2 * ki as isize - 3);
            let u = t.multiply(&s);
            let mut w = z.add(&z);
            w = w.shl(3 * ki + 3);
            z = w.subtract(&u);
            if i < num_steps - 1 {
                z = z.shift_right_rounded((4 * ki + 3 - k[i + 1]) as isize);
            } else {
                z = z.shift_right_rounded((4 * ki + 3 - n) as isize);
            }
        }
        z
    }

    /// Right shift rounding to nearest; a non-positive distance is a left
    /// shift.
    fn shift_right_rounded(&self, n: isize) -> BigInt {
        if n <= 0 {
            return self.shl(n.unsigned_abs());
        }
        let n = n as usize;
        let b = self.shr(n);
        if self.test_bit(n - 1) {
            b.add(&BigInt::one())
        } else {
            b
        }
    }
}

/// Knuth division of two signed values; `b` must be nonzero.
pub(crate) fn div_rem_knuth_pair(a: &BigInt, b: &BigInt) -> (BigInt, BigInt) {
    let (q, r) = mutable::div_rem_knuth(&a.mag, &b.mag);
    let q_sign = if a.signum == b.signum { 1 } else { -1 };
    (BigInt::from_mag(q, q_sign), BigInt::from_mag(r, a.signum))
}

/// Burnikel-Ziegler division of two signed values.
pub(crate) fn div_rem_burnikel_ziegler(a: &BigInt, b: &BigInt) -> (BigInt, BigInt) {
    let (mut q, mut r) = div_rem_bz_positive(&a.abs(), &b.abs());
    if a.signum * b.signum < 0 {
        q = q.negate();
    }
    if a.signum < 0 {
        r = r.negate();
    }
    (q, r)
}

/// Barrett division of two signed values.
pub(crate) fn div_rem_barrett(a: &BigInt, b: &BigInt) -> (BigInt, BigInt) {
    let (mut q, mut r) = div_rem_barrett_positive(&a.abs(), &b.abs());
    if a.signum * b.signum < 0 {
        q = q.negate();
    }
    if a.signum < 0 {
        r = r.negate();
    }
    (q, r)
}

/// Algorithm 3 of the Burnikel-Ziegler paper with beta = 2^32: normalize the
/// divisor to a whole number of n-limb blocks, then divide block pairs with
/// `divide_2n1n`.
fn div_rem_bz_positive(a: &BigInt, b: &BigInt) -> (BigInt, BigInt) {
    let r = a.mag.len();
    let s = b.mag.len();

    if r < s {
        return (BigInt::zero(), a.clone());
    }

    // m = min{2^k | (2^k)*threshold > s}
    let m = 1usize << (32 - ((s / BURNIKEL_ZIEGLER_THRESHOLD) as u32).leading_zeros());

    let j = (s + m - 1) / m; // ceil(s/m)
    let n = j * m; // block length in limbs
    let n32 = 32 * n; // block length in bits
    let sigma = n32.saturating_sub(b.bit_len());
    let b = b.shl(sigma); // shift b so its length is a multiple of n
    let a = a.shl(sigma); // shift a by the same amount

    // t = number of blocks needed for a plus one additional bit
    let mut t = (a.bit_len() + n32) / n32;
    if t < 2 {
        t = 2;
    }
    let a1 = a.get_block(t - 1, t, n); // most significant block
    let a2 = a.get_block(t - 2, t, n);

    // Schoolbook division on blocks, 2-block dividends by 1-block divisors.
    let mut z = a1.shift_left_limbs(n).add(&a2);
    let mut quotient = BigInt::zero();
    for i in (1..=t - 2).rev() {
        let (qi, ri) = divide_2n1n(&z, &b);
        z = a.get_block(i - 1, t, n);
        z = z.add(&ri.shift_left_limbs(n));
        quotient = quotient.add(&qi).shift_left_limbs(n);
    }
    // One more round for i = 0, leaving z alone.
    let (qi, ri) = divide_2n1n(&z, &b);
    quotient = quotient.add(&qi);

    let remainder = ri.shr(sigma); // a and b were shifted, so shift back
    (quotient, remainder)
}

/// Algorithm 1: divides a 2n-limb number by an n-limb number, n even, by two
/// calls to `divide_3n2n`.
fn divide_2n1n(a: &BigInt, b: &BigInt) -> (BigInt, BigInt) {
    let n = b.mag.len();
    if n % 2 != 0 || n < BURNIKEL_ZIEGLER_THRESHOLD {
        return div_rem_knuth_pair(a, b);
    }

    // View a as [a1,a2,a3,a4] and divide [a1,a2,a3] by b.
    let (q1, r1) = divide_3n2n(&a.shift_right_limbs(n / 2), b);

    // Divide the concatenation of r1 and a4 by b.
    let a4 = a.get_lower(n / 2);
    let (q2, r2) = divide_3n2n(&r1.shift_left_limbs(n / 2).add(&a4), b);

    // The quotient is the concatenation of the two quotients above.
    (q1.shift_left_limbs(n / 2).add(&q2), r2)
}

/// Algorithm 2: divides a 3n-limb number by a 2n-limb number. The remainder
/// correction loop (add b, decrement q, at most twice) is the authoritative
/// behavior.
fn divide_3n2n(a: &BigInt, b: &BigInt) -> (BigInt, BigInt) {
    let n = b.mag.len() / 2; // half the length of b in limbs

    // Split a into three parts of length n or less.
    let a1 = a.shift_right_limbs(2 * n);
    let a2 = a.shift_and_truncate(n);
    let a3 = a.get_lower(n);

    // Split b into two parts of length n or less.
    let b1 = b.shift_right_limbs(n);
    let b2 = b.get_lower(n);

    let a12 = a1.shift_left_limbs(n).add(&a2); // concatenation of a1 and a2

    let (mut q, r1);
    if a1 < b1 {
        let (qq, rr) = divide_2n1n(&a12, &b1);
        q = qq;
        r1 = rr;
    } else {
        // q = beta^n - 1, r = a12 - b1*2^(32n) + b1
        q = BigInt::ones(n);
        r1 = a12.subtract(&b1.shift_left_limbs(n)).add(&b1);
    }

    let d = q.multiply(&b2);
    let mut r = r1.shift_left_limbs(n).add(&a3).subtract(&d);

    // Add b until r >= 0; bounded at two steps by construction.
    while r.signum() < 0 {
        r = r.add(b);
        q = q.subtract(&BigInt::one());
    }

    (q, r)
}

/// Barrett division of two non-negative values: one reciprocal for the
/// balanced case, or one n-bit chunk of the dividend at a time with the
/// reciprocal reused.
fn div_rem_barrett_positive(a: &BigInt, b: &BigInt) -> (BigInt, BigInt) {
    let m = a.bit_len();
    let n = b.bit_len();

    if m < n {
        return (BigInt::zero(), a.clone());
    }
    if m <= 2 * n {
        let mu = b.inverse(m - n);
        return barrett_base(a, b, &mu);
    }

    // Treat each n-bit piece of a as a digit and long-divide by b,
    // reusing the inverse.
    let mu2n = b.inverse(n);
    let mut start_bit = m / n * n; // bit at which the current piece starts
    let mut quotient = BigInt::zero();
    let mut remainder = a.shr(start_bit);
    let mask = BigInt::one().shl(n).subtract(&BigInt::one());
    while start_bit > 0 {
        start_bit -= n;
        let ai = a.shr(start_bit).and(&mask);
        remainder = remainder.shl(n).add(&ai);
        // mu = 2^(remainder.bit_len - n) / b
        let mu = mu2n.shift_right_rounded(2 * n as isize - remainder.bit_len() as isize);
        let (qc, rc) = barrett_base(&remainder, b, &mu);
        quotient = quotient.shl(n).add(&qc);
        remainder = rc;
    }
    (quotient, remainder)
}

/// The Barrett base step: q = (a_high * mu) >> (m - n + 1), then up to two
/// +/- b corrections.
fn barrett_base(a: &BigInt, b: &BigInt, mu: &BigInt) -> (BigInt, BigInt) {
    let m = a.bit_len();
    let n = b.bit_len();
    if m < n {
        return (BigInt::zero(), a.clone());
    }

    let a1 = a.shr(n - 1);
    let mut q = a1.multiply(mu).shr(m - n + 1);
    let mut r = a.subtract(&b.multiply(&q));
    loop {
        if r.signum() < 0 {
            r = r.add(b);
            q = q.subtract(&BigInt::one());
        } else if r >= *b {
            r = r.subtract(b);
            q = q.add(&BigInt::one());
        } else {
            break;
        }
    }
    (q, r)
}

/// Whether Barrett division beats Burnikel-Ziegler at the given operand bit
/// length; like the multiplication table, the crossover flips several times.
pub(crate) fn should_divide_barrett(bit_length: usize) -> bool {
    if bit_length < 3_300_000 {
        return false;
    }
    if bit_length < 4_100_000 {
        return true;
    }
    if bit_length < 5_900_000 {
        return false;
    }
    if bit_length < 8_300_000 {
        return true;
    }
    if bit_length < 9_700_000 {
        return false;
    }
    if bit_length < 16_000_000 {
        return true;
    }
    if bit_length < 19_000_000 {
        return false;
    }
    true
}

fn bit_len_usize(n: usize) -> usize {
    (usize::BITS - n.leading_zeros()) as usize
}
