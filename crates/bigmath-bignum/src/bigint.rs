//! The immutable signed big-integer type.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use crate::magnitude::{add_mag, cmp_mag, strip_leading_zeros, sub_mag, Limb};

/// An immutable arbitrary-precision signed integer.
///
/// Internally represented as a signum in {-1, 0, +1} and a minimal
/// big-endian magnitude (most significant limb first, no leading zero limb;
/// zero is the empty magnitude). Derived quantities such as the bit length
/// are memoized on first use; a published value is never observed to change.
pub struct BigInt {
    /// -1 for negative, 0 for zero, +1 for positive.
    pub(crate) signum: i32,
    /// Minimal big-endian magnitude.
    pub(crate) mag: Vec<Limb>,

    // Lazily-computed derived fields. Publication is safe: each is written
    // at most once and readers either see the initialized value or compute
    // their own identical copy.
    pub(crate) bit_length: OnceLock<usize>,
    pub(crate) bit_count: OnceLock<usize>,
    pub(crate) lowest_set_bit: OnceLock<Option<usize>>,
    pub(crate) first_nonzero_limb: OnceLock<usize>,
}

impl BigInt {
    /// Internal constructor; `mag` must already be minimal.
    pub(crate) fn from_mag(mag: Vec<Limb>, signum: i32) -> Self {
        let signum = if mag.is_empty() { 0 } else { signum };
        BigInt {
            signum,
            mag,
            bit_length: OnceLock::new(),
            bit_count: OnceLock::new(),
            lowest_set_bit: OnceLock::new(),
            first_nonzero_limb: OnceLock::new(),
        }
    }

    /// Internal constructor that strips leading zero limbs first.
    pub(crate) fn from_stripped_mag(mag: Vec<Limb>, signum: i32) -> Self {
        BigInt::from_mag(strip_leading_zeros(mag), signum)
    }

    /// The constant zero.
    pub fn zero() -> Self {
        BigInt::from_mag(Vec::new(), 0)
    }

    /// The constant one.
    pub fn one() -> Self {
        BigInt::from_mag(vec![1], 1)
    }

    /// The constant two.
    pub fn two() -> Self {
        BigInt::from_mag(vec![2], 1)
    }

    /// The constant ten.
    pub fn ten() -> Self {
        BigInt::from_mag(vec![10], 1)
    }

    /// An `n`-limb number all of whose bits are ones, i.e.
    /// `(1 << (32 * n)) - 1`.
    pub(crate) fn ones(n: usize) -> Self {
        BigInt::from_mag(vec![u32::MAX; n], 1)
    }

    /// Value of the given `u64`.
    pub fn from_u64(val: u64) -> Self {
        if val == 0 {
            return BigInt::zero();
        }
        let high = (val >> 32) as u32;
        let mag = if high == 0 {
            vec![val as u32]
        } else {
            vec![high, val as u32]
        };
        BigInt::from_mag(mag, 1)
    }

    /// Value of the given `i64`.
    pub fn from_i64(val: i64) -> Self {
        if val < 0 {
            BigInt::from_u64(val.unsigned_abs()).negate()
        } else {
            BigInt::from_u64(val as u64)
        }
    }

    /// Value of the given `u32`.
    pub fn from_u32(val: u32) -> Self {
        BigInt::from_u64(val as u64)
    }

    /// Value of the given `i32`.
    pub fn from_i32(val: i32) -> Self {
        BigInt::from_i64(val as i64)
    }

    /// -1, 0 or 1 as this value is negative, zero or positive.
    pub fn signum(&self) -> i32 {
        self.signum
    }

    pub fn is_zero(&self) -> bool {
        self.signum == 0
    }

    pub fn is_one(&self) -> bool {
        self.signum == 1 && self.mag.len() == 1 && self.mag[0] == 1
    }

    pub fn is_odd(&self) -> bool {
        self.signum != 0 && self.mag[self.mag.len() - 1] & 1 == 1
    }

    pub fn is_even(&self) -> bool {
        !self.is_odd()
    }

    pub(crate) fn mag(&self) -> &[Limb] {
        &self.mag
    }

    /// The absolute value.
    pub fn abs(&self) -> BigInt {
        if self.signum >= 0 {
            self.clone()
        } else {
            self.negate()
        }
    }

    /// The arithmetic negation.
    pub fn negate(&self) -> BigInt {
        BigInt::from_mag(self.mag.clone(), -self.signum)
    }

    /// `self + val`.
    pub fn add(&self, val: &BigInt) -> BigInt {
        if val.signum == 0 {
            return self.clone();
        }
        if self.signum == 0 {
            return val.clone();
        }
        if val.signum == self.signum {
            return BigInt::from_mag(add_mag(&self.mag, &val.mag), self.signum);
        }
        match self.compare_magnitude(val) {
            Ordering::Equal => BigInt::zero(),
            Ordering::Greater => {
                BigInt::from_mag(sub_mag(&self.mag, &val.mag), self.signum)
            }
            Ordering::Less => {
                BigInt::from_mag(sub_mag(&val.mag, &self.mag), -self.signum)
            }
        }
    }

    /// `self - val`.
    pub fn subtract(&self, val: &BigInt) -> BigInt {
        if val.signum == 0 {
            return self.clone();
        }
        if self.signum == 0 {
            return val.negate();
        }
        if val.signum != self.signum {
            return BigInt::from_mag(add_mag(&self.mag, &val.mag), self.signum);
        }
        match self.compare_magnitude(val) {
            Ordering::Equal => BigInt::zero(),
            Ordering::Greater => {
                BigInt::from_mag(sub_mag(&self.mag, &val.mag), self.signum)
            }
            Ordering::Less => {
                BigInt::from_mag(sub_mag(&val.mag, &self.mag), -self.signum)
            }
        }
    }

    /// The smaller of `self` and `val`.
    pub fn min(&self, val: &BigInt) -> BigInt {
        if self <= val {
            self.clone()
        } else {
            val.clone()
        }
    }

    /// The larger of `self` and `val`.
    pub fn max(&self, val: &BigInt) -> BigInt {
        if self >= val {
            self.clone()
        } else {
            val.clone()
        }
    }

    /// Magnitude-only compare, ignoring sign.
    pub(crate) fn compare_magnitude(&self, val: &BigInt) -> Ordering {
        cmp_mag(&self.mag, &val.mag)
    }

    /// The `n` low-order limbs as a non-negative value.
    /// Used by Karatsuba and Burnikel-Ziegler splitting.
    pub(crate) fn get_lower(&self, n: usize) -> BigInt {
        if self.mag.len() <= n {
            return self.abs();
        }
        let lower = self.mag[self.mag.len() - n..].to_vec();
        BigInt::from_stripped_mag(lower, 1)
    }

    /// Everything above the `n` low-order limbs, as a non-negative value.
    pub(crate) fn get_upper(&self, n: usize) -> BigInt {
        if self.mag.len() <= n {
            return BigInt::zero();
        }
        let upper = self.mag[..self.mag.len() - n].to_vec();
        BigInt::from_stripped_mag(upper, 1)
    }
}

impl Clone for BigInt {
    fn clone(&self) -> Self {
        BigInt {
            signum: self.signum,
            mag: self.mag.clone(),
            bit_length: self.bit_length.clone(),
            bit_count: self.bit_count.clone(),
            lowest_set_bit: self.lowest_set_bit.clone(),
            first_nonzero_limb: self.first_nonzero_limb.clone(),
        }
    }
}

impl Default for BigInt {
    fn default() -> Self {
        BigInt::zero()
    }
}

impl PartialEq for BigInt {
    fn eq(&self, other: &Self) -> bool {
        self.signum == other.signum && self.mag == other.mag
    }
}

impl Eq for BigInt {}

impl Hash for BigInt {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.signum.hash(state);
        self.mag.hash(state);
    }
}

impl Ord for BigInt {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.signum != other.signum {
            return self.signum.cmp(&other.signum);
        }
        match self.signum {
            1 => self.compare_magnitude(other),
            -1 => other.compare_magnitude(self),
            _ => Ordering::Equal,
        }
    }
}

impl PartialOrd for BigInt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Debug for BigInt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.signum < 0 { "-" } else { "" };
        if self.mag.is_empty() {
            return write!(f, "BigInt(0x0)");
        }
        let mut hex = format!("{:x}", self.mag[0]);
        for limb in &self.mag[1..] {
            hex.push_str(&format!("{limb:08x}"));
        }
        write!(f, "BigInt({sign}0x{hex})")
    }
}

macro_rules! forward_from {
    ($($ty:ty => $ctor:ident),*) => {
        $(impl From<$ty> for BigInt {
            fn from(val: $ty) -> Self {
                BigInt::$ctor(val)
            }
        })*
    };
}

forward_from!(u32 => from_u32, i32 => from_i32, u64 => from_u64, i64 => from_i64);

impl std::ops::Add for &BigInt {
    type Output = BigInt;
    fn add(self, rhs: &BigInt) -> BigInt {
        BigInt::add(self, rhs)
    }
}

impl std::ops::Sub for &BigInt {
    type Output = BigInt;
    fn sub(self, rhs: &BigInt) -> BigInt {
        BigInt::subtract(self, rhs)
    }
}

impl std::ops::Mul for &BigInt {
    type Output = BigInt;
    fn mul(self, rhs: &BigInt) -> BigInt {
        BigInt::multiply(self, rhs)
    }
}

impl std::ops::Neg for &BigInt {
    type Output = BigInt;
    fn neg(self) -> BigInt {
        self.negate()
    }
}

impl std::ops::Shl<u32> for &BigInt {
    type Output = BigInt;
    fn shl(self, n: u32) -> BigInt {
        BigInt::shl(self, n as usize)
    }
}

impl std::ops::Shr<u32> for &BigInt {
    type Output = BigInt;
    fn shr(self, n: u32) -> BigInt {
        BigInt::shr(self, n as usize)
    }
}

impl std::ops::BitAnd for &BigInt {
    type Output = BigInt;
    fn bitand(self, rhs: &BigInt) -> BigInt {
        BigInt::and(self, rhs)
    }
}

impl std::ops::BitOr for &BigInt {
    type Output = BigInt;
    fn bitor(self, rhs: &BigInt) -> BigInt {
        BigInt::or(self, rhs)
    }
}

impl std::ops::BitXor for &BigInt {
    type Output = BigInt;
    fn bitxor(self, rhs: &BigInt) -> BigInt {
        BigInt::xor(self, rhs)
    }
}

impl std::ops::Not for &BigInt {
    type Output = BigInt;
    fn not(self) -> BigInt {
        BigInt::not(self)
    }
}
