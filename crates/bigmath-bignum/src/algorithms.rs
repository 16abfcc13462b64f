//! Forced entry points into the individual multiplication, squaring and
//! division kernels.
//!
//! The dispatch thresholds in the library proper are part of its contract,
//! but differential tests and benchmarks need to pin a specific kernel
//! regardless of operand size. Each function here runs exactly one
//! algorithm's top-level step; recursive sub-steps still dispatch normally,
//! the way the kernels compose in production.
//!
//! The Schönhage-Strassen entry points require operands of at least a few
//! hundred bits (a transform piece must span a whole limb).

use bigmath_types::BigIntError;

use crate::bigint::BigInt;
use crate::{divide, multiply, ssmul};

/// Grade-school multiplication.
pub fn mul_schoolbook(x: &BigInt, y: &BigInt) -> BigInt {
    multiply::multiply_schoolbook(x, y)
}

/// Karatsuba multiplication.
pub fn mul_karatsuba(x: &BigInt, y: &BigInt) -> BigInt {
    if x.is_zero() || y.is_zero() {
        return BigInt::zero();
    }
    multiply::multiply_karatsuba(x, y)
}

/// 3-way Toom-Cook multiplication.
pub fn mul_toom_cook3(x: &BigInt, y: &BigInt) -> BigInt {
    if x.is_zero() || y.is_zero() {
        return BigInt::zero();
    }
    multiply::multiply_toom_cook3(x, y)
}

/// Schönhage-Strassen multiplication.
pub fn mul_schoenhage_strassen(x: &BigInt, y: &BigInt) -> BigInt {
    ssmul::multiply_ss(x, y)
}

/// Grade-school squaring.
pub fn square_schoolbook(x: &BigInt) -> BigInt {
    multiply::square_schoolbook(x)
}

/// Karatsuba squaring.
pub fn square_karatsuba(x: &BigInt) -> BigInt {
    if x.is_zero() {
        return BigInt::zero();
    }
    multiply::square_karatsuba(x)
}

/// 3-way Toom-Cook squaring.
pub fn square_toom_cook3(x: &BigInt) -> BigInt {
    if x.is_zero() {
        return BigInt::zero();
    }
    multiply::square_toom_cook3(x)
}

/// Schönhage-Strassen squaring.
pub fn square_schoenhage_strassen(x: &BigInt) -> BigInt {
    ssmul::square_ss(x)
}

/// Knuth (schoolbook) division.
pub fn div_rem_knuth(a: &BigInt, b: &BigInt) -> Result<(BigInt, BigInt), BigIntError> {
    if b.is_zero() {
        return Err(BigIntError::Domain("division by zero"));
    }
    Ok(divide::div_rem_knuth_pair(a, b))
}

/// Burnikel-Ziegler division.
pub fn div_rem_burnikel_ziegler(
    a: &BigInt,
    b: &BigInt,
) -> Result<(BigInt, BigInt), BigIntError> {
    if b.is_zero() {
        return Err(BigIntError::Domain("division by zero"));
    }
    Ok(divide::div_rem_burnikel_ziegler(a, b))
}

/// Barrett division with a Newton reciprocal.
pub fn div_rem_barrett(a: &BigInt, b: &BigInt) -> Result<(BigInt, BigInt), BigIntError> {
    if b.is_zero() {
        return Err(BigIntError::Domain("division by zero"));
    }
    Ok(divide::div_rem_barrett(a, b))
}
