#![forbid(unsafe_code)]
#![doc = "Immutable arbitrary-precision signed integers for bigmath."]
//!
//! Values are sign-magnitude internally and behave as if stored in
//! infinite-width two's-complement at the bitwise surface. Multiplication
//! dispatches among schoolbook, Karatsuba, 3-way Toom-Cook and
//! Schönhage-Strassen; division among Knuth, Burnikel-Ziegler and Barrett.

mod bigint;
mod bits;
mod convert;
mod divide;
mod magnitude;
mod modular;
mod multiply;
mod mutable;
mod prime;
mod random;
mod sieve;
mod ssmul;

pub mod algorithms;

pub use bigint::BigInt;
pub use bigmath_types::BigIntError;
