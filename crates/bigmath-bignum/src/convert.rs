//! Conversions: radix strings, two's-complement byte arrays, and primitive
//! narrowing.
//!
//! String conversion works a digit group at a time: the largest power of the
//! radix that fits in a machine word tears the number into "long digits",
//! each formatted or parsed with plain word arithmetic.

use std::fmt;
use std::str::FromStr;

use bigmath_types::BigIntError;

use crate::bigint::BigInt;
use crate::magnitude::{strip_leading_zeros, Limb};
use crate::mutable;

// bits per digit in the given radix, times 1024, rounded up.
#[rustfmt::skip]
static BITS_PER_DIGIT: [usize; 37] = [
    0, 0,
    1024, 1624, 2048, 2378, 2648, 2875, 3072, 3247, 3402, 3543, 3672,
    3790, 3899, 4001, 4096, 4186, 4271, 4350, 4426, 4498, 4567, 4633,
    4696, 4756, 4814, 4870, 4923, 4975, 5025, 5074, 5120, 5166, 5210,
    5253, 5295,
];

// The highest n such that radix^n fits in a u32 group.
#[rustfmt::skip]
static DIGITS_PER_LIMB: [usize; 37] = [
    0, 0, 30, 19, 15, 13, 11,
    11, 10, 9, 9, 8, 8, 8, 8, 7, 7, 7, 7, 7, 7, 7, 6, 6, 6, 6,
    6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 5,
];

// radix^DIGITS_PER_LIMB[radix], the group radix for parsing.
#[rustfmt::skip]
static LIMB_RADIX: [u32; 37] = [
    0, 0,
    0x4000_0000, 0x4546_b3db, 0x4000_0000, 0x48c2_7395, 0x159f_d800,
    0x75db_9c97, 0x4000_0000, 0x1717_9149, 0x3b9a_ca00, 0x0cc6_db61,
    0x19a1_0000, 0x309f_1021, 0x57f6_c100, 0x0a2f_1b6f, 0x1000_0000,
    0x1875_4571, 0x247d_bc80, 0x3547_667b, 0x4c4b_4000, 0x6b5a_6e1d,
    0x06c2_0a40, 0x08d2_d931, 0x0b64_0000, 0x0e8d_4a51, 0x1269_ae40,
    0x1717_9149, 0x1cb9_1000, 0x2374_4899, 0x2b73_a840, 0x34e6_3b41,
    0x4000_0000, 0x4cfa_3cc1, 0x5c13_d840, 0x6d91_b519, 0x039a_a400,
];

// The highest n such that radix^n fits in a u64 group.
#[rustfmt::skip]
static DIGITS_PER_LONG: [usize; 37] = [
    0, 0,
    62, 39, 31, 27, 24, 22, 20, 19, 18, 18, 17, 17, 16, 16, 15, 15, 15, 14,
    14, 14, 14, 13, 13, 13, 13, 13, 13, 12, 12, 12, 12, 12, 12, 12, 12,
];

// radix^DIGITS_PER_LONG[radix], the group radix for formatting.
#[rustfmt::skip]
static LONG_RADIX: [u64; 37] = [
    0, 0,
    0x4000000000000000, 0x383d9170b85ff80b, 0x4000000000000000,
    0x6765c793fa10079d, 0x41c21cb8e1000000, 0x3642798750226111,
    0x1000000000000000, 0x12bf307ae81ffd59, 0x0de0b6b3a7640000,
    0x4d28cb56c33fa539, 0x1eca170c00000000, 0x780c7372621bd74d,
    0x1e39a5057d810000, 0x5b27ac993df97701, 0x1000000000000000,
    0x27b95e997e21d9f1, 0x5da0e1e53c5c8000, 0x0b16a458ef403f19,
    0x16bcc41e90000000, 0x2d04b7fdd9c0ef49, 0x5658597bcaa24000,
    0x06feb266931a75b7, 0x0c29e98000000000, 0x14adf4b7320334b9,
    0x226ed36478bfa000, 0x383d9170b85ff80b, 0x5a3c23e39c000000,
    0x04e900abb53e6b71, 0x07600ec618141000, 0x0aee5720ee830681,
    0x1000000000000000, 0x172588ad4f5f0981, 0x211e44f7d02c1000,
    0x2ee56725f06e5c71, 0x41c21cb8e1000000,
];

impl BigInt {
    /// Parses an optionally signed number in the given radix (2 to 36).
    /// The digit mapping is `char::to_digit`; no other characters are
    /// permitted.
    pub fn from_str_radix(s: &str, radix: u32) -> Result<BigInt, BigIntError> {
        if !(2..=36).contains(&radix) {
            return Err(BigIntError::Format(format!("radix {radix} out of range")));
        }
        let chars: Vec<char> = s.chars().collect();
        let len = chars.len();
        if len == 0 {
            return Err(BigIntError::Format("zero length number".into()));
        }

        // At most one leading sign character.
        let minus = chars.iter().rposition(|&c| c == '-');
        let plus = chars.iter().rposition(|&c| c == '+');
        let mut sign = 1;
        let mut cursor = 0;
        match (minus, plus) {
            (None, None) => {}
            (Some(0), None) => {
                sign = -1;
                cursor = 1;
            }
            (None, Some(0)) => cursor = 1,
            _ => {
                return Err(BigIntError::Format("illegal embedded sign character".into()))
            }
        }
        if cursor == len {
            return Err(BigIntError::Format("zero length number".into()));
        }

        // Skip leading zeros and compute the number of digits.
        while cursor < len && chars[cursor].to_digit(radix) == Some(0) {
            cursor += 1;
        }
        if cursor == len {
            return Ok(BigInt::zero());
        }
        let num_digits = len - cursor;

        // Pre-allocate the expected magnitude size; may be one limb over.
        let num_bits = ((num_digits * BITS_PER_DIGIT[radix as usize]) >> 10) + 1;
        let num_words = (num_bits + 31) >> 5;
        let mut magnitude = vec![0u32; num_words];

        // First (possibly short) digit group.
        let mut first_group_len = num_digits % DIGITS_PER_LIMB[radix as usize];
        if first_group_len == 0 {
            first_group_len = DIGITS_PER_LIMB[radix as usize];
        }
        magnitude[num_words - 1] = parse_group(&chars[cursor..cursor + first_group_len], radix)?;
        cursor += first_group_len;

        // Remaining full groups.
        let super_radix = LIMB_RADIX[radix as usize];
        while cursor < len {
            let group_len = DIGITS_PER_LIMB[radix as usize];
            let group_val = parse_group(&chars[cursor..cursor + group_len], radix)?;
            cursor += group_len;
            destructive_mul_add(&mut magnitude, super_radix, group_val);
        }

        Ok(BigInt::from_mag(strip_leading_zeros(magnitude), sign))
    }

    /// The string representation in the given radix, with a leading minus
    /// for negative values. A radix outside 2 to 36 defaults to 10.
    pub fn to_string_radix(&self, radix: u32) -> String {
        if self.signum == 0 {
            return "0".into();
        }
        let radix = if (2..=36).contains(&radix) { radix } else { 10 } as usize;

        // Tear the number into digit groups, least significant first.
        let d = LONG_RADIX[radix];
        let d_mag = mag_from_u64(d);
        let mut digit_groups: Vec<String> = Vec::new();
        let mut tmp = self.mag.clone();
        while !tmp.is_empty() {
            let (q, r) = mutable::div_rem_knuth(&tmp, &d_mag);
            digit_groups.push(format_radix_u64(mag_to_u64(&r), radix as u32));
            tmp = q;
        }

        // Sign and the most significant group, then the remaining groups
        // left-padded with zeros to the fixed per-group digit count.
        let mut buf =
            String::with_capacity(digit_groups.len() * DIGITS_PER_LONG[radix] + 1);
        if self.signum < 0 {
            buf.push('-');
        }
        buf.push_str(&digit_groups[digit_groups.len() - 1]);
        for group in digit_groups[..digit_groups.len() - 1].iter().rev() {
            for _ in group.len()..DIGITS_PER_LONG[radix] {
                buf.push('0');
            }
            buf.push_str(group);
        }
        buf
    }

    /// Parses a big-endian two's-complement byte array; the empty array is
    /// rejected.
    pub fn from_bytes_be(bytes: &[u8]) -> Result<BigInt, BigIntError> {
        if bytes.is_empty() {
            return Err(BigIntError::Format("zero length byte array".into()));
        }
        Ok(if bytes[0] & 0x80 != 0 {
            BigInt::from_mag(make_positive_bytes(bytes), -1)
        } else {
            BigInt::from_mag(mag_from_be_bytes(bytes), 1)
        })
    }

    /// Builds a value from a signum and a big-endian unsigned magnitude.
    /// A zero signum requires an all-zero magnitude.
    pub fn from_sign_bytes_be(signum: i32, magnitude: &[u8]) -> Result<BigInt, BigIntError> {
        if !(-1..=1).contains(&signum) {
            return Err(BigIntError::Format("invalid signum value".into()));
        }
        let mag = mag_from_be_bytes(magnitude);
        if mag.is_empty() {
            return Ok(BigInt::zero());
        }
        if signum == 0 {
            return Err(BigIntError::Format("signum-magnitude mismatch".into()));
        }
        Ok(BigInt::from_mag(mag, signum))
    }

    /// The minimal big-endian two's-complement encoding: at least one byte,
    /// with at least one sign bit.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        let byte_len = self.bit_len() / 8 + 1;
        let mut bytes = vec![0u8; byte_len];

        let mut bytes_copied = 4;
        let mut next_limb: Limb = 0;
        let mut limb_index = 0;
        for i in (0..byte_len).rev() {
            if bytes_copied == 4 {
                next_limb = self.get_limb_twos(limb_index);
                limb_index += 1;
                bytes_copied = 1;
            } else {
                next_limb >>= 8;
                bytes_copied += 1;
            }
            bytes[i] = next_limb as u8;
        }
        bytes
    }

    /// The low 32 bits, possibly with a sign flip.
    pub fn i32_value(&self) -> i32 {
        self.get_limb_twos(0) as i32
    }

    /// The low 64 bits, possibly with a sign flip.
    pub fn i64_value(&self) -> i64 {
        (((self.get_limb_twos(1) as u64) << 32) | self.get_limb_twos(0) as u64) as i64
    }

    /// The value as an `i64`, or `OutOfRange` if it does not fit.
    pub fn i64_exact(&self) -> Result<i64, BigIntError> {
        if self.mag.len() <= 2 && self.bit_len() <= 63 {
            Ok(self.i64_value())
        } else {
            Err(BigIntError::OutOfRange("i64"))
        }
    }

    /// The value as an `i32`, or `OutOfRange` if it does not fit.
    pub fn i32_exact(&self) -> Result<i32, BigIntError> {
        if self.mag.len() <= 1 && self.bit_len() <= 31 {
            Ok(self.i32_value())
        } else {
            Err(BigIntError::OutOfRange("i32"))
        }
    }

    /// The value as an `i16`, or `OutOfRange` if it does not fit.
    pub fn i16_exact(&self) -> Result<i16, BigIntError> {
        match self.i32_exact() {
            Ok(v) if (i16::MIN as i32..=i16::MAX as i32).contains(&v) => Ok(v as i16),
            _ => Err(BigIntError::OutOfRange("i16")),
        }
    }

    /// The value as an `i8`, or `OutOfRange` if it does not fit.
    pub fn i8_exact(&self) -> Result<i8, BigIntError> {
        match self.i32_exact() {
            Ok(v) if (i8::MIN as i32..=i8::MAX as i32).contains(&v) => Ok(v as i8),
            _ => Err(BigIntError::OutOfRange("i8")),
        }
    }

    /// The nearest `f64`; values beyond the range collapse to infinity.
    /// Goes through the decimal representation, which is slow but exact in
    /// its rounding.
    pub fn f64_value(&self) -> f64 {
        self.to_string_radix(10).parse().unwrap_or(f64::NAN)
    }

    /// The nearest `f32`; values beyond the range collapse to infinity.
    pub fn f32_value(&self) -> f32 {
        self.to_string_radix(10).parse().unwrap_or(f32::NAN)
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad_integral(self.signum >= 0, "", &self.abs().to_string_radix(10))
    }
}

impl FromStr for BigInt {
    type Err = BigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigInt::from_str_radix(s, 10)
    }
}

/// One digit group as a machine word; groups are sized so this cannot
/// overflow.
fn parse_group(chars: &[char], radix: u32) -> Result<u32, BigIntError> {
    let mut result: u32 = 0;
    for &c in chars {
        let digit = c
            .to_digit(radix)
            .ok_or_else(|| BigIntError::Format(format!("illegal digit '{c}'")))?;
        result = result * radix + digit;
    }
    Ok(result)
}

/// Multiplies the magnitude by `y` in place and adds `z`.
fn destructive_mul_add(x: &mut [Limb], y: Limb, z: Limb) {
    let ylong = y as u64;
    let len = x.len();

    let mut carry: u64 = 0;
    for i in (0..len).rev() {
        let product = ylong * x[i] as u64 + carry;
        x[i] = product as Limb;
        carry = product >> 32;
    }

    let mut sum = x[len - 1] as u64 + z as u64;
    x[len - 1] = sum as Limb;
    let mut carry = sum >> 32;
    for i in (0..len - 1).rev() {
        if carry == 0 {
            break;
        }
        sum = x[i] as u64 + carry;
        x[i] = sum as Limb;
        carry = sum >> 32;
    }
}

/// Formats a word in the given radix with lowercase digits.
fn format_radix_u64(mut v: u64, radix: u32) -> String {
    if v == 0 {
        return "0".into();
    }
    let mut digits: Vec<char> = Vec::new();
    while v != 0 {
        let d = (v % radix as u64) as u32;
        digits.push(char::from_digit(d, radix).unwrap_or('0'));
        v /= radix as u64;
    }
    digits.iter().rev().collect()
}

fn mag_from_u64(v: u64) -> Vec<Limb> {
    let high = (v >> 32) as u32;
    if high == 0 {
        vec![v as u32]
    } else {
        vec![high, v as u32]
    }
}

fn mag_to_u64(mag: &[Limb]) -> u64 {
    match mag.len() {
        0 => 0,
        1 => mag[0] as u64,
        _ => ((mag[0] as u64) << 32) | mag[1] as u64,
    }
}

/// Strips leading zero bytes and packs the rest into big-endian limbs.
pub(crate) fn mag_from_be_bytes(a: &[u8]) -> Vec<Limb> {
    let byte_length = a.len();
    let mut keep = 0;
    while keep < byte_length && a[keep] == 0 {
        keep += 1;
    }

    let int_length = (byte_length - keep + 3) >> 2;
    let mut result = vec![0u32; int_length];
    let mut b = byte_length as isize - 1;
    for i in (0..int_length).rev() {
        result[i] = a[b as usize] as u32;
        b -= 1;
        let bytes_remaining = b - keep as isize + 1;
        let bytes_to_transfer = bytes_remaining.min(3);
        let mut j = 8;
        while j <= bytes_to_transfer << 3 {
            result[i] |= (a[b as usize] as u32) << j;
            b -= 1;
            j += 8;
        }
    }
    result
}

/// Converts a big-endian byte array holding a negative two's-complement
/// number into the minimal magnitude of its absolute value.
fn make_positive_bytes(a: &[u8]) -> Vec<Limb> {
    let byte_length = a.len();

    // Find the first non-sign (0xff) byte.
    let mut keep = 0;
    while keep < byte_length && a[keep] == 0xff {
        keep += 1;
    }
    // If every non-sign byte is zero, the complement needs one extra byte.
    let mut k = keep;
    while k < byte_length && a[k] == 0 {
        k += 1;
    }
    let extra_byte = usize::from(k == byte_length);

    let int_length = (byte_length - keep + extra_byte + 3) / 4;
    let mut result = vec![0u32; int_length];

    // One's complement of the input, leaving any extra byte zero.
    let mut b = byte_length as isize - 1;
    for i in (0..int_length).rev() {
        result[i] = a[b as usize] as u32;
        b -= 1;
        let num_bytes_to_transfer = (b - keep as isize + 1).clamp(0, 3);
        let mut j = 8;
        while j <= 8 * num_bytes_to_transfer {
            result[i] |= (a[b as usize] as u32) << j;
            b -= 1;
            j += 8;
        }
        // Mask of the bits that must be complemented.
        let mask = u32::MAX >> (8 * (3 - num_bytes_to_transfer));
        result[i] = !result[i] & mask;
    }

    // Add one to the one's complement to form the two's complement.
    for i in (0..result.len()).rev() {
        result[i] = result[i].wrapping_add(1);
        if result[i] != 0 {
            break;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bi(v: i64) -> BigInt {
        BigInt::from_i64(v)
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!("0".parse::<BigInt>().unwrap(), BigInt::zero());
        assert_eq!("-0".parse::<BigInt>().unwrap(), BigInt::zero());
        assert_eq!("+42".parse::<BigInt>().unwrap(), bi(42));
        assert_eq!("-42".parse::<BigInt>().unwrap(), bi(-42));
        assert_eq!(
            "000123456789012345678901234567890"
                .parse::<BigInt>()
                .unwrap()
                .to_string(),
            "123456789012345678901234567890"
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "".parse::<BigInt>(),
            Err(BigIntError::Format(_))
        ));
        assert!(matches!(
            "-".parse::<BigInt>(),
            Err(BigIntError::Format(_))
        ));
        assert!(matches!(
            "12-3".parse::<BigInt>(),
            Err(BigIntError::Format(_))
        ));
        assert!(matches!(
            "--5".parse::<BigInt>(),
            Err(BigIntError::Format(_))
        ));
        assert!(matches!(
            "12a".parse::<BigInt>(),
            Err(BigIntError::Format(_))
        ));
        assert!(matches!(
            BigInt::from_str_radix("10", 1),
            Err(BigIntError::Format(_))
        ));
        assert!(matches!(
            BigInt::from_str_radix("10", 37),
            Err(BigIntError::Format(_))
        ));
        assert!(matches!(
            BigInt::from_str_radix("19", 8),
            Err(BigIntError::Format(_))
        ));
    }

    #[test]
    fn test_parse_hex_and_binary() {
        assert_eq!(BigInt::from_str_radix("ff", 16).unwrap(), bi(255));
        assert_eq!(BigInt::from_str_radix("-FF", 16).unwrap(), bi(-255));
        assert_eq!(BigInt::from_str_radix("1010", 2).unwrap(), bi(10));
        assert_eq!(BigInt::from_str_radix("zz", 36).unwrap(), bi(35 * 36 + 35));
        let big = BigInt::from_str_radix("ffffffffffffffffffffffffffffffff", 16).unwrap();
        assert_eq!(big.add(&BigInt::one()), BigInt::one().shl(128));
    }

    #[test]
    fn test_to_string_round_trip_all_radixes() {
        let values = [
            BigInt::zero(),
            bi(1),
            bi(-1),
            bi(255),
            bi(-256),
            bi(i64::MAX),
            bi(i64::MIN + 1),
            BigInt::from_str_radix("123456789abcdef0123456789abcdef0123456789", 16).unwrap(),
        ];
        for v in &values {
            for radix in 2..=36u32 {
                let s = v.to_string_radix(radix);
                let back = BigInt::from_str_radix(&s, radix).unwrap();
                assert_eq!(&back, v, "radix={radix} s={s}");
            }
        }
    }

    #[test]
    fn test_to_string_radix_defaults_to_ten() {
        assert_eq!(bi(123).to_string_radix(1), "123");
        assert_eq!(bi(123).to_string_radix(99), "123");
    }

    #[test]
    fn test_display_matches_decimal() {
        assert_eq!(bi(-12345).to_string(), "-12345");
        assert_eq!(BigInt::zero().to_string(), "0");
        let ten_pow_30 = BigInt::ten().pow(30);
        assert_eq!(ten_pow_30.to_string(), format!("1{}", "0".repeat(30)));
    }

    #[test]
    fn test_byte_array_round_trip() {
        for v in [
            0i64, 1, -1, 127, 128, -128, -129, 255, 256, -255, -256,
            i64::MAX, i64::MIN, 0x1234_5678_9abc_def0,
        ] {
            let b = bi(v);
            let bytes = b.to_bytes_be();
            assert_eq!(BigInt::from_bytes_be(&bytes).unwrap(), b, "v={v}");
        }
    }

    #[test]
    fn test_byte_array_minimality() {
        // Zero is a single zero byte.
        assert_eq!(BigInt::zero().to_bytes_be(), vec![0u8]);
        // 255 needs a leading sign byte; -256 does not.
        assert_eq!(bi(255).to_bytes_be(), vec![0u8, 0xff]);
        assert_eq!(bi(-256).to_bytes_be(), vec![0xffu8, 0x00]);
        assert_eq!(bi(127).to_bytes_be(), vec![0x7fu8]);
        assert_eq!(bi(-128).to_bytes_be(), vec![0x80u8]);
    }

    #[test]
    fn test_from_bytes_errors() {
        assert!(matches!(
            BigInt::from_bytes_be(&[]),
            Err(BigIntError::Format(_))
        ));
    }

    #[test]
    fn test_sign_magnitude_constructor() {
        assert_eq!(
            BigInt::from_sign_bytes_be(1, &[0x01, 0x00]).unwrap(),
            bi(256)
        );
        assert_eq!(
            BigInt::from_sign_bytes_be(-1, &[0x01, 0x00]).unwrap(),
            bi(-256)
        );
        // Zero magnitude is fine with any legal signum.
        assert_eq!(BigInt::from_sign_bytes_be(0, &[0, 0]).unwrap(), bi(0));
        assert_eq!(BigInt::from_sign_bytes_be(1, &[]).unwrap(), bi(0));
        assert!(matches!(
            BigInt::from_sign_bytes_be(0, &[1]),
            Err(BigIntError::Format(_))
        ));
        assert!(matches!(
            BigInt::from_sign_bytes_be(2, &[1]),
            Err(BigIntError::Format(_))
        ));
    }

    #[test]
    fn test_truncating_conversions() {
        assert_eq!(bi(-1).i32_value(), -1);
        assert_eq!(bi(1).shl(32).i32_value(), 0);
        assert_eq!(BigInt::one().shl(31).i32_value(), i32::MIN);
        assert_eq!(bi(i64::MIN).i64_value(), i64::MIN);
        assert_eq!(BigInt::one().shl(64).i64_value(), 0);
        assert_eq!(BigInt::one().shl(63).i64_value(), i64::MIN);
    }

    #[test]
    fn test_exact_conversions() {
        assert_eq!(bi(1000).i32_exact().unwrap(), 1000);
        assert_eq!(bi(i32::MAX as i64).i32_exact().unwrap(), i32::MAX);
        assert_eq!(bi(i32::MIN as i64).i32_exact().unwrap(), i32::MIN);
        assert!(matches!(
            bi(i32::MAX as i64 + 1).i32_exact(),
            Err(BigIntError::OutOfRange(_))
        ));
        assert_eq!(bi(i64::MIN).i64_exact().unwrap(), i64::MIN);
        assert!(matches!(
            BigInt::one().shl(63).i64_exact(),
            Err(BigIntError::OutOfRange(_))
        ));
        assert_eq!(bi(-129).i16_exact().unwrap(), -129);
        assert!(bi(40_000).i16_exact().is_err());
        assert_eq!(bi(-128).i8_exact().unwrap(), -128);
        assert!(bi(128).i8_exact().is_err());
    }

    #[test]
    fn test_float_conversions() {
        assert_eq!(bi(0).f64_value(), 0.0);
        assert_eq!(bi(-123).f64_value(), -123.0);
        assert_eq!(BigInt::one().shl(64).f64_value(), 2f64.powi(64));
        // Beyond the exponent range collapses to infinity.
        let huge = BigInt::one().shl(2048);
        assert_eq!(huge.f64_value(), f64::INFINITY);
        assert_eq!(huge.negate().f64_value(), f64::NEG_INFINITY);
        assert_eq!(BigInt::one().shl(192).f32_value(), f32::INFINITY);
        assert_eq!(bi(1 << 24).f32_value(), 16_777_216.0f32);
    }
}
