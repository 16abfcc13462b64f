//! Primality scenarios, including independent verification of generated
//! primes.

use bigmath_bignum::BigInt;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Independent check: trial division by every odd number to 10^4, then 40
/// Miller-Rabin rounds driven only by the public API.
fn independently_verified_prime(p: &BigInt) -> bool {
    if p <= &BigInt::one() {
        return false;
    }
    if p == &BigInt::two() {
        return true;
    }
    let mut d = 3u64;
    while d < 10_000 {
        let dv = BigInt::from_u64(d);
        if p.remainder(&dv).unwrap().is_zero() {
            return p == &dv;
        }
        d += 2;
    }
    if p.is_even() {
        return false;
    }

    // 40 rounds at fixed small bases; p is far larger than every base.
    let one = BigInt::one();
    let p_minus_one = p.subtract(&one);
    let s = p_minus_one.lowest_set_bit().unwrap();
    let m = p_minus_one.shift_right(s as i32).unwrap();
    'witness: for w in 2u64..42 {
        let mut x = BigInt::from_u64(w).mod_pow(&m, p).unwrap();
        if x.is_one() || x == p_minus_one {
            continue;
        }
        for _ in 0..s - 1 {
            x = x.multiply(&x).modulo(p).unwrap();
            if x == p_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

#[test]
fn mersenne_m20_is_probably_prime() {
    // M20 = 2^4253 - 1, the 20th Mersenne prime.
    let m20 = BigInt::one().shl(4253).subtract(&BigInt::one());
    assert!(m20.is_probable_prime(100));
}

#[test]
fn mersenne_exponent_4251_is_composite() {
    // The neighbor 2^4251 - 1 cannot be prime (4251 = 3 * 13 * 109).
    let m = BigInt::one().shl(4251).subtract(&BigInt::one());
    assert!(!m.is_probable_prime(100));
}

#[test]
fn generated_small_primes_verify_independently() {
    let mut rng = StdRng::seed_from_u64(0x9417);
    for bits in [16usize, 24, 32, 48, 64, 80, 94] {
        let p = BigInt::probable_prime(bits, &mut rng).unwrap();
        assert_eq!(p.bit_len(), bits);
        assert!(independently_verified_prime(&p), "bits={bits} p={p}");
    }
}

#[test]
fn generated_sieve_primes_verify_independently() {
    let mut rng = StdRng::seed_from_u64(0x9418);
    for bits in [95usize, 100, 128, 160] {
        let p = BigInt::probable_prime(bits, &mut rng).unwrap();
        assert_eq!(p.bit_len(), bits);
        assert!(independently_verified_prime(&p), "bits={bits} p={p}");
    }
}

#[test]
fn generated_primes_with_low_certainty_still_have_exact_length() {
    let mut rng = StdRng::seed_from_u64(0x9419);
    let p = BigInt::probable_prime_with_certainty(128, 10, &mut rng).unwrap();
    assert_eq!(p.bit_len(), 128);
}

#[test]
fn next_probable_prime_chain_verifies() {
    let mut p = BigInt::from_u64(1u64 << 40);
    for _ in 0..5 {
        p = p.next_probable_prime().unwrap();
        assert!(independently_verified_prime(&p), "p={p}");
    }
}

#[test]
fn certainty_zero_accepts_composites() {
    assert!(BigInt::from_u64(1_000_001).is_probable_prime(0));
    assert!(!BigInt::from_u64(1_000_001).is_probable_prime(1));
}

#[test]
#[ignore = "a 1024-bit prime search is slow in debug builds"]
fn generated_rsa_sized_prime_verifies() {
    let mut rng = StdRng::seed_from_u64(0x941A);
    let p = BigInt::probable_prime(1024, &mut rng).unwrap();
    assert_eq!(p.bit_len(), 1024);
    assert!(independently_verified_prime(&p));
}
