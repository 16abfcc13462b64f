//! Schönhage-Strassen multiplication and squaring.
//!
//! Operands are split into pieces of 2^(n-1) bits. The product is computed
//! twice in cheap residue systems and recombined by CRT: once modulo
//! 2^(n+2) (by packing the low n+2 bits of each piece, spaced 3n+5 bits
//! apart, into one recursive multiplication), and once modulo the Fermat
//! number F_n = 2^(2^n)+1 (by a length-2^n number-theoretic transform whose
//! root of unity is 2). Values in Z/F_n are held in arrays of 2^(n+1) bits so
//! the single overflow bit of F_n - 1 is representable.
//!
//! Everything in this module works on little-endian limb buffers (least
//! significant limb first); the facade reverses magnitudes on the way in and
//! out. Callers guarantee operands of at least a few hundred bits so that a
//! piece is at least one limb.

use crate::bigint::BigInt;
use crate::magnitude::Limb;

/// Facade: SS product of two signed values.
pub(crate) fn multiply_ss(a: &BigInt, b: &BigInt) -> BigInt {
    if a.is_zero() || b.is_zero() {
        return BigInt::zero();
    }
    let signum = a.signum() * b.signum();
    let a_le = reverse(a.mag());
    let b_le = reverse(b.mag());
    let a_bits = crate::magnitude::mag_bit_len(a.mag());
    let b_bits = crate::magnitude::mag_bit_len(b.mag());

    let c_le = mult_core(&a_le, a_bits, &b_le, b_bits);
    BigInt::from_stripped_mag(reverse(&c_le), signum)
}

/// Facade: SS square of a signed value.
pub(crate) fn square_ss(a: &BigInt) -> BigInt {
    if a.is_zero() {
        return BigInt::zero();
    }
    let a_le = reverse(a.mag());
    let a_bits = crate::magnitude::mag_bit_len(a.mag());
    let c_le = square_core(&a_le, a_bits);
    BigInt::from_stripped_mag(reverse(&c_le), 1)
}

fn usize_bit_len(x: usize) -> usize {
    (usize::BITS - x.leading_zeros()) as usize
}

/// Core SS multiply on little-endian limb buffers holding positive numbers.
fn mult_core(a: &[Limb], a_bit_len: usize, b: &[Limb], b_bit_len: usize) -> Vec<Limb> {
    // M = the larger bit count; find the lowest m with m >= log2(2M).
    let big_m = a_bit_len.max(b_bit_len);
    let m = usize_bit_len(2 * big_m - 2);
    let n = m / 2 + 1;

    let even = m % 2 == 0;
    let num_pieces = if even { 1usize << n } else { 1usize << (n + 1) };
    let piece_size = 1usize << (n - 1 - 5); // in limbs

    // Pack the low n+2 bits of each piece, 3n+5 bits apart, into u and v.
    let num_pieces_a = (a.len() + piece_size) / piece_size;
    let mut u = vec![0u32; (num_pieces_a * (3 * n + 5) + 31) / 32];
    let mut u_bit_len = 0;
    let mut i = 0;
    while i < num_pieces_a && i * piece_size < a.len() {
        append_bits(&mut u, u_bit_len, a, i * piece_size, n + 2);
        u_bit_len += 3 * n + 5;
        i += 1;
    }
    let num_pieces_b = (b.len() + piece_size) / piece_size;
    let mut v = vec![0u32; (num_pieces_b * (3 * n + 5) + 31) / 32];
    let mut v_bit_len = 0;
    let mut i = 0;
    while i < num_pieces_b && i * piece_size < b.len() {
        append_bits(&mut v, v_bit_len, b, i * piece_size, n + 2);
        v_bit_len += 3 * n + 5;
        i += 1;
    }

    let gamma = mult_reverse(&u, &v);
    let mut gammai = split_bits(&gamma, 3 * n + 5);
    let half_num_pcs = num_pieces / 2;

    // Fold the gamma pieces into z' mod 2^(n+2): four overlapping windows
    // spaced half_num_pcs apart, alternating subtract/add/subtract.
    fold_mod_pow2(&mut gammai, half_num_pcs, n);

    // z'' mod Fn via the Fermat Number Transform.
    let target = 1usize << (n + 1 - 5);
    let mut ai = split_ints(a, half_num_pcs, piece_size, target);
    let mut bi = split_ints(b, half_num_pcs, piece_size, target);
    dft(&mut ai, m, n);
    dft(&mut bi, m, n);
    mod_fn_all(&mut ai);
    mod_fn_all(&mut bi);
    let mut c: Vec<Vec<Limb>> = (0..half_num_pcs)
        .map(|i| mult_mod_fn(&ai[i], &bi[i]))
        .collect();
    idft(&mut c, m, n);
    mod_fn_all(&mut c);

    recombine(&gammai, &c, m, n, half_num_pcs)
}

/// Core SS square; mirrors [`mult_core`] with one operand.
fn square_core(a: &[Limb], a_bit_len: usize) -> Vec<Limb> {
    let big_m = a_bit_len;
    let m = usize_bit_len(2 * big_m - 2);
    let n = m / 2 + 1;

    let even = m % 2 == 0;
    let num_pieces = if even { 1usize << n } else { 1usize << (n + 1) };
    let piece_size = 1usize << (n - 1 - 5);

    let num_pieces_a = (a.len() + piece_size) / piece_size;
    let mut u = vec![0u32; (num_pieces_a * (3 * n + 5) + 31) / 32];
    let mut u_bit_len = 0;
    let mut i = 0;
    while i < num_pieces_a && i * piece_size < a.len() {
        append_bits(&mut u, u_bit_len, a, i * piece_size, n + 2);
        u_bit_len += 3 * n + 5;
        i += 1;
    }

    let gamma = square_reverse(&u);
    let mut gammai = split_bits(&gamma, 3 * n + 5);
    let half_num_pcs = num_pieces / 2;

    fold_mod_pow2(&mut gammai, half_num_pcs, n);

    let target = 1usize << (n + 1 - 5);
    let mut ai = split_ints(a, half_num_pcs, piece_size, target);
    dft(&mut ai, m, n);
    mod_fn_all(&mut ai);
    let mut c: Vec<Vec<Limb>> = (0..half_num_pcs).map(|i| square_mod_fn(&ai[i])).collect();
    idft(&mut c, m, n);
    mod_fn_all(&mut c);

    recombine(&gammai, &c, m, n, half_num_pcs)
}

/// The four-window fold that reduces the packed recursive product modulo
/// 2^(n+2). Reads see the values written by earlier passes, which is what
/// the congruence arithmetic requires.
fn fold_mod_pow2(gammai: &mut [Vec<Limb>], half_num_pcs: usize, n: usize) {
    let glen = gammai.len();
    for i in 0..glen.saturating_sub(half_num_pcs) {
        let src = gammai[i + half_num_pcs].clone();
        sub_mod_pow2(&mut gammai[i], &src, n + 2);
    }
    for i in 0..glen.saturating_sub(2 * half_num_pcs) {
        let src = gammai[i + 2 * half_num_pcs].clone();
        add_mod_pow2(&mut gammai[i], &src, n + 2);
    }
    for i in 0..glen.saturating_sub(3 * half_num_pcs) {
        let src = gammai[i + 3 * half_num_pcs].clone();
        sub_mod_pow2(&mut gammai[i], &src, n + 2);
    }
}

/// CRT recombination: for each piece, eta = (z'_i - c_i) mod 2^(n+2), and
/// c_i + eta*(2^(2^n)+1) is added into the accumulator at bit position
/// i*2^(n-1). The result is finally reduced modulo F_m.
fn recombine(
    gammai: &[Vec<Limb>],
    c: &[Vec<Limb>],
    m: usize,
    n: usize,
    half_num_pcs: usize,
) -> Vec<Limb> {
    let mut z = vec![0u32; 1usize << (m + 1 - 5)];
    for i in 0..half_num_pcs {
        let mut eta = if i >= gammai.len() {
            vec![0u32; (n + 2 + 31) / 32]
        } else {
            gammai[i].clone()
        };
        sub_mod_pow2(&mut eta, &c[i], n + 2);

        let shift = i * (1usize << (n - 1 - 5)); // in limbs
        add_shifted(&mut z, &c[i], shift);
        add_shifted(&mut z, &eta, shift);
        add_shifted(&mut z, &eta, shift + (1usize << (n - 5)));
    }
    mod_fn(&mut z);
    z
}

/// Forward Fermat Number Transform over Z/F_n, in place. `a` is the lower
/// half of the logical transform input; the upper half is implicitly zero.
fn dft(a: &mut [Vec<Limb>], m: usize, n: usize) {
    let even = m % 2 == 0;
    let len = a.len();
    let mut v = 1usize;
    let mut slen = len / 2;

    while slen > 0 {
        let mut j = 0;
        while j < len {
            let mut idx = j;
            let x = dft_exponent(n, v, idx + len, even);
            for _ in 0..slen {
                let d = cyclic_shift_left_bits(&a[idx + slen], x);
                a[idx + slen] = a[idx].clone();
                add_mod_fn(&mut a[idx], &d);
                sub_mod_fn(&mut a[idx + slen], &d, 1usize << n);
                idx += 1;
            }
            j += 2 * slen;
        }
        v += 1;
        slen /= 2;
    }
}

/// The power of two (the NTT root) for a DFT butterfly. When m is odd the
/// root is 4, expressed by doubling the exponent so the root can be taken
/// as 2 throughout; the `even` flag selects the adjustment.
fn dft_exponent(n: usize, v: usize, idx: usize, even: bool) -> usize {
    // Take bits n-v..n-1 of idx, reverse them, shift left by n-v-1.
    let mut x = ((idx as u32).reverse_bits() << (n - v)) >> (31 - n);
    if even {
        x >>= 1;
    }
    x as usize
}

/// Inverse transform, in place, with the final halving step folded into the
/// per-butterfly shifts.
fn idft(a: &mut [Vec<Limb>], m: usize, n: usize) {
    let even = m % 2 == 0;
    let len = a.len();
    let mut v = n as isize - 1;
    let mut slen = 1usize;

    while slen <= len / 2 {
        let mut j = 0;
        while j < len {
            let mut idx = j;
            let mut idx2 = idx + slen;
            let x = idft_exponent(n, v, idx, even);
            for _ in 0..slen {
                let mut c = a[idx].clone();
                let upper = a[idx2].clone();
                add_mod_fn(&mut a[idx], &upper);
                let halved = cyclic_shift_right(&a[idx], 1);
                a[idx] = halved;

                sub_mod_fn(&mut c, &upper, 1usize << n);
                a[idx2] = cyclic_shift_right(&c, x);
                idx += 1;
                idx2 += 1;
            }
            j += 2 * slen;
        }
        v -= 1;
        slen *= 2;
    }
}

fn idft_exponent(n: usize, v: isize, idx: usize, even: bool) -> usize {
    let nv = (n as isize - v) as u32;
    let mut x = (((idx as u32).reverse_bits() << nv) >> (32 - n)) as usize;
    x += if even {
        1usize << nv
    } else {
        1usize << (nv - 1)
    };
    x + 1
}

/// a += b modulo F_n, where 2^n is the bit count of half the array. Any
/// carry off the top recirculates into the low limb because F_n = 1 mod
/// 2^(2^n).
fn add_mod_fn(a: &mut [Limb], b: &[Limb]) {
    let mut carry = false;
    for i in 0..a.len() {
        let (s1, c1) = a[i].overflowing_add(b[i]);
        let (s2, c2) = s1.overflowing_add(carry as u32);
        a[i] = s2;
        carry = c1 || c2;
    }
    let mut i = 0;
    while carry {
        let (s, c) = a[i].overflowing_add(1);
        a[i] = s;
        carry = c;
        i += 1;
        if i >= a.len() {
            i = 0;
        }
    }
}

/// a -= b modulo F_n, realized as an addition of b shifted up by half the
/// ring (2^(2^n) = -1 mod F_n). `pow2n` is 2^n in bits.
fn sub_mod_fn(a: &mut [Limb], b: &[Limb], pow2n: usize) {
    add_mod_fn(a, &cyclic_shift_left_elements(b, pow2n / 32));
}

/// Componentwise product in Z/F_n. Inputs are reduced mod F_n; the value
/// F_n - 1 = 2^(2^n) occupies the single top bit and is handled specially.
fn mult_mod_fn(a: &[Limb], b: &[Limb]) -> Vec<Limb> {
    let half = a.len() / 2;
    let a0 = &a[..half];
    let b0 = &b[..half];
    let mut c = mult_reverse(a0, b0);
    c.resize(a.len(), 0);
    // If a = Fn-1, adding b*2^(2^n) is the same as subtracting b.
    if a[half] == 1 {
        let mut b0_pad = b0.to_vec();
        b0_pad.resize(c.len(), 0);
        sub_mod_fn(&mut c, &b0_pad, half * 32);
    }
    if b[half] == 1 {
        let mut a0_pad = a0.to_vec();
        a0_pad.resize(c.len(), 0);
        sub_mod_fn(&mut c, &a0_pad, half * 32);
    }
    c
}

/// Componentwise square in Z/F_n; (F_n - 1)^2 = 1.
fn square_mod_fn(a: &[Limb]) -> Vec<Limb> {
    let half = a.len() / 2;
    let mut c = square_reverse(&a[..half]);
    c.resize(a.len(), 0);
    if a[half] == 1 {
        c[0] = 1;
    }
    c
}

/// Reduce `a` modulo F_n where 2^n is half the bit count of `a`: subtract
/// the upper half from the lower half, zero the upper half, and wrap any
/// borrow back in as +1.
fn mod_fn(a: &mut [Limb]) {
    let len = a.len();
    let half = len / 2;
    let mut borrow = false;
    for i in 0..half {
        let bi = a[half + i];
        let (d1, c1) = a[i].overflowing_sub(bi);
        let (d2, c2) = d1.overflowing_sub(borrow as u32);
        a[i] = d2;
        borrow = c1 || c2;
    }
    for limb in a[half..].iter_mut() {
        *limb = 0;
    }
    if borrow {
        let mut j = 0;
        loop {
            let (s, c) = a[j].overflowing_add(1);
            a[j] = s;
            if !c {
                break;
            }
            j += 1;
            if j >= len {
                j = 0;
            }
        }
    }
}

fn mod_fn_all(a: &mut [Vec<Limb>]) {
    for piece in a.iter_mut() {
        mod_fn(piece);
    }
}

/// Cyclic right shift (towards the low bits) by `num_bits`, i.e. a
/// multiplication by 2^(-num_bits) mod F_n. Returns a new array of the same
/// length.
fn cyclic_shift_right(a: &[Limb], num_bits: usize) -> Vec<Limb> {
    let len = a.len();
    let num_elements = num_bits / 32;
    let mut b = vec![0u32; len];
    b[..len - num_elements].copy_from_slice(&a[num_elements..]);
    b[len - num_elements..].copy_from_slice(&a[..num_elements]);

    let num_bits = num_bits % 32;
    if num_bits != 0 {
        let b0 = b[0];
        b[0] >>= num_bits;
        for i in 1..len {
            b[i - 1] |= b[i] << (32 - num_bits);
            b[i] >>= num_bits;
        }
        b[len - 1] |= b0 << (32 - num_bits);
    }
    b
}

/// Cyclic left shift (towards the high bits) by `num_bits`, i.e. a
/// multiplication by 2^num_bits mod F_n.
fn cyclic_shift_left_bits(a: &[Limb], num_bits: usize) -> Vec<Limb> {
    let mut b = cyclic_shift_left_elements(a, num_bits / 32);
    let num_bits = num_bits % 32;
    if num_bits != 0 {
        let len = b.len();
        let bhi = b[len - 1];
        b[len - 1] <<= num_bits;
        for i in (1..len).rev() {
            b[i] |= b[i - 1] >> (32 - num_bits);
            b[i - 1] <<= num_bits;
        }
        b[0] |= bhi >> (32 - num_bits);
    }
    b
}

/// Cyclic shift towards the higher indices by whole limbs.
fn cyclic_shift_left_elements(a: &[Limb], num_elements: usize) -> Vec<Limb> {
    let len = a.len();
    let mut b = vec![0u32; len];
    b[num_elements..].copy_from_slice(&a[..len - num_elements]);
    b[..num_elements].copy_from_slice(&a[len - num_elements..]);
    b
}

/// a += b << (32 * num_elements), unsigned; elements of b shifted beyond
/// `a` are dropped by the caller's sizing.
fn add_shifted(a: &mut [Limb], b: &[Limb], num_elements: usize) {
    let mut carry = false;
    let mut i = 0;
    let limit = b.len().min(a.len() - num_elements);
    while i < limit {
        let ai = a[i + num_elements];
        let (s1, c1) = ai.overflowing_add(b[i]);
        let (s2, c2) = s1.overflowing_add(carry as u32);
        a[i + num_elements] = s2;
        carry = c1 || c2;
        i += 1;
    }
    while carry {
        let idx = i + num_elements;
        let (s, c) = a[idx].overflowing_add(1);
        a[idx] = s;
        carry = c;
        i += 1;
    }
}

/// a = (a + b) mod 2^num_bits, in place.
fn add_mod_pow2(a: &mut [Limb], b: &[Limb], num_bits: usize) {
    let num_elements = (num_bits + 31) / 32;
    let mut carry = false;
    for i in 0..num_elements {
        let bv = if i < b.len() { b[i] } else { 0 };
        let (s1, c1) = a[i].overflowing_add(bv);
        let (s2, c2) = s1.overflowing_add(carry as u32);
        a[i] = s2;
        carry = c1 || c2;
    }
    let rem = num_bits % 32;
    if rem != 0 {
        a[num_elements - 1] &= u32::MAX >> (32 - rem);
    }
    for limb in a[num_elements..].iter_mut() {
        *limb = 0;
    }
}

/// a = (a - b) mod 2^num_bits, in place.
fn sub_mod_pow2(a: &mut [Limb], b: &[Limb], num_bits: usize) {
    let num_elements = (num_bits + 31) / 32;
    let mut borrow = false;
    for i in 0..num_elements {
        let bv = if i < b.len() { b[i] } else { 0 };
        let (d1, c1) = a[i].overflowing_sub(bv);
        let (d2, c2) = d1.overflowing_sub(borrow as u32);
        a[i] = d2;
        borrow = c1 || c2;
    }
    let rem = num_bits % 32;
    if rem != 0 {
        a[num_elements - 1] &= u32::MAX >> (32 - rem);
    }
    for limb in a[num_elements..].iter_mut() {
        *limb = 0;
    }
}

/// Copies `b_bit_len` bits of `b` starting at limb `b_start` into `a`
/// starting at bit `a_bit_len`. `b_bit_len` is at most 32.
fn append_bits(a: &mut [Limb], a_bit_len: usize, b: &[Limb], b_start: usize, b_bit_len: usize) {
    let mut a_idx = a_bit_len / 32;
    let bit32 = a_bit_len % 32;

    for i in b_start..b_start + b_bit_len / 32 {
        if bit32 > 0 {
            a[a_idx] |= b[i] << bit32;
            a_idx += 1;
            a[a_idx] = b[i] >> (32 - bit32);
        } else {
            a[a_idx] = b[i];
            a_idx += 1;
        }
    }

    let rem = b_bit_len % 32;
    if rem > 0 {
        let b_idx = b_bit_len / 32;
        let mut bi = b[b_start + b_idx];
        bi &= u32::MAX >> (32 - rem);
        a[a_idx] |= bi << bit32;
        if bit32 + rem > 32 {
            a[a_idx + 1] = bi >> (32 - bit32);
        }
    }
}

/// Splits `a` into pieces `bit_length` bits long, each padded to whole
/// limbs.
fn split_bits(a: &[Limb], bit_length: usize) -> Vec<Vec<Limb>> {
    let num_pieces = (a.len() * 32 + bit_length - 1) / bit_length;
    let piece_length = (bit_length + 31) / 32;
    let mut b = vec![vec![0u32; piece_length]; num_pieces];

    let mut a_int_idx = 0;
    let mut a_bit_idx = 0;
    for i in 0..num_pieces {
        let mut bits_remaining = bit_length.min(a.len() * 32 - i * bit_length);
        let mut b_int_idx = 0;
        let mut b_bit_idx = 0;
        while bits_remaining > 0 {
            let bits_to_copy = (32 - a_bit_idx)
                .min(32 - b_bit_idx)
                .min(bits_remaining);
            let mut mask = a[a_int_idx] >> a_bit_idx;
            mask &= u32::MAX >> (32 - bits_to_copy);
            mask <<= b_bit_idx;
            b[i][b_int_idx] |= mask;
            bits_remaining -= bits_to_copy;
            a_bit_idx += bits_to_copy;
            if a_bit_idx >= 32 {
                a_bit_idx -= 32;
                a_int_idx += 1;
            }
            b_bit_idx += bits_to_copy;
            if b_bit_idx >= 32 {
                b_bit_idx -= 32;
                b_int_idx += 1;
            }
        }
    }
    b
}

/// Splits `a` into `num_pieces` pieces of `piece_size` limbs, each padded to
/// `target_piece_size` limbs.
fn split_ints(
    a: &[Limb],
    num_pieces: usize,
    piece_size: usize,
    target_piece_size: usize,
) -> Vec<Vec<Limb>> {
    let mut ai = vec![vec![0u32; target_piece_size]; num_pieces];
    let full = a.len() / piece_size;
    for i in 0..full {
        ai[i][..piece_size].copy_from_slice(&a[i * piece_size..(i + 1) * piece_size]);
    }
    let rem = a.len() % piece_size;
    if rem > 0 {
        ai[full][..rem].copy_from_slice(&a[full * piece_size..]);
    }
    ai
}

/// Recursive product of two little-endian positive numbers; the recursion
/// sees a much smaller problem and drops back to Toom-Cook or below.
fn mult_reverse(a: &[Limb], b: &[Limb]) -> Vec<Limb> {
    let a_bi = BigInt::from_stripped_mag(reverse(a), 1);
    let b_bi = BigInt::from_stripped_mag(reverse(b), 1);
    reverse(a_bi.multiply(&b_bi).mag())
}

fn square_reverse(a: &[Limb]) -> Vec<Limb> {
    let a_bi = BigInt::from_stripped_mag(reverse(a), 1);
    reverse(a_bi.square().mag())
}

fn reverse(a: &[Limb]) -> Vec<Limb> {
    a.iter().rev().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiply::multiply_toom_cook3;

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
        let mut mag: Vec<u32> = (0..limbs).map(|_| next() as u32).collect();
        mag[0] |= 0x8000_0000; // pin the bit length
        BigInt::from_mag(mag, 1)
    }

    #[test]
    fn test_ss_matches_toom_small() {
        let mut next = rng(7);
        // Around 10_000 bits: far below the automatic crossover, but the
        // transform machinery is identical.
        for &limbs in &[10, 32, 100, 313] {
            let a = random_bigint(limbs, &mut next);
            let b = random_bigint(limbs, &mut next);
            assert_eq!(
                multiply_ss(&a, &b),
                a.multiply(&b),
                "limbs={limbs}"
            );
        }
    }

    #[test]
    fn test_ss_unequal_lengths_and_signs() {
        let mut next = rng(8);
        let a = random_bigint(200, &mut next);
        let b = random_bigint(57, &mut next);
        let expected = a.multiply(&b);
        assert_eq!(multiply_ss(&a, &b), expected);
        assert_eq!(multiply_ss(&a.negate(), &b), expected.negate());
        assert_eq!(multiply_ss(&a.negate(), &b.negate()), expected);
    }

    #[test]
    fn test_ss_square_matches_multiply() {
        let mut next = rng(9);
        for &limbs in &[12, 64, 250] {
            let a = random_bigint(limbs, &mut next);
            assert_eq!(square_ss(&a), a.multiply(&a), "limbs={limbs}");
        }
    }

    #[test]
    fn test_ss_power_of_two_sizes() {
        // Exercise both parities of m around exact powers of two.
        let mut next = rng(10);
        for &bits in &[8192usize, 16384, 16416] {
            let limbs = bits / 32;
            let a = random_bigint(limbs, &mut next);
            let b = random_bigint(limbs, &mut next);
            assert_eq!(
                multiply_ss(&a, &b),
                multiply_toom_cook3(&a, &b),
                "bits={bits}"
            );
        }
    }

    #[test]
    fn test_cyclic_shifts_invert() {
        let a: Vec<u32> = (0..8).map(|i| 0x0101_0101u32.wrapping_mul(i + 3)).collect();
        for shift in [1usize, 31, 32, 33, 100, 255] {
            let left = cyclic_shift_left_bits(&a, shift);
            assert_eq!(cyclic_shift_right(&left, shift), a, "shift={shift}");
        }
    }

    #[test]
    fn test_add_mod_fn_wraps_carry() {
        // All-ones plus one wraps around to one (carry recirculates).
        let mut a = vec![u32::MAX; 4];
        let b = {
            let mut b = vec![0u32; 4];
            b[0] = 1;
            b
        };
        add_mod_fn(&mut a, &b);
        assert_eq!(a, vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_split_and_append_round_trip() {
        let a: Vec<u32> = vec![0xdead_beef, 0x0123_4567, 0x89ab_cdef, 0xfeed_f00d];
        let pieces = split_bits(&a, 13);
        // Reassemble with append_bits and compare.
        let total_bits = a.len() * 32;
        let mut rebuilt = vec![0u32; a.len()];
        let mut bit = 0;
        for piece in &pieces {
            let take = 13.min(total_bits - bit);
            append_bits(&mut rebuilt, bit, piece, 0, take);
            bit += take;
            if bit >= total_bits {
                break;
            }
        }
        assert_eq!(rebuilt, a);
    }
}
