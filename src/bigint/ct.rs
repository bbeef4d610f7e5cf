//! Fixed-width limb arithmetic for the side-channel-resistant `BigInt` paths.
//!
//! Values are little-endian `u64` limb vectors whose width is declared by
//! the caller or taken from the public modulus. Every loop runs for a count
//! derived from those widths and every data-dependent decision is a `subtle`
//! conditional select, so the instruction trace does not depend on limb
//! values.

use num_bigint::BigUint;
use num_traits::One;
use subtle::{Choice, ConditionallySelectable};

const LIMB_BITS: usize = 64;

/// Number of limbs needed for `bits` bits (at least one)
fn width_for_bits(bits: u64) -> usize {
    usize::try_from(bits.div_ceil(LIMB_BITS as u64)).unwrap_or(usize::MAX).max(1)
}

fn to_limbs(x: &BigUint, width: usize) -> Vec<u64> {
    let mut limbs: Vec<u64> = x.iter_u64_digits().collect();
    limbs.resize(width, 0);
    limbs
}

fn from_limbs(limbs: &[u64]) -> BigUint {
    let bytes: Vec<u8> = limbs.iter().flat_map(|l| l.to_le_bytes()).collect();
    BigUint::from_bytes_le(&bytes)
}

#[inline]
fn adc(a: u64, b: u64, carry: u64) -> (u64, u64) {
    let t = u128::from(a) + u128::from(b) + u128::from(carry);
    (t as u64, (t >> 64) as u64)
}

#[inline]
fn sbb(a: u64, b: u64, borrow: u64) -> (u64, u64) {
    let t = u128::from(a).wrapping_sub(u128::from(b) + u128::from(borrow));
    (t as u64, (t >> 127) as u64)
}

/// `acc + a * b + carry` as (low, high)
#[inline]
fn mac(acc: u64, a: u64, b: u64, carry: u64) -> (u64, u64) {
    let t = u128::from(acc) + u128::from(a) * u128::from(b) + u128::from(carry);
    (t as u64, (t >> 64) as u64)
}

/// `a += b` over equal widths; returns the carry out
fn add_assign(a: &mut [u64], b: &[u64]) -> u64 {
    let mut carry = 0;
    for (x, &y) in a.iter_mut().zip(b) {
        let (s, c) = adc(*x, y, carry);
        *x = s;
        carry = c;
    }
    carry
}

/// `a -= b` over equal widths; returns the borrow out
fn sub_assign(a: &mut [u64], b: &[u64]) -> u64 {
    let mut borrow = 0;
    for (x, &y) in a.iter_mut().zip(b) {
        let (d, bo) = sbb(*x, y, borrow);
        *x = d;
        borrow = bo;
    }
    borrow
}

fn conditional_assign(dst: &mut [u64], src: &[u64], choice: Choice) {
    for (d, s) in dst.iter_mut().zip(src) {
        d.conditional_assign(s, choice);
    }
}

fn conditional_swap(a: &mut [u64], b: &mut [u64], choice: Choice) {
    for (x, y) in a.iter_mut().zip(b.iter_mut()) {
        u64::conditional_swap(x, y, choice);
    }
}

fn shr1(a: &mut [u64]) {
    let mut carry = 0;
    for limb in a.iter_mut().rev() {
        let next = *limb << 63;
        *limb = (*limb >> 1) | carry;
        carry = next;
    }
}

fn low_bit(a: &[u64]) -> Choice {
    Choice::from((a[0] & 1) as u8)
}

/// Schoolbook product with both operands padded to `width` limbs; the
/// declared width alone fixes the loop bounds.
pub(super) fn mul(a: &BigUint, b: &BigUint, width: usize) -> BigUint {
    let a = to_limbs(a, width);
    let b = to_limbs(b, width);
    let mut out = vec![0u64; 2 * width];
    for (i, &ai) in a.iter().enumerate() {
        let mut carry = 0;
        for (j, &bj) in b.iter().enumerate() {
            let (lo, hi) = mac(out[i + j], ai, bj, carry);
            out[i + j] = lo;
            carry = hi;
        }
        out[i + width] = carry;
    }
    from_limbs(&out)
}

/// Limb width for `bits` bits, never below `floor_bits`
pub(super) fn declared_width(bits: u64, floor_bits: u64) -> usize {
    width_for_bits(bits.max(floor_bits))
}

/// Montgomery context for an odd modulus
struct Montgomery {
    modulus: Vec<u64>,
    /// -m^-1 mod 2^64
    m_inv: u64,
    /// R mod m, the Montgomery form of one
    r1: Vec<u64>,
    /// R^2 mod m
    r2: Vec<u64>,
}

impl Montgomery {
    fn new(m: &BigUint) -> Self {
        let width = width_for_bits(m.bits());
        let modulus = to_limbs(m, width);
        let r = BigUint::one() << (width * LIMB_BITS);
        let r1 = &r % m;
        let r2 = (&r1 * &r1) % m;
        Self {
            m_inv: neg_inverse_u64(modulus[0]),
            r1: to_limbs(&r1, width),
            r2: to_limbs(&r2, width),
            modulus,
        }
    }

    fn width(&self) -> usize {
        self.modulus.len()
    }

    /// `a * b * R^-1 mod m` (CIOS), for `a, b < m`
    fn mul(&self, a: &[u64], b: &[u64]) -> Vec<u64> {
        let w = self.width();
        let m = &self.modulus;
        let mut t = vec![0u64; w + 2];
        for &bi in b {
            let mut carry = 0;
            for j in 0..w {
                let (lo, hi) = mac(t[j], a[j], bi, carry);
                t[j] = lo;
                carry = hi;
            }
            let (lo, hi) = adc(t[w], carry, 0);
            t[w] = lo;
            t[w + 1] = hi;

            let u = t[0].wrapping_mul(self.m_inv);
            let (_, mut carry) = mac(t[0], u, m[0], 0);
            for j in 1..w {
                let (lo, hi) = mac(t[j], u, m[j], carry);
                t[j - 1] = lo;
                carry = hi;
            }
            let (lo, hi) = adc(t[w], carry, 0);
            t[w - 1] = lo;
            t[w] = t[w + 1] + hi;
        }

        // t < 2m: subtract m unless that borrows past the top limb
        let mut reduced = t[..w].to_vec();
        let borrow = sub_assign(&mut reduced, m);
        let (_, below_m) = sbb(t[w], 0, borrow);
        conditional_assign(&mut reduced, &t[..w], Choice::from(below_m as u8));
        reduced
    }

    fn to_mont(&self, x: &[u64]) -> Vec<u64> {
        self.mul(x, &self.r2)
    }

    fn from_mont(&self, x: &[u64]) -> Vec<u64> {
        let mut one = vec![0u64; self.width()];
        one[0] = 1;
        self.mul(x, &one)
    }
}

/// Newton iteration for the inverse of an odd limb modulo 2^64, negated
fn neg_inverse_u64(m0: u64) -> u64 {
    let mut inv: u64 = 1;
    for _ in 0..6 {
        inv = inv.wrapping_mul(2u64.wrapping_sub(m0.wrapping_mul(inv)));
    }
    inv.wrapping_neg()
}

/// `base^exp mod m` for odd `m` and `base < m` by a Montgomery ladder
pub(super) fn mod_pow_odd(base: &BigUint, exp: &BigUint, m: &BigUint) -> BigUint {
    let ctx = Montgomery::new(m);
    let width = ctx.width();
    let mut x0 = ctx.r1.clone();
    let mut x1 = ctx.to_mont(&to_limbs(base, width));
    // the exponent is padded to at least the modulus width
    let e = to_limbs(exp, declared_width(exp.bits(), m.bits()));

    for i in (0..e.len() * LIMB_BITS).rev() {
        let bit = Choice::from(((e[i / LIMB_BITS] >> (i % LIMB_BITS)) & 1) as u8);
        conditional_swap(&mut x0, &mut x1, bit);
        x1 = ctx.mul(&x0, &x1);
        x0 = ctx.mul(&x0, &x0);
        conditional_swap(&mut x0, &mut x1, bit);
    }
    from_limbs(&ctx.from_mont(&x0))
}

/// `a * b mod m` for odd `m` and `a, b < m`, by two Montgomery products
pub(super) fn mod_mul_odd(a: &BigUint, b: &BigUint, m: &BigUint) -> BigUint {
    let ctx = Montgomery::new(m);
    let width = ctx.width();
    let ab_over_r = ctx.mul(&to_limbs(a, width), &to_limbs(b, width));
    from_limbs(&ctx.mul(&ab_over_r, &ctx.r2))
}

/// `a + b mod m` for `a, b < m`, with one conditional subtraction
pub(super) fn mod_add(a: &BigUint, b: &BigUint, m: &BigUint) -> BigUint {
    // one spare limb holds the carry of a + b
    let width = width_for_bits(m.bits()) + 1;
    let modulus = to_limbs(m, width);
    let mut sum = to_limbs(a, width);
    add_assign(&mut sum, &to_limbs(b, width));
    let mut reduced = sum.clone();
    let borrow = sub_assign(&mut reduced, &modulus);
    conditional_assign(&mut reduced, &sum, Choice::from(borrow as u8));
    from_limbs(&reduced)
}

/// Inverse of `a < m` modulo odd `m` by binary extended GCD with a fixed
/// iteration count. Returns `None` when `gcd(a, m) != 1`.
///
/// Invariants: `a ≡ u·x`, `b ≡ v·x (mod m)`, `b` odd, `u, v < m`.
pub(super) fn mod_inverse_odd(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    // One spare limb so that u + m never overflows.
    let width = width_for_bits(m.bits()) + 1;
    let modulus = to_limbs(m, width);
    let mut a = to_limbs(a, width);
    let mut b = modulus.clone();
    let mut u = vec![0u64; width];
    u[0] = 1;
    let mut v = vec![0u64; width];

    let iterations = 2 * (width - 1) * LIMB_BITS;
    for _ in 0..iterations {
        let a_odd = low_bit(&a);

        // if a is odd and a < b, swap (a, u) with (b, v)
        let mut diff = a.clone();
        let a_below_b = Choice::from(sub_assign(&mut diff, &b) as u8);
        let swap = a_odd & a_below_b;
        conditional_swap(&mut a, &mut b, swap);
        conditional_swap(&mut u, &mut v, swap);

        // if a is odd: a -= b, u = (u - v) mod m
        let mut a_sub = a.clone();
        sub_assign(&mut a_sub, &b);
        conditional_assign(&mut a, &a_sub, a_odd);

        let mut u_sub = u.clone();
        let borrow = sub_assign(&mut u_sub, &v);
        let mut u_wrapped = u_sub.clone();
        add_assign(&mut u_wrapped, &modulus);
        conditional_assign(&mut u_sub, &u_wrapped, Choice::from(borrow as u8));
        conditional_assign(&mut u, &u_sub, a_odd);

        // a is even now: a /= 2, u = u / 2 mod m
        shr1(&mut a);
        let mut u_plus = u.clone();
        add_assign(&mut u_plus, &modulus);
        let u_odd = low_bit(&u);
        conditional_assign(&mut u, &u_plus, u_odd);
        shr1(&mut u);
    }

    let gcd_is_one = b[0] == 1 && b[1..].iter().all(|&l| l == 0);
    gcd_is_one.then(|| from_limbs(&v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: u64) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn test_limb_roundtrip() {
        let x = (BigUint::one() << 200u32) + n(12345);
        assert_eq!(from_limbs(&to_limbs(&x, 5)), x);
    }

    #[test]
    fn test_neg_inverse() {
        for m0 in [1u64, 3, 0xFFFF_FFFF_FFFF_FFFF, 0x1234_5678_9ABC_DEF1] {
            let inv = neg_inverse_u64(m0);
            assert_eq!(m0.wrapping_mul(inv), u64::MAX);
        }
    }

    #[test]
    fn test_small_mod_pow() {
        assert_eq!(mod_pow_odd(&n(4), &n(13), &n(497)), n(445));
        assert_eq!(mod_pow_odd(&n(0), &n(0), &n(7)), n(1));
        assert_eq!(mod_pow_odd(&n(3), &n(5), &n(1)), n(0));
    }

    #[test]
    fn test_small_inverse() {
        assert_eq!(mod_inverse_odd(&n(3), &n(11)), Some(n(4)));
        assert_eq!(mod_inverse_odd(&n(1), &n(7)), Some(n(1)));
        assert_eq!(mod_inverse_odd(&n(0), &n(1)), Some(n(0)));
        assert_eq!(mod_inverse_odd(&n(3), &n(9)), None);
        assert_eq!(mod_inverse_odd(&n(0), &n(9)), None);
    }

    #[test]
    fn test_mul_matches_biguint() {
        let a = (BigUint::one() << 190u32) - n(1);
        let b = (BigUint::one() << 70u32) + n(99);
        assert_eq!(mul(&a, &b, 3), &a * &b);
        assert_eq!(mul(&a, &n(0), 3), n(0));
        assert_eq!(mul(&n(7), &n(6), 4), n(42));
    }

    #[test]
    fn test_declared_width_floor() {
        assert_eq!(declared_width(1, 256), 4);
        assert_eq!(declared_width(0, 0), 1);
        assert_eq!(declared_width(300, 256), 5);
    }

    #[test]
    fn test_mod_mul_and_add() {
        let m = n(1_000_003);
        for (a, b) in [(0u64, 5u64), (1, 1), (999_999, 1_000_002), (123_456, 654_321)] {
            assert_eq!(mod_mul_odd(&n(a), &n(b), &m), (n(a) * n(b)) % &m);
            assert_eq!(mod_add(&n(a), &n(b), &m), (n(a) + n(b)) % &m);
        }
        let big_m = (BigUint::one() << 255u32) - n(19);
        let x = &big_m - n(1);
        assert_eq!(mod_add(&x, &x, &big_m), (&x + &x) % &big_m);
        assert_eq!(mod_mul_odd(&x, &x, &big_m), n(1));
    }
}
