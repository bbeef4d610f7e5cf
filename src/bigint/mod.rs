//! Arbitrary-precision signed integers with a full modular-arithmetic API.
//!
//! `BigInt` is an immutable value type over `num-bigint`. The semantics are
//! pinned explicitly rather than inherited from the backing library:
//! - `divide` truncates toward zero, `remainder` takes the dividend's sign
//! - `modulo` always lands in `[0, m)`
//! - `shift_right` floors, and negative shift amounts flip direction
//!
//! The `*_sec` methods run on the fixed-width limb engine in [`ct`] and must be
//! used whenever an operand is a secret key or nonce.

mod ct;
mod prime;

pub use prime::{BlumPair, PrimeGenerator, MIN_BLUM_PAIR_BITS};

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

use num_bigint::{BigInt as Int, BigUint, Sign};
use num_integer::Integer;
use num_traits::{Num, One, Signed, ToPrimitive, Zero};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use tracing::debug;

use crate::error::{CryptoError, CryptoResult};

/// Minimum operand width of [`BigInt::multiply_sec`], one secp256k1 scalar
pub const SEC_WIDTH_BITS: u64 = 256;

/// Primes used for cheap trial division before Miller-Rabin
const SMALL_PRIMES: [u32; 54] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191,
    193, 197, 199, 211, 223, 227, 229, 233, 239, 241, 251,
];

/// An arbitrary-precision signed integer.
///
/// Canonical form is unique per value, so structural equality, ordering and
/// hashing all agree with numeric equality.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BigInt(Int);

impl BigInt {
    /// Zero
    #[must_use]
    pub fn zero() -> Self {
        Self(Int::zero())
    }

    /// One
    #[must_use]
    pub fn one() -> Self {
        Self(Int::one())
    }

    /// Two
    #[must_use]
    pub fn two() -> Self {
        Self(Int::from(2u8))
    }

    /// Parse a string in the given radix (2..=36), with an optional sign.
    ///
    /// # Errors
    /// Returns `Parse` for an unsupported radix, an empty digit string or a
    /// character that is not a digit in `radix`.
    pub fn parse(text: &str, radix: u32) -> CryptoResult<Self> {
        if !(2..=36).contains(&radix) {
            return Err(CryptoError::Parse(format!("unsupported radix {radix}")));
        }
        let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(CryptoError::Parse(format!(
                "'{text}' is not a base-{radix} integer"
            )));
        }
        let magnitude = BigUint::from_str_radix(digits, radix)
            .map_err(|e| CryptoError::Parse(e.to_string()))?;
        let sign = if text.starts_with('-') { Sign::Minus } else { Sign::Plus };
        Ok(Self(Int::from_biguint(sign, magnitude)))
    }

    /// Parse a hexadecimal string (no `0x` prefix)
    ///
    /// # Errors
    /// Returns `Parse` if the text is not hexadecimal.
    pub fn from_hex(text: &str) -> CryptoResult<Self> {
        Self::parse(text, 16)
    }

    /// Decode a big-endian two's-complement byte string.
    /// An empty slice decodes to zero.
    #[must_use]
    pub fn from_signed_bytes(bytes: &[u8]) -> Self {
        Self(Int::from_signed_bytes_be(bytes))
    }

    /// Decode a big-endian magnitude as a non-negative integer
    #[must_use]
    pub fn from_unsigned_bytes(bytes: &[u8]) -> Self {
        Self(Int::from_bytes_be(Sign::Plus, bytes))
    }

    /// Build from a sign (`-1`, `0`, `1`) and a big-endian magnitude.
    /// A zero sign yields zero whatever the magnitude.
    ///
    /// # Errors
    /// Returns `Domain` for a sign outside `{-1, 0, 1}`.
    pub fn from_sign_magnitude(signum: i32, magnitude: &[u8]) -> CryptoResult<Self> {
        let sign = match signum {
            -1 => Sign::Minus,
            0 => return Ok(Self::zero()),
            1 => Sign::Plus,
            other => return Err(CryptoError::Domain(format!("invalid signum {other}"))),
        };
        Ok(Self(Int::from_bytes_be(sign, magnitude)))
    }

    /// Uniform random integer in `[0, 2^bits)` drawn from `rng`
    pub fn random_bits_with_rng<R: RngCore + CryptoRng + ?Sized>(bits: u64, rng: &mut R) -> Self {
        if bits == 0 {
            return Self::zero();
        }
        let byte_len = usize::try_from(bits.div_ceil(8)).unwrap_or(usize::MAX);
        let mut bytes = vec![0u8; byte_len];
        rng.fill_bytes(&mut bytes);
        let excess = byte_len as u64 * 8 - bits;
        bytes[0] &= 0xFF >> excess;
        Self::from_unsigned_bytes(&bytes)
    }

    /// Uniform random integer in `[0, 2^bits)` from the OS CSPRNG
    #[must_use]
    pub fn random_bits(bits: u64) -> Self {
        Self::random_bits_with_rng(bits, &mut OsRng)
    }

    /// -1, 0 or 1
    #[must_use]
    pub fn signum(&self) -> i32 {
        match self.0.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        }
    }

    /// Whether the value is zero
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Whether the value is odd
    #[must_use]
    pub fn is_odd(&self) -> bool {
        self.0.is_odd()
    }

    /// Whether the value is strictly negative
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Number of bits in the minimal two's-complement representation,
    /// excluding the sign bit (`bit_length(-1) == 0`).
    #[must_use]
    pub fn bit_length(&self) -> u64 {
        if self.0.is_negative() {
            (self.0.magnitude() - 1u32).bits()
        } else {
            self.0.bits()
        }
    }

    /// Test bit `n` of the two's-complement representation
    #[must_use]
    pub fn test_bit(&self, n: u64) -> bool {
        self.0.bit(n)
    }

    /// Convert to `i64` when it fits
    #[must_use]
    pub fn to_i64(&self) -> Option<i64> {
        self.0.to_i64()
    }

    /// Render in the given radix (lowercase digits)
    #[must_use]
    pub fn to_str_radix(&self, radix: u32) -> String {
        self.0.to_str_radix(radix)
    }

    /// Sum
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        Self(&self.0 + &other.0)
    }

    /// Difference
    #[must_use]
    pub fn subtract(&self, other: &Self) -> Self {
        Self(&self.0 - &other.0)
    }

    /// Product
    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        Self(&self.0 * &other.0)
    }

    /// Additive inverse
    #[must_use]
    pub fn negate(&self) -> Self {
        Self(-&self.0)
    }

    /// Absolute value
    #[must_use]
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Quotient truncated toward zero
    ///
    /// # Errors
    /// Returns `Domain` on division by zero.
    pub fn divide(&self, divisor: &Self) -> CryptoResult<Self> {
        Ok(self.div_rem(divisor)?.0)
    }

    /// Remainder of truncated division; takes the dividend's sign
    ///
    /// # Errors
    /// Returns `Domain` on division by zero.
    pub fn remainder(&self, divisor: &Self) -> CryptoResult<Self> {
        Ok(self.div_rem(divisor)?.1)
    }

    /// Truncated quotient and remainder
    ///
    /// # Errors
    /// Returns `Domain` on division by zero.
    pub fn div_rem(&self, divisor: &Self) -> CryptoResult<(Self, Self)> {
        if divisor.is_zero() {
            return Err(CryptoError::Domain("division by zero".into()));
        }
        let (q, r) = self.0.div_rem(&divisor.0);
        Ok((Self(q), Self(r)))
    }

    /// Least non-negative residue modulo `m`
    ///
    /// # Errors
    /// Returns `Domain` when `m <= 0`.
    pub fn modulo(&self, m: &Self) -> CryptoResult<Self> {
        check_modulus(m)?;
        Ok(self.reduce(m))
    }

    /// `modulo` for a modulus already known to be positive
    pub(crate) fn reduce(&self, m: &Self) -> Self {
        Self(self.0.mod_floor(&m.0))
    }

    /// Greatest common divisor, always non-negative
    #[must_use]
    pub fn gcd(&self, other: &Self) -> Self {
        Self(self.0.gcd(&other.0))
    }

    /// `self^exponent`
    #[must_use]
    pub fn pow(&self, exponent: u32) -> Self {
        Self(num_traits::pow(self.0.clone(), exponent as usize))
    }

    /// `self^exponent mod m`, by square-and-multiply with a reduction after
    /// every product. A negative exponent raises the modular inverse.
    ///
    /// # Errors
    /// Returns `Domain` when `m <= 0`, or when the exponent is negative and
    /// `self` is not invertible modulo `m`.
    pub fn mod_pow(&self, exponent: &Self, m: &Self) -> CryptoResult<Self> {
        check_modulus(m)?;
        if m.0.is_one() {
            return Ok(Self::zero());
        }
        let base = if exponent.is_negative() {
            self.mod_inverse(m)?
        } else {
            self.reduce(m)
        };
        let e = exponent.0.magnitude();
        let mut result = Int::one();
        for i in (0..e.bits()).rev() {
            result = (&result * &result).mod_floor(&m.0);
            if e.bit(i) {
                result = (&result * &base.0).mod_floor(&m.0);
            }
        }
        Ok(Self(result))
    }

    /// Multiplicative inverse modulo `m` via the extended Euclidean algorithm
    ///
    /// # Errors
    /// Returns `Domain` when `m <= 0` or `gcd(self, m) != 1`.
    pub fn mod_inverse(&self, m: &Self) -> CryptoResult<Self> {
        check_modulus(m)?;
        if m.0.is_one() {
            return Ok(Self::zero());
        }
        let (mut old_r, mut r) = (self.0.mod_floor(&m.0), m.0.clone());
        let (mut old_s, mut s) = (Int::one(), Int::zero());
        while !r.is_zero() {
            let (q, rem) = old_r.div_rem(&r);
            old_r = std::mem::replace(&mut r, rem);
            let next_s = &old_s - &q * &s;
            old_s = std::mem::replace(&mut s, next_s);
        }
        if !old_r.is_one() {
            return Err(CryptoError::Domain("value is not invertible modulo m".into()));
        }
        Ok(Self(old_s.mod_floor(&m.0)))
    }

    /// Product computed on fixed-width limbs. Both operands are padded to a
    /// common width of at least [`SEC_WIDTH_BITS`], so any two values below
    /// `2^256` run the same schedule.
    #[must_use]
    pub fn multiply_sec(&self, other: &Self) -> Self {
        let bits = self.bit_length().max(other.bit_length());
        self.multiply_sec_width(other, bits)
    }

    /// `multiply_sec` with an explicitly declared operand width in bits.
    /// Operands wider than `bits` widen the schedule to fit them.
    #[must_use]
    pub fn multiply_sec_width(&self, other: &Self, bits: u64) -> Self {
        let width = ct::declared_width(
            bits.max(self.bit_length()).max(other.bit_length()),
            SEC_WIDTH_BITS,
        );
        let product = ct::mul(self.0.magnitude(), other.0.magnitude(), width);
        let sign = if self.signum() * other.signum() < 0 { Sign::Minus } else { Sign::Plus };
        Self(Int::from_biguint(sign, product))
    }

    /// `self * other mod m` by Montgomery multiplication over the limb width
    /// of `m`.
    ///
    /// # Errors
    /// Returns `Domain` when `m <= 0` or `m` is even.
    pub fn mod_multiply_sec(&self, other: &Self, m: &Self) -> CryptoResult<Self> {
        check_odd_modulus(m, "mod_multiply_sec")?;
        let (a, b) = (self.canonical(m), other.canonical(m));
        let product = ct::mod_mul_odd(a.0.magnitude(), b.0.magnitude(), m.0.magnitude());
        Ok(Self(Int::from_biguint(Sign::Plus, product)))
    }

    /// `self + other mod m` with a conditional subtraction in place of a
    /// branch
    ///
    /// # Errors
    /// Returns `Domain` when `m <= 0`.
    pub fn mod_add_sec(&self, other: &Self, m: &Self) -> CryptoResult<Self> {
        check_modulus(m)?;
        let (a, b) = (self.canonical(m), other.canonical(m));
        let sum = ct::mod_add(a.0.magnitude(), b.0.magnitude(), m.0.magnitude());
        Ok(Self(Int::from_biguint(Sign::Plus, sum)))
    }

    /// Residue in `[0, m)`, skipping the division for values already there
    fn canonical(&self, m: &Self) -> Self {
        if self.is_negative() || self >= m {
            self.reduce(m)
        } else {
            self.clone()
        }
    }

    /// `self^exponent mod m` with a Montgomery ladder whose schedule depends
    /// only on the bit widths of the exponent and modulus.
    ///
    /// # Errors
    /// Returns `Domain` when `m <= 0`, `m` is even, or the exponent is negative.
    pub fn mod_pow_sec(&self, exponent: &Self, m: &Self) -> CryptoResult<Self> {
        check_odd_modulus(m, "mod_pow_sec")?;
        if exponent.is_negative() {
            return Err(CryptoError::Domain("mod_pow_sec requires a non-negative exponent".into()));
        }
        let base = self.reduce(m);
        let result = ct::mod_pow_odd(base.0.magnitude(), exponent.0.magnitude(), m.0.magnitude());
        Ok(Self(Int::from_biguint(Sign::Plus, result)))
    }

    /// Modular inverse by a fixed-iteration binary extended GCD.
    ///
    /// Even moduli are handled by the variable-time `mod_inverse`.
    ///
    /// # Errors
    /// Returns `Domain` when `m <= 0` or `gcd(self, m) != 1`.
    pub fn mod_inverse_sec(&self, m: &Self) -> CryptoResult<Self> {
        check_modulus(m)?;
        if m.0.is_even() {
            debug!(
                bits = m.bit_length(),
                "mod_inverse_sec: even modulus, using variable-time path"
            );
            return self.mod_inverse(m);
        }
        let a = self.canonical(m);
        ct::mod_inverse_odd(a.0.magnitude(), m.0.magnitude())
            .map(|inv| Self(Int::from_biguint(Sign::Plus, inv)))
            .ok_or_else(|| CryptoError::Domain("value is not invertible modulo m".into()))
    }

    /// Bitwise AND with two's-complement semantics
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        Self(&self.0 & &other.0)
    }

    /// Bitwise OR with two's-complement semantics
    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        Self(&self.0 | &other.0)
    }

    /// Bitwise XOR with two's-complement semantics
    #[must_use]
    pub fn xor(&self, other: &Self) -> Self {
        Self(&self.0 ^ &other.0)
    }

    /// `self * 2^n`; a negative `n` shifts right instead
    #[must_use]
    pub fn shift_left(&self, n: i64) -> Self {
        if n < 0 {
            return self.shift_right_by(n.unsigned_abs());
        }
        self.shift_left_by(n.unsigned_abs())
    }

    /// `floor(self / 2^n)`; a negative `n` shifts left instead
    #[must_use]
    pub fn shift_right(&self, n: i64) -> Self {
        if n < 0 {
            return self.shift_left_by(n.unsigned_abs());
        }
        self.shift_right_by(n.unsigned_abs())
    }

    fn shift_left_by(&self, n: u64) -> Self {
        if self.is_zero() {
            return Self::zero();
        }
        Self(&self.0 << n)
    }

    fn shift_right_by(&self, n: u64) -> Self {
        if self.is_negative() {
            // floor(x / 2^n) == -(((-x - 1) >> n) + 1) for x < 0
            let m = self.0.magnitude() - 1u32;
            let shifted = if n >= m.bits() { BigUint::zero() } else { m >> n };
            return Self(-Int::from_biguint(Sign::Plus, shifted + 1u32));
        }
        if n >= self.0.bits() {
            return Self::zero();
        }
        Self(&self.0 >> n)
    }

    /// Miller-Rabin test; a composite passes with probability at most
    /// `2^-certainty`. Non-positive certainty accepts everything above 1.
    #[must_use]
    pub fn is_probable_prime(&self, certainty: i32) -> bool {
        self.is_probable_prime_with_rng(certainty, &mut OsRng)
    }

    pub(crate) fn is_probable_prime_with_rng<R: RngCore + CryptoRng + ?Sized>(
        &self,
        certainty: i32,
        rng: &mut R,
    ) -> bool {
        let n = match self.0.to_biguint() {
            Some(n) if n > BigUint::one() => n,
            _ => return false,
        };
        for &p in &SMALL_PRIMES {
            if n == BigUint::from(p) {
                return true;
            }
            if (&n % p).is_zero() {
                return false;
            }
        }
        if certainty <= 0 {
            return true;
        }
        // Each round errs with probability at most 1/4.
        let rounds = certainty.unsigned_abs().div_ceil(2);
        miller_rabin(&n, rounds, rng)
    }

    /// Minimal big-endian two's-complement encoding (zero encodes as `[0]`)
    #[must_use]
    pub fn to_byte_array(&self) -> Vec<u8> {
        self.0.to_signed_bytes_be()
    }

    /// Fixed-width big-endian unsigned encoding, left-padded with zeros.
    ///
    /// # Errors
    /// Returns `Domain` for negative values and `Size` when `size <= 0` or the
    /// value needs more than `size` bytes.
    pub fn to_unsigned_byte_array(&self, size: i64) -> CryptoResult<Vec<u8>> {
        if self.is_negative() {
            return Err(CryptoError::Domain("cannot encode a negative value as unsigned".into()));
        }
        let size = usize::try_from(size)
            .ok()
            .filter(|s| *s > 0)
            .ok_or_else(|| CryptoError::Size(format!("size must be positive, got {size}")))?;
        let magnitude = if self.is_zero() { Vec::new() } else { self.0.magnitude().to_bytes_be() };
        if magnitude.len() > size {
            return Err(CryptoError::Size(format!(
                "value needs {} bytes but only {size} available",
                magnitude.len()
            )));
        }
        let mut out = vec![0u8; size];
        out[size - magnitude.len()..].copy_from_slice(&magnitude);
        Ok(out)
    }

    /// Fixed 32-byte big-endian encoding for values in `[0, 2^256)`.
    pub(crate) fn to_be_bytes32(&self) -> CryptoResult<[u8; 32]> {
        let bytes = self.to_unsigned_byte_array(32)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(out)
    }
}

fn check_modulus(m: &BigInt) -> CryptoResult<()> {
    if m.0.is_positive() {
        Ok(())
    } else {
        Err(CryptoError::Domain(format!("modulus must be positive, got {m}")))
    }
}

fn check_odd_modulus(m: &BigInt, op: &str) -> CryptoResult<()> {
    check_modulus(m)?;
    if m.0.is_even() {
        return Err(CryptoError::Domain(format!("{op} requires an odd modulus")));
    }
    Ok(())
}

fn miller_rabin<R: RngCore + CryptoRng + ?Sized>(n: &BigUint, rounds: u32, rng: &mut R) -> bool {
    let one = BigUint::one();
    let n_minus_one = n - &one;
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;
    let span = n - 3u32;
    let bits = n.bits();

    'witness: for _ in 0..rounds {
        // a uniform in [2, n - 2]
        let a = loop {
            let candidate = BigInt::random_bits_with_rng(bits, rng).0.magnitude().clone();
            if candidate < span {
                break candidate + 2u32;
            }
        };
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&BigUint::from(2u8), n);
            if x == n_minus_one {
                continue 'witness;
            }
            if x == one {
                return false;
            }
        }
        return false;
    }
    true
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BigInt({})", self.0)
    }
}

impl fmt::LowerHex for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl FromStr for BigInt {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, 10)
    }
}

macro_rules! impl_from_primitive {
    ($($t:ty),*) => {
        $(impl From<$t> for BigInt {
            fn from(value: $t) -> Self {
                Self(Int::from(value))
            }
        })*
    };
}

impl_from_primitive!(i32, i64, u8, u32, u64);

impl Add for &BigInt {
    type Output = BigInt;

    fn add(self, rhs: Self) -> BigInt {
        BigInt(&self.0 + &rhs.0)
    }
}

impl Sub for &BigInt {
    type Output = BigInt;

    fn sub(self, rhs: Self) -> BigInt {
        BigInt(&self.0 - &rhs.0)
    }
}

impl Mul for &BigInt {
    type Output = BigInt;

    fn mul(self, rhs: Self) -> BigInt {
        BigInt(&self.0 * &rhs.0)
    }
}

impl Neg for &BigInt {
    type Output = BigInt;

    fn neg(self) -> BigInt {
        BigInt(-&self.0)
    }
}

impl PartialEq<i64> for BigInt {
    fn eq(&self, other: &i64) -> bool {
        self.0 == Int::from(*other)
    }
}

impl PartialOrd<i64> for BigInt {
    fn partial_cmp(&self, other: &i64) -> Option<Ordering> {
        self.0.partial_cmp(&Int::from(*other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn big(s: &str) -> BigInt {
        s.parse().unwrap()
    }

    fn random_unit(m: &BigInt) -> BigInt {
        loop {
            let a = BigInt::random_bits(256).modulo(m).unwrap();
            if a.gcd(m) == BigInt::one() {
                return a;
            }
        }
    }

    fn random_nonzero(bits: u64) -> BigInt {
        loop {
            let m = BigInt::random_bits(bits);
            if !m.is_zero() {
                return m;
            }
        }
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(big("123456789").to_string(), "123456789");
        assert_eq!(BigInt::parse("-ff", 16).unwrap(), BigInt::from(-255));
        assert_eq!(BigInt::parse("+10", 2).unwrap(), BigInt::from(2));
        assert!(BigInt::parse("12z", 10).is_err());
        assert!(BigInt::parse("", 10).is_err());
        assert!(BigInt::parse("-", 10).is_err());
        assert!(BigInt::parse("1_000", 10).is_err());
    }

    #[test]
    fn test_signed_bytes_roundtrip() {
        let bytes = [1u8, 2, 3, 4];
        let n = BigInt::from_signed_bytes(&bytes);
        assert_eq!(n.to_byte_array(), bytes.to_vec());
        assert_eq!(BigInt::from_signed_bytes(&[0xFF]), BigInt::from(-1));
    }

    #[test]
    fn test_sign_magnitude_constructor() {
        let magnitude = [1u8, 2, 3];
        assert_eq!(BigInt::from_sign_magnitude(1, &magnitude).unwrap().to_string(), "66051");
        assert_eq!(BigInt::from_sign_magnitude(-1, &magnitude).unwrap().to_string(), "-66051");
        assert_eq!(BigInt::from_sign_magnitude(0, &magnitude).unwrap().to_string(), "0");
        assert!(BigInt::from_sign_magnitude(2, &magnitude).is_err());
    }

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(big("100").add(&big("200")).to_string(), "300");
        assert_eq!(big("300").subtract(&big("100")).to_string(), "200");
        assert_eq!(big("10").multiply(&big("20")).to_string(), "200");
        assert_eq!(big("100").divide(&big("5")).unwrap().to_string(), "20");
        assert_eq!(big("100").remainder(&big("7")).unwrap().to_string(), "2");
        assert_eq!(big("2").pow(10).to_string(), "1024");
        assert_eq!(big("100").modulo(&big("9")).unwrap().to_string(), "1");
        assert_eq!(big("48").gcd(&big("18")).to_string(), "6");
    }

    #[test]
    fn test_truncating_division_and_floor_mod() {
        let a = BigInt::from(-7);
        let b = BigInt::from(2);
        assert_eq!(a.divide(&b).unwrap(), BigInt::from(-3));
        assert_eq!(a.remainder(&b).unwrap(), BigInt::from(-1));
        assert_eq!(a.modulo(&b).unwrap(), BigInt::from(1));
        assert_eq!(BigInt::from(7).remainder(&BigInt::from(-2)).unwrap(), BigInt::from(1));
        assert_eq!(BigInt::from(-12).gcd(&BigInt::from(18)), BigInt::from(6));
    }

    #[test]
    fn test_division_by_zero() {
        let err = big("100").divide(&BigInt::zero()).unwrap_err();
        assert!(matches!(err, CryptoError::Domain(_)));
        assert!(big("100").remainder(&BigInt::zero()).is_err());
    }

    #[test]
    fn test_modulo_rejects_non_positive_modulus() {
        assert!(big("5").modulo(&BigInt::zero()).is_err());
        assert!(big("5").modulo(&BigInt::from(-3)).is_err());
    }

    #[test]
    fn test_mod_pow() {
        let r = big("4").mod_pow(&big("13"), &big("497")).unwrap();
        assert_eq!(r.to_string(), "445");
        assert_eq!(big("5").mod_pow(&BigInt::zero(), &big("7")).unwrap(), BigInt::one());
        assert_eq!(big("5").mod_pow(&big("3"), &BigInt::one()).unwrap(), BigInt::zero());
        // 3^-1 mod 11 = 4, so 3^-2 = 16 mod 11 = 5
        assert_eq!(big("3").mod_pow(&big("-2"), &big("11")).unwrap(), big("5"));
        assert!(big("2").mod_pow(&big("-1"), &big("6")).is_err());
    }

    #[test]
    fn test_fixed_mod_inverse() {
        let a = BigInt::from(3);
        let m = BigInt::from(11);
        let inv = a.mod_inverse(&m).unwrap();
        assert_eq!(inv, BigInt::from(4));
        assert_eq!(a.multiply(&inv).modulo(&m).unwrap(), BigInt::one());
    }

    #[test]
    fn test_random_mod_inverse() {
        for _ in 0..50 {
            let m = random_nonzero(256);
            let a = random_unit(&m);
            let inv = a.mod_inverse(&m).unwrap();
            assert_eq!(a.multiply(&inv).modulo(&m).unwrap(), BigInt::one().modulo(&m).unwrap());
        }
    }

    #[test]
    fn test_mod_inverse_failures() {
        let err = BigInt::from(2).mod_inverse(&BigInt::from(6)).unwrap_err();
        assert!(matches!(err, CryptoError::Domain(_)));
        assert!(BigInt::from(3).mod_inverse(&BigInt::from(-11)).is_err());
        assert!(BigInt::from(3).mod_inverse(&BigInt::zero()).is_err());
    }

    #[test]
    fn test_negate_properties() {
        for _ in 0..20 {
            let x = BigInt::random_bits(256);
            let y = x.negate();
            assert_eq!(x.add(&y), BigInt::zero());
            assert_eq!(y.add(&x), BigInt::zero());
            assert_eq!(y.negate(), x);
            if !x.is_zero() {
                assert_eq!(y.signum(), -x.signum());
            }
        }
        assert_eq!(BigInt::zero().negate(), BigInt::zero());
    }

    #[test]
    fn test_probable_prime() {
        assert!(big("17").is_probable_prime(50));
        assert!(!big("15").is_probable_prime(50));
        assert!(!BigInt::one().is_probable_prime(50));
        assert!(!BigInt::from(-7).is_probable_prime(50));
        assert!(BigInt::two().is_probable_prime(50));
        // Mersenne prime 2^127 - 1 and a Carmichael number
        let m127 = BigInt::one().shift_left(127).subtract(&BigInt::one());
        assert!(m127.is_probable_prime(100));
        assert!(!big("561").is_probable_prime(100));
        assert!(!m127.multiply(&big("263")).is_probable_prime(100));
    }

    #[test]
    fn test_compare_and_equality() {
        let a = big("100");
        let b = big("200");
        assert!(a < b);
        assert!(b > a);
        assert_eq!(a.cmp(&a), Ordering::Equal);
        assert_eq!(big("123"), big("123"));
        assert_ne!(big("123"), big("456"));
    }

    #[test]
    fn test_hash_consistency() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let digest = |n: &BigInt| {
            let mut h = DefaultHasher::new();
            n.hash(&mut h);
            h.finish()
        };
        assert_eq!(digest(&big("123")), digest(&BigInt::from_hex("7b").unwrap()));
    }

    #[test]
    fn test_signum() {
        assert_eq!(big("123").signum(), 1);
        assert_eq!(big("-123").signum(), -1);
        assert_eq!(big("0").signum(), 0);
    }

    #[test]
    fn test_bit_length_and_test_bit() {
        assert_eq!(BigInt::one().shift_left(100).bit_length(), 101);
        assert_eq!(BigInt::from(-1).bit_length(), 0);
        assert_eq!(BigInt::from(-128).bit_length(), 7);
        assert_eq!(BigInt::from(255).bit_length(), 8);
        assert!(BigInt::from(5).test_bit(0));
        assert!(!BigInt::from(5).test_bit(1));
        assert!(BigInt::from(-1).test_bit(300));
    }

    #[test]
    fn test_shifts() {
        assert_eq!(BigInt::from(12345).shift_left(0), BigInt::from(12345));
        assert_eq!(BigInt::from(-6789).shift_right(0), BigInt::from(-6789));
        assert_eq!(BigInt::from(1).shift_left(4), BigInt::from(16));
        assert_eq!(BigInt::from(4).shift_left(8), BigInt::from(1024));
        assert_eq!(BigInt::from(8).shift_right(2), BigInt::from(2));
        assert_eq!(BigInt::from(25).shift_right(3), BigInt::from(3));
        assert_eq!(BigInt::from(12).shift_left(-2), BigInt::from(3));
        assert_eq!(BigInt::from(6).shift_right(-2), BigInt::from(24));
        assert_eq!(BigInt::from(-9).shift_right(1), BigInt::from(-5));
        assert_eq!(BigInt::from(-17).shift_right(2), BigInt::from(-5));
        assert_eq!(BigInt::from(-16).shift_right(2), BigInt::from(-4));
        assert_eq!(BigInt::from(5).shift_right(10), BigInt::zero());
        assert_eq!(BigInt::zero().shift_right(100), BigInt::zero());
        assert_eq!(BigInt::from(-5).shift_right(10), BigInt::from(-1));
    }

    #[test]
    fn test_bitwise_and() {
        assert_eq!(BigInt::from(0b1011).and(&BigInt::from(3)), BigInt::from(3));
        assert_eq!(BigInt::from(-1).and(&BigInt::from(3)), BigInt::from(3));
        assert_eq!(BigInt::from(4).or(&BigInt::from(1)), BigInt::from(5));
        assert_eq!(BigInt::from(6).xor(&BigInt::from(3)), BigInt::from(5));
    }

    #[test]
    fn test_to_byte_array() {
        assert_eq!(big("255").to_byte_array(), vec![0x00, 0xFF]);
        assert_eq!(BigInt::zero().to_byte_array(), vec![0x00]);
        assert_eq!(BigInt::from(-1).to_byte_array(), vec![0xFF]);
    }

    #[test]
    fn test_unsigned_byte_array() {
        assert_eq!(BigInt::zero().to_unsigned_byte_array(4).unwrap(), vec![0, 0, 0, 0]);
        assert_eq!(BigInt::from(128).to_unsigned_byte_array(1).unwrap(), vec![0x80]);
        assert_eq!(BigInt::from(255).to_unsigned_byte_array(2).unwrap(), vec![0x00, 0xFF]);
        assert_eq!(BigInt::from(65_535).to_unsigned_byte_array(2).unwrap(), vec![0xFF, 0xFF]);
    }

    #[test]
    fn test_unsigned_byte_array_errors() {
        assert!(matches!(BigInt::one().to_unsigned_byte_array(0), Err(CryptoError::Size(_))));
        assert!(matches!(BigInt::one().to_unsigned_byte_array(-3), Err(CryptoError::Size(_))));
        assert!(matches!(BigInt::from(-1).to_unsigned_byte_array(1), Err(CryptoError::Domain(_))));
        assert!(matches!(BigInt::from(256).to_unsigned_byte_array(1), Err(CryptoError::Size(_))));
    }

    #[test]
    fn test_random_bits_range() {
        for bits in [1u64, 7, 8, 9, 255, 256] {
            let r = BigInt::random_bits(bits);
            assert!(r.bit_length() <= bits);
            assert!(!r.is_negative());
        }
        assert_eq!(BigInt::random_bits(0), BigInt::zero());
    }

    #[test]
    fn test_mod_pow_sec_matches_mod_pow() {
        for _ in 0..30 {
            let base = BigInt::random_bits(256);
            let exp = BigInt::random_bits(128);
            let m = loop {
                let m = BigInt::random_bits(256);
                if m.is_odd() {
                    break m;
                }
            };
            assert_eq!(base.mod_pow(&exp, &m).unwrap(), base.mod_pow_sec(&exp, &m).unwrap());
        }
    }

    #[test]
    fn test_mod_pow_sec_edge_cases() {
        let m = BigInt::from(497);
        assert_eq!(BigInt::from(4).mod_pow_sec(&BigInt::from(13), &m).unwrap(), BigInt::from(445));
        assert_eq!(BigInt::from(4).mod_pow_sec(&BigInt::zero(), &m).unwrap(), BigInt::one());
        assert_eq!(
            BigInt::from(-4).mod_pow_sec(&BigInt::from(3), &m).unwrap(),
            BigInt::from(-4).mod_pow(&BigInt::from(3), &m).unwrap()
        );
        assert_eq!(
            BigInt::from(9).mod_pow_sec(&BigInt::from(5), &BigInt::one()).unwrap(),
            BigInt::zero()
        );
        assert!(BigInt::from(4).mod_pow_sec(&BigInt::from(3), &BigInt::from(10)).is_err());
        assert!(BigInt::from(4).mod_pow_sec(&BigInt::from(-3), &m).is_err());
    }

    #[test]
    fn test_multiply_sec_matches_multiply() {
        for _ in 0..30 {
            let a = BigInt::random_bits(256);
            let b = BigInt::random_bits(256);
            assert_eq!(a.multiply(&b), a.multiply_sec(&b));
        }
        let a = BigInt::from(-12345);
        let b = BigInt::from(678);
        assert_eq!(a.multiply_sec(&b), a.multiply(&b));
        assert_eq!(a.multiply_sec(&BigInt::zero()), BigInt::zero());
    }

    #[test]
    fn test_multiply_sec_width_matches_multiply() {
        let a = BigInt::random_bits(500);
        let b = BigInt::random_bits(12);
        assert_eq!(a.multiply_sec_width(&b, 512), a.multiply(&b));
        // an undersized declaration still yields the full product
        assert_eq!(a.multiply_sec_width(&b, 8), a.multiply(&b));
        assert_eq!(BigInt::from(-3).multiply_sec_width(&BigInt::from(-5), 64), BigInt::from(15));
    }

    #[test]
    fn test_mod_multiply_sec_matches_regular() {
        for _ in 0..30 {
            let m = loop {
                let m = BigInt::random_bits(256);
                if m.is_odd() {
                    break m;
                }
            };
            let a = BigInt::random_bits(256);
            let b = BigInt::random_bits(300).negate();
            let expected = a.multiply(&b).modulo(&m).unwrap();
            assert_eq!(a.mod_multiply_sec(&b, &m).unwrap(), expected);
            let sum = a.add(&b).modulo(&m).unwrap();
            assert_eq!(a.mod_add_sec(&b, &m).unwrap(), sum);
        }
        assert!(BigInt::one().mod_multiply_sec(&BigInt::one(), &BigInt::from(10)).is_err());
        assert!(BigInt::one().mod_add_sec(&BigInt::one(), &BigInt::zero()).is_err());
        assert_eq!(
            BigInt::from(5).mod_add_sec(&BigInt::from(7), &BigInt::from(10)).unwrap(),
            BigInt::from(2)
        );
    }

    #[test]
    fn test_mod_inverse_sec_matches_mod_inverse() {
        for _ in 0..30 {
            let m = random_nonzero(256);
            let a = random_unit(&m);
            let regular = a.mod_inverse(&m).unwrap();
            let secure = a.mod_inverse_sec(&m).unwrap();
            assert_eq!(regular, secure);
            assert_eq!(a.multiply(&secure).modulo(&m).unwrap(), BigInt::one().modulo(&m).unwrap());
        }
    }

    #[test]
    fn test_sec_variants_agree_on_small_moduli() {
        let exp = BigInt::from(37);
        for m in 1..400 {
            let m = BigInt::from(m);
            for a in -20..60 {
                let a = BigInt::from(a);
                assert_eq!(a.mod_inverse_sec(&m), a.mod_inverse(&m), "inverse of {a} mod {m}");
                if m.is_odd() {
                    assert_eq!(a.mod_pow_sec(&exp, &m).unwrap(), a.mod_pow(&exp, &m).unwrap());
                    assert_eq!(
                        a.mod_multiply_sec(&exp, &m).unwrap(),
                        a.multiply(&exp).modulo(&m).unwrap()
                    );
                }
            }
        }
    }

    #[test]
    fn test_mod_inverse_sec_failures() {
        assert!(BigInt::from(3).mod_inverse_sec(&BigInt::from(9)).is_err());
        assert!(BigInt::from(2).mod_inverse_sec(&BigInt::from(6)).is_err());
        assert!(BigInt::from(3).mod_inverse_sec(&BigInt::from(-11)).is_err());
        assert_eq!(
            BigInt::from(-3).mod_inverse_sec(&BigInt::from(11)).unwrap(),
            BigInt::from(-3).mod_inverse(&BigInt::from(11)).unwrap()
        );
    }

    proptest! {
        #[test]
        fn prop_shift_direction_flips(x in any::<i64>(), k in 0i64..200) {
            let x = BigInt::from(x);
            prop_assert_eq!(x.shift_left(-k), x.shift_right(k));
            prop_assert_eq!(x.shift_right(-k), x.shift_left(k));
        }

        #[test]
        fn prop_shift_right_is_floor_division(x in any::<i64>(), k in 0u32..62) {
            let expected = x.div_euclid(1i64 << k);
            prop_assert_eq!(BigInt::from(x).shift_right(i64::from(k)), BigInt::from(expected));
        }

        #[test]
        fn prop_division_identity(
            a in any::<i64>(),
            b in any::<i64>().prop_filter("non-zero", |b| *b != 0)
        ) {
            let (x, y) = (BigInt::from(a), BigInt::from(b));
            let (q, r) = x.div_rem(&y).unwrap();
            prop_assert_eq!(q.multiply(&y).add(&r), x.clone());
            prop_assert!(r.is_zero() || r.signum() == x.signum());
            let m = y.abs();
            let md = x.modulo(&m).unwrap();
            prop_assert!(md >= BigInt::zero() && md < m);
        }
    }
}
