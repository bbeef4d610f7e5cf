//! secp256k1 group elements.
//!
//! Points are kept in Jacobian coordinates `(X, Y, Z)` with affine
//! `x = X/Z²`, `y = Y/Z³`; the point at infinity is a separate variant.
//! Encodings follow SEC1, with an all-zero buffer standing for infinity.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Neg, Sub};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

use super::field::FieldElement;
use super::params::{CurveParams, ORDER_BYTES};
use crate::bigint::BigInt;
use crate::error::{CryptoError, CryptoResult};

/// Length of a compressed SEC1 point
pub const COMPRESSED_LEN: usize = 33;
/// Length of an uncompressed SEC1 point
pub const UNCOMPRESSED_LEN: usize = 65;

const TAG_EVEN: u8 = 0x02;
const TAG_ODD: u8 = 0x03;
const TAG_UNCOMPRESSED: u8 = 0x04;

/// Presence flag plus Jacobian X, Y, Z as 32-byte big-endian values
const SLOT_LEN: usize = 1 + 3 * 32;
/// Ladder steps below the fixed top bit of the offset scalar
const LADDER_BITS: usize = 256;

/// A point on secp256k1, or a parsed point that failed validation
#[derive(Clone)]
pub struct Point(Repr);

#[derive(Clone)]
enum Repr {
    Infinity,
    Jacobian {
        x: FieldElement,
        y: FieldElement,
        z: FieldElement,
    },
}

impl Point {
    /// The identity element
    #[must_use]
    pub const fn infinity() -> Self {
        Self(Repr::Infinity)
    }

    /// The generator G
    #[must_use]
    pub fn generator() -> Self {
        let params = CurveParams::secp256k1();
        Self::create(params.generator_x(), params.generator_y())
    }

    /// Affine point from coordinates, reduced mod p but not checked against
    /// the curve equation
    #[must_use]
    pub fn create(x: &BigInt, y: &BigInt) -> Self {
        Self::from_affine(FieldElement::new(x), FieldElement::new(y))
    }

    pub(crate) fn from_affine(x: FieldElement, y: FieldElement) -> Self {
        Self(Repr::Jacobian {
            x,
            y,
            z: FieldElement::one(),
        })
    }

    /// Whether this is the point at infinity
    #[must_use]
    pub const fn is_infinity(&self) -> bool {
        matches!(self.0, Repr::Infinity)
    }

    /// Finite and satisfying `y² = x³ + 7`. With cofactor 1 every such point
    /// has order n.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.affine().is_some_and(|(x, y)| y.square() == curve_rhs(&x))
    }

    /// Affine coordinates, `None` at infinity
    pub(crate) fn affine(&self) -> Option<(FieldElement, FieldElement)> {
        match &self.0 {
            Repr::Infinity => None,
            Repr::Jacobian { x, y, z } => {
                let z_inv = z.invert();
                let z_inv2 = z_inv.square();
                Some((x.mul(&z_inv2), y.mul(&z_inv2.mul(&z_inv))))
            }
        }
    }

    /// The same point with `Z = 1`
    #[must_use]
    pub fn normalize(&self) -> Self {
        self.affine()
            .map_or_else(Self::infinity, |(x, y)| Self::from_affine(x, y))
    }

    /// Affine x-coordinate
    ///
    /// # Errors
    /// Returns `State` for the point at infinity.
    pub fn affine_x(&self) -> CryptoResult<BigInt> {
        self.affine_or_state().map(|(x, _)| x.value().clone())
    }

    /// Affine y-coordinate
    ///
    /// # Errors
    /// Returns `State` for the point at infinity.
    pub fn affine_y(&self) -> CryptoResult<BigInt> {
        self.affine_or_state().map(|(_, y)| y.value().clone())
    }

    fn affine_or_state(&self) -> CryptoResult<(FieldElement, FieldElement)> {
        self.affine()
            .ok_or_else(|| CryptoError::State("point at infinity has no affine coordinates".into()))
    }

    /// 32-byte big-endian affine x, as used by x-only keys
    pub(crate) fn x_bytes(&self) -> CryptoResult<[u8; 32]> {
        self.affine_or_state().map(|(x, _)| x.to_bytes())
    }

    /// Whether the affine y is even; false at infinity
    #[must_use]
    pub fn has_even_y(&self) -> bool {
        self.affine().is_some_and(|(_, y)| !y.is_odd())
    }

    /// Point doubling (dbl-2009-l, a = 0)
    #[must_use]
    pub fn double(&self) -> Self {
        let Repr::Jacobian { x, y, z } = &self.0 else {
            return Self::infinity();
        };
        if y.is_zero() {
            return Self::infinity();
        }
        let a = x.square();
        let b = y.square();
        let c = b.square();
        let d = x.add(&b).square().sub(&a).sub(&c).double();
        let e = a.mul_small(3);
        let f = e.square();
        let x3 = f.sub(&d.double());
        let y3 = e.mul(&d.sub(&x3)).sub(&c.mul_small(8));
        let z3 = y.mul(z).double();
        Self(Repr::Jacobian { x: x3, y: y3, z: z3 })
    }

    /// Group addition (add-1998-cmo-2); handles doubling and inverse inputs
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        let (Repr::Jacobian { x: x1, y: y1, z: z1 }, Repr::Jacobian { x: x2, y: y2, z: z2 }) =
            (&self.0, &other.0)
        else {
            return if self.is_infinity() { other.clone() } else { self.clone() };
        };

        let z1z1 = z1.square();
        let z2z2 = z2.square();
        let u1 = x1.mul(&z2z2);
        let u2 = x2.mul(&z1z1);
        let s1 = y1.mul(z2).mul(&z2z2);
        let s2 = y2.mul(z1).mul(&z1z1);
        let h = u2.sub(&u1);
        let r = s2.sub(&s1);

        if h.is_zero() {
            return if r.is_zero() { self.double() } else { Self::infinity() };
        }

        let hh = h.square();
        let hhh = h.mul(&hh);
        let v = u1.mul(&hh);
        let x3 = r.square().sub(&hhh).sub(&v.double());
        let y3 = r.mul(&v.sub(&x3)).sub(&s1.mul(&hhh));
        let z3 = z1.mul(z2).mul(&h);
        Self(Repr::Jacobian { x: x3, y: y3, z: z3 })
    }

    /// Additive inverse `(x, -y)`
    #[must_use]
    pub fn negate(&self) -> Self {
        match &self.0 {
            Repr::Infinity => Self::infinity(),
            Repr::Jacobian { x, y, z } => Self(Repr::Jacobian {
                x: x.clone(),
                y: y.negate(),
                z: z.clone(),
            }),
        }
    }

    /// `self - other`
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.negate())
    }

    /// Scalar multiplication by double-and-add. Scalars at or above n are
    /// reduced first, so `n·P` is infinity and `(n+1)·P = P`.
    ///
    /// # Errors
    /// Returns `Domain` for a negative scalar.
    pub fn mul(&self, k: &BigInt) -> CryptoResult<Self> {
        if k.is_negative() {
            return Err(CryptoError::Domain("scalar must be non-negative".into()));
        }
        let k = CurveParams::secp256k1().reduce_scalar(k);
        let mut acc = Self::infinity();
        for i in (0..k.bit_length()).rev() {
            acc = acc.double();
            if k.test_bit(i) {
                acc = acc.add(self);
            }
        }
        Ok(acc)
    }

    /// `k·G`
    ///
    /// # Errors
    /// Returns `Domain` for a negative scalar.
    pub fn base_mul(k: &BigInt) -> CryptoResult<Self> {
        Self::generator().mul(k)
    }

    /// Scalar multiplication for secret scalars.
    ///
    /// Runs a Montgomery ladder of exactly 256 steps, each one addition and
    /// one doubling, with the operands exchanged by `subtle` conditional
    /// swaps rather than branches on scalar bits. Agrees with [`Point::mul`]
    /// for points of order n. The field arithmetic underneath is
    /// `num-bigint` and is not itself constant-time.
    ///
    /// # Errors
    /// Returns `Domain` for a negative scalar.
    pub fn mul_sec(&self, k: &BigInt) -> CryptoResult<Self> {
        if k.is_negative() {
            return Err(CryptoError::Domain("scalar must be non-negative".into()));
        }
        let k = CurveParams::secp256k1().reduce_scalar(k).to_be_bytes32()?;
        Ok(self.mul_secret(&k))
    }

    /// `k·G` on the fixed-schedule ladder of [`Point::mul_sec`]
    ///
    /// # Errors
    /// Returns `Domain` for a negative scalar.
    pub fn base_mul_sec(k: &BigInt) -> CryptoResult<Self> {
        Self::generator().mul_sec(k)
    }

    /// Ladder over a 32-byte big-endian scalar. The scalar is first moved
    /// into `[2^256, 2^257)` by adding n or 2n, so the ladder can start from
    /// `(P, 2P)` and never passes through infinity on the way.
    pub(crate) fn mul_secret(&self, k: &[u8; 32]) -> Self {
        if self.is_infinity() {
            return Self::infinity();
        }
        let scalar = offset_scalar(k);
        let mut r0 = self.clone();
        let mut r1 = self.double();
        for i in (0..LADDER_BITS).rev() {
            let bit = Choice::from((scalar[32 - i / 8] >> (i % 8)) & 1);
            Self::conditional_swap(&mut r0, &mut r1, bit);
            r1 = r0.add(&r1);
            r0 = r0.double();
            Self::conditional_swap(&mut r0, &mut r1, bit);
        }
        r0
    }

    /// Exchange `a` and `b` when `choice` is set, through their fixed-width
    /// byte slots
    fn conditional_swap(a: &mut Self, b: &mut Self, choice: Choice) {
        let mut slot_a = a.to_slot();
        let mut slot_b = b.to_slot();
        for (x, y) in slot_a.iter_mut().zip(slot_b.iter_mut()) {
            u8::conditional_swap(x, y, choice);
        }
        *a = Self::from_slot(&slot_a);
        *b = Self::from_slot(&slot_b);
    }

    fn to_slot(&self) -> [u8; SLOT_LEN] {
        let mut slot = [0u8; SLOT_LEN];
        if let Repr::Jacobian { x, y, z } = &self.0 {
            slot[0] = 1;
            slot[1..33].copy_from_slice(&x.to_bytes());
            slot[33..65].copy_from_slice(&y.to_bytes());
            slot[65..].copy_from_slice(&z.to_bytes());
        }
        slot
    }

    fn from_slot(slot: &[u8; SLOT_LEN]) -> Self {
        if slot[0] == 0 {
            return Self::infinity();
        }
        let coord = |range: std::ops::Range<usize>| {
            FieldElement::new(&BigInt::from_unsigned_bytes(&slot[range]))
        };
        Self(Repr::Jacobian {
            x: coord(1..33),
            y: coord(33..65),
            z: coord(65..SLOT_LEN),
        })
    }

    /// SEC1 encoding: 33 bytes compressed or 65 uncompressed. Infinity
    /// encodes as all zeros of the requested length.
    #[must_use]
    pub fn encode(&self, compressed: bool) -> Vec<u8> {
        let Some((x, y)) = self.affine() else {
            let len = if compressed { COMPRESSED_LEN } else { UNCOMPRESSED_LEN };
            return vec![0u8; len];
        };
        let mut out = Vec::with_capacity(UNCOMPRESSED_LEN);
        if compressed {
            out.push(if y.is_odd() { TAG_ODD } else { TAG_EVEN });
            out.extend_from_slice(&x.to_bytes());
        } else {
            out.push(TAG_UNCOMPRESSED);
            out.extend_from_slice(&x.to_bytes());
            out.extend_from_slice(&y.to_bytes());
        }
        out
    }

    /// Parse a SEC1 encoding.
    ///
    /// Well-sized input that does not decode to a curve point (unknown
    /// prefix, x without a square root, coordinates not below p, or an
    /// uncompressed point off the curve) still parses; the result reports
    /// `is_valid() == false`.
    ///
    /// # Errors
    /// Returns `Length` unless the input is 33 or 65 bytes.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != COMPRESSED_LEN && bytes.len() != UNCOMPRESSED_LEN {
            return Err(CryptoError::length("point encoding", "33 or 65", bytes.len()));
        }
        if bytes.iter().all(|&b| b == 0) {
            return Ok(Self::infinity());
        }

        let x = FieldElement::from_canonical_bytes(&bytes[1..COMPRESSED_LEN]);
        let decoded = match (bytes[0], x) {
            (TAG_EVEN | TAG_ODD, Some(x)) if bytes.len() == COMPRESSED_LEN => {
                decompress(&x, bytes[0] == TAG_ODD).map(|y| (x, y))
            }
            (TAG_UNCOMPRESSED, Some(x)) if bytes.len() == UNCOMPRESSED_LEN => {
                FieldElement::from_canonical_bytes(&bytes[COMPRESSED_LEN..]).map(|y| (x, y))
            }
            _ => None,
        };

        Ok(match decoded {
            Some((x, y)) => Self::from_affine(x, y),
            // (x, 0) is never on the curve: the group has odd order, so no
            // point of order two exists.
            None => Self::from_affine(
                FieldElement::new(&BigInt::from_unsigned_bytes(&bytes[1..COMPRESSED_LEN])),
                FieldElement::zero(),
            ),
        })
    }

    /// The point with x-coordinate `x` and even y, if one exists
    #[must_use]
    pub fn lift_x(x: &BigInt) -> Option<Self> {
        if x.is_negative() || x >= CurveParams::secp256k1().field_p() {
            return None;
        }
        let x = FieldElement::new(x);
        decompress(&x, false).map(|y| Self::from_affine(x, y))
    }
}

/// `k + n` when that reaches `2^256`, else `k + 2n`; both lie in
/// `[2^256, 2^257)` and the choice is a masked select
fn offset_scalar(k: &[u8; 32]) -> [u8; 33] {
    let mut widened = [0u8; 33];
    widened[1..].copy_from_slice(k);
    let once = add_order(&widened);
    let twice = add_order(&once);
    let below = once[0].ct_eq(&0);
    let mut out = once;
    for (o, t) in out.iter_mut().zip(twice) {
        o.conditional_assign(&t, below);
    }
    out
}

/// 33-byte big-endian `x + n`, dropping any carry out of the top byte
fn add_order(x: &[u8; 33]) -> [u8; 33] {
    let mut out = [0u8; 33];
    let mut carry = 0u16;
    for i in (0..33).rev() {
        let n_byte = if i == 0 { 0 } else { ORDER_BYTES[i - 1] };
        let [lo, hi] = (u16::from(x[i]) + u16::from(n_byte) + carry).to_le_bytes();
        out[i] = lo;
        carry = u16::from(hi);
    }
    out
}

fn curve_rhs(x: &FieldElement) -> FieldElement {
    x.square().mul(x).add(&FieldElement::from_u64(7))
}

/// y with the requested parity such that (x, y) is on the curve
fn decompress(x: &FieldElement, odd: bool) -> Option<FieldElement> {
    let y = curve_rhs(x).sqrt()?;
    Some(if y.is_odd() == odd { y } else { y.negate() })
}

impl Default for Point {
    fn default() -> Self {
        Self::infinity()
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Repr::Infinity, Repr::Infinity) => true,
            (
                Repr::Jacobian { x: x1, y: y1, z: z1 },
                Repr::Jacobian { x: x2, y: y2, z: z2 },
            ) => {
                let z1z1 = z1.square();
                let z2z2 = z2.square();
                x1.mul(&z2z2) == x2.mul(&z1z1)
                    && y1.mul(&z2z2).mul(z2) == y2.mul(&z1z1).mul(z1)
            }
            _ => false,
        }
    }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.encode(false).hash(state);
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.affine() {
            None => write!(f, "Point(infinity)"),
            Some((x, y)) => write!(f, "Point({:x}, {:x})", x.value(), y.value()),
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.encode(true)))
    }
}

impl Serialize for Point {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.encode(true)))
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

impl Add for &Point {
    type Output = Point;

    fn add(self, rhs: Self) -> Point {
        Point::add(self, rhs)
    }
}

impl Sub for &Point {
    type Output = Point;

    fn sub(self, rhs: Self) -> Point {
        Point::sub(self, rhs)
    }
}

impl Neg for &Point {
    type Output = Point;

    fn neg(self) -> Point {
        self.negate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_is_valid() {
        let g = Point::generator();
        assert!(g.is_valid());
        assert!(g.has_even_y());
        assert!(!Point::infinity().is_valid());
    }

    #[test]
    fn test_double_matches_add() {
        let g = Point::generator();
        assert_eq!(g.double(), g.add(&g));
        assert_eq!(g.double().add(&g), g.mul(&BigInt::from(3)).unwrap());
    }

    #[test]
    fn test_jacobian_equality() {
        let g = Point::generator();
        let four = g.double().double();
        assert_eq!(four, four.normalize());
        assert_ne!(four, g);
    }

    #[test]
    fn test_negative_scalar_rejected() {
        let err = Point::generator().mul(&BigInt::from(-1)).unwrap_err();
        assert!(matches!(err, CryptoError::Domain(_)));
        let err = Point::generator().mul_sec(&BigInt::from(-1)).unwrap_err();
        assert!(matches!(err, CryptoError::Domain(_)));
    }

    #[test]
    fn test_offset_scalar_top_bit() {
        let n = CurveParams::secp256k1().curve_order();
        let two_256 = BigInt::one().shift_left(256);
        let two_257 = BigInt::one().shift_left(257);
        for k in [[0u8; 32], [1u8; 32], ORDER_BYTES, [0xFFu8; 32]] {
            let offset = BigInt::from_unsigned_bytes(&offset_scalar(&k));
            assert!(offset >= two_256 && offset < two_257);
            let diff = offset.subtract(&BigInt::from_unsigned_bytes(&k));
            assert!(diff == *n || diff == n.add(n));
        }
    }

    #[test]
    fn test_mul_sec_matches_mul() {
        let g = Point::generator();
        let n = CurveParams::secp256k1().curve_order();
        let scalars = [
            BigInt::zero(),
            BigInt::one(),
            BigInt::two(),
            BigInt::from(0xDEAD_BEEF_u64),
            n.subtract(&BigInt::one()),
            n.subtract(&BigInt::two()),
            n.clone(),
            n.add(&BigInt::from(5)),
            BigInt::random_bits(256),
            BigInt::random_bits(128),
        ];
        for k in &scalars {
            assert_eq!(g.mul_sec(k).unwrap(), g.mul(k).unwrap());
        }
        let p = g.mul(&BigInt::from(77)).unwrap();
        let k = BigInt::random_bits(256);
        assert_eq!(p.mul_sec(&k).unwrap(), p.mul(&k).unwrap());
        assert!(Point::infinity().mul_sec(&k).unwrap().is_infinity());
        assert_eq!(Point::base_mul_sec(&k).unwrap(), Point::base_mul(&k).unwrap());
    }

    #[test]
    fn test_conditional_swap() {
        let g = Point::generator();
        let mut a = g.double();
        let mut b = Point::infinity();
        Point::conditional_swap(&mut a, &mut b, Choice::from(0));
        assert_eq!(a, g.double());
        assert!(b.is_infinity());
        Point::conditional_swap(&mut a, &mut b, Choice::from(1));
        assert!(a.is_infinity());
        assert_eq!(b, g.double());
    }

    #[test]
    fn test_undecodable_parses_invalid() {
        let mut bytes = Point::generator().encode(true);
        bytes[0] = 0x05;
        let p = Point::from_bytes(&bytes).unwrap();
        assert!(!p.is_valid());

        let mut off = Point::generator().encode(false);
        off[64] ^= 1;
        assert!(!Point::from_bytes(&off).unwrap().is_valid());
    }

    #[test]
    fn test_lift_x() {
        let g = Point::generator();
        let lifted = Point::lift_x(&g.affine_x().unwrap()).unwrap();
        assert_eq!(lifted, g);
        // x = 5 gives 132, a non-residue mod p
        assert!(Point::lift_x(&BigInt::from(5)).is_none());
    }

    #[test]
    fn test_serde_hex() {
        let g = Point::generator();
        let json = serde_json::to_string(&g).unwrap();
        assert_eq!(
            json,
            "\"0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\""
        );
        let back: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(back, g);
    }
}
