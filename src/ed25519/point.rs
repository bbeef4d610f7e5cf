//! Ed25519 group elements over `curve25519-dalek`.
//!
//! Scalars arrive as [`BigInt`]. The unclamped operations reduce them
//! modulo the prime subgroup order L. The clamped ones apply the X25519
//! clamp to the 32-byte little-endian form first, as key derivation does.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Neg, Sub};
use std::sync::OnceLock;

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::{Identity, IsIdentity};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

use crate::bigint::BigInt;
use crate::error::{CryptoError, CryptoResult};

/// Length of an encoded point
pub const ED25519_POINT_LEN: usize = 32;

/// L = 2^252 + 27742317777372353535851937790883648493
const ORDER_HEX: &str = "1000000000000000000000000000000014def9dea2f79cd65812631a5cf5d3ed";

static ORDER: OnceLock<BigInt> = OnceLock::new();

/// Order L of the prime subgroup generated by the base point
pub fn ed25519_group_order() -> &'static BigInt {
    ORDER.get_or_init(|| BigInt::from_hex(ORDER_HEX).unwrap_or_default())
}

/// 32-byte little-endian form of a non-negative scalar below `2^256`
fn scalar_bytes_le(k: &BigInt) -> CryptoResult<[u8; 32]> {
    if k.is_negative() {
        return Err(CryptoError::Domain("scalar must be non-negative".into()));
    }
    let mut bytes = k.to_be_bytes32()?;
    bytes.reverse();
    Ok(bytes)
}

/// `k mod L` as a dalek scalar
fn reduced_scalar(k: &BigInt) -> CryptoResult<Scalar> {
    if k.is_negative() {
        return Err(CryptoError::Domain("scalar must be non-negative".into()));
    }
    let mut bytes = scalar_bytes_le(&k.reduce(ed25519_group_order()))?;
    let scalar = Scalar::from_bytes_mod_order(bytes);
    bytes.zeroize();
    Ok(scalar)
}

/// A point on the Ed25519 curve, not necessarily in the prime subgroup
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Point(EdwardsPoint);

impl Ed25519Point {
    /// The neutral element `(0, 1)`
    #[must_use]
    pub fn identity() -> Self {
        Self(EdwardsPoint::identity())
    }

    /// The standard base point B
    #[must_use]
    pub const fn base() -> Self {
        Self(ED25519_BASEPOINT_POINT)
    }

    /// A uniformly random element of the prime subgroup
    #[must_use]
    pub fn random() -> Self {
        let mut wide = [0u8; 64];
        OsRng.fill_bytes(&mut wide);
        let scalar = Scalar::from_bytes_mod_order_wide(&wide);
        wide.zeroize();
        Self(EdwardsPoint::mul_base(&scalar))
    }

    /// `self + other`
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        Self(self.0 + other.0)
    }

    /// `self - other`
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        Self(self.0 - other.0)
    }

    /// `2·self`
    #[must_use]
    pub fn double(&self) -> Self {
        Self(self.0 + self.0)
    }

    /// `-self`
    #[must_use]
    pub fn negate(&self) -> Self {
        Self(-self.0)
    }

    /// `(k mod L)·self`
    ///
    /// # Errors
    /// Returns `Domain` for a negative scalar.
    pub fn mul_unclamped(&self, k: &BigInt) -> CryptoResult<Self> {
        Ok(Self(self.0 * reduced_scalar(k)?))
    }

    /// Multiplication by the clamped form of `k`
    ///
    /// # Errors
    /// Returns `Domain` for a negative scalar, `Size` when `k >= 2^256`, and
    /// `InvalidKey` when `self` is not a valid prime-order point.
    pub fn mul_clamped(&self, k: &BigInt) -> CryptoResult<Self> {
        if !self.is_valid() {
            return Err(CryptoError::InvalidKey("point is not in the prime-order subgroup".into()));
        }
        let mut bytes = scalar_bytes_le(k)?;
        let product = self.0.mul_clamped(bytes);
        bytes.zeroize();
        Ok(Self(product))
    }

    /// `(k mod L)·B`
    ///
    /// # Errors
    /// Returns `Domain` for a negative scalar.
    pub fn base_mul_unclamped(k: &BigInt) -> CryptoResult<Self> {
        Ok(Self(EdwardsPoint::mul_base(&reduced_scalar(k)?)))
    }

    /// Clamped `k` times B, the public key of a raw X25519-style scalar
    ///
    /// # Errors
    /// Returns `Domain` for a negative scalar and `Size` when `k >= 2^256`.
    pub fn base_mul_clamped(k: &BigInt) -> CryptoResult<Self> {
        let mut bytes = scalar_bytes_le(k)?;
        let product = EdwardsPoint::mul_base_clamped(bytes);
        bytes.zeroize();
        Ok(Self(product))
    }

    /// Canonical representative, re-decoded from its encoding
    #[must_use]
    pub fn normalize(&self) -> Self {
        self.0.compress().decompress().map_or(*self, Self)
    }

    /// Whether this is the neutral element
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.0.is_identity()
    }

    /// In the prime-order subgroup and not of small order. The identity and
    /// the torsion points are invalid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.0.is_small_order() && self.0.is_torsion_free()
    }

    /// 32-byte compressed encoding; the identity encodes as `01 00 .. 00`
    #[must_use]
    pub fn encode(&self) -> [u8; ED25519_POINT_LEN] {
        self.0.compress().to_bytes()
    }

    /// Decode a compressed point. Points outside the prime subgroup decode
    /// and report `is_valid() == false`.
    ///
    /// # Errors
    /// Returns `Length` unless the input is 32 bytes and `Parse` when it is
    /// not the canonical encoding of a curve point.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let arr: [u8; ED25519_POINT_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::length("Ed25519 point", "32", bytes.len()))?;
        let point = CompressedEdwardsY(arr)
            .decompress()
            .ok_or_else(|| CryptoError::Parse("bytes are not an Ed25519 point".into()))?;
        if point.compress().to_bytes() != arr {
            return Err(CryptoError::Parse("non-canonical Ed25519 point encoding".into()));
        }
        Ok(Self(point))
    }
}

impl Default for Ed25519Point {
    fn default() -> Self {
        Self::identity()
    }
}

impl Hash for Ed25519Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.encode().hash(state);
    }
}

impl fmt::Debug for Ed25519Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Point({})", hex::encode(self.encode()))
    }
}

impl Serialize for Ed25519Point {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.encode()))
    }
}

impl<'de> Deserialize<'de> for Ed25519Point {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

impl Add for &Ed25519Point {
    type Output = Ed25519Point;

    fn add(self, rhs: Self) -> Ed25519Point {
        Ed25519Point::add(self, rhs)
    }
}

impl Sub for &Ed25519Point {
    type Output = Ed25519Point;

    fn sub(self, rhs: Self) -> Ed25519Point {
        Ed25519Point::sub(self, rhs)
    }
}

impl Neg for &Ed25519Point {
    type Output = Ed25519Point;

    fn neg(self) -> Ed25519Point {
        self.negate()
    }
}
