//! Arithmetic in GF(p), p the secp256k1 field prime.

use super::params::CurveParams;
use crate::bigint::BigInt;

fn p() -> &'static BigInt {
    CurveParams::secp256k1().field_p()
}

/// Canonical residue in `[0, p)`
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub(crate) struct FieldElement(BigInt);

impl FieldElement {
    pub(crate) fn new(value: &BigInt) -> Self {
        Self(value.reduce(p()))
    }

    pub(crate) fn zero() -> Self {
        Self(BigInt::zero())
    }

    pub(crate) fn one() -> Self {
        Self(BigInt::one())
    }

    pub(crate) fn from_u64(value: u64) -> Self {
        Self::new(&BigInt::from(value))
    }

    /// Parse a hex constant known to be below p
    pub(crate) fn from_hex(hex: &str) -> Self {
        Self::new(&BigInt::from_hex(hex).unwrap_or_default())
    }

    /// Big-endian bytes; `None` when the value is not below p
    pub(crate) fn from_canonical_bytes(bytes: &[u8]) -> Option<Self> {
        let value = BigInt::from_unsigned_bytes(bytes);
        (&value < p()).then_some(Self(value))
    }

    pub(crate) const fn value(&self) -> &BigInt {
        &self.0
    }

    /// Fixed 32-byte big-endian encoding
    pub(crate) fn to_bytes(&self) -> [u8; 32] {
        let bytes = self.0.to_byte_array();
        let tail = &bytes[bytes.len().saturating_sub(32)..];
        let mut out = [0u8; 32];
        out[32 - tail.len()..].copy_from_slice(tail);
        out
    }

    pub(crate) fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `sgn0` for a prime field
    pub(crate) fn is_odd(&self) -> bool {
        self.0.is_odd()
    }

    pub(crate) fn add(&self, other: &Self) -> Self {
        Self::new(&self.0.add(&other.0))
    }

    pub(crate) fn sub(&self, other: &Self) -> Self {
        Self::new(&self.0.subtract(&other.0))
    }

    pub(crate) fn mul(&self, other: &Self) -> Self {
        Self::new(&self.0.multiply(&other.0))
    }

    pub(crate) fn square(&self) -> Self {
        self.mul(self)
    }

    pub(crate) fn double(&self) -> Self {
        self.add(self)
    }

    pub(crate) fn mul_small(&self, k: u64) -> Self {
        Self::new(&self.0.multiply(&BigInt::from(k)))
    }

    pub(crate) fn negate(&self) -> Self {
        Self::new(&self.0.negate())
    }

    pub(crate) fn pow(&self, exponent: &BigInt) -> Self {
        Self(self.0.mod_pow(exponent, p()).unwrap_or_default())
    }

    /// Multiplicative inverse, with `inv0(0) = 0`
    pub(crate) fn invert(&self) -> Self {
        Self(self.0.mod_inverse(p()).unwrap_or_default())
    }

    /// Square root for p ≡ 3 (mod 4); `None` for non-residues
    pub(crate) fn sqrt(&self) -> Option<Self> {
        let root = self.pow(CurveParams::secp256k1().sqrt_exponent());
        (root.square() == *self).then_some(root)
    }
}
