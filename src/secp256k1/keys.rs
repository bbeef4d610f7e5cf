//! secp256k1 key material.

use std::fmt;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::trace;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::params::CurveParams;
use super::point::{Point, COMPRESSED_LEN};
use crate::bigint::BigInt;
use crate::error::{CryptoError, CryptoResult};

/// Length of a raw secret scalar
pub const SECRET_KEY_LEN: usize = 32;
/// Length of an x-only public key
pub const XONLY_LEN: usize = 32;

/// A secret scalar in `[1, n-1]`
///
/// SECURITY: wiped on drop; neither `Clone` nor a revealing `Debug`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; SECRET_KEY_LEN]);

impl SecretKey {
    /// Generate a uniformly random secret key
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_with_rng(&mut OsRng)
    }

    /// Rejection-sample 32 bytes until they encode a scalar in `[1, n-1]`
    pub fn generate_with_rng<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Self {
        loop {
            let mut bytes = [0u8; SECRET_KEY_LEN];
            rng.fill_bytes(&mut bytes);
            let parsed = Self::from_bytes(&bytes);
            bytes.zeroize();
            match parsed {
                Ok(key) => return key,
                Err(_) => trace!("secret key candidate out of range, resampling"),
            }
        }
    }

    /// Parse a raw 32-byte big-endian scalar
    ///
    /// # Errors
    /// Returns `Length` for anything but 32 bytes and `InvalidKey` when the
    /// scalar is zero or not below n.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let arr: [u8; SECRET_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::length("secret key", "32", bytes.len()))?;
        let scalar = BigInt::from_unsigned_bytes(&arr);
        if scalar.is_zero() || &scalar >= CurveParams::secp256k1().curve_order() {
            return Err(CryptoError::InvalidKey("secret scalar must be in [1, n-1]".into()));
        }
        Ok(Self(arr))
    }

    pub(crate) fn from_scalar(scalar: &BigInt) -> CryptoResult<Self> {
        let bytes = scalar.to_be_bytes32()?;
        Self::from_bytes(&bytes)
    }

    /// Raw big-endian bytes
    ///
    /// # Security
    /// The returned array is secret key material.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; SECRET_KEY_LEN] {
        self.0
    }

    pub(crate) fn scalar(&self) -> BigInt {
        BigInt::from_unsigned_bytes(&self.0)
    }

    /// `d·G`, on the fixed-schedule ladder
    #[must_use]
    pub fn public_point(&self) -> Point {
        Point::generator().mul_secret(&self.0)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// A secret key with its compressed public key
pub struct KeyPair {
    secret: SecretKey,
    public: [u8; COMPRESSED_LEN],
}

impl KeyPair {
    /// Generate a fresh random keypair
    #[must_use]
    pub fn generate() -> Self {
        Self::from_secret_key(SecretKey::generate())
    }

    /// Build a keypair from an existing secret
    #[must_use]
    pub fn from_secret_key(secret: SecretKey) -> Self {
        let mut public = [0u8; COMPRESSED_LEN];
        public.copy_from_slice(&secret.public_point().encode(true));
        Self { secret, public }
    }

    /// Secret half
    #[must_use]
    pub const fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// Compressed SEC1 public key
    #[must_use]
    pub const fn public_key(&self) -> &[u8; COMPRESSED_LEN] {
        &self.public
    }

    /// Raw 32-byte secret
    #[must_use]
    pub const fn secret_bytes(&self) -> [u8; SECRET_KEY_LEN] {
        self.secret.to_bytes()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({}..)", &hex::encode(self.public)[..16])
    }
}

/// Compressed public key for a raw 32-byte secret
///
/// # Errors
/// Returns `Length` or `InvalidKey` as [`SecretKey::from_bytes`] does.
pub fn public_key_from_secret(secret: &[u8]) -> CryptoResult<[u8; COMPRESSED_LEN]> {
    let secret = SecretKey::from_bytes(secret)?;
    Ok(*KeyPair::from_secret_key(secret).public_key())
}

/// Parity of the y-coordinate dropped from an x-only key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parity {
    /// y is even
    Even,
    /// y is odd
    Odd,
}

impl Parity {
    /// Parity of the given point's affine y
    #[must_use]
    pub fn of(point: &Point) -> Self {
        if point.has_even_y() {
            Self::Even
        } else {
            Self::Odd
        }
    }

    /// 0 for even, 1 for odd
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Even => 0,
            Self::Odd => 1,
        }
    }
}

/// A BIP340 x-only public key plus the parity of the full point
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct XOnlyPublicKey {
    bytes: [u8; XONLY_LEN],
    parity: Parity,
}

impl XOnlyPublicKey {
    /// Parse 32 bytes, checking that the x-coordinate lifts to a point.
    /// The parity is taken as even, matching `lift_x`.
    ///
    /// # Errors
    /// Returns `Length` for anything but 32 bytes and `InvalidKey` when no
    /// curve point has this x.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let arr: [u8; XONLY_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::length("x-only public key", "32", bytes.len()))?;
        if Point::lift_x(&BigInt::from_unsigned_bytes(&arr)).is_none() {
            return Err(CryptoError::InvalidKey("x-coordinate is not on the curve".into()));
        }
        Ok(Self {
            bytes: arr,
            parity: Parity::Even,
        })
    }

    /// x-only form of a finite point
    ///
    /// # Errors
    /// Returns `State` for the point at infinity.
    pub fn from_point(point: &Point) -> CryptoResult<Self> {
        Ok(Self {
            bytes: point.x_bytes()?,
            parity: Parity::of(point),
        })
    }

    /// The 32-byte x-coordinate
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; XONLY_LEN] {
        &self.bytes
    }

    /// Parity of the point this key was derived from
    #[must_use]
    pub const fn parity(&self) -> Parity {
        self.parity
    }

    /// The even-y point with this x
    ///
    /// # Errors
    /// Returns `InvalidKey` when the x-coordinate does not lift.
    pub fn to_point(&self) -> CryptoResult<Point> {
        Point::lift_x(&BigInt::from_unsigned_bytes(&self.bytes))
            .ok_or_else(|| CryptoError::InvalidKey("x-coordinate is not on the curve".into()))
    }

    /// Convert to hex string
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Debug for XOnlyPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XOnly({}.., {:?})", &self.to_hex()[..16], self.parity)
    }
}

impl fmt::Display for XOnlyPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for XOnlyPublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for XOnlyPublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

/// x-only public key of a raw 32-byte secret
///
/// # Errors
/// Returns `Length` or `InvalidKey` as [`SecretKey::from_bytes`] does.
pub fn xonly_from_secret(secret: &[u8]) -> CryptoResult<XOnlyPublicKey> {
    let secret = SecretKey::from_bytes(secret)?;
    XOnlyPublicKey::from_point(&secret.public_point())
}
