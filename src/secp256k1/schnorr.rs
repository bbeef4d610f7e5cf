//! BIP340 Schnorr signatures and BIP341 Taproot key tweaking.

use tracing::{debug, warn};

use super::keys::{SecretKey, XOnlyPublicKey, XONLY_LEN};
use super::params::CurveParams;
use super::point::Point;
use super::tagged_hash;
use crate::bigint::BigInt;
use crate::error::{CryptoError, CryptoResult};

/// `R.x ‖ s`
pub const SCHNORR_SIGNATURE_LEN: usize = 64;

const TAG_AUX: &str = "BIP0340/aux";
const TAG_NONCE: &str = "BIP0340/nonce";
const TAG_CHALLENGE: &str = "BIP0340/challenge";
const TAG_TAPTWEAK: &str = "TapTweak";

fn hash_to_scalar(tag: &str, parts: &[&[u8]]) -> BigInt {
    let n = CurveParams::secp256k1().curve_order();
    BigInt::from_unsigned_bytes(&tagged_hash(tag, parts)).reduce(n)
}

/// Secret scalar adjusted so that `d·G` has even y, plus that point
fn even_y_secret(secret: &SecretKey) -> (BigInt, Point) {
    let n = CurveParams::secp256k1().curve_order();
    let d0 = secret.scalar();
    let point = secret.public_point();
    if point.has_even_y() {
        (d0, point)
    } else {
        (n.subtract(&d0), point.negate())
    }
}

/// BIP340 signature with all-zero auxiliary randomness
///
/// # Errors
/// See [`schnorr_sign_with_aux`].
pub fn schnorr_sign(message: &[u8], secret: &[u8]) -> CryptoResult<[u8; SCHNORR_SIGNATURE_LEN]> {
    schnorr_sign_with_aux(message, secret, &[0u8; 32])
}

/// BIP340 signature over a message of any length
///
/// # Errors
/// Returns `Length` or `InvalidKey` for a bad secret, `Length` when
/// `aux_rand` is not 32 bytes, and `State` in the negligible case that the
/// derived nonce is zero.
pub fn schnorr_sign_with_aux(
    message: &[u8],
    secret: &[u8],
    aux_rand: &[u8],
) -> CryptoResult<[u8; SCHNORR_SIGNATURE_LEN]> {
    let secret = SecretKey::from_bytes(secret)?;
    if aux_rand.len() != 32 {
        return Err(CryptoError::length("aux_rand", "32", aux_rand.len()));
    }
    let n = CurveParams::secp256k1().curve_order();
    let (d, p) = even_y_secret(&secret);
    let d_bytes = d.to_be_bytes32()?;
    let px = p.x_bytes()?;

    let mut t = tagged_hash(TAG_AUX, &[aux_rand]);
    for (ti, di) in t.iter_mut().zip(d_bytes) {
        *ti ^= di;
    }
    let k0 = hash_to_scalar(TAG_NONCE, &[&t, &px, message]);
    if k0.is_zero() {
        return Err(CryptoError::State("BIP340 nonce is zero".into()));
    }
    let r_point = Point::base_mul_sec(&k0)?;
    let k = if r_point.has_even_y() { k0 } else { n.subtract(&k0) };
    let rx = r_point.x_bytes()?;
    let e = hash_to_scalar(TAG_CHALLENGE, &[&rx, &px, message]);
    let s = k.mod_add_sec(&e.mod_multiply_sec(&d, n)?, n)?;

    let mut sig = [0u8; SCHNORR_SIGNATURE_LEN];
    sig[..32].copy_from_slice(&rx);
    sig[32..].copy_from_slice(&s.to_be_bytes32()?);

    if !schnorr_verify(message, &sig, &px)? {
        warn!("BIP340 signature failed self-verification");
        return Err(CryptoError::State("produced signature does not verify".into()));
    }
    Ok(sig)
}

/// BIP340 verification against a 32-byte x-only public key
///
/// # Errors
/// Returns `Length` for a signature other than 64 bytes or a key other than
/// 32 bytes.
pub fn schnorr_verify(message: &[u8], signature: &[u8], public_key: &[u8]) -> CryptoResult<bool> {
    if signature.len() != SCHNORR_SIGNATURE_LEN {
        return Err(CryptoError::length("Schnorr signature", "64", signature.len()));
    }
    if public_key.len() != XONLY_LEN {
        return Err(CryptoError::length("x-only public key", "32", public_key.len()));
    }
    let params = CurveParams::secp256k1();
    let Some(p) = Point::lift_x(&BigInt::from_unsigned_bytes(public_key)) else {
        debug!("Schnorr verify: public key does not lift");
        return Ok(false);
    };
    let r = BigInt::from_unsigned_bytes(&signature[..32]);
    let s = BigInt::from_unsigned_bytes(&signature[32..]);
    if &r >= params.field_p() || &s >= params.curve_order() {
        debug!("Schnorr verify: r or s out of range");
        return Ok(false);
    }

    let e = hash_to_scalar(TAG_CHALLENGE, &[&signature[..32], public_key, message]);
    let big_r = Point::base_mul(&s)?.sub(&p.mul(&e)?);
    if big_r.is_infinity() || !big_r.has_even_y() {
        debug!("Schnorr verify: R is infinity or has odd y");
        return Ok(false);
    }
    Ok(big_r.affine_x()? == r)
}

fn check_merkle_root(merkle_root: &[u8]) -> CryptoResult<()> {
    match merkle_root.len() {
        0 | 32 => Ok(()),
        len => Err(CryptoError::length("taproot merkle root", "0 or 32", len)),
    }
}

/// `t = H_TapTweak(P.x ‖ merkle_root)`, rejected when not below n
fn tap_tweak(px: &[u8], merkle_root: &[u8]) -> CryptoResult<BigInt> {
    let t = BigInt::from_unsigned_bytes(&tagged_hash(TAG_TAPTWEAK, &[px, merkle_root]));
    if &t >= CurveParams::secp256k1().curve_order() {
        return Err(CryptoError::InvalidKey("taproot tweak exceeds curve order".into()));
    }
    Ok(t)
}

/// Output key `Q = P + t·G` for an internal x-only key. An empty merkle root
/// commits to a key-path-only output.
///
/// # Errors
/// Returns `Length` for a key other than 32 bytes or a merkle root other than
/// 0 or 32 bytes, and `InvalidKey` when the key does not lift, the tweak is
/// out of range, or `Q` is infinity.
pub fn taproot_tweak_public(
    internal_key: &[u8],
    merkle_root: &[u8],
) -> CryptoResult<XOnlyPublicKey> {
    check_merkle_root(merkle_root)?;
    let internal = XOnlyPublicKey::from_bytes(internal_key)?;
    let p = internal.to_point()?;
    let t = tap_tweak(internal.as_bytes(), merkle_root)?;
    let q = p.add(&Point::base_mul(&t)?);
    if q.is_infinity() {
        return Err(CryptoError::InvalidKey("tweaked key is infinity".into()));
    }
    XOnlyPublicKey::from_point(&q)
}

/// Secret for the tweaked output key
///
/// # Errors
/// Returns `Length` or `InvalidKey` for a bad secret or merkle root, and
/// `InvalidKey` when the tweaked scalar is zero.
pub fn taproot_tweak_secret(secret: &[u8], merkle_root: &[u8]) -> CryptoResult<SecretKey> {
    check_merkle_root(merkle_root)?;
    let secret = SecretKey::from_bytes(secret)?;
    let (d, p) = even_y_secret(&secret);
    let t = tap_tweak(&p.x_bytes()?, merkle_root)?;
    let tweaked = d.mod_add_sec(&t, CurveParams::secp256k1().curve_order())?;
    SecretKey::from_scalar(&tweaked)
}

/// Key-path spend signature under the tweaked secret
///
/// # Errors
/// As [`taproot_tweak_secret`] and [`schnorr_sign`].
pub fn taproot_sign(
    message: &[u8],
    secret: &[u8],
    merkle_root: &[u8],
) -> CryptoResult<[u8; SCHNORR_SIGNATURE_LEN]> {
    let tweaked = taproot_tweak_secret(secret, merkle_root)?;
    schnorr_sign(message, &tweaked.to_bytes())
}

/// Verify a key-path spend signature against the internal key
///
/// # Errors
/// Returns `Length` for malformed lengths; an internal key that does not
/// lift verifies as false.
pub fn taproot_verify(
    message: &[u8],
    signature: &[u8],
    internal_key: &[u8],
    merkle_root: &[u8],
) -> CryptoResult<bool> {
    match taproot_tweak_public(internal_key, merkle_root) {
        Ok(output) => schnorr_verify(message, signature, output.as_bytes()),
        Err(CryptoError::InvalidKey(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
