//! Recoverable ECDSA over secp256k1.
//!
//! Nonces are derived deterministically per RFC 6979 (HMAC-SHA256) from the
//! secret and the 32-byte message hash. Signatures are low-s normalized and
//! carry a recovery id so the signer's public key can be reconstructed.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, trace};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::keys::SecretKey;
use super::params::CurveParams;
use super::point::{Point, COMPRESSED_LEN};
use crate::bigint::BigInt;
use crate::error::{CryptoError, CryptoResult};

/// Length of the message hash being signed
pub const MESSAGE_HASH_LEN: usize = 32;
/// `r ‖ s`
pub const COMPACT_SIGNATURE_LEN: usize = 64;
/// `r ‖ s ‖ recid`
pub const RECOVERABLE_SIGNATURE_LEN: usize = 65;

type HmacSha256 = Hmac<Sha256>;

fn hmac(key: &[u8; 32], parts: &[&[u8]]) -> CryptoResult<[u8; 32]> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| CryptoError::InvalidKey(format!("HMAC key: {e}")))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().into())
}

/// RFC 6979 section 3.2 HMAC-DRBG, yielding candidate nonces in order
#[derive(Zeroize, ZeroizeOnDrop)]
struct NonceGenerator {
    k: [u8; 32],
    v: [u8; 32],
    #[zeroize(skip)]
    fresh: bool,
}

impl NonceGenerator {
    fn new(secret: &[u8; 32], hash: &[u8; 32]) -> CryptoResult<Self> {
        let n = CurveParams::secp256k1().curve_order();
        let h = BigInt::from_unsigned_bytes(hash).reduce(n).to_be_bytes32()?;
        let mut k = [0u8; 32];
        let mut v = [1u8; 32];
        k = hmac(&k, &[&v, &[0x00], secret, &h])?;
        v = hmac(&k, &[&v])?;
        k = hmac(&k, &[&v, &[0x01], secret, &h])?;
        v = hmac(&k, &[&v])?;
        Ok(Self { k, v, fresh: true })
    }

    fn next_nonce(&mut self) -> CryptoResult<BigInt> {
        let n = CurveParams::secp256k1().curve_order();
        loop {
            if !self.fresh {
                self.k = hmac(&self.k, &[&self.v, &[0x00]])?;
                self.v = hmac(&self.k, &[&self.v])?;
            }
            self.fresh = false;
            self.v = hmac(&self.k, &[&self.v])?;
            let candidate = BigInt::from_unsigned_bytes(&self.v);
            if !candidate.is_zero() && &candidate < n {
                return Ok(candidate);
            }
        }
    }
}

fn message_array(message: &[u8]) -> CryptoResult<[u8; MESSAGE_HASH_LEN]> {
    message
        .try_into()
        .map_err(|_| CryptoError::length("message hash", "32", message.len()))
}

/// Sign a 32-byte message hash, returning `r ‖ s ‖ recid`
///
/// # Errors
/// Returns `Length` when `message` is not 32 bytes, or the errors of
/// [`SecretKey::from_bytes`] for a bad secret.
pub fn sign_recoverable(
    message: &[u8],
    secret: &[u8],
) -> CryptoResult<[u8; RECOVERABLE_SIGNATURE_LEN]> {
    let hash = message_array(message)?;
    let secret = SecretKey::from_bytes(secret)?;
    let params = CurveParams::secp256k1();
    let n = params.curve_order();
    let d = secret.scalar();
    let z = BigInt::from_unsigned_bytes(&hash).reduce(n);

    let mut nonces = NonceGenerator::new(&secret.to_bytes(), &hash)?;
    loop {
        let k = nonces.next_nonce()?;
        let big_r = Point::base_mul_sec(&k)?;
        let (Ok(rx), Ok(ry)) = (big_r.affine_x(), big_r.affine_y()) else {
            continue;
        };
        let r = rx.reduce(n);
        if r.is_zero() {
            trace!("ECDSA nonce gave r = 0, drawing next");
            continue;
        }
        let k_inv = k.mod_inverse_sec(n)?;
        let rd = r.mod_multiply_sec(&d, n)?;
        let s = k_inv.mod_multiply_sec(&z.mod_add_sec(&rd, n)?, n)?;
        if s.is_zero() {
            trace!("ECDSA nonce gave s = 0, drawing next");
            continue;
        }

        let mut recid = u8::from(ry.is_odd()) | (if &rx >= n { 2 } else { 0 });
        let s = if &s > params.half_order() {
            recid ^= 1;
            n.subtract(&s)
        } else {
            s
        };

        let mut out = [0u8; RECOVERABLE_SIGNATURE_LEN];
        out[..32].copy_from_slice(&r.to_be_bytes32()?);
        out[32..64].copy_from_slice(&s.to_be_bytes32()?);
        out[64] = recid;
        return Ok(out);
    }
}

/// `(r, s)` if both lie in `[1, n-1]`
fn parse_rs(sig: &[u8]) -> Option<(BigInt, BigInt)> {
    let n = CurveParams::secp256k1().curve_order();
    let r = BigInt::from_unsigned_bytes(&sig[..32]);
    let s = BigInt::from_unsigned_bytes(&sig[32..64]);
    let in_range = |v: &BigInt| !v.is_zero() && v < n;
    (in_range(&r) && in_range(&s)).then_some((r, s))
}

/// Recover the signer's public key from a recoverable signature. `None`
/// when the signature is malformed or recovers nothing.
///
/// # Errors
/// Returns `Length` for a message other than 32 bytes or a signature other
/// than 65 bytes.
pub fn recover_public_key(message: &[u8], signature: &[u8]) -> CryptoResult<Option<Point>> {
    let hash = message_array(message)?;
    if signature.len() != RECOVERABLE_SIGNATURE_LEN {
        return Err(CryptoError::length("recoverable signature", "65", signature.len()));
    }
    let recid = signature[64];
    let Some((r, s)) = parse_rs(signature) else {
        return Ok(None);
    };
    if recid > 3 {
        return Ok(None);
    }

    let params = CurveParams::secp256k1();
    let n = params.curve_order();
    let x = if recid & 2 == 0 { r.clone() } else { r.add(n) };
    if &x >= params.field_p() {
        return Ok(None);
    }

    let mut encoded = [0u8; COMPRESSED_LEN];
    encoded[0] = 0x02 | (recid & 1);
    encoded[1..].copy_from_slice(&x.to_be_bytes32()?);
    let big_r = Point::from_bytes(&encoded)?;
    if !big_r.is_valid() {
        return Ok(None);
    }

    // Q = r^-1 (s·R - z·G)
    let z = BigInt::from_unsigned_bytes(&hash).reduce(n);
    let r_inv = r.mod_inverse(n)?;
    let u1 = n.subtract(&z).multiply(&r_inv).reduce(n);
    let u2 = s.multiply(&r_inv).reduce(n);
    let q = Point::base_mul(&u1)?.add(&big_r.mul(&u2)?);
    Ok((!q.is_infinity()).then_some(q))
}

/// Check a recoverable signature by recovering the key and comparing it
/// with `public_key` (33- or 65-byte SEC1)
///
/// # Errors
/// Returns `Length` for wrong message, signature or key lengths.
pub fn verify_recoverable(
    message: &[u8],
    signature: &[u8],
    public_key: &[u8],
) -> CryptoResult<bool> {
    let expected = Point::from_bytes(public_key)?;
    let recovered = recover_public_key(message, signature)?;
    Ok(expected.is_valid() && recovered.is_some_and(|q| q == expected))
}

/// Standard ECDSA verification of `r ‖ s` against a SEC1 public key
///
/// # Errors
/// Returns `Length` for wrong message, signature or key lengths.
pub fn verify_ecdsa(message: &[u8], signature: &[u8], public_key: &[u8]) -> CryptoResult<bool> {
    let hash = message_array(message)?;
    if signature.len() != COMPACT_SIGNATURE_LEN {
        return Err(CryptoError::length("ECDSA signature", "64", signature.len()));
    }
    let q = Point::from_bytes(public_key)?;
    if !q.is_valid() {
        debug!("ECDSA verify: public key not on curve");
        return Ok(false);
    }
    let Some((r, s)) = parse_rs(signature) else {
        debug!("ECDSA verify: r or s out of range");
        return Ok(false);
    };

    let n = CurveParams::secp256k1().curve_order();
    let z = BigInt::from_unsigned_bytes(&hash).reduce(n);
    let w = s.mod_inverse(n)?;
    let u1 = z.multiply(&w).reduce(n);
    let u2 = r.multiply(&w).reduce(n);
    let x = Point::base_mul(&u1)?.add(&q.mul(&u2)?);
    Ok(x.affine_x().is_ok_and(|xr| xr.reduce(n) == r))
}
