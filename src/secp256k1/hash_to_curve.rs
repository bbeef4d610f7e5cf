//! RFC 9380 hashing to secp256k1, suite `secp256k1_XMD:SHA-256_SSWU_RO_`.
//!
//! secp256k1 has `a = 0`, so the simplified SWU map runs on the 3-isogenous
//! curve `E': y² = x³ + A'x + B'` and the result is carried over by the
//! isogeny of RFC 9380 appendix E.1. Inputs here are public, so the map is
//! written for clarity rather than constant time.

use std::sync::OnceLock;

use sha2::{Digest, Sha256};

use super::field::FieldElement;
use super::params::CurveParams;
use super::point::Point;
use crate::bigint::BigInt;
use crate::error::{CryptoError, CryptoResult};

/// Largest output of `expand_message_xmd` with SHA-256 (255 blocks)
pub const MAX_XMD_LEN: usize = 255 * 32;
/// Longest accepted domain separation tag
pub const MAX_DST_LEN: usize = 255;

/// Bytes per field element in `hash_to_field`: ceil((256 + 128) / 8)
const L: usize = 48;
const SHA256_BLOCK: usize = 64;

/// A point on the isogenous curve E'
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IsogenyPoint {
    /// Affine x on E'
    pub x: BigInt,
    /// Affine y on E'
    pub y: BigInt,
}

struct SswuConstants {
    a: FieldElement,
    b: FieldElement,
    z: FieldElement,
    x_num: [FieldElement; 4],
    x_den: [FieldElement; 2],
    y_num: [FieldElement; 4],
    y_den: [FieldElement; 3],
}

static CONSTANTS: OnceLock<SswuConstants> = OnceLock::new();

fn constants() -> &'static SswuConstants {
    CONSTANTS.get_or_init(|| {
        let f = FieldElement::from_hex;
        SswuConstants {
            a: f("3f8731abdd661adca08a5558f0f5d272e953d363cb6f0e5d405447c01a444533"),
            b: FieldElement::from_u64(1771),
            z: FieldElement::from_u64(11).negate(),
            x_num: [
                f("8e38e38e38e38e38e38e38e38e38e38e38e38e38e38e38e38e38e38daaaaa8c7"),
                f("07d3d4c80bc321d5b9f315cea7fd44c5d595d2fc0bf63b92dfff1044f17c6581"),
                f("534c328d23f234e6e2a413deca25caece4506144037c40314ecbd0b53d9dd262"),
                f("8e38e38e38e38e38e38e38e38e38e38e38e38e38e38e38e38e38e38daaaaa88c"),
            ],
            x_den: [
                f("d35771193d94918a9ca34ccbb7b640dd86cd409542f8487d9fe6b745781eb49b"),
                f("edadc6f64383dc1df7c4b2d51b54225406d36b641f5e41bbc52a56612a8c6d14"),
            ],
            y_num: [
                f("4bda12f684bda12f684bda12f684bda12f684bda12f684bda12f684b8e38e23c"),
                f("c75e0c32d5cb7c0fa9d0a54b12a0a6d5647ab046d686da6fdffc90fc201d71a3"),
                f("29a6194691f91a73715209ef6512e576722830a201be2018a765e85a9ecee931"),
                f("2f684bda12f684bda12f684bda12f684bda12f684bda12f684bda12f38e38d84"),
            ],
            y_den: [
                f("fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffff93b"),
                f("7a06534bb8bdb49fd5e9e6632722c2989467c1bfc8e8d978dfb425d2685c2573"),
                f("6484aa716545ca2cf3a70c3fa8fe337e0a3d21162f0d6299a7bf8192bfd2a76f"),
            ],
        }
    })
}

/// `expand_message_xmd` (RFC 9380 section 5.3.1) with SHA-256
///
/// # Errors
/// Returns `Size` when `len_in_bytes > 8160`, or when the DST is empty or
/// longer than 255 bytes.
pub fn expand_message_xmd(msg: &[u8], dst: &[u8], len_in_bytes: usize) -> CryptoResult<Vec<u8>> {
    if len_in_bytes > MAX_XMD_LEN {
        return Err(CryptoError::Size(format!(
            "expand_message_xmd output of {len_in_bytes} bytes exceeds {MAX_XMD_LEN}"
        )));
    }
    if dst.is_empty() || dst.len() > MAX_DST_LEN {
        return Err(CryptoError::Size(format!(
            "DST must be 1..={MAX_DST_LEN} bytes, got {}",
            dst.len()
        )));
    }
    // both fit: ell <= 255, len_in_bytes <= 8160, dst.len() <= 255
    let ell = len_in_bytes.div_ceil(32);
    let len_prefix = u16::try_from(len_in_bytes).unwrap_or(u16::MAX).to_be_bytes();
    let dst_len = u8::try_from(dst.len()).unwrap_or(u8::MAX);

    let b0: [u8; 32] = Sha256::new()
        .chain_update([0u8; SHA256_BLOCK])
        .chain_update(msg)
        .chain_update(len_prefix)
        .chain_update([0u8])
        .chain_update(dst)
        .chain_update([dst_len])
        .finalize()
        .into();

    let mut out = Vec::with_capacity(ell * 32);
    let mut prev = [0u8; 32];
    for i in 1..=ell {
        let mut input = b0;
        for (x, p) in input.iter_mut().zip(prev) {
            *x ^= p;
        }
        prev = Sha256::new()
            .chain_update(input)
            .chain_update([u8::try_from(i).unwrap_or(u8::MAX)])
            .chain_update(dst)
            .chain_update([dst_len])
            .finalize()
            .into();
        out.extend_from_slice(&prev);
    }
    out.truncate(len_in_bytes);
    Ok(out)
}

/// `count` field elements from `msg` (RFC 9380 section 5.2, m = 1, L = 48)
///
/// # Errors
/// As [`expand_message_xmd`].
pub fn hash_to_field(msg: &[u8], dst: &[u8], count: usize) -> CryptoResult<Vec<BigInt>> {
    let uniform = expand_message_xmd(msg, dst, count * L)?;
    Ok(uniform
        .chunks_exact(L)
        .map(|chunk| FieldElement::new(&BigInt::from_unsigned_bytes(chunk)).value().clone())
        .collect())
}

fn curve_prime_rhs(c: &SswuConstants, x: &FieldElement) -> FieldElement {
    x.square().mul(x).add(&c.a.mul(x)).add(&c.b)
}

/// Simplified SWU map of a field element onto E' (RFC 9380 section 6.6.2)
#[must_use]
pub fn map_to_curve_sswu(u: &BigInt) -> IsogenyPoint {
    let c = constants();
    let u = FieldElement::new(u);
    let zu2 = c.z.mul(&u.square());
    let tv1 = zu2.square().add(&zu2).invert();

    let x1 = if tv1.is_zero() {
        c.b.mul(&c.z.mul(&c.a).invert())
    } else {
        c.b.negate().mul(&c.a.invert()).mul(&FieldElement::one().add(&tv1))
    };

    let (x, mut y) = match curve_prime_rhs(c, &x1).sqrt() {
        Some(y1) => (x1, y1),
        None => {
            // Z is a non-residue, so g(Z·u²·x1) is a square here
            let x2 = zu2.mul(&x1);
            let y2 = curve_prime_rhs(c, &x2).pow(CurveParams::secp256k1().sqrt_exponent());
            (x2, y2)
        }
    };
    if u.is_odd() != y.is_odd() {
        y = y.negate();
    }
    IsogenyPoint {
        x: x.value().clone(),
        y: y.value().clone(),
    }
}

/// Horner evaluation with coefficients from the constant term up
fn poly(coeffs: &[FieldElement], x: &FieldElement, monic: bool) -> FieldElement {
    let init = if monic { FieldElement::one() } else { FieldElement::zero() };
    coeffs.iter().rev().fold(init, |acc, k| acc.mul(x).add(k))
}

/// 3-isogeny from E' to secp256k1; exceptional inputs map to infinity
#[must_use]
pub fn iso_map(p: &IsogenyPoint) -> Point {
    let c = constants();
    let x = FieldElement::new(&p.x);
    let y = FieldElement::new(&p.y);

    let x_num = poly(&c.x_num, &x, false);
    let x_den = poly(&c.x_den, &x, true);
    let y_num = poly(&c.y_num, &x, false);
    let y_den = poly(&c.y_den, &x, true);
    if x_den.is_zero() || y_den.is_zero() {
        return Point::infinity();
    }
    Point::from_affine(x_num.mul(&x_den.invert()), y.mul(&y_num).mul(&y_den.invert()))
}

fn map_to_secp256k1(u: &BigInt) -> Point {
    iso_map(&map_to_curve_sswu(u))
}

/// Random-oracle hash to secp256k1 (`hash_to_curve`, RFC 9380 section 3).
/// The cofactor is 1, so no clearing step is needed.
///
/// # Errors
/// As [`expand_message_xmd`].
pub fn hash_to_curve(msg: &[u8], dst: &[u8]) -> CryptoResult<Point> {
    let u = hash_to_field(msg, dst, 2)?;
    let q = map_to_secp256k1(&u[0]).add(&map_to_secp256k1(&u[1]));
    Ok(q.normalize())
}

/// Nonuniform encoding (`encode_to_curve`): one field element, one map
///
/// # Errors
/// As [`expand_message_xmd`].
pub fn encode_to_curve(msg: &[u8], dst: &[u8]) -> CryptoResult<Point> {
    let u = hash_to_field(msg, dst, 1)?;
    Ok(map_to_secp256k1(&u[0]).normalize())
}
