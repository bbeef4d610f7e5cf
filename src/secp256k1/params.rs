//! secp256k1 domain parameters (SEC 2, section 2.4.1).

use std::sync::OnceLock;

use super::point::Point;
use crate::bigint::BigInt;

const P_HEX: &str = "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F";
const N_HEX: &str = "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141";
/// n as 32 big-endian bytes, for fixed-width scalar arithmetic
pub(crate) const ORDER_BYTES: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];
const GX_HEX: &str = "79BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798";
const GY_HEX: &str = "483ADA7726A3C4655DA4FBFC0E1108A8FD17B448A68554199C47D08FFB10D4B8";

/// Immutable secp256k1 constants
#[derive(Clone, Debug)]
pub struct CurveParams {
    p: BigInt,
    n: BigInt,
    a: BigInt,
    b: BigInt,
    gx: BigInt,
    gy: BigInt,
    half_n: BigInt,
    sqrt_exponent: BigInt,
}

static SECP256K1: OnceLock<CurveParams> = OnceLock::new();

impl CurveParams {
    /// The process-wide secp256k1 parameter set
    pub fn secp256k1() -> &'static Self {
        SECP256K1.get_or_init(|| {
            let hex = |s: &str| BigInt::from_hex(s).unwrap_or_default();
            let p = hex(P_HEX);
            let n = hex(N_HEX);
            Self {
                half_n: n.shift_right(1),
                sqrt_exponent: p.add(&BigInt::one()).shift_right(2),
                a: BigInt::zero(),
                b: BigInt::from(7),
                gx: hex(GX_HEX),
                gy: hex(GY_HEX),
                p,
                n,
            }
        })
    }

    /// Field prime p
    #[must_use]
    pub const fn field_p(&self) -> &BigInt {
        &self.p
    }

    /// Group order n
    #[must_use]
    pub const fn curve_order(&self) -> &BigInt {
        &self.n
    }

    /// Coefficient a (zero for secp256k1)
    #[must_use]
    pub const fn a(&self) -> &BigInt {
        &self.a
    }

    /// Coefficient b
    #[must_use]
    pub const fn b(&self) -> &BigInt {
        &self.b
    }

    /// Cofactor
    #[must_use]
    pub const fn cofactor(&self) -> u32 {
        1
    }

    /// Generator x-coordinate
    #[must_use]
    pub const fn generator_x(&self) -> &BigInt {
        &self.gx
    }

    /// Generator y-coordinate
    #[must_use]
    pub const fn generator_y(&self) -> &BigInt {
        &self.gy
    }

    /// The generator point
    #[must_use]
    pub fn generator(&self) -> Point {
        Point::generator()
    }

    /// floor(n / 2), the low-s bound
    pub(crate) const fn half_order(&self) -> &BigInt {
        &self.half_n
    }

    /// (p + 1) / 4, the square-root exponent for p ≡ 3 (mod 4)
    pub(crate) const fn sqrt_exponent(&self) -> &BigInt {
        &self.sqrt_exponent
    }

    /// Build a point from affine coordinates without checking curve
    /// membership; call `is_valid` on the result.
    #[must_use]
    pub fn create_point(&self, x: &BigInt, y: &BigInt) -> Point {
        Point::create(x, y)
    }

    /// Reduce a scalar into `[0, n)`
    #[must_use]
    pub fn reduce_scalar(&self, k: &BigInt) -> BigInt {
        k.reduce(&self.n)
    }
}
