//! # TSS Crypto
//!
//! Arithmetic and signature primitives for threshold signing on secp256k1.
//!
//! ## Architecture
//!
//! - **bigint**: arbitrary-precision integers, side-channel-resistant
//!   modular exponentiation and inversion, Miller-Rabin and Blum prime search
//! - **secp256k1**: group law, SEC1 encodings, recoverable ECDSA, BIP340
//!   Schnorr, BIP341 Taproot tweaks, RFC 9380 hash-to-curve
//! - **ed25519**: detached and attached signatures over `ed25519-dalek`,
//!   group elements over `curve25519-dalek`
//! - **sodium**: XChaCha20-Poly1305 AEAD and key-erasing buffers
//!
//! ## Security Model
//!
//! - Products, sums and inverses of secret scalars and nonces use the
//!   fixed-width `*_sec` limb paths; `d·G` and `k·G` use the fixed-schedule
//!   ladder of `Point::mul_sec`
//! - Signature verification never errors on attacker input; it returns `false`
//! - Secret material is zeroized on drop and never printed by `Debug`

#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms
)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod bigint;
pub mod config;
pub mod ed25519;
pub mod error;
pub mod secp256k1;
pub mod sodium;

pub use bigint::{BigInt, BlumPair, PrimeGenerator};
pub use config::PrimeSearchConfig;
pub use ed25519::{ed25519_open, ed25519_verify, Ed25519KeyPair, Ed25519Point};
pub use error::{CryptoError, CryptoResult};
pub use secp256k1::{
    hash_to_curve, recover_public_key, schnorr_sign, schnorr_verify, sign_recoverable,
    taproot_sign, taproot_verify, verify_recoverable, CurveParams, KeyPair, Point,
    XOnlyPublicKey,
};
pub use sodium::{AeadCipher, ReadOnlyBuffer, SecureBuffer, XChaCha20Poly1305Cipher};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// RFC 9380 suite identifier implemented by [`secp256k1::hash_to_curve`]
pub const SECP256K1_H2C_SUITE: &str = "secp256k1_XMD:SHA-256_SSWU_RO_";
