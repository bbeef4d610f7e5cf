//! Ed25519 signatures and group elements, delegated to `ed25519-dalek` and
//! `curve25519-dalek`.
//!
//! This is a thin adapter exposing raw byte arrays and the crate's error
//! type; no curve arithmetic is reimplemented here. Attached signatures use
//! the `signature ‖ message` layout.

mod point;

pub use point::{ed25519_group_order, Ed25519Point, ED25519_POINT_LEN};

use std::fmt;

use ed25519_dalek::{Signer as DalekSigner, SigningKey, Verifier as DalekVerifier, VerifyingKey};
use rand::rngs::OsRng;
use tracing::debug;

use crate::error::{CryptoError, CryptoResult};

/// Seed length
pub const ED25519_SEED_LEN: usize = 32;
/// Public key length
pub const ED25519_PUBLIC_KEY_LEN: usize = 32;
/// Signature length
pub const ED25519_SIGNATURE_LEN: usize = 64;

/// An Ed25519 signing key with its public key
///
/// SECURITY: intentionally neither `Clone` nor a revealing `Debug`; the
/// underlying `SigningKey` zeroizes on drop.
pub struct Ed25519KeyPair(SigningKey);

impl Ed25519KeyPair {
    /// Generate a new random keypair
    #[must_use]
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        Self(SigningKey::generate(&mut csprng))
    }

    /// Deterministic keypair from a 32-byte seed
    ///
    /// # Errors
    /// Returns `Length` for anything but 32 bytes.
    pub fn from_seed(seed: &[u8]) -> CryptoResult<Self> {
        let seed: &[u8; ED25519_SEED_LEN] = seed
            .try_into()
            .map_err(|_| CryptoError::length("Ed25519 seed", "32", seed.len()))?;
        Ok(Self(SigningKey::from_bytes(seed)))
    }

    /// The 32-byte seed
    ///
    /// # Security
    /// The returned array is secret key material.
    #[must_use]
    pub fn seed(&self) -> [u8; ED25519_SEED_LEN] {
        self.0.to_bytes()
    }

    /// The 32-byte public key
    #[must_use]
    pub fn public_key(&self) -> [u8; ED25519_PUBLIC_KEY_LEN] {
        self.0.verifying_key().to_bytes()
    }

    /// Deterministic signature over `message`
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> [u8; ED25519_SIGNATURE_LEN] {
        self.0.sign(message).to_bytes()
    }

    /// `signature ‖ message`, to be checked and unwrapped by [`ed25519_open`]
    #[must_use]
    pub fn sign_attached(&self, message: &[u8]) -> Vec<u8> {
        let mut signed = Vec::with_capacity(ED25519_SIGNATURE_LEN + message.len());
        signed.extend_from_slice(&self.sign(message));
        signed.extend_from_slice(message);
        signed
    }
}

impl fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519KeyPair({}..)", &hex::encode(self.public_key())[..16])
    }
}

/// Verify an Ed25519 signature. A public key that is not a valid point
/// verifies as false.
///
/// # Errors
/// Returns `Length` for a key other than 32 bytes or a signature other than
/// 64 bytes.
pub fn ed25519_verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> CryptoResult<bool> {
    let key: &[u8; ED25519_PUBLIC_KEY_LEN] = public_key
        .try_into()
        .map_err(|_| CryptoError::length("Ed25519 public key", "32", public_key.len()))?;
    let sig: &[u8; ED25519_SIGNATURE_LEN] = signature
        .try_into()
        .map_err(|_| CryptoError::length("Ed25519 signature", "64", signature.len()))?;

    let Ok(verifying_key) = VerifyingKey::from_bytes(key) else {
        return Ok(false);
    };
    let sig = ed25519_dalek::Signature::from_bytes(sig);
    Ok(verifying_key.verify(message, &sig).is_ok())
}

/// Check an attached signature and return the message it carries
///
/// # Errors
/// Returns `Length` for a key other than 32 bytes or input shorter than a
/// signature, and `Authentication` when the signature does not verify.
pub fn ed25519_open(signed: &[u8], public_key: &[u8]) -> CryptoResult<Vec<u8>> {
    if signed.len() < ED25519_SIGNATURE_LEN {
        return Err(CryptoError::length(
            "attached Ed25519 signature",
            "at least 64",
            signed.len(),
        ));
    }
    let (signature, message) = signed.split_at(ED25519_SIGNATURE_LEN);
    if ed25519_verify(public_key, message, signature)? {
        Ok(message.to_vec())
    } else {
        debug!("attached Ed25519 signature rejected");
        Err(CryptoError::Authentication)
    }
}
