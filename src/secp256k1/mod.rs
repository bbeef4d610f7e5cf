//! secp256k1 curve arithmetic and the signature schemes built on it.
//!
//! - [`Point`] group law with SEC1 encodings
//! - recoverable ECDSA with RFC 6979 nonces
//! - BIP340 Schnorr and BIP341 Taproot key tweaking
//! - RFC 9380 hash-to-curve (`secp256k1_XMD:SHA-256_SSWU_RO_`)

mod ecdsa;
mod field;
mod hash_to_curve;
mod keys;
mod params;
mod point;
mod schnorr;

pub use ecdsa::{
    recover_public_key, sign_recoverable, verify_ecdsa, verify_recoverable,
    COMPACT_SIGNATURE_LEN, MESSAGE_HASH_LEN, RECOVERABLE_SIGNATURE_LEN,
};
pub use hash_to_curve::{
    encode_to_curve, expand_message_xmd, hash_to_curve, hash_to_field, iso_map,
    map_to_curve_sswu, IsogenyPoint, MAX_DST_LEN, MAX_XMD_LEN,
};
pub use keys::{
    public_key_from_secret, xonly_from_secret, KeyPair, Parity, SecretKey, XOnlyPublicKey,
    SECRET_KEY_LEN, XONLY_LEN,
};
pub use params::CurveParams;
pub use point::{Point, COMPRESSED_LEN, UNCOMPRESSED_LEN};
pub use schnorr::{
    schnorr_sign, schnorr_sign_with_aux, schnorr_verify, taproot_sign, taproot_tweak_public,
    taproot_tweak_secret, taproot_verify, SCHNORR_SIGNATURE_LEN,
};

use sha2::{Digest, Sha256};

/// BIP340 tagged hash: `SHA256(SHA256(tag) ‖ SHA256(tag) ‖ parts...)`
pub(crate) fn tagged_hash(tag: &str, parts: &[&[u8]]) -> [u8; 32] {
    let tag_hash = Sha256::digest(tag.as_bytes());
    let mut hasher = Sha256::new();
    hasher.update(tag_hash);
    hasher.update(tag_hash);
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_hash_splits_freely() {
        let joined = tagged_hash("BIP0340/challenge", &[b"abcdef"]);
        let split = tagged_hash("BIP0340/challenge", &[b"abc", b"def"]);
        assert_eq!(joined, split);
        assert_ne!(joined, tagged_hash("BIP0340/nonce", &[b"abcdef"]));
    }
}
