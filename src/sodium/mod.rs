//! Symmetric AEAD and key-erasing buffers.
//!
//! Callers program against [`AeadCipher`] and [`SecureBuffer`]; the
//! production cipher is XChaCha20-Poly1305 from the `chacha20poly1305`
//! crate. Ciphertexts are self-contained: `nonce ‖ ciphertext ‖ tag`.
//!
//! ## Security Notes
//!
//! - Every `encrypt` call draws a fresh 24-byte random nonce, so keys may be
//!   reused freely
//! - Any authentication failure is reported as an opaque
//!   [`CryptoError::Authentication`] and no plaintext is released

mod buffer;

pub use buffer::{ReadOnlyBuffer, SecureBuffer};

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;

use crate::error::{CryptoError, CryptoResult};

/// XChaCha20-Poly1305 key length
pub const XCHACHA20_POLY1305_KEY_LEN: usize = 32;
/// XChaCha20-Poly1305 nonce length
pub const XNONCE_LEN: usize = 24;
/// Poly1305 tag length
pub const TAG_LEN: usize = 16;

/// AEAD cipher with a fixed key length and optional associated data
pub trait AeadCipher {
    /// Key length in bytes
    const KEY_LEN: usize;

    /// Encrypt `plaintext`, returning a self-contained ciphertext
    ///
    /// # Errors
    /// Returns `Length` when the key is not [`Self::KEY_LEN`] bytes.
    fn encrypt(&self, plaintext: &[u8], aad: Option<&[u8]>, key: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Authenticate and decrypt a ciphertext produced by `encrypt`
    ///
    /// # Errors
    /// Returns `Length` for a wrong key length and `Authentication` when the
    /// ciphertext, key or associated data do not match.
    fn decrypt(&self, ciphertext: &[u8], aad: Option<&[u8]>, key: &[u8]) -> CryptoResult<Vec<u8>>;
}

fn check_key_len(key: &[u8], expected: usize) -> CryptoResult<()> {
    if key.len() == expected {
        Ok(())
    } else {
        Err(CryptoError::length("AEAD key", expected.to_string(), key.len()))
    }
}

/// XChaCha20-Poly1305 (extended 192-bit nonce)
#[derive(Clone, Copy, Debug, Default)]
pub struct XChaCha20Poly1305Cipher;

impl XChaCha20Poly1305Cipher {
    /// The cipher; it holds no state
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn keyed(key: &[u8]) -> CryptoResult<XChaCha20Poly1305> {
        check_key_len(key, XCHACHA20_POLY1305_KEY_LEN)?;
        XChaCha20Poly1305::new_from_slice(key)
            .map_err(|_| CryptoError::length("AEAD key", "32", key.len()))
    }
}

impl AeadCipher for XChaCha20Poly1305Cipher {
    const KEY_LEN: usize = XCHACHA20_POLY1305_KEY_LEN;

    fn encrypt(&self, plaintext: &[u8], aad: Option<&[u8]>, key: &[u8]) -> CryptoResult<Vec<u8>> {
        let cipher = Self::keyed(key)?;
        let mut nonce = [0u8; XNONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let payload = Payload {
            msg: plaintext,
            aad: aad.unwrap_or_default(),
        };
        let sealed = cipher
            .encrypt(XNonce::from_slice(&nonce), payload)
            .map_err(|e| CryptoError::State(format!("encryption failed: {e}")))?;

        let mut out = Vec::with_capacity(XNONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8], aad: Option<&[u8]>, key: &[u8]) -> CryptoResult<Vec<u8>> {
        let cipher = Self::keyed(key)?;
        if ciphertext.len() < XNONCE_LEN + TAG_LEN {
            debug!(len = ciphertext.len(), "ciphertext shorter than nonce and tag");
            return Err(CryptoError::Authentication);
        }
        let (nonce, sealed) = ciphertext.split_at(XNONCE_LEN);
        let payload = Payload {
            msg: sealed,
            aad: aad.unwrap_or_default(),
        };
        cipher
            .decrypt(XNonce::from_slice(nonce), payload)
            .map_err(|_| CryptoError::Authentication)
    }
}

/// Encrypt under a key held in a secure buffer
///
/// # Errors
/// Returns `State` if the key buffer was closed, otherwise as
/// [`AeadCipher::encrypt`].
pub fn seal_with<C, B>(
    cipher: &C,
    plaintext: &[u8],
    aad: Option<&[u8]>,
    key: &B,
) -> CryptoResult<Vec<u8>>
where
    C: AeadCipher + ?Sized,
    B: SecureBuffer + ?Sized,
{
    cipher.encrypt(plaintext, aad, key.as_slice()?)
}

/// Decrypt under a key held in a secure buffer
///
/// # Errors
/// Returns `State` if the key buffer was closed, otherwise as
/// [`AeadCipher::decrypt`].
pub fn open_with<C, B>(
    cipher: &C,
    ciphertext: &[u8],
    aad: Option<&[u8]>,
    key: &B,
) -> CryptoResult<Vec<u8>>
where
    C: AeadCipher + ?Sized,
    B: SecureBuffer + ?Sized,
{
    cipher.decrypt(ciphertext, aad, key.as_slice()?)
}

/// Deterministic stand-in cipher for tests: SHA-256 counter-mode keystream
/// and a truncated SHA-256 tag. Not secure.
#[cfg(test)]
pub(crate) struct InsecureTestCipher;

#[cfg(test)]
impl InsecureTestCipher {
    const NONCE_LEN: usize = 8;

    fn keystream_block(key: &[u8], nonce: &[u8], counter: u64) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        Sha256::new()
            .chain_update(key)
            .chain_update(nonce)
            .chain_update(counter.to_be_bytes())
            .finalize()
            .into()
    }

    fn tag(key: &[u8], nonce: &[u8], aad: &[u8], body: &[u8]) -> [u8; TAG_LEN] {
        use sha2::{Digest, Sha256};
        let digest: [u8; 32] = Sha256::new()
            .chain_update(b"tag")
            .chain_update(key)
            .chain_update(nonce)
            .chain_update((aad.len() as u64).to_be_bytes())
            .chain_update(aad)
            .chain_update(body)
            .finalize()
            .into();
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&digest[..TAG_LEN]);
        tag
    }

    fn apply_keystream(key: &[u8], nonce: &[u8], data: &[u8]) -> Vec<u8> {
        data.chunks(32)
            .zip(0u64..)
            .flat_map(|(chunk, i)| {
                let block = Self::keystream_block(key, nonce, i);
                chunk.iter().zip(block).map(|(b, k)| b ^ k).collect::<Vec<_>>()
            })
            .collect()
    }
}

#[cfg(test)]
impl AeadCipher for InsecureTestCipher {
    const KEY_LEN: usize = 32;

    fn encrypt(&self, plaintext: &[u8], aad: Option<&[u8]>, key: &[u8]) -> CryptoResult<Vec<u8>> {
        check_key_len(key, Self::KEY_LEN)?;
        let aad = aad.unwrap_or_default();
        let seed = Self::tag(key, &[], aad, plaintext);
        let nonce = &seed[..Self::NONCE_LEN];
        let body = Self::apply_keystream(key, nonce, plaintext);
        let tag = Self::tag(key, nonce, aad, &body);
        Ok([nonce, body.as_slice(), tag.as_slice()].concat())
    }

    fn decrypt(&self, ciphertext: &[u8], aad: Option<&[u8]>, key: &[u8]) -> CryptoResult<Vec<u8>> {
        use subtle::ConstantTimeEq;
        check_key_len(key, Self::KEY_LEN)?;
        if ciphertext.len() < Self::NONCE_LEN + TAG_LEN {
            return Err(CryptoError::Authentication);
        }
        let (nonce, rest) = ciphertext.split_at(Self::NONCE_LEN);
        let (body, tag) = rest.split_at(rest.len() - TAG_LEN);
        let expected = Self::tag(key, nonce, aad.unwrap_or_default(), body);
        if !bool::from(expected.as_slice().ct_eq(tag)) {
            return Err(CryptoError::Authentication);
        }
        Ok(Self::apply_keystream(key, nonce, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_key() -> Vec<u8> {
        let mut key = vec![0u8; XCHACHA20_POLY1305_KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Fail-closed contract every implementation must meet
    fn check_contract<C: AeadCipher>(cipher: &C) {
        let key = random_key();
        let ct = cipher.encrypt(b"Hello AEAD", Some(b"ExtraData"), &key).unwrap();
        assert!(ct.len() > b"Hello AEAD".len());
        assert_eq!(cipher.decrypt(&ct, Some(b"ExtraData"), &key).unwrap(), b"Hello AEAD");

        let ct = cipher.encrypt(b"No AAD Test", None, &key).unwrap();
        assert_eq!(cipher.decrypt(&ct, None, &key).unwrap(), b"No AAD Test");

        let ct = cipher.encrypt(b"Data", Some(b"AAD"), &key).unwrap();
        assert_eq!(cipher.decrypt(&ct, Some(b"BAD"), &key), Err(CryptoError::Authentication));
        assert_eq!(cipher.decrypt(&ct, None, &key), Err(CryptoError::Authentication));
        assert_eq!(
            cipher.decrypt(&ct, Some(b"AAD"), &random_key()),
            Err(CryptoError::Authentication)
        );

        let mut tampered = ct.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        assert_eq!(cipher.decrypt(&tampered, Some(b"AAD"), &key), Err(CryptoError::Authentication));
        assert_eq!(cipher.decrypt(&ct[..10], Some(b"AAD"), &key), Err(CryptoError::Authentication));

        assert!(matches!(
            cipher.encrypt(&[], None, &[0u8; 16]),
            Err(CryptoError::Length { actual: 16, .. })
        ));
        assert!(matches!(
            cipher.decrypt(&[], None, &[0u8; 16]),
            Err(CryptoError::Length { actual: 16, .. })
        ));
    }

    #[test]
    fn test_xchacha_contract() {
        check_contract(&XChaCha20Poly1305Cipher::new());
    }

    #[test]
    fn test_fake_contract() {
        check_contract(&InsecureTestCipher);
    }

    #[test]
    fn test_xchacha_layout() {
        let key = random_key();
        let ct = XChaCha20Poly1305Cipher.encrypt(b"abc", None, &key).unwrap();
        assert_eq!(ct.len(), XNONCE_LEN + 3 + TAG_LEN);
        let again = XChaCha20Poly1305Cipher.encrypt(b"abc", None, &key).unwrap();
        assert_ne!(ct, again, "nonce must be fresh per call");
    }

    #[test]
    fn test_seal_with_buffered_key() {
        let mut key = random_key();
        let mut buffer = ReadOnlyBuffer::new(&mut key);
        let ct = seal_with(&InsecureTestCipher, b"payload", None, &buffer).unwrap();
        assert_eq!(open_with(&InsecureTestCipher, &ct, None, &buffer).unwrap(), b"payload");

        buffer.close();
        assert!(matches!(
            seal_with(&XChaCha20Poly1305Cipher, b"payload", None, &buffer),
            Err(CryptoError::State(_))
        ));
    }
}
