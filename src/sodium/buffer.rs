//! Read-only secure buffers for key material.

use std::fmt;

use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptoError, CryptoResult};

/// Key-erasing buffer: readable until closed, wiped on close and on drop
pub trait SecureBuffer {
    /// Owned copy of the contents
    ///
    /// # Errors
    /// Returns `State` after `close`.
    fn read(&self) -> CryptoResult<Vec<u8>>;

    /// Borrowed read-only view of the contents
    ///
    /// # Errors
    /// Returns `State` after `close`.
    fn as_slice(&self) -> CryptoResult<&[u8]>;

    /// Wipe and release the contents; later access fails
    fn close(&mut self);

    /// Whether `close` has been called
    fn is_closed(&self) -> bool;
}

/// Secure copy of caller-supplied bytes
///
/// Construction copies the input once and zeroes the caller's slice, so the
/// secret lives only here.
pub struct ReadOnlyBuffer {
    data: Option<Zeroizing<Vec<u8>>>,
    len: usize,
}

impl ReadOnlyBuffer {
    /// Take ownership of `source`'s contents, zeroing `source`
    #[must_use]
    pub fn new(source: &mut [u8]) -> Self {
        let data = Zeroizing::new(source.to_vec());
        source.zeroize();
        Self {
            len: data.len(),
            data: Some(data),
        }
    }

    /// Length of the protected data; stays valid after close
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the protected data is empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn contents(&self) -> CryptoResult<&[u8]> {
        self.data
            .as_deref()
            .map(Vec::as_slice)
            .ok_or_else(|| CryptoError::State("secure buffer is closed".into()))
    }
}

impl SecureBuffer for ReadOnlyBuffer {
    fn read(&self) -> CryptoResult<Vec<u8>> {
        self.contents().map(<[u8]>::to_vec)
    }

    fn as_slice(&self) -> CryptoResult<&[u8]> {
        self.contents()
    }

    fn close(&mut self) {
        // dropping the Zeroizing wrapper wipes the bytes
        self.data = None;
    }

    fn is_closed(&self) -> bool {
        self.data.is_none()
    }
}

impl fmt::Debug for ReadOnlyBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReadOnlyBuffer([REDACTED; {} bytes])", self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use rand::RngCore;

    #[test]
    fn test_copies_and_zeroes_source() {
        let mut src = [0u8; 32];
        OsRng.fill_bytes(&mut src);
        let snapshot = src;

        let buf = ReadOnlyBuffer::new(&mut src);
        assert_eq!(src, [0u8; 32], "source array not zeroed");

        let mut copy = buf.read().unwrap();
        assert_eq!(copy, snapshot);
        copy.fill(0);
        assert_eq!(buf.read().unwrap(), snapshot, "secure memory mutated");
        assert_eq!(buf.as_slice().unwrap()[0], snapshot[0]);
    }

    #[test]
    fn test_access_after_close_fails() {
        let mut key = [7u8; 8];
        let mut buf = ReadOnlyBuffer::new(&mut key);
        assert!(!buf.is_closed());
        buf.close();
        assert!(buf.is_closed());
        assert!(matches!(buf.read(), Err(CryptoError::State(_))));
        assert!(matches!(buf.as_slice(), Err(CryptoError::State(_))));
        assert_eq!(buf.len(), 8);
        buf.close();
    }

    #[test]
    fn test_debug_redacts() {
        let mut key = *b"topsecret";
        let buf = ReadOnlyBuffer::new(&mut key);
        let debug = format!("{buf:?}");
        assert!(!debug.contains("topsecret"));
        assert!(debug.contains("9 bytes"));
    }
}
