//! Error taxonomy shared by every module of the crate.

use thiserror::Error;

/// Cryptographic and arithmetic errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Mathematically undefined operation (non-invertible value, bad modulus,
    /// division by zero, negative value where an unsigned one is required)
    #[error("domain error: {0}")]
    Domain(String),
    /// Output buffer cannot hold the value, or a non-positive size was requested
    #[error("size error: {0}")]
    Size(String),
    /// Wire-format byte length matches no recognized encoding
    #[error("invalid {what} length: expected {expected}, got {actual}")]
    Length {
        /// What was being decoded
        what: &'static str,
        /// Accepted length(s), human readable
        expected: String,
        /// Length actually supplied
        actual: usize,
    },
    /// Operation not permitted in the current state
    #[error("illegal state: {0}")]
    State(String),
    /// Malformed textual integer or undecodable point encoding
    #[error("parse error: {0}")]
    Parse(String),
    /// Key material that has the right shape but is not usable
    #[error("invalid key: {0}")]
    InvalidKey(String),
    /// AEAD tag or attached signature did not verify
    #[error("authentication failed")]
    Authentication,
}

impl CryptoError {
    pub(crate) fn length(what: &'static str, expected: impl Into<String>, actual: usize) -> Self {
        Self::Length {
            what,
            expected: expected.into(),
            actual,
        }
    }
}

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;
