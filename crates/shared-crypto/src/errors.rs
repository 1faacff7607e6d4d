//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Encoding key is not valid base64
    #[error("Invalid encoding key: {0}")]
    InvalidKeyEncoding(String),

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Cipher text is not valid base64 or not a whole number of AES blocks
    #[error("Invalid cipher text: {0}")]
    InvalidCipherText(String),

    /// Decrypted bytes do not form a valid envelope
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}

impl CryptoError {
    /// Whether this error comes from key material rather than a single payload.
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            CryptoError::InvalidKeyEncoding(_) | CryptoError::InvalidKeyLength { .. }
        )
    }
}
