//! Error types for cryptographic operations.

use thiserror::Error;

/// Result type alias for cryptographic operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Key exchange failed.
    #[error("Key exchange failed: {0}")]
    KeyExchange(String),

    /// AEAD encryption failed.
    #[error("AEAD encryption failed: {0}")]
    Encryption(String),

    /// AEAD decryption or tag verification failed.
    #[error("AEAD decryption failed: {0}")]
    Decryption(String),

    /// Key derivation failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// MAC initialization failed.
    #[error("MAC failed: {0}")]
    Mac(String),

    /// Invalid input length.
    #[error("Invalid input length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length received in bytes.
        actual: usize,
    },

    /// Key has the wrong type for the requested operation.
    #[error("Bad key type: expected {expected:?}, got {actual:?}")]
    BadKeyType {
        /// Key type the operation requires.
        expected: crate::keys::KeyType,
        /// Key type that was supplied.
        actual: crate::keys::KeyType,
    },

    /// Invalid public key.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
}
