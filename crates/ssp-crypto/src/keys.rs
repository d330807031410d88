//! Key material types.
//!
//! Private keys and symmetric keys live in `Zeroizing` buffers and are wiped
//! when dropped. [`PrivateKey`] is deliberately not `Clone` and its `Debug`
//! output never includes key bytes.

use crate::{Error, Result};
use core::fmt;
use zeroize::Zeroizing;

/// Length of every key handled by the protocol (X25519, Ed25519, symmetric).
pub const KEY_LENGTH: usize = 32;

/// 32-byte symmetric key, zeroed on drop.
pub type SymmetricKey = Zeroizing<[u8; KEY_LENGTH]>;

/// Output of a Diffie-Hellman operation, zeroed on drop.
pub type DhOutput = Zeroizing<[u8; KEY_LENGTH]>;

/// Algorithm a key belongs to. The discriminant is the wire code used in
/// certificate bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyType {
    /// Curve25519 Diffie-Hellman key.
    X25519 = 0x00,
    /// Ed25519 signing key.
    Ed25519 = 0x01,
}

impl KeyType {
    /// Convert from wire format (u8).
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::X25519),
            0x01 => Some(Self::Ed25519),
            _ => None,
        }
    }

    /// Convert to wire format (u8).
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Public key with its type tag.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    key_type: KeyType,
    bytes: [u8; KEY_LENGTH],
}

impl PublicKey {
    /// Wrap raw public key bytes.
    pub fn new(key_type: KeyType, bytes: [u8; KEY_LENGTH]) -> Self {
        Self { key_type, bytes }
    }

    /// Build a public key from a slice, checking the length.
    pub fn from_slice(key_type: KeyType, bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_LENGTH] = bytes.try_into().map_err(|_| Error::InvalidLength {
            expected: KEY_LENGTH,
            actual: bytes.len(),
        })?;
        Ok(Self { key_type, bytes })
    }

    /// Key algorithm.
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.bytes
    }

    /// Fail with [`Error::BadKeyType`] unless this key has the given type.
    pub fn expect_type(&self, expected: KeyType) -> Result<&[u8; KEY_LENGTH]> {
        if self.key_type != expected {
            return Err(Error::BadKeyType {
                expected,
                actual: self.key_type,
            });
        }
        Ok(&self.bytes)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({:?}, ", self.key_type)?;
        for b in &self.bytes[..4] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, "..)")
    }
}

/// Private key with its type tag, zeroed on drop.
pub struct PrivateKey {
    key_type: KeyType,
    bytes: Zeroizing<[u8; KEY_LENGTH]>,
}

impl PrivateKey {
    /// Wrap raw private key bytes. For Ed25519 this is the 32-byte seed.
    pub fn new(key_type: KeyType, bytes: Zeroizing<[u8; KEY_LENGTH]>) -> Self {
        Self { key_type, bytes }
    }

    /// Key algorithm.
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Raw key bytes, after checking the key type.
    pub fn expose(&self, expected: KeyType) -> Result<&[u8; KEY_LENGTH]> {
        if self.key_type != expected {
            return Err(Error::BadKeyType {
                expected,
                actual: self.key_type,
            });
        }
        Ok(&self.bytes)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({:?}, <redacted>)", self.key_type)
    }
}

/// Matching public and private key.
#[derive(Debug)]
pub struct KeyPair {
    /// Public half.
    pub public_key: PublicKey,
    /// Private half.
    pub private_key: PrivateKey,
}

impl KeyPair {
    /// Key algorithm of the pair.
    pub fn key_type(&self) -> KeyType {
        self.public_key.key_type()
    }
}
