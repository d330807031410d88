//! Cryptographic primitives for the secure session protocol.
//!
//! This crate provides:
//! - Algorithm identifiers negotiated in the handshake ([`suite`])
//! - Key types with zero-on-drop private material ([`keys`])
//! - Key exchange (X25519), signatures (Ed25519)
//! - HMAC-SHA256, HKDF-SHA256 and AES-256-GCM
//! - The [`CryptoBackend`] trait through which the protocol engine reaches all of the above
//!
//! Security requirements:
//! - All secrets use Zeroizing wrappers
//! - Constant-time comparisons via subtle crate
//! - No logging of key material

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aead;
pub mod backend;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod kex;
pub mod mac;
pub mod sign;
pub mod suite;

pub use backend::{CryptoBackend, RustCryptoBackend};
pub use error::{Error, Result};
pub use keys::{KeyPair, KeyType, PrivateKey, PublicKey, SymmetricKey};
pub use suite::CryptoSuite;
