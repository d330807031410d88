//! Pluggable cryptographic backend.
//!
//! The protocol engine never calls primitives directly; it goes through a
//! [`CryptoBackend`] handle passed in at construction. [`RustCryptoBackend`]
//! is the production implementation. Tests substitute deterministic backends.

use crate::keys::{DhOutput, KeyPair, PrivateKey, SymmetricKey};
use crate::mac::SHA256_LENGTH;
use crate::sign::SIGNATURE_LENGTH;
use crate::{aead, kdf, kex, mac, sign, Result};
use rand::RngCore;
use zeroize::Zeroizing;

/// Cryptographic primitives consumed by the protocol engine.
///
/// Implementations must be stateless from the caller's point of view.
pub trait CryptoBackend: Send + Sync {
    /// Fill `dest` with cryptographically secure random bytes.
    fn fill_random(&self, dest: &mut [u8]);

    /// Constant-time equality.
    fn secure_equals(&self, lhs: &[u8], rhs: &[u8]) -> bool;

    /// SHA-256 over the concatenation of `parts`.
    fn hash_sha256(&self, parts: &[&[u8]]) -> [u8; SHA256_LENGTH];

    /// HMAC-SHA256 over the concatenation of `parts`.
    fn hmac_sha256(&self, key: &[u8], parts: &[&[u8]]) -> Result<Zeroizing<[u8; SHA256_LENGTH]>>;

    /// Derive two 32-byte keys with HKDF-SHA256.
    fn hkdf_sha256(
        &self,
        salt: &[u8],
        ikm_parts: &[&[u8]],
        info: &[u8],
    ) -> Result<(SymmetricKey, SymmetricKey)>;

    /// Generate an X25519 key pair.
    fn gen_keypair_x25519(&self) -> Result<KeyPair>;

    /// X25519 Diffie-Hellman.
    fn dh_x25519(&self, private: &PrivateKey, peer_public: &[u8]) -> Result<DhOutput>;

    /// Generate an Ed25519 key pair.
    fn gen_keypair_ed25519(&self) -> Result<KeyPair>;

    /// Ed25519 signature over `message`.
    fn sign_ed25519(&self, private: &PrivateKey, message: &[u8]) -> Result<[u8; SIGNATURE_LENGTH]>;

    /// Ed25519 verification.
    fn verify_ed25519(&self, public: &[u8], message: &[u8], signature: &[u8]) -> bool;

    /// AES-256-GCM encryption, returns `ciphertext || tag`.
    fn aes256_gcm_encrypt(
        &self,
        key: &SymmetricKey,
        nonce: u16,
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>>;

    /// AES-256-GCM decryption of `ciphertext || tag`.
    fn aes256_gcm_decrypt(
        &self,
        key: &SymmetricKey,
        nonce: u16,
        aad: &[u8],
        ciphertext_and_tag: &[u8],
    ) -> Result<Vec<u8>>;
}

/// Backend built on the RustCrypto and dalek crates.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustCryptoBackend;

impl RustCryptoBackend {
    /// Create the backend.
    pub fn new() -> Self {
        Self
    }
}

impl CryptoBackend for RustCryptoBackend {
    fn fill_random(&self, dest: &mut [u8]) {
        rand::rngs::OsRng.fill_bytes(dest);
    }

    fn secure_equals(&self, lhs: &[u8], rhs: &[u8]) -> bool {
        mac::secure_equals(lhs, rhs)
    }

    fn hash_sha256(&self, parts: &[&[u8]]) -> [u8; SHA256_LENGTH] {
        mac::sha256(parts)
    }

    fn hmac_sha256(&self, key: &[u8], parts: &[&[u8]]) -> Result<Zeroizing<[u8; SHA256_LENGTH]>> {
        mac::hmac_sha256(key, parts)
    }

    fn hkdf_sha256(
        &self,
        salt: &[u8],
        ikm_parts: &[&[u8]],
        info: &[u8],
    ) -> Result<(SymmetricKey, SymmetricKey)> {
        kdf::derive_key_pair(salt, ikm_parts, info)
    }

    fn gen_keypair_x25519(&self) -> Result<KeyPair> {
        Ok(kex::x25519::generate())
    }

    fn dh_x25519(&self, private: &PrivateKey, peer_public: &[u8]) -> Result<DhOutput> {
        kex::x25519::diffie_hellman(private, peer_public)
    }

    fn gen_keypair_ed25519(&self) -> Result<KeyPair> {
        Ok(sign::generate())
    }

    fn sign_ed25519(&self, private: &PrivateKey, message: &[u8]) -> Result<[u8; SIGNATURE_LENGTH]> {
        sign::sign(private, message)
    }

    fn verify_ed25519(&self, public: &[u8], message: &[u8], signature: &[u8]) -> bool {
        sign::verify(public, message, signature)
    }

    fn aes256_gcm_encrypt(
        &self,
        key: &SymmetricKey,
        nonce: u16,
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        aead::aes256_gcm_encrypt(key, nonce, aad, plaintext)
    }

    fn aes256_gcm_decrypt(
        &self,
        key: &SymmetricKey,
        nonce: u16,
        aad: &[u8],
        ciphertext_and_tag: &[u8],
    ) -> Result<Vec<u8>> {
        aead::aes256_gcm_decrypt(key, nonce, aad, ciphertext_and_tag)
    }
}
