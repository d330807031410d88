//! Ed25519 signatures (RFC 8032) for certificate envelopes.

use crate::keys::{KeyPair, KeyType, PrivateKey, PublicKey, KEY_LENGTH};
use crate::{Error, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use zeroize::Zeroizing;

/// Ed25519 signature length.
pub const SIGNATURE_LENGTH: usize = 64;

/// Generate a new random Ed25519 key pair.
pub fn generate() -> KeyPair {
    let mut seed = Zeroizing::new([0u8; KEY_LENGTH]);
    rand::rngs::OsRng.fill_bytes(&mut seed[..]);
    from_seed(seed)
}

/// Build an Ed25519 key pair from its 32-byte seed.
pub fn from_seed(seed: Zeroizing<[u8; KEY_LENGTH]>) -> KeyPair {
    let signing = SigningKey::from_bytes(&seed);
    KeyPair {
        public_key: PublicKey::new(KeyType::Ed25519, signing.verifying_key().to_bytes()),
        private_key: PrivateKey::new(KeyType::Ed25519, seed),
    }
}

/// Sign `message` with an Ed25519 private key.
pub fn sign(private: &PrivateKey, message: &[u8]) -> Result<[u8; SIGNATURE_LENGTH]> {
    let signing = SigningKey::from_bytes(private.expose(KeyType::Ed25519)?);
    Ok(signing.sign(message).to_bytes())
}

/// Verify an Ed25519 signature. Malformed keys or signatures verify as false.
pub fn verify(public: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let Ok(public) = <[u8; KEY_LENGTH]>::try_from(public) else {
        return false;
    };
    let Ok(verifying) = VerifyingKey::from_bytes(&public) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    verifying.verify(message, &signature).is_ok()
}

/// Check that a public key is a valid Ed25519 point.
pub fn validate_public_key(public: &PublicKey) -> Result<()> {
    let bytes = public.expect_type(KeyType::Ed25519)?;
    VerifyingKey::from_bytes(bytes)
        .map(|_| ())
        .map_err(|_| Error::InvalidPublicKey("not an Ed25519 point".into()))
}
