//! X25519 key exchange (RFC 7748).
//!
//! Used for both static identity keys and handshake ephemerals.
//!
//! # Security
//!
//! - Private scalars and shared secrets are wrapped in `Zeroizing<>`.
//! - All-zero shared secrets (low-order peer points) are rejected.
//!
//! # Example
//!
//! ```
//! use ssp_crypto::kex::x25519;
//!
//! # fn example() -> Result<(), ssp_crypto::Error> {
//! let alice = x25519::generate();
//! let bob = x25519::generate();
//!
//! let alice_shared = x25519::diffie_hellman(&alice.private_key, bob.public_key.as_bytes())?;
//! let bob_shared = x25519::diffie_hellman(&bob.private_key, alice.public_key.as_bytes())?;
//!
//! assert_eq!(*alice_shared, *bob_shared);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use crate::keys::{DhOutput, KeyPair, KeyType, PrivateKey, PublicKey, KEY_LENGTH};
use crate::{Error, Result};
use x25519_dalek::{PublicKey as DalekPublicKey, StaticSecret};
use zeroize::Zeroizing;

/// Generate a new random X25519 key pair using the OS RNG.
pub fn generate() -> KeyPair {
    let secret = Zeroizing::new(StaticSecret::random_from_rng(rand::rngs::OsRng));
    pair_from_secret(&secret)
}

/// Build an X25519 key pair from a raw private scalar.
///
/// Used for loading configured static keys and for known test vectors.
pub fn from_private(private: Zeroizing<[u8; KEY_LENGTH]>) -> KeyPair {
    let secret = Zeroizing::new(StaticSecret::from(*private));
    pair_from_secret(&secret)
}

fn pair_from_secret(secret: &StaticSecret) -> KeyPair {
    let public = DalekPublicKey::from(secret);
    KeyPair {
        public_key: PublicKey::new(KeyType::X25519, *public.as_bytes()),
        private_key: PrivateKey::new(KeyType::X25519, Zeroizing::new(secret.to_bytes())),
    }
}

/// Compute the X25519 shared secret between a local private key and a peer
/// public key.
///
/// # Errors
///
/// - `Error::BadKeyType` if `private` is not an X25519 key
/// - `Error::InvalidLength` if `peer_public` is not 32 bytes
/// - `Error::KeyExchange` if the result is all zeros (low-order point)
pub fn diffie_hellman(private: &PrivateKey, peer_public: &[u8]) -> Result<DhOutput> {
    let peer: [u8; KEY_LENGTH] = peer_public.try_into().map_err(|_| Error::InvalidLength {
        expected: KEY_LENGTH,
        actual: peer_public.len(),
    })?;

    let secret = Zeroizing::new(StaticSecret::from(*private.expose(KeyType::X25519)?));
    let shared = secret.diffie_hellman(&DalekPublicKey::from(peer));

    // Check for low-order points (all zeros shared secret indicates failure)
    if shared.as_bytes() == &[0u8; KEY_LENGTH] {
        return Err(Error::KeyExchange(
            "Invalid peer public key (low-order point)".into(),
        ));
    }

    Ok(Zeroizing::new(*shared.as_bytes()))
}
