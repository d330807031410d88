//! Algorithm negotiation.
//!
//! Maps the raw codes of a [`CryptoSpec`] to concrete algorithms and checks
//! that the ephemeral type fits the handshake mode.

use crate::auth::HandshakeMode;
use crate::error::HandshakeError;
use crate::message::CryptoSpec;
use ssp_crypto::keys::SymmetricKey;
use ssp_crypto::suite::{
    HandshakeEphemeral, HandshakeHash, HandshakeKdf, SessionCryptoMode, SessionNonceMode,
};
use ssp_crypto::CryptoBackend;

/// Length of both ephemeral kinds: an X25519 public key or a random nonce.
pub const EPHEMERAL_LENGTH: usize = 32;

/// Algorithms used while handshaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeAlgorithms {
    /// Ephemeral data kind.
    pub ephemeral: HandshakeEphemeral,
    /// Transcript hash.
    pub hash: HandshakeHash,
    /// Key derivation function.
    pub kdf: HandshakeKdf,
}

impl HandshakeAlgorithms {
    /// Hash the concatenation of `parts`.
    pub fn hash(&self, backend: &dyn CryptoBackend, parts: &[&[u8]]) -> [u8; 32] {
        match self.hash {
            HandshakeHash::Sha256 => backend.hash_sha256(parts),
        }
    }

    /// Derive a pair of keys.
    pub fn kdf(
        &self,
        backend: &dyn CryptoBackend,
        salt: &[u8],
        ikm_parts: &[&[u8]],
        info: &[u8],
    ) -> ssp_crypto::Result<(SymmetricKey, SymmetricKey)> {
        match self.kdf {
            HandshakeKdf::HkdfSha256 => backend.hkdf_sha256(salt, ikm_parts, info),
        }
    }

    /// Expected ephemeral data length.
    pub fn ephemeral_length(&self) -> usize {
        match self.ephemeral {
            HandshakeEphemeral::X25519 | HandshakeEphemeral::Nonce => EPHEMERAL_LENGTH,
        }
    }
}

/// Algorithms used by an established session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionAlgorithms {
    /// Receive nonce verification.
    pub nonce_mode: SessionNonceMode,
    /// Per-message protection.
    pub session_mode: SessionCryptoMode,
}

/// Complete negotiated algorithm set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Algorithms {
    /// Handshake algorithms.
    pub handshake: HandshakeAlgorithms,
    /// Session algorithms.
    pub session: SessionAlgorithms,
}

impl Algorithms {
    /// Resolve raw algorithm codes for a handshake mode.
    ///
    /// X25519 ephemerals need a static-key mode; random-nonce ephemerals are
    /// only meaningful with a shared secret.
    pub fn configure(spec: &CryptoSpec, mode: HandshakeMode) -> Result<Self, HandshakeError> {
        let ephemeral = HandshakeEphemeral::from_u8(spec.handshake_ephemeral)
            .ok_or(HandshakeError::UnsupportedHandshakeEphemeral)?;
        let hash = HandshakeHash::from_u8(spec.handshake_hash)
            .ok_or(HandshakeError::UnsupportedHandshakeHash)?;
        let kdf = HandshakeKdf::from_u8(spec.handshake_kdf)
            .ok_or(HandshakeError::UnsupportedHandshakeKdf)?;
        let nonce_mode = SessionNonceMode::from_u8(spec.nonce_mode)
            .ok_or(HandshakeError::UnsupportedNonceMode)?;
        let session_mode = SessionCryptoMode::from_u8(spec.session_mode)
            .ok_or(HandshakeError::UnsupportedSessionMode)?;

        let compatible = match ephemeral {
            HandshakeEphemeral::X25519 => mode.uses_static_keys(),
            HandshakeEphemeral::Nonce => mode == HandshakeMode::SharedSecret,
        };
        if !compatible {
            return Err(HandshakeError::UnsupportedHandshakeEphemeral);
        }

        Ok(Self {
            handshake: HandshakeAlgorithms {
                ephemeral,
                hash,
                kdf,
            },
            session: SessionAlgorithms {
                nonce_mode,
                session_mode,
            },
        })
    }
}
