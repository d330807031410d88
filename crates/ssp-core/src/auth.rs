//! Peer authentication.
//!
//! An endpoint's [`Credentials`] decide which handshake mode it speaks:
//! - public-key modes pair a static X25519 key with an [`AuthenticationMode`]
//!   that turns the peer's mode data into a trusted remote static key
//! - the shared-secret mode looks symmetric keys up by an opaque key id

use crate::cert::CertificateChain;
use crate::error::{HandshakeError, Result};
use ssp_crypto::keys::{KeyPair, KeyType, PublicKey, SymmetricKey};
use ssp_crypto::CryptoBackend;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

/// Handshake mode advertised in RequestHandshakeBegin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandshakeMode {
    /// Symmetric secret selected by key id; no DH.
    SharedSecret = 0x00,
    /// Each side knows the other's static public key in advance.
    PresharedKeys = 0x01,
    /// Static keys are certified by a common trust anchor.
    Certificates = 0x02,
}

impl HandshakeMode {
    /// Convert from wire format.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::SharedSecret),
            0x01 => Some(Self::PresharedKeys),
            0x02 => Some(Self::Certificates),
            _ => None,
        }
    }

    /// Convert to wire format.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// True for the modes that run a triple DH over static keys.
    pub fn uses_static_keys(self) -> bool {
        !matches!(self, Self::SharedSecret)
    }
}

/// How a remote static public key is established.
#[derive(Debug, Clone)]
pub enum AuthenticationMode {
    /// The remote key is configured; the peer sends no credential data.
    PresharedKey {
        /// Peer's static X25519 key.
        remote_static_public_key: PublicKey,
    },
    /// The peer presents a certificate chain rooted at `trust_anchor`.
    CertificateChain {
        /// Ed25519 key of the authority.
        trust_anchor: PublicKey,
        /// Signing level of the authority; certificates must be strictly lower.
        anchor_signing_level: u8,
        /// Chain certifying our own static key, sent to the peer.
        local_chain: CertificateChain,
    },
}

impl AuthenticationMode {
    /// Handshake mode this authentication runs under.
    pub fn handshake_mode(&self) -> HandshakeMode {
        match self {
            Self::PresharedKey { .. } => HandshakeMode::PresharedKeys,
            Self::CertificateChain { .. } => HandshakeMode::Certificates,
        }
    }

    /// Credential data presented to the peer.
    pub fn mode_data(&self) -> Result<Vec<u8>> {
        match self {
            Self::PresharedKey { .. } => Ok(Vec::new()),
            Self::CertificateChain { local_chain, .. } => local_chain.serialize(),
        }
    }

    /// Validate the peer's credential data and yield its static public key.
    pub fn validate(
        &self,
        backend: &dyn CryptoBackend,
        mode_data: &[u8],
        unix_time: u64,
    ) -> core::result::Result<PublicKey, HandshakeError> {
        match self {
            Self::PresharedKey {
                remote_static_public_key,
            } => {
                if !mode_data.is_empty() {
                    debug!(len = mode_data.len(), "unexpected mode data in preshared key mode");
                    return Err(HandshakeError::BadMessageFormat);
                }
                Ok(remote_static_public_key.clone())
            }
            Self::CertificateChain {
                trust_anchor,
                anchor_signing_level,
                ..
            } => validate_chain(backend, trust_anchor, *anchor_signing_level, mode_data, unix_time),
        }
    }
}

/// Verify a certificate chain down from `anchor` and return the leaf key.
///
/// Each envelope must be signed by the previous certificate's Ed25519 key (the
/// anchor for the first), be valid at `unix_time`, and carry a signing level
/// strictly below its issuer's. The leaf must certify an X25519 key at level 0.
pub fn validate_chain(
    backend: &dyn CryptoBackend,
    anchor: &PublicKey,
    anchor_signing_level: u8,
    chain_data: &[u8],
    unix_time: u64,
) -> core::result::Result<PublicKey, HandshakeError> {
    let chain = CertificateChain::parse(chain_data).map_err(|e| {
        debug!(error = %e, "undecodable certificate chain");
        HandshakeError::BadCertificateFormat
    })?;

    let Some(last) = chain.certificates.len().checked_sub(1) else {
        debug!("empty certificate chain");
        return Err(HandshakeError::BadCertificateChain);
    };

    let mut issuer = anchor.clone();
    let mut issuer_level = anchor_signing_level;

    for (index, envelope) in chain.certificates.iter().enumerate() {
        if issuer.key_type() != KeyType::Ed25519 {
            return Err(HandshakeError::UnsupportedCertificateFeature);
        }
        if !backend.verify_ed25519(issuer.as_bytes(), &envelope.certificate_body, &envelope.signature) {
            debug!(index, "certificate signature invalid");
            return Err(HandshakeError::BadCertificateChain);
        }

        let body = envelope.body().map_err(|_| HandshakeError::BadCertificateFormat)?;

        if !body.is_valid_at(unix_time) {
            debug!(
                index,
                valid_after = body.valid_after,
                valid_before = body.valid_before,
                unix_time,
                "certificate outside validity window"
            );
            return Err(HandshakeError::BadCertificateChain);
        }
        if body.signing_level >= issuer_level {
            debug!(index, level = body.signing_level, issuer_level, "signing level not decreasing");
            return Err(HandshakeError::BadCertificateChain);
        }

        let expected_type = if index == last {
            KeyType::X25519
        } else {
            KeyType::Ed25519
        };
        if body.public_key.key_type() != expected_type {
            return Err(HandshakeError::UnsupportedCertificateFeature);
        }
        if index == last && body.signing_level != 0 {
            return Err(HandshakeError::BadCertificateChain);
        }

        issuer_level = body.signing_level;
        issuer = body.public_key;
    }

    Ok(issuer)
}

/// Source of shared secrets, keyed by opaque identifier.
pub trait KeyLookup: Send {
    /// Return a copy of the key for `key_id`.
    fn find_key(&self, key_id: &[u8]) -> Option<SymmetricKey>;
}

/// In-memory [`KeyLookup`].
#[derive(Default)]
pub struct StaticKeyLookup {
    keys: HashMap<Vec<u8>, SymmetricKey>,
}

impl StaticKeyLookup {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key.
    pub fn with_key(mut self, key_id: impl Into<Vec<u8>>, key: [u8; 32]) -> Self {
        self.keys.insert(key_id.into(), Zeroizing::new(key));
        self
    }
}

impl KeyLookup for StaticKeyLookup {
    fn find_key(&self, key_id: &[u8]) -> Option<SymmetricKey> {
        self.keys.get(key_id).map(|k| Zeroizing::new(**k))
    }
}

/// Long-term identity of one endpoint.
pub enum Credentials {
    /// Static X25519 key plus peer authentication.
    PublicKey {
        /// Our static key pair.
        static_keys: KeyPair,
        /// How the peer's static key is trusted.
        auth: AuthenticationMode,
    },
    /// Shared symmetric secrets.
    SharedSecret {
        /// Key id the Initiator requests; ignored by a Responder.
        key_id: Vec<u8>,
        /// Secret table.
        lookup: Box<dyn KeyLookup>,
    },
}

impl Credentials {
    /// Preshared public key credentials.
    pub fn preshared(static_keys: KeyPair, remote_static_public_key: PublicKey) -> Self {
        Self::PublicKey {
            static_keys,
            auth: AuthenticationMode::PresharedKey {
                remote_static_public_key,
            },
        }
    }

    /// Certificate credentials.
    pub fn certificates(
        static_keys: KeyPair,
        trust_anchor: PublicKey,
        anchor_signing_level: u8,
        local_chain: CertificateChain,
    ) -> Self {
        Self::PublicKey {
            static_keys,
            auth: AuthenticationMode::CertificateChain {
                trust_anchor,
                anchor_signing_level,
                local_chain,
            },
        }
    }

    /// Shared-secret credentials for an Initiator holding one key.
    pub fn shared_secret(key_id: impl Into<Vec<u8>>, key: [u8; 32]) -> Self {
        let key_id = key_id.into();
        Self::SharedSecret {
            lookup: Box::new(StaticKeyLookup::new().with_key(key_id.clone(), key)),
            key_id,
        }
    }

    /// Shared-secret credentials for a Responder answering from a table.
    pub fn shared_secret_lookup(lookup: impl KeyLookup + 'static) -> Self {
        Self::SharedSecret {
            key_id: Vec::new(),
            lookup: Box::new(lookup),
        }
    }

    /// Handshake mode these credentials speak.
    pub fn handshake_mode(&self) -> HandshakeMode {
        match self {
            Self::PublicKey { auth, .. } => auth.handshake_mode(),
            Self::SharedSecret { .. } => HandshakeMode::SharedSecret,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PublicKey { static_keys, auth } => f
                .debug_struct("PublicKey")
                .field("static_public_key", &static_keys.public_key)
                .field("auth", auth)
                .finish(),
            Self::SharedSecret { key_id, .. } => f
                .debug_struct("SharedSecret")
                .field("key_id", key_id)
                .finish_non_exhaustive(),
        }
    }
}
