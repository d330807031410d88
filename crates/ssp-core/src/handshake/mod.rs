//! Handshake state machines.
//!
//! [`Initiator`] and [`Responder`] never touch I/O. Each event handler returns
//! the [`Action`]s the owning layer must carry out, in order.
//!
//! Key schedule shared by both roles:
//! - `ikm` is `ss || es || se` from a triple DH, or the shared secret
//! - `salt` is the transcript hash over request and reply
//! - `KDF(salt, ikm, "ssp auth")` yields the two key-confirmation keys
//! - `KDF(salt, ikm, "ssp session")` yields the two directional session keys

mod initiator;
mod responder;
mod transcript;

pub use initiator::{Initiator, InitiatorStatus};
pub use responder::Responder;

use crate::algorithms::{HandshakeAlgorithms, SessionAlgorithms};
use crate::error::HandshakeError;
use crate::message::ReplyHandshakeError;
use core::fmt;
use core::time::Duration;
use ssp_crypto::keys::{KeyPair, PrivateKey, SymmetricKey};
use ssp_crypto::suite::HandshakeEphemeral;
use ssp_crypto::CryptoBackend;
use ssp_platform::Timestamp;
use zeroize::Zeroizing;

const AUTH_INFO: &[u8] = b"ssp auth";
const SESSION_INFO: &[u8] = b"ssp session";
const INITIATOR_AUTH_LABEL: &[u8] = &[0x01];
const RESPONDER_AUTH_LABEL: &[u8] = &[0x02];

/// Work the layer performs on behalf of a handshake.
#[derive(Debug)]
pub enum Action {
    /// Send a handshake message to the peer.
    Transmit(Vec<u8>),
    /// Install fresh session keys.
    InitializeSession(Box<SessionInit>),
    /// Tell the application the session is usable.
    OpenUpper,
    /// Tear down the current session.
    CloseSession,
}

/// Directional session keys.
pub struct SessionKeys {
    /// Key for messages from the peer.
    pub rx_key: SymmetricKey,
    /// Key for messages to the peer.
    pub tx_key: SymmetricKey,
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKeys([REDACTED])")
    }
}

/// Limits of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionParams {
    /// When the session started, as seen by the local clock.
    pub start_time: Timestamp,
    /// Highest usable nonce.
    pub max_nonce: u16,
    /// Session lifetime.
    pub max_session_duration: Duration,
}

/// Everything a session needs after a successful handshake.
#[derive(Debug)]
pub struct SessionInit {
    /// Negotiated session algorithms.
    pub algorithms: SessionAlgorithms,
    /// Negotiated limits.
    pub params: SessionParams,
    /// Keys for this endpoint.
    pub keys: SessionKeys,
}

/// Ephemeral contribution to one handshake attempt.
pub(crate) enum Ephemeral {
    KeyPair(KeyPair),
    Nonce([u8; 32]),
}

impl Ephemeral {
    pub(crate) fn generate(
        backend: &dyn CryptoBackend,
        algorithms: &HandshakeAlgorithms,
    ) -> Result<Self, HandshakeError> {
        match algorithms.ephemeral {
            HandshakeEphemeral::X25519 => Ok(Self::KeyPair(backend.gen_keypair_x25519()?)),
            HandshakeEphemeral::Nonce => {
                let mut nonce = [0u8; 32];
                backend.fill_random(&mut nonce);
                Ok(Self::Nonce(nonce))
            }
        }
    }

    /// Bytes placed in the message's ephemeral_data field.
    pub(crate) fn public_data(&self) -> Vec<u8> {
        match self {
            Self::KeyPair(pair) => pair.public_key.as_bytes().to_vec(),
            Self::Nonce(nonce) => nonce.to_vec(),
        }
    }

    pub(crate) fn private_key(&self) -> Result<&PrivateKey, HandshakeError> {
        match self {
            Self::KeyPair(pair) => Ok(&pair.private_key),
            Self::Nonce(_) => Err(HandshakeError::Internal),
        }
    }
}

/// Concatenate three DH outputs, given as (private, peer public) pairs in
/// `ss, es, se` order.
pub(crate) fn triple_dh(
    backend: &dyn CryptoBackend,
    pairs: [(&PrivateKey, &[u8]); 3],
) -> Result<Zeroizing<Vec<u8>>, HandshakeError> {
    let mut ikm = Zeroizing::new(Vec::with_capacity(3 * 32));
    for (private, public) in pairs {
        let shared = backend.dh_x25519(private, public)?;
        ikm.extend_from_slice(&shared[..]);
    }
    Ok(ikm)
}

/// All keys derived by one handshake.
pub(crate) struct DerivedKeys {
    pub(crate) initiator_auth: SymmetricKey,
    pub(crate) responder_auth: SymmetricKey,
    pub(crate) initiator_to_responder: SymmetricKey,
    pub(crate) responder_to_initiator: SymmetricKey,
}

pub(crate) fn derive_keys(
    backend: &dyn CryptoBackend,
    algorithms: &HandshakeAlgorithms,
    salt: &[u8],
    ikm: &[u8],
) -> Result<DerivedKeys, HandshakeError> {
    let (initiator_auth, responder_auth) = algorithms.kdf(backend, salt, &[ikm], AUTH_INFO)?;
    let (initiator_to_responder, responder_to_initiator) =
        algorithms.kdf(backend, salt, &[ikm], SESSION_INFO)?;
    Ok(DerivedKeys {
        initiator_auth,
        responder_auth,
        initiator_to_responder,
        responder_to_initiator,
    })
}

/// Key-confirmation MAC.
pub(crate) fn auth_mac(
    backend: &dyn CryptoBackend,
    key: &SymmetricKey,
    label: &[u8],
) -> Result<Vec<u8>, HandshakeError> {
    Ok(backend.hmac_sha256(&key[..], &[label])?.to_vec())
}

pub(crate) fn error_reply(error: HandshakeError) -> Action {
    Action::Transmit(ReplyHandshakeError { error }.serialize())
}
