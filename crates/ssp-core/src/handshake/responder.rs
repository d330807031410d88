//! Responder side of the handshake.

use super::transcript::Transcript;
use super::{
    auth_mac, derive_keys, error_reply, triple_dh, Action, Ephemeral, SessionInit, SessionKeys,
    SessionParams, INITIATOR_AUTH_LABEL, RESPONDER_AUTH_LABEL,
};
use crate::algorithms::Algorithms;
use crate::auth::{Credentials, HandshakeMode};
use crate::config::ResponderConfig;
use crate::error::HandshakeError;
use crate::message::{
    ReplyHandshakeAuth, ReplyHandshakeBegin, RequestHandshakeAuth, RequestHandshakeBegin,
    PROTOCOL_VERSION,
};
use core::time::Duration;
use ssp_crypto::keys::SymmetricKey;
use ssp_crypto::CryptoBackend;
use ssp_platform::Timestamp;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

struct PendingAuth {
    session: SessionInit,
    initiator_auth_key: SymmetricKey,
    responder_auth_key: SymmetricKey,
}

enum State {
    Idle,
    WaitForAuth(Box<PendingAuth>),
}

/// Handshake driver for the listening endpoint.
pub struct Responder {
    config: ResponderConfig,
    credentials: Credentials,
    state: State,
}

impl Responder {
    /// Create an idle Responder.
    pub fn new(config: ResponderConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
            state: State::Idle,
        }
    }

    /// True between an accepted RequestHandshakeBegin and its RequestHandshakeAuth.
    pub fn is_waiting_for_auth(&self) -> bool {
        matches!(self.state, State::WaitForAuth(_))
    }

    /// Drop any pending handshake.
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }

    /// Handle RequestHandshakeBegin; `raw` is its wire encoding.
    ///
    /// Accepted in any state: a new request replaces a pending one.
    pub fn on_request_begin(
        &mut self,
        backend: &dyn CryptoBackend,
        msg: &RequestHandshakeBegin,
        raw: &[u8],
        now: Timestamp,
        unix_time: u64,
    ) -> Vec<Action> {
        self.state = State::Idle;

        match self.accept_begin(backend, msg, raw, now, unix_time) {
            Ok((reply, pending)) => {
                info!(mode = msg.handshake_mode, "handshake begin accepted");
                self.state = State::WaitForAuth(Box::new(pending));
                vec![Action::Transmit(reply)]
            }
            Err(e) => {
                warn!(error = %e, "handshake begin rejected");
                vec![error_reply(e)]
            }
        }
    }

    fn accept_begin(
        &self,
        backend: &dyn CryptoBackend,
        msg: &RequestHandshakeBegin,
        raw: &[u8],
        now: Timestamp,
        unix_time: u64,
    ) -> Result<(Vec<u8>, PendingAuth), HandshakeError> {
        if msg.version != PROTOCOL_VERSION {
            return Err(HandshakeError::UnsupportedVersion);
        }
        let mode = HandshakeMode::from_u8(msg.handshake_mode)
            .ok_or(HandshakeError::UnsupportedHandshakeMode)?;
        if mode != self.credentials.handshake_mode() {
            debug!(requested = ?mode, "handshake mode not configured");
            return Err(HandshakeError::UnsupportedHandshakeMode);
        }
        let algorithms = Algorithms::configure(&msg.spec, mode)?;
        if msg.ephemeral_data.len() != algorithms.handshake.ephemeral_length() {
            return Err(HandshakeError::BadMessageFormat);
        }
        if msg.constraints.max_nonce == 0 || msg.constraints.max_session_duration_ms == 0 {
            return Err(HandshakeError::BadMessageFormat);
        }

        let ephemeral = Ephemeral::generate(backend, &algorithms.handshake)?;

        let (ikm_source, reply_mode_data) = match &self.credentials {
            Credentials::PublicKey { auth, .. } => {
                let remote = auth.validate(backend, &msg.mode_data, unix_time)?;
                let mode_data = auth.mode_data().map_err(|_| HandshakeError::Internal)?;
                (Secret::RemoteStatic(remote), mode_data)
            }
            Credentials::SharedSecret { lookup, .. } => {
                let key = lookup.find_key(&msg.mode_data).ok_or_else(|| {
                    debug!(key_id_len = msg.mode_data.len(), "unknown shared secret key id");
                    HandshakeError::KeyNotFound
                })?;
                (Secret::Shared(key), Vec::new())
            }
        };

        let reply = ReplyHandshakeBegin {
            ephemeral_data: ephemeral.public_data(),
            mode_data: reply_mode_data,
        }
        .serialize()
        .map_err(|_| HandshakeError::Internal)?;

        let mut transcript = Transcript::begin(backend, algorithms.handshake, raw);
        transcript.mix(backend, &reply);

        let ikm = match (ikm_source, &self.credentials) {
            (Secret::RemoteStatic(remote), Credentials::PublicKey { static_keys, .. }) => {
                triple_dh(
                    backend,
                    [
                        (&static_keys.private_key, &remote.as_bytes()[..]),
                        (&static_keys.private_key, &msg.ephemeral_data[..]),
                        (ephemeral.private_key()?, &remote.as_bytes()[..]),
                    ],
                )?
            }
            (Secret::Shared(key), _) => Zeroizing::new(key.to_vec()),
            (Secret::RemoteStatic(_), _) => return Err(HandshakeError::Internal),
        };

        let keys = derive_keys(backend, &algorithms.handshake, transcript.value(), &ikm)?;

        let max_session_duration = Duration::from_millis(u64::from(
            msg.constraints.max_session_duration_ms,
        ))
        .min(self.config.max_session_duration);
        let session = SessionInit {
            algorithms: algorithms.session,
            params: SessionParams {
                start_time: now,
                max_nonce: msg.constraints.max_nonce.min(self.config.max_nonce),
                max_session_duration,
            },
            keys: SessionKeys {
                rx_key: keys.initiator_to_responder,
                tx_key: keys.responder_to_initiator,
            },
        };

        Ok((
            reply,
            PendingAuth {
                session,
                initiator_auth_key: keys.initiator_auth,
                responder_auth_key: keys.responder_auth,
            },
        ))
    }

    /// Handle RequestHandshakeAuth.
    pub fn on_request_auth(
        &mut self,
        backend: &dyn CryptoBackend,
        msg: &RequestHandshakeAuth,
    ) -> Vec<Action> {
        let pending = match std::mem::replace(&mut self.state, State::Idle) {
            State::WaitForAuth(pending) => pending,
            State::Idle => {
                warn!("RequestHandshakeAuth without prior begin");
                return vec![error_reply(HandshakeError::NoPriorHandshakeBegin)];
            }
        };

        match Self::confirm(backend, &pending, msg) {
            Ok(reply) => {
                info!("handshake complete");
                vec![
                    Action::Transmit(reply),
                    Action::InitializeSession(Box::new(pending.session)),
                    Action::OpenUpper,
                ]
            }
            Err(e) => {
                warn!(error = %e, "initiator authentication failed");
                vec![error_reply(e)]
            }
        }
    }

    fn confirm(
        backend: &dyn CryptoBackend,
        pending: &PendingAuth,
        msg: &RequestHandshakeAuth,
    ) -> Result<Vec<u8>, HandshakeError> {
        let expected = auth_mac(backend, &pending.initiator_auth_key, INITIATOR_AUTH_LABEL)?;
        if !backend.secure_equals(&expected, &msg.mac) {
            return Err(HandshakeError::AuthenticationError);
        }
        ReplyHandshakeAuth {
            mac: auth_mac(backend, &pending.responder_auth_key, RESPONDER_AUTH_LABEL)?,
        }
        .serialize()
        .map_err(|_| HandshakeError::Internal)
    }
}

enum Secret {
    RemoteStatic(ssp_crypto::PublicKey),
    Shared(SymmetricKey),
}
