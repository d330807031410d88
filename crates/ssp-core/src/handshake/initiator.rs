//! Initiator side of the handshake.

use super::transcript::Transcript;
use super::{
    auth_mac, derive_keys, triple_dh, Action, Ephemeral, SessionInit, SessionKeys, SessionParams,
    INITIATOR_AUTH_LABEL, RESPONDER_AUTH_LABEL,
};
use crate::algorithms::Algorithms;
use crate::auth::Credentials;
use crate::config::InitiatorConfig;
use crate::error::HandshakeError;
use crate::message::{
    CryptoSpec, ReplyHandshakeAuth, ReplyHandshakeBegin, ReplyHandshakeError,
    RequestHandshakeAuth, RequestHandshakeBegin, SessionConstraints, PROTOCOL_VERSION,
};
use ssp_crypto::CryptoBackend;
use ssp_platform::Timestamp;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Coarse Initiator state, for observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitiatorStatus {
    /// No handshake in progress.
    Idle,
    /// RequestHandshakeBegin sent.
    WaitForBeginReply,
    /// Session keys installed.
    Open,
    /// Local configuration cannot produce a valid request.
    BadConfiguration,
}

struct PendingBegin {
    algorithms: Algorithms,
    ephemeral: Ephemeral,
    transcript: Transcript,
    request_time: Timestamp,
}

enum State {
    Idle,
    WaitForBeginReply(Box<PendingBegin>),
    /// Holds the Responder's confirmation MAC until it arrives.
    Open {
        expected_reply_mac: Option<Vec<u8>>,
    },
    BadConfiguration,
}

/// Handshake driver for the connecting endpoint.
///
/// Owns three deadlines (response, retry, session-age renegotiation); the
/// layer reports the earliest through [`Initiator::next_deadline`] and calls
/// [`Initiator::on_timeout`] when it passes.
pub struct Initiator {
    config: InitiatorConfig,
    credentials: Credentials,
    state: State,
    response_deadline: Option<Timestamp>,
    retry_deadline: Option<Timestamp>,
    renegotiation_deadline: Option<Timestamp>,
    retry_count: u32,
    handshake_required: bool,
}

impl Initiator {
    /// Create an idle Initiator.
    pub fn new(config: InitiatorConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
            state: State::Idle,
            response_deadline: None,
            retry_deadline: None,
            renegotiation_deadline: None,
            retry_count: 0,
            handshake_required: false,
        }
    }

    /// Current state.
    pub fn status(&self) -> InitiatorStatus {
        match self.state {
            State::Idle => InitiatorStatus::Idle,
            State::WaitForBeginReply(_) => InitiatorStatus::WaitForBeginReply,
            State::Open { .. } => InitiatorStatus::Open,
            State::BadConfiguration => InitiatorStatus::BadConfiguration,
        }
    }

    /// True once the Responder's confirmation MAC has been verified.
    pub fn is_confirmed(&self) -> bool {
        matches!(
            self.state,
            State::Open {
                expected_reply_mac: None
            }
        )
    }

    /// Configuration in use.
    pub fn config(&self) -> &InitiatorConfig {
        &self.config
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        [
            self.response_deadline,
            self.retry_deadline,
            self.renegotiation_deadline,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Forget all handshake state and deadlines.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.response_deadline = None;
        self.retry_deadline = None;
        self.renegotiation_deadline = None;
        self.retry_count = 0;
        self.handshake_required = false;
    }

    /// Start a handshake, or defer it until the lower layer can transmit.
    pub fn begin_handshake(
        &mut self,
        backend: &dyn CryptoBackend,
        now: Timestamp,
        tx_ready: bool,
    ) -> Vec<Action> {
        if matches!(self.state, State::BadConfiguration) {
            return Vec::new();
        }
        if !tx_ready {
            debug!("handshake deferred until lower layer is ready");
            self.handshake_required = true;
            return Vec::new();
        }
        self.handshake_required = false;
        self.retry_deadline = None;

        let spec = CryptoSpec::from(&self.config.suite);
        let mode = self.credentials.handshake_mode();
        let algorithms = match Algorithms::configure(&spec, mode) {
            Ok(algorithms) => algorithms,
            Err(e) => {
                warn!(error = %e, ?mode, "invalid initiator configuration");
                self.state = State::BadConfiguration;
                return Vec::new();
            }
        };

        let mode_data = match &self.credentials {
            Credentials::PublicKey { auth, .. } => auth.mode_data(),
            Credentials::SharedSecret { key_id, lookup } => {
                if lookup.find_key(key_id).is_none() {
                    warn!("shared secret key id not found locally");
                    self.state = State::BadConfiguration;
                    return Vec::new();
                }
                Ok(key_id.clone())
            }
        };
        let mode_data = match mode_data {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "unable to encode mode data");
                self.state = State::BadConfiguration;
                return Vec::new();
            }
        };

        let ephemeral = match Ephemeral::generate(backend, &algorithms.handshake) {
            Ok(ephemeral) => ephemeral,
            Err(e) => {
                warn!(error = %e, "ephemeral generation failed");
                self.schedule_retry(now);
                return Vec::new();
            }
        };

        let request = RequestHandshakeBegin {
            version: PROTOCOL_VERSION,
            spec,
            constraints: SessionConstraints {
                max_nonce: self.config.max_nonce,
                max_session_duration_ms: self.config.max_session_duration_ms(),
            },
            handshake_mode: mode.to_u8(),
            ephemeral_data: ephemeral.public_data(),
            mode_data,
        };
        let bytes = match request.serialize() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "unable to encode handshake request");
                self.state = State::BadConfiguration;
                return Vec::new();
            }
        };

        info!(?mode, len = bytes.len(), "sending handshake begin");
        self.state = State::WaitForBeginReply(Box::new(PendingBegin {
            transcript: Transcript::begin(backend, algorithms.handshake, &bytes),
            algorithms,
            ephemeral,
            request_time: now,
        }));
        self.response_deadline = Some(now + self.config.response_timeout);
        vec![Action::Transmit(bytes)]
    }

    /// Run a handshake deferred by [`begin_handshake`](Self::begin_handshake).
    pub fn on_tx_ready(&mut self, backend: &dyn CryptoBackend, now: Timestamp) -> Vec<Action> {
        if self.handshake_required {
            self.begin_handshake(backend, now, true)
        } else {
            Vec::new()
        }
    }

    /// Handle ReplyHandshakeBegin; `raw` is its wire encoding.
    pub fn on_reply_begin(
        &mut self,
        backend: &dyn CryptoBackend,
        msg: &ReplyHandshakeBegin,
        raw: &[u8],
        now: Timestamp,
        unix_time: u64,
    ) -> Vec<Action> {
        let pending = match std::mem::replace(&mut self.state, State::Idle) {
            State::WaitForBeginReply(pending) => pending,
            other => {
                debug!("ReplyHandshakeBegin outside of handshake, ignoring");
                self.state = other;
                return Vec::new();
            }
        };
        self.response_deadline = None;

        match self.complete_begin(backend, *pending, msg, raw, now, unix_time) {
            Ok(actions) => actions,
            Err(e) => {
                warn!(error = %e, "handshake reply rejected");
                self.schedule_retry(now);
                Vec::new()
            }
        }
    }

    fn complete_begin(
        &mut self,
        backend: &dyn CryptoBackend,
        pending: PendingBegin,
        msg: &ReplyHandshakeBegin,
        raw: &[u8],
        now: Timestamp,
        unix_time: u64,
    ) -> Result<Vec<Action>, HandshakeError> {
        let PendingBegin {
            algorithms,
            ephemeral,
            mut transcript,
            request_time,
        } = pending;

        if msg.ephemeral_data.len() != algorithms.handshake.ephemeral_length() {
            return Err(HandshakeError::BadMessageFormat);
        }
        let round_trip = now.checked_since(request_time).ok_or_else(|| {
            warn!("clock moved backwards during handshake");
            HandshakeError::Internal
        })?;

        transcript.mix(backend, raw);

        let ikm = match &self.credentials {
            Credentials::PublicKey { static_keys, auth } => {
                let remote = auth.validate(backend, &msg.mode_data, unix_time)?;
                triple_dh(
                    backend,
                    [
                        (&static_keys.private_key, &remote.as_bytes()[..]),
                        (ephemeral.private_key()?, &remote.as_bytes()[..]),
                        (&static_keys.private_key, &msg.ephemeral_data[..]),
                    ],
                )?
            }
            Credentials::SharedSecret { key_id, lookup } => {
                if !msg.mode_data.is_empty() {
                    return Err(HandshakeError::BadMessageFormat);
                }
                let key = lookup.find_key(key_id).ok_or(HandshakeError::KeyNotFound)?;
                Zeroizing::new(key.to_vec())
            }
        };

        let keys = derive_keys(backend, &algorithms.handshake, transcript.value(), &ikm)?;
        let request_auth = RequestHandshakeAuth {
            mac: auth_mac(backend, &keys.initiator_auth, INITIATOR_AUTH_LABEL)?,
        }
        .serialize()
        .map_err(|_| HandshakeError::Internal)?;
        let expected_reply_mac = auth_mac(backend, &keys.responder_auth, RESPONDER_AUTH_LABEL)?;

        // The Responder started its clock somewhere in the round trip.
        let start_time = now.saturating_sub(round_trip / 2);
        let session = SessionInit {
            algorithms: algorithms.session,
            params: SessionParams {
                start_time,
                max_nonce: self.config.max_nonce,
                max_session_duration: self.config.max_session_duration,
            },
            keys: SessionKeys {
                rx_key: keys.responder_to_initiator,
                tx_key: keys.initiator_to_responder,
            },
        };

        info!(rtt_ms = round_trip.as_millis() as u64, "handshake keys derived");
        self.state = State::Open {
            expected_reply_mac: Some(expected_reply_mac),
        };
        self.retry_count = 0;
        self.response_deadline = Some(now + self.config.response_timeout);
        self.renegotiation_deadline = Some(start_time + self.config.session_renegotiation_trigger);

        Ok(vec![
            Action::Transmit(request_auth),
            Action::InitializeSession(Box::new(session)),
            Action::OpenUpper,
        ])
    }

    /// Handle ReplyHandshakeAuth.
    pub fn on_reply_auth(
        &mut self,
        backend: &dyn CryptoBackend,
        msg: &ReplyHandshakeAuth,
        now: Timestamp,
    ) -> Vec<Action> {
        let State::Open {
            expected_reply_mac: Some(expected),
        } = &self.state
        else {
            debug!("ReplyHandshakeAuth not expected, ignoring");
            return Vec::new();
        };

        if backend.secure_equals(expected, &msg.mac) {
            info!("handshake confirmed by responder");
            self.response_deadline = None;
            self.state = State::Open {
                expected_reply_mac: None,
            };
            Vec::new()
        } else {
            warn!("responder confirmation MAC mismatch");
            self.fail_unconfirmed(now)
        }
    }

    /// Drop a session the Responder never confirmed.
    fn fail_unconfirmed(&mut self, now: Timestamp) -> Vec<Action> {
        self.renegotiation_deadline = None;
        self.schedule_retry(now);
        vec![Action::CloseSession]
    }

    /// Handle ReplyHandshakeError.
    ///
    /// Before the reply, or while the Responder's confirmation is still
    /// outstanding, the handshake fails and is retried. Otherwise ignored.
    pub fn on_reply_error(&mut self, msg: &ReplyHandshakeError, now: Timestamp) -> Vec<Action> {
        match self.state {
            State::WaitForBeginReply(_) => {
                warn!(error = %msg.error, code = msg.error.to_u8(), "responder rejected handshake");
                self.schedule_retry(now);
                Vec::new()
            }
            State::Open {
                expected_reply_mac: Some(_),
            } => {
                warn!(error = %msg.error, code = msg.error.to_u8(), "responder rejected handshake auth");
                self.fail_unconfirmed(now)
            }
            _ => {
                debug!(error = %msg.error, "handshake error outside of handshake, ignoring");
                Vec::new()
            }
        }
    }

    /// Fire every deadline at or before `now`.
    pub fn on_timeout(
        &mut self,
        backend: &dyn CryptoBackend,
        now: Timestamp,
        tx_ready: bool,
    ) -> Vec<Action> {
        let mut actions = Vec::new();

        if expired(&mut self.response_deadline, now) {
            match self.state {
                State::WaitForBeginReply(_) => {
                    warn!("handshake response timeout");
                    self.schedule_retry(now);
                }
                State::Open {
                    expected_reply_mac: Some(_),
                } => {
                    warn!("handshake confirmation timeout");
                    actions.extend(self.fail_unconfirmed(now));
                }
                _ => {}
            }
        }

        if expired(&mut self.retry_deadline, now) {
            debug!(attempt = self.retry_count, "retrying handshake");
            actions.extend(self.begin_handshake(backend, now, tx_ready));
        }

        if expired(&mut self.renegotiation_deadline, now)
            && matches!(self.state, State::Open { .. })
        {
            info!("session age reached renegotiation trigger");
            actions.extend(self.begin_handshake(backend, now, tx_ready));
        }

        actions
    }

    /// Renegotiate once a session nonce reaches the configured trigger.
    pub fn check_nonce_renegotiation(
        &mut self,
        backend: &dyn CryptoBackend,
        now: Timestamp,
        tx_ready: bool,
        nonce: u16,
    ) -> Vec<Action> {
        if !matches!(self.state, State::Open { .. })
            || nonce < self.config.nonce_renegotiation_trigger
        {
            return Vec::new();
        }
        info!(nonce, "nonce reached renegotiation trigger");
        self.begin_handshake(backend, now, tx_ready)
    }

    /// The layer dropped the session after a fatal error.
    pub fn on_session_closed(
        &mut self,
        backend: &dyn CryptoBackend,
        now: Timestamp,
        tx_ready: bool,
    ) -> Vec<Action> {
        self.renegotiation_deadline = None;
        self.retry_count = 0;
        match self.state {
            // a renegotiation already in flight will bring up the next session
            State::WaitForBeginReply(_) | State::BadConfiguration => Vec::new(),
            State::Idle | State::Open { .. } => {
                self.state = State::Idle;
                self.retry_deadline = None;
                self.begin_handshake(backend, now, tx_ready)
            }
        }
    }

    fn schedule_retry(&mut self, now: Timestamp) {
        self.state = State::Idle;
        self.response_deadline = None;
        match self.config.retry.delay(self.retry_count) {
            Some(delay) => {
                self.retry_count += 1;
                self.retry_deadline = Some(now + delay);
            }
            None => {
                warn!(attempts = self.retry_count, "handshake retries exhausted");
                self.retry_deadline = None;
            }
        }
    }
}

fn expired(deadline: &mut Option<Timestamp>, now: Timestamp) -> bool {
    match *deadline {
        Some(at) if now >= at => {
            *deadline = None;
            true
        }
        _ => false,
    }
}
