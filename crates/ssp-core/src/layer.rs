//! The protocol layer.
//!
//! [`CryptoLayer`] sits between a [`LowerLayer`] transport and an
//! [`UpperLayer`] application. It dispatches received messages to the
//! handshake or the session, applies the resulting [`Action`]s, and fragments
//! outbound application data into SessionData messages.
//!
//! Everything is driven by the owner's run loop through `&mut self` calls:
//! lower-layer events (`on_lower_open`, `on_lower_rx_ready`, ...), upper-layer
//! requests (`transmit`, `receive`) and timers (`poll_timeout`,
//! `handle_timeout`).

use crate::auth::Credentials;
use crate::config::{InitiatorConfig, LayerConfig, ResponderConfig};
use crate::handshake::{Action, Initiator, Responder};
use crate::message::{Message, SessionData};
use crate::reassembler::{ReassemblyResult, Reassembler};
use crate::session::Session;
use crate::tx_state::TxState;
use ssp_crypto::CryptoBackend;
use ssp_platform::{Executor, LowerLayer, Timestamp, UpperLayer};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Role-specific handshake engine.
pub enum Handshake {
    /// Connecting side.
    Initiator(Initiator),
    /// Listening side.
    Responder(Responder),
}

/// Secure session layer over a message transport.
pub struct CryptoLayer<L, U, E> {
    config: LayerConfig,
    backend: Arc<dyn CryptoBackend>,
    lower: L,
    upper: U,
    executor: E,
    handshake: Handshake,
    session: Session,
    reassembler: Reassembler,
    tx_state: TxState,
    is_open: bool,
    upper_open: bool,
    rx_pending: bool,
}

impl<L, U, E> CryptoLayer<L, U, E>
where
    L: LowerLayer,
    U: UpperLayer,
    E: Executor,
{
    /// Layer that initiates handshakes.
    #[allow(clippy::too_many_arguments)]
    pub fn initiator(
        config: LayerConfig,
        initiator_config: InitiatorConfig,
        credentials: Credentials,
        backend: Arc<dyn CryptoBackend>,
        lower: L,
        upper: U,
        executor: E,
    ) -> Self {
        let handshake = Handshake::Initiator(Initiator::new(initiator_config, credentials));
        Self::with_handshake(config, handshake, backend, lower, upper, executor)
    }

    /// Layer that answers handshakes.
    #[allow(clippy::too_many_arguments)]
    pub fn responder(
        config: LayerConfig,
        responder_config: ResponderConfig,
        credentials: Credentials,
        backend: Arc<dyn CryptoBackend>,
        lower: L,
        upper: U,
        executor: E,
    ) -> Self {
        let handshake = Handshake::Responder(Responder::new(responder_config, credentials));
        Self::with_handshake(config, handshake, backend, lower, upper, executor)
    }

    fn with_handshake(
        config: LayerConfig,
        handshake: Handshake,
        backend: Arc<dyn CryptoBackend>,
        lower: L,
        upper: U,
        executor: E,
    ) -> Self {
        Self {
            session: Session::new(config.session),
            reassembler: Reassembler::new(config.max_reassembly_size),
            tx_state: TxState::new(),
            config,
            backend,
            lower,
            upper,
            executor,
            handshake,
            is_open: false,
            upper_open: false,
            rx_pending: false,
        }
    }

    // === Accessors ===

    /// Transport.
    pub fn lower(&self) -> &L {
        &self.lower
    }

    /// Transport, mutably.
    pub fn lower_mut(&mut self) -> &mut L {
        &mut self.lower
    }

    /// Application.
    pub fn upper(&self) -> &U {
        &self.upper
    }

    /// Application, mutably.
    pub fn upper_mut(&mut self) -> &mut U {
        &mut self.upper
    }

    /// Current session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Handshake engine.
    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    /// Layer settings.
    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    /// True between `on_lower_open` and `on_lower_close`.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    // === Lower layer events ===

    /// The transport is up.
    pub fn on_lower_open(&mut self) {
        if self.is_open {
            return;
        }
        debug!("lower layer open");
        self.is_open = true;
        self.reset_state();

        let now = self.executor.now();
        if let Handshake::Initiator(initiator) = &mut self.handshake {
            let actions =
                initiator.begin_handshake(self.backend.as_ref(), now, self.lower.is_tx_ready());
            self.apply(actions, now);
        }
    }

    /// The transport is down. Safe to call repeatedly.
    pub fn on_lower_close(&mut self) {
        if !self.is_open {
            return;
        }
        debug!("lower layer closed");
        self.is_open = false;
        self.reset_state();
        self.close_upper();
    }

    /// A message arrived. Returns `false` if the layer cannot take it yet;
    /// the transport should offer it again after the next `receive()` call.
    pub fn on_lower_rx_ready(&mut self, data: &[u8]) -> bool {
        if !self.is_open || self.rx_pending || !self.lower.is_tx_ready() {
            return false;
        }
        self.process(data);
        true
    }

    /// The transport finished a transmission.
    pub fn on_lower_tx_ready(&mut self) {
        if !self.is_open {
            return;
        }
        if self.tx_state.is_in_flight() && self.tx_state.on_tx_complete() {
            self.upper.on_tx_ready();
        }

        let now = self.executor.now();
        if let Handshake::Initiator(initiator) = &mut self.handshake {
            let actions = initiator.on_tx_ready(self.backend.as_ref(), now);
            self.apply(actions, now);
        }

        self.check_receive();
        self.check_transmit();
    }

    // === Upper layer requests ===

    /// Queue an application message. Returns `false` if no session is open or
    /// a previous message is still being sent.
    pub fn transmit(&mut self, data: &[u8]) -> bool {
        if !self.is_open || !self.upper_open || !self.tx_state.initialize(data) {
            return false;
        }
        self.check_transmit();
        true
    }

    /// The application can take data again.
    pub fn receive(&mut self) {
        if !self.is_open {
            return;
        }
        if self.rx_pending {
            self.deliver();
        }
        self.check_receive();
    }

    // === Timers ===

    /// Earliest time `handle_timeout` has work to do.
    pub fn poll_timeout(&self) -> Option<Timestamp> {
        match &self.handshake {
            Handshake::Initiator(initiator) if self.is_open => initiator.next_deadline(),
            _ => None,
        }
    }

    /// Fire expired timers.
    pub fn handle_timeout(&mut self) {
        if !self.is_open {
            return;
        }
        let now = self.executor.now();
        if let Handshake::Initiator(initiator) = &mut self.handshake {
            let actions =
                initiator.on_timeout(self.backend.as_ref(), now, self.lower.is_tx_ready());
            self.apply(actions, now);
        }
        self.check_transmit();
    }

    // === Receive path ===

    fn process(&mut self, data: &[u8]) {
        let message = match Message::parse(data) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, len = data.len(), "dropping undecodable message");
                return;
            }
        };
        debug!(function = ?message.function(), len = data.len(), "message received");
        trace!(?message);

        let now = self.executor.now();
        if let Message::SessionData(msg) = &message {
            self.on_session_data(msg, now);
            return;
        }

        let unix_time = self.executor.unix_time();
        let backend = self.backend.as_ref();
        let actions = match (&mut self.handshake, &message) {
            (Handshake::Initiator(i), Message::ReplyHandshakeBegin(msg)) => {
                i.on_reply_begin(backend, msg, data, now, unix_time)
            }
            (Handshake::Initiator(i), Message::ReplyHandshakeAuth(msg)) => {
                i.on_reply_auth(backend, msg, now)
            }
            (Handshake::Initiator(i), Message::ReplyHandshakeError(msg)) => {
                i.on_reply_error(msg, now)
            }
            (Handshake::Responder(r), Message::RequestHandshakeBegin(msg)) => {
                r.on_request_begin(backend, msg, data, now, unix_time)
            }
            (Handshake::Responder(r), Message::RequestHandshakeAuth(msg)) => {
                r.on_request_auth(backend, msg)
            }
            (_, message) => {
                warn!(function = ?message.function(), "message not valid for this role, dropping");
                return;
            }
        };
        self.apply(actions, now);
    }

    fn on_session_data(&mut self, msg: &SessionData, now: Timestamp) {
        let payload = match self.session.validate_message(self.backend.as_ref(), msg, now) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, nonce = msg.metadata.nonce, "session message rejected");
                if e.is_fatal() {
                    self.close_session(now);
                }
                return;
            }
        };

        let flags = msg.metadata.flags;
        match self
            .reassembler
            .process(flags.fir, flags.fin, msg.metadata.nonce, &payload)
        {
            Ok(ReassemblyResult::Complete) => {
                self.rx_pending = true;
                self.deliver();
            }
            Ok(ReassemblyResult::Partial) => {}
            Err(e) => warn!(error = %e, "reassembly failed"),
        }

        self.check_renegotiation(msg.metadata.nonce, now);
    }

    fn deliver(&mut self) {
        let Some(data) = self.reassembler.data() else {
            self.rx_pending = false;
            return;
        };
        if self.upper.on_rx_ready(data) {
            self.rx_pending = false;
            self.reassembler.reset();
        } else {
            debug!(len = data.len(), "upper layer busy, holding message");
        }
    }

    fn check_receive(&mut self) {
        if !self.rx_pending && self.lower.is_tx_ready() {
            self.lower.receive();
        }
    }

    // === Transmit path ===

    fn check_transmit(&mut self) {
        if !self.is_open
            || !self.session.is_valid()
            || !self.tx_state.is_active()
            || self.tx_state.is_in_flight()
            || !self.lower.is_tx_ready()
        {
            return;
        }

        let now = self.executor.now();
        let result = self.session.format_session_message(
            self.backend.as_ref(),
            self.tx_state.is_first(),
            now,
            self.tx_state.remainder(),
        );

        match result {
            Ok(formatted) => {
                if self.lower.transmit(&formatted.bytes) {
                    self.tx_state.begin_transmit(formatted.consumed);
                } else {
                    warn!("lower layer refused session message");
                }
                if let Some(nonce) = self.session.tx_nonce() {
                    self.check_renegotiation(nonce, now);
                }
            }
            Err(e) if e.is_fatal() => {
                warn!(error = %e, "session unusable for transmit");
                self.close_session(now);
            }
            Err(e) => {
                warn!(error = %e, "dropping outbound message");
                self.tx_state.reset();
            }
        }
    }

    fn check_renegotiation(&mut self, nonce: u16, now: Timestamp) {
        if let Handshake::Initiator(initiator) = &mut self.handshake {
            let actions = initiator.check_nonce_renegotiation(
                self.backend.as_ref(),
                now,
                self.lower.is_tx_ready(),
                nonce,
            );
            self.apply(actions, now);
        }
    }

    // === Actions ===

    fn apply(&mut self, actions: Vec<Action>, now: Timestamp) {
        for action in actions {
            match action {
                Action::Transmit(bytes) => {
                    if !self.lower.transmit(&bytes) {
                        warn!(len = bytes.len(), "lower layer refused handshake message");
                    }
                }
                Action::InitializeSession(init) => {
                    self.session.initialize(*init);
                    if !self.rx_pending {
                        self.reassembler.reset();
                    }
                    self.tx_state.rewind();
                }
                Action::OpenUpper => {
                    if !self.upper_open {
                        debug!("opening upper layer");
                        self.upper_open = true;
                        self.upper.on_open();
                    }
                }
                Action::CloseSession => self.drop_session(),
            }
        }
    }

    /// Fatal session error: drop the session and let the Initiator re-handshake.
    fn close_session(&mut self, now: Timestamp) {
        self.drop_session();
        if let Handshake::Initiator(initiator) = &mut self.handshake {
            let actions =
                initiator.on_session_closed(self.backend.as_ref(), now, self.lower.is_tx_ready());
            self.apply(actions, now);
        }
    }

    fn drop_session(&mut self) {
        debug!("closing session");
        self.session.reset();
        self.reassembler.reset();
        self.tx_state.reset();
        self.rx_pending = false;
        self.close_upper();
    }

    fn close_upper(&mut self) {
        if self.upper_open {
            self.upper_open = false;
            self.upper.on_close();
        }
    }

    fn reset_state(&mut self) {
        match &mut self.handshake {
            Handshake::Initiator(initiator) => initiator.reset(),
            Handshake::Responder(responder) => responder.reset(),
        }
        self.session.reset();
        self.reassembler.reset();
        self.tx_state.reset();
        self.rx_pending = false;
    }
}
