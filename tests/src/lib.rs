//! Shared fixtures for the conformance tests.
//!
//! [`Pair`] connects an Initiator and a Responder [`CryptoLayer`] through mock
//! transports and moves messages between them until both sides go quiet.

use ssp_core::cert::{CertificateBody, CertificateChain, CertificateEnvelope};
use ssp_core::{
    Credentials, CryptoLayer, Handshake, InitiatorConfig, InitiatorStatus, LayerConfig,
    ResponderConfig,
};
use ssp_crypto::{kex, sign, CryptoBackend, KeyPair, PublicKey, RustCryptoBackend};
use ssp_platform::mock::{MockCryptoBackend, MockExecutor, MockLowerLayer, MockUpperLayer};
use ssp_platform::LowerLayer;
use std::collections::VecDeque;
use std::sync::Arc;

/// Layer wired to mocks.
pub type TestLayer = CryptoLayer<MockLowerLayer, MockUpperLayer, MockExecutor>;

/// Unix time used by certificate fixtures.
pub const CERT_TIME: u64 = 1_700_000_000;

/// Upper bound on pump iterations before a test is considered livelocked.
const MAX_PUMP_ROUNDS: usize = 10_000;

/// Install a test-friendly tracing subscriber. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Credentials for both ends.
pub struct CredentialPair {
    /// Initiator side.
    pub initiator: Credentials,
    /// Responder side.
    pub responder: Credentials,
}

impl CredentialPair {
    /// Fresh X25519 static keys, each side knowing the other's public key.
    pub fn preshared() -> Self {
        let initiator = kex::x25519::generate();
        let responder = kex::x25519::generate();
        let initiator_public = initiator.public_key.clone();
        let responder_public = responder.public_key.clone();
        Self {
            initiator: Credentials::preshared(initiator, responder_public),
            responder: Credentials::preshared(responder, initiator_public),
        }
    }

    /// One symmetric key shared under `key_id`.
    pub fn shared_secret(key_id: &[u8], key: [u8; 32]) -> Self {
        Self {
            initiator: Credentials::shared_secret(key_id, key),
            responder: Credentials::shared_secret(key_id, key),
        }
    }

    /// Two-level chains (anchor, intermediate, leaf) issued by one anchor,
    /// valid around [`CERT_TIME`].
    pub fn certificates(backend: &dyn CryptoBackend) -> Self {
        let anchor = sign::generate();
        let intermediate = sign::generate();
        let (initiator_keys, initiator_chain) = issue_chain(backend, &anchor, &intermediate);
        let (responder_keys, responder_chain) = issue_chain(backend, &anchor, &intermediate);
        Self {
            initiator: Credentials::certificates(
                initiator_keys,
                anchor.public_key.clone(),
                2,
                initiator_chain,
            ),
            responder: Credentials::certificates(
                responder_keys,
                anchor.public_key.clone(),
                2,
                responder_chain,
            ),
        }
    }
}

/// Certificate body valid for an hour either side of [`CERT_TIME`].
pub fn certificate_body(key: &PublicKey, signing_level: u8) -> CertificateBody {
    CertificateBody {
        serial_number: 1,
        valid_after: CERT_TIME - 3600,
        valid_before: CERT_TIME + 3600,
        signing_level,
        public_key: key.clone(),
    }
}

fn issue_chain(
    backend: &dyn CryptoBackend,
    anchor: &KeyPair,
    intermediate: &KeyPair,
) -> (KeyPair, CertificateChain) {
    let leaf = kex::x25519::generate();
    let intermediate_cert = CertificateEnvelope::issue(
        backend,
        &certificate_body(&intermediate.public_key, 1),
        &anchor.private_key,
    )
    .expect("issue intermediate");
    let leaf_cert = CertificateEnvelope::issue(
        backend,
        &certificate_body(&leaf.public_key, 0),
        &intermediate.private_key,
    )
    .expect("issue leaf");
    (leaf, CertificateChain::new(vec![intermediate_cert, leaf_cert]))
}

/// Builder for a connected [`Pair`].
pub struct PairBuilder {
    layer: LayerConfig,
    initiator: InitiatorConfig,
    responder: ResponderConfig,
    credentials: Option<CredentialPair>,
    backend: Arc<dyn CryptoBackend>,
    unix_time: u64,
}

impl Default for PairBuilder {
    fn default() -> Self {
        Self {
            layer: LayerConfig::default(),
            initiator: InitiatorConfig::default(),
            responder: ResponderConfig::default(),
            credentials: None,
            backend: Arc::new(RustCryptoBackend::new()),
            unix_time: CERT_TIME,
        }
    }
}

impl PairBuilder {
    /// Layer settings for both sides.
    pub fn layer(mut self, config: LayerConfig) -> Self {
        self.layer = config;
        self
    }

    /// Initiator settings.
    pub fn initiator(mut self, config: InitiatorConfig) -> Self {
        self.initiator = config;
        self
    }

    /// Responder settings.
    pub fn responder(mut self, config: ResponderConfig) -> Self {
        self.responder = config;
        self
    }

    /// Credentials. Defaults to fresh preshared keys.
    pub fn credentials(mut self, credentials: CredentialPair) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Use the deterministic mock backend.
    pub fn mock_backend(mut self) -> Self {
        self.backend = Arc::new(MockCryptoBackend::new());
        self
    }

    /// Wall-clock time seen by both sides. Defaults to [`CERT_TIME`].
    pub fn unix_time(mut self, unix_time: u64) -> Self {
        self.unix_time = unix_time;
        self
    }

    /// Build both layers on a shared clock.
    pub fn build(self) -> Pair {
        let clock = MockExecutor::with_unix_time(self.unix_time);
        let credentials = self.credentials.unwrap_or_else(CredentialPair::preshared);
        let initiator = CryptoLayer::initiator(
            self.layer,
            self.initiator,
            credentials.initiator,
            Arc::clone(&self.backend),
            MockLowerLayer::new(),
            MockUpperLayer::new(),
            clock.clone(),
        );
        let responder = CryptoLayer::responder(
            self.layer,
            self.responder,
            credentials.responder,
            self.backend,
            MockLowerLayer::new(),
            MockUpperLayer::new(),
            clock.clone(),
        );
        Pair {
            initiator,
            responder,
            clock,
            to_initiator: VecDeque::new(),
            to_responder: VecDeque::new(),
        }
    }
}

/// Initiator and Responder joined by an in-memory link.
pub struct Pair {
    /// Connecting side.
    pub initiator: TestLayer,
    /// Listening side.
    pub responder: TestLayer,
    /// Clock shared by both sides.
    pub clock: MockExecutor,
    /// Messages sent by the Responder, not yet delivered.
    pub to_initiator: VecDeque<Vec<u8>>,
    /// Messages sent by the Initiator, not yet delivered.
    pub to_responder: VecDeque<Vec<u8>>,
}

impl Pair {
    /// Preshared-key pair with default settings.
    pub fn new() -> Self {
        PairBuilder::default().build()
    }

    /// Customise the pair.
    pub fn builder() -> PairBuilder {
        PairBuilder::default()
    }

    /// Open both transports and run the handshake to completion.
    pub fn connect(&mut self) {
        self.responder.on_lower_open();
        self.initiator.on_lower_open();
        self.pump();
    }

    /// Move everything each side transmitted into the in-flight queues and
    /// complete the transmissions. Returns `true` if anything moved.
    pub fn collect(&mut self) -> bool {
        let a = collect_side(&mut self.initiator, &mut self.to_responder);
        let b = collect_side(&mut self.responder, &mut self.to_initiator);
        a || b
    }

    /// Deliver queued messages while the receivers accept them. Returns `true`
    /// if anything was delivered.
    pub fn deliver(&mut self) -> bool {
        let a = deliver_side(&mut self.to_responder, &mut self.responder);
        let b = deliver_side(&mut self.to_initiator, &mut self.initiator);
        a || b
    }

    /// Collect and deliver until nothing moves.
    pub fn pump(&mut self) {
        for _ in 0..MAX_PUMP_ROUNDS {
            let collected = self.collect();
            let delivered = self.deliver();
            if !collected && !delivered {
                return;
            }
        }
        panic!("message exchange did not settle");
    }

    /// Advance the clock and fire both sides' timers.
    pub fn advance(&mut self, by: core::time::Duration) {
        self.clock.advance(by);
        self.initiator.handle_timeout();
        self.responder.handle_timeout();
    }

    /// Initiator handshake state.
    pub fn initiator_status(&self) -> InitiatorStatus {
        match self.initiator.handshake() {
            Handshake::Initiator(initiator) => initiator.status(),
            Handshake::Responder(_) => unreachable!("initiator layer built as responder"),
        }
    }

    /// True once the Responder confirmed the current handshake.
    pub fn is_confirmed(&self) -> bool {
        match self.initiator.handshake() {
            Handshake::Initiator(initiator) => initiator.is_confirmed(),
            Handshake::Responder(_) => false,
        }
    }

    /// True when both applications have an open session.
    pub fn is_established(&self) -> bool {
        self.initiator.upper().is_open() && self.responder.upper().is_open()
    }
}

impl Default for Pair {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_side(layer: &mut TestLayer, queue: &mut VecDeque<Vec<u8>>) -> bool {
    let mut moved = false;
    while let Some(message) = layer.lower_mut().pop_tx() {
        queue.push_back(message);
        moved = true;
    }
    if !layer.lower().is_tx_ready() {
        layer.lower_mut().complete_tx();
        layer.on_lower_tx_ready();
        moved = true;
    }
    moved
}

fn deliver_side(queue: &mut VecDeque<Vec<u8>>, layer: &mut TestLayer) -> bool {
    let mut moved = false;
    while let Some(message) = queue.front() {
        if !layer.on_lower_rx_ready(message) {
            break;
        }
        queue.pop_front();
        moved = true;
    }
    moved
}
