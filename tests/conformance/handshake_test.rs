//! Handshake conformance: every authentication mode end to end, and the
//! typed errors a Responder answers with.

use core::time::Duration;
use ssp_conformance::{init_tracing, CredentialPair, Pair, CERT_TIME};
use ssp_core::message::{
    CryptoSpec, ReplyHandshakeError, RequestHandshakeBegin, SessionConstraints,
};
use ssp_core::{HandshakeError, InitiatorConfig, InitiatorStatus, Message, PROTOCOL_VERSION};
use ssp_crypto::suite::{SessionCryptoMode, SessionNonceMode};
use ssp_crypto::{CryptoSuite, RustCryptoBackend};

fn error_code(bytes: &[u8]) -> HandshakeError {
    match Message::parse(bytes).unwrap() {
        Message::ReplyHandshakeError(ReplyHandshakeError { error }) => error,
        other => panic!("expected ReplyHandshakeError, got {:?}", other.function()),
    }
}

/// Open both sides and let the Responder answer the first request.
fn first_reply(pair: &mut Pair) -> Vec<u8> {
    pair.responder.on_lower_open();
    pair.initiator.on_lower_open();
    pair.collect();
    pair.deliver();
    pair.collect();
    pair.to_initiator.front().cloned().expect("responder reply")
}

fn request(spec: CryptoSpec, handshake_mode: u8, ephemeral_len: usize) -> RequestHandshakeBegin {
    RequestHandshakeBegin {
        version: PROTOCOL_VERSION,
        spec,
        constraints: SessionConstraints {
            max_nonce: 1000,
            max_session_duration_ms: 60_000,
        },
        handshake_mode,
        ephemeral_data: vec![9; ephemeral_len],
        mode_data: Vec::new(),
    }
}

#[test]
fn test_preshared_key_handshake() {
    init_tracing();
    let mut pair = Pair::new();
    pair.connect();

    assert!(pair.is_established());
    assert_eq!(pair.initiator_status(), InitiatorStatus::Open);
    assert!(pair.is_confirmed());
    assert_eq!(pair.initiator.session().tx_nonce(), Some(0));
    assert_eq!(pair.responder.session().rx_nonce(), Some(0));
    assert_eq!(pair.initiator.upper().open_count(), 1);
    assert_eq!(pair.responder.upper().open_count(), 1);
}

#[test]
fn test_certificate_handshake() {
    init_tracing();
    let backend = RustCryptoBackend::new();
    let mut pair = Pair::builder()
        .credentials(CredentialPair::certificates(&backend))
        .build();
    pair.connect();

    assert!(pair.is_established());
    assert!(pair.is_confirmed());
}

fn preshared_setup(_: &RustCryptoBackend) -> (CryptoSuite, CredentialPair) {
    (CryptoSuite::default(), CredentialPair::preshared())
}

fn certificate_setup(backend: &RustCryptoBackend) -> (CryptoSuite, CredentialPair) {
    (CryptoSuite::default(), CredentialPair::certificates(backend))
}

fn shared_secret_setup(_: &RustCryptoBackend) -> (CryptoSuite, CredentialPair) {
    (
        CryptoSuite::shared_secret(),
        CredentialPair::shared_secret(b"key-1", [0x3C; 32]),
    )
}

#[test]
fn test_every_mode_and_suite_combination() {
    let backend = RustCryptoBackend::new();
    let modes: [(&str, fn(&RustCryptoBackend) -> (CryptoSuite, CredentialPair)); 3] = [
        ("preshared", preshared_setup),
        ("certificates", certificate_setup),
        ("shared secret", shared_secret_setup),
    ];
    let session_modes = [SessionCryptoMode::HmacSha256Trunc16, SessionCryptoMode::Aes256Gcm];
    let nonce_modes = [SessionNonceMode::IncrementLastRx, SessionNonceMode::GreaterThanLastRx];

    for (name, setup) in modes {
        for session_mode in session_modes {
            for nonce_mode in nonce_modes {
                let (suite, credentials) = setup(&backend);
                let suite = suite
                    .with_session_mode(session_mode)
                    .with_nonce_mode(nonce_mode);
                let mut pair = Pair::builder()
                    .initiator(InitiatorConfig::default().with_suite(suite))
                    .credentials(credentials)
                    .build();
                pair.connect();

                let case = format!("{name} / {session_mode:?} / {nonce_mode:?}");
                assert!(pair.is_confirmed(), "{case}");

                // each direction decrypts what the other side protected
                assert!(pair.initiator.transmit(b"to responder"), "{case}");
                pair.pump();
                assert!(pair.responder.transmit(b"to initiator"), "{case}");
                pair.pump();
                assert_eq!(
                    pair.responder.upper().received(),
                    &[b"to responder".to_vec()],
                    "{case}"
                );
                assert_eq!(
                    pair.initiator.upper().received(),
                    &[b"to initiator".to_vec()],
                    "{case}"
                );
            }
        }
    }
}

#[test]
fn test_expired_certificate_rejected() {
    let backend = RustCryptoBackend::new();
    let mut pair = Pair::builder()
        .credentials(CredentialPair::certificates(&backend))
        .unix_time(CERT_TIME + 7200)
        .build();

    let reply = first_reply(&mut pair);
    assert_eq!(error_code(&reply), HandshakeError::BadCertificateChain);

    pair.pump();
    assert!(!pair.is_established());
    assert_eq!(pair.initiator_status(), InitiatorStatus::Idle);
    assert!(pair.initiator.poll_timeout().is_some());
}

#[test]
fn test_certificates_from_other_anchor_rejected() {
    let backend = RustCryptoBackend::new();
    let ours = CredentialPair::certificates(&backend);
    let theirs = CredentialPair::certificates(&backend);
    let mut pair = Pair::builder()
        .credentials(CredentialPair {
            initiator: ours.initiator,
            responder: theirs.responder,
        })
        .build();

    let reply = first_reply(&mut pair);
    assert_eq!(error_code(&reply), HandshakeError::BadCertificateChain);
}

#[test]
fn test_shared_secret_handshake() {
    init_tracing();
    let mut pair = Pair::builder()
        .initiator(InitiatorConfig::default().with_suite(CryptoSuite::shared_secret()))
        .credentials(CredentialPair::shared_secret(b"key-1", [0x5A; 32]))
        .build();
    pair.connect();

    assert!(pair.is_established());
    assert!(pair.is_confirmed());
}

#[test]
fn test_shared_secret_unknown_key_id() {
    let mut pair = Pair::builder()
        .initiator(InitiatorConfig::default().with_suite(CryptoSuite::shared_secret()))
        .credentials(CredentialPair {
            initiator: ssp_core::Credentials::shared_secret(b"key-1", [1; 32]),
            responder: ssp_core::Credentials::shared_secret(b"key-2", [1; 32]),
        })
        .build();

    let reply = first_reply(&mut pair);
    assert_eq!(error_code(&reply), HandshakeError::KeyNotFound);

    pair.pump();
    assert_eq!(pair.initiator_status(), InitiatorStatus::Idle);
    assert_eq!(pair.initiator.upper().open_count(), 0);
}

#[test]
fn test_mismatched_shared_secret_fails_authentication() {
    let mut pair = Pair::builder()
        .initiator(InitiatorConfig::default().with_suite(CryptoSuite::shared_secret()))
        .credentials(CredentialPair {
            initiator: ssp_core::Credentials::shared_secret(b"key-1", [1; 32]),
            responder: ssp_core::Credentials::shared_secret(b"key-1", [2; 32]),
        })
        .build();
    pair.connect();

    assert!(!pair.responder.upper().is_open());
    // the Initiator opened on the reply, then dropped the unconfirmed session
    assert_eq!(pair.initiator.upper().open_count(), 1);
    assert_eq!(pair.initiator.upper().close_count(), 1);
    assert!(!pair.initiator.session().is_valid());
    assert_eq!(pair.initiator_status(), InitiatorStatus::Idle);
    assert_eq!(
        pair.initiator.poll_timeout(),
        Some(ssp_platform::Timestamp::from_millis(5_000))
    );
}

#[test]
fn test_wrong_preshared_key_fails_authentication() {
    let ours = CredentialPair::preshared();
    let theirs = CredentialPair::preshared();
    let mut pair = Pair::builder()
        .credentials(CredentialPair {
            initiator: ours.initiator,
            responder: theirs.responder,
        })
        .build();
    pair.connect();

    assert!(!pair.responder.upper().is_open());
    assert!(!pair.initiator.upper().is_open());
    assert!(!pair.is_confirmed());
}

#[test]
fn test_mode_mismatch_rejected() {
    let mut pair = Pair::builder()
        .initiator(InitiatorConfig::default().with_suite(CryptoSuite::shared_secret()))
        .credentials(CredentialPair {
            initiator: ssp_core::Credentials::shared_secret(b"key-1", [1; 32]),
            responder: CredentialPair::preshared().responder,
        })
        .build();

    let reply = first_reply(&mut pair);
    assert_eq!(error_code(&reply), HandshakeError::UnsupportedHandshakeMode);
}

#[test]
fn test_responder_rejects_bad_requests() {
    let default_spec = CryptoSpec::from(&CryptoSuite::default());
    let cases = [
        (
            RequestHandshakeBegin {
                version: 1,
                ..request(default_spec, 1, 32)
            },
            HandshakeError::UnsupportedVersion,
        ),
        (request(default_spec, 7, 32), HandshakeError::UnsupportedHandshakeMode),
        (
            request(
                CryptoSpec {
                    handshake_hash: 4,
                    ..default_spec
                },
                1,
                32,
            ),
            HandshakeError::UnsupportedHandshakeHash,
        ),
        (
            request(
                CryptoSpec {
                    handshake_kdf: 4,
                    ..default_spec
                },
                1,
                32,
            ),
            HandshakeError::UnsupportedHandshakeKdf,
        ),
        (
            request(
                CryptoSpec {
                    session_mode: 9,
                    ..default_spec
                },
                1,
                32,
            ),
            HandshakeError::UnsupportedSessionMode,
        ),
        (
            request(
                CryptoSpec {
                    nonce_mode: 9,
                    ..default_spec
                },
                1,
                32,
            ),
            HandshakeError::UnsupportedNonceMode,
        ),
        (request(default_spec, 1, 16), HandshakeError::BadMessageFormat),
    ];

    for (msg, expected) in cases {
        let mut pair = Pair::new();
        pair.responder.on_lower_open();
        assert!(pair.responder.on_lower_rx_ready(&msg.serialize().unwrap()));
        let reply = pair.responder.lower_mut().pop_tx().expect("error reply");
        assert_eq!(error_code(&reply), expected, "request {:?}", msg);
        assert!(!pair.responder.upper().is_open());
    }
}

#[test]
fn test_retry_after_lost_request() {
    let mut pair = Pair::new();
    pair.responder.on_lower_open();
    pair.initiator.on_lower_open();
    pair.collect();
    pair.to_responder.clear();

    pair.advance(Duration::from_secs(2));
    assert_eq!(pair.initiator_status(), InitiatorStatus::Idle);
    assert_eq!(
        pair.initiator.poll_timeout(),
        Some(ssp_platform::Timestamp::from_millis(7_000))
    );

    pair.advance(Duration::from_secs(5));
    assert_eq!(pair.initiator_status(), InitiatorStatus::WaitForBeginReply);
    pair.pump();
    assert!(pair.is_established());
}

#[test]
fn test_retry_after_lost_confirmation() {
    let mut pair = Pair::new();
    pair.responder.on_lower_open();
    pair.initiator.on_lower_open();
    // begin, reply, then lose RequestHandshakeAuth
    pair.collect();
    pair.deliver();
    pair.collect();
    pair.deliver();
    pair.collect();
    assert_eq!(pair.to_responder.len(), 1);
    pair.to_responder.clear();
    assert!(pair.initiator.upper().is_open());

    pair.advance(Duration::from_secs(2));
    assert!(!pair.initiator.upper().is_open());
    assert_eq!(pair.initiator_status(), InitiatorStatus::Idle);

    pair.advance(Duration::from_secs(5));
    pair.pump();
    assert!(pair.is_established());
    assert!(pair.is_confirmed());
    assert_eq!(pair.initiator.upper().open_count(), 2);
}

#[test]
fn test_clock_rollback_during_handshake() {
    let mut pair = Pair::new();
    pair.clock.advance(Duration::from_secs(10));
    let _ = first_reply(&mut pair);

    pair.clock.set_now(ssp_platform::Timestamp::from_millis(5_000));
    pair.deliver();
    assert_eq!(pair.initiator_status(), InitiatorStatus::Idle);
    assert!(!pair.initiator.upper().is_open());
}

#[test]
fn test_renegotiation_by_session_age() {
    let mut pair = Pair::builder()
        .initiator(
            InitiatorConfig::default().with_session_renegotiation_trigger(Duration::from_secs(30)),
        )
        .build();
    pair.connect();
    assert!(pair.initiator.transmit(b"before"));
    pair.pump();

    pair.advance(Duration::from_secs(30));
    assert_eq!(pair.initiator_status(), InitiatorStatus::WaitForBeginReply);
    pair.pump();

    assert!(pair.is_confirmed());
    assert_eq!(pair.initiator.session().tx_nonce(), Some(0));
    // the application never saw the session drop
    assert_eq!(pair.initiator.upper().open_count(), 1);
    assert_eq!(pair.responder.upper().open_count(), 1);

    assert!(pair.initiator.transmit(b"after"));
    pair.pump();
    assert_eq!(
        pair.responder.upper().received(),
        &[b"before".to_vec(), b"after".to_vec()]
    );
}

#[test]
fn test_renegotiation_by_nonce() {
    let mut pair = Pair::builder()
        .initiator(InitiatorConfig::default().with_nonce_renegotiation_trigger(3))
        .build();
    pair.connect();

    for i in 0..3u8 {
        assert!(pair.initiator.transmit(&[i]));
        pair.pump();
    }
    // third message hit the trigger and a fresh handshake completed
    assert!(pair.is_confirmed());
    assert_eq!(pair.initiator.session().tx_nonce(), Some(0));
    assert_eq!(pair.responder.upper().received().len(), 3);
}
