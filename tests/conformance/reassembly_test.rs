//! Fragmentation and reassembly conformance.

use proptest::prelude::*;
use ssp_conformance::Pair;
use ssp_core::config::SessionConfig;
use ssp_core::reassembler::{ReassemblyResult, Reassembler};
use ssp_core::session::TAG_LENGTH;
use ssp_core::{InitiatorConfig, LayerConfig, Message, ReassemblyError};
use ssp_crypto::suite::SessionNonceMode;
use ssp_crypto::CryptoSuite;

/// Ten bytes of user data per SessionData message.
fn small_payload_layer() -> LayerConfig {
    LayerConfig::default()
        .with_session(SessionConfig::default().with_max_payload_size(10 + TAG_LENGTH))
}

fn greater_than_mode() -> InitiatorConfig {
    InitiatorConfig::default()
        .with_suite(CryptoSuite::default().with_nonce_mode(SessionNonceMode::GreaterThanLastRx))
}

/// Run the Initiator's transmissions to completion without delivering them.
fn drain_fragments(pair: &mut Pair) -> Vec<Vec<u8>> {
    let mut fragments = Vec::new();
    while pair.collect() {
        fragments.extend(pair.to_responder.drain(..));
    }
    fragments
}

proptest! {
    #[test]
    fn prop_any_split_reassembles(
        message in proptest::collection::vec(any::<u8>(), 1..256),
        chunk in 1usize..64,
        start_nonce in 1u16..1000,
    ) {
        let mut reassembler = Reassembler::new(256);
        let chunks: Vec<&[u8]> = message.chunks(chunk).collect();
        let last = chunks.len() - 1;

        for (i, fragment) in chunks.iter().enumerate() {
            let result = reassembler
                .process(i == 0, i == last, start_nonce + i as u16, fragment)
                .unwrap();
            let expected = if i == last {
                ReassemblyResult::Complete
            } else {
                ReassemblyResult::Partial
            };
            prop_assert_eq!(result, expected);
        }
        prop_assert_eq!(reassembler.data(), Some(message.as_slice()));
    }

    #[test]
    fn prop_oversized_message_rejected(extra in 1usize..32, chunk in 1usize..16) {
        let max = 64;
        let message = vec![0xAB; max + extra];
        let mut reassembler = Reassembler::new(max);
        let chunks: Vec<&[u8]> = message.chunks(chunk).collect();
        let last = chunks.len() - 1;

        let mut overflowed = false;
        for (i, fragment) in chunks.iter().enumerate() {
            match reassembler.process(i == 0, i == last, 1 + i as u16, fragment) {
                Err(ReassemblyError::Overflow(size)) => {
                    prop_assert!(size > max);
                    overflowed = true;
                    break;
                }
                other => prop_assert!(other.is_ok()),
            }
        }
        prop_assert!(overflowed);
        prop_assert_eq!(reassembler.data(), None);
    }
}

#[test]
fn test_message_split_across_session_data() {
    let mut pair = Pair::builder().layer(small_payload_layer()).build();
    pair.connect();

    let message: Vec<u8> = (0..35).collect();
    assert!(pair.initiator.transmit(&message));

    // first fragment goes out immediately
    pair.collect();
    let Message::SessionData(first) = Message::parse(&pair.to_responder[0]).unwrap() else {
        panic!("expected SessionData");
    };
    assert!(first.metadata.flags.fir);
    assert!(!first.metadata.flags.fin);
    assert_eq!(first.payload.len(), 10 + TAG_LENGTH);

    pair.pump();
    assert_eq!(pair.responder.upper().received(), &[message]);
    assert_eq!(pair.initiator.session().tx_nonce(), Some(4));
    assert_eq!(pair.initiator.upper().tx_ready_count(), 1);
}

#[test]
fn test_lost_fragment_discards_message() {
    let mut pair = Pair::builder()
        .layer(small_payload_layer())
        .initiator(greater_than_mode())
        .build();
    pair.connect();

    assert!(pair.initiator.transmit(&[7u8; 25]));
    // fragments: nonce 1 (FIR), 2, 3 (FIN); drop the middle one
    let fragments = drain_fragments(&mut pair);
    assert_eq!(fragments.len(), 3);
    pair.to_responder.push_back(fragments[0].clone());
    pair.to_responder.push_back(fragments[2].clone());
    pair.pump();
    assert!(pair.responder.upper().received().is_empty());

    // the next message starts cleanly
    assert!(pair.initiator.transmit(b"whole"));
    pair.pump();
    assert_eq!(pair.responder.upper().received(), &[b"whole".to_vec()]);
}

#[test]
fn test_message_larger_than_reassembly_limit() {
    let layer = small_payload_layer().with_max_reassembly_size(20);
    let mut pair = Pair::builder().layer(layer).build();
    pair.connect();

    assert!(pair.initiator.transmit(&[1u8; 30]));
    pair.pump();
    assert!(pair.responder.upper().received().is_empty());

    assert!(pair.initiator.transmit(&[2u8; 20]));
    pair.pump();
    assert_eq!(pair.responder.upper().received(), &[vec![2u8; 20]]);
}

#[test]
fn test_continuation_without_first_fragment() {
    let mut pair = Pair::builder()
        .layer(small_payload_layer())
        .initiator(greater_than_mode())
        .build();
    pair.connect();

    assert!(pair.initiator.transmit(&[3u8; 15]));
    let fragments = drain_fragments(&mut pair);
    assert_eq!(fragments.len(), 2);

    let Message::SessionData(last) = Message::parse(&fragments[1]).unwrap() else {
        panic!("expected SessionData");
    };
    assert!(!last.metadata.flags.fir && last.metadata.flags.fin);

    // authenticated, but there is nothing to continue
    pair.to_responder.push_back(fragments[1].clone());
    pair.pump();
    assert!(pair.responder.upper().received().is_empty());
    assert_eq!(pair.responder.session().rx_nonce(), Some(2));
    assert_eq!(pair.responder.session().statistics().num_success, 1);
}

#[test]
fn test_upper_backpressure_holds_message() {
    let mut pair = Pair::new();
    pair.connect();
    pair.responder.upper_mut().set_accept_rx(false);

    assert!(pair.initiator.transmit(b"one"));
    pair.pump();
    assert!(pair.responder.upper().received().is_empty());

    // the held message blocks further input
    assert!(pair.initiator.transmit(b"two"));
    pair.pump();
    assert_eq!(pair.to_responder.len(), 1);

    pair.responder.upper_mut().set_accept_rx(true);
    let requests = pair.responder.lower().receive_requests();
    pair.responder.receive();
    assert!(pair.responder.lower().receive_requests() > requests);
    pair.pump();

    assert_eq!(
        pair.responder.upper().received(),
        &[b"one".to_vec(), b"two".to_vec()]
    );
}
