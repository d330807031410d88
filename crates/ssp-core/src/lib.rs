//! Protocol engine for the secure session protocol.
//!
//! This crate implements:
//! - Wire encoding of the six protocol messages ([`message`])
//! - Certificate envelopes and chain validation ([`cert`], [`auth`])
//! - Algorithm negotiation ([`algorithms`])
//! - Initiator and Responder handshake state machines ([`handshake`])
//! - Authenticated session messages with nonce and lifetime limits ([`session`])
//! - Fragment reassembly ([`reassembler`])
//! - The [`CryptoLayer`] tying all of the above to a transport and an application
//!
//! Platform capabilities (transport, clock, crypto backend) come from
//! `ssp-platform` and `ssp-crypto`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod algorithms;
pub mod auth;
pub mod cert;
pub mod config;
pub mod error;
pub mod handshake;
pub mod layer;
pub mod message;
pub mod reassembler;
pub mod session;
pub mod tx_state;

pub use auth::{Credentials, HandshakeMode, KeyLookup, StaticKeyLookup};
pub use config::{InitiatorConfig, LayerConfig, ResponderConfig, RetryPolicy, SessionConfig};
pub use error::{Error, HandshakeError, ParseError, ReassemblyError, Result, SessionError};
pub use handshake::{Initiator, InitiatorStatus, Responder};
pub use layer::{CryptoLayer, Handshake};
pub use message::{Message, PROTOCOL_VERSION};
pub use session::Session;
