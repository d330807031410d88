//! Key exchange implementations.
//!
//! Implements:
//! - X25519 (RFC 7748)

pub mod x25519;
