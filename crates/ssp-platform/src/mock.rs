//! Mock implementations for testing.
//!
//! Provides deterministic, reproducible behavior for automated CI testing.

use crate::traits::{Executor, LowerLayer, Timestamp, UpperLayer};
use core::time::Duration;
use ssp_crypto::keys::{DhOutput, KeyPair, KeyType, PrivateKey, PublicKey, SymmetricKey};
use ssp_crypto::mac::SHA256_LENGTH;
use ssp_crypto::sign::SIGNATURE_LENGTH;
use ssp_crypto::{CryptoBackend, Result, RustCryptoBackend};
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use zeroize::Zeroizing;

/// Mock transport that records transmitted messages.
///
/// A transmit occupies the single tx slot until the test calls
/// [`complete_tx`](Self::complete_tx).
///
/// # Example
///
/// ```
/// use ssp_platform::mock::MockLowerLayer;
/// use ssp_platform::traits::LowerLayer;
///
/// let mut lower = MockLowerLayer::new();
/// assert!(lower.transmit(&[1, 2, 3]));
/// assert!(!lower.transmit(&[4])); // busy until completion
/// lower.complete_tx();
/// assert_eq!(lower.pop_tx(), Some(vec![1, 2, 3]));
/// ```
#[derive(Debug)]
pub struct MockLowerLayer {
    tx: VecDeque<Vec<u8>>,
    tx_ready: bool,
    receive_requests: usize,
}

impl MockLowerLayer {
    /// Create a transport that is ready to transmit.
    pub fn new() -> Self {
        Self {
            tx: VecDeque::new(),
            tx_ready: true,
            receive_requests: 0,
        }
    }

    /// Take the oldest transmitted message.
    pub fn pop_tx(&mut self) -> Option<Vec<u8>> {
        self.tx.pop_front()
    }

    /// Number of transmitted messages not yet taken.
    pub fn num_tx(&self) -> usize {
        self.tx.len()
    }

    /// Mark the in-flight transmission as finished.
    pub fn complete_tx(&mut self) {
        self.tx_ready = true;
    }

    /// Force the tx slot state.
    pub fn set_tx_ready(&mut self, ready: bool) {
        self.tx_ready = ready;
    }

    /// Number of times the layer asked for more data.
    pub fn receive_requests(&self) -> usize {
        self.receive_requests
    }
}

impl Default for MockLowerLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl LowerLayer for MockLowerLayer {
    fn transmit(&mut self, data: &[u8]) -> bool {
        if !self.tx_ready {
            return false;
        }
        self.tx.push_back(data.to_vec());
        self.tx_ready = false;
        true
    }

    fn receive(&mut self) {
        self.receive_requests += 1;
    }

    fn is_tx_ready(&self) -> bool {
        self.tx_ready
    }
}

/// Mock application that records every notification.
#[derive(Debug)]
pub struct MockUpperLayer {
    is_open: bool,
    open_count: usize,
    close_count: usize,
    tx_ready_count: usize,
    accept_rx: bool,
    received: Vec<Vec<u8>>,
}

impl MockUpperLayer {
    /// Create an application that accepts every message.
    pub fn new() -> Self {
        Self {
            is_open: false,
            open_count: 0,
            close_count: 0,
            tx_ready_count: 0,
            accept_rx: true,
            received: Vec::new(),
        }
    }

    /// True between `on_open` and `on_close`.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Number of `on_open` notifications.
    pub fn open_count(&self) -> usize {
        self.open_count
    }

    /// Number of `on_close` notifications.
    pub fn close_count(&self) -> usize {
        self.close_count
    }

    /// Number of `on_tx_ready` notifications.
    pub fn tx_ready_count(&self) -> usize {
        self.tx_ready_count
    }

    /// Messages consumed so far.
    pub fn received(&self) -> &[Vec<u8>] {
        &self.received
    }

    /// Control whether `on_rx_ready` consumes messages.
    pub fn set_accept_rx(&mut self, accept: bool) {
        self.accept_rx = accept;
    }
}

impl Default for MockUpperLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl UpperLayer for MockUpperLayer {
    fn on_open(&mut self) {
        self.is_open = true;
        self.open_count += 1;
    }

    fn on_close(&mut self) {
        self.is_open = false;
        self.close_count += 1;
    }

    fn on_tx_ready(&mut self) {
        self.tx_ready_count += 1;
    }

    fn on_rx_ready(&mut self, data: &[u8]) -> bool {
        if !self.accept_rx {
            return false;
        }
        self.received.push(data.to_vec());
        true
    }
}

/// Manually advanced clock.
///
/// Clones share the same time, so two layers in one test see one clock.
#[derive(Debug, Clone, Default)]
pub struct MockExecutor {
    now_ms: Rc<Cell<u64>>,
    unix_secs: Rc<Cell<u64>>,
}

impl MockExecutor {
    /// Clock at monotonic time zero and Unix time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock at monotonic time zero and the given Unix time.
    pub fn with_unix_time(unix_secs: u64) -> Self {
        let executor = Self::default();
        executor.unix_secs.set(unix_secs);
        executor
    }

    /// Advance both clocks.
    pub fn advance(&self, by: Duration) {
        let ms = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.now_ms.set(self.now_ms.get().saturating_add(ms));
        self.unix_secs.set(self.unix_secs.get().saturating_add(by.as_secs()));
    }

    /// Set the monotonic clock, possibly backwards.
    pub fn set_now(&self, now: Timestamp) {
        self.now_ms.set(now.as_millis());
    }
}

impl Executor for MockExecutor {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.now_ms.get())
    }

    fn unix_time(&self) -> u64 {
        self.unix_secs.get()
    }
}

/// Backend producing fixed X25519 material and random bytes.
///
/// Every generated X25519 key pair has public and private bytes all equal to
/// the fill byte, every DH output is the fill byte repeated, and `fill_random`
/// writes the fill byte. Both peers therefore derive identical keys without
/// real key agreement. Hashing, MACs, KDF, AEAD and signatures are real.
#[derive(Debug, Clone, Copy)]
pub struct MockCryptoBackend {
    fill: u8,
    inner: RustCryptoBackend,
}

impl MockCryptoBackend {
    /// Mock that fills with `0xFF`.
    pub fn new() -> Self {
        Self::with_fill(0xFF)
    }

    /// Mock that fills with `fill`.
    pub fn with_fill(fill: u8) -> Self {
        Self {
            fill,
            inner: RustCryptoBackend::new(),
        }
    }
}

impl Default for MockCryptoBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoBackend for MockCryptoBackend {
    fn fill_random(&self, dest: &mut [u8]) {
        dest.fill(self.fill);
    }

    fn secure_equals(&self, lhs: &[u8], rhs: &[u8]) -> bool {
        self.inner.secure_equals(lhs, rhs)
    }

    fn hash_sha256(&self, parts: &[&[u8]]) -> [u8; SHA256_LENGTH] {
        self.inner.hash_sha256(parts)
    }

    fn hmac_sha256(&self, key: &[u8], parts: &[&[u8]]) -> Result<Zeroizing<[u8; SHA256_LENGTH]>> {
        self.inner.hmac_sha256(key, parts)
    }

    fn hkdf_sha256(
        &self,
        salt: &[u8],
        ikm_parts: &[&[u8]],
        info: &[u8],
    ) -> Result<(SymmetricKey, SymmetricKey)> {
        self.inner.hkdf_sha256(salt, ikm_parts, info)
    }

    fn gen_keypair_x25519(&self) -> Result<KeyPair> {
        Ok(KeyPair {
            public_key: PublicKey::new(KeyType::X25519, [self.fill; 32]),
            private_key: PrivateKey::new(KeyType::X25519, Zeroizing::new([self.fill; 32])),
        })
    }

    fn dh_x25519(&self, private: &PrivateKey, peer_public: &[u8]) -> Result<DhOutput> {
        private.expose(KeyType::X25519)?;
        if peer_public.len() != 32 {
            return Err(ssp_crypto::Error::InvalidLength {
                expected: 32,
                actual: peer_public.len(),
            });
        }
        Ok(Zeroizing::new([self.fill; 32]))
    }

    fn gen_keypair_ed25519(&self) -> Result<KeyPair> {
        self.inner.gen_keypair_ed25519()
    }

    fn sign_ed25519(&self, private: &PrivateKey, message: &[u8]) -> Result<[u8; SIGNATURE_LENGTH]> {
        self.inner.sign_ed25519(private, message)
    }

    fn verify_ed25519(&self, public: &[u8], message: &[u8], signature: &[u8]) -> bool {
        self.inner.verify_ed25519(public, message, signature)
    }

    fn aes256_gcm_encrypt(
        &self,
        key: &SymmetricKey,
        nonce: u16,
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        self.inner.aes256_gcm_encrypt(key, nonce, aad, plaintext)
    }

    fn aes256_gcm_decrypt(
        &self,
        key: &SymmetricKey,
        nonce: u16,
        aad: &[u8],
        ciphertext_and_tag: &[u8],
    ) -> Result<Vec<u8>> {
        self.inner.aes256_gcm_decrypt(key, nonce, aad, ciphertext_and_tag)
    }
}
