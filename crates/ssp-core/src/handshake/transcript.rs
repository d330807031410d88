use crate::algorithms::HandshakeAlgorithms;
use ssp_crypto::CryptoBackend;

/// Running hash over the handshake messages, used as the KDF salt.
pub(crate) struct Transcript {
    algorithms: HandshakeAlgorithms,
    value: [u8; 32],
}

impl Transcript {
    /// `h = H(request)`.
    pub(crate) fn begin(
        backend: &dyn CryptoBackend,
        algorithms: HandshakeAlgorithms,
        request: &[u8],
    ) -> Self {
        Self {
            value: algorithms.hash(backend, &[request]),
            algorithms,
        }
    }

    /// `h = H(h || message)`.
    pub(crate) fn mix(&mut self, backend: &dyn CryptoBackend, message: &[u8]) {
        self.value = self.algorithms.hash(backend, &[&self.value[..], message]);
    }

    pub(crate) fn value(&self) -> &[u8; 32] {
        &self.value
    }
}
