//! Algorithm identifiers exchanged during the handshake.
//!
//! Each identifier is a single byte on the wire. A [`CryptoSuite`] groups the
//! five choices an Initiator advertises in its RequestHandshakeBegin.

/// Ephemeral data exchanged in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandshakeEphemeral {
    /// X25519 ephemeral public key (32 bytes).
    X25519 = 0x00,
    /// 32-byte random nonce, used with shared-secret handshakes.
    Nonce = 0x01,
}

/// Hash used for the handshake transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandshakeHash {
    /// SHA-256.
    Sha256 = 0x00,
}

/// KDF used to derive authentication and session keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandshakeKdf {
    /// HKDF with SHA-256 (RFC 5869).
    HkdfSha256 = 0x00,
}

/// How a receiver verifies the nonce of each session message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SessionNonceMode {
    /// New nonce must equal the last received nonce plus one.
    IncrementLastRx = 0x00,
    /// New nonce must be greater than the last received nonce.
    GreaterThanLastRx = 0x01,
}

/// Per-message authentication and encryption mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SessionCryptoMode {
    /// Cleartext payload followed by HMAC-SHA256 truncated to 16 bytes.
    HmacSha256Trunc16 = 0x00,
    /// AES-256-GCM ciphertext followed by the 16-byte tag.
    Aes256Gcm = 0x01,
}

macro_rules! wire_enum {
    ($ty:ty { $($value:literal => $variant:ident),+ $(,)? }) => {
        impl $ty {
            /// Convert from wire format (u8).
            pub fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $($value => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Convert to wire format (u8).
            pub fn to_u8(self) -> u8 {
                self as u8
            }
        }
    };
}

wire_enum!(HandshakeEphemeral { 0x00 => X25519, 0x01 => Nonce });
wire_enum!(HandshakeHash { 0x00 => Sha256 });
wire_enum!(HandshakeKdf { 0x00 => HkdfSha256 });
wire_enum!(SessionNonceMode { 0x00 => IncrementLastRx, 0x01 => GreaterThanLastRx });
wire_enum!(SessionCryptoMode { 0x00 => HmacSha256Trunc16, 0x01 => Aes256Gcm });

/// Algorithms an Initiator requests for one handshake.
///
/// The default is the mandatory-to-implement suite: X25519, SHA-256,
/// HKDF-SHA256, strict increment nonces and HMAC-SHA256-16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CryptoSuite {
    /// Handshake ephemeral type.
    pub handshake_ephemeral: HandshakeEphemeral,
    /// Transcript hash.
    pub handshake_hash: HandshakeHash,
    /// Key derivation function.
    pub handshake_kdf: HandshakeKdf,
    /// Session nonce verification mode.
    pub nonce_mode: SessionNonceMode,
    /// Session message protection mode.
    pub session_mode: SessionCryptoMode,
}

impl Default for CryptoSuite {
    fn default() -> Self {
        Self {
            handshake_ephemeral: HandshakeEphemeral::X25519,
            handshake_hash: HandshakeHash::Sha256,
            handshake_kdf: HandshakeKdf::HkdfSha256,
            nonce_mode: SessionNonceMode::IncrementLastRx,
            session_mode: SessionCryptoMode::HmacSha256Trunc16,
        }
    }
}

impl CryptoSuite {
    /// Suite for shared-secret handshakes (random nonces as ephemeral data).
    pub fn shared_secret() -> Self {
        Self {
            handshake_ephemeral: HandshakeEphemeral::Nonce,
            ..Self::default()
        }
    }

    /// Replace the session crypto mode.
    pub fn with_session_mode(mut self, mode: SessionCryptoMode) -> Self {
        self.session_mode = mode;
        self
    }

    /// Replace the nonce mode.
    pub fn with_nonce_mode(mut self, mode: SessionNonceMode) -> Self {
        self.nonce_mode = mode;
        self
    }

    /// Check if session payloads are encrypted.
    pub fn is_encrypted(&self) -> bool {
        matches!(self.session_mode, SessionCryptoMode::Aes256Gcm)
    }
}
