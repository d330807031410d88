//! Error types for protocol operations.
//!
//! Failures are split by how the layer reacts to them:
//! - [`ParseError`]: malformed wire data, dropped and logged
//! - [`HandshakeError`]: reported to the peer in a ReplyHandshakeError
//! - [`SessionError`]: per-message failures, some fatal to the session
//! - [`ReassemblyError`]: fragment sequencing failures

use thiserror::Error;

/// Result type alias for protocol operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Protocol operation errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed wire data.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Handshake rejected.
    #[error("Handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    /// Session message rejected.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Fragment reassembly failed.
    #[error("Reassembly error: {0}")]
    Reassembly(#[from] ReassemblyError),

    /// Cryptographic error.
    #[error("Crypto error: {0}")]
    Crypto(#[from] ssp_crypto::Error),
}

/// Wire decoding errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input ended before the message did.
    #[error("Insufficient data: need {0} bytes")]
    InsufficientBytes(usize),

    /// Bytes remain after the message.
    #[error("Trailing data: {0} bytes")]
    TooManyBytes(usize),

    /// First byte is not the expected function code.
    #[error("Unexpected function code: 0x{0:02x}")]
    UnexpectedFunction(u8),

    /// An enumerated field holds an undefined value.
    #[error("Undefined enum value: 0x{0:02x}")]
    UndefinedEnum(u8),

    /// Reserved bits are set.
    #[error("Reserved bits set: 0x{0:02x}")]
    ReservedBits(u8),

    /// A sequence is too long for its length prefix or count bound.
    #[error("Sequence too long: {0}")]
    SequenceTooLong(usize),

    /// A fixed-size field has the wrong length.
    #[error("Bad field length: expected {expected}, got {actual}")]
    BadLength {
        /// Required length.
        expected: usize,
        /// Length found.
        actual: usize,
    },
}

/// Handshake errors, carried on the wire in ReplyHandshakeError.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[repr(u8)]
pub enum HandshakeError {
    /// Message could not be decoded or violates a length rule (0x00).
    #[error("Bad message format")]
    BadMessageFormat = 0x00,
    /// Protocol version not supported (0x01).
    #[error("Unsupported version")]
    UnsupportedVersion = 0x01,
    /// Ephemeral type not supported or not valid for the mode (0x02).
    #[error("Unsupported handshake ephemeral")]
    UnsupportedHandshakeEphemeral = 0x02,
    /// Transcript hash not supported (0x03).
    #[error("Unsupported handshake hash")]
    UnsupportedHandshakeHash = 0x03,
    /// KDF not supported (0x04).
    #[error("Unsupported handshake KDF")]
    UnsupportedHandshakeKdf = 0x04,
    /// Session crypto mode not supported (0x05).
    #[error("Unsupported session mode")]
    UnsupportedSessionMode = 0x05,
    /// Nonce mode not supported (0x06).
    #[error("Unsupported nonce mode")]
    UnsupportedNonceMode = 0x06,
    /// Handshake mode not supported or not configured (0x07).
    #[error("Unsupported handshake mode")]
    UnsupportedHandshakeMode = 0x07,
    /// Certificate data could not be decoded (0x08).
    #[error("Bad certificate format")]
    BadCertificateFormat = 0x08,
    /// Certificate chain failed validation (0x09).
    #[error("Bad certificate chain")]
    BadCertificateChain = 0x09,
    /// Certificate uses an unsupported feature (0x0A).
    #[error("Unsupported certificate feature")]
    UnsupportedCertificateFeature = 0x0A,
    /// Authentication MAC mismatch (0x0B).
    #[error("Authentication error")]
    AuthenticationError = 0x0B,
    /// RequestHandshakeAuth without a preceding begin (0x0C).
    #[error("No prior handshake begin")]
    NoPriorHandshakeBegin = 0x0C,
    /// Shared secret key identifier unknown (0x0D).
    #[error("Key not found")]
    KeyNotFound = 0x0D,
    /// Local failure not attributable to the peer (0xFF).
    #[error("Internal error")]
    Internal = 0xFF,
}

impl HandshakeError {
    /// Convert to wire format.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Convert from wire format.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::BadMessageFormat),
            0x01 => Some(Self::UnsupportedVersion),
            0x02 => Some(Self::UnsupportedHandshakeEphemeral),
            0x03 => Some(Self::UnsupportedHandshakeHash),
            0x04 => Some(Self::UnsupportedHandshakeKdf),
            0x05 => Some(Self::UnsupportedSessionMode),
            0x06 => Some(Self::UnsupportedNonceMode),
            0x07 => Some(Self::UnsupportedHandshakeMode),
            0x08 => Some(Self::BadCertificateFormat),
            0x09 => Some(Self::BadCertificateChain),
            0x0A => Some(Self::UnsupportedCertificateFeature),
            0x0B => Some(Self::AuthenticationError),
            0x0C => Some(Self::NoPriorHandshakeBegin),
            0x0D => Some(Self::KeyNotFound),
            0xFF => Some(Self::Internal),
            _ => None,
        }
    }
}

impl From<ssp_crypto::Error> for HandshakeError {
    fn from(_: ssp_crypto::Error) -> Self {
        Self::Internal
    }
}

/// Session message errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum SessionError {
    /// No session keys are installed.
    #[error("No valid session")]
    NoValidSession,

    /// Payload too short for the mode's tag, or too large to send.
    #[error("Bad buffer size")]
    BadBufferSize,

    /// MAC or AEAD tag verification failed.
    #[error("Authentication failure")]
    AuthenticationFailure,

    /// Nonce does not satisfy the nonce mode (replay or reordering).
    #[error("Nonce replay")]
    NonceReplay,

    /// Nonce reached the negotiated maximum.
    #[error("Nonce exhausted")]
    NonceExhausted,

    /// Received nonce is beyond the session's maximum.
    #[error("Max nonce exceeded")]
    MaxNonceExceeded,

    /// Session exceeded its maximum duration.
    #[error("Session expired")]
    SessionExpired,

    /// Message protection failed locally.
    #[error("Crypto failure")]
    CryptoFailure,
}

impl SessionError {
    /// True if the session can no longer be used and must be re-established.
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::NonceExhausted | Self::SessionExpired)
    }
}

/// Fragment reassembly errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReassemblyError {
    /// Reassembled message would exceed the configured maximum.
    #[error("Reassembly overflow: {0} bytes")]
    Overflow(usize),

    /// Fragment nonce does not follow the previous fragment.
    #[error("Nonce gap: expected {expected}, got {actual}")]
    NonceGap {
        /// Nonce the next fragment should carry.
        expected: u16,
        /// Nonce it carried.
        actual: u16,
    },

    /// Continuation fragment without a first fragment.
    #[error("No prior first fragment")]
    NoPriorFirst,
}
