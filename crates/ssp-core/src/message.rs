//! Message parsing and serialization.
//!
//! Every message starts with a one-byte function code. Variable-length fields
//! are length-prefixed sequences: `seq8` has a 1-byte length, `seq16` a
//! 2-byte length.
//!
//! All multi-byte integers use big-endian byte order.

use crate::error::{Error, HandshakeError, ParseError, Result};
use ssp_crypto::CryptoSuite;

/// Protocol version carried in RequestHandshakeBegin.
pub const PROTOCOL_VERSION: u16 = 0x0000;

/// Minimum RequestHandshakeBegin size (all sequences empty).
pub const REQUEST_HANDSHAKE_BEGIN_MIN_SIZE: usize = 18;
/// Minimum ReplyHandshakeBegin size.
pub const REPLY_HANDSHAKE_BEGIN_MIN_SIZE: usize = 4;
/// Minimum handshake auth message size.
pub const HANDSHAKE_AUTH_MIN_SIZE: usize = 2;
/// ReplyHandshakeError size.
pub const REPLY_HANDSHAKE_ERROR_SIZE: usize = 2;
/// Minimum SessionData size (empty payload).
pub const SESSION_DATA_MIN_SIZE: usize = 6;
/// Size of the SessionData header preceding the payload bytes.
pub const SESSION_DATA_OVERHEAD: usize = SESSION_DATA_MIN_SIZE;

/// Message function codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Function {
    /// Initiator opens a handshake.
    RequestHandshakeBegin = 0x00,
    /// Responder answers a handshake begin.
    ReplyHandshakeBegin = 0x01,
    /// Initiator proves possession of the derived keys.
    RequestHandshakeAuth = 0x02,
    /// Responder proves possession of the derived keys.
    ReplyHandshakeAuth = 0x03,
    /// Responder rejects a handshake message.
    ReplyHandshakeError = 0x04,
    /// Authenticated session payload.
    SessionData = 0x05,
}

impl Function {
    /// Convert from wire format.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::RequestHandshakeBegin),
            0x01 => Some(Self::ReplyHandshakeBegin),
            0x02 => Some(Self::RequestHandshakeAuth),
            0x03 => Some(Self::ReplyHandshakeAuth),
            0x04 => Some(Self::ReplyHandshakeError),
            0x05 => Some(Self::SessionData),
            _ => None,
        }
    }

    /// Convert to wire format.
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Algorithm codes as they appear on the wire.
///
/// Kept raw so that a Responder can answer an unknown code with the specific
/// "unsupported" error instead of a generic format error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CryptoSpec {
    /// Handshake ephemeral code.
    pub handshake_ephemeral: u8,
    /// Handshake hash code.
    pub handshake_hash: u8,
    /// Handshake KDF code.
    pub handshake_kdf: u8,
    /// Session nonce mode code.
    pub nonce_mode: u8,
    /// Session crypto mode code.
    pub session_mode: u8,
}

impl From<&CryptoSuite> for CryptoSpec {
    fn from(suite: &CryptoSuite) -> Self {
        Self {
            handshake_ephemeral: suite.handshake_ephemeral.to_u8(),
            handshake_hash: suite.handshake_hash.to_u8(),
            handshake_kdf: suite.handshake_kdf.to_u8(),
            nonce_mode: suite.nonce_mode.to_u8(),
            session_mode: suite.session_mode.to_u8(),
        }
    }
}

/// Session limits requested by the Initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionConstraints {
    /// Highest nonce either side may use.
    pub max_nonce: u16,
    /// Session lifetime in milliseconds.
    pub max_session_duration_ms: u32,
}

/// First handshake message, Initiator to Responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHandshakeBegin {
    /// Protocol version.
    pub version: u16,
    /// Requested algorithms.
    pub spec: CryptoSpec,
    /// Requested session limits.
    pub constraints: SessionConstraints,
    /// Handshake mode code.
    pub handshake_mode: u8,
    /// Ephemeral public key or random nonce.
    pub ephemeral_data: Vec<u8>,
    /// Mode-specific data: certificate chain or shared-secret key id.
    pub mode_data: Vec<u8>,
}

/// Responder's answer to RequestHandshakeBegin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyHandshakeBegin {
    /// Ephemeral public key or random nonce.
    pub ephemeral_data: Vec<u8>,
    /// Mode-specific data: certificate chain or empty.
    pub mode_data: Vec<u8>,
}

/// Initiator's key confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHandshakeAuth {
    /// HMAC under the Initiator's authentication key.
    pub mac: Vec<u8>,
}

/// Responder's key confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyHandshakeAuth {
    /// HMAC under the Responder's authentication key.
    pub mac: Vec<u8>,
}

/// Responder's rejection of a handshake message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyHandshakeError {
    /// Reason for the rejection.
    pub error: HandshakeError,
}

/// Fragment position flags of a SessionData message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionFlags {
    /// First fragment of an application message.
    pub fir: bool,
    /// Last fragment of an application message.
    pub fin: bool,
}

impl SessionFlags {
    const FIR: u8 = 0x80;
    const FIN: u8 = 0x40;

    /// Decode, rejecting reserved bits.
    pub fn from_u8(value: u8) -> core::result::Result<Self, ParseError> {
        if value & !(Self::FIR | Self::FIN) != 0 {
            return Err(ParseError::ReservedBits(value));
        }
        Ok(Self {
            fir: value & Self::FIR != 0,
            fin: value & Self::FIN != 0,
        })
    }

    /// Encode.
    pub fn to_u8(self) -> u8 {
        let mut value = 0;
        if self.fir {
            value |= Self::FIR;
        }
        if self.fin {
            value |= Self::FIN;
        }
        value
    }
}

/// Associated data authenticated with each session payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthMetadata {
    /// Message nonce.
    pub nonce: u16,
    /// Fragment flags.
    pub flags: SessionFlags,
}

impl AuthMetadata {
    /// Encoded size.
    pub const SIZE: usize = 3;

    /// Encode as it appears on the wire (and as MAC/AEAD associated data).
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let nonce = self.nonce.to_be_bytes();
        [nonce[0], nonce[1], self.flags.to_u8()]
    }
}

/// Authenticated (and possibly encrypted) session payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    /// Nonce and fragment flags.
    pub metadata: AuthMetadata,
    /// User data with MAC, or ciphertext with tag.
    pub payload: Vec<u8>,
}

/// Any protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// RequestHandshakeBegin.
    RequestHandshakeBegin(RequestHandshakeBegin),
    /// ReplyHandshakeBegin.
    ReplyHandshakeBegin(ReplyHandshakeBegin),
    /// RequestHandshakeAuth.
    RequestHandshakeAuth(RequestHandshakeAuth),
    /// ReplyHandshakeAuth.
    ReplyHandshakeAuth(ReplyHandshakeAuth),
    /// ReplyHandshakeError.
    ReplyHandshakeError(ReplyHandshakeError),
    /// SessionData.
    SessionData(SessionData),
}

impl Message {
    /// Function code of this message.
    pub fn function(&self) -> Function {
        match self {
            Self::RequestHandshakeBegin(_) => Function::RequestHandshakeBegin,
            Self::ReplyHandshakeBegin(_) => Function::ReplyHandshakeBegin,
            Self::RequestHandshakeAuth(_) => Function::RequestHandshakeAuth,
            Self::ReplyHandshakeAuth(_) => Function::ReplyHandshakeAuth,
            Self::ReplyHandshakeError(_) => Function::ReplyHandshakeError,
            Self::SessionData(_) => Function::SessionData,
        }
    }

    /// Parse a message from its wire encoding.
    ///
    /// The whole input must be consumed.
    pub fn parse(data: &[u8]) -> core::result::Result<Self, ParseError> {
        check_len(data, 1)?;
        let function = Function::from_u8(data[0]).ok_or(ParseError::UnexpectedFunction(data[0]))?;

        match function {
            Function::RequestHandshakeBegin => {
                RequestHandshakeBegin::parse(data).map(Self::RequestHandshakeBegin)
            }
            Function::ReplyHandshakeBegin => {
                ReplyHandshakeBegin::parse(data).map(Self::ReplyHandshakeBegin)
            }
            Function::RequestHandshakeAuth => {
                RequestHandshakeAuth::parse(data).map(Self::RequestHandshakeAuth)
            }
            Function::ReplyHandshakeAuth => {
                ReplyHandshakeAuth::parse(data).map(Self::ReplyHandshakeAuth)
            }
            Function::ReplyHandshakeError => {
                ReplyHandshakeError::parse(data).map(Self::ReplyHandshakeError)
            }
            Function::SessionData => SessionData::parse(data).map(Self::SessionData),
        }
    }

    /// Serialize to wire format.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        match self {
            Self::RequestHandshakeBegin(m) => m.serialize(),
            Self::ReplyHandshakeBegin(m) => m.serialize(),
            Self::RequestHandshakeAuth(m) => m.serialize(),
            Self::ReplyHandshakeAuth(m) => m.serialize(),
            Self::ReplyHandshakeError(m) => Ok(m.serialize()),
            Self::SessionData(m) => m.serialize(),
        }
    }
}

// === RequestHandshakeBegin ===

impl RequestHandshakeBegin {
    /// Parse from wire format.
    pub fn parse(data: &[u8]) -> core::result::Result<Self, ParseError> {
        check_len(data, REQUEST_HANDSHAKE_BEGIN_MIN_SIZE)?;
        let mut r = Reader::new(data);
        r.function(Function::RequestHandshakeBegin)?;

        let version = r.u16()?;
        let spec = CryptoSpec {
            handshake_ephemeral: r.u8()?,
            handshake_hash: r.u8()?,
            handshake_kdf: r.u8()?,
            nonce_mode: r.u8()?,
            session_mode: r.u8()?,
        };
        let constraints = SessionConstraints {
            max_nonce: r.u16()?,
            max_session_duration_ms: r.u32()?,
        };
        let handshake_mode = r.u8()?;
        let ephemeral_data = r.seq8()?.to_vec();
        let mode_data = r.seq16()?.to_vec();
        r.finish()?;

        Ok(Self {
            version,
            spec,
            constraints,
            handshake_mode,
            ephemeral_data,
            mode_data,
        })
    }

    /// Serialize to wire format.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(
            REQUEST_HANDSHAKE_BEGIN_MIN_SIZE + self.ephemeral_data.len() + self.mode_data.len(),
        );
        out.push(Function::RequestHandshakeBegin.to_u8());
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&[
            self.spec.handshake_ephemeral,
            self.spec.handshake_hash,
            self.spec.handshake_kdf,
            self.spec.nonce_mode,
            self.spec.session_mode,
        ]);
        out.extend_from_slice(&self.constraints.max_nonce.to_be_bytes());
        out.extend_from_slice(&self.constraints.max_session_duration_ms.to_be_bytes());
        out.push(self.handshake_mode);
        put_seq8(&mut out, &self.ephemeral_data)?;
        put_seq16(&mut out, &self.mode_data)?;
        Ok(out)
    }
}

// === ReplyHandshakeBegin ===

impl ReplyHandshakeBegin {
    /// Parse from wire format.
    pub fn parse(data: &[u8]) -> core::result::Result<Self, ParseError> {
        check_len(data, REPLY_HANDSHAKE_BEGIN_MIN_SIZE)?;
        let mut r = Reader::new(data);
        r.function(Function::ReplyHandshakeBegin)?;
        let ephemeral_data = r.seq8()?.to_vec();
        let mode_data = r.seq16()?.to_vec();
        r.finish()?;
        Ok(Self {
            ephemeral_data,
            mode_data,
        })
    }

    /// Serialize to wire format.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(
            REPLY_HANDSHAKE_BEGIN_MIN_SIZE + self.ephemeral_data.len() + self.mode_data.len(),
        );
        out.push(Function::ReplyHandshakeBegin.to_u8());
        put_seq8(&mut out, &self.ephemeral_data)?;
        put_seq16(&mut out, &self.mode_data)?;
        Ok(out)
    }
}

// === RequestHandshakeAuth / ReplyHandshakeAuth ===

fn parse_auth(data: &[u8], function: Function) -> core::result::Result<Vec<u8>, ParseError> {
    check_len(data, HANDSHAKE_AUTH_MIN_SIZE)?;
    let mut r = Reader::new(data);
    r.function(function)?;
    let mac = r.seq8()?.to_vec();
    r.finish()?;
    Ok(mac)
}

fn serialize_auth(function: Function, mac: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(HANDSHAKE_AUTH_MIN_SIZE + mac.len());
    out.push(function.to_u8());
    put_seq8(&mut out, mac)?;
    Ok(out)
}

impl RequestHandshakeAuth {
    /// Parse from wire format.
    pub fn parse(data: &[u8]) -> core::result::Result<Self, ParseError> {
        parse_auth(data, Function::RequestHandshakeAuth).map(|mac| Self { mac })
    }

    /// Serialize to wire format.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize_auth(Function::RequestHandshakeAuth, &self.mac)
    }
}

impl ReplyHandshakeAuth {
    /// Parse from wire format.
    pub fn parse(data: &[u8]) -> core::result::Result<Self, ParseError> {
        parse_auth(data, Function::ReplyHandshakeAuth).map(|mac| Self { mac })
    }

    /// Serialize to wire format.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize_auth(Function::ReplyHandshakeAuth, &self.mac)
    }
}

// === ReplyHandshakeError ===

impl ReplyHandshakeError {
    /// Parse from wire format.
    pub fn parse(data: &[u8]) -> core::result::Result<Self, ParseError> {
        check_len(data, REPLY_HANDSHAKE_ERROR_SIZE)?;
        let mut r = Reader::new(data);
        r.function(Function::ReplyHandshakeError)?;
        let code = r.u8()?;
        r.finish()?;
        let error = HandshakeError::from_u8(code).ok_or(ParseError::UndefinedEnum(code))?;
        Ok(Self { error })
    }

    /// Serialize to wire format.
    pub fn serialize(&self) -> Vec<u8> {
        vec![Function::ReplyHandshakeError.to_u8(), self.error.to_u8()]
    }
}

// === SessionData ===

impl SessionData {
    /// Parse from wire format.
    pub fn parse(data: &[u8]) -> core::result::Result<Self, ParseError> {
        check_len(data, SESSION_DATA_MIN_SIZE)?;
        let mut r = Reader::new(data);
        r.function(Function::SessionData)?;
        let nonce = r.u16()?;
        let flags = SessionFlags::from_u8(r.u8()?)?;
        let payload = r.seq16()?.to_vec();
        r.finish()?;
        Ok(Self {
            metadata: AuthMetadata { nonce, flags },
            payload,
        })
    }

    /// Serialize to wire format.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(SESSION_DATA_OVERHEAD + self.payload.len());
        out.push(Function::SessionData.to_u8());
        out.extend_from_slice(&self.metadata.to_bytes());
        put_seq16(&mut out, &self.payload)?;
        Ok(out)
    }
}

// === Helper functions ===

/// Check minimum buffer length.
pub(crate) fn check_len(data: &[u8], needed: usize) -> core::result::Result<(), ParseError> {
    if data.len() < needed {
        Err(ParseError::InsufficientBytes(needed))
    } else {
        Ok(())
    }
}

/// Append a sequence with a 1-byte length prefix.
pub(crate) fn put_seq8(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    let len = u8::try_from(bytes.len()).map_err(|_| ParseError::SequenceTooLong(bytes.len()))?;
    out.push(len);
    out.extend_from_slice(bytes);
    Ok(())
}

/// Append a sequence with a 2-byte length prefix.
pub(crate) fn put_seq16(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    let len = u16::try_from(bytes.len())
        .map_err(|_| Error::Parse(ParseError::SequenceTooLong(bytes.len())))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

/// Bounds-checked big-endian cursor.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> core::result::Result<&'a [u8], ParseError> {
        let end = self
            .pos
            .checked_add(n)
            .ok_or(ParseError::InsufficientBytes(usize::MAX))?;
        check_len(self.data, end)?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn function(&mut self, expected: Function) -> core::result::Result<(), ParseError> {
        let code = self.u8()?;
        if code != expected.to_u8() {
            return Err(ParseError::UnexpectedFunction(code));
        }
        Ok(())
    }

    pub(crate) fn u8(&mut self) -> core::result::Result<u8, ParseError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> core::result::Result<u16, ParseError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self) -> core::result::Result<u32, ParseError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn u64(&mut self) -> core::result::Result<u64, ParseError> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_be_bytes(buf))
    }

    pub(crate) fn seq8(&mut self) -> core::result::Result<&'a [u8], ParseError> {
        let len = self.u8()? as usize;
        self.take(len)
    }

    pub(crate) fn seq16(&mut self) -> core::result::Result<&'a [u8], ParseError> {
        let len = self.u16()? as usize;
        self.take(len)
    }

    pub(crate) fn finish(&self) -> core::result::Result<(), ParseError> {
        let remaining = self.data.len() - self.pos;
        if remaining != 0 {
            return Err(ParseError::TooManyBytes(remaining));
        }
        Ok(())
    }
}
