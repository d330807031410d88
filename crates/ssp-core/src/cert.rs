//! Certificate and key container records.
//!
//! A certificate envelope wraps the encoded [`CertificateBody`] and an Ed25519
//! signature over those exact bytes. A [`CertificateChain`] lists up to
//! [`MAX_CERTIFICATE_CHAIN`] envelopes, ordered from the one signed by the
//! trust anchor down to the endpoint's own certificate.
//!
//! Layouts (big-endian):
//! - body: serial u64, valid_after u64, valid_before u64, signing_level u8,
//!   public_key_type u8, public_key seq8
//! - envelope: certificate_body seq16, signature seq8
//! - chain: count u8, envelopes
//! - file entry: file_entry_type u8, data seq16

use crate::error::{ParseError, Result};
use crate::message::{put_seq16, put_seq8, Reader};
use ssp_crypto::keys::{KeyPair, KeyType, PrivateKey, PublicKey, KEY_LENGTH};
use ssp_crypto::{kex, sign, CryptoBackend};
use zeroize::Zeroizing;

/// Maximum number of certificates in a chain.
pub const MAX_CERTIFICATE_CHAIN: usize = 3;

type ParseResult<T> = core::result::Result<T, ParseError>;

/// Signed statement binding a public key to a validity window and level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateBody {
    /// Issuer-assigned serial number.
    pub serial_number: u64,
    /// Start of validity, Unix seconds.
    pub valid_after: u64,
    /// End of validity, Unix seconds.
    pub valid_before: u64,
    /// 0 for endpoint certificates; authorities sign only lower levels.
    pub signing_level: u8,
    /// Certified key.
    pub public_key: PublicKey,
}

impl CertificateBody {
    /// Parse from wire format.
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        let mut r = Reader::new(data);
        let serial_number = r.u64()?;
        let valid_after = r.u64()?;
        let valid_before = r.u64()?;
        let signing_level = r.u8()?;
        let key_type_code = r.u8()?;
        let key_type = KeyType::from_u8(key_type_code).ok_or(ParseError::UndefinedEnum(key_type_code))?;
        let key = r.seq8()?;
        r.finish()?;

        let public_key = PublicKey::from_slice(key_type, key).map_err(|_| ParseError::BadLength {
            expected: KEY_LENGTH,
            actual: key.len(),
        })?;

        Ok(Self {
            serial_number,
            valid_after,
            valid_before,
            signing_level,
            public_key,
        })
    }

    /// Serialize to wire format.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(27 + KEY_LENGTH);
        out.extend_from_slice(&self.serial_number.to_be_bytes());
        out.extend_from_slice(&self.valid_after.to_be_bytes());
        out.extend_from_slice(&self.valid_before.to_be_bytes());
        out.push(self.signing_level);
        out.push(self.public_key.key_type().to_u8());
        put_seq8(&mut out, self.public_key.as_bytes())?;
        Ok(out)
    }

    /// True if `unix_time` lies within the validity window (inclusive).
    pub fn is_valid_at(&self, unix_time: u64) -> bool {
        self.valid_after <= unix_time && unix_time <= self.valid_before
    }
}

/// Certificate body with its issuer's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateEnvelope {
    /// Encoded [`CertificateBody`], exactly as signed.
    pub certificate_body: Vec<u8>,
    /// Ed25519 signature over `certificate_body`.
    pub signature: Vec<u8>,
}

impl CertificateEnvelope {
    /// Encode and sign a body with an issuer's Ed25519 key.
    pub fn issue(
        backend: &dyn CryptoBackend,
        body: &CertificateBody,
        issuer: &PrivateKey,
    ) -> Result<Self> {
        let certificate_body = body.serialize()?;
        let signature = backend.sign_ed25519(issuer, &certificate_body)?;
        Ok(Self {
            certificate_body,
            signature: signature.to_vec(),
        })
    }

    /// Decode the wrapped body.
    pub fn body(&self) -> ParseResult<CertificateBody> {
        CertificateBody::parse(&self.certificate_body)
    }

    fn read(r: &mut Reader<'_>) -> ParseResult<Self> {
        let certificate_body = r.seq16()?.to_vec();
        let signature = r.seq8()?.to_vec();
        Ok(Self {
            certificate_body,
            signature,
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        put_seq16(out, &self.certificate_body)?;
        put_seq8(out, &self.signature)
    }
}

/// Ordered certificate chain, anchor side first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CertificateChain {
    /// Envelopes; the last one certifies the presenting endpoint.
    pub certificates: Vec<CertificateEnvelope>,
}

impl CertificateChain {
    /// Chain from envelopes.
    pub fn new(certificates: Vec<CertificateEnvelope>) -> Self {
        Self { certificates }
    }

    /// Parse from wire format.
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        let mut r = Reader::new(data);
        let count = r.u8()? as usize;
        if count > MAX_CERTIFICATE_CHAIN {
            return Err(ParseError::SequenceTooLong(count));
        }
        let mut certificates = Vec::with_capacity(count);
        for _ in 0..count {
            certificates.push(CertificateEnvelope::read(&mut r)?);
        }
        r.finish()?;
        Ok(Self { certificates })
    }

    /// Serialize to wire format.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        if self.certificates.len() > MAX_CERTIFICATE_CHAIN {
            return Err(ParseError::SequenceTooLong(self.certificates.len()).into());
        }
        let mut out = vec![self.certificates.len() as u8];
        for envelope in &self.certificates {
            envelope.write(&mut out)?;
        }
        Ok(out)
    }
}

/// Kind of data held by a [`CertificateFileEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FileEntryType {
    /// Raw X25519 public key.
    X25519PublicKey = 0x00,
    /// Raw X25519 private key.
    X25519PrivateKey = 0x01,
    /// Raw Ed25519 public key.
    Ed25519PublicKey = 0x02,
    /// Raw Ed25519 private key (seed).
    Ed25519PrivateKey = 0x03,
    /// Encoded [`CertificateChain`].
    CertificateChain = 0x04,
}

impl FileEntryType {
    /// Convert from wire format.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::X25519PublicKey),
            0x01 => Some(Self::X25519PrivateKey),
            0x02 => Some(Self::Ed25519PublicKey),
            0x03 => Some(Self::Ed25519PrivateKey),
            0x04 => Some(Self::CertificateChain),
            _ => None,
        }
    }

    /// Convert to wire format.
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Typed, length-tagged key or certificate record.
#[derive(Clone, PartialEq, Eq)]
pub struct CertificateFileEntry {
    /// What `data` holds.
    pub entry_type: FileEntryType,
    /// Raw contents, zeroed on drop since it may hold a private key.
    pub data: Zeroizing<Vec<u8>>,
}

impl core::fmt::Debug for CertificateFileEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CertificateFileEntry")
            .field("entry_type", &self.entry_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl CertificateFileEntry {
    /// Entry holding a public key.
    pub fn from_public_key(key: &PublicKey) -> Self {
        let entry_type = match key.key_type() {
            KeyType::X25519 => FileEntryType::X25519PublicKey,
            KeyType::Ed25519 => FileEntryType::Ed25519PublicKey,
        };
        Self {
            entry_type,
            data: Zeroizing::new(key.as_bytes().to_vec()),
        }
    }

    /// Entry holding a certificate chain.
    pub fn from_chain(chain: &CertificateChain) -> Result<Self> {
        Ok(Self {
            entry_type: FileEntryType::CertificateChain,
            data: Zeroizing::new(chain.serialize()?),
        })
    }

    /// Parse from wire format.
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        let mut r = Reader::new(data);
        let code = r.u8()?;
        let entry_type = FileEntryType::from_u8(code).ok_or(ParseError::UndefinedEnum(code))?;
        let data = Zeroizing::new(r.seq16()?.to_vec());
        r.finish()?;
        Ok(Self { entry_type, data })
    }

    /// Serialize to wire format.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(3 + self.data.len());
        out.push(self.entry_type.to_u8());
        put_seq16(&mut out, &self.data)?;
        Ok(out)
    }

    /// Extract a public key entry.
    pub fn public_key(&self) -> ParseResult<PublicKey> {
        let key_type = match self.entry_type {
            FileEntryType::X25519PublicKey => KeyType::X25519,
            FileEntryType::Ed25519PublicKey => KeyType::Ed25519,
            other => return Err(ParseError::UndefinedEnum(other.to_u8())),
        };
        PublicKey::from_slice(key_type, &self.data).map_err(|_| ParseError::BadLength {
            expected: KEY_LENGTH,
            actual: self.data.len(),
        })
    }

    /// Extract a private key entry and derive its public half.
    pub fn key_pair(&self) -> ParseResult<KeyPair> {
        if self.data.len() != KEY_LENGTH {
            return Err(ParseError::BadLength {
                expected: KEY_LENGTH,
                actual: self.data.len(),
            });
        }
        let mut bytes = Zeroizing::new([0u8; KEY_LENGTH]);
        bytes.copy_from_slice(&self.data);
        match self.entry_type {
            FileEntryType::X25519PrivateKey => Ok(kex::x25519::from_private(bytes)),
            FileEntryType::Ed25519PrivateKey => Ok(sign::from_seed(bytes)),
            other => Err(ParseError::UndefinedEnum(other.to_u8())),
        }
    }

    /// Extract a certificate chain entry.
    pub fn certificate_chain(&self) -> ParseResult<CertificateChain> {
        if self.entry_type != FileEntryType::CertificateChain {
            return Err(ParseError::UndefinedEnum(self.entry_type.to_u8()));
        }
        CertificateChain::parse(&self.data)
    }
}
