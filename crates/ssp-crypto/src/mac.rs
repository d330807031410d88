//! Hashing, HMAC and constant-time comparison.

use crate::{Error, Result};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// SHA-256 output length.
pub const SHA256_LENGTH: usize = 32;

/// Hash the concatenation of `parts` with SHA-256.
pub fn sha256(parts: &[&[u8]]) -> [u8; SHA256_LENGTH] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// HMAC-SHA256 over the concatenation of `parts`.
///
/// # Example
/// ```
/// use ssp_crypto::mac::hmac_sha256;
///
/// let tag = hmac_sha256(b"key", &[b"The quick brown fox ", b"jumps over the lazy dog"]).unwrap();
/// assert_eq!(
///     hex::encode(*tag),
///     "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
/// );
/// ```
pub fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Result<Zeroizing<[u8; SHA256_LENGTH]>> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key)
        .map_err(|_| Error::Mac("HMAC key rejected".into()))?;
    for part in parts {
        mac.update(part);
    }
    Ok(Zeroizing::new(mac.finalize().into_bytes().into()))
}

/// Compare two byte strings in constant time.
///
/// Slices of different length compare unequal; only the length leaks.
pub fn secure_equals(lhs: &[u8], rhs: &[u8]) -> bool {
    lhs.len() == rhs.len() && bool::from(lhs.ct_eq(rhs))
}
