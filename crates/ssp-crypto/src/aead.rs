//! AES-256-GCM session encryption (NIST SP 800-38D).
//!
//! Session messages carry a 16-bit nonce. The 96-bit GCM nonce is ten zero
//! bytes followed by that counter in big-endian order. Each direction has its
//! own key, so a counter value is never reused under the same key.

use crate::keys::SymmetricKey;
use crate::{Error, Result};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};

/// Length of the GCM authentication tag appended to every ciphertext.
pub const AES_GCM_TAG_LENGTH: usize = 16;

/// Construct the 12-byte GCM nonce from a session nonce.
///
/// # Example
/// ```
/// use ssp_crypto::aead::construct_nonce;
///
/// let nonce = construct_nonce(0x0102);
/// assert_eq!(&nonce[..10], &[0u8; 10]);
/// assert_eq!(&nonce[10..], &[0x01, 0x02]);
/// ```
pub fn construct_nonce(nonce: u16) -> [u8; 12] {
    let mut out = [0u8; 12];
    out[10..].copy_from_slice(&nonce.to_be_bytes());
    out
}

/// Encrypt with AES-256-GCM.
///
/// Returns `ciphertext || tag`.
pub fn aes256_gcm_encrypt(
    key: &SymmetricKey,
    nonce: u16,
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|_| Error::Encryption("AES-256-GCM key rejected".into()))?;

    let payload = Payload {
        msg: plaintext,
        aad,
    };

    cipher
        .encrypt(Nonce::from_slice(&construct_nonce(nonce)), payload)
        .map_err(|_| Error::Encryption("AES-256-GCM encryption failed".into()))
}

/// Decrypt and authenticate `ciphertext || tag` with AES-256-GCM.
///
/// # Errors
/// - `Error::InvalidLength` if the input is shorter than the tag
/// - `Error::Decryption` if tag verification fails
pub fn aes256_gcm_decrypt(
    key: &SymmetricKey,
    nonce: u16,
    aad: &[u8],
    ciphertext_and_tag: &[u8],
) -> Result<Vec<u8>> {
    if ciphertext_and_tag.len() < AES_GCM_TAG_LENGTH {
        return Err(Error::InvalidLength {
            expected: AES_GCM_TAG_LENGTH,
            actual: ciphertext_and_tag.len(),
        });
    }

    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|_| Error::Decryption("AES-256-GCM key rejected".into()))?;

    let payload = Payload {
        msg: ciphertext_and_tag,
        aad,
    };

    cipher
        .decrypt(Nonce::from_slice(&construct_nonce(nonce)), payload)
        .map_err(|_| Error::Decryption("AES-256-GCM authentication failed".into()))
}
