//! Key derivation functions (HKDF-SHA256).
//!
//! The handshake derives keys in pairs: the transcript hash is the salt, the
//! DH outputs (or a preshared secret) are the input key material, and a
//! context label selects authentication or session keys.

use crate::keys::{SymmetricKey, KEY_LENGTH};
use crate::{Error, Result};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Generic HKDF-SHA256 key derivation per RFC 5869.
///
/// # Arguments
/// * `ikm` - Input key material
/// * `salt` - Salt value (empty slice for no salt)
/// * `info` - Context and application-specific information
/// * `output_len` - Length of output key material
///
/// # Example
/// ```
/// use ssp_crypto::kdf::hkdf_sha256;
///
/// let ikm = &[0x0b; 22];
/// let salt = &hex::decode("000102030405060708090a0b0c").unwrap();
/// let info = &hex::decode("f0f1f2f3f4f5f6f7f8f9").unwrap();
///
/// let okm = hkdf_sha256(ikm, salt, info, 42).unwrap();
/// assert_eq!(okm.len(), 42);
/// ```
pub fn hkdf_sha256(
    ikm: &[u8],
    salt: &[u8],
    info: &[u8],
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);

    let mut okm = Zeroizing::new(vec![0u8; output_len]);
    hk.expand(info, &mut okm)
        .map_err(|_| Error::KeyDerivation("HKDF expansion failed".into()))?;

    Ok(okm)
}

/// Derive two independent 32-byte keys.
///
/// `ikm_parts` are concatenated (into a zeroized buffer) before extraction.
/// Returns the first and second halves of a 64-byte HKDF output.
pub fn derive_key_pair(
    salt: &[u8],
    ikm_parts: &[&[u8]],
    info: &[u8],
) -> Result<(SymmetricKey, SymmetricKey)> {
    let total: usize = ikm_parts.iter().map(|p| p.len()).sum();
    let mut ikm = Zeroizing::new(Vec::with_capacity(total));
    for part in ikm_parts {
        ikm.extend_from_slice(part);
    }

    let okm = hkdf_sha256(&ikm, salt, info, 2 * KEY_LENGTH)?;

    let mut first = Zeroizing::new([0u8; KEY_LENGTH]);
    let mut second = Zeroizing::new([0u8; KEY_LENGTH]);
    first.copy_from_slice(&okm[..KEY_LENGTH]);
    second.copy_from_slice(&okm[KEY_LENGTH..]);

    Ok((first, second))
}
