//! Cryptographic conformance tests.
//!
//! Runs published vectors through the [`CryptoBackend`] trait object, the
//! only path the protocol engine uses to reach the primitives.

use ssp_crypto::{kex, sign, CryptoBackend, RustCryptoBackend};
use zeroize::Zeroizing;

fn backend() -> Box<dyn CryptoBackend> {
    Box::new(RustCryptoBackend::new())
}

fn decode32(s: &str) -> [u8; 32] {
    hex::decode(s).unwrap().try_into().unwrap()
}

#[cfg(test)]
mod x25519_tests {
    use super::*;

    /// RFC 7748 §6.1.
    #[test]
    fn test_rfc7748_vectors() {
        let backend = backend();
        let alice = kex::x25519::from_private(Zeroizing::new(decode32(
            "77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a",
        )));
        let bob_public = decode32("de9edb7d7b7dc1b4d35b61c2ece435373f8343c85b78674dadfc7e146f882b4f");

        let shared = backend.dh_x25519(&alice.private_key, &bob_public).unwrap();
        assert_eq!(
            hex::encode(*shared),
            "4a5d9d5ba4ce2de1728e3bf480350f25e07e21c947d19e3376f09b3c1e161742"
        );
    }

    #[test]
    fn test_generated_pairs_agree() {
        let backend = backend();
        let a = backend.gen_keypair_x25519().unwrap();
        let b = backend.gen_keypair_x25519().unwrap();
        let ab = backend.dh_x25519(&a.private_key, b.public_key.as_bytes()).unwrap();
        let ba = backend.dh_x25519(&b.private_key, a.public_key.as_bytes()).unwrap();
        assert_eq!(*ab, *ba);
    }

    #[test]
    fn test_signing_key_rejected_for_dh() {
        let backend = backend();
        let signing = sign::generate();
        assert!(backend.dh_x25519(&signing.private_key, &[9u8; 32]).is_err());
    }
}

#[cfg(test)]
mod hash_tests {
    use super::*;

    #[test]
    fn test_sha256_abc() {
        let digest = backend().hash_sha256(&[b"a", b"bc"]);
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    /// RFC 4231 test case 2.
    #[test]
    fn test_hmac_sha256_rfc4231() {
        let tag = backend()
            .hmac_sha256(b"Jefe", &[b"what do ya want for nothing?"])
            .unwrap();
        assert_eq!(
            hex::encode(*tag),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    /// RFC 5869 test case 1. The backend derives 64 bytes and splits them into
    /// two keys; the first 42 bytes match the published OKM.
    #[test]
    fn test_hkdf_key_pair_rfc5869() {
        let ikm = [0x0bu8; 22];
        let salt = hex::decode("000102030405060708090a0b0c").unwrap();
        let info = hex::decode("f0f1f2f3f4f5f6f7f8f9").unwrap();

        let (first, second) = backend()
            .hkdf_sha256(&salt, &[&ikm[..11], &ikm[11..]], &info)
            .unwrap();
        assert_eq!(
            hex::encode(*first),
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf"
        );
        assert_eq!(hex::encode(&second[..10]), "34007208d5b887185865");
    }

    #[test]
    fn test_secure_equals() {
        let backend = backend();
        assert!(backend.secure_equals(b"abc", b"abc"));
        assert!(!backend.secure_equals(b"abc", b"abd"));
        assert!(!backend.secure_equals(b"abc", b"ab"));
    }
}

#[cfg(test)]
mod ed25519_tests {
    use super::*;

    /// RFC 8032 §7.1 TEST 2.
    #[test]
    fn test_rfc8032_test2() {
        let backend = backend();
        let pair = sign::from_seed(Zeroizing::new(decode32(
            "4ccd089b28ff96da9db6c346ec114e0f5b8a319f35aba624da8cf6ed4fb8a6fb",
        )));
        assert_eq!(
            hex::encode(pair.public_key.as_bytes()),
            "3d4017c3e843895a92b70aa74d1b7ebc9c982ccf2ec4968cc0cd55f12af4660c"
        );

        let signature = backend.sign_ed25519(&pair.private_key, &[0x72]).unwrap();
        assert_eq!(
            hex::encode(signature),
            "92a009a9f0d4cab8720e820b5f642540a2b27b5416503f8fb3762223ebdb69da\
             085ac1e43e15996e458f3613d0f11d8c387b2eaeb4302aeeb00d291612bb0c00"
        );
        assert!(backend.verify_ed25519(pair.public_key.as_bytes(), &[0x72], &signature));
        assert!(!backend.verify_ed25519(pair.public_key.as_bytes(), &[0x73], &signature));
        assert!(!backend.verify_ed25519(pair.public_key.as_bytes(), &[0x72], &signature[..63]));
    }
}

#[cfg(test)]
mod aes_gcm_tests {
    use super::*;

    /// NIST GCM test case 13: zero key, zero IV, empty plaintext. A session
    /// nonce of zero maps to the all-zero IV.
    #[test]
    fn test_empty_plaintext_vector() {
        let key = Zeroizing::new([0u8; 32]);
        let out = backend().aes256_gcm_encrypt(&key, 0, &[], &[]).unwrap();
        assert_eq!(hex::encode(out), "530f8afbc74536b9a963b4f1c4cb738b");
    }

    #[test]
    fn test_nonce_and_aad_bound() {
        let backend = backend();
        let key = Zeroizing::new([0x11u8; 32]);
        let sealed = backend
            .aes256_gcm_encrypt(&key, 5, &[0, 5, 0xC0], b"payload")
            .unwrap();
        assert_eq!(sealed.len(), b"payload".len() + 16);

        assert_eq!(
            backend.aes256_gcm_decrypt(&key, 5, &[0, 5, 0xC0], &sealed).unwrap(),
            b"payload"
        );
        assert!(backend.aes256_gcm_decrypt(&key, 6, &[0, 5, 0xC0], &sealed).is_err());
        assert!(backend.aes256_gcm_decrypt(&key, 5, &[0, 5, 0x80], &sealed).is_err());
    }
}
