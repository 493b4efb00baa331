//! Authentication hashes and verification codes.
//!
//! The relying party sends the provider a digest of random bytes. The user's
//! device shows a four digit code derived from that digest, and the relying
//! party shows the same code so the user can check they are approving the
//! right request.

use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;
use sha2::{Digest, Sha256, Sha512};

/// Digest algorithm of an authentication hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashType {
    /// SHA-256 (Mobile-ID).
    Sha256,
    /// SHA-512 (Smart-ID).
    Sha512,
}

impl HashType {
    /// Returns the name used in provider requests.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }

    fn random_len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }
}

/// A digest sent to the provider for the user to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationHash {
    hash_type: HashType,
    digest: Vec<u8>,
}

impl AuthenticationHash {
    /// Hashes fresh random bytes with the given algorithm.
    #[must_use]
    pub fn generate(hash_type: HashType) -> Self {
        let mut random = vec![0u8; hash_type.random_len()];
        rand::thread_rng().fill_bytes(&mut random);
        Self::of(hash_type, &random)
    }

    /// Hashes the given bytes with the given algorithm.
    #[must_use]
    pub fn of(hash_type: HashType, data: &[u8]) -> Self {
        let digest = match hash_type {
            HashType::Sha256 => Sha256::digest(data).to_vec(),
            HashType::Sha512 => Sha512::digest(data).to_vec(),
        };
        Self { hash_type, digest }
    }

    /// Wraps an existing digest.
    #[must_use]
    pub fn from_digest(hash_type: HashType, digest: Vec<u8>) -> Self {
        Self { hash_type, digest }
    }

    /// Returns the digest algorithm.
    #[must_use]
    pub fn hash_type(&self) -> HashType {
        self.hash_type
    }

    /// Returns the raw digest.
    #[must_use]
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Returns the digest as standard base64.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.digest)
    }

    /// Smart-ID verification code: the last two bytes of SHA-256(digest) as a
    /// big-endian integer, modulo 10000.
    #[must_use]
    pub fn smart_id_verification_code(&self) -> String {
        let sha = Sha256::digest(&self.digest);
        let n = u16::from_be_bytes([sha[sha.len() - 2], sha[sha.len() - 1]]);
        format!("{:04}", n % 10000)
    }

    /// Mobile-ID verification code: the six leading bits of the first byte
    /// followed by the seven trailing bits of the last byte.
    #[must_use]
    pub fn mobile_id_verification_code(&self) -> String {
        let first = u16::from(self.digest.first().copied().unwrap_or_default());
        let last = u16::from(self.digest.last().copied().unwrap_or_default());
        format!("{:04}", ((first & 0xFC) << 5) | (last & 0x7F))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_lengths() {
        let h = AuthenticationHash::generate(HashType::Sha256);
        assert_eq!(h.digest().len(), 32);
        assert_eq!(h.hash_type().as_str(), "SHA256");

        let h = AuthenticationHash::generate(HashType::Sha512);
        assert_eq!(h.digest().len(), 64);
        assert_eq!(h.hash_type().as_str(), "SHA512");
    }

    #[test]
    fn test_generate_is_random() {
        let a = AuthenticationHash::generate(HashType::Sha512);
        let b = AuthenticationHash::generate(HashType::Sha512);
        assert_ne!(a, b);
    }

    #[test]
    fn test_smart_id_verification_code() {
        // SHA-256("") ends in 0xb855 = 47189
        let h = AuthenticationHash::from_digest(HashType::Sha512, Vec::new());
        assert_eq!(h.smart_id_verification_code(), "7189");

        // SHA-256("abc") ends in 0x15ad = 5549
        let h = AuthenticationHash::from_digest(HashType::Sha512, b"abc".to_vec());
        assert_eq!(h.smart_id_verification_code(), "5549");
    }

    #[test]
    fn test_mobile_id_verification_code() {
        let h = AuthenticationHash::from_digest(HashType::Sha256, vec![0xFF, 0x00, 0xFF]);
        assert_eq!(h.mobile_id_verification_code(), "8191");

        let h = AuthenticationHash::from_digest(HashType::Sha256, vec![0x03, 0x05]);
        assert_eq!(h.mobile_id_verification_code(), "0005");

        let h = AuthenticationHash::from_digest(HashType::Sha256, vec![0x04, 0x80]);
        assert_eq!(h.mobile_id_verification_code(), "0128");
    }

    #[test]
    fn test_codes_are_four_digits() {
        for _ in 0..32 {
            let h = AuthenticationHash::generate(HashType::Sha256);
            let code = h.mobile_id_verification_code();
            assert_eq!(code.len(), 4);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));

            let h = AuthenticationHash::generate(HashType::Sha512);
            let code = h.smart_id_verification_code();
            assert_eq!(code.len(), 4);
        }
    }

    #[test]
    fn test_base64() {
        let h = AuthenticationHash::from_digest(HashType::Sha256, b"hi".to_vec());
        assert_eq!(h.to_base64(), "aGk=");
    }
}
