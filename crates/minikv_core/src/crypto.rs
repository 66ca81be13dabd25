//! Encryption at rest for journal records.
//!
//! The host supplies a 16-byte key as 32 hex characters. The record cipher
//! is AES-256-GCM under a key derived with HKDF-SHA256 from that key and
//! the per-directory salt stored in the manifest. Each sealed record is
//! `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
//!
//! The manifest also stores a fingerprint of the derived key, so opening a
//! directory with the wrong key fails up front instead of silently skipping
//! every record.

use crate::error::{CoreError, CoreResult};
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of the host-supplied key in bytes.
pub const KEY_SIZE: usize = 16;
/// Size of the per-directory HKDF salt in bytes.
pub const SALT_SIZE: usize = 16;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

const CIPHER_KEY_SIZE: usize = 32;
const CIPHER_KEY_INFO: &[u8] = b"minikv-journal-key-v1";
const FINGERPRINT_DOMAIN: &[u8] = b"minikv-key-fingerprint-v1";

/// The host-supplied encryption key.
///
/// Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Parses a key from 32 hex characters.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if the string is not hex or
    /// does not decode to exactly 16 bytes.
    pub fn from_hex(hex_key: &str) -> CoreResult<Self> {
        let decoded = Zeroizing::new(
            hex::decode(hex_key.trim())
                .map_err(|e| CoreError::invalid_argument(format!("encryption key is not hex: {e}")))?,
        );
        Self::from_bytes(&decoded)
    }

    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not exactly 16 bytes.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CoreError::invalid_argument(format!(
                "encryption key must be {KEY_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self { bytes: key })
    }

    /// Generates a random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Returns the key as lowercase hex.
    #[must_use]
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.bytes))
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generates a fresh per-directory salt.
#[must_use]
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Seals and opens journal record bodies.
pub struct RecordCipher {
    cipher: Aes256Gcm,
    fingerprint: [u8; 32],
}

impl RecordCipher {
    /// Derives the record cipher for a directory.
    pub fn new(key: &EncryptionKey, salt: &[u8]) -> CoreResult<Self> {
        let hk = Hkdf::<Sha256>::new(Some(salt), &key.bytes);
        let mut derived = Zeroizing::new([0u8; CIPHER_KEY_SIZE]);
        hk.expand(CIPHER_KEY_INFO, &mut derived[..])
            .map_err(|_| CoreError::encryption_failed("HKDF expand failed"))?;

        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_DOMAIN);
        hasher.update(&derived[..]);
        let fingerprint: [u8; 32] = hasher.finalize().into();

        let cipher = Aes256Gcm::new(GenericArray::from_slice(&derived[..]));
        Ok(Self {
            cipher,
            fingerprint,
        })
    }

    /// Fingerprint of the derived key, stored in the manifest.
    #[must_use]
    pub fn fingerprint(&self) -> [u8; 32] {
        self.fingerprint
    }

    /// Encrypts a record body under a fresh random nonce.
    pub fn seal(&self, plaintext: &[u8]) -> CoreResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| CoreError::encryption_failed("AES-GCM encryption error"))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend(ciphertext);
        Ok(sealed)
    }

    /// Decrypts a body produced by [`seal`](Self::seal).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DecryptionFailed`] on truncation or an
    /// authentication failure.
    pub fn open(&self, sealed: &[u8]) -> CoreResult<Vec<u8>> {
        if sealed.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CoreError::decryption_failed("sealed record too short"));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CoreError::decryption_failed("authentication tag mismatch"))
    }
}

impl std::fmt::Debug for RecordCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCipher")
            .field("fingerprint", &hex::encode(&self.fingerprint[..4]))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_HEX: &str = "88C51C536176AD8A8EE4A06F62EE897E";

    #[test]
    fn parses_32_hex_chars() {
        let key = EncryptionKey::from_hex(KEY_HEX).unwrap();
        assert_eq!(key.to_hex().as_str(), KEY_HEX.to_lowercase());
    }

    #[test]
    fn rejects_wrong_length_and_non_hex() {
        assert!(matches!(
            EncryptionKey::from_hex("abcd"),
            Err(CoreError::InvalidArgument { .. })
        ));
        assert!(matches!(
            EncryptionKey::from_hex("zz"),
            Err(CoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn seal_open_roundtrip() {
        let key = EncryptionKey::from_hex(KEY_HEX).unwrap();
        let cipher = RecordCipher::new(&key, &generate_salt()).unwrap();
        let sealed = cipher.seal(b"record body").unwrap();
        assert_eq!(sealed.len(), NONCE_SIZE + 11 + TAG_SIZE);
        assert_eq!(cipher.open(&sealed).unwrap(), b"record body");
    }

    #[test]
    fn nonces_differ_between_seals() {
        let cipher = RecordCipher::new(&EncryptionKey::generate(), &[0; SALT_SIZE]).unwrap();
        let a = cipher.seal(b"same").unwrap();
        let b = cipher.seal(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails_to_open_and_fingerprints_differ() {
        let salt = generate_salt();
        let right = RecordCipher::new(&EncryptionKey::generate(), &salt).unwrap();
        let wrong = RecordCipher::new(&EncryptionKey::generate(), &salt).unwrap();
        let sealed = right.seal(b"secret").unwrap();
        assert!(matches!(
            wrong.open(&sealed),
            Err(CoreError::DecryptionFailed { .. })
        ));
        assert_ne!(right.fingerprint(), wrong.fingerprint());
    }

    #[test]
    fn salt_changes_fingerprint() {
        let key = EncryptionKey::generate();
        let a = RecordCipher::new(&key, &[1; SALT_SIZE]).unwrap();
        let b = RecordCipher::new(&key, &[2; SALT_SIZE]).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn tampered_record_is_rejected() {
        let cipher = RecordCipher::new(&EncryptionKey::generate(), &generate_salt()).unwrap();
        let mut sealed = cipher.seal(b"payload").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(cipher.open(&sealed).is_err());
    }

    #[test]
    fn debug_redacts_key() {
        let key = EncryptionKey::from_hex(KEY_HEX).unwrap();
        assert!(!format!("{key:?}").to_lowercase().contains("88c5"));
    }
}
