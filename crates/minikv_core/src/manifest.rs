//! Directory manifest.
//!
//! A small CBOR document next to the journal. It records the journal format
//! version and, for encrypted directories, the HKDF salt and the derived-key
//! fingerprint.

use crate::crypto::{RecordCipher, SALT_SIZE};
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Identifies a minikv manifest.
pub const MANIFEST_FORMAT: &str = "minikv";

/// Current journal format version.
pub const FORMAT_VERSION: u16 = 1;

/// Directory metadata persisted in `minikv.manifest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Always [`MANIFEST_FORMAT`].
    pub format: String,
    /// Journal format version.
    pub version: u16,
    /// Present when the journal is encrypted.
    pub encryption: Option<EncryptionInfo>,
    /// Number of completed compactions.
    pub compactions: u64,
}

/// Key derivation parameters of an encrypted directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionInfo {
    /// HKDF salt.
    pub salt: Vec<u8>,
    /// SHA-256 fingerprint of the derived record key.
    pub fingerprint: Vec<u8>,
}

impl Manifest {
    /// Creates a manifest for a plaintext directory.
    #[must_use]
    pub fn plaintext() -> Self {
        Self {
            format: MANIFEST_FORMAT.to_owned(),
            version: FORMAT_VERSION,
            encryption: None,
            compactions: 0,
        }
    }

    /// Creates a manifest for an encrypted directory.
    #[must_use]
    pub fn encrypted(salt: [u8; SALT_SIZE], cipher: &RecordCipher) -> Self {
        Self {
            encryption: Some(EncryptionInfo {
                salt: salt.to_vec(),
                fingerprint: cipher.fingerprint().to_vec(),
            }),
            ..Self::plaintext()
        }
    }

    /// Returns true if the journal is encrypted.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_some()
    }

    /// Checks that `cipher` was derived from the key this directory was
    /// created with.
    pub fn verify_cipher(&self, cipher: &RecordCipher) -> CoreResult<()> {
        match &self.encryption {
            Some(info) if info.fingerprint == cipher.fingerprint() => Ok(()),
            Some(_) => Err(CoreError::key_mismatch(
                "key does not match the one this directory was created with",
            )),
            None => Err(CoreError::key_mismatch("directory is not encrypted")),
        }
    }

    /// Encodes the manifest as CBOR.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CoreError::invalid_argument(format!("manifest encoding failed: {e}")))?;
        Ok(buf)
    }

    /// Decodes and validates a manifest.
    pub fn decode(data: &[u8]) -> CoreResult<Self> {
        let manifest: Self = ciborium::from_reader(data)
            .map_err(|e| CoreError::corrupted(format!("manifest is not valid CBOR: {e}")))?;
        if manifest.format != MANIFEST_FORMAT {
            return Err(CoreError::corrupted(format!(
                "unexpected manifest format {:?}",
                manifest.format
            )));
        }
        if manifest.version != FORMAT_VERSION {
            return Err(CoreError::corrupted(format!(
                "unsupported journal format version {}",
                manifest.version
            )));
        }
        if let Some(info) = &manifest.encryption {
            if info.salt.len() != SALT_SIZE {
                return Err(CoreError::corrupted("manifest salt has wrong length"));
            }
        }
        Ok(manifest)
    }
}
