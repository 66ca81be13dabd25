//! Error types for the minikv engine.

use minikv_codec::ValueType;
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// The closed set of error kinds that cross the C ABI.
///
/// Wire values are fixed; hosts switch on them.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The key has no value.
    KeyNotFound = 0,
    /// Stored bytes could not be decoded as the stored type.
    DecodeFailed = 1,
    /// The key holds a value of another type.
    TypeMismatch = 2,
    /// Persisted data failed an integrity check, or a result could not be
    /// interpreted.
    DataInvalid = 3,
    /// The instance is not open.
    InstanceClosed = 4,
    /// A value or key could not be encoded or persisted.
    EncodeFailed = 5,
}

impl ErrorCode {
    /// Every code in wire order.
    pub const ALL: [ErrorCode; 6] = [
        ErrorCode::KeyNotFound,
        ErrorCode::DecodeFailed,
        ErrorCode::TypeMismatch,
        ErrorCode::DataInvalid,
        ErrorCode::InstanceClosed,
        ErrorCode::EncodeFailed,
    ];

    /// Parses a wire value.
    #[must_use]
    pub fn from_wire(code: i32) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    /// Returns the wire value.
    #[must_use]
    pub const fn wire(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::KeyNotFound => "key not found",
            ErrorCode::DecodeFailed => "decode failed",
            ErrorCode::TypeMismatch => "type mismatch",
            ErrorCode::DataInvalid => "data invalid",
            ErrorCode::InstanceClosed => "instance closed",
            ErrorCode::EncodeFailed => "encode failed",
        };
        f.write_str(name)
    }
}

/// Errors raised by the engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] minikv_storage::StorageError),

    /// Payload codec error.
    #[error("codec error: {0}")]
    Codec(#[from] minikv_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The key has no value.
    #[error("key not found: {key}")]
    KeyNotFound {
        /// The requested key.
        key: String,
    },

    /// The key holds a value of a different type.
    #[error("type mismatch for {key}: expected {expected}, found {found}")]
    TypeMismatch {
        /// The requested key.
        key: String,
        /// Type the caller asked for.
        expected: ValueType,
        /// Type actually stored.
        found: ValueType,
    },

    /// A caller-supplied argument was unusable.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// Persisted data is structurally invalid.
    #[error("data corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Checksum mismatch detected.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Expected checksum.
        expected: u32,
        /// Actual checksum.
        actual: u32,
    },

    /// Encryption failed.
    #[error("encryption failed: {message}")]
    EncryptionFailed {
        /// Description of the failure.
        message: String,
    },

    /// Decryption failed.
    #[error("decryption failed: {message}")]
    DecryptionFailed {
        /// Description of the failure.
        message: String,
    },

    /// The supplied key does not match the one the directory was created with.
    #[error("encryption key mismatch: {message}")]
    KeyMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// Another store holds the directory lock.
    #[error("directory locked: {path}")]
    DirectoryLocked {
        /// The locked directory.
        path: String,
    },

    /// The instance is not open.
    #[error("instance closed")]
    InstanceClosed,
}

impl CoreError {
    /// Creates a key-not-found error.
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Creates an encryption failed error.
    pub fn encryption_failed(message: impl Into<String>) -> Self {
        Self::EncryptionFailed {
            message: message.into(),
        }
    }

    /// Creates a decryption failed error.
    pub fn decryption_failed(message: impl Into<String>) -> Self {
        Self::DecryptionFailed {
            message: message.into(),
        }
    }

    /// Creates a key mismatch error.
    pub fn key_mismatch(message: impl Into<String>) -> Self {
        Self::KeyMismatch {
            message: message.into(),
        }
    }

    /// Maps this error onto the closed wire taxonomy.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::KeyNotFound { .. } => ErrorCode::KeyNotFound,
            Self::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            Self::InstanceClosed => ErrorCode::InstanceClosed,
            Self::Codec(e) if e.is_encode_error() => ErrorCode::EncodeFailed,
            Self::Codec(_) => ErrorCode::DecodeFailed,
            Self::InvalidArgument { .. }
            | Self::EncryptionFailed { .. }
            | Self::Io(_)
            | Self::Storage(_) => ErrorCode::EncodeFailed,
            Self::Corrupted { .. }
            | Self::ChecksumMismatch { .. }
            | Self::DecryptionFailed { .. }
            | Self::KeyMismatch { .. }
            | Self::DirectoryLocked { .. } => ErrorCode::DataInvalid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minikv_codec::CodecError;

    #[test]
    fn wire_values_are_fixed() {
        assert_eq!(ErrorCode::KeyNotFound.wire(), 0);
        assert_eq!(ErrorCode::DecodeFailed.wire(), 1);
        assert_eq!(ErrorCode::TypeMismatch.wire(), 2);
        assert_eq!(ErrorCode::DataInvalid.wire(), 3);
        assert_eq!(ErrorCode::InstanceClosed.wire(), 4);
        assert_eq!(ErrorCode::EncodeFailed.wire(), 5);
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::from_wire(code.wire()), Some(code));
        }
        assert_eq!(ErrorCode::from_wire(6), None);
        assert_eq!(ErrorCode::from_wire(-1), None);
    }

    #[test]
    fn codec_errors_split_by_direction() {
        assert_eq!(
            CoreError::from(CodecError::InvalidUtf8).code(),
            ErrorCode::DecodeFailed
        );
        assert_eq!(
            CoreError::from(CodecError::LengthOverflow { len: 0 }).code(),
            ErrorCode::EncodeFailed
        );
    }

    #[test]
    fn integrity_errors_are_data_invalid() {
        assert_eq!(
            CoreError::ChecksumMismatch {
                expected: 1,
                actual: 2
            }
            .code(),
            ErrorCode::DataInvalid
        );
        assert_eq!(
            CoreError::decryption_failed("tag").code(),
            ErrorCode::DataInvalid
        );
    }

    #[test]
    fn display_is_short_for_lookup_errors() {
        assert_eq!(
            CoreError::key_not_found("a").to_string(),
            "key not found: a"
        );
        let mismatch = CoreError::TypeMismatch {
            key: "a".into(),
            expected: ValueType::I32,
            found: ValueType::Str,
        };
        assert_eq!(mismatch.code(), ErrorCode::TypeMismatch);
        assert_eq!(
            mismatch.to_string(),
            "type mismatch for a: expected i32, found str"
        );
    }
}
