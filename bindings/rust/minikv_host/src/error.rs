//! Host-side errors.

use minikv_core::ErrorCode;
use thiserror::Error;

/// Result type for accessor calls.
pub type KvResult<T> = Result<T, KvError>;

/// An accessor failure, as reported by the native side.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {reason}")]
pub struct KvError {
    /// Error class.
    pub code: ErrorCode,
    /// Human-readable reason.
    pub reason: String,
}

impl KvError {
    /// Creates an error.
    pub fn new(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Returns true for [`ErrorCode::KeyNotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::KeyNotFound
    }
}

/// Opening or initializing an instance failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InitError {
    /// The path or key could not be passed to the native side.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The native side refused to open the directory.
    #[error("open failed: {0}")]
    Failed(String),
}
