//! Error types for the codec crate.

use crate::value::ValueType;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding or decoding a payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A payload could not be encoded.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// A string or array is too long for its `u32` length prefix.
    #[error("length {len} does not fit a u32 prefix")]
    LengthOverflow {
        /// Offending length.
        len: usize,
    },

    /// A payload could not be decoded.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// Payload ended before the value was complete.
    #[error("unexpected end of payload")]
    UnexpectedEof,

    /// Bytes remained after the value was decoded.
    #[error("{remaining} trailing bytes after {value_type} payload")]
    TrailingBytes {
        /// Type being decoded.
        value_type: ValueType,
        /// Number of unread bytes.
        remaining: usize,
    },

    /// A boolean byte other than 0 or 1.
    #[error("invalid boolean byte {0:#04x}")]
    InvalidBool(u8),

    /// A string payload that is not valid UTF-8.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// An array body whose byte length disagrees with its element width.
    #[error("array body of {body_len} bytes is not {count} elements of width {width}")]
    ArrayLength {
        /// Declared element count.
        count: u32,
        /// Element width in bytes.
        width: usize,
        /// Actual body length in bytes.
        body_len: usize,
    },

    /// An unknown value type tag.
    #[error("unknown value type tag {0}")]
    UnknownTag(u8),
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Returns true if this error was raised on the encode path.
    #[must_use]
    pub fn is_encode_error(&self) -> bool {
        matches!(self, Self::EncodingFailed { .. } | Self::LengthOverflow { .. })
    }
}
