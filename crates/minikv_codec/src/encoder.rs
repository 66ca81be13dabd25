//! Payload encoder.
//!
//! Layout per type, all little-endian:
//!
//! | Type | Payload |
//! |------|---------|
//! | `Bool` | one byte, 0 or 1 |
//! | `I32`, `F32` | 4 bytes (`to_bits` for floats) |
//! | `I64`, `F64` | 8 bytes (`to_bits` for floats) |
//! | `Str`, `ByteArray` | `u32` byte length, then the bytes |
//! | numeric arrays | `u32` element count, then the elements |

use crate::error::{CodecError, CodecResult};
use crate::value::TypedValue;

/// Encodes a value's payload. The type tag is not included.
///
/// # Errors
///
/// Returns [`CodecError::LengthOverflow`] if a string or array is longer
/// than `u32::MAX` elements.
pub fn encode_payload(value: &TypedValue) -> CodecResult<Vec<u8>> {
    let mut encoder = PayloadEncoder::with_capacity(encoded_len_hint(value));
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}

fn encoded_len_hint(value: &TypedValue) -> usize {
    match value {
        TypedValue::Bool(_) => 1,
        TypedValue::I32(_) | TypedValue::F32(_) => 4,
        TypedValue::I64(_) | TypedValue::F64(_) => 8,
        TypedValue::Str(s) => 4 + s.len(),
        TypedValue::ByteArray(b) => 4 + b.len(),
        TypedValue::I32Array(a) => 4 + a.len() * 4,
        TypedValue::F32Array(a) => 4 + a.len() * 4,
        TypedValue::I64Array(a) => 4 + a.len() * 8,
        TypedValue::F64Array(a) => 4 + a.len() * 8,
    }
}

/// Appends payloads to a growing buffer.
#[derive(Debug, Default)]
pub struct PayloadEncoder {
    buffer: Vec<u8>,
}

impl PayloadEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new encoder with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Encode a value's payload.
    pub fn encode(&mut self, value: &TypedValue) -> CodecResult<()> {
        match value {
            TypedValue::Bool(b) => self.buffer.push(u8::from(*b)),
            TypedValue::I32(n) => self.buffer.extend_from_slice(&n.to_le_bytes()),
            TypedValue::I64(n) => self.buffer.extend_from_slice(&n.to_le_bytes()),
            TypedValue::F32(n) => self.buffer.extend_from_slice(&n.to_bits().to_le_bytes()),
            TypedValue::F64(n) => self.buffer.extend_from_slice(&n.to_bits().to_le_bytes()),
            TypedValue::Str(s) => self.encode_bytes(s.as_bytes())?,
            TypedValue::ByteArray(b) => self.encode_bytes(b)?,
            TypedValue::I32Array(a) => {
                self.encode_len(a.len())?;
                for n in a {
                    self.buffer.extend_from_slice(&n.to_le_bytes());
                }
            }
            TypedValue::I64Array(a) => {
                self.encode_len(a.len())?;
                for n in a {
                    self.buffer.extend_from_slice(&n.to_le_bytes());
                }
            }
            TypedValue::F32Array(a) => {
                self.encode_len(a.len())?;
                for n in a {
                    self.buffer.extend_from_slice(&n.to_bits().to_le_bytes());
                }
            }
            TypedValue::F64Array(a) => {
                self.encode_len(a.len())?;
                for n in a {
                    self.buffer.extend_from_slice(&n.to_bits().to_le_bytes());
                }
            }
        }
        Ok(())
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get a reference to the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    fn encode_len(&mut self, len: usize) -> CodecResult<()> {
        let len = u32::try_from(len).map_err(|_| CodecError::LengthOverflow { len })?;
        self.buffer.extend_from_slice(&len.to_le_bytes());
        Ok(())
    }

    fn encode_bytes(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.encode_len(bytes.len())?;
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }
}
