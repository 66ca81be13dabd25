//! Payload decoder.

use crate::error::{CodecError, CodecResult};
use crate::value::{TypedValue, ValueType};

/// Decodes a payload of the given type.
///
/// The payload must be consumed exactly; trailing bytes are an error.
///
/// # Errors
///
/// Returns an error on truncation, trailing bytes, a boolean byte outside
/// `{0, 1}`, invalid UTF-8, or an array body that is not a whole number of
/// elements.
pub fn decode_payload(value_type: ValueType, bytes: &[u8]) -> CodecResult<TypedValue> {
    let mut decoder = PayloadDecoder::new(bytes);
    let value = decoder.decode(value_type)?;
    if !decoder.is_empty() {
        return Err(CodecError::TrailingBytes {
            value_type,
            remaining: decoder.remaining().len(),
        });
    }
    Ok(value)
}

/// A cursor over little-endian encoded bytes.
pub struct PayloadDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

/// Upper bound on a single string or array body.
const MAX_BODY_LENGTH: usize = 256 * 1024 * 1024;

impl<'a> PayloadDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Decode the next payload of `value_type`.
    pub fn decode(&mut self, value_type: ValueType) -> CodecResult<TypedValue> {
        let value = match value_type {
            ValueType::Bool => match self.read_u8()? {
                0 => TypedValue::Bool(false),
                1 => TypedValue::Bool(true),
                other => return Err(CodecError::InvalidBool(other)),
            },
            ValueType::I32 => TypedValue::I32(i32::from_le_bytes(self.read_array()?)),
            ValueType::I64 => TypedValue::I64(i64::from_le_bytes(self.read_array()?)),
            ValueType::F32 => TypedValue::F32(f32::from_bits(u32::from_le_bytes(self.read_array()?))),
            ValueType::F64 => TypedValue::F64(f64::from_bits(u64::from_le_bytes(self.read_array()?))),
            ValueType::Str => {
                let bytes = self.read_prefixed()?;
                let text = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
                TypedValue::Str(text.to_owned())
            }
            ValueType::ByteArray => TypedValue::ByteArray(self.read_prefixed()?.to_vec()),
            ValueType::I32Array => TypedValue::I32Array(
                self.read_elements::<4>()?
                    .map(i32::from_le_bytes)
                    .collect(),
            ),
            ValueType::I64Array => TypedValue::I64Array(
                self.read_elements::<8>()?
                    .map(i64::from_le_bytes)
                    .collect(),
            ),
            ValueType::F32Array => TypedValue::F32Array(
                self.read_elements::<4>()?
                    .map(|b| f32::from_bits(u32::from_le_bytes(b)))
                    .collect(),
            ),
            ValueType::F64Array => TypedValue::F64Array(
                self.read_elements::<8>()?
                    .map(|b| f64::from_bits(u64::from_le_bytes(b)))
                    .collect(),
            ),
        };
        Ok(value)
    }

    /// Check if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> CodecResult<u8> {
        let byte = *self.data.get(self.pos).ok_or(CodecError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read a little-endian `u32`.
    pub fn read_u32(&mut self) -> CodecResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read exactly `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(CodecError::UnexpectedEof)?;
        let bytes = self.data.get(self.pos..end).ok_or(CodecError::UnexpectedEof)?;
        self.pos = end;
        Ok(bytes)
    }

    /// Read a `u32` length followed by that many bytes.
    pub fn read_prefixed(&mut self) -> CodecResult<&'a [u8]> {
        let len = self.read_u32()? as usize;
        if len > MAX_BODY_LENGTH {
            return Err(CodecError::decoding_failed(format!(
                "length {len} exceeds limit {MAX_BODY_LENGTH}"
            )));
        }
        self.read_bytes(len)
    }

    fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn read_elements<const W: usize>(
        &mut self,
    ) -> CodecResult<impl Iterator<Item = [u8; W]> + 'a> {
        let count = self.read_u32()?;
        let body = self.remaining();
        let expected = (count as usize).checked_mul(W);
        if expected.is_none_or(|len| len > MAX_BODY_LENGTH || len > body.len()) {
            return Err(CodecError::ArrayLength {
                count,
                width: W,
                body_len: body.len(),
            });
        }
        let body = self.read_bytes(count as usize * W)?;
        Ok(body.chunks_exact(W).map(|chunk| {
            let mut out = [0u8; W];
            out.copy_from_slice(chunk);
            out
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode_payload;

    #[test]
    fn decode_bool_rejects_other_bytes() {
        assert_eq!(
            decode_payload(ValueType::Bool, &[1]).unwrap(),
            TypedValue::Bool(true)
        );
        assert_eq!(
            decode_payload(ValueType::Bool, &[2]),
            Err(CodecError::InvalidBool(2))
        );
    }

    #[test]
    fn decode_truncated_scalar() {
        assert_eq!(
            decode_payload(ValueType::I64, &[1, 2, 3]),
            Err(CodecError::UnexpectedEof)
        );
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        assert_eq!(
            decode_payload(ValueType::I32, &[0, 0, 0, 0, 9]),
            Err(CodecError::TrailingBytes {
                value_type: ValueType::I32,
                remaining: 1
            })
        );
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let mut bytes = 2u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0xc3, 0x28]);
        assert_eq!(
            decode_payload(ValueType::Str, &bytes),
            Err(CodecError::InvalidUtf8)
        );
    }

    #[test]
    fn decode_rejects_partial_array_element() {
        let mut bytes = 1u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[1, 2, 3]);
        assert!(matches!(
            decode_payload(ValueType::I32Array, &bytes),
            Err(CodecError::ArrayLength {
                count: 1,
                width: 4,
                body_len: 3
            })
        ));
    }

    #[test]
    fn decode_rejects_count_larger_than_body() {
        let mut bytes = 3u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0; 16]);
        assert!(matches!(
            decode_payload(ValueType::I64Array, &bytes),
            Err(CodecError::ArrayLength { count: 3, .. })
        ));
    }

    #[test]
    fn decode_preserves_nan_payload() {
        let nan = f64::from_bits(0x7ff8_0000_dead_beef);
        let bytes = encode_payload(&TypedValue::F64Array(vec![nan, -0.0])).unwrap();
        match decode_payload(ValueType::F64Array, &bytes).unwrap() {
            TypedValue::F64Array(values) => {
                assert_eq!(values[0].to_bits(), nan.to_bits());
                assert_eq!(values[1].to_bits(), (-0.0f64).to_bits());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cursor_reads_prefixed_fields() {
        let mut bytes = vec![7];
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(b"key");
        let mut decoder = PayloadDecoder::new(&bytes);
        assert_eq!(decoder.read_u8().unwrap(), 7);
        assert_eq!(decoder.read_prefixed().unwrap(), b"key");
        assert!(decoder.is_empty());
    }
}
