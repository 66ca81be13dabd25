//! Journal record and frame encoding.
//!
//! ```text
//! frame: len u32 LE | crc32 u32 LE | body (len bytes)
//! body:  op u8 | key_len u32 LE | key | [tag u8 | payload]   (op 1 = put, 2 = delete)
//! ```
//!
//! For encrypted journals the body is sealed before framing, so the CRC
//! covers the ciphertext.

use crate::error::{CoreError, CoreResult};
use minikv_codec::{PayloadDecoder, ValueType};

/// Bytes in a frame header.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Largest body a frame may declare. Anything bigger is treated as a torn
/// header.
pub const MAX_BODY_SIZE: usize = 512 * 1024 * 1024;

/// Record operation byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordOp {
    /// Store a value.
    Put = 1,
    /// Remove a key.
    Delete = 2,
}

impl RecordOp {
    /// Converts a byte to an operation.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Put),
            2 => Some(Self::Delete),
            _ => None,
        }
    }
}

/// A decoded journal record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// `key` now holds `payload` of `value_type`.
    Put {
        /// The key.
        key: String,
        /// Tag of the stored value.
        value_type: ValueType,
        /// Encoded payload.
        payload: Vec<u8>,
    },
    /// `key` no longer holds a value.
    Delete {
        /// The key.
        key: String,
    },
}

impl Record {
    /// Returns the record key.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Record::Put { key, .. } | Record::Delete { key } => key,
        }
    }

    /// Encodes the record body.
    pub fn encode_body(&self) -> CoreResult<Vec<u8>> {
        let key = self.key().as_bytes();
        let key_len = u32::try_from(key.len())
            .map_err(|_| CoreError::invalid_argument(format!("key of {} bytes is too long", key.len())))?;

        let mut buf = Vec::with_capacity(1 + 4 + key.len() + self.payload_len() + 1);
        match self {
            Record::Put {
                value_type,
                payload,
                ..
            } => {
                buf.push(RecordOp::Put as u8);
                buf.extend_from_slice(&key_len.to_le_bytes());
                buf.extend_from_slice(key);
                buf.push(value_type.tag());
                buf.extend_from_slice(payload);
            }
            Record::Delete { .. } => {
                buf.push(RecordOp::Delete as u8);
                buf.extend_from_slice(&key_len.to_le_bytes());
                buf.extend_from_slice(key);
            }
        }
        Ok(buf)
    }

    /// Decodes a record body. The payload is kept encoded.
    pub fn decode_body(body: &[u8]) -> CoreResult<Self> {
        let mut cursor = PayloadDecoder::new(body);
        let op = cursor.read_u8()?;
        let op = RecordOp::from_byte(op)
            .ok_or_else(|| CoreError::corrupted(format!("unknown record op {op}")))?;
        let key = cursor.read_prefixed()?;
        let key = std::str::from_utf8(key)
            .map_err(|_| CoreError::corrupted("record key is not UTF-8"))?
            .to_owned();

        match op {
            RecordOp::Put => {
                let tag = cursor.read_u8()?;
                let value_type = ValueType::from_tag(tag)
                    .ok_or_else(|| CoreError::corrupted(format!("unknown value tag {tag}")))?;
                Ok(Record::Put {
                    key,
                    value_type,
                    payload: cursor.remaining().to_vec(),
                })
            }
            RecordOp::Delete => {
                if !cursor.is_empty() {
                    return Err(CoreError::corrupted("trailing bytes after delete record"));
                }
                Ok(Record::Delete { key })
            }
        }
    }

    /// Splits the record into its key and, for puts, the tagged payload.
    #[must_use]
    pub fn into_parts(self) -> (String, Option<(ValueType, Vec<u8>)>) {
        match self {
            Record::Put {
                key,
                value_type,
                payload,
            } => (key, Some((value_type, payload))),
            Record::Delete { key } => (key, None),
        }
    }

    fn payload_len(&self) -> usize {
        match self {
            Record::Put { payload, .. } => payload.len(),
            Record::Delete { .. } => 0,
        }
    }
}

/// Wraps a body in a frame header.
pub fn encode_frame(body: &[u8]) -> CoreResult<Vec<u8>> {
    if body.len() > MAX_BODY_SIZE {
        return Err(CoreError::invalid_argument(format!(
            "record of {} bytes exceeds the {MAX_BODY_SIZE} byte limit",
            body.len()
        )));
    }
    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&compute_crc32(body).to_le_bytes());
    frame.extend_from_slice(body);
    Ok(frame)
}

/// Result of reading one frame from a byte buffer.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameRead<'a> {
    /// A whole frame with a valid checksum.
    Frame {
        /// The frame body.
        body: &'a [u8],
        /// Offset of the next frame.
        next: usize,
    },
    /// The buffer ends exactly at `offset`.
    End,
    /// The frame at `offset` is cut short or its header is implausible.
    Torn,
    /// The frame at `offset` is complete but its checksum does not match.
    BadChecksum {
        /// Checksum stored in the header.
        expected: u32,
        /// Checksum computed over the body.
        actual: u32,
    },
}

/// Reads the frame starting at `offset`.
pub fn read_frame(data: &[u8], offset: usize) -> FrameRead<'_> {
    let rest = &data[offset.min(data.len())..];
    if rest.is_empty() {
        return FrameRead::End;
    }
    if rest.len() < FRAME_HEADER_SIZE {
        return FrameRead::Torn;
    }
    let len = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
    let expected = u32::from_le_bytes([rest[4], rest[5], rest[6], rest[7]]);
    if len > MAX_BODY_SIZE || rest.len() - FRAME_HEADER_SIZE < len {
        return FrameRead::Torn;
    }
    let body = &rest[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + len];
    let actual = compute_crc32(body);
    if actual != expected {
        return FrameRead::BadChecksum { expected, actual };
    }
    FrameRead::Frame {
        body,
        next: offset + FRAME_HEADER_SIZE + len,
    }
}

/// CRC-32 (IEEE polynomial) over `data`.
#[must_use]
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ 0xEDB8_8320
                } else {
                    crc >> 1
                };
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        crc = (crc >> 8) ^ CRC32_TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize];
    }
    !crc
}
