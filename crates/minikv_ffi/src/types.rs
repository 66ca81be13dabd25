//! C-layout types shared with hosts.
//!
//! Every struct here is `#[repr(C)]` and mirrored field for field by the
//! host bindings. Field order and enum discriminants are part of the ABI.

use minikv_codec::ValueType;
use std::ffi::c_void;

/// An opaque instance handle.
///
/// Points at a lifecycle-managed store. Never dereference or modify
/// directly.
#[repr(C)]
pub struct KvInstance {
    _private: [u8; 0],
}

/// Tag describing what a [`RawBuffer`] payload points at.
///
/// Discriminants 0 to 10 match the on-disk value tags.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeToken {
    /// `*const i32`.
    I32 = 0,
    /// `*const ByteSlice`.
    Str = 1,
    /// `*const bool`.
    Bool = 2,
    /// `*const i64`.
    I64 = 3,
    /// `*const f32`.
    F32 = 4,
    /// `*const f64`.
    F64 = 5,
    /// `*const RawTypedArray` of `u8`.
    ByteArray = 6,
    /// `*const RawTypedArray` of `i32`.
    I32Array = 7,
    /// `*const RawTypedArray` of `i64`.
    I64Array = 8,
    /// `*const RawTypedArray` of `f32`.
    F32Array = 9,
    /// `*const RawTypedArray` of `f64`.
    F64Array = 10,
    /// No payload; `raw_data` is null.
    Void = 11,
}

impl From<ValueType> for TypeToken {
    fn from(value_type: ValueType) -> Self {
        match value_type {
            ValueType::I32 => TypeToken::I32,
            ValueType::Str => TypeToken::Str,
            ValueType::Bool => TypeToken::Bool,
            ValueType::I64 => TypeToken::I64,
            ValueType::F32 => TypeToken::F32,
            ValueType::F64 => TypeToken::F64,
            ValueType::ByteArray => TypeToken::ByteArray,
            ValueType::I32Array => TypeToken::I32Array,
            ValueType::I64Array => TypeToken::I64Array,
            ValueType::F32Array => TypeToken::F32Array,
            ValueType::F64Array => TypeToken::F64Array,
        }
    }
}

impl TypeToken {
    /// Returns true for tokens whose payload is a [`RawTypedArray`].
    pub fn is_array(self) -> bool {
        matches!(
            self,
            TypeToken::ByteArray
                | TypeToken::I32Array
                | TypeToken::I64Array
                | TypeToken::F32Array
                | TypeToken::F64Array
        )
    }
}

/// A borrowed or native-owned run of UTF-8 bytes. Not NUL-terminated.
#[repr(C)]
#[derive(Debug)]
pub struct ByteSlice {
    /// First byte, or null when `len == 0`.
    pub bytes: *const u8,
    /// Length in bytes.
    pub len: usize,
}

/// A native-owned array.
#[repr(C)]
#[derive(Debug)]
pub struct RawTypedArray {
    /// First element, or null when `len == 0`.
    pub array: *const c_void,
    /// Element type; always an array token.
    pub type_token: TypeToken,
    /// Number of elements, not bytes.
    pub len: usize,
}

/// Error half of a result buffer.
#[repr(C)]
#[derive(Debug)]
pub struct InternalError {
    /// [`minikv_core::ErrorCode`] wire value.
    pub code: i32,
    /// Human-readable reason, or null.
    pub reason: *const ByteSlice,
}

/// The tagged result every accessor returns.
///
/// Exactly one of `raw_data` and `err` is non-null, except for a `Void`
/// success where both are null. Released with `minikv_free_buffer`.
#[repr(C)]
#[derive(Debug)]
pub struct RawBuffer {
    /// Payload, shaped by `type_token`.
    pub raw_data: *const c_void,
    /// Payload type.
    pub type_token: TypeToken,
    /// Error, or null on success.
    pub err: *const InternalError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_match_value_tags() {
        for value_type in ValueType::ALL {
            assert_eq!(TypeToken::from(value_type) as i32, i32::from(value_type.tag()));
        }
        assert_eq!(TypeToken::Void as i32, 11);
    }

    #[test]
    fn array_tokens() {
        assert!(TypeToken::F64Array.is_array());
        assert!(TypeToken::ByteArray.is_array());
        assert!(!TypeToken::Str.is_array());
        assert!(!TypeToken::Void.is_array());
    }
}
