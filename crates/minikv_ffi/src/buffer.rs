//! Result buffer allocation and release.
//!
//! Everything a [`RawBuffer`] points at is allocated here and released
//! here, by [`minikv_free_buffer`]. Release dispatches on the type token in
//! exactly one place, so a new token cannot be allocated without also being
//! freed.

use crate::types::{ByteSlice, InternalError, RawBuffer, RawTypedArray, TypeToken};
use minikv_codec::TypedValue;
use minikv_core::{CoreError, ErrorCode};
use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};

static OUTSTANDING: AtomicUsize = AtomicUsize::new(0);

impl ByteSlice {
    /// Moves a string into native-owned memory.
    pub fn from_string(string: String) -> Self {
        if string.is_empty() {
            return Self::empty();
        }
        let len = string.len();
        let boxed = Box::into_raw(string.into_boxed_str());
        Self {
            bytes: boxed.cast::<u8>().cast_const(),
            len,
        }
    }

    /// A zero-length slice with a null pointer.
    pub fn empty() -> Self {
        Self {
            bytes: std::ptr::null(),
            len: 0,
        }
    }

    /// Borrows a slice that stays owned by the caller.
    pub fn borrowed(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.as_ptr(),
            len: bytes.len(),
        }
    }

    /// Views the bytes.
    ///
    /// # Safety
    ///
    /// `bytes` must be null with `len == 0`, or point at `len` readable
    /// bytes that outlive the returned slice.
    pub unsafe fn as_bytes(&self) -> &[u8] {
        if self.bytes.is_null() || self.len == 0 {
            return &[];
        }
        std::slice::from_raw_parts(self.bytes, self.len)
    }

    /// Frees memory created by [`from_string`](Self::from_string).
    unsafe fn release(&self) {
        if self.bytes.is_null() || self.len == 0 {
            return;
        }
        let raw = std::ptr::slice_from_raw_parts_mut(self.bytes.cast_mut(), self.len);
        drop(Box::from_raw(raw));
    }
}

impl RawTypedArray {
    /// Moves a vector into native-owned memory.
    pub fn from_vec<T>(values: Vec<T>, type_token: TypeToken) -> Self {
        if values.is_empty() {
            return Self {
                array: std::ptr::null(),
                type_token,
                len: 0,
            };
        }
        let len = values.len();
        let boxed = Box::into_raw(values.into_boxed_slice());
        Self {
            array: boxed.cast::<c_void>().cast_const(),
            type_token,
            len,
        }
    }

    unsafe fn release(&self) {
        if self.array.is_null() || self.len == 0 {
            return;
        }
        match self.type_token {
            TypeToken::ByteArray => free_slice::<u8>(self.array, self.len),
            TypeToken::I32Array => free_slice::<i32>(self.array, self.len),
            TypeToken::I64Array => free_slice::<i64>(self.array, self.len),
            TypeToken::F32Array => free_slice::<f32>(self.array, self.len),
            TypeToken::F64Array => free_slice::<f64>(self.array, self.len),
            other => tracing::error!(token = ?other, "array with non-array token leaked"),
        }
    }
}

unsafe fn free_slice<T>(ptr: *const c_void, len: usize) {
    let raw = std::ptr::slice_from_raw_parts_mut(ptr.cast::<T>().cast_mut(), len);
    drop(Box::from_raw(raw));
}

fn boxed<T>(value: T) -> *const c_void {
    Box::into_raw(Box::new(value)).cast::<c_void>().cast_const()
}

impl InternalError {
    /// Creates an error with an optional reason.
    pub fn new(code: ErrorCode, reason: Option<String>) -> Self {
        Self {
            code: code.wire(),
            reason: reason.map_or(std::ptr::null(), |reason| {
                Box::into_raw(Box::new(ByteSlice::from_string(reason))).cast_const()
            }),
        }
    }

    unsafe fn release(&self) {
        if !self.reason.is_null() {
            let reason = Box::from_raw(self.reason.cast_mut());
            reason.release();
        }
    }
}

impl From<&CoreError> for InternalError {
    fn from(error: &CoreError) -> Self {
        InternalError::new(error.code(), Some(error.to_string()))
    }
}

impl RawBuffer {
    /// A successful buffer holding `value`.
    pub fn value(value: TypedValue) -> *const RawBuffer {
        let token = TypeToken::from(value.value_type());
        let raw_data = match value {
            TypedValue::Bool(v) => boxed(v),
            TypedValue::I32(v) => boxed(v),
            TypedValue::I64(v) => boxed(v),
            TypedValue::F32(v) => boxed(v),
            TypedValue::F64(v) => boxed(v),
            TypedValue::Str(v) => boxed(ByteSlice::from_string(v)),
            TypedValue::ByteArray(v) => boxed(RawTypedArray::from_vec(v, token)),
            TypedValue::I32Array(v) => boxed(RawTypedArray::from_vec(v, token)),
            TypedValue::I64Array(v) => boxed(RawTypedArray::from_vec(v, token)),
            TypedValue::F32Array(v) => boxed(RawTypedArray::from_vec(v, token)),
            TypedValue::F64Array(v) => boxed(RawTypedArray::from_vec(v, token)),
        };
        Self {
            raw_data,
            type_token: token,
            err: std::ptr::null(),
        }
        .leak()
    }

    /// A successful buffer without a payload.
    pub fn void() -> *const RawBuffer {
        Self {
            raw_data: std::ptr::null(),
            type_token: TypeToken::Void,
            err: std::ptr::null(),
        }
        .leak()
    }

    /// A failed buffer. `type_token` names what the call would have returned.
    pub fn error(type_token: TypeToken, error: InternalError) -> *const RawBuffer {
        Self {
            raw_data: std::ptr::null(),
            type_token,
            err: Box::into_raw(Box::new(error)).cast_const(),
        }
        .leak()
    }

    /// A failed buffer built from an engine error.
    pub fn core_error(type_token: TypeToken, error: &CoreError) -> *const RawBuffer {
        Self::error(type_token, InternalError::from(error))
    }

    /// Maps a unit result onto a `Void` or error buffer.
    pub fn from_unit(result: Result<(), CoreError>) -> *const RawBuffer {
        match result {
            Ok(()) => Self::void(),
            Err(e) => Self::core_error(TypeToken::Void, &e),
        }
    }

    fn leak(self) -> *const RawBuffer {
        OUTSTANDING.fetch_add(1, Ordering::Relaxed);
        Box::into_raw(Box::new(self)).cast_const()
    }

    unsafe fn release_payload(&self) {
        if self.raw_data.is_null() {
            return;
        }
        let data = self.raw_data.cast_mut();
        match self.type_token {
            TypeToken::I32 => drop(Box::from_raw(data.cast::<i32>())),
            TypeToken::Bool => drop(Box::from_raw(data.cast::<bool>())),
            TypeToken::I64 => drop(Box::from_raw(data.cast::<i64>())),
            TypeToken::F32 => drop(Box::from_raw(data.cast::<f32>())),
            TypeToken::F64 => drop(Box::from_raw(data.cast::<f64>())),
            TypeToken::Str => {
                let slice = Box::from_raw(data.cast::<ByteSlice>());
                slice.release();
            }
            TypeToken::ByteArray
            | TypeToken::I32Array
            | TypeToken::I64Array
            | TypeToken::F32Array
            | TypeToken::F64Array => {
                let array = Box::from_raw(data.cast::<RawTypedArray>());
                array.release();
            }
            TypeToken::Void => tracing::error!("void buffer carried a payload; leaked"),
        }
    }
}

/// Number of result buffers handed out and not yet released.
#[no_mangle]
pub extern "C" fn minikv_outstanding_buffers() -> usize {
    OUTSTANDING.load(Ordering::Relaxed)
}

/// Releases a result buffer and everything it points at.
///
/// Null is ignored.
///
/// # Safety
///
/// `buffer` must have been returned by a minikv accessor and not released
/// before. Releasing the same buffer twice is undefined behavior.
#[no_mangle]
pub unsafe extern "C" fn minikv_free_buffer(buffer: *const RawBuffer) {
    if buffer.is_null() {
        return;
    }
    let buffer = Box::from_raw(buffer.cast_mut());
    buffer.release_payload();
    if !buffer.err.is_null() {
        let err = Box::from_raw(buffer.err.cast_mut());
        err.release();
    }
    drop(buffer);
    OUTSTANDING.fetch_sub(1, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn payload<T: Copy>(buffer: *const RawBuffer) -> T {
        *(*buffer).raw_data.cast::<T>()
    }

    #[test]
    fn scalar_buffers() {
        let buffer = RawBuffer::value(TypedValue::I64(i64::MIN));
        unsafe {
            assert_eq!((*buffer).type_token, TypeToken::I64);
            assert!((*buffer).err.is_null());
            assert_eq!(payload::<i64>(buffer), i64::MIN);
            minikv_free_buffer(buffer);
        }
    }

    #[test]
    fn string_buffer_is_byte_slice() {
        let buffer = RawBuffer::value(TypedValue::Str("héllo".into()));
        unsafe {
            let slice = &*(*buffer).raw_data.cast::<ByteSlice>();
            assert_eq!(slice.as_bytes(), "héllo".as_bytes());
            minikv_free_buffer(buffer);
        }
    }

    #[test]
    fn empty_string_and_array_use_null_pointers() {
        let text = RawBuffer::value(TypedValue::Str(String::new()));
        let array = RawBuffer::value(TypedValue::F32Array(Vec::new()));
        unsafe {
            let slice = &*(*text).raw_data.cast::<ByteSlice>();
            assert!(slice.bytes.is_null());
            assert_eq!(slice.len, 0);
            let typed = &*(*array).raw_data.cast::<RawTypedArray>();
            assert!(typed.array.is_null());
            assert_eq!(typed.len, 0);
            assert_eq!(typed.type_token, TypeToken::F32Array);
            minikv_free_buffer(text);
            minikv_free_buffer(array);
        }
    }

    #[test]
    fn array_length_counts_elements() {
        let buffer = RawBuffer::value(TypedValue::I64Array(vec![1, 2, 3]));
        unsafe {
            let typed = &*(*buffer).raw_data.cast::<RawTypedArray>();
            assert_eq!(typed.len, 3);
            let values = std::slice::from_raw_parts(typed.array.cast::<i64>(), typed.len);
            assert_eq!(values, [1, 2, 3]);
            minikv_free_buffer(buffer);
        }
    }

    #[test]
    fn error_buffer_has_no_payload() {
        let buffer = RawBuffer::core_error(TypeToken::Str, &CoreError::key_not_found("k"));
        unsafe {
            assert!((*buffer).raw_data.is_null());
            assert_eq!((*buffer).type_token, TypeToken::Str);
            let err = &*(*buffer).err;
            assert_eq!(err.code, ErrorCode::KeyNotFound.wire());
            assert_eq!((*err.reason).as_bytes(), b"key not found: k");
            minikv_free_buffer(buffer);
        }
    }

    #[test]
    fn void_buffer() {
        let buffer = RawBuffer::from_unit(Ok(()));
        unsafe {
            assert_eq!((*buffer).type_token, TypeToken::Void);
            assert!((*buffer).raw_data.is_null());
            assert!((*buffer).err.is_null());
            minikv_free_buffer(buffer);
        }
    }

    #[test]
    fn free_null_is_ignored() {
        unsafe { minikv_free_buffer(std::ptr::null()) };
    }
}
