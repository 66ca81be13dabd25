//! Scoped release of result buffers.
//!
//! Every buffer the native side returns is wrapped in a [`ResultGuard`]
//! before anything reads it. The guard frees the buffer when it goes out of
//! scope, including on early returns, so each buffer is released exactly
//! once.

use crate::error::{KvError, KvResult};
use minikv_core::ErrorCode;
use minikv_ffi::{minikv_free_buffer, ByteSlice, RawBuffer, RawTypedArray, TypeToken};
use std::ffi::c_void;
use std::ptr::NonNull;

pub(crate) struct ResultGuard(NonNull<RawBuffer>);

impl ResultGuard {
    pub(crate) fn new(buffer: *const RawBuffer) -> KvResult<Self> {
        NonNull::new(buffer.cast_mut())
            .map(Self)
            .ok_or_else(|| KvError::new(ErrorCode::DataInvalid, "native call returned no buffer"))
    }

    fn buffer(&self) -> &RawBuffer {
        // SAFETY: the pointer came from a minikv accessor and is released
        // only in `drop`.
        unsafe { self.0.as_ref() }
    }

    fn check(&self) -> KvResult<()> {
        let buffer = self.buffer();
        if buffer.err.is_null() {
            return Ok(());
        }
        // SAFETY: a non-null `err` points at an `InternalError` owned by the
        // buffer.
        let err = unsafe { &*buffer.err };
        let reason = if err.reason.is_null() {
            None
        } else {
            // SAFETY: the reason slice is owned by the buffer.
            Some(String::from_utf8_lossy(unsafe { (*err.reason).as_bytes() }).into_owned())
        };
        Err(match ErrorCode::from_wire(err.code) {
            Some(code) => KvError::new(code, reason.unwrap_or_else(|| code.to_string())),
            None => KvError::new(
                ErrorCode::DataInvalid,
                format!("unknown error code {}", err.code),
            ),
        })
    }

    /// Maps a `Void` buffer to `()`.
    pub(crate) fn into_unit(self) -> KvResult<()> {
        self.check()
    }

    /// Reads the payload as `T`, refusing any other token.
    pub(crate) fn decode<T: FromPayload>(self) -> KvResult<T> {
        self.check()?;
        let buffer = self.buffer();
        if buffer.type_token != T::TOKEN {
            return Err(KvError::new(
                ErrorCode::TypeMismatch,
                format!("buffer holds {:?}, expected {:?}", buffer.type_token, T::TOKEN),
            ));
        }
        if buffer.raw_data.is_null() {
            return Err(KvError::new(ErrorCode::DataInvalid, "successful buffer without payload"));
        }
        // SAFETY: the token matched, so `raw_data` points at a `T` payload.
        unsafe { T::read(buffer.raw_data) }
    }
}

impl Drop for ResultGuard {
    fn drop(&mut self) {
        // SAFETY: the guard is the only owner and drops once.
        unsafe { minikv_free_buffer(self.0.as_ptr()) };
    }
}

/// A Rust type a result payload can be copied into.
pub(crate) trait FromPayload: Sized {
    const TOKEN: TypeToken;

    /// Copies the payload out.
    ///
    /// # Safety
    ///
    /// `raw` must point at a live payload shaped by `TOKEN`.
    unsafe fn read(raw: *const c_void) -> KvResult<Self>;
}

macro_rules! scalar_payload {
    ($($ty:ty => $token:ident;)+) => {
        $(
            impl FromPayload for $ty {
                const TOKEN: TypeToken = TypeToken::$token;

                unsafe fn read(raw: *const c_void) -> KvResult<Self> {
                    Ok(*raw.cast::<$ty>())
                }
            }
        )+
    };
}

scalar_payload! {
    bool => Bool;
    i32 => I32;
    i64 => I64;
    f32 => F32;
    f64 => F64;
}

macro_rules! array_payload {
    ($($elem:ty => $token:ident;)+) => {
        $(
            impl FromPayload for Vec<$elem> {
                const TOKEN: TypeToken = TypeToken::$token;

                unsafe fn read(raw: *const c_void) -> KvResult<Self> {
                    let array = &*raw.cast::<RawTypedArray>();
                    if array.type_token != Self::TOKEN {
                        return Err(KvError::new(
                            ErrorCode::TypeMismatch,
                            format!("array holds {:?}, expected {:?}", array.type_token, Self::TOKEN),
                        ));
                    }
                    if array.len == 0 {
                        return Ok(Vec::new());
                    }
                    if array.array.is_null() {
                        return Err(KvError::new(ErrorCode::DataInvalid, "array without elements"));
                    }
                    Ok(std::slice::from_raw_parts(array.array.cast::<$elem>(), array.len).to_vec())
                }
            }
        )+
    };
}

array_payload! {
    u8 => ByteArray;
    i32 => I32Array;
    i64 => I64Array;
    f32 => F32Array;
    f64 => F64Array;
}

impl FromPayload for String {
    const TOKEN: TypeToken = TypeToken::Str;

    unsafe fn read(raw: *const c_void) -> KvResult<Self> {
        let slice = &*raw.cast::<ByteSlice>();
        String::from_utf8(slice.as_bytes().to_vec())
            .map_err(|e| KvError::new(ErrorCode::DecodeFailed, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minikv_core::CoreError;
    use minikv_codec::TypedValue;
    use minikv_ffi::InternalError;

    #[test]
    fn null_buffer_is_data_invalid() {
        let err = ResultGuard::new(std::ptr::null()).err().unwrap();
        assert_eq!(err.code, ErrorCode::DataInvalid);
    }

    #[test]
    fn decode_reads_and_releases() {
        let guard = ResultGuard::new(RawBuffer::value(TypedValue::Str("hi".into()))).unwrap();
        assert_eq!(guard.decode::<String>().unwrap(), "hi");
    }

    #[test]
    fn token_mismatch_is_refused() {
        let guard = ResultGuard::new(RawBuffer::value(TypedValue::I32(3))).unwrap();
        let err = guard.decode::<i64>().unwrap_err();
        assert_eq!(err.code, ErrorCode::TypeMismatch);
    }

    #[test]
    fn error_buffer_carries_code_and_reason() {
        let guard = ResultGuard::new(RawBuffer::core_error(
            TypeToken::Bool,
            &CoreError::key_not_found("flag"),
        ))
        .unwrap();
        let err = guard.decode::<bool>().unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.reason, "key not found: flag");
    }

    #[test]
    fn unknown_code_becomes_data_invalid() {
        let mut error = InternalError::new(ErrorCode::KeyNotFound, None);
        error.code = 99;
        let guard = ResultGuard::new(RawBuffer::error(TypeToken::Void, error)).unwrap();
        assert_eq!(guard.into_unit().unwrap_err().code, ErrorCode::DataInvalid);
    }
}
