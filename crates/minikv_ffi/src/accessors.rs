//! Typed put/get/delete entry points.
//!
//! Every accessor returns a [`RawBuffer`] the host must release with
//! `minikv_free_buffer`. Puts and deletes return a `Void` buffer on success.
//! Failed gets keep the token of the type that was asked for.

use crate::args;
use crate::types::RawBuffer;
use crate::error::{guard_buffer, InputError};
use crate::types::{KvInstance, TypeToken};
use minikv_codec::Storable;
use minikv_core::{CoreError, Store};
use std::ffi::c_char;

/// Resolves the handle and key, then runs `body` against the open store.
unsafe fn with_store<F>(
    handle: *const KvInstance,
    key: *const c_char,
    token: TypeToken,
    body: F,
) -> *const RawBuffer
where
    F: FnOnce(&Store, &str) -> *const RawBuffer,
{
    guard_buffer(token, || {
        let Some(instance) = args::instance(handle) else {
            return RawBuffer::core_error(token, &CoreError::InstanceClosed);
        };
        let key = match args::c_str(key, "key") {
            Ok(key) => key,
            Err(e) => return e.into_buffer(token),
        };
        match instance.store() {
            Ok(store) => body(&store, key),
            Err(e) => RawBuffer::core_error(token, &e),
        }
    })
}

fn get_buffer<T: Storable>(store: &Store, key: &str) -> *const RawBuffer {
    match store.get::<T>(key) {
        Ok(value) => RawBuffer::value(value.into_value()),
        Err(e) => {
            tracing::trace!(key, error = %e, "get failed");
            RawBuffer::core_error(TypeToken::from(T::VALUE_TYPE), &e)
        }
    }
}

fn put_buffer<T: Storable>(store: &Store, key: &str, value: T) -> *const RawBuffer {
    RawBuffer::from_unit(store.put_typed(key, value))
}

fn put_input<T: Storable>(
    store: &Store,
    key: &str,
    value: Result<T, InputError>,
) -> *const RawBuffer {
    match value {
        Ok(value) => put_buffer(store, key, value),
        Err(e) => e.into_buffer(TypeToken::Void),
    }
}

macro_rules! scalar_accessors {
    ($($ty:ty => $put:ident, $get:ident;)+) => {
        $(
            #[doc = concat!("Stores a `", stringify!($ty), "` under `key`.")]
            ///
            /// # Safety
            ///
            /// `handle` must be null or a live instance handle and `key` a
            /// NUL-terminated UTF-8 string.
            #[no_mangle]
            pub unsafe extern "C" fn $put(
                handle: *const KvInstance,
                key: *const c_char,
                value: $ty,
            ) -> *const RawBuffer {
                with_store(handle, key, TypeToken::Void, |store, key| {
                    put_buffer(store, key, value)
                })
            }

            #[doc = concat!("Reads the `", stringify!($ty), "` stored under `key`.")]
            ///
            /// # Safety
            ///
            /// Same as the matching put.
            #[no_mangle]
            pub unsafe extern "C" fn $get(
                handle: *const KvInstance,
                key: *const c_char,
            ) -> *const RawBuffer {
                with_store(
                    handle,
                    key,
                    TypeToken::from(<$ty as Storable>::VALUE_TYPE),
                    get_buffer::<$ty>,
                )
            }
        )+
    };
}

macro_rules! array_accessors {
    ($($elem:ty => $put:ident, $get:ident;)+) => {
        $(
            #[doc = concat!("Stores a copy of `len` `", stringify!($elem), "` elements under `key`.")]
            ///
            /// # Safety
            ///
            /// `handle` must be null or a live instance handle, `key` a
            /// NUL-terminated UTF-8 string and `values` null (with `len == 0`)
            /// or `len` readable elements.
            #[no_mangle]
            pub unsafe extern "C" fn $put(
                handle: *const KvInstance,
                key: *const c_char,
                values: *const $elem,
                len: usize,
            ) -> *const RawBuffer {
                with_store(handle, key, TypeToken::Void, |store, key| {
                    put_input(store, key, args::slice(values, len, "value").map(<[$elem]>::to_vec))
                })
            }

            #[doc = concat!("Reads the `", stringify!($elem), "` array stored under `key`.")]
            ///
            /// # Safety
            ///
            /// `handle` must be null or a live instance handle and `key` a
            /// NUL-terminated UTF-8 string.
            #[no_mangle]
            pub unsafe extern "C" fn $get(
                handle: *const KvInstance,
                key: *const c_char,
            ) -> *const RawBuffer {
                with_store(
                    handle,
                    key,
                    TypeToken::from(<Vec<$elem> as Storable>::VALUE_TYPE),
                    get_buffer::<Vec<$elem>>,
                )
            }
        )+
    };
}

scalar_accessors! {
    bool => minikv_put_bool, minikv_get_bool;
    i32 => minikv_put_i32, minikv_get_i32;
    i64 => minikv_put_i64, minikv_get_i64;
    f32 => minikv_put_f32, minikv_get_f32;
    f64 => minikv_put_f64, minikv_get_f64;
}

array_accessors! {
    u8 => minikv_put_byte_array, minikv_get_byte_array;
    i32 => minikv_put_i32_array, minikv_get_i32_array;
    i64 => minikv_put_i64_array, minikv_get_i64_array;
    f32 => minikv_put_f32_array, minikv_get_f32_array;
    f64 => minikv_put_f64_array, minikv_get_f64_array;
}

/// Stores `len` bytes of UTF-8 under `key`.
///
/// # Safety
///
/// `handle` must be null or a live instance handle, `key` a NUL-terminated
/// UTF-8 string and `value` null (with `len == 0`) or `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn minikv_put_str(
    handle: *const KvInstance,
    key: *const c_char,
    value: *const u8,
    len: usize,
) -> *const RawBuffer {
    with_store(handle, key, TypeToken::Void, |store, key| {
        put_input(store, key, args::utf8(value, len, "value").map(str::to_owned))
    })
}

/// Reads the string stored under `key`.
///
/// # Safety
///
/// `handle` must be null or a live instance handle and `key` a
/// NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn minikv_get_str(
    handle: *const KvInstance,
    key: *const c_char,
) -> *const RawBuffer {
    with_store(handle, key, TypeToken::Str, get_buffer::<String>)
}

/// Removes `key`. Removing an absent key succeeds.
///
/// # Safety
///
/// `handle` must be null or a live instance handle and `key` a
/// NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn minikv_delete(
    handle: *const KvInstance,
    key: *const c_char,
) -> *const RawBuffer {
    with_store(handle, key, TypeToken::Void, |store, key| {
        RawBuffer::from_unit(store.delete(key))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::minikv_free_buffer;
    use crate::instance::{minikv_close, minikv_instance_free, minikv_open};
    use crate::types::{ByteSlice, RawTypedArray};
    use minikv_core::ErrorCode;
    use std::ffi::CString;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _dir: TempDir,
        handle: *const KvInstance,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let path = CString::new(dir.path().to_str().unwrap()).unwrap();
            let handle = unsafe { minikv_open(path.as_ptr(), std::ptr::null()) };
            assert!(!handle.is_null());
            Self { _dir: dir, handle }
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            unsafe { minikv_instance_free(self.handle) };
        }
    }

    fn key(name: &str) -> CString {
        CString::new(name).unwrap()
    }

    unsafe fn assert_void(buffer: *const RawBuffer) {
        assert!((*buffer).err.is_null());
        assert_eq!((*buffer).type_token, TypeToken::Void);
        minikv_free_buffer(buffer);
    }

    unsafe fn error_code(buffer: *const RawBuffer) -> i32 {
        assert!((*buffer).raw_data.is_null());
        let code = (*(*buffer).err).code;
        minikv_free_buffer(buffer);
        code
    }

    #[test]
    fn scalar_round_trip() {
        let fx = Fixture::new();
        let k = key("count");
        unsafe {
            assert_void(minikv_put_i64(fx.handle, k.as_ptr(), i64::MAX));
            let buffer = minikv_get_i64(fx.handle, k.as_ptr());
            assert_eq!((*buffer).type_token, TypeToken::I64);
            assert_eq!(*(*buffer).raw_data.cast::<i64>(), i64::MAX);
            minikv_free_buffer(buffer);

            assert_void(minikv_put_bool(fx.handle, k.as_ptr(), true));
            let buffer = minikv_get_bool(fx.handle, k.as_ptr());
            assert!(*(*buffer).raw_data.cast::<bool>());
            minikv_free_buffer(buffer);
        }
    }

    #[test]
    fn float_bits_survive() {
        let fx = Fixture::new();
        let k = key("nan");
        let nan = f64::from_bits(0x7ff8_0000_dead_beef);
        unsafe {
            assert_void(minikv_put_f64(fx.handle, k.as_ptr(), nan));
            let buffer = minikv_get_f64(fx.handle, k.as_ptr());
            assert_eq!((*(*buffer).raw_data.cast::<f64>()).to_bits(), nan.to_bits());
            minikv_free_buffer(buffer);
        }
    }

    #[test]
    fn string_round_trip() {
        let fx = Fixture::new();
        let k = key("greeting");
        let text = "héllo wörld";
        unsafe {
            assert_void(minikv_put_str(fx.handle, k.as_ptr(), text.as_ptr(), text.len()));
            let buffer = minikv_get_str(fx.handle, k.as_ptr());
            assert_eq!((*buffer).type_token, TypeToken::Str);
            let slice = &*(*buffer).raw_data.cast::<ByteSlice>();
            assert_eq!(slice.as_bytes(), text.as_bytes());
            minikv_free_buffer(buffer);
        }
    }

    #[test]
    fn array_round_trip() {
        let fx = Fixture::new();
        let k = key("samples");
        let values = [f32::MIN_POSITIVE, -0.0, f32::MAX];
        unsafe {
            assert_void(minikv_put_f32_array(
                fx.handle,
                k.as_ptr(),
                values.as_ptr(),
                values.len(),
            ));
            let buffer = minikv_get_f32_array(fx.handle, k.as_ptr());
            let array = &*(*buffer).raw_data.cast::<RawTypedArray>();
            assert_eq!(array.type_token, TypeToken::F32Array);
            let got = std::slice::from_raw_parts(array.array.cast::<f32>(), array.len);
            let bits: Vec<u32> = got.iter().map(|v| v.to_bits()).collect();
            let want: Vec<u32> = values.iter().map(|v| v.to_bits()).collect();
            assert_eq!(bits, want);
            minikv_free_buffer(buffer);
        }
    }

    #[test]
    fn empty_array_accepts_null_pointer() {
        let fx = Fixture::new();
        let k = key("empty");
        unsafe {
            assert_void(minikv_put_byte_array(fx.handle, k.as_ptr(), std::ptr::null(), 0));
            let buffer = minikv_get_byte_array(fx.handle, k.as_ptr());
            let array = &*(*buffer).raw_data.cast::<RawTypedArray>();
            assert!(array.array.is_null());
            assert_eq!(array.len, 0);
            minikv_free_buffer(buffer);
        }
    }

    #[test]
    fn missing_key_keeps_requested_token() {
        let fx = Fixture::new();
        let k = key("absent");
        unsafe {
            let buffer = minikv_get_i32_array(fx.handle, k.as_ptr());
            assert_eq!((*buffer).type_token, TypeToken::I32Array);
            assert_eq!(error_code(buffer), ErrorCode::KeyNotFound.wire());
        }
    }

    #[test]
    fn mismatched_type_is_not_coerced() {
        let fx = Fixture::new();
        let k = key("n");
        unsafe {
            assert_void(minikv_put_i32(fx.handle, k.as_ptr(), 7));
            assert_eq!(
                error_code(minikv_get_i64(fx.handle, k.as_ptr())),
                ErrorCode::TypeMismatch.wire()
            );
        }
    }

    #[test]
    fn delete_is_idempotent() {
        let fx = Fixture::new();
        let k = key("gone");
        unsafe {
            assert_void(minikv_put_f32(fx.handle, k.as_ptr(), 1.5));
            assert_void(minikv_delete(fx.handle, k.as_ptr()));
            assert_void(minikv_delete(fx.handle, k.as_ptr()));
            assert_eq!(
                error_code(minikv_get_f32(fx.handle, k.as_ptr())),
                ErrorCode::KeyNotFound.wire()
            );
        }
    }

    #[test]
    fn bad_arguments_are_encode_failed() {
        let fx = Fixture::new();
        let k = key("k");
        let bad = [0xffu8, 0xfe];
        unsafe {
            assert_eq!(
                error_code(minikv_put_i32(fx.handle, std::ptr::null(), 1)),
                ErrorCode::EncodeFailed.wire()
            );
            assert_eq!(
                error_code(minikv_put_str(fx.handle, k.as_ptr(), bad.as_ptr(), bad.len())),
                ErrorCode::EncodeFailed.wire()
            );
            assert_eq!(
                error_code(minikv_put_i64_array(fx.handle, k.as_ptr(), std::ptr::null(), 3)),
                ErrorCode::EncodeFailed.wire()
            );
        }
    }

    #[test]
    fn closed_instance_reports_instance_closed() {
        let fx = Fixture::new();
        let k = key("k");
        unsafe {
            minikv_close(fx.handle);
            assert_eq!(
                error_code(minikv_put_i32(fx.handle, k.as_ptr(), 1)),
                ErrorCode::InstanceClosed.wire()
            );
            assert_eq!(
                error_code(minikv_get_str(std::ptr::null(), k.as_ptr())),
                ErrorCode::InstanceClosed.wire()
            );
        }
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(64))]

        #[test]
        fn arbitrary_bytes_as_string_value(
            bytes in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..48),
        ) {
            let fx = Fixture::new();
            let k = key("text");
            unsafe {
                assert_void(minikv_put_str(fx.handle, k.as_ptr(), "seed".as_ptr(), 4));
                let put = minikv_put_str(fx.handle, k.as_ptr(), bytes.as_ptr(), bytes.len());
                let expected: &[u8] = match std::str::from_utf8(&bytes) {
                    Ok(_) => {
                        assert_void(put);
                        bytes.as_slice()
                    }
                    Err(_) => {
                        proptest::prop_assert_eq!(error_code(put), ErrorCode::EncodeFailed.wire());
                        &b"seed"[..]
                    }
                };

                let buffer = minikv_get_str(fx.handle, k.as_ptr());
                let slice = &*(*buffer).raw_data.cast::<ByteSlice>();
                let stored = slice.as_bytes().to_vec();
                minikv_free_buffer(buffer);
                proptest::prop_assert_eq!(stored.as_slice(), expected);
            }
        }
    }
}
