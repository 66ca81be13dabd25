//! The safe accessor surface.

use crate::error::{InitError, KvError, KvResult};
use crate::result::{FromPayload, ResultGuard};
use minikv_core::ErrorCode;
use minikv_ffi::{
    minikv_clear_all, minikv_clear_error, minikv_close, minikv_delete, minikv_get_bool,
    minikv_get_byte_array, minikv_get_f32, minikv_get_f32_array, minikv_get_f64,
    minikv_get_f64_array, minikv_get_i32, minikv_get_i32_array, minikv_get_i64,
    minikv_get_i64_array, minikv_get_str, minikv_initialize, minikv_instance_free,
    minikv_instance_new, minikv_last_error, minikv_put_bool, minikv_put_byte_array,
    minikv_put_f32, minikv_put_f32_array, minikv_put_f64, minikv_put_f64_array, minikv_put_i32,
    minikv_put_i32_array, minikv_put_i64, minikv_put_i64_array, minikv_put_str,
    minikv_shared_instance, KvInstance, RawBuffer,
};
use std::ffi::{c_char, CStr, CString};
use std::path::Path;

/// A handle to a native instance.
///
/// Strict getters (`get_*`) return every failure. Convenience getters
/// (`get_*_or`) return a default instead and log why.
///
/// ```no_run
/// use minikv_host::Kv;
///
/// let kv = Kv::open("/data/app", None)?;
/// kv.put_i64("launches", 1)?;
/// assert_eq!(kv.get_i64_or("launches", 0), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Kv {
    handle: *const KvInstance,
    owned: bool,
}

// SAFETY: the native instance synchronizes internally.
unsafe impl Send for Kv {}
unsafe impl Sync for Kv {}

impl Kv {
    /// Creates an uninitialized instance. Accessors fail with
    /// `InstanceClosed` until [`initialize`](Self::initialize) succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handle: minikv_instance_new(),
            owned: true,
        }
    }

    /// Opens `dir`, encrypted when `key` (32 hex characters) is given.
    pub fn open(dir: impl AsRef<Path>, key: Option<&str>) -> Result<Self, InitError> {
        let kv = Self::new();
        kv.initialize(dir, key)?;
        Ok(kv)
    }

    /// Returns a handle to the process-wide instance.
    ///
    /// Dropping it leaves the instance running.
    #[must_use]
    pub fn shared() -> Self {
        Self {
            handle: minikv_shared_instance(),
            owned: false,
        }
    }

    /// Opens `dir`, closing whatever this instance had open.
    pub fn initialize(&self, dir: impl AsRef<Path>, key: Option<&str>) -> Result<(), InitError> {
        let dir = dir
            .as_ref()
            .to_str()
            .ok_or_else(|| InitError::InvalidArgument("directory is not valid UTF-8".into()))?;
        let dir = c_string(dir).map_err(|e| InitError::InvalidArgument(e.reason))?;
        let key = key
            .map(c_string)
            .transpose()
            .map_err(|e| InitError::InvalidArgument(e.reason))?;
        let key_ptr = key.as_ref().map_or(std::ptr::null(), |k| k.as_ptr());

        // SAFETY: both strings outlive the call.
        if unsafe { minikv_initialize(self.handle, dir.as_ptr(), key_ptr) } {
            return Ok(());
        }
        let message = last_error().unwrap_or_else(|| "unknown failure".into());
        minikv_clear_error();
        Err(InitError::Failed(message))
    }

    /// Closes the instance, keeping its data.
    pub fn close(&self) {
        // SAFETY: `handle` is live for the lifetime of `self`.
        unsafe { minikv_close(self.handle) };
    }

    /// Deletes all persisted data and closes the instance.
    pub fn clear_all(&self) -> KvResult<()> {
        // SAFETY: `handle` is live for the lifetime of `self`.
        ResultGuard::new(unsafe { minikv_clear_all(self.handle) })?.into_unit()
    }

    /// Removes `key`. Succeeds when the key is absent.
    pub fn delete(&self, key: &str) -> KvResult<()> {
        self.call(key, |handle, key| unsafe { minikv_delete(handle, key) })?
            .into_unit()
    }

    /// Stores a string.
    pub fn put_str(&self, key: &str, value: &str) -> KvResult<()> {
        self.call(key, |handle, key| unsafe {
            minikv_put_str(handle, key, value.as_ptr(), value.len())
        })?
        .into_unit()
    }

    /// Reads a string.
    pub fn get_str(&self, key: &str) -> KvResult<String> {
        self.get(key, |handle, key| unsafe { minikv_get_str(handle, key) })
    }

    /// Reads a string, or `default` on any failure.
    pub fn get_str_or(&self, key: &str, default: &str) -> String {
        or_default(key, self.get_str(key), || default.to_owned())
    }

    fn call<F>(&self, key: &str, native: F) -> KvResult<ResultGuard>
    where
        F: FnOnce(*const KvInstance, *const c_char) -> *const RawBuffer,
    {
        let key = c_string(key)?;
        ResultGuard::new(native(self.handle, key.as_ptr()))
    }

    fn get<T, F>(&self, key: &str, native: F) -> KvResult<T>
    where
        T: FromPayload,
        F: FnOnce(*const KvInstance, *const c_char) -> *const RawBuffer,
    {
        self.call(key, native)?.decode()
    }
}

impl Default for Kv {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Kv {
    fn drop(&mut self) {
        if self.owned {
            // SAFETY: owned handles come from `minikv_instance_new` and are
            // freed once.
            unsafe { minikv_instance_free(self.handle) };
        }
    }
}

fn c_string(value: &str) -> KvResult<CString> {
    CString::new(value).map_err(|_| KvError::new(ErrorCode::EncodeFailed, "string contains NUL"))
}

fn last_error() -> Option<String> {
    let ptr = minikv_last_error();
    if ptr.is_null() {
        return None;
    }
    // SAFETY: valid until the next minikv call on this thread.
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

fn or_default<T>(key: &str, result: KvResult<T>, default: impl FnOnce() -> T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            match e.code {
                ErrorCode::KeyNotFound => tracing::trace!(key, "key not found, using default"),
                ErrorCode::InstanceClosed => {
                    tracing::error!(key, error = %e, "read on a closed instance, using default");
                }
                _ => tracing::warn!(key, error = %e, "read failed, using default"),
            }
            default()
        }
    }
}

macro_rules! scalar_methods {
    ($($ty:ty => $put:ident, $get:ident, $get_or:ident, $c_put:ident, $c_get:ident;)+) => {
        impl Kv {
            $(
                #[doc = concat!("Stores a `", stringify!($ty), "`.")]
                pub fn $put(&self, key: &str, value: $ty) -> KvResult<()> {
                    self.call(key, |handle, key| unsafe { $c_put(handle, key, value) })?
                        .into_unit()
                }

                #[doc = concat!("Reads a `", stringify!($ty), "`.")]
                pub fn $get(&self, key: &str) -> KvResult<$ty> {
                    self.get(key, |handle, key| unsafe { $c_get(handle, key) })
                }

                #[doc = concat!("Reads a `", stringify!($ty), "`, or `default` on any failure.")]
                pub fn $get_or(&self, key: &str, default: $ty) -> $ty {
                    or_default(key, self.$get(key), || default)
                }
            )+
        }
    };
}

macro_rules! array_methods {
    ($($elem:ty => $put:ident, $get:ident, $get_or:ident, $c_put:ident, $c_get:ident;)+) => {
        impl Kv {
            $(
                #[doc = concat!("Stores a copy of a `", stringify!($elem), "` slice.")]
                pub fn $put(&self, key: &str, values: &[$elem]) -> KvResult<()> {
                    self.call(key, |handle, key| unsafe {
                        $c_put(handle, key, values.as_ptr(), values.len())
                    })?
                    .into_unit()
                }

                #[doc = concat!("Reads a `", stringify!($elem), "` array.")]
                pub fn $get(&self, key: &str) -> KvResult<Vec<$elem>> {
                    self.get(key, |handle, key| unsafe { $c_get(handle, key) })
                }

                #[doc = concat!("Reads a `", stringify!($elem), "` array, or `default` on any failure.")]
                pub fn $get_or(&self, key: &str, default: Vec<$elem>) -> Vec<$elem> {
                    or_default(key, self.$get(key), || default)
                }
            )+
        }
    };
}

scalar_methods! {
    bool => put_bool, get_bool, get_bool_or, minikv_put_bool, minikv_get_bool;
    i32 => put_i32, get_i32, get_i32_or, minikv_put_i32, minikv_get_i32;
    i64 => put_i64, get_i64, get_i64_or, minikv_put_i64, minikv_get_i64;
    f32 => put_f32, get_f32, get_f32_or, minikv_put_f32, minikv_get_f32;
    f64 => put_f64, get_f64, get_f64_or, minikv_put_f64, minikv_get_f64;
}

array_methods! {
    u8 => put_byte_array, get_byte_array, get_byte_array_or, minikv_put_byte_array, minikv_get_byte_array;
    i32 => put_i32_array, get_i32_array, get_i32_array_or, minikv_put_i32_array, minikv_get_i32_array;
    i64 => put_i64_array, get_i64_array, get_i64_array_or, minikv_put_i64_array, minikv_get_i64_array;
    f32 => put_f32_array, get_f32_array, get_f32_array_or, minikv_put_f32_array, minikv_get_f32_array;
    f64 => put_f64_array, get_f64_array, get_f64_array_or, minikv_put_f64_array, minikv_get_f64_array;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn uninitialized_instance_is_closed() {
        let kv = Kv::new();
        assert_eq!(kv.get_i32("a").unwrap_err().code, ErrorCode::InstanceClosed);
        assert_eq!(kv.get_i32_or("a", 5), 5);
    }

    #[test]
    fn key_with_nul_is_encode_failed() {
        let dir = tempdir().unwrap();
        let kv = Kv::open(dir.path(), None).unwrap();
        assert_eq!(
            kv.put_bool("a\0b", true).unwrap_err().code,
            ErrorCode::EncodeFailed
        );
    }

    #[test]
    fn open_failure_reports_reason() {
        let dir = tempdir().unwrap();
        let err = Kv::open(dir.path().join("absent"), None).unwrap_err();
        assert!(matches!(err, InitError::Failed(ref m) if m.contains("absent")), "{err}");
    }

    #[test]
    fn convenience_getters_fall_back() {
        let dir = tempdir().unwrap();
        let kv = Kv::open(dir.path(), None).unwrap();
        kv.put_str("name", "minikv").unwrap();
        assert_eq!(kv.get_str_or("name", "x"), "minikv");
        assert_eq!(kv.get_i64_or("name", -1), -1);
        assert_eq!(kv.get_f64_array_or("missing", vec![1.0]), vec![1.0]);
    }
}
