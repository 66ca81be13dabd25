//! Borrowing host arguments for the duration of one call.

use crate::error::InputError;
use crate::types::KvInstance;
use minikv_core::Instance;
use std::ffi::{c_char, CStr};

/// Resolves an instance handle.
///
/// # Safety
///
/// `handle` must be null or a live handle from `minikv_instance_new`,
/// `minikv_open` or `minikv_shared_instance`.
pub(crate) unsafe fn instance<'a>(handle: *const KvInstance) -> Option<&'a Instance> {
    handle.cast::<Instance>().as_ref()
}

/// Borrows a NUL-terminated UTF-8 string.
///
/// # Safety
///
/// `ptr` must be null or point at a NUL-terminated string that outlives the
/// call.
pub(crate) unsafe fn c_str<'a>(ptr: *const c_char, what: &'static str) -> Result<&'a str, InputError> {
    if ptr.is_null() {
        return Err(InputError::Null(what));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| InputError::InvalidUtf8(what))
}

/// Borrows `len` elements. A null pointer is accepted only with `len == 0`.
///
/// # Safety
///
/// `ptr` must be null or point at `len` initialized elements that outlive
/// the call.
pub(crate) unsafe fn slice<'a, T>(
    ptr: *const T,
    len: usize,
    what: &'static str,
) -> Result<&'a [T], InputError> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(InputError::Null(what));
    }
    Ok(std::slice::from_raw_parts(ptr, len))
}

/// Borrows `len` bytes of UTF-8.
///
/// # Safety
///
/// Same contract as [`slice`].
pub(crate) unsafe fn utf8<'a>(
    ptr: *const u8,
    len: usize,
    what: &'static str,
) -> Result<&'a str, InputError> {
    std::str::from_utf8(slice(ptr, len, what)?).map_err(|_| InputError::InvalidUtf8(what))
}
