//! Argument errors, panic containment and the thread-local last error.

use crate::types::RawBuffer;
use crate::types::{InternalError, TypeToken};
use minikv_core::ErrorCode;
use std::any::Any;
use std::cell::RefCell;
use std::ffi::{c_char, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;

/// A host argument that could not be used.
///
/// These never reach the engine; they become `EncodeFailed` buffers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    /// A required pointer was null.
    #[error("{0} is null")]
    Null(&'static str),
    /// A string argument was not UTF-8.
    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),
}

impl InputError {
    /// Wraps the error in a buffer.
    pub fn into_buffer(self, type_token: TypeToken) -> *const RawBuffer {
        RawBuffer::error(
            type_token,
            InternalError::new(ErrorCode::EncodeFailed, Some(self.to_string())),
        )
    }
}

/// Runs `body`, turning a panic into a `DataInvalid` buffer.
pub(crate) fn guard_buffer<F>(type_token: TypeToken, body: F) -> *const RawBuffer
where
    F: FnOnce() -> *const RawBuffer,
{
    catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|panic| {
        let message = panic_message(panic.as_ref());
        tracing::error!(panic = %message, "panic contained at the C boundary");
        RawBuffer::error(
            type_token,
            InternalError::new(
                ErrorCode::DataInvalid,
                Some(format!("internal panic: {message}")),
            ),
        )
    })
}

/// Runs `body`, turning a panic into `fallback` and a last-error message.
pub(crate) fn guard_value<T, F>(fallback: T, body: F) -> T
where
    F: FnOnce() -> T,
{
    catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|panic| {
        let message = panic_message(panic.as_ref());
        tracing::error!(panic = %message, "panic contained at the C boundary");
        set_last_error(format!("internal panic: {message}"));
        fallback
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

// Thread-local storage for last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Sets the last error message.
pub fn set_last_error(message: impl Into<String>) {
    let mut bytes = message.into().into_bytes();
    bytes.retain(|b| *b != 0);
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(bytes).ok();
    });
}

/// Clears the last error.
pub fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Returns the last lifecycle error on this thread, or null.
///
/// # Safety
///
/// The returned pointer is valid until the next minikv call on this thread.
#[no_mangle]
pub extern "C" fn minikv_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => std::ptr::null(),
    })
}

/// Clears the last error message.
#[no_mangle]
pub extern "C" fn minikv_clear_error() {
    clear_last_error();
}
