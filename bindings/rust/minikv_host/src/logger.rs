//! Routing engine log events to a Rust logger.

use minikv_ffi::{
    minikv_reset_logger, minikv_set_log_level, minikv_set_logger, ByteSlice, LogLevel,
    NativeLogger,
};
use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Receives engine log events.
///
/// Called from whichever thread emitted the event, possibly concurrently.
pub trait HostLogger: Send + Sync {
    /// Handles one formatted event.
    fn log(&self, level: LogLevel, message: &str);
}

type Context = Arc<dyn HostLogger>;

/// Packages `logger` for `minikv_set_logger`.
///
/// The returned value owns a boxed `Arc`; the native side releases it
/// through the destroy callback.
pub fn native_logger(logger: Arc<dyn HostLogger>) -> NativeLogger {
    let context: Box<Context> = Box::new(logger);
    NativeLogger {
        obj: Box::into_raw(context).cast::<c_void>(),
        callback: trampoline,
        destroy,
    }
}

extern "C" fn trampoline(obj: *mut c_void, level: i32, message: *const ByteSlice) {
    let Some(level) = LogLevel::from_wire(level) else {
        return;
    };
    if obj.is_null() || message.is_null() {
        return;
    }
    // SAFETY: `obj` came from `native_logger` and is alive until `destroy`;
    // `message` is valid for the duration of this call.
    let (logger, bytes) = unsafe { (&*obj.cast::<Context>(), (*message).as_bytes()) };
    let text = String::from_utf8_lossy(bytes);
    // A panicking host logger must not unwind into native frames.
    let _ = catch_unwind(AssertUnwindSafe(|| logger.log(level, &text)));
}

extern "C" fn destroy(obj: *mut c_void) {
    if obj.is_null() {
        return;
    }
    // SAFETY: `obj` is the box leaked by `native_logger`; destroy runs once.
    drop(unsafe { Box::from_raw(obj.cast::<Context>()) });
}

/// Installs `logger` as the process-wide engine logger, replacing any
/// previous one.
pub fn set_logger(logger: Arc<dyn HostLogger>) {
    minikv_set_logger(native_logger(logger));
}

/// Removes the engine logger.
pub fn reset_logger() {
    minikv_reset_logger();
}

/// Sets the most verbose level that reaches the logger.
pub fn set_log_level(level: LogLevel) {
    minikv_set_log_level(level as i32);
}
