//! Instance lifecycle entry points.

use crate::args;
use crate::types::RawBuffer;
use crate::error::{clear_last_error, guard_buffer, guard_value, set_last_error};
use crate::types::{KvInstance, TypeToken};
use minikv_core::{Config, CoreError, EncryptionKey, Instance};
use std::ffi::c_char;

static SHARED: Instance = Instance::new();

fn shared_handle() -> *const KvInstance {
    std::ptr::from_ref(&SHARED).cast::<KvInstance>()
}

/// Creates a new, uninitialized instance.
///
/// Release it with `minikv_instance_free`.
#[no_mangle]
pub extern "C" fn minikv_instance_new() -> *const KvInstance {
    Box::into_raw(Box::new(Instance::new()))
        .cast::<KvInstance>()
        .cast_const()
}

/// Returns the process-wide instance. It is never freed.
#[no_mangle]
pub extern "C" fn minikv_shared_instance() -> *const KvInstance {
    shared_handle()
}

unsafe fn config_from_args(dir: *const c_char, key: *const c_char) -> Result<Config, String> {
    let dir = args::c_str(dir, "dir").map_err(|e| e.to_string())?;
    let mut config = Config::new(dir).from_env_overrides();
    if !key.is_null() {
        let key = args::c_str(key, "key").map_err(|e| e.to_string())?;
        config = config.encryption_key(EncryptionKey::from_hex(key).map_err(|e| e.to_string())?);
    }
    Ok(config)
}

/// Opens the store in `dir`, closing whatever the instance had open.
///
/// `key` is null for a plaintext store or 32 hex characters. Returns false
/// on failure, leaving the instance closed; `minikv_last_error` describes
/// the failure.
///
/// # Safety
///
/// - `handle` must be a live instance handle
/// - `dir` must be a NUL-terminated UTF-8 path
/// - `key` must be null or a NUL-terminated string
#[no_mangle]
pub unsafe extern "C" fn minikv_initialize(
    handle: *const KvInstance,
    dir: *const c_char,
    key: *const c_char,
) -> bool {
    clear_last_error();
    guard_value(false, || {
        let Some(instance) = args::instance(handle) else {
            set_last_error("instance handle is null");
            return false;
        };
        let config = match config_from_args(dir, key) {
            Ok(config) => config,
            Err(message) => {
                // Leave the instance in the same state a failed open would.
                instance.close();
                set_last_error(message);
                return false;
            }
        };
        match instance.initialize(config) {
            Ok(()) => true,
            Err(e) => {
                set_last_error(e.to_string());
                false
            }
        }
    })
}

/// Creates an instance and opens `dir` in it.
///
/// Returns null on failure; `minikv_last_error` describes the failure.
///
/// # Safety
///
/// Same as `minikv_initialize`.
#[no_mangle]
pub unsafe extern "C" fn minikv_open(dir: *const c_char, key: *const c_char) -> *const KvInstance {
    let handle = minikv_instance_new();
    if minikv_initialize(handle, dir, key) {
        handle
    } else {
        drop(Box::from_raw(handle.cast::<Instance>().cast_mut()));
        std::ptr::null()
    }
}

/// Closes the instance, keeping its data. Null and closed handles are
/// ignored.
///
/// # Safety
///
/// `handle` must be null or a live instance handle.
#[no_mangle]
pub unsafe extern "C" fn minikv_close(handle: *const KvInstance) {
    guard_value((), || {
        if let Some(instance) = args::instance(handle) {
            instance.close();
        }
    });
}

/// Deletes all persisted data and closes the instance.
///
/// # Safety
///
/// `handle` must be null or a live instance handle.
#[no_mangle]
pub unsafe extern "C" fn minikv_clear_all(handle: *const KvInstance) -> *const RawBuffer {
    guard_buffer(TypeToken::Void, || match args::instance(handle) {
        Some(instance) => RawBuffer::from_unit(instance.clear_all()),
        None => RawBuffer::core_error(TypeToken::Void, &CoreError::InstanceClosed),
    })
}

/// Closes and frees an instance from `minikv_instance_new` or
/// `minikv_open`. The shared instance is left alone.
///
/// # Safety
///
/// `handle` must be null or a live instance handle, and must not be used
/// afterwards.
#[no_mangle]
pub unsafe extern "C" fn minikv_instance_free(handle: *const KvInstance) {
    if handle.is_null() {
        return;
    }
    if std::ptr::eq(handle, shared_handle()) {
        tracing::warn!("minikv_instance_free called on the shared instance; ignoring");
        return;
    }
    guard_value((), || {
        let instance = Box::from_raw(handle.cast::<Instance>().cast_mut());
        instance.close();
    });
}
