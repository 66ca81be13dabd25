//! # minikv FFI
//!
//! Stable C ABI between host-language bindings and the minikv engine.
//!
//! This crate provides:
//! - Tagged result buffers ([`RawBuffer`]) for every accessor
//! - A single release function, [`minikv_free_buffer`]
//! - The closed error taxonomy carried by [`InternalError`]
//! - A bridge forwarding engine `tracing` events to a host callback
//! - Instance lifecycle entry points
//!
//! ## Ownership
//!
//! Buffers returned by `minikv_put_*`, `minikv_get_*`, `minikv_delete` and
//! `minikv_clear_all` belong to the host until it passes them to
//! `minikv_free_buffer`, exactly once. Arguments passed into the library are
//! borrowed for the duration of the call and copied if kept.

#![warn(missing_docs)]

mod args;

pub mod accessors;
pub mod buffer;
pub mod error;
pub mod instance;
pub mod logger;
pub mod types;

pub use accessors::*;
pub use buffer::{minikv_free_buffer, minikv_outstanding_buffers};
pub use error::{minikv_clear_error, minikv_last_error, InputError};
pub use instance::{
    minikv_clear_all, minikv_close, minikv_initialize, minikv_instance_free,
    minikv_instance_new, minikv_open, minikv_shared_instance,
};
pub use logger::{
    minikv_reset_logger, minikv_set_log_level, minikv_set_logger, BridgeLayer, DestroyCallback,
    LogCallback, LogLevel, LoggerSlot, NativeLogger,
};
pub use types::{ByteSlice, InternalError, KvInstance, RawBuffer, RawTypedArray, TypeToken};
