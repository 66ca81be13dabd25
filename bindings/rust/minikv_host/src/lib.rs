//! # minikv host binding
//!
//! A safe Rust client for the minikv C ABI.
//!
//! Every accessor call goes through the same `extern "C"` functions other
//! host languages use. Result buffers are released by a scope guard, so no
//! path through this crate can leak or double-release one.
//!
//! ```no_run
//! use minikv_host::{Kv, KvError};
//! use minikv_core::ErrorCode;
//!
//! let kv = Kv::open("/data/app", None)?;
//! kv.put_str("user", "ada")?;
//! match kv.get_i32("user") {
//!     Err(KvError { code: ErrorCode::TypeMismatch, .. }) => {}
//!     other => panic!("unexpected {other:?}"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

mod error;
mod kv;
mod logger;
mod result;

pub use error::{InitError, KvError, KvResult};
pub use kv::Kv;
pub use logger::{native_logger, reset_logger, set_log_level, set_logger, HostLogger};
pub use minikv_core::ErrorCode;
pub use minikv_ffi::LogLevel;
