//! # minikv Testkit
//!
//! Test utilities for minikv.
//!
//! This crate provides:
//! - Temporary-directory store fixtures
//! - proptest strategies for typed values and operation sequences
//! - Journal damage helpers for recovery tests
//! - Concurrent writer drivers
//!
//! ## Usage
//!
//! ```rust
//! use minikv_testkit::prelude::*;
//!
//! with_temp_store(|store| {
//!     store.put_typed("answer", 42i32).unwrap();
//!     assert_eq!(store.get::<i32>("answer").unwrap(), 42);
//! });
//! ```

#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use crash::*;
pub use fixtures::*;
pub use generators::*;
pub use stress::*;
