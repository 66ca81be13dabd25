//! # minikv core
//!
//! The native engine behind the minikv C ABI: a typed key-value store kept
//! in memory and persisted to an append-only, optionally encrypted journal.
//!
//! ## Layout
//!
//! - [`Store`] - one open data directory
//! - [`Instance`] - the lifecycle wrapper the C ABI hands out
//! - [`journal`] - framed, checksummed records with torn-tail recovery
//! - [`crypto`] - AES-256-GCM record encryption with HKDF key derivation
//! - [`CoreError`] / [`ErrorCode`] - rich engine errors and the closed wire
//!   taxonomy they map onto
//!
//! ## Example
//!
//! ```rust,no_run
//! use minikv_core::{Config, Instance};
//!
//! let instance = Instance::new();
//! instance.initialize(Config::new("/data/app"))?;
//! let store = instance.store()?;
//! store.put_typed("launches", 3i32)?;
//! assert_eq!(store.get::<i32>("launches")?, 3);
//! instance.close();
//! # Ok::<(), minikv_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod crypto;
mod dir;
mod error;
mod instance;
pub mod journal;
mod manifest;
mod store;

pub use config::{
    Config, DEFAULT_COMPACT_THRESHOLD, ENV_COMPACT_THRESHOLD, ENV_SYNC_ON_WRITE,
};
pub use crypto::EncryptionKey;
pub use dir::{JOURNAL_FILE, LOCK_FILE, MANIFEST_FILE};
pub use error::{CoreError, CoreResult, ErrorCode};
pub use instance::{Instance, InstanceState};
pub use manifest::{EncryptionInfo, Manifest};
pub use store::{Store, StoreStats};

pub use minikv_codec::{Storable, TypedValue, ValueType};
