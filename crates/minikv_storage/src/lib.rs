//! # minikv storage
//!
//! Byte-store backends underneath the minikv journal.
//!
//! A backend knows nothing about records, keys or encryption. It stores an
//! append-only sequence of bytes and hands slices of it back. The journal in
//! `minikv_core` owns framing, checksums and replay.
//!
//! ## Backends
//!
//! - [`FileBackend`] - a single file on disk, used by every open store
//! - [`InMemoryBackend`] - a `Vec<u8>`, used by tests that need to craft
//!   torn or corrupted journals byte by byte
//!
//! ## Example
//!
//! ```rust
//! use minikv_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"record").unwrap();
//! assert_eq!(backend.read_at(offset, 6).unwrap(), b"record");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
