//! Store configuration.

use crate::crypto::EncryptionKey;
use std::path::{Path, PathBuf};

/// Environment variable overriding [`Config::compact_threshold`].
pub const ENV_COMPACT_THRESHOLD: &str = "MINIKV_COMPACT_THRESHOLD";
/// Environment variable overriding [`Config::sync_on_write`].
pub const ENV_SYNC_ON_WRITE: &str = "MINIKV_SYNC_ON_WRITE";

/// Default journal size that makes compaction eligible.
pub const DEFAULT_COMPACT_THRESHOLD: u64 = 1024 * 1024;

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Existing, writable data directory.
    pub dir: PathBuf,

    /// Encryption key; `None` keeps the journal in plaintext.
    pub key: Option<EncryptionKey>,

    /// Journal size above which compaction runs, once the journal is also
    /// more than twice the live data.
    pub compact_threshold: u64,

    /// Whether every write is synced to disk before returning.
    pub sync_on_write: bool,
}

impl Config {
    /// Creates a plaintext configuration for `dir`.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            key: None,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            sync_on_write: false,
        }
    }

    /// Sets the encryption key.
    #[must_use]
    pub fn encryption_key(mut self, key: EncryptionKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Sets the compaction threshold in bytes.
    #[must_use]
    pub const fn compact_threshold(mut self, bytes: u64) -> Self {
        self.compact_threshold = bytes;
        self
    }

    /// Sets whether to sync on every write.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Applies `MINIKV_COMPACT_THRESHOLD` and `MINIKV_SYNC_ON_WRITE`.
    ///
    /// Unparseable values are ignored with a warning.
    #[must_use]
    pub fn from_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ENV_COMPACT_THRESHOLD) {
            match raw.trim().parse::<u64>() {
                Ok(bytes) => self.compact_threshold = bytes,
                Err(e) => tracing::warn!(var = ENV_COMPACT_THRESHOLD, value = %raw, error = %e, "ignoring override"),
            }
        }
        if let Some(raw) = lookup(ENV_SYNC_ON_WRITE) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.sync_on_write = true,
                "0" | "false" | "no" | "off" => self.sync_on_write = false,
                _ => tracing::warn!(var = ENV_SYNC_ON_WRITE, value = %raw, "ignoring override"),
            }
        }
        self
    }
}
