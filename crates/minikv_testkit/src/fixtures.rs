//! Store fixtures backed by temporary directories.

use minikv_core::{Config, EncryptionKey, Store, JOURNAL_FILE};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A store in a temporary directory that is removed on drop.
pub struct TempStore {
    store: Option<Store>,
    key_hex: Option<String>,
    dir: TempDir,
}

impl TempStore {
    /// Opens a plaintext store in a fresh directory.
    pub fn open() -> Self {
        Self::build(None)
    }

    /// Opens an encrypted store in a fresh directory.
    pub fn open_encrypted(key_hex: &str) -> Self {
        Self::build(Some(key_hex.to_owned()))
    }

    fn build(key_hex: Option<String>) -> Self {
        let dir = TempDir::new().expect("create temp directory");
        let store = Store::open(config_for(dir.path(), key_hex.as_deref())).expect("open store");
        Self {
            store: Some(store),
            key_hex,
            dir,
        }
    }

    /// Closes the store and opens the same directory again.
    pub fn reopen(&mut self) {
        if let Some(store) = self.store.take() {
            store.close().expect("close store");
        }
        let config = config_for(self.dir.path(), self.key_hex.as_deref());
        self.store = Some(Store::open(config).expect("reopen store"));
    }

    /// Closes the store, leaving the directory in place.
    pub fn close(&mut self) {
        if let Some(store) = self.store.take() {
            store.close().expect("close store");
        }
    }

    /// Opens the directory with an explicit configuration.
    pub fn open_with(&mut self, config: Config) -> Result<(), minikv_core::CoreError> {
        self.close();
        self.store = Some(Store::open(config)?);
        Ok(())
    }

    /// The data directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The journal file.
    pub fn journal_path(&self) -> PathBuf {
        self.dir.path().join(JOURNAL_FILE)
    }

    /// A configuration for this directory with the fixture's key.
    pub fn config(&self) -> Config {
        config_for(self.dir.path(), self.key_hex.as_deref())
    }
}

impl std::ops::Deref for TempStore {
    type Target = Store;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref().expect("store is closed")
    }
}

fn config_for(dir: &Path, key_hex: Option<&str>) -> Config {
    let config = Config::new(dir);
    match key_hex {
        Some(hex) => config.encryption_key(EncryptionKey::from_hex(hex).expect("valid key")),
        None => config,
    }
}

/// Runs `f` against a fresh plaintext store.
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&Store) -> R,
{
    let store = TempStore::open();
    f(&store)
}

/// A fixed test key, 32 hex characters.
pub const TEST_KEY_HEX: &str = "88C51C536176AD8A8EE4A06F62EE897E";

/// A second key that differs from [`TEST_KEY_HEX`].
pub const OTHER_KEY_HEX: &str = "00112233445566778899AABBCCDDEEFF";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reopen_keeps_values() {
        let mut fixture = TempStore::open();
        fixture.put_typed("n", 3i64).unwrap();
        fixture.reopen();
        assert_eq!(fixture.get::<i64>("n").unwrap(), 3);
        assert!(fixture.journal_path().exists());
    }

    #[test]
    fn encrypted_fixture_reopens_with_its_key() {
        let mut fixture = TempStore::open_encrypted(TEST_KEY_HEX);
        fixture.put_typed("s", String::from("secret")).unwrap();
        fixture.reopen();
        assert_eq!(fixture.get::<String>("s").unwrap(), "secret");
    }

    #[test]
    fn with_temp_store_passes_an_open_store() {
        let len = with_temp_store(|store| {
            store.put_typed("a", true).unwrap();
            store.len()
        });
        assert_eq!(len, 1);
    }
}
