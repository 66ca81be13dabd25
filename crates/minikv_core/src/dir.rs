//! Data directory layout and locking.
//!
//! ```text
//! <dir>/
//! ├─ minikv.journal    # Append-only record log
//! ├─ minikv.manifest   # CBOR metadata (format version, encryption salt)
//! └─ minikv.lock       # Advisory lock held while a store is open
//! ```
//!
//! The directory belongs to the host application. It must already exist and
//! is never created or removed here; only the files above are.

use crate::error::{CoreError, CoreResult};
use crate::manifest::Manifest;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Journal file name.
pub const JOURNAL_FILE: &str = "minikv.journal";
/// Manifest file name.
pub const MANIFEST_FILE: &str = "minikv.manifest";
/// Lock file name.
pub const LOCK_FILE: &str = "minikv.lock";
pub(crate) const JOURNAL_TEMP: &str = "minikv.journal.tmp";
const MANIFEST_TEMP: &str = "minikv.manifest.tmp";

/// An exclusively locked data directory.
///
/// The lock is released when this value is dropped.
#[derive(Debug)]
pub struct DataDir {
    path: PathBuf,
    lock_file: File,
}

impl DataDir {
    /// Locks an existing, writable directory.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidArgument`] if the path is missing, not a
    ///   directory, or read-only
    /// - [`CoreError::DirectoryLocked`] if another store holds the lock
    pub fn open(path: &Path) -> CoreResult<Self> {
        let metadata = fs::metadata(path).map_err(|e| {
            CoreError::invalid_argument(format!("data directory {}: {e}", path.display()))
        })?;
        if !metadata.is_dir() {
            return Err(CoreError::invalid_argument(format!(
                "not a directory: {}",
                path.display()
            )));
        }
        if metadata.permissions().readonly() {
            return Err(CoreError::invalid_argument(format!(
                "directory is read-only: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::DirectoryLocked {
                path: path.display().to_string(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            lock_file,
        })
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the journal path.
    #[must_use]
    pub fn journal_path(&self) -> PathBuf {
        self.path.join(JOURNAL_FILE)
    }

    /// Returns the path compaction writes the rewritten journal to.
    #[must_use]
    pub fn journal_temp_path(&self) -> PathBuf {
        self.path.join(JOURNAL_TEMP)
    }

    /// Returns the manifest path.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(MANIFEST_FILE)
    }

    /// Returns true if neither a journal nor a manifest exists yet.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        !self.manifest_path().exists() && !self.journal_path().exists()
    }

    /// Loads the manifest, or `None` if the directory has none yet.
    pub fn load_manifest(&self) -> CoreResult<Option<Manifest>> {
        match fs::read(self.manifest_path()) {
            Ok(data) if data.is_empty() => Ok(None),
            Ok(data) => Manifest::decode(&data).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Saves the manifest with write-temp, fsync, rename.
    pub fn save_manifest(&self, manifest: &Manifest) -> CoreResult<()> {
        let temp_path = self.path.join(MANIFEST_TEMP);
        let data = manifest.encode()?;
        let mut file = File::create(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, self.manifest_path())?;
        self.sync_directory()
    }

    /// Renames the compacted journal over the live one.
    pub fn install_compacted_journal(&self) -> CoreResult<()> {
        fs::rename(self.journal_temp_path(), self.journal_path())?;
        self.sync_directory()
    }

    /// Deletes every file this crate owns and releases the lock.
    ///
    /// The directory itself stays.
    pub fn remove_files(self) -> CoreResult<()> {
        for path in [
            self.journal_path(),
            self.journal_temp_path(),
            self.manifest_path(),
            self.path.join(MANIFEST_TEMP),
        ] {
            remove_if_exists(&path)?;
        }
        let lock_path = self.path.join(LOCK_FILE);
        // Unlock before unlinking.
        let _ = FileExt::unlock(&self.lock_file);
        drop(self.lock_file);
        remove_if_exists(&lock_path)?;
        Ok(())
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> CoreResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> CoreResult<()> {
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> CoreResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
