//! The typed key-value store.
//!
//! A [`Store`] owns one locked data directory. Values live in an in-memory
//! index of encoded payloads; the journal is the durable copy. Reads decode
//! from the index, writes append to the journal first and update the index
//! only once the append succeeded.

use crate::config::Config;
use crate::crypto::{generate_salt, RecordCipher};
use crate::dir::DataDir;
use crate::error::{CoreError, CoreResult};
use crate::journal::{Journal, Record};
use crate::manifest::Manifest;
use minikv_codec::{decode_payload, encode_payload, Storable, TypedValue, ValueType};
use minikv_storage::FileBackend;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Entry {
    value_type: ValueType,
    payload: Vec<u8>,
    framed_len: u64,
}

struct Writer {
    dir: DataDir,
    journal: Journal,
    manifest: Manifest,
    cipher: Option<Arc<RecordCipher>>,
    live_bytes: u64,
}

/// Summary of an open store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Number of keys.
    pub keys: usize,
    /// Journal size on disk.
    pub journal_bytes: u64,
    /// Framed size of the records that are still live.
    pub live_bytes: u64,
    /// Whether the journal is encrypted.
    pub encrypted: bool,
    /// Completed compactions over the directory's lifetime.
    pub compactions: u64,
}

/// An open store.
pub struct Store {
    path: PathBuf,
    compact_threshold: u64,
    sync_on_write: bool,
    closed: AtomicBool,
    writer: Mutex<Option<Writer>>,
    index: RwLock<HashMap<String, Entry>>,
}

impl Store {
    /// Opens the store in `config.dir`, replaying its journal.
    ///
    /// # Errors
    ///
    /// Fails if the directory is missing, read-only or locked, if the
    /// manifest is corrupt, or if the key does not match the directory.
    pub fn open(config: Config) -> CoreResult<Self> {
        let dir = DataDir::open(&config.dir)?;
        let (manifest, cipher) = match dir.load_manifest()? {
            Some(manifest) => {
                let cipher = match (&manifest.encryption, &config.key) {
                    (Some(info), Some(key)) => {
                        let cipher = RecordCipher::new(key, &info.salt)?;
                        manifest.verify_cipher(&cipher)?;
                        Some(Arc::new(cipher))
                    }
                    (Some(_), None) => {
                        return Err(CoreError::key_mismatch(
                            "directory is encrypted but no key was supplied",
                        ))
                    }
                    (None, Some(_)) => {
                        return Err(CoreError::key_mismatch("directory is not encrypted"))
                    }
                    (None, None) => None,
                };
                (manifest, cipher)
            }
            None => {
                let journal_has_data = std::fs::metadata(dir.journal_path())
                    .map(|m| m.len() > 0)
                    .unwrap_or(false);
                if journal_has_data && config.key.is_some() {
                    return Err(CoreError::key_mismatch(
                        "journal has no manifest to verify the key against",
                    ));
                }
                let (manifest, cipher) = match &config.key {
                    Some(key) => {
                        let salt = generate_salt();
                        let cipher = RecordCipher::new(key, &salt)?;
                        (Manifest::encrypted(salt, &cipher), Some(Arc::new(cipher)))
                    }
                    None => (Manifest::plaintext(), None),
                };
                dir.save_manifest(&manifest)?;
                (manifest, cipher)
            }
        };

        let backend = FileBackend::open(&dir.journal_path())?;
        let mut journal = Journal::new(Box::new(backend), cipher.clone(), config.sync_on_write);
        let replay = journal.replay()?;

        let mut index = HashMap::new();
        let mut live_bytes = 0u64;
        for (record, framed_len) in replay.records {
            match record {
                Record::Put {
                    key,
                    value_type,
                    payload,
                } => {
                    if let Some(old) = index.insert(
                        key,
                        Entry {
                            value_type,
                            payload,
                            framed_len,
                        },
                    ) {
                        live_bytes -= old.framed_len;
                    }
                    live_bytes += framed_len;
                }
                Record::Delete { key } => {
                    if let Some(old) = index.remove(&key) {
                        live_bytes -= old.framed_len;
                    }
                }
            }
        }

        tracing::info!(
            dir = %config.dir.display(),
            keys = index.len(),
            journal_bytes = journal.size()?,
            encrypted = cipher.is_some(),
            skipped = replay.skipped,
            "store opened"
        );

        Ok(Self {
            path: config.dir,
            compact_threshold: config.compact_threshold,
            sync_on_write: config.sync_on_write,
            closed: AtomicBool::new(false),
            writer: Mutex::new(Some(Writer {
                dir,
                journal,
                manifest,
                cipher,
                live_bytes,
            })),
            index: RwLock::new(index),
        })
    }

    /// Returns the data directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true once the store has been closed or cleared.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stores `value` under `key`, replacing any previous value of any type.
    pub fn put(&self, key: &str, value: &TypedValue) -> CoreResult<()> {
        self.ensure_open()?;
        let value_type = value.value_type();
        let payload = encode_payload(value)?;
        let record = Record::Put {
            key: key.to_owned(),
            value_type,
            payload,
        };

        let mut guard = self.writer.lock();
        let writer = self.open_writer(&mut guard)?;
        let framed_len = writer.journal.append(&record)?;
        let (key, payload) = record.into_parts();
        let previous = self.index.write().insert(
            key,
            Entry {
                value_type,
                payload: payload.map(|(_, bytes)| bytes).unwrap_or_default(),
                framed_len,
            },
        );
        if let Some(old) = previous {
            writer.live_bytes -= old.framed_len;
        }
        writer.live_bytes += framed_len;
        self.maybe_compact(writer);
        Ok(())
    }

    /// Stores any [`Storable`] value.
    pub fn put_typed<T: Storable>(&self, key: &str, value: T) -> CoreResult<()> {
        self.put(key, &value.into_value())
    }

    /// Reads `key` as `T`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::KeyNotFound`] if the key is absent
    /// - [`CoreError::TypeMismatch`] if it holds another type
    /// - [`CoreError::Codec`] if the stored bytes do not decode
    pub fn get<T: Storable>(&self, key: &str) -> CoreResult<T> {
        self.ensure_open()?;
        let (value_type, payload) = {
            let index = self.index.read();
            let entry = index.get(key).ok_or_else(|| self.missing(key))?;
            if entry.value_type != T::VALUE_TYPE {
                return Err(CoreError::TypeMismatch {
                    key: key.to_owned(),
                    expected: T::VALUE_TYPE,
                    found: entry.value_type,
                });
            }
            (entry.value_type, entry.payload.clone())
        };
        let value = decode_payload(value_type, &payload)?;
        T::from_value(value).ok_or_else(|| {
            CoreError::corrupted(format!("payload for {key} decoded to another variant"))
        })
    }

    /// Reads `key` whatever its type.
    pub fn get_value(&self, key: &str) -> CoreResult<TypedValue> {
        self.ensure_open()?;
        let (value_type, payload) = {
            let index = self.index.read();
            let entry = index.get(key).ok_or_else(|| self.missing(key))?;
            (entry.value_type, entry.payload.clone())
        };
        Ok(decode_payload(value_type, &payload)?)
    }

    /// Returns the stored type of `key`.
    #[must_use]
    pub fn value_type(&self, key: &str) -> Option<ValueType> {
        self.index.read().get(key).map(|entry| entry.value_type)
    }

    /// Removes `key`. Removing an absent key succeeds.
    pub fn delete(&self, key: &str) -> CoreResult<()> {
        self.ensure_open()?;
        let mut guard = self.writer.lock();
        let writer = self.open_writer(&mut guard)?;
        if !self.index.read().contains_key(key) {
            return Ok(());
        }
        writer.journal.append(&Record::Delete {
            key: key.to_owned(),
        })?;
        if let Some(old) = self.index.write().remove(key) {
            writer.live_bytes -= old.framed_len;
        }
        self.maybe_compact(writer);
        Ok(())
    }

    /// Returns every key, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.index.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    /// Returns true if no key holds a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Returns size and layout figures.
    pub fn stats(&self) -> CoreResult<StoreStats> {
        let guard = self.writer.lock();
        let writer = guard.as_ref().ok_or(CoreError::InstanceClosed)?;
        Ok(StoreStats {
            keys: self.index.read().len(),
            journal_bytes: writer.journal.size()?,
            live_bytes: writer.live_bytes,
            encrypted: writer.cipher.is_some(),
            compactions: writer.manifest.compactions,
        })
    }

    /// Rewrites the journal to hold only live records.
    pub fn compact(&self) -> CoreResult<()> {
        self.ensure_open()?;
        let mut guard = self.writer.lock();
        let writer = self.open_writer(&mut guard)?;
        self.rewrite_journal(writer)
    }

    /// Syncs the journal and releases the directory. Data stays on disk.
    ///
    /// Closing twice is a no-op.
    pub fn close(&self) -> CoreResult<()> {
        self.closed.store(true, Ordering::Release);
        let Some(mut writer) = self.writer.lock().take() else {
            return Ok(());
        };
        // The index stays until drop so racing readers still find their keys.
        let result = writer.journal.sync();
        drop(writer);
        tracing::info!(dir = %self.path.display(), "store closed");
        result
    }

    /// Deletes the journal, manifest and lock file, then closes.
    pub fn clear_all(&self) -> CoreResult<()> {
        self.closed.store(true, Ordering::Release);
        let Some(writer) = self.writer.lock().take() else {
            return Ok(());
        };
        self.index.write().clear();
        let Writer { dir, journal, .. } = writer;
        drop(journal);
        dir.remove_files()?;
        tracing::info!(dir = %self.path.display(), "store cleared");
        Ok(())
    }

    fn open_writer<'a>(&self, slot: &'a mut Option<Writer>) -> CoreResult<&'a mut Writer> {
        match slot.as_mut() {
            Some(writer) if !self.is_closed() => Ok(writer),
            _ => Err(CoreError::InstanceClosed),
        }
    }

    fn missing(&self, key: &str) -> CoreError {
        if self.is_closed() {
            CoreError::InstanceClosed
        } else {
            CoreError::key_not_found(key)
        }
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.is_closed() {
            return Err(CoreError::InstanceClosed);
        }
        Ok(())
    }

    fn maybe_compact(&self, writer: &mut Writer) {
        let size = match writer.journal.size() {
            Ok(size) => size,
            Err(e) => {
                tracing::warn!(error = %e, "cannot read journal size");
                return;
            }
        };
        if size <= self.compact_threshold || size <= writer.live_bytes.saturating_mul(2) {
            return;
        }
        if let Err(e) = self.rewrite_journal(writer) {
            tracing::warn!(error = %e, journal_bytes = size, "compaction failed, keeping journal");
            let _ = std::fs::remove_file(writer.dir.journal_temp_path());
        }
    }

    fn rewrite_journal(&self, writer: &mut Writer) -> CoreResult<()> {
        let before = writer.journal.size()?;
        let temp_path = writer.dir.journal_temp_path();
        let mut compacted = Journal::new(
            Box::new(FileBackend::create_truncated(&temp_path)?),
            writer.cipher.clone(),
            false,
        );

        // Index writers also hold the writer lock.
        let lengths = copy_live(&self.index.read(), &mut compacted)?;
        compacted.sync()?;
        drop(compacted);

        writer.dir.install_compacted_journal()?;
        let backend = match FileBackend::open(&writer.dir.journal_path()) {
            Ok(backend) => backend,
            Err(e) => {
                // The old journal is unlinked now; appends to it would be lost.
                self.closed.store(true, Ordering::Release);
                tracing::error!(error = %e, "cannot reopen compacted journal, closing store");
                return Err(e.into());
            }
        };
        writer.journal = Journal::new(Box::new(backend), writer.cipher.clone(), self.sync_on_write);

        let mut live_bytes = 0u64;
        {
            let mut index = self.index.write();
            for (key, framed_len) in lengths {
                if let Some(entry) = index.get_mut(&key) {
                    entry.framed_len = framed_len;
                }
                live_bytes += framed_len;
            }
        }
        writer.live_bytes = live_bytes;
        writer.manifest.compactions += 1;
        writer.dir.save_manifest(&writer.manifest)?;

        tracing::info!(
            before,
            after = live_bytes,
            compactions = writer.manifest.compactions,
            "journal compacted"
        );
        Ok(())
    }
}

/// Appends a put for every indexed key to `out` and returns the framed
/// length of each. The index is left untouched.
fn copy_live(index: &HashMap<String, Entry>, out: &mut Journal) -> CoreResult<Vec<(String, u64)>> {
    let mut lengths = Vec::with_capacity(index.len());
    for (key, entry) in index {
        let framed_len = out.append(&Record::Put {
            key: key.clone(),
            value_type: entry.value_type,
            payload: entry.payload.clone(),
        })?;
        lengths.push((key.clone(), framed_len));
    }
    Ok(lengths)
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .field("keys", &self.len())
            .finish_non_exhaustive()
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "journal sync failed while dropping store");
        }
    }
}
