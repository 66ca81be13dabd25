//! Append-only record journal.
//!
//! Every mutation is appended as one framed record. Opening a store replays
//! the journal from the start; the last record for a key wins.
//!
//! ## Recovery
//!
//! A crash can leave a partially written frame at the tail. Replay stops at
//! the first frame that is cut short or fails its checksum and truncates the
//! journal there, so the next append starts on a clean boundary. A frame
//! whose checksum holds but whose body cannot be decrypted or parsed is
//! skipped and replay continues.

mod record;

pub use record::{
    compute_crc32, encode_frame, read_frame, FrameRead, Record, RecordOp, FRAME_HEADER_SIZE,
    MAX_BODY_SIZE,
};

use crate::crypto::RecordCipher;
use crate::error::CoreResult;
use minikv_storage::StorageBackend;
use std::sync::Arc;

/// What replay found.
#[derive(Debug, Default)]
pub struct Replay {
    /// Records in journal order, each with its framed size on disk.
    pub records: Vec<(Record, u64)>,
    /// Bytes cut from a torn or corrupt tail.
    pub truncated: u64,
    /// Intact frames whose body could not be opened or parsed.
    pub skipped: usize,
}

/// A journal over a storage backend.
pub struct Journal {
    backend: Box<dyn StorageBackend>,
    cipher: Option<Arc<RecordCipher>>,
    sync_on_write: bool,
}

impl Journal {
    /// Creates a journal. Nothing is read until [`replay`](Self::replay).
    #[must_use]
    pub fn new(
        backend: Box<dyn StorageBackend>,
        cipher: Option<Arc<RecordCipher>>,
        sync_on_write: bool,
    ) -> Self {
        Self {
            backend,
            cipher,
            sync_on_write,
        }
    }

    /// Reads every record and cuts any torn tail.
    pub fn replay(&mut self) -> CoreResult<Replay> {
        let data = self.backend.read_all()?;
        let mut replay = Replay::default();
        let mut offset = 0usize;

        loop {
            match read_frame(&data, offset) {
                FrameRead::Frame { body, next } => {
                    let framed = (next - offset) as u64;
                    match self.open_body(body) {
                        Ok(record) => replay.records.push((record, framed)),
                        Err(e) => {
                            tracing::warn!(offset, error = %e, "skipping unreadable journal record");
                            replay.skipped += 1;
                        }
                    }
                    offset = next;
                }
                FrameRead::End => break,
                FrameRead::Torn => {
                    tracing::warn!(offset, "journal ends in a torn frame");
                    break;
                }
                FrameRead::BadChecksum { expected, actual } => {
                    tracing::warn!(
                        offset,
                        expected = format_args!("{expected:08x}"),
                        actual = format_args!("{actual:08x}"),
                        "journal frame checksum mismatch"
                    );
                    break;
                }
            }
        }

        if offset < data.len() {
            replay.truncated = (data.len() - offset) as u64;
            tracing::warn!(
                valid_len = offset,
                dropped = replay.truncated,
                "truncating journal tail"
            );
            self.backend.truncate(offset as u64)?;
            self.backend.sync()?;
        }
        Ok(replay)
    }

    /// Appends a record and returns its framed size.
    pub fn append(&mut self, record: &Record) -> CoreResult<u64> {
        let frame = self.frame(record)?;
        self.backend.append(&frame)?;
        self.backend.flush()?;
        if self.sync_on_write {
            self.backend.sync()?;
        }
        Ok(frame.len() as u64)
    }

    /// Encodes a record into the exact bytes [`append`](Self::append) writes.
    pub fn frame(&self, record: &Record) -> CoreResult<Vec<u8>> {
        let body = record.encode_body()?;
        let body = match &self.cipher {
            Some(cipher) => cipher.seal(&body)?,
            None => body,
        };
        encode_frame(&body)
    }

    /// Syncs the backend.
    pub fn sync(&mut self) -> CoreResult<()> {
        self.backend.sync()?;
        Ok(())
    }

    /// Current journal size in bytes.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.size()?)
    }

    /// Returns true if record bodies are encrypted.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    fn open_body(&self, body: &[u8]) -> CoreResult<Record> {
        match &self.cipher {
            Some(cipher) => Record::decode_body(&cipher.open(body)?),
            None => Record::decode_body(body),
        }
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("encrypted", &self.is_encrypted())
            .field("sync_on_write", &self.sync_on_write)
            .finish_non_exhaustive()
    }
}
